//! Release composition and audit pipelines (§4.5, §4.6): both traverse the
//! same resolution order over the model (build → applications → files →
//! template+patch → variable substitution) that `armory-core` exposes.

pub mod audit;
pub mod patch;
pub mod release;
pub mod transport;

pub use audit::{audit as run_audit, AuditReport, DiffChoice, FileOutcome};
pub use release::{compose as compose_release, Release};
pub use transport::{CommandTransport, Transport};
