//! Command handlers: one module per CLI subject, each translating parsed
//! arguments into `armory-core`/`armory-compose` calls and rendering the
//! result through `crate::format`.

mod entities;
mod file;
mod resource;
mod system;
mod top;

pub use entities::{run_application, run_build, run_constant, run_environment, run_location, run_network};
pub use file::run_file;
pub use resource::run_resource;
pub use system::run_system;
pub use top::{cancel, commit, diff, doctor, init};
