//! Pluggable remote-file retrieval for the auditor (§4.6, §9 Open
//! Questions: "the rewrite must define a pluggable fetch interface").

use std::process::Command;

use armory_core::ArmoryError;

/// Fetches a file's bytes from a remote host.
pub trait Transport {
    /// Retrieve the bytes of `remote_path` on `remote_host`.
    ///
    /// # Errors
    /// Returns [`ArmoryError::TransportFailed`] if the file cannot be retrieved.
    fn fetch(&self, remote_host: &str, remote_path: &str) -> Result<Vec<u8>, ArmoryError>;
}

/// Shells out to a configurable command template (default
/// `ssh {host} cat {path}`) and captures stdout as the file's bytes.
pub struct CommandTransport {
    command_template: String,
}

impl CommandTransport {
    #[must_use]
    pub fn new(command_template: impl Into<String>) -> Self {
        Self { command_template: command_template.into() }
    }
}

impl Transport for CommandTransport {
    fn fetch(&self, remote_host: &str, remote_path: &str) -> Result<Vec<u8>, ArmoryError> {
        let rendered = self.command_template.replace("{host}", remote_host).replace("{path}", remote_path);
        let mut parts = rendered.split_whitespace();
        let program = parts.next().ok_or_else(|| ArmoryError::TransportFailed {
            detail: "empty fetch command template".to_owned(),
        })?;
        let output = Command::new(program).args(parts).output().map_err(|e| ArmoryError::TransportFailed {
            detail: format!("failed to run '{rendered}': {e}"),
        })?;
        if !output.status.success() {
            return Err(ArmoryError::TransportFailed {
                detail: format!("'{rendered}' exited with {}: {}", output.status, String::from_utf8_lossy(&output.stderr)),
            });
        }
        Ok(output.stdout)
    }
}

#[cfg(test)]
pub struct FakeTransport {
    pub files: std::collections::HashMap<(String, String), Vec<u8>>,
}

#[cfg(test)]
impl Transport for FakeTransport {
    fn fetch(&self, remote_host: &str, remote_path: &str) -> Result<Vec<u8>, ArmoryError> {
        self.files
            .get(&(remote_host.to_owned(), remote_path.to_owned()))
            .cloned()
            .ok_or_else(|| ArmoryError::TransportFailed {
                detail: format!("{remote_host}:{remote_path} not found"),
            })
    }
}
