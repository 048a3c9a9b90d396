//! Infrastructure-level errors (wraps application errors)

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::application::ApplicationError;

/// Application errors plus I/O done outside the services (config files,
/// the working directory).
#[derive(Error, Debug)]
pub enum InfraError {
    #[error("{0}")]
    Application(#[from] ApplicationError),

    #[error("cannot {action} {}", path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl InfraError {
    /// Failed `action` on `path`.
    pub fn io(action: &'static str, path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            action,
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Result type for infrastructure layer operations.
pub type InfraResult<T> = Result<T, InfraError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn given_io_failure_when_displayed_then_names_action_and_path() {
        let err = InfraError::io(
            "write",
            Path::new("addons/.deptrim.toml"),
            io::Error::from(io::ErrorKind::PermissionDenied),
        );

        assert_eq!(err.to_string(), "cannot write addons/.deptrim.toml");
    }
}
