//! CLI-level errors (wraps infrastructure errors)

use thiserror::Error;

use crate::application::ApplicationError;
use crate::domain::DomainError;
use crate::exitcode;
use crate::infrastructure::InfraError;

/// CLI errors are the top-level error type.
/// These are what get displayed to the user.
#[derive(Error, Debug)]
pub enum CliError {
    #[error("{0}")]
    Infra(#[from] InfraError),

    #[error("invalid arguments: {0}")]
    InvalidArgs(String),

    #[error("{0}")]
    Usage(String),

    #[error("unknown modules: {}", .0.join(", "))]
    UnknownModules(Vec<String>),

    #[error("{failed} of {total} modules could not be trimmed")]
    BatchFailed { failed: usize, total: usize },
}

impl From<ApplicationError> for CliError {
    fn from(e: ApplicationError) -> Self {
        CliError::Infra(InfraError::Application(e))
    }
}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

impl CliError {
    /// Get the appropriate exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::InvalidArgs(_) | CliError::Usage(_) => exitcode::USAGE,
            CliError::UnknownModules(_) | CliError::BatchFailed { .. } => exitcode::DATAERR,
            CliError::Infra(e) => match e {
                InfraError::Io { .. } => exitcode::IOERR,
                InfraError::Application(app) => application_exit_code(app),
            },
        }
    }
}

fn application_exit_code(e: &ApplicationError) -> i32 {
    match e {
        ApplicationError::Domain(domain) => match domain {
            DomainError::EmptyInput => exitcode::USAGE,
            DomainError::CyclicDependency { .. } | DomainError::InvalidManifest { .. } => {
                exitcode::DATAERR
            }
            DomainError::UnknownModule(_) => exitcode::SOFTWARE,
        },
        ApplicationError::NoModuleSource | ApplicationError::ConflictingInput => exitcode::USAGE,
        ApplicationError::PathNotFound(_) => exitcode::NOINPUT,
        ApplicationError::Hierarchy { .. } => exitcode::DATAERR,
        ApplicationError::Config { .. } => exitcode::CONFIG,
        ApplicationError::OperationFailed { .. } => exitcode::IOERR,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn given_cycle_when_mapping_exit_code_then_data_error() {
        let err: CliError = ApplicationError::from(DomainError::CyclicDependency {
            cycle: vec!["a".into(), "b".into(), "a".into()],
        })
        .into();

        assert_eq!(err.exit_code(), exitcode::DATAERR);
    }

    #[test]
    fn given_missing_input_when_mapping_exit_code_then_usage_or_noinput() {
        let empty: CliError = ApplicationError::from(DomainError::EmptyInput).into();
        let missing: CliError = ApplicationError::PathNotFound(PathBuf::from("x")).into();

        assert_eq!(empty.exit_code(), exitcode::USAGE);
        assert_eq!(missing.exit_code(), exitcode::NOINPUT);
    }

    #[test]
    fn given_config_write_failure_when_mapping_exit_code_then_io_error() {
        let err: CliError = InfraError::io(
            "write",
            std::path::Path::new(".deptrim.toml"),
            std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        )
        .into();

        assert_eq!(err.exit_code(), exitcode::IOERR);
        assert_eq!(err.to_string(), "cannot write .deptrim.toml");
    }
}
