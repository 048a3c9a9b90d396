//! Context for I/O failures on manifests and hierarchy files

use std::io;
use std::path::Path;

use crate::application::{ApplicationError, ApplicationResult};

pub trait IoResultExt<T> {
    /// Attach the failed `action` and `path`.
    ///
    /// A missing file becomes `PathNotFound`, so it exits as "no input"
    /// rather than as an I/O error. Anything else becomes `OperationFailed`.
    ///
    /// ```ignore
    /// self.fs.read_to_string(&path)
    ///     .with_path_context("read manifest", &path)?;
    /// ```
    fn with_path_context(self, action: &str, path: &Path) -> ApplicationResult<T>;
}

impl<T> IoResultExt<T> for io::Result<T> {
    fn with_path_context(self, action: &str, path: &Path) -> ApplicationResult<T> {
        self.map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => ApplicationError::PathNotFound(path.to_path_buf()),
            _ => ApplicationError::OperationFailed {
                context: format!("{action} {}", path.display()),
                source: Box::new(e),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn given_missing_file_when_adding_context_then_path_not_found() {
        let result: io::Result<()> = Err(io::Error::from(io::ErrorKind::NotFound));

        let err = result
            .with_path_context("read manifest", Path::new("sale/__manifest__.py"))
            .unwrap_err();

        assert!(
            matches!(err, ApplicationError::PathNotFound(p) if p == PathBuf::from("sale/__manifest__.py"))
        );
    }

    #[test]
    fn given_other_failure_when_adding_context_then_names_action_and_path() {
        let result: io::Result<()> = Err(io::Error::from(io::ErrorKind::PermissionDenied));

        let err = result
            .with_path_context("write manifest", Path::new("sale/__manifest__.py"))
            .unwrap_err();

        assert_eq!(
            err.to_string(),
            "operation failed: write manifest sale/__manifest__.py"
        );
    }
}
