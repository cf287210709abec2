//! Failure taxonomy for loading and hosting the client.
//!
//! Every loader failure maps to a distinct process exit code so the
//! launching environment can tell failure classes apart without parsing
//! log output.

use std::path::PathBuf;

use thiserror::Error;

pub type LoadResult<T> = Result<T, LoadError>;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LoadError {
    #[error("not enough arguments: {0}")]
    InsufficientArguments(String),

    #[error("archive `{}` does not exist", .0.display())]
    MissingArchive(PathBuf),

    #[error("archive `{}` could not be opened: {reason}", path.display())]
    ArchiveUnreadable { path: PathBuf, reason: String },

    #[error("type `{0}` not found in any archive")]
    TypeNotFound(String),

    #[error("`{type_name}` exposes {candidates} private static directory fields, expected exactly one")]
    PatchTargetAmbiguous { type_name: String, candidates: usize },

    #[error("writing field `{field}` failed: {reason}")]
    FieldWrite { field: String, reason: String },

    #[error("working directory patch rejected: {0}")]
    PatchOrder(&'static str),

    #[error("`{name}` speaks ABI {found}, host expects {expected}")]
    ShapeMismatch { name: String, expected: u32, found: u32 },

    #[error("could not instantiate `{type_name}`: {reason}")]
    InstantiationFailed { type_name: String, reason: String },

    #[error("invoking `{target}` failed: {reason}")]
    InvocationFailed { target: String, reason: String },

    #[error("no window to host the client in: {0}")]
    WindowUnavailable(String),

    #[error("access denied: {0}")]
    AccessDenied(String),

    #[error("malformed location `{0}`")]
    MalformedLocation(String),
}

impl LoadError {
    /// Process exit code reported for this failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            LoadError::InsufficientArguments(_) => -1,
            LoadError::MissingArchive(_)
            | LoadError::ArchiveUnreadable { .. }
            | LoadError::TypeNotFound(_) => 1,
            LoadError::PatchTargetAmbiguous { .. }
            | LoadError::PatchOrder(_)
            | LoadError::FieldWrite { .. }
            | LoadError::ShapeMismatch { .. } => 2,
            LoadError::InstantiationFailed { .. }
            | LoadError::InvocationFailed { .. }
            | LoadError::WindowUnavailable(_) => 3,
            LoadError::AccessDenied(_) => 4,
            LoadError::MalformedLocation(_) => 5,
        }
    }

    /// Only a failed instantiation may be recovered from, by falling back to
    /// the compatibility entry point.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, LoadError::InstantiationFailed { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_distinguish_failure_classes() {
        assert_eq!(LoadError::InsufficientArguments("3 given".into()).exit_code(), -1);
        assert_eq!(LoadError::TypeNotFound("a.B".into()).exit_code(), 1);
        assert_eq!(LoadError::MissingArchive(PathBuf::from("x")).exit_code(), 1);
        assert_eq!(
            LoadError::PatchTargetAmbiguous { type_name: "a.B".into(), candidates: 0 }.exit_code(),
            2
        );
        assert_eq!(
            LoadError::InvocationFailed { target: "a.B::main".into(), reason: "x".into() }
                .exit_code(),
            3
        );
        assert_eq!(LoadError::AccessDenied("x".into()).exit_code(), 4);
        assert_eq!(LoadError::MalformedLocation("x".into()).exit_code(), 5);
    }

    #[test]
    fn only_instantiation_failure_is_recoverable() {
        let err = LoadError::InstantiationFailed { type_name: "a".into(), reason: "b".into() };
        assert!(err.is_recoverable());
        assert!(!LoadError::TypeNotFound("a".into()).is_recoverable());
    }
}
