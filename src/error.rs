//! Error types for infermpi

use crate::ThreadLevel;
use thiserror::Error;

/// Result type for the recoverable parts of the API.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced to the caller.
///
/// Transport failures inside collectives and point-to-point calls never show
/// up here: they abort the job (see the crate-level failure policy). This type covers
/// initialization, configuration and environment queries, and is also the
/// payload formatted into the fatal diagnostic.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// An [`Mpi`](crate::Mpi) handle already exists in this process
    #[error("MPI has already been initialized")]
    AlreadyInitialized,

    /// MPI was finalized earlier in this process and cannot be restarted
    #[error("MPI has already been finalized and cannot be initialized again")]
    Finalized,

    /// The runtime granted a weaker threading level than requested
    #[error("MPI_Init_thread provided {provided:?}, but {required:?} was required")]
    ThreadLevelUnavailable {
        /// Level passed to `MPI_Init_thread`
        required: ThreadLevel,
        /// Level granted by the runtime
        provided: ThreadLevel,
    },

    /// A thread level string could not be parsed
    #[error("invalid thread level '{0}' (expected single, funneled, serialized or multiple)")]
    InvalidThreadLevel(String),

    /// Non-success return code from the MPI runtime or the shim
    #[error("MPI error {code}: {message}")]
    Mpi {
        /// Raw return code
        code: i32,
        /// Text from `MPI_Error_string`, empty if unavailable
        message: String,
    },

    /// Internal error
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Build an error from a non-success MPI return code, asking the runtime
    /// for its description.
    pub fn from_code(code: i32) -> Self {
        Error::Mpi {
            code,
            message: crate::ffi::error_string(code).unwrap_or_default(),
        }
    }

    /// Check an MPI return code, returning `Ok(())` for success.
    pub fn check(code: i32) -> Result<()> {
        if code == 0 {
            Ok(())
        } else {
            Err(Error::from_code(code))
        }
    }

    /// Raw MPI code, if this error came from the runtime.
    pub fn code(&self) -> Option<i32> {
        match self {
            Error::Mpi { code, .. } => Some(*code),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thread_level_error_names_both_levels() {
        let err = Error::ThreadLevelUnavailable {
            required: ThreadLevel::Multiple,
            provided: ThreadLevel::Funneled,
        };
        let text = err.to_string();
        assert!(text.contains("Multiple"), "{text}");
        assert!(text.contains("Funneled"), "{text}");
    }

    #[test]
    fn mpi_error_carries_code() {
        let err = Error::Mpi {
            code: 15,
            message: "MPI_ERR_TRUNCATE".into(),
        };
        assert_eq!(err.code(), Some(15));
        assert_eq!(err.to_string(), "MPI error 15: MPI_ERR_TRUNCATE");
        assert_eq!(Error::AlreadyInitialized.code(), None);
    }

    #[test]
    fn finalized_error_explains_restart() {
        let text = Error::Finalized.to_string();
        assert!(text.contains("already been finalized"), "{text}");
        assert!(text.contains("cannot be initialized again"), "{text}");
        assert_eq!(Error::Finalized.code(), None);
        assert_ne!(Error::Finalized, Error::AlreadyInitialized);
    }
}
