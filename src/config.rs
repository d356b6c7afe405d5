//! Process-level configuration.
//!
//! The only runtime knob is the threading level requested from
//! `MPI_Init_thread`. It can be set in code or taken from the
//! environment, which lets a launcher script choose it per job.
//!
//! | Variable                 | Values                                          | Default    |
//! |--------------------------|-------------------------------------------------|------------|
//! | `INFERMPI_THREAD_LEVEL`  | `single`, `funneled`, `serialized`, `multiple`  | `funneled` |

use crate::error::{Error, Result};
use crate::ThreadLevel;
use std::env;

/// Environment variable holding the requested thread level.
pub const THREAD_LEVEL_ENV: &str = "INFERMPI_THREAD_LEVEL";

/// Settings for [`Mpi::init_with`](crate::Mpi::init_with).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Config {
    /// Minimum threading level to request.
    pub thread_level: ThreadLevel,
}

impl Config {
    /// Configuration requesting `thread_level`.
    pub fn new(thread_level: ThreadLevel) -> Self {
        Config { thread_level }
    }

    /// Read the configuration from the environment.
    ///
    /// Unset or empty variables fall back to the defaults.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidThreadLevel`] if `INFERMPI_THREAD_LEVEL` holds
    /// an unknown value.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Config::default();
        if let Some(raw) = lookup(THREAD_LEVEL_ENV).filter(|v| !v.trim().is_empty()) {
            config.thread_level = raw.parse()?;
        }
        Ok(config)
    }
}

impl std::str::FromStr for ThreadLevel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_ascii_lowercase();
        let name = normalized.strip_prefix("mpi_").unwrap_or(&normalized);
        let name = name.strip_prefix("thread_").unwrap_or(name);
        match name {
            "single" => Ok(ThreadLevel::Single),
            "funneled" => Ok(ThreadLevel::Funneled),
            "serialized" => Ok(ThreadLevel::Serialized),
            "multiple" => Ok(ThreadLevel::Multiple),
            _ => Err(Error::InvalidThreadLevel(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_funneled() {
        assert_eq!(Config::default().thread_level, ThreadLevel::Funneled);
        assert_eq!(Config::from_lookup(|_| None).unwrap(), Config::default());
    }

    #[test]
    fn thread_level_parses_common_spellings() {
        assert_eq!("single".parse::<ThreadLevel>().unwrap(), ThreadLevel::Single);
        assert_eq!(
            "FUNNELED".parse::<ThreadLevel>().unwrap(),
            ThreadLevel::Funneled
        );
        assert_eq!(
            "thread_serialized".parse::<ThreadLevel>().unwrap(),
            ThreadLevel::Serialized
        );
        assert_eq!(
            " MPI_THREAD_MULTIPLE ".parse::<ThreadLevel>().unwrap(),
            ThreadLevel::Multiple
        );
    }

    #[test]
    fn thread_level_rejects_unknown() {
        let err = "parallel".parse::<ThreadLevel>().unwrap_err();
        assert_eq!(err, Error::InvalidThreadLevel("parallel".into()));
    }

    #[test]
    fn lookup_overrides_default() {
        let config = Config::from_lookup(|key| {
            (key == THREAD_LEVEL_ENV).then(|| "multiple".to_string())
        })
        .unwrap();
        assert_eq!(config.thread_level, ThreadLevel::Multiple);

        let blank = Config::from_lookup(|_| Some("  ".to_string())).unwrap();
        assert_eq!(blank.thread_level, ThreadLevel::Funneled);

        assert!(Config::from_lookup(|_| Some("bogus".to_string())).is_err());
    }
}
