//! Error type shared by all stages of the importer

use std::path::PathBuf;

/// Importer error
///
/// `Logic` marks broken invariants (inconsistent data between stages,
/// duplicate imports), `Runtime` marks problems with the imported data
/// itself. Everything else wraps an underlying library error.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{message}")]
    Logic {
        message: String,
        location: Option<&'static str>,
    },

    #[error("{message}")]
    Runtime {
        message: String,
        location: Option<&'static str>,
    },

    #[error("Failed to access '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Sexpr(#[from] kicadimport_sexpr::SexprError),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Toml(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn logic(message: impl Into<String>) -> Self {
        Error::Logic {
            message: message.into(),
            location: None,
        }
    }

    pub fn runtime(message: impl Into<String>) -> Self {
        Error::Runtime {
            message: message.into(),
            location: None,
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    /// Attach the source location; only kept in debug builds
    pub fn at(mut self, here: &'static str) -> Self {
        if cfg!(debug_assertions) {
            if let Error::Logic { location, .. } | Error::Runtime { location, .. } = &mut self {
                *location = Some(here);
            }
        }
        self
    }

    pub fn is_logic(&self) -> bool {
        matches!(self, Error::Logic { .. })
    }

    /// Where the error was raised, if known
    pub fn location(&self) -> Option<&'static str> {
        match self {
            Error::Logic { location, .. } | Error::Runtime { location, .. } => *location,
            _ => None,
        }
    }
}

/// Return early with a runtime (data) error
#[macro_export]
macro_rules! bail_runtime {
    ($($arg:tt)*) => {
        return Err($crate::Error::runtime(format!($($arg)*))
            .at(concat!(file!(), ":", line!())))
    };
}

/// Return early with a logic (invariant) error
#[macro_export]
macro_rules! bail_logic {
    ($($arg:tt)*) => {
        return Err($crate::Error::logic(format!($($arg)*))
            .at(concat!(file!(), ":", line!())))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fails_logic() -> Result<()> {
        bail_logic!("Duplicate import.");
    }

    fn fails_runtime(name: &str) -> Result<()> {
        bail_runtime!("Pad '{}' not found in imported package.", name);
    }

    #[test]
    fn test_error_kinds() {
        let err = fails_logic().unwrap_err();
        assert!(err.is_logic());
        assert_eq!(err.to_string(), "Duplicate import.");

        let err = fails_runtime("3").unwrap_err();
        assert!(!err.is_logic());
        assert_eq!(err.to_string(), "Pad '3' not found in imported package.");
    }

    #[test]
    fn test_location_is_debug_only() {
        let err = fails_logic().unwrap_err();
        if cfg!(debug_assertions) {
            assert!(err.location().unwrap().contains("error.rs:"));
        } else {
            assert!(err.location().is_none());
        }
    }
}
