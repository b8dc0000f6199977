//! Error types for type resolution, graph building and DOT encoding.

use std::fmt;

/// Broad classification of an [`Error`].
///
/// Every kind is terminal for the request that produced it: nothing in the
/// library retries, and no partial graph is returned alongside an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The type reference could not be resolved to a symbol.
    Resolution,
    /// The symbol resolved, but its underlying type is not a struct.
    NotComposite,
    /// The graph could not be encoded or written out.
    Serialization,
    /// A configuration file could not be read or parsed.
    Config,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Resolution => "resolution",
            Self::NotComposite => "not_composite",
            Self::Serialization => "serialization",
            Self::Config => "config",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unified error type for the gograph core.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("malformed type reference {0:?}: expected <package-path>.<TypeName>")]
    MalformedReference(String),

    #[error("cannot load package {path:?}: {reason}")]
    PackageNotFound { path: String, reason: String },

    #[error("type not found: {0:?}")]
    TypeNotFound(String),

    #[error("{name} is not a struct (underlying type {underlying})")]
    NotComposite { name: String, underlying: String },

    #[error("failed to encode DOT: {0}")]
    Encode(#[from] fmt::Error),

    #[error("failed to write DOT: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl Error {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MalformedReference(_) | Self::PackageNotFound { .. } | Self::TypeNotFound(_) => {
                ErrorKind::Resolution
            }
            Self::NotComposite { .. } => ErrorKind::NotComposite,
            Self::Encode(_) | Self::Io(_) => ErrorKind::Serialization,
            Self::Config(_) => ErrorKind::Config,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolution_variants_share_a_kind() {
        let malformed = Error::MalformedReference("nodot".into());
        let missing_pkg = Error::PackageNotFound {
            path: "nonexistent/pkg".into(),
            reason: "no Go files".into(),
        };
        let missing_type = Error::TypeNotFound("example.com/people.Missing".into());

        assert_eq!(malformed.kind(), ErrorKind::Resolution);
        assert_eq!(missing_pkg.kind(), ErrorKind::Resolution);
        assert_eq!(missing_type.kind(), ErrorKind::Resolution);
    }

    #[test]
    fn encode_and_io_are_serialization() {
        assert_eq!(Error::from(fmt::Error).kind(), ErrorKind::Serialization);
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed");
        assert_eq!(Error::from(io).kind(), ErrorKind::Serialization);
    }

    #[test]
    fn not_composite_message_names_both_types() {
        let err = Error::NotComposite {
            name: "example.com/people.Count".into(),
            underlying: "int".into(),
        };
        assert_eq!(err.kind(), ErrorKind::NotComposite);
        assert_eq!(
            err.to_string(),
            "example.com/people.Count is not a struct (underlying type int)"
        );
    }
}
