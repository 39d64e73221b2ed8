use thiserror::Error;

/// Lookups of names the caller supplied that do not exist. These are
/// recoverable misuse, unlike malformed input which aborts a load.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    #[error("unknown package '{0}'")]
    UnknownPackage(String),
    #[error("unknown source package '{0}'")]
    UnknownSource(String),
    #[error("unknown architecture '{0}'")]
    UnknownArchitecture(String),
}
