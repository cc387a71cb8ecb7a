//! Error types
//!
//! Expected conditions (lookup miss, failed conversion, duplicate
//! registration) are reported through `Option`/`bool`. These enums back the
//! `try_*` helpers that want to say *why* something failed.

/// Result type for reflection calls
pub type ReflectResult<T> = Result<T, ReflectError>;

/// Reflection errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ReflectError {
    /// Type handle refers to a removed record
    #[error("Invalid type handle: {0}")]
    InvalidType(u32),

    /// Item handle refers to a removed item
    #[error("Invalid {0} handle")]
    InvalidItem(&'static str),

    /// No constructor accepts the given arguments
    #[error("No constructor of '{0}' accepts the given arguments")]
    NoMatchingConstructor(String),

    /// An argument variant was empty
    #[error("Invalid argument: empty variant")]
    InvalidArgument,

    /// Too many or too few arguments
    #[error("Argument count mismatch: expected {expected}, got {got}")]
    ArgumentCountMismatch {
        /// Number of declared parameters
        expected: usize,
        /// Number of supplied arguments
        got: usize,
    },

    /// The receiver does not hold (or derive from) the declaring type
    #[error("Instance mismatch: expected '{expected}'")]
    InstanceMismatch {
        /// Declaring type name
        expected: String,
    },

    /// Property cannot be written
    #[error("Property '{0}' is read-only")]
    ReadOnlyProperty(String),

    /// Value could not be converted
    #[error("Conversion failed: {from} -> {to}")]
    ConversionFailed {
        /// Source type name
        from: String,
        /// Target type name
        to: String,
    },

    /// The accessor reported failure
    #[error("Invocation of '{0}' failed")]
    InvocationFailed(String),
}

/// Dynamic library errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LibraryError {
    /// No candidate path could be opened
    #[error("Library not found: {name}: {message}")]
    NotFound {
        /// Requested file name
        name: String,
        /// Loader diagnostics
        message: String,
    },

    /// Native unload failed
    #[error("Failed to unload library: {0}")]
    UnloadFailed(String),

    /// Unload requested for a library that is not loaded
    #[error("Library not loaded: {0}")]
    NotLoaded(String),

    /// Invalid library path
    #[error("Invalid library path: {0}")]
    InvalidPath(String),
}

/// Loader configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Configuration file could not be read
    #[error("Failed to read {path}: {source}")]
    Io {
        /// File that was read
        path: String,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Configuration text is not valid TOML for [`LoaderConfig`](crate::LoaderConfig)
    #[error("Invalid loader configuration: {0}")]
    Parse(#[from] toml::de::Error),
}
