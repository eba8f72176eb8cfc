//! Errors raised by catalog registration and dispatch.

/// Errors that can occur while building a catalog or dispatching a request.
///
/// Uses `#[non_exhaustive]` so that new variants can be added without
/// breaking callers that match on it.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum CatalogError {
    /// No function with the given name is registered.
    #[error("function not found: {0}")]
    UnknownFunction(String),

    /// A function with the given name is already registered.
    #[error("duplicate function name: {0}")]
    DuplicateName(String),

    /// A declaration lists a required parameter it does not declare.
    #[error("invalid schema for function '{function}': {reason}")]
    InvalidSchema { function: String, reason: String },

    #[error("missing required argument '{argument}' for function '{function}'")]
    MissingArgument { function: String, argument: String },

    #[error("invalid argument '{argument}' for function '{function}': {reason}")]
    InvalidArgument {
        function: String,
        argument: String,
        reason: String,
    },

    /// The handler ran and failed. The handler's error is kept as the source.
    #[error("function '{function}' failed: {source}")]
    Invocation {
        function: String,
        #[source]
        source: anyhow::Error,
    },
}

impl CatalogError {
    /// Name of the function the error refers to.
    #[must_use]
    pub fn function(&self) -> &str {
        match self {
            Self::UnknownFunction(name) | Self::DuplicateName(name) => name,
            Self::InvalidSchema { function, .. }
            | Self::MissingArgument { function, .. }
            | Self::InvalidArgument { function, .. }
            | Self::Invocation { function, .. } => function,
        }
    }
}
