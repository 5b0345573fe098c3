/// Errors raised by operations, loaders and service collaborators.
///
/// The operation boundary is the only place these are converted into
/// response fields (see [`CommandError::status`]); the CLI and the tool
/// adapter never reinterpret them.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum CommandError {
    /// A bound value failed validation.
    #[error("invalid value for `{name}`: {reason}")]
    InvalidArgument { name: String, reason: String },

    /// A value the operation needs was not supplied.
    #[error("missing required argument: {0}")]
    MissingArgument(String),

    /// Raw input could not be parsed into flags.
    #[error("{0}")]
    Usage(String),

    /// No credential available for the request.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// A service collaborator answered with an error status.
    #[error("{message}")]
    Service { status: u16, message: String },

    /// A collaborator the operation needs is not registered in the context.
    #[error("service not registered: {0}")]
    ServiceUnavailable(&'static str),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CommandError {
    /// Response status for this error.
    ///
    /// Service codes pass through when they are recognizable HTTP error
    /// codes; everything unrecognized maps to 500.
    pub fn status(&self) -> u16 {
        match self {
            Self::InvalidArgument { .. } | Self::MissingArgument(_) | Self::Usage(_) => 400,
            Self::Unauthorized(_) => 401,
            Self::Service { status, .. } if (400..=599).contains(status) => *status,
            Self::Service { .. } | Self::ServiceUnavailable(_) | Self::Other(_) => 500,
        }
    }

    pub fn service(status: u16, message: impl Into<String>) -> Self {
        Self::Service {
            status,
            message: message.into(),
        }
    }
}
