use thiserror::Error;

/// A list specifying categories of [`FourDError`].
///
/// The variants mirror the classic DB-API exception hierarchy
/// (`Warning` / `Error` / `InterfaceError` / `DatabaseError` / ...),
/// flattened into a single enum instead of a class hierarchy.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum FourDError {
    /// Driver misuse: a closed cursor or connection was used, or a DSN
    /// could not be parsed.
    #[error("interface error: {0}")]
    InterfaceError(String),

    /// The caller asked to fetch rows but the current result has none
    /// (e.g. an update-count result, or an exhausted cursor).
    #[error("data error: {0}")]
    DataError(String),

    /// The TCP connection failed or timed out, a response frame was
    /// malformed, or (when `code` is set) the server rejected `LOGIN`.
    #[error("operational error: {message}")]
    OperationalError {
        message: String,
        code: Option<String>,
        component_code: Option<String>,
        description: Option<String>,
    },

    /// The server reported a constraint violation.
    #[error("integrity error: {0}")]
    IntegrityError(String),

    /// A driver invariant was broken (e.g. an operation was attempted
    /// while not connected).
    #[error("internal error: {0}")]
    InternalError(String),

    /// Placeholder/parameter mismatch, or an unrecognized type tag was
    /// seen on the wire.
    #[error("programming error: {0}")]
    ProgrammingError(String),

    /// The requested operation is not supported by this driver.
    #[error("not supported: {0}")]
    NotSupportedError(String),

    /// The server responded with a non-OK status; carries the
    /// `Error-Code`, `Error-Component-Code` and `Error-Description`
    /// header fields verbatim.
    #[error("4D server error {code} (component {component_code}): {description}")]
    ServerError {
        code: String,
        component_code: String,
        description: String,
    },

    /// I/O failure while talking to the server. Fatal to the
    /// connection: the byte stream can no longer be trusted.
    #[error("I/O error")]
    Io(#[from] std::io::Error),
}

/// Abbreviation of `Result<T, FourDError>`.
pub type FourDResult<T> = std::result::Result<T, FourDError>;

impl FourDError {
    pub(crate) fn interface<S: Into<String>>(msg: S) -> Self {
        Self::InterfaceError(msg.into())
    }

    pub(crate) fn operational<S: Into<String>>(msg: S) -> Self {
        Self::OperationalError {
            message: msg.into(),
            code: None,
            component_code: None,
            description: None,
        }
    }

    /// Builds the `OperationalError` raised when the server rejects `LOGIN`,
    /// carrying the `Error-Code`/`Error-Component-Code`/`Error-Description`
    /// header fields verbatim.
    pub(crate) fn login_failed(code: String, component_code: String, description: String) -> Self {
        Self::OperationalError {
            message: format!("login failed: {code} (component {component_code}): {description}"),
            code: Some(code),
            component_code: Some(component_code),
            description: Some(description),
        }
    }

    pub(crate) fn internal<S: Into<String>>(msg: S) -> Self {
        Self::InternalError(msg.into())
    }

    pub(crate) fn programming<S: Into<String>>(msg: S) -> Self {
        Self::ProgrammingError(msg.into())
    }

    pub(crate) fn data<S: Into<String>>(msg: S) -> Self {
        Self::DataError(msg.into())
    }

    /// Returns the server-reported error code, if this is a [`FourDError::ServerError`].
    #[must_use]
    pub fn server_code(&self) -> Option<&str> {
        match self {
            Self::ServerError { code, .. } => Some(code),
            _ => None,
        }
    }

    /// Returns the server-reported error code, if this is an
    /// [`FourDError::OperationalError`] raised by a failed `LOGIN`.
    #[must_use]
    pub fn login_error_code(&self) -> Option<&str> {
        match self {
            Self::OperationalError { code: Some(c), .. } => Some(c),
            _ => None,
        }
    }
}
