use std::fmt;

use thiserror::Error;

/// Boxed error carried inside server errors.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

// === ErrorKind ===

/// Coarse classification exposed to callers for transport-level mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    NotFound,
    /// The caller sent more requests than the server accepts per second.
    RateLimited,
    Server,
}

impl ErrorKind {
    /// HTTP-style status code conventionally used for this kind.
    pub fn status_code(self) -> u16 {
        match self {
            ErrorKind::Validation => 400,
            ErrorKind::NotFound => 404,
            ErrorKind::RateLimited => 429,
            ErrorKind::Server => 500,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::NotFound => "not_found",
            ErrorKind::RateLimited => "rate_limited",
            ErrorKind::Server => "server",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// === StoreError ===

/// Errors raised by the SQLite-backed repositories.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("database i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("database lock poisoned")]
    LockPoisoned,

    /// The row addressed by an update, delete or lookup does not exist.
    #[error("no entry found for '{0}'")]
    NotFound(String),

    #[error("invalid stored value: {0}")]
    InvalidData(String),
}

// === FaviconError ===

/// Errors related to resolving, staging and persisting favicons.
#[derive(Debug, Error)]
pub enum FaviconError {
    #[error("invalid url '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("request to '{url}' failed: {message}")]
    Network { url: String, message: String },

    #[error("request to '{url}' returned status {status}")]
    Status { url: String, status: u16 },

    #[error("content at '{url}' is not an image (content-type '{content_type}')")]
    NotAnImage { url: String, content_type: String },

    #[error("could not parse markup of '{url}': {reason}")]
    MalformedMarkup { url: String, reason: String },

    #[error("empty favicon payload for '{0}'")]
    EmptyPayload(String),

    #[error("invalid favicon id '{0}'")]
    InvalidId(String),

    #[error("favicon not found: {0}")]
    NotFound(String),

    #[error("invalid resize dimensions {x}x{y}")]
    InvalidDimensions { x: i32, y: i32 },

    #[error("resized favicon would be {width}x{height} pixels")]
    TooLarge { width: u32, height: u32 },

    #[error("image processing failed: {0}")]
    Image(#[from] image::ImageError),

    #[error("favicon staging i/o failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("favicon store failed: {0}")]
    Store(#[from] StoreError),
}

impl FaviconError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            FaviconError::NotFound(_) => ErrorKind::NotFound,
            FaviconError::InvalidId(_)
            | FaviconError::InvalidDimensions { .. }
            | FaviconError::TooLarge { .. } => ErrorKind::Validation,
            FaviconError::InvalidUrl { .. } => ErrorKind::Validation,
            _ => ErrorKind::Server,
        }
    }
}

// === BookmarkError ===

/// Errors returned by the bookmark tree service.
#[derive(Debug, Error)]
pub enum BookmarkError {
    /// The input was rejected before any write happened.
    #[error("validation failed: {0}")]
    Validation(String),

    /// A referenced bookmark, folder or favicon does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Storage, staging or network failure, wrapped with context.
    #[error("{context}: {source}")]
    Server {
        context: String,
        #[source]
        source: BoxError,
    },
}

impl BookmarkError {
    pub fn validation(msg: impl Into<String>) -> Self {
        BookmarkError::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        BookmarkError::NotFound(msg.into())
    }

    pub fn server<E>(context: impl Into<String>, source: E) -> Self
    where
        E: Into<BoxError>,
    {
        BookmarkError::Server {
            context: context.into(),
            source: source.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            BookmarkError::Validation(_) => ErrorKind::Validation,
            BookmarkError::NotFound(_) => ErrorKind::NotFound,
            BookmarkError::Server { .. } => ErrorKind::Server,
        }
    }

    pub fn status_code(&self) -> u16 {
        self.kind().status_code()
    }

    /// Prepends context to server errors; validation and not-found pass through.
    pub fn with_context(self, context: impl fmt::Display) -> Self {
        match self {
            BookmarkError::Server {
                context: inner,
                source,
            } => BookmarkError::Server {
                context: format!("{}: {}", context, inner),
                source,
            },
            other => other,
        }
    }
}

impl From<StoreError> for BookmarkError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => BookmarkError::NotFound(what),
            other => BookmarkError::server("bookmark store failure", other),
        }
    }
}

impl From<FaviconError> for BookmarkError {
    fn from(err: FaviconError) -> Self {
        match err.kind() {
            ErrorKind::Validation => BookmarkError::Validation(err.to_string()),
            ErrorKind::NotFound => BookmarkError::NotFound(err.to_string()),
            ErrorKind::RateLimited | ErrorKind::Server => BookmarkError::server("favicon failure", err),
        }
    }
}

// === SettingsError ===

/// Errors related to settings management.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("settings i/o error: {0}")]
    Io(String),

    #[error("settings serialization error: {0}")]
    Serialization(String),

    #[error("invalid settings key: {0}")]
    InvalidKey(String),

    #[error("invalid settings value: {0}")]
    InvalidValue(String),
}

impl SettingsError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SettingsError::InvalidKey(_) | SettingsError::InvalidValue(_) => ErrorKind::Validation,
            SettingsError::Io(_) | SettingsError::Serialization(_) => ErrorKind::Server,
        }
    }
}
