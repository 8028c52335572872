/// Errors raised by the server's method table and run loop.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// A handler is already registered under this name.
    #[error("method `{0}` already registered")]
    DuplicateMethod(String),

    /// No handler is registered under this name.
    #[error("method `{0}` is not registered")]
    UnknownMethod(String),

    /// Reading requests or writing responses failed.
    #[error("transport i/o failed: {0}")]
    Io(#[from] std::io::Error),

    /// A response could not be encoded.
    #[error("failed to encode response: {0}")]
    Encode(#[from] serde_json::Error),
}
