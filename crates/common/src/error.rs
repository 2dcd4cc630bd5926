/// Erros de framing do protocolo RESP.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("frame incompleto")]
    Incomplete,
    #[error("expected '{expected}', got '{found}'")]
    InvalidFrameType { expected: char, found: char },
    #[error("invalid integer: {0}")]
    InvalidInteger(String),
    #[error("invalid bulk length: {0}")]
    InvalidBulkLength(i64),
    #[error("invalid multibulk length: {0}")]
    InvalidMultibulkLength(i64),
    #[error("missing CRLF after bulk payload")]
    MissingTerminator,
    #[error("frame exceeds maximum size ({0} bytes)")]
    FrameTooLarge(usize),
    #[error("invalid encoding: {0}")]
    InvalidEncoding(String),
    #[error("query buffer limit exceeded ({0} bytes)")]
    QueryBufferLimit(usize),
}

/// Erros de comando reportados ao cliente como `-ERR ...`.
///
/// O `Display` é exatamente o texto que vai no wire depois do prefixo `ERR `.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CommandError {
    #[error("empty command")]
    Empty,
    #[error("unknown command '{0}'")]
    Unknown(String),
    #[error("wrong number of arguments for '{0}'")]
    WrongArity(String),
    #[error("syntax error")]
    Syntax,
    #[error("value is not an integer or out of range")]
    NotAnInteger,
    #[error("timeout is not a float or out of range")]
    InvalidTimeout,
    #[error("invalid expire time in '{0}' command")]
    InvalidExpireTime(String),
    #[error("invalid UTF-8 in argument")]
    InvalidUtf8,
}

/// Erros de conexão TCP.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error("conexão resetada pelo peer")]
    ConnectionReset,
    #[error("I/O: {0}")]
    Io(#[from] std::io::Error),
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}

/// Erro top-level do TideDB.
#[derive(Debug, thiserror::Error)]
pub enum TideError {
    #[error(transparent)]
    Connection(#[from] ConnectionError),
}

/// Result type alias.
pub type TideResult<T> = Result<T, TideError>;

// Conversão implícita de io::Error → TideError (via ConnectionError)
impl From<std::io::Error> for TideError {
    fn from(e: std::io::Error) -> Self {
        TideError::Connection(ConnectionError::Io(e))
    }
}
