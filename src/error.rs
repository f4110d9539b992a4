//! 错误处理

#[derive(Debug, thiserror::Error)]
pub enum Error {
    // 标准库错误处理
    #[error("io error, {0}")]
    Io(std::io::Error),
    #[error("system time error, {0}")]
    SystemTimeError(std::time::SystemTimeError),

    #[error("py error, {0}")]
    PyErr(#[from] pyo3::PyErr),
    #[error("py downcast error, {0}")]
    PyDowncastError(String),

    #[error("tensor error, {0}")]
    TensorErr(#[from] candle_core::Error),
    #[error("strum error, {0}")]
    ParseEnumString(String),

    #[error("token stream missing, {0}")]
    MissingTokenStream(String),
    #[error("empty tokenization produced no entries for stream, {0}")]
    EmptyFiller(String),

    #[error("model file not found, {0}")]
    ModelFileNotFound(String),
    #[error("invalid directory, {0}")]
    InvalidDirectory(String),
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<std::time::SystemTimeError> for Error {
    fn from(e: std::time::SystemTimeError) -> Self {
        Error::SystemTimeError(e)
    }
}
