use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Card identifier is not hex, or its byte length is out of range.
    #[error("Invalid card format: {0}")]
    InvalidCardFormat(String),
}

pub type Result<T> = std::result::Result<T, Error>;
