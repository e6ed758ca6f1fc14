//! Shared error types for the map worker service

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SharedError {
    #[error("Invalid request: {field} = {value}")]
    InvalidRequest { field: String, value: String },

    #[error("Message protocol error: {message}")]
    ProtocolError { message: String },
}

pub type SharedResult<T> = Result<T, SharedError>;
