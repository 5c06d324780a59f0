use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("invalid layout: {0}")]
    InvalidLayout(String),

    #[error("invalid metadata table '{path}': {message}")]
    Metadata { path: String, message: String },

    #[error("invalid option: {0}")]
    InvalidOption(String),
}
