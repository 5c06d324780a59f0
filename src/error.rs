use std::fmt::{Display, Formatter};

use jrdb_fwf_to_csv::ConvertError;

#[derive(Debug)]
pub enum LoaderError {
    Network(String),
    Upstream(String),
    Archive(String),
    Decode(String),
    Validation(String),
    Config(String),
    Layout(String),
    Convert(String),
    Upload(String),
    Io(String),
    Internal(String),
}

impl LoaderError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Network(_) => "network_error",
            Self::Upstream(_) => "upstream_error",
            Self::Archive(_) => "archive_error",
            Self::Decode(_) => "decode_error",
            Self::Validation(_) => "validation_error",
            Self::Config(_) => "config_error",
            Self::Layout(_) => "layout_error",
            Self::Convert(_) => "convert_error",
            Self::Upload(_) => "upload_error",
            Self::Io(_) => "io_error",
            Self::Internal(_) => "internal_error",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Network(message)
            | Self::Upstream(message)
            | Self::Archive(message)
            | Self::Decode(message)
            | Self::Validation(message)
            | Self::Config(message)
            | Self::Layout(message)
            | Self::Convert(message)
            | Self::Upload(message)
            | Self::Io(message)
            | Self::Internal(message) => message,
        }
    }
}

impl Display for LoaderError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code(), self.message())
    }
}

impl std::error::Error for LoaderError {}

impl From<std::io::Error> for LoaderError {
    fn from(error: std::io::Error) -> Self {
        Self::Io(error.to_string())
    }
}

impl From<reqwest::Error> for LoaderError {
    fn from(error: reqwest::Error) -> Self {
        Self::Network(error.to_string())
    }
}

impl From<serde_json::Error> for LoaderError {
    fn from(error: serde_json::Error) -> Self {
        Self::Decode(error.to_string())
    }
}

impl From<base64::DecodeError> for LoaderError {
    fn from(error: base64::DecodeError) -> Self {
        Self::Decode(error.to_string())
    }
}

impl From<zip::result::ZipError> for LoaderError {
    fn from(error: zip::result::ZipError) -> Self {
        Self::Archive(error.to_string())
    }
}

impl From<ConvertError> for LoaderError {
    fn from(error: ConvertError) -> Self {
        Self::Convert(error.to_string())
    }
}

impl From<url::ParseError> for LoaderError {
    fn from(error: url::ParseError) -> Self {
        Self::Config(error.to_string())
    }
}
