use thiserror::Error;

use crate::transport::TransportError;

/// Why a single fetch produced no snapshot.
///
/// Only the fetch layer sees this type; everything downstream receives
/// [`WeatherError::DataUnavailable`] instead.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("transport failure: {0}")]
    Transport(#[from] TransportError),

    #[error("malformed payload: {0}")]
    MalformedPayload(String),
}

impl From<serde_json::Error> for FetchError {
    fn from(err: serde_json::Error) -> Self {
        FetchError::MalformedPayload(err.to_string())
    }
}

impl FetchError {
    /// Short label used in log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::Transport(_) => "transport",
            FetchError::MalformedPayload(_) => "malformed_payload",
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WeatherError {
    /// Nothing has been fetched yet, or the last attempt failed part way.
    #[error("weather data is not available")]
    DataUnavailable,

    #[error("index {index} is out of range (length {len})")]
    IndexOutOfRange { index: i64, len: usize },
}

impl From<FetchError> for WeatherError {
    fn from(_: FetchError) -> Self {
        WeatherError::DataUnavailable
    }
}
