//! Errors of the load test library.

use reqwest::StatusCode;

/// Errors that can happen while a virtual user talks to the target API.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The request could not be sent or its response could not be read.
    #[error("{request} failed: {message}")]
    Transport {
        /// Method and name of the failed request.
        request: String,
        /// The error reported by the underlying [`reqwest`] client.
        message: String,
    },
    /// The target API answered with a non-success status code.
    #[error("{request} returned {status}")]
    Status {
        /// Method and name of the failed request.
        request: String,
        /// The status code of the response.
        status: StatusCode,
    },
    /// The response body is not the JSON document we expected.
    #[error("{request} returned an unexpected body: {source}")]
    Json {
        /// Method and name of the request.
        request: String,
        /// The decoding error.
        source: serde_json::Error,
    },
    /// A required credential is missing from the environment.
    #[error("environment variable `{0}` is not set")]
    MissingCredential(&'static str),
    /// The configured host is not a valid base URL.
    #[error("invalid host `{host}`: {source}")]
    InvalidHost {
        /// The configured host.
        host: String,
        /// The parse error.
        source: url::ParseError,
    },
    /// The [`reqwest::Client`] could not be built.
    #[error(transparent)]
    Client(#[from] reqwest::Error),
    /// A header value, such as the bearer token, contains invalid characters.
    #[error("invalid header value: {0}")]
    InvalidHeaderValue(#[from] reqwest::header::InvalidHeaderValue),
}

/// A convenience alias that defaults our [`Error`] type.
pub type Result<T, E = Error> = std::result::Result<T, E>;
