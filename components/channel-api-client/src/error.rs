/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

use crate::{Method, RequestDescriptor, Response};

pub type Result<T, E = ChannelApiError> = std::result::Result<T, E>;

/// Errors raised while moving a request over the network.
///
/// These come from a [`Backend`](crate::Backend) or a
/// [`RequestExecutor`](crate::RequestExecutor) and are opaque to the client:
/// it forwards them to the caller without deciding whether to retry.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("Backend error: {msg}")]
    BackendError { msg: String },

    #[error("Request timeout")]
    Timeout,

    #[error("Invalid URL: {msg}")]
    InvalidUrl { msg: String },

    #[error("Illegal characters in request header '{name}'")]
    InvalidRequestHeader { name: String },

    #[error("Illegal characters in response header '{name}'")]
    InvalidResponseHeader { name: String },

    #[error("Validation error: URL does not use TLS protocol.")]
    NonTlsUrl,
}

impl TransportError {
    pub fn new_backend_error(msg: impl Into<String>) -> Self {
        Self::BackendError { msg: msg.into() }
    }
}

impl From<url::ParseError> for TransportError {
    fn from(e: url::ParseError) -> Self {
        Self::InvalidUrl { msg: e.to_string() }
    }
}

/// Map errors from external crates like `tokio` and `hyper` to `TransportError::BackendError`
///
/// This works for any error that implements ToString
pub trait MapBackendError {
    type Ok;

    fn map_backend_error(self) -> Result<Self::Ok, TransportError>;
}

impl<T, E: ToString> MapBackendError for std::result::Result<T, E> {
    type Ok = T;

    fn map_backend_error(self) -> Result<T, TransportError> {
        self.map_err(|e| TransportError::BackendError { msg: e.to_string() })
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum ChannelApiError {
    /// The payload could not be serialized. Raised before anything is submitted.
    #[error("Payload encoding error: {0}")]
    EncodingError(String),

    #[error("Invalid channel id: {0:?}")]
    InvalidChannelId(String),

    /// The server answered with a success status but the body was unusable.
    #[error("Response decoding error: {0}")]
    DecodingError(String),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Error: {method} {url} returned {status}")]
    UnexpectedStatus {
        status: u16,
        method: Method,
        url: url::Url,
    },

    #[error("Request was cancelled")]
    Cancelled,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl From<url::ParseError> for ChannelApiError {
    fn from(e: url::ParseError) -> Self {
        ChannelApiError::InvalidConfig(format!("URL parse error: {e}"))
    }
}

/// The context handed to a caller when a channel operation fails.
///
/// `request` is `None` when the operation failed before a request could be
/// built, and `response` is `None` unless the server actually answered.
#[derive(Debug, Clone, thiserror::Error)]
#[error("Channel request failed: {error}")]
pub struct FailedRequest {
    pub request: Option<RequestDescriptor>,
    pub response: Option<Response>,
    #[source]
    pub error: ChannelApiError,
}

impl FailedRequest {
    pub(crate) fn before_submit(error: ChannelApiError) -> Self {
        Self {
            request: None,
            response: None,
            error,
        }
    }

    pub(crate) fn cancelled() -> Self {
        Self::before_submit(ChannelApiError::Cancelled)
    }

    /// The HTTP status of the failed exchange, if the server answered at all.
    pub fn status(&self) -> Option<u16> {
        self.response.as_ref().map(|r| r.status)
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self.error, ChannelApiError::Cancelled)
    }
}
