//! Wire messages for the control channel and the calculate boundary.

use serde::{Deserialize, Serialize};

use super::{IndicatorResult, Quote};
use crate::error::FeedError;

/// Inbound control message from a subscriber.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ClientMessage {
    Subscribe { symbol: String },
    Unsubscribe { symbol: String },
}

/// Outbound message pushed to a subscriber.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ServerMessage {
    /// Fresh quote for a subscribed symbol
    Quote { data: Quote },
    /// Subscription acknowledged
    Subscribed { symbol: String },
    /// Unsubscription acknowledged
    Unsubscribed { symbol: String },
    /// Control message rejected
    Error { message: String },
}

/// Error body returned by the calculate boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_after_secs: Option<u64>,
}

impl From<&FeedError> for ErrorBody {
    fn from(err: &FeedError) -> Self {
        Self {
            error: err.to_string(),
            retry_after_secs: err.retry_after_secs(),
        }
    }
}

/// Response of the calculate boundary: `{data}` or `{error}`.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum CalculateResponse {
    Data { data: IndicatorResult },
    Error(ErrorBody),
}

impl CalculateResponse {
    /// Build a response and its HTTP-equivalent status.
    pub fn from_result(result: Result<IndicatorResult, FeedError>) -> (u16, Self) {
        match result {
            Ok(data) => (200, CalculateResponse::Data { data }),
            Err(err) => (err.status_code(), CalculateResponse::Error(ErrorBody::from(&err))),
        }
    }
}
