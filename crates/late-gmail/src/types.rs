//! Gmail API types.

use serde::{Deserialize, Serialize};

/// Message resource returned by `messages.send`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SentMessage {
    pub id: String,
    #[serde(default)]
    pub thread_id: Option<String>,
    #[serde(default)]
    pub label_ids: Vec<String>,
}

/// Body of a `messages.send` request.
#[derive(Debug, Serialize)]
pub struct SendRequest<'a> {
    pub raw: &'a str,
}
