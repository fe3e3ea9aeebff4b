//! Result write-back: PATCH `/v1/conversations/{conv}/items/by-call-id/{call_id}`
//! on the LLM-API after a tool call completes (spec §4.2.6, §6.4).
//!
//! This is a side effect for audit/replay; its outcome never changes what the
//! tool returned to the model (spec §4.2.6 closing sentence).

use jan_core::JanResult;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Serialize)]
pub struct WriteBackRequest<'a> {
    pub status: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
    pub name: &'a str,
    pub arguments: &'a Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_label: Option<&'a str>,
}

/// Outcome of a write-back attempt; the bridge logs this but never fails the
/// tool call because of it (spec §4.2.6).
#[derive(Debug, PartialEq, Eq)]
pub enum WriteBackOutcome {
    Success,
    /// 409: the item was already finalized; treated as success (spec §6.4).
    AlreadyFinalized,
    /// 404: the call-id is unknown to the conversation store.
    CallIdMissing,
    /// 403: the caller's bearer token doesn't grant access to this item.
    AccessDenied,
}

pub struct WriteBackClient {
    client: Client,
    conversations_base_url: String,
}

impl WriteBackClient {
    pub fn new(conversations_base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            conversations_base_url: conversations_base_url.into(),
        }
    }

    /// PATCHes the conversation item for `call_id`, forwarding the inbound
    /// `Authorization` header (spec §4.2.6: "Authorization header is forwarded
    /// from the inbound request").
    pub async fn patch_by_call_id(
        &self,
        conversation_id: &str,
        call_id: &str,
        authorization: &str,
        body: WriteBackRequest<'_>,
    ) -> JanResult<WriteBackOutcome> {
        let url = format!(
            "{}/v1/conversations/{conversation_id}/items/by-call-id/{call_id}",
            self.conversations_base_url
        );
        let resp = self
            .client
            .patch(&url)
            .header("Authorization", authorization)
            .json(&body)
            .send()
            .await
            .map_err(|e| crate::error::external(format!("write-back request: {e}")))?;

        match resp.status().as_u16() {
            200 | 201 => Ok(WriteBackOutcome::Success),
            409 => Ok(WriteBackOutcome::AlreadyFinalized),
            404 => {
                tracing::warn!(call_id, "write-back: call-id missing in conversation store");
                Ok(WriteBackOutcome::CallIdMissing)
            }
            403 => {
                tracing::warn!(call_id, "write-back: access denied (security event)");
                Ok(WriteBackOutcome::AccessDenied)
            }
            status => Err(crate::error::external(format!(
                "write-back unexpected status {status}"
            ))),
        }
    }
}
