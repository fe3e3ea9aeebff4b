//! Parses [`CreateResponseRequest`] into the [`Message`] list the orchestrator's
//! tool loop consumes (spec §4.1.3: `messages = system? ++ history(...) ++
//! resolveMedia(input)`). This module only resolves the `input` part of that
//! formula; history lookup and media resolution are the orchestrator's and
//! media resolver's jobs respectively.

use thiserror::Error;

use super::request::{CreateResponseRequest, ResponseInput};
use crate::message::{Message, Role};

/// `input` resolved to messages, plus the other Create fields the orchestrator
/// needs to select an execution mode and build the full message list.
#[derive(Debug, Clone)]
pub struct ParsedCreateRequest {
    /// `input` converted to messages; does not yet include `system_prompt` or
    /// prior-turn history.
    pub input_messages: Vec<Message>,
    pub system_prompt: Option<String>,
    pub stream: bool,
    pub background: bool,
    pub store: bool,
    pub tools: Vec<serde_json::Value>,
    pub conversation: Option<String>,
    pub previous_response_id: Option<String>,
    pub webhook_url: Option<String>,
}

#[derive(Debug, Error)]
pub enum ParseError {
    /// "Create with stream=true, background=true ⇒ 400 Validation."
    #[error("stream and background cannot both be set")]
    StreamAndBackgroundConflict,
    #[error("unknown message role: {0}")]
    UnknownRole(String),
}

fn role_from_str(s: &str) -> Result<Role, ParseError> {
    match s.to_ascii_lowercase().as_str() {
        "system" => Ok(Role::System),
        "user" => Ok(Role::User),
        "assistant" => Ok(Role::Assistant),
        "tool" => Ok(Role::Tool),
        other => Err(ParseError::UnknownRole(other.to_string())),
    }
}

pub fn parse_create_request(req: &CreateResponseRequest) -> Result<ParsedCreateRequest, ParseError> {
    if req.stream && req.background {
        return Err(ParseError::StreamAndBackgroundConflict);
    }

    let input_messages = match &req.input {
        ResponseInput::Text(text) => vec![Message::user(text.clone())],
        ResponseInput::Messages(messages) => messages
            .iter()
            .map(|m| {
                let role = role_from_str(&m.role)?;
                let content = m.content.as_ref().map(|c| c.as_text());
                Ok(Message {
                    role,
                    content,
                    tool_calls: Vec::new(),
                    tool_call_id: None,
                })
            })
            .collect::<Result<Vec<_>, ParseError>>()?,
    };

    Ok(ParsedCreateRequest {
        input_messages,
        system_prompt: req.system_prompt.clone(),
        stream: req.stream,
        background: req.background,
        store: req.store,
        tools: req.tools.clone(),
        conversation: req.conversation.clone(),
        previous_response_id: req.previous_response_id.clone(),
        webhook_url: req.webhook_url().map(String::from),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::openai_sse::request::ResponseInput;

    fn base_request(input: ResponseInput) -> CreateResponseRequest {
        CreateResponseRequest {
            model: "gpt-test".to_string(),
            input,
            system_prompt: None,
            stream: false,
            background: false,
            store: false,
            metadata: serde_json::Map::new(),
            tools: Vec::new(),
            conversation: None,
            previous_response_id: None,
        }
    }

    #[test]
    fn text_input_becomes_single_user_message() {
        let req = base_request(ResponseInput::Text("weather in Berlin".to_string()));
        let parsed = parse_create_request(&req).unwrap();
        assert_eq!(parsed.input_messages.len(), 1);
        assert_eq!(parsed.input_messages[0].role, Role::User);
        assert_eq!(
            parsed.input_messages[0].content.as_deref(),
            Some("weather in Berlin")
        );
    }

    #[test]
    fn stream_and_background_both_set_is_rejected() {
        let mut req = base_request(ResponseInput::Text("x".to_string()));
        req.stream = true;
        req.background = true;
        let err = parse_create_request(&req).unwrap_err();
        assert!(matches!(err, ParseError::StreamAndBackgroundConflict));
    }

    #[test]
    fn unknown_role_in_message_array_is_rejected() {
        use crate::openai_sse::request::ChatMessage;
        let req = base_request(ResponseInput::Messages(vec![ChatMessage {
            role: "narrator".to_string(),
            content: None,
        }]));
        let err = parse_create_request(&req).unwrap_err();
        assert!(matches!(err, ParseError::UnknownRole(_)));
    }
}
