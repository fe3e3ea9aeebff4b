//! Context-aware message trimming (spec §4.1.4).
//!
//! Keeps the tool loop's message list under the model's context budget by
//! dropping the least-load-bearing messages first: tool results, then
//! assistant turns that carried tool calls, then plain assistant turns. The
//! system prompt and every user message are never removed.

use crate::message::Message;

/// `⌊0.80 · context_length⌋`, the budget trimming targets.
pub fn token_budget(context_length: usize) -> usize {
    (context_length as f64 * 0.80).floor() as usize
}

fn estimated_total(messages: &[Message]) -> usize {
    messages.iter().map(Message::estimated_tokens).sum()
}

/// Index of the oldest message matching `predicate`, skipping index 0 (system
/// prompt) and any user message, which are never removed.
fn oldest_removable(messages: &[Message], predicate: impl Fn(&Message) -> bool) -> Option<usize> {
    messages
        .iter()
        .enumerate()
        .skip(1)
        .find(|(_, m)| m.role != crate::message::Role::User && predicate(m))
        .map(|(i, _)| i)
}

/// Trims `messages` in place until the estimate fits `budget` or only the
/// system prompt and the required minimum of two messages remain.
pub fn trim_to_budget(messages: &mut Vec<Message>, budget: usize) {
    while estimated_total(messages) > budget && messages.len() > 2 {
        let victim = oldest_removable(messages, Message::is_tool_result)
            .or_else(|| oldest_removable(messages, Message::is_assistant_with_tool_calls))
            .or_else(|| oldest_removable(messages, Message::is_plain_assistant));

        match victim {
            Some(index) => {
                messages.remove(index);
            }
            None => break,
        }
    }
}

/// Truncates a tool result's content to `max_chars`, appending an
/// elided-suffix marker, if it exceeds the limit. No-op otherwise.
pub fn truncate_tool_result(content: &str, max_chars: usize) -> String {
    if content.chars().count() <= max_chars {
        return content.to_string();
    }
    let truncated: String = content.chars().take(max_chars).collect();
    format!("{truncated}... [truncated]")
}
