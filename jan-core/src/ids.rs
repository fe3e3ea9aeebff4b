//! Public id generation: every external-facing id is a short prefix plus a
//! lowercased ULID, e.g. `resp_01hq...`, `jan_01hq...`.

use ulid::Ulid;

fn new_id(prefix: &str) -> String {
    format!("{prefix}_{}", Ulid::new().to_string().to_lowercase())
}

/// A `resp_…` id for a Response (spec §3.1).
pub fn new_response_id() -> String {
    new_id("resp")
}

/// A `jan_…` id for a Media Object (spec §3.4) or a realtime session (spec §3.3).
pub fn new_jan_id() -> String {
    new_id("jan")
}

/// Strips a known prefix from a public id, e.g. for logging without leaking the
/// full id, or to validate shape before a lookup.
pub fn has_prefix(id: &str, prefix: &str) -> bool {
    id.starts_with(prefix) && id.len() > prefix.len() + 1 && id.as_bytes()[prefix.len()] == b'_'
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_ids_carry_the_resp_prefix() {
        let id = new_response_id();
        assert!(id.starts_with("resp_"));
        assert!(has_prefix(&id, "resp"));
    }

    #[test]
    fn jan_ids_carry_the_jan_prefix_and_are_lowercase() {
        let id = new_jan_id();
        assert!(id.starts_with("jan_"));
        assert_eq!(id, id.to_lowercase());
    }

    #[test]
    fn ids_are_unique_across_calls() {
        let a = new_response_id();
        let b = new_response_id();
        assert_ne!(a, b);
    }
}
