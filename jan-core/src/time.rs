//! Timestamp helpers used by the Response and Realtime Session lifecycles.

use chrono::{DateTime, Utc};

/// The current instant, in UTC. Centralized so tests can be written against a
/// fixed clock by constructing timestamps directly rather than calling this.
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Elapsed time since `since`, saturating at zero if the clock moved backwards.
pub fn age(since: DateTime<Utc>) -> chrono::Duration {
    let elapsed = now() - since;
    if elapsed < chrono::Duration::zero() {
        chrono::Duration::zero()
    } else {
        elapsed
    }
}
