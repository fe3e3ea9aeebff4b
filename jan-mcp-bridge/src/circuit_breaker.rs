//! Per-provider circuit breaker (spec §4.2.5): closed → open → half-open.
//!
//! One breaker per external MCP provider, shared across requests via `Arc`.
//! State transitions are driven entirely by atomics so `record_success`/
//! `record_failure` never need to hold a lock across an await point.

use std::sync::atomic::{AtomicU32, AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug, Clone, Copy)]
pub struct CircuitBreakerConfig {
    pub failure_threshold: u32,
    pub success_threshold: u32,
    pub timeout: Duration,
    pub max_half_open: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 15,
            success_threshold: 5,
            timeout: Duration::from_secs(45),
            max_half_open: 10,
        }
    }
}

const CLOSED: u8 = 0;
const OPEN: u8 = 1;
const HALF_OPEN: u8 = 2;

/// Circuit breaker for one provider. All counters are atomic so calls may
/// race freely; `should_allow` is the single admission decision point.
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    state: AtomicU8Wrap,
    consecutive_failures: AtomicU32,
    consecutive_successes: AtomicU32,
    opened_at_millis: AtomicU64,
    half_open_in_flight: AtomicUsize,
    epoch: Instant,
}

/// `AtomicU8` wasn't stabilized with the ops we want pre-1.70 uniformly across
/// targets; wrapping in a plain atomic keeps the state transitions explicit.
struct AtomicU8Wrap(std::sync::atomic::AtomicU8);

impl AtomicU8Wrap {
    fn new(v: u8) -> Self {
        Self(std::sync::atomic::AtomicU8::new(v))
    }
    fn load(&self) -> u8 {
        self.0.load(Ordering::SeqCst)
    }
    fn store(&self, v: u8) {
        self.0.store(v, Ordering::SeqCst)
    }
    fn compare_exchange(&self, current: u8, new: u8) -> bool {
        self.0
            .compare_exchange(current, new, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }
}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            state: AtomicU8Wrap::new(CLOSED),
            consecutive_failures: AtomicU32::new(0),
            consecutive_successes: AtomicU32::new(0),
            opened_at_millis: AtomicU64::new(0),
            half_open_in_flight: AtomicUsize::new(0),
            epoch: Instant::now(),
        }
    }

    fn now_millis(&self) -> u64 {
        self.epoch.elapsed().as_millis() as u64
    }

    pub fn state(&self) -> CircuitState {
        match self.state.load() {
            OPEN => CircuitState::Open,
            HALF_OPEN => CircuitState::HalfOpen,
            _ => CircuitState::Closed,
        }
    }

    /// Call before dispatching a request. Returns `true` if the call is
    /// admitted (closed, or a half-open probe slot is free); `false` if the
    /// breaker is open and the timeout hasn't elapsed.
    pub fn should_allow(&self) -> bool {
        match self.state.load() {
            CLOSED => true,
            OPEN => {
                let opened_at = self.opened_at_millis.load(Ordering::SeqCst);
                if self.now_millis().saturating_sub(opened_at)
                    >= self.config.timeout.as_millis() as u64
                {
                    if self.state.compare_exchange(OPEN, HALF_OPEN) {
                        self.half_open_in_flight.store(0, Ordering::SeqCst);
                        self.consecutive_successes.store(0, Ordering::SeqCst);
                    }
                    self.admit_half_open_probe()
                } else {
                    false
                }
            }
            _ => self.admit_half_open_probe(),
        }
    }

    fn admit_half_open_probe(&self) -> bool {
        let slot = self.half_open_in_flight.fetch_add(1, Ordering::SeqCst);
        if slot < self.config.max_half_open as usize {
            true
        } else {
            self.half_open_in_flight.fetch_sub(1, Ordering::SeqCst);
            false
        }
    }

    pub fn record_success(&self) {
        self.consecutive_failures.store(0, Ordering::SeqCst);
        match self.state.load() {
            HALF_OPEN => {
                let successes = self.consecutive_successes.fetch_add(1, Ordering::SeqCst) + 1;
                if successes >= self.config.success_threshold {
                    self.state.store(CLOSED);
                    self.consecutive_successes.store(0, Ordering::SeqCst);
                }
            }
            _ => {}
        }
    }

    pub fn record_failure(&self) {
        match self.state.load() {
            HALF_OPEN => {
                self.trip();
            }
            CLOSED => {
                let failures = self.consecutive_failures.fetch_add(1, Ordering::SeqCst) + 1;
                if failures > self.config.failure_threshold {
                    self.trip();
                }
            }
            _ => {}
        }
    }

    fn trip(&self) {
        self.opened_at_millis.store(self.now_millis(), Ordering::SeqCst);
        self.state.store(OPEN);
        self.consecutive_failures.store(0, Ordering::SeqCst);
        self.consecutive_successes.store(0, Ordering::SeqCst);
    }
}
