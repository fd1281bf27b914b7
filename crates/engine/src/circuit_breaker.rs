//! Circuit breaker — spec.md §3.6 / §4.5.2: "States `closed` -> `open` ->
//! `half_open` -> `closed`. Holds `failure_count`, `success_count`,
//! `last_failure_time`." One instance per node type; wraps (never nests
//! inside) the retry loop in `scheduler.rs`.

use std::collections::HashMap;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    pub failure_threshold: u32,
    pub cooldown: Duration,
    pub half_open_attempts: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self { failure_threshold: 5, cooldown: Duration::from_secs(30), half_open_attempts: 2 }
    }
}

#[derive(Debug)]
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    state: BreakerState,
    failure_count: u32,
    success_count: u32,
    last_failure: Option<Instant>,
}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self { config, state: BreakerState::Closed, failure_count: 0, success_count: 0, last_failure: None }
    }

    pub fn state(&self) -> BreakerState {
        self.state
    }

    /// Called before each attempt (spec.md §4.5.2: "Before the first
    /// attempt, consult the type's CircuitBreaker"). Transitions
    /// `open -> half_open` once the cooldown has elapsed; otherwise fails
    /// fast while `open`.
    pub fn before_call(&mut self) -> Result<(), ()> {
        match self.state {
            BreakerState::Closed | BreakerState::HalfOpen => Ok(()),
            BreakerState::Open => {
                let cooldown_elapsed = self.last_failure.map(|t| t.elapsed() >= self.config.cooldown).unwrap_or(true);
                if cooldown_elapsed {
                    self.state = BreakerState::HalfOpen;
                    self.success_count = 0;
                    Ok(())
                } else {
                    Err(())
                }
            }
        }
    }

    pub fn record_success(&mut self) {
        match self.state {
            BreakerState::HalfOpen => {
                self.success_count += 1;
                if self.success_count >= self.config.half_open_attempts {
                    self.state = BreakerState::Closed;
                    self.failure_count = 0;
                    self.success_count = 0;
                }
            }
            BreakerState::Closed => self.failure_count = 0,
            BreakerState::Open => {}
        }
    }

    pub fn record_failure(&mut self) {
        self.last_failure = Some(Instant::now());
        match self.state {
            BreakerState::HalfOpen => {
                self.state = BreakerState::Open;
                self.success_count = 0;
            }
            BreakerState::Closed => {
                self.failure_count += 1;
                if self.failure_count >= self.config.failure_threshold {
                    self.state = BreakerState::Open;
                }
            }
            BreakerState::Open => {}
        }
    }
}

/// One breaker per node type, created lazily on first use.
#[derive(Default)]
pub struct CircuitBreakers {
    config: CircuitBreakerConfig,
    by_type: HashMap<String, CircuitBreaker>,
}

impl CircuitBreakers {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self { config, by_type: HashMap::new() }
    }

    pub fn for_type(&mut self, node_type: &str) -> &mut CircuitBreaker {
        self.by_type
            .entry(node_type.to_string())
            .or_insert_with(|| CircuitBreaker::new(self.config.clone()))
    }
}
