//! Per-domain politeness state
//!
//! `DomainState` is a pure token bucket stepped with a caller-supplied
//! clock; the async [`RateLimiter`](crate::crawler::RateLimiter) owns one
//! per domain.

mod domain_state;

pub use domain_state::DomainState;
