//! Shared exchange-client machinery

mod rate_limiter;

pub use rate_limiter::RateLimiter;
