//! HTTP middleware stack for the checkout proxy.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (hub per request, HTTP transaction)
//! 2. `TraceLayer` (request span)
//! 3. Request ID (add unique ID to each request)
//! 4. Rate limiting (governor), checkout API only

pub mod rate_limit;
pub mod request_id;

pub use rate_limit::checkout_rate_limiter;
pub use request_id::request_id_middleware;
