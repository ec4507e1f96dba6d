//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request (driven by http::middleware::admission):
//!     → cors.rs (preflight, origin allow-list)
//!     → client_ip.rs (caller identity)
//!     → rate_limit.rs (per-route limiter over window.rs)
//!     → auth gate
//!     → headers.rs (security headers on the way out)
//! ```
//!
//! # Design Decisions
//! - Fail closed: reject on any security check failure
//! - Rejections are generic; details go to the log only
//! - All state is in-process; nothing is shared between gate instances

pub mod client_ip;
pub mod cors;
pub mod headers;
pub mod rate_limit;
pub mod window;
