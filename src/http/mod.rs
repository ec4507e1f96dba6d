//! HTTP protocol handling subsystem.
//!
//! ```text
//! TCP connection
//!     → server.rs (request id, tracing, timeout, body limit)
//!     → middleware/admission.rs (preflight, bypass, CORS, rate limit, auth gate)
//!     → gate handlers (login/logout/status, health) or upstream forward
//!     → response.rs (rejections, hop-by-hop stripping)
//! ```

pub mod middleware;
pub mod request;
pub mod response;
pub mod server;

pub use request::{MakeRequestUuidV4, X_REQUEST_ID};
pub use server::{AppState, HttpServer, ServerError};
