//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request path
//!     → path.rs (reject non-canonical paths)
//!     → router.rs (policy lookup)
//!     → matcher.rs (evaluate bypass and route conditions)
//!     → Return: RoutePolicy (bypass, open, or a configured route)
//!
//! Compilation (at startup):
//!     RouteConfig[] + BypassConfig + LimiterRegistry
//!     → Sort by priority
//!     → Compile matchers, attach limiter handles
//!     → Freeze as immutable PolicyTable
//! ```
//!
//! # Design Decisions
//! - Tables compiled at startup, immutable at runtime
//! - No regex in hot path (prefix/exact/extension matching only)
//! - Deterministic: same path always resolves to the same policy
//! - Policies are resolved on the same path the upstream receives

pub mod matcher;
pub mod path;
pub mod router;

pub use router::{PolicyTable, RoutePolicy, RoutingError};
