//! Rate limiting primitives
//!
//! Two deliberately different algorithms live here:
//! - `TokenBucket` + `LimiterRegistry`: smooth, burst-tolerant per-caller
//!   throttling for the whole API surface. Buckets are created on demand
//!   per key (client IP) and evicted by a background sweep once idle.
//! - `FixedWindowCounter`: a hard, auditable cap ("N requests per minute")
//!   with precise reset semantics, used in front of sensitive endpoints.
//!
//! Both structures are safe under concurrent access from many request
//! handlers; all locks are short-held and never cover I/O.

pub mod fixed_window;
pub mod registry;
pub mod token_bucket;

pub use fixed_window::{FixedWindowCounter, WindowDecision};
pub use registry::LimiterRegistry;
pub use token_bucket::TokenBucket;
