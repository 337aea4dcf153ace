#![forbid(unsafe_code)]

//! Structured logging re-exports.
//!
//! Stratum logs through `tracing`. Membership changes and registry edits are
//! emitted at `debug`, individual commits at `trace`, and contract misuse at
//! `warn`. Install any `tracing` subscriber to see them.

pub use tracing::{
    Level, debug, debug_span, error, error_span, info, info_span, trace, trace_span, warn,
    warn_span,
};
