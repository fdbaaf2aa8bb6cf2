//! # Evalia Gateway
//!
//! HTTP surface for the period-status lifecycle: the reconcile endpoints
//! (manual/scheduled sweeps, dry-run inspection), period administration, and
//! evaluation recording. An upstream auth proxy resolves sessions and
//! forwards the caller's role in a header; this crate only enforces the
//! role gate.

pub mod routes;
pub mod server;

pub use server::{AppState, build_router, start};
