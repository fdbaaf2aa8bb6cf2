//! # Evalia Core
//!
//! Shared foundation for the Evalia workspace: the evaluation-period data
//! model with its forward-only status transition table, the TOML
//! configuration system, and the core error type.

pub mod config;
pub mod error;
pub mod period;

pub use config::{DatabaseConfig, EvaliaConfig, GatewayConfig};
pub use error::{CoreError, Result};
pub use period::{Evaluation, EvaluationPeriod, PeriodStatus};
