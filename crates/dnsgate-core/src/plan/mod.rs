//! Run plans: the configuration surface of one validation run.
//!
//! Plans are structured data validated against JSON Schema. This module
//! handles parsing YAML/JSON plans and validating them.

mod parser;
mod schema;

pub use parser::{
    ObjectLocator, PlanError, Readiness, RunPlan, DEFAULT_POLL_INTERVAL, LONG_DEADLINE,
    SHORT_DEADLINE,
};
pub use schema::{plan_violations, validate_plan_schema, PlanViolation};
