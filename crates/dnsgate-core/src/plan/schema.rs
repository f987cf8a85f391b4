//! Structural checks for run plans.
//!
//! Plans are checked against the embedded draft-07 schema before typed
//! deserialization, so every structural problem is reported in one pass,
//! each located by the JSON pointer of the offending value.

use serde_json::Value;
use std::fmt;
use std::sync::OnceLock;

const RUN_PLAN_SCHEMA: &str = include_str!("../../../../schema/run-plan.schema.json");

static COMPILED: OnceLock<Result<jsonschema::Validator, String>> = OnceLock::new();

/// One place where a plan document breaks the schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanViolation {
    /// JSON pointer to the offending value; empty for the document root
    pub pointer: String,
    pub message: String,
}

impl fmt::Display for PlanViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let at = if self.pointer.is_empty() {
            "(root)"
        } else {
            self.pointer.as_str()
        };
        write!(f, "{}: {}", at, self.message)
    }
}

fn compiled() -> Result<&'static jsonschema::Validator, &'static str> {
    COMPILED
        .get_or_init(|| {
            let raw: Value = serde_json::from_str(RUN_PLAN_SCHEMA)
                .map_err(|e| format!("embedded run-plan schema is not JSON: {}", e))?;
            jsonschema::draft7::new(&raw)
                .map_err(|e| format!("embedded run-plan schema does not compile: {}", e))
        })
        .as_ref()
        .map_err(String::as_str)
}

/// Every violation in a plan document, ordered by location.
///
/// A schema that fails to load is reported as a single root violation.
pub fn plan_violations(plan: &Value) -> Vec<PlanViolation> {
    let validator = match compiled() {
        Ok(v) => v,
        Err(reason) => {
            return vec![PlanViolation {
                pointer: String::new(),
                message: reason.to_string(),
            }]
        }
    };

    let mut found: Vec<PlanViolation> = validator
        .iter_errors(plan)
        .map(|e| PlanViolation {
            pointer: e.instance_path.to_string(),
            message: e.to_string(),
        })
        .collect();
    found.sort_by(|a, b| a.pointer.cmp(&b.pointer));
    found
}

/// Check a plan document, rendering violations as messages.
pub fn validate_plan_schema(plan: &Value) -> Result<(), Vec<String>> {
    let found = plan_violations(plan);
    if found.is_empty() {
        Ok(())
    } else {
        Err(found.iter().map(PlanViolation::to_string).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_plan_passes_schema() {
        let value = serde_json::json!({
            "name": "simple",
            "readiness": {
                "kind": "marker_content",
                "object": { "bucket": "b", "key": "done.txt" },
                "expected": "done\n"
            },
            "deadline": "3m",
            "stream": "/dns/queries",
            "cidr": "10.0.0.0/16"
        });

        assert!(validate_plan_schema(&value).is_ok());
    }

    #[test]
    fn test_evidence_present_needs_no_object() {
        let value = serde_json::json!({
            "name": "logs",
            "readiness": { "kind": "evidence_present" },
            "stream": "/dns/queries",
            "cidr": "10.0.0.0/16"
        });

        assert!(validate_plan_schema(&value).is_ok());
    }

    #[test]
    fn test_missing_fields_fail_schema() {
        let value = serde_json::json!({
            "name": "incomplete",
            "readiness": { "kind": "marker_exists" }
        });

        let errors = validate_plan_schema(&value).unwrap_err();
        assert!(!errors.is_empty());
    }

    #[test]
    fn test_unknown_readiness_kind_fails_schema() {
        let value = serde_json::json!({
            "name": "x",
            "readiness": { "kind": "wait_forever" },
            "stream": "s",
            "cidr": "10.0.0.0/16"
        });

        assert!(validate_plan_schema(&value).is_err());
    }

    #[test]
    fn test_violations_are_located() {
        let value = serde_json::json!({
            "name": "x",
            "readiness": { "kind": "evidence_present" },
            "stream": "s",
            "cidr": "10.0.0.0/16",
            "poll_interval": 5
        });

        let found = plan_violations(&value);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].pointer, "/poll_interval");
        assert!(found[0].to_string().starts_with("/poll_interval: "));
    }

    #[test]
    fn test_unknown_field_fails_schema() {
        let value = serde_json::json!({
            "name": "x",
            "readiness": { "kind": "evidence_present" },
            "stream": "s",
            "cidr": "10.0.0.0/16",
            "region": "us-east-1"
        });

        let errors = validate_plan_schema(&value).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].starts_with("(root): "));
    }
}
