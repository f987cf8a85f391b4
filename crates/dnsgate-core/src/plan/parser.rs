//! Run plan parsing from YAML/JSON.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use super::schema::validate_plan_schema;
use crate::network::{Network, NetworkError};

/// Default deadline for slow signals (marker content written at the end of
/// instance bootstrap).
pub const LONG_DEADLINE: Duration = Duration::from_secs(180);

/// Default deadline for fast-converging signals.
pub const SHORT_DEADLINE: Duration = Duration::from_secs(30);

/// Default pause between probe attempts.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Errors that can occur when loading run plans.
#[derive(Error, Debug)]
pub enum PlanError {
    #[error("Failed to read run plan")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse YAML")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON")]
    JsonError(#[from] serde_json::Error),

    #[error("Run plan does not match schema: {}", .0.join("; "))]
    SchemaViolation(Vec<String>),

    #[error("Run plan validation failed: {0}")]
    ValidationError(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error(transparent)]
    Network(#[from] NetworkError),
}

/// Location of an object in the object backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectLocator {
    pub bucket: String,
    pub key: String,
}

impl ObjectLocator {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }
}

impl fmt::Display for ObjectLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.bucket, self.key)
    }
}

/// How the run decides that the environment finished provisioning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Readiness {
    /// Marker object exists and its content equals `expected` exactly
    MarkerContent {
        object: ObjectLocator,
        expected: String,
    },

    /// Marker object exists, content ignored
    MarkerExists { object: ObjectLocator },

    /// The plan's log stream has at least one event
    EvidencePresent,
}

impl Readiness {
    /// Deadline used when the plan does not set one.
    pub fn default_deadline(&self) -> Duration {
        match self {
            Readiness::MarkerContent { .. } => LONG_DEADLINE,
            Readiness::MarkerExists { .. } | Readiness::EvidencePresent => SHORT_DEADLINE,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Readiness::MarkerContent { .. } => "marker_content",
            Readiness::MarkerExists { .. } => "marker_exists",
            Readiness::EvidencePresent => "evidence_present",
        }
    }
}

/// Inputs of one validation run.
///
/// Every value the run needs arrives here explicitly, usually resolved from
/// provisioning outputs by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunPlan {
    /// Label used in logs and reports
    pub name: String,

    pub readiness: Readiness,

    /// Convergence deadline; falls back to the readiness default
    #[serde(default, with = "humantime_option")]
    pub deadline: Option<Duration>,

    #[serde(default = "default_poll_interval", with = "humantime_duration")]
    pub poll_interval: Duration,

    /// Pause after convergence so the log backend can catch up
    #[serde(default, with = "humantime_duration")]
    pub settle_delay: Duration,

    /// Log stream holding DNS evidence
    pub stream: String,

    /// Network block the answers must fall into
    pub cidr: String,
}

fn default_poll_interval() -> Duration {
    DEFAULT_POLL_INTERVAL
}

mod humantime_duration {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(&humantime::format_duration(*duration))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        humantime::parse_duration(&raw).map_err(serde::de::Error::custom)
    }
}

mod humantime_option {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match duration {
            Some(d) => serializer.collect_str(&humantime::format_duration(*d)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<String>::deserialize(deserializer)?
            .map(|raw| humantime::parse_duration(&raw).map_err(serde::de::Error::custom))
            .transpose()
    }
}

impl RunPlan {
    /// Create a plan with default timing.
    pub fn new(
        name: impl Into<String>,
        readiness: Readiness,
        stream: impl Into<String>,
        cidr: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            readiness,
            deadline: None,
            poll_interval: DEFAULT_POLL_INTERVAL,
            settle_delay: Duration::ZERO,
            stream: stream.into(),
            cidr: cidr.into(),
        }
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    /// Parse a plan from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self, PlanError> {
        let value: serde_json::Value = serde_yaml::from_str(yaml)?;
        Self::from_value(value)
    }

    /// Parse a plan from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, PlanError> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        Self::from_value(value)
    }

    /// Parse a plan file; `.json` files are read as JSON, anything else as YAML.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, PlanError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json(&contents),
            _ => Self::from_yaml(&contents),
        }
    }

    fn from_value(value: serde_json::Value) -> Result<Self, PlanError> {
        validate_plan_schema(&value).map_err(PlanError::SchemaViolation)?;
        let plan: RunPlan = serde_json::from_value(value)?;
        plan.validate()?;
        Ok(plan)
    }

    /// Check the plan beyond what the schema expresses.
    pub fn validate(&self) -> Result<(), PlanError> {
        if self.name.is_empty() {
            return Err(PlanError::MissingField("name".to_string()));
        }

        if self.stream.is_empty() {
            return Err(PlanError::MissingField("stream".to_string()));
        }

        if self.poll_interval.is_zero() {
            return Err(PlanError::ValidationError(
                "poll_interval must be greater than zero".to_string(),
            ));
        }

        if self.effective_deadline() < self.poll_interval {
            tracing::warn!(
                plan = %self.name,
                deadline = %humantime::format_duration(self.effective_deadline()),
                poll_interval = %humantime::format_duration(self.poll_interval),
                "Deadline is shorter than the poll interval; at most one probe will run"
            );
        }

        self.network()?;
        Ok(())
    }

    /// Deadline after resolving the readiness default.
    pub fn effective_deadline(&self) -> Duration {
        self.deadline
            .unwrap_or_else(|| self.readiness.default_deadline())
    }

    /// Parse the plan's network block.
    pub fn network(&self) -> Result<Network, NetworkError> {
        Network::parse(&self.cidr)
    }
}
