//! Core domain types for Runoff scenario runs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Current schema version for the provenance record format.
pub const PROVENANCE_SCHEMA_VERSION: u32 = 1;

// ---------------------------------------------------------------------------
// RunId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper for scenario run identifiers (time-sortable).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub Uuid);

impl RunId {
    /// Generate a new time-sortable run identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for RunId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

// ---------------------------------------------------------------------------
// RasterHandle
// ---------------------------------------------------------------------------

/// Whether a raster outlives the run that created it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RasterKind {
    /// Scratch raster owned by a single run, removed at teardown.
    Ephemeral,
    /// Output raster owned by the caller's mapset after the run.
    Persistent,
}

/// A named raster in the toolkit's active mapset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RasterHandle {
    /// Raster name, unique within the mapset for the duration of a run.
    pub name: String,
    /// Lifetime class of the raster.
    pub kind: RasterKind,
}

impl RasterHandle {
    /// Handle for a scratch raster removed at teardown.
    pub fn ephemeral(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: RasterKind::Ephemeral,
        }
    }

    /// Handle for an output raster that outlives the run.
    pub fn persistent(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: RasterKind::Persistent,
        }
    }
}

impl std::fmt::Display for RasterHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

// ---------------------------------------------------------------------------
// ProvenanceRecord
// ---------------------------------------------------------------------------

/// Parameters recorded into the output raster's history, so a depth map
/// can always be traced back to the scenario that produced it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvenanceRecord {
    /// Schema version for forward compatibility.
    pub schema_version: u32,
    /// Run that produced the output.
    pub run_id: RunId,
    /// Tool version that ran the scenario.
    pub tool_version: String,
    /// Input elevation raster.
    pub elevation: String,
    /// Uniform rainfall rate (mm/hr).
    pub rainfall_rate: f64,
    /// Worker count handed to the simulation.
    pub nprocs: u32,
    /// Random seed, if the caller fixed one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<i64>,
    /// Minimum retained depth (m), present only when filtering was applied.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_depth: Option<f64>,
    /// When the run finished.
    pub finished_at: DateTime<Utc>,
}

impl ProvenanceRecord {
    /// Render the record as a single history line.
    pub fn to_history_line(&self) -> String {
        // serde_json can only fail on non-string map keys, which this
        // struct does not have.
        serde_json::to_string(self).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_id_roundtrip() {
        let id = RunId::new();
        let s = id.to_string();
        let parsed: RunId = s.parse().expect("parse RunId");
        assert_eq!(id, parsed);
    }

    #[test]
    fn raster_handle_constructors() {
        let scratch = RasterHandle::ephemeral("dx_42_0");
        assert_eq!(scratch.kind, RasterKind::Ephemeral);
        assert_eq!(scratch.to_string(), "dx_42_0");

        let output = RasterHandle::persistent("depth");
        assert_eq!(output.kind, RasterKind::Persistent);
    }

    #[test]
    fn provenance_serialization() {
        let record = ProvenanceRecord {
            schema_version: PROVENANCE_SCHEMA_VERSION,
            run_id: RunId::new(),
            tool_version: "0.1.0".into(),
            elevation: "elevation".into(),
            rainfall_rate: 10.0,
            nprocs: 30,
            seed: Some(42),
            min_depth: None,
            finished_at: Utc::now(),
        };

        let line = record.to_history_line();
        assert!(line.contains(r#""elevation":"elevation""#));
        assert!(line.contains(r#""seed":42"#));
        assert!(!line.contains("min_depth"));

        let parsed: ProvenanceRecord = serde_json::from_str(&line).expect("deserialize");
        assert_eq!(parsed.schema_version, PROVENANCE_SCHEMA_VERSION);
        assert_eq!(parsed.rainfall_rate, 10.0);
    }
}
