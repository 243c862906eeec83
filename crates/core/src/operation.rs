//! Operations: metadata, execution outcomes and cache entries.

use crate::{Category, OperationId, Time};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Position of an operation on the spiral map.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Coordinates(pub [f64; 3]);

/// What the location legend knows about an operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessMetadata {
    /// Assigned category
    pub category: Category,

    /// Command the operation runs
    pub command: String,

    /// Spiral coordinates
    #[serde(default)]
    pub coordinates: Coordinates,
}

impl ProcessMetadata {
    /// Create metadata at the origin.
    pub fn new(category: Category, command: impl Into<String>) -> Self {
        Self {
            category,
            command: command.into(),
            coordinates: Coordinates::default(),
        }
    }

    /// Set the coordinates.
    pub fn with_coordinates(mut self, coordinates: Coordinates) -> Self {
        self.coordinates = coordinates;
        self
    }
}

/// Result of executing one operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationOutcome {
    /// Which operation
    pub operation: OperationId,

    /// Command that was run
    pub command: String,

    /// Captured output
    pub output: String,

    /// Whether the run succeeded
    pub success: bool,

    /// Wall-clock time of the single call
    pub duration: Duration,

    /// Failure reason, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Energy cost reported by the runner
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub energy_cost: Option<f64>,
}

impl OperationOutcome {
    /// A failed outcome with a reason.
    pub fn failed(
        operation: OperationId,
        command: impl Into<String>,
        error: impl Into<String>,
        duration: Duration,
    ) -> Self {
        Self {
            operation,
            command: command.into(),
            output: String::new(),
            success: false,
            duration,
            error: Some(error.into()),
            energy_cost: None,
        }
    }
}

/// A cached operation result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Owning operation
    pub operation: OperationId,

    /// Category whose policy decides expiry
    pub category: Category,

    /// Cached result
    pub result: OperationOutcome,

    /// When the result was stored
    pub created_at: Time,

    /// Coordinates of the operation when cached
    pub coordinates: Coordinates,
}

impl CacheEntry {
    /// Age of the entry at `now`; zero if `now` precedes creation.
    pub fn age(&self, now: Time) -> Duration {
        (now - self.created_at).to_std().unwrap_or(Duration::ZERO)
    }

    /// Whether the entry has outlived `ttl` at `now`.
    pub fn is_expired(&self, ttl: Duration, now: Time) -> bool {
        self.age(now) > ttl
    }
}
