//! In-memory location legend.
//!
//! The legend is the optimizer's view of the workflow: for every operation it
//! holds the category, the command, and where the operation sits on the
//! spiral map. It is loaded from a JSON workflow file of the form
//!
//! ```json
//! {
//!   "A1":   { "command": "load users" },
//!   "A1.1": { "command": "hash passwords", "category": "crypto", "coordinates": [10.0, 0.0, 0.0] }
//! }
//! ```
//!
//! Entries without an explicit category go through the [`ProcessCategorizer`].

use crate::{LegendError, MetadataProvider, ProcessCategorizer, Result};
use codemap_core::{Category, Coordinates, OperationId, ProcessMetadata};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use tracing::{debug, info};

/// One entry of a workflow file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowEntry {
    /// Command the operation runs
    pub command: String,

    /// Explicit category; derived from the command when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    /// Spiral coordinates
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<Coordinates>,

    /// Flow direction label, informational
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<String>,

    /// Child operation ids, informational
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subprocesses: Vec<OperationId>,
}

/// A parsed workflow file, ordered by operation id.
pub type Workflow = BTreeMap<OperationId, WorkflowEntry>;

/// Operation metadata keyed by id.
#[derive(Debug, Clone, Default)]
pub struct LocationLegend {
    locations: HashMap<OperationId, ProcessMetadata>,
    order: Vec<OperationId>,
}

impl LocationLegend {
    /// Create an empty legend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace an operation.
    pub fn insert(&mut self, id: OperationId, metadata: ProcessMetadata) {
        if self.locations.insert(id.clone(), metadata).is_none() {
            self.order.push(id);
        }
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with(mut self, id: impl Into<OperationId>, metadata: ProcessMetadata) -> Self {
        self.insert(id.into(), metadata);
        self
    }

    /// Build a legend from parsed workflow entries.
    pub fn from_workflow(workflow: &Workflow, categorizer: &ProcessCategorizer) -> Result<Self> {
        let mut legend = Self::new();
        for (id, entry) in workflow {
            let category = match &entry.category {
                Some(name) => name.parse::<Category>().map_err(|source| LegendError::Category {
                    operation: id.clone(),
                    source,
                })?,
                None => categorizer.category_of(&entry.command),
            };
            debug!("Legend entry {} -> {}", id, category);
            let meta = ProcessMetadata::new(category, entry.command.clone())
                .with_coordinates(entry.coordinates.unwrap_or_default());
            legend.insert(id.clone(), meta);
        }
        Ok(legend)
    }

    /// Parse a workflow JSON document.
    pub fn from_json(json: &str, categorizer: &ProcessCategorizer) -> Result<Self> {
        let workflow: Workflow = serde_json::from_str(json)?;
        Self::from_workflow(&workflow, categorizer)
    }

    /// Load a workflow JSON file.
    pub async fn load(path: impl AsRef<Path>, categorizer: &ProcessCategorizer) -> Result<Self> {
        let path = path.as_ref();
        let json = tokio::fs::read_to_string(path).await?;
        let legend = Self::from_json(&json, categorizer)?;
        info!("Loaded {} operations from {}", legend.len(), path.display());
        Ok(legend)
    }

    /// Operation ids in insertion order.
    pub fn ids(&self) -> &[OperationId] {
        &self.order
    }

    /// Number of operations.
    pub fn len(&self) -> usize {
        self.locations.len()
    }

    /// Whether the legend is empty.
    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }
}

impl MetadataProvider for LocationLegend {
    fn lookup(&self, id: &OperationId) -> Option<ProcessMetadata> {
        self.locations.get(id).cloned()
    }

    fn category_counts(&self) -> HashMap<Category, usize> {
        let mut counts = HashMap::new();
        for meta in self.locations.values() {
            *counts.entry(meta.category).or_insert(0) += 1;
        }
        counts
    }
}
