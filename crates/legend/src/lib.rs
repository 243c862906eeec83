//! Process metadata for the CodeMap optimizer.
//!
//! This crate provides the [`MetadataProvider`] seam the optimizer reads
//! operation metadata through, an in-memory [`LocationLegend`] that
//! implements it, and the keyword [`ProcessCategorizer`].

#![warn(missing_docs)]

pub mod trait_;
pub mod categorizer;
pub mod legend;

pub use trait_::{MetadataProvider, LegendError, Result};
pub use categorizer::{CategorizedProcess, ProcessCategorizer, ProcessTree, Subcategory, WorkflowMap};
pub use legend::{LocationLegend, Workflow, WorkflowEntry};
