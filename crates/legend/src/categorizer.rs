//! Keyword-based process categorization.
//!
//! Categories are tried in a fixed order and the first one with a keyword
//! contained in the lower-cased command wins; commands matching nothing are
//! [`Category::General`].

use crate::Workflow;
use codemap_core::{Category, OperationId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Ordered keyword rules.
const RULES: &[(Category, &[&str])] = &[
    (Category::Data, &["fetch", "load", "save", "process_data", "transform"]),
    (Category::Computation, &["calculate", "compute", "analyze", "algorithm"]),
    (Category::Io, &["read", "write", "print", "input", "output"]),
    (Category::Control, &["if", "while", "for", "loop", "condition"]),
    (Category::Crypto, &["encrypt", "decrypt", "hash", "sign", "verify"]),
    (Category::Network, &["request", "response", "api", "http", "socket"]),
    (Category::Ui, &["render", "display", "show", "hide", "update"]),
    (Category::Error, &["try", "catch", "error", "exception", "handle"]),
];

/// Label used in [`ProcessCategorizer::process_tree`] for depth-0 operations.
pub const ROOT: &str = "root";

/// A categorized process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorizedProcess {
    /// Operation id
    pub id: OperationId,
    /// Original command
    pub command: String,
    /// Matched category
    pub category: Category,
    /// Keywords of the matched category found in the command
    pub keywords: Vec<String>,
    /// Parent operation
    pub parent: Option<OperationId>,
    /// Nesting depth
    pub depth: usize,
    /// Flow direction from the workflow file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<String>,
}

/// Grouping of a category's processes by id prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Subcategory {
    /// Ids starting with `A`
    Primary,
    /// Ids starting with `B`
    Secondary,
    /// Everything else
    Utility,
}

impl Subcategory {
    /// Subcategory of an operation id.
    pub fn of(id: &OperationId) -> Self {
        match id.as_str().chars().next() {
            Some('A') => Self::Primary,
            Some('B') => Self::Secondary,
            _ => Self::Utility,
        }
    }
}

/// Categorized processes plus the per-category workflow index.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkflowMap {
    /// Every process by id
    pub processes: BTreeMap<OperationId, CategorizedProcess>,
    /// Process ids grouped by category
    pub workflows: BTreeMap<Category, Vec<OperationId>>,
}

/// Category → parent label → children.
pub type ProcessTree = BTreeMap<Category, BTreeMap<String, Vec<OperationId>>>;

/// Assigns categories to commands.
pub struct ProcessCategorizer {
    rules: Vec<(Category, Vec<String>)>,
}

impl ProcessCategorizer {
    /// Create a categorizer with the built-in keyword table.
    pub fn new() -> Self {
        Self {
            rules: RULES
                .iter()
                .map(|(c, kws)| (*c, kws.iter().map(|k| k.to_string()).collect()))
                .collect(),
        }
    }

    /// Create a categorizer with a custom ordered keyword table.
    pub fn with_rules(rules: Vec<(Category, Vec<String>)>) -> Self {
        Self { rules }
    }

    /// Category for a command.
    pub fn category_of(&self, command: &str) -> Category {
        let command = command.to_lowercase();
        self.rules
            .iter()
            .find(|(_, kws)| kws.iter().any(|k| command.contains(k.as_str())))
            .map(|(c, _)| *c)
            .unwrap_or(Category::General)
    }

    /// Categorize one process.
    pub fn categorize(&self, id: &OperationId, command: &str) -> CategorizedProcess {
        let category = self.category_of(command);
        CategorizedProcess {
            id: id.clone(),
            command: command.to_string(),
            category,
            keywords: self.keywords(command, category),
            parent: id.parent(),
            depth: id.depth(),
            direction: None,
        }
    }

    fn keywords(&self, command: &str, category: Category) -> Vec<String> {
        let command = command.to_lowercase();
        self.rules
            .iter()
            .find(|(c, _)| *c == category)
            .map(|(_, kws)| {
                kws.iter()
                    .filter(|k| command.contains(k.as_str()))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Categorize every `(id, command)` pair.
    pub fn build_workflow_map<'a>(
        &self,
        workflow: impl IntoIterator<Item = (&'a OperationId, &'a str)>,
    ) -> WorkflowMap {
        let mut map = WorkflowMap::default();
        for (id, command) in workflow {
            let process = self.categorize(id, command);
            map.workflows.entry(process.category).or_default().push(id.clone());
            map.processes.insert(id.clone(), process);
        }
        map
    }

    /// Categorize every entry of a parsed workflow file, keeping directions.
    ///
    /// Commands are always categorized by keyword here; explicit categories
    /// in the file only apply when building a legend.
    pub fn map_workflow(&self, workflow: &Workflow) -> WorkflowMap {
        let mut map = self.build_workflow_map(workflow.iter().map(|(id, e)| (id, e.command.as_str())));
        for (id, entry) in workflow {
            if let Some(process) = map.processes.get_mut(id) {
                process.direction = entry.direction.clone();
            }
        }
        map
    }

    /// Processes of one category grouped by [`Subcategory`].
    pub fn subcategories(&self, map: &WorkflowMap, category: Category) -> BTreeMap<Subcategory, Vec<OperationId>> {
        let mut groups: BTreeMap<Subcategory, Vec<OperationId>> = BTreeMap::new();
        for id in map.workflows.get(&category).into_iter().flatten() {
            groups.entry(Subcategory::of(id)).or_default().push(id.clone());
        }
        groups
    }

    /// Group processes by category and then by parent.
    pub fn process_tree(&self, map: &WorkflowMap) -> ProcessTree {
        let mut tree = ProcessTree::new();
        for process in map.processes.values() {
            let parent = match &process.parent {
                Some(p) if process.depth > 0 => p.to_string(),
                _ => ROOT.to_string(),
            };
            tree.entry(process.category)
                .or_default()
                .entry(parent)
                .or_default()
                .push(process.id.clone());
        }
        tree
    }
}

impl Default for ProcessCategorizer {
    fn default() -> Self {
        Self::new()
    }
}
