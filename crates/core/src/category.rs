//! Operation categories.

use serde::{Deserialize, Serialize};

/// Category an operation is classified into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Loading, saving and transforming data
    Data,
    /// Pure calculation
    Computation,
    /// Local input/output
    Io,
    /// Branches and loops
    Control,
    /// Hashing, signing, encryption
    Crypto,
    /// Remote requests
    Network,
    /// Rendering and display
    Ui,
    /// Error handling
    Error,
    /// Anything unclassified
    General,
}

impl Category {
    /// Every category, in declaration order.
    pub const ALL: [Category; 9] = [
        Category::Data,
        Category::Computation,
        Category::Io,
        Category::Control,
        Category::Crypto,
        Category::Network,
        Category::Ui,
        Category::Error,
        Category::General,
    ];

    /// Lower-case name used in serialized form.
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Data => "data",
            Category::Computation => "computation",
            Category::Io => "io",
            Category::Control => "control",
            Category::Crypto => "crypto",
            Category::Network => "network",
            Category::Ui => "ui",
            Category::Error => "error",
            Category::General => "general",
        }
    }
}

impl Default for Category {
    fn default() -> Self {
        Category::General
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string names no known category.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown category: {0}")]
pub struct UnknownCategory(pub String);

impl std::str::FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == lower)
            .ok_or(UnknownCategory(s.to_string()))
    }
}
