//! Side tags for the two halves of a diff

use serde::{Deserialize, Serialize};

/// One of the two datasets being compared
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SideTag {
    A,
    B,
}

impl SideTag {
    /// The other side of the pair
    pub fn counterpart(self) -> SideTag {
        match self {
            SideTag::A => SideTag::B,
            SideTag::B => SideTag::A,
        }
    }

    /// Stable storage/log representation
    pub fn as_str(self) -> &'static str {
        match self {
            SideTag::A => "a",
            SideTag::B => "b",
        }
    }

    /// Parse the storage representation (case-insensitive)
    pub fn parse(s: &str) -> Option<SideTag> {
        match s.trim() {
            "a" | "A" => Some(SideTag::A),
            "b" | "B" => Some(SideTag::B),
            _ => None,
        }
    }
}

impl std::fmt::Display for SideTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
