//! Per-side classification counts and their text rendering.

use rowdelta_core_types::SideTag;
use serde::{Deserialize, Serialize};

use crate::diff_row::RowChange;

/// Row counts by relationship, from one side's point of view
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffSummary {
    pub new: usize,
    pub changed: usize,
    pub unchanged: usize,
    pub missing: usize,
}

impl DiffSummary {
    /// True when any row is new, changed or missing
    pub fn has_changes(&self) -> bool {
        self.new + self.changed + self.missing > 0
    }

    /// Rows held by the local side
    pub fn local_rows(&self) -> usize {
        self.new + self.changed + self.unchanged
    }

    pub(crate) fn record(&mut self, kind: RowChange) {
        match kind {
            RowChange::New => self.new += 1,
            RowChange::Changed => self.changed += 1,
            RowChange::Unchanged => self.unchanged += 1,
            RowChange::Missing => self.missing += 1,
        }
    }
}

/// Render a short Markdown summary of one side compared to the other
pub fn render_human_summary(summary: &DiffSummary, local: SideTag, foreign: SideTag) -> String {
    let mut out = String::new();

    out.push_str(&format!("## Row Diff ({local} vs {foreign})\n\n"));
    out.push_str(&format!(
        "| New | Changed | Unchanged | Missing |\n\
         |---|---|---|---|\n\
         | {} | {} | {} | {} |\n\n",
        summary.new, summary.changed, summary.unchanged, summary.missing
    ));

    if !summary.has_changes() {
        out.push_str("_No changes detected._\n");
        return out;
    }

    if summary.new > 0 {
        out.push_str(&format!(
            "- **New** ({}): present in {local} only\n",
            summary.new
        ));
    }
    if summary.changed > 0 {
        out.push_str(&format!(
            "- **Changed** ({}): value fields differ\n",
            summary.changed
        ));
    }
    if summary.missing > 0 {
        out.push_str(&format!(
            "- **Missing** ({}): present in {foreign} only\n",
            summary.missing
        ));
    }

    out
}
