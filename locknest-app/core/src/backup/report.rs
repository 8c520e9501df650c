//! Plain report of the vault grouped by category, for printing or
//! document export.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::vault::{Category, CredentialEntry};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRow {
    pub title: String,
    pub username: String,
    /// Present only in reports that reveal secrets.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
    pub website: Option<String>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSection {
    pub category: Category,
    pub rows: Vec<ReportRow>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSnapshot {
    pub generated_at: DateTime<Utc>,
    pub reveal_secrets: bool,
    pub sections: Vec<ReportSection>,
}

impl ReportSnapshot {
    /// Group `entries` (already newest first) by category name.
    pub(crate) fn build(entries: &[CredentialEntry], reveal_secrets: bool) -> Self {
        let mut categories: Vec<Category> = entries.iter().map(|e| e.category()).collect();
        categories.sort_by_key(|c| c.as_str());
        categories.dedup();

        let sections = categories
            .into_iter()
            .map(|category| ReportSection {
                category,
                rows: entries
                    .iter()
                    .filter(|e| e.category() == category)
                    .map(|e| ReportRow {
                        title: e.title().to_string(),
                        username: e.username().to_string(),
                        secret: reveal_secrets.then(|| e.secret().to_string()),
                        website: e.website().map(str::to_string),
                        updated_at: e.updated_at(),
                    })
                    .collect(),
            })
            .collect();

        Self {
            generated_at: Utc::now(),
            reveal_secrets,
            sections,
        }
    }

    pub fn entry_count(&self) -> usize {
        self.sections.iter().map(|s| s.rows.len()).sum()
    }

    /// Render as plain text, one block per category.
    pub fn render_text(&self) -> String {
        let mut out = String::from("LockNest Password Export\n");
        out.push_str(&format!(
            "Generated on: {}\n",
            self.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
        ));
        if self.reveal_secrets {
            out.push_str(
                "SECURITY WARNING: This document contains your actual passwords. Keep it secure!\n",
            );
        }

        for section in &self.sections {
            out.push_str(&format!("\n[{}]\n", section.category));
            for row in &section.rows {
                out.push_str(&format!("  {} | {}", row.title, row.username));
                if let Some(secret) = &row.secret {
                    out.push_str(&format!(" | {}", secret));
                }
                out.push_str(&format!(" | {}\n", row.website.as_deref().unwrap_or("")));
            }
        }
        out
    }
}
