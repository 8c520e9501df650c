//! Credential entry model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{LockNestError, Result};

/// Entry categories offered by the vault.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    #[default]
    General,
    Social,
    Work,
    Personal,
    Finance,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::General,
        Category::Social,
        Category::Work,
        Category::Personal,
        Category::Finance,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::General => "General",
            Category::Social => "Social",
            Category::Work => "Work",
            Category::Personal => "Personal",
            Category::Finance => "Finance",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Category {
    type Err = LockNestError;

    fn from_str(s: &str) -> Result<Self> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| LockNestError::InvalidParameters(format!("Unknown category: {}", s)))
    }
}

/// User-editable content of an entry.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryFields {
    pub title: String,
    pub username: String,
    pub secret: String,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub category: Category,
}

impl EntryFields {
    pub fn new(
        title: impl Into<String>,
        username: impl Into<String>,
        secret: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            username: username.into(),
            secret: secret.into(),
            website: None,
            notes: None,
            category: Category::default(),
        }
    }

    pub fn with_website(mut self, website: impl Into<String>) -> Self {
        self.website = Some(website.into());
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn with_category(mut self, category: Category) -> Self {
        self.category = category;
        self
    }

    /// Require title, username and secret; drop blank optional fields.
    fn normalized(mut self) -> Result<Self> {
        if self.title.trim().is_empty()
            || self.username.trim().is_empty()
            || self.secret.trim().is_empty()
        {
            return Err(LockNestError::InvalidParameters(
                "Title, username and secret are required".into(),
            ));
        }
        self.website = self.website.filter(|w| !w.trim().is_empty());
        self.notes = self.notes.filter(|n| !n.trim().is_empty());
        Ok(self)
    }
}

impl std::fmt::Debug for EntryFields {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntryFields")
            .field("title", &self.title)
            .field("username", &self.username)
            .field("secret", &"[REDACTED]")
            .field("website", &self.website)
            .field("category", &self.category)
            .finish_non_exhaustive()
    }
}

/// One stored credential.
///
/// `id` never changes after creation and `updated_at >= created_at` holds
/// across every mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialEntry {
    id: String,
    #[serde(flatten)]
    fields: EntryFields,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl CredentialEntry {
    /// Create a new entry with a fresh id.
    pub fn new(fields: EntryFields) -> Result<Self> {
        let fields = fields.normalized()?;
        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4().to_string(),
            fields,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn fields(&self) -> &EntryFields {
        &self.fields
    }

    pub fn title(&self) -> &str {
        &self.fields.title
    }

    pub fn username(&self) -> &str {
        &self.fields.username
    }

    pub fn secret(&self) -> &str {
        &self.fields.secret
    }

    pub fn website(&self) -> Option<&str> {
        self.fields.website.as_deref()
    }

    pub fn notes(&self) -> Option<&str> {
        self.fields.notes.as_deref()
    }

    pub fn category(&self) -> Category {
        self.fields.category
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Replace all editable fields and refresh `updated_at`.
    pub fn update(&mut self, fields: EntryFields) -> Result<()> {
        self.fields = fields.normalized()?;
        self.touch();
        Ok(())
    }

    /// Refresh `updated_at` to now (never earlier than `created_at`).
    pub fn touch(&mut self) {
        self.updated_at = Utc::now().max(self.created_at).max(self.updated_at);
    }

    #[cfg(test)]
    pub(crate) fn with_timestamps(
        mut self,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        self.created_at = created_at;
        self.updated_at = updated_at;
        self
    }
}
