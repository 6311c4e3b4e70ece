use serde::{Deserialize, Serialize};
use std::fmt;

use crate::model::node::InvariantViolation;

/// Storage identity of a content payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentId(pub i64);

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The payload a node displays. Has its own identity and is created before
/// the node that references it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Content {
    pub id: ContentId,
    pub title: String,
    pub description: String,
    pub link: String,
    pub created_at_us: i64,
    pub updated_at_us: i64,
}

/// A payload that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewContent {
    title: String,
    description: String,
    link: String,
}

impl NewContent {
    /// # Errors
    ///
    /// Returns [`InvariantViolation::EmptyTitle`] when `title` is blank.
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        link: impl Into<String>,
    ) -> Result<Self, InvariantViolation> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(InvariantViolation::EmptyTitle);
        }
        Ok(Self {
            title,
            description: description.into(),
            link: link.into(),
        })
    }

    /// Title-only payload.
    ///
    /// # Errors
    ///
    /// Returns [`InvariantViolation::EmptyTitle`] when `title` is blank.
    pub fn titled(title: impl Into<String>) -> Result<Self, InvariantViolation> {
        Self::new(title, "", "")
    }

    /// Fresh payload carrying the same fields as `content`.
    #[must_use]
    pub fn duplicate_of(content: &Content) -> Self {
        Self {
            title: content.title.clone(),
            description: content.description.clone(),
            link: content.link.clone(),
        }
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    #[must_use]
    pub fn link(&self) -> &str {
        &self.link
    }
}

/// Partial edit of a payload; `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub link: Option<String>,
}

impl ContentPatch {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none() && self.link.is_none()
    }

    /// Resulting payload after applying the patch to `content`.
    ///
    /// # Errors
    ///
    /// Returns [`InvariantViolation::EmptyTitle`] if the patch blanks the title.
    pub fn apply(&self, content: &Content) -> Result<NewContent, InvariantViolation> {
        NewContent::new(
            self.title.clone().unwrap_or_else(|| content.title.clone()),
            self.description
                .clone()
                .unwrap_or_else(|| content.description.clone()),
            self.link.clone().unwrap_or_else(|| content.link.clone()),
        )
    }
}
