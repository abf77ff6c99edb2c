use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::CoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ResourceKind {
    Git,
    Svn,
    Link,
}

impl ResourceKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Git => "GIT",
            Self::Svn => "SVN",
            Self::Link => "LINK",
        }
    }

    pub fn parse(raw: &str) -> Result<Self, CoreError> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "git" => Ok(Self::Git),
            "svn" => Ok(Self::Svn),
            "link" | "url" => Ok(Self::Link),
            other => Err(CoreError::invalid_command(
                "resource-create",
                format!("unknown resource type '{other}'; expected git, svn or link"),
            )),
        }
    }

    /// Whether the resource can be checked out into the repositories directory.
    pub fn is_repository(self) -> bool {
        matches!(self, Self::Git | Self::Svn)
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    pub kind: ResourceKind,
    pub source: String,
}

impl Resource {
    pub fn new(kind: ResourceKind, source: impl Into<String>) -> Self {
        Self {
            kind,
            source: source.into(),
        }
    }
}

/// A tracked project. Link lists keep append order and may hold duplicates;
/// membership checks treat them as sets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub links: BTreeMap<String, Vec<String>>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub resources: BTreeMap<String, Resource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quick_note: Option<String>,
}

impl Project {
    pub fn has_context(&self, category: &str, context: &str) -> bool {
        self.links
            .get(category)
            .is_some_and(|contexts| contexts.iter().any(|linked| linked == context))
    }

    pub fn has_no_context_in(&self, category: &str) -> bool {
        self.links
            .get(category)
            .map_or(true, |contexts| contexts.is_empty())
    }

    pub fn note(&self) -> Option<&str> {
        non_empty_note(self.quick_note.as_deref())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quick_note: Option<String>,
}

impl ContextRecord {
    pub fn note(&self) -> Option<&str> {
        non_empty_note(self.quick_note.as_deref())
    }
}

pub type ContextRegistry = BTreeMap<String, BTreeMap<String, ContextRecord>>;

pub(crate) fn normalize_note(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_owned())
    }
}

fn non_empty_note(note: Option<&str>) -> Option<&str> {
    note.map(str::trim).filter(|note| !note.is_empty())
}
