use serde::{Deserialize, Serialize};

use crate::selection::SelectionOffset;

/// Emitted to the change listener whenever a command alters the markup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    pub revision: u64,
    pub markup: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selection: Option<SelectionOffset>,
    #[serde(default)]
    pub meta: CommitMeta,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl Commit {
    pub fn new(revision: u64, markup: String) -> Self {
        Self {
            revision,
            markup,
            selection: None,
            meta: CommitMeta::default(),
        }
    }

    pub fn selection(mut self, selection: Option<SelectionOffset>) -> Self {
        self.selection = selection;
        self
    }

    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.meta.source = Some(source.into());
        self
    }
}
