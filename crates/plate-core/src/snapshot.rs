use serde::{Deserialize, Serialize};

use crate::error::SnapshotError;
use crate::markup::{parse_document, serialize};
use crate::node::ElementNode;
use crate::selection::SelectionOffset;

pub const SNAPSHOT_SCHEMA: &str = "manos-plate";
pub const SNAPSHOT_VERSION: u32 = 1;

/// Saved editor state: the document, its revision and the caret as offsets.
///
/// `markup` is always written so hosts that only store markup can read a
/// snapshot without knowing the tree format. On load the tree wins; a
/// snapshot without one is rebuilt from its markup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub schema: String,
    pub version: u32,
    #[serde(default)]
    pub revision: u64,
    #[serde(default)]
    pub markup: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<ElementNode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selection: Option<SelectionOffset>,
}

impl Snapshot {
    pub(crate) fn capture(
        root: &ElementNode,
        revision: u64,
        selection: Option<SelectionOffset>,
    ) -> Self {
        Self {
            schema: SNAPSHOT_SCHEMA.to_string(),
            version: SNAPSHOT_VERSION,
            revision,
            markup: serialize(root),
            root: Some(root.clone()),
            selection,
        }
    }

    /// A snapshot holding markup only, as a host without tree support would
    /// write it.
    pub fn from_markup(markup: impl Into<String>) -> Self {
        Self {
            schema: SNAPSHOT_SCHEMA.to_string(),
            version: SNAPSHOT_VERSION,
            revision: 0,
            markup: markup.into(),
            root: None,
            selection: None,
        }
    }

    pub fn validate(&self) -> Result<(), SnapshotError> {
        if self.schema != SNAPSHOT_SCHEMA {
            return Err(SnapshotError::Schema(self.schema.clone()));
        }
        if self.version == 0 || self.version > SNAPSHOT_VERSION {
            return Err(SnapshotError::Version {
                found: self.version,
                supported: SNAPSHOT_VERSION,
            });
        }
        Ok(())
    }

    pub(crate) fn into_document(self) -> ElementNode {
        match self.root {
            Some(root) => root,
            None => parse_document(&self.markup),
        }
    }

    pub fn to_json_pretty(&self) -> Result<String, SnapshotError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json_str(s: &str) -> Result<Self, SnapshotError> {
        let snapshot: Self = serde_json::from_str(s)?;
        snapshot.validate()?;
        Ok(snapshot)
    }
}
