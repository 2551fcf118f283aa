use crate::error::CatalogError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Opaque identity of a status row in the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatusId(pub u32);

/// Status tags the cleanup commands know how to apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StatusTag {
    IncorrectInvNoInFilename,
    DuplicatedInSource,
    InvalidVault,
    InvalidInvNo,
    MultipleInventoryNos,
    MultipleCorrespondingInvNo,
    NeedsReview,
}

impl StatusTag {
    pub const ALL: [StatusTag; 7] = [
        StatusTag::IncorrectInvNoInFilename,
        StatusTag::DuplicatedInSource,
        StatusTag::InvalidVault,
        StatusTag::InvalidInvNo,
        StatusTag::MultipleInventoryNos,
        StatusTag::MultipleCorrespondingInvNo,
        StatusTag::NeedsReview,
    ];

    pub fn label(self) -> &'static str {
        match self {
            StatusTag::IncorrectInvNoInFilename => "Incorrect inv no in filename",
            StatusTag::DuplicatedInSource => "Duplicated in source data",
            StatusTag::InvalidVault => "Invalid vault",
            StatusTag::InvalidInvNo => "Invalid inv no",
            StatusTag::MultipleInventoryNos => "Multiple inventory numbers",
            StatusTag::MultipleCorrespondingInvNo => "Multiple corresponding inventory number",
            StatusTag::NeedsReview => "Needs review",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEntry {
    pub id: StatusId,
    pub status: String,
}

/// Label to id mapping, pre-seeded when a store is created.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusCatalog {
    by_label: BTreeMap<String, StatusId>,
}

impl StatusCatalog {
    pub fn seeded() -> Self {
        let entries = StatusTag::ALL
            .iter()
            .enumerate()
            .map(|(idx, tag)| StatusEntry {
                id: StatusId(idx as u32 + 1),
                status: tag.label().to_string(),
            })
            .collect::<Vec<_>>();
        Self::from_entries(&entries)
    }

    pub fn from_entries(entries: &[StatusEntry]) -> Self {
        let by_label = entries
            .iter()
            .map(|entry| (entry.status.clone(), entry.id))
            .collect();
        Self { by_label }
    }

    pub fn entries(&self) -> Vec<StatusEntry> {
        let mut out = self
            .by_label
            .iter()
            .map(|(status, id)| StatusEntry {
                id: *id,
                status: status.clone(),
            })
            .collect::<Vec<_>>();
        out.sort_by_key(|entry| entry.id);
        out
    }

    pub fn len(&self) -> usize {
        self.by_label.len()
    }

    /// Resolve a tag to its catalog id. A missing tag is a deployment
    /// problem and must abort the calling command.
    pub fn require(&self, tag: StatusTag) -> Result<StatusId, CatalogError> {
        self.by_label
            .get(tag.label())
            .copied()
            .ok_or_else(|| CatalogError::MissingStatus(tag.label().to_string()))
    }

    /// Case-insensitive prefix lookup, used for operator-typed labels.
    pub fn find_by_prefix(&self, prefix: &str) -> Option<StatusId> {
        let wanted = prefix.trim().to_lowercase();
        if wanted.is_empty() {
            return None;
        }
        self.by_label
            .iter()
            .find(|(label, _)| label.to_lowercase().starts_with(&wanted))
            .map(|(_, id)| *id)
    }

    pub fn label_of(&self, id: StatusId) -> Option<&str> {
        self.by_label
            .iter()
            .find(|(_, candidate)| **candidate == id)
            .map(|(label, _)| label.as_str())
    }
}
