use crate::catalog::status::StatusTag;
use std::collections::BTreeSet;

/// Key phrases staff used in the source sheet's status column.
const STATUS_PHRASES: [(&str, StatusTag); 6] = [
    (
        "Inventory number in filename is incorrect",
        StatusTag::IncorrectInvNoInFilename,
    ),
    ("Duplicated in Source Data", StatusTag::DuplicatedInSource),
    ("invalid vault", StatusTag::InvalidVault),
    ("invalid inventory_no", StatusTag::InvalidInvNo),
    (
        "Presence of multiple Inventory_nos",
        StatusTag::MultipleInventoryNos,
    ),
    (
        "Multiple corresponding Inventory_no in PD",
        StatusTag::MultipleCorrespondingInvNo,
    ),
];

/// Every status whose key phrase appears in `text`, ignoring case.
pub fn classify(text: &str) -> BTreeSet<StatusTag> {
    if text.trim().is_empty() {
        return BTreeSet::new();
    }
    let haystack = text.to_lowercase();
    STATUS_PHRASES
        .iter()
        .filter(|(phrase, _)| haystack.contains(&phrase.to_lowercase()))
        .map(|(_, tag)| *tag)
        .collect()
}
