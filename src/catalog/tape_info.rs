use crate::catalog::record::{Field, Record};
use crate::catalog::store::Change;
use regex::Regex;
use std::sync::OnceLock;

const TAPE_ID: &str = r"[0-9]{6}|[A-Z]{3}[0-9]{3}|[A-Z]{4}[0-9]{2}|[A-Z][0-9]{6}";
const VAULT_MARKER: &str = r"\(in vault\)|\(to vault\)";
const VAULT_LOCATION: &str = r"S217-01[A-Z][ -][0-9]{2}[A-Z]";

static TAPE_ID_ONLY_RE: OnceLock<Regex> = OnceLock::new();
static TAPE_WITH_VAULT_RE: OnceLock<Regex> = OnceLock::new();

fn tape_id_only_re() -> &'static Regex {
    TAPE_ID_ONLY_RE.get_or_init(|| {
        Regex::new(&format!("^(?:{TAPE_ID})$")).expect("tape id pattern is valid")
    })
}

fn tape_with_vault_re() -> &'static Regex {
    TAPE_WITH_VAULT_RE.get_or_init(|| {
        Regex::new(&format!(
            r"^(?P<tape>{TAPE_ID})\s*(?:{VAULT_MARKER})\s*(?P<vault>{VAULT_LOCATION})$"
        ))
        .expect("tape+vault pattern is valid")
    })
}

/// A carrier field that passed strict parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TapeInfo {
    pub tape_id: String,
    /// Exactly as written; the separator may be a space or a hyphen.
    pub vault_location: Option<String>,
}

/// Parse a free-text carrier field.
///
/// Accepted forms, after trimming:
/// * a bare tape id: `820001`, `AAB963`, `CLNU00`, `M265154`
/// * a tape id, `(in vault)` or `(to vault)`, and one vault location:
///   `000027 (in vault) S217-01A 11C`
///
/// Anything else (notes, several ids, malformed vaults) returns `None`.
pub fn parse(text: &str) -> Option<TapeInfo> {
    let trimmed = text.trim();

    if tape_id_only_re().is_match(trimmed) {
        return Some(TapeInfo {
            tape_id: trimmed.to_string(),
            vault_location: None,
        });
    }

    let caps = tape_with_vault_re().captures(trimmed)?;
    Some(TapeInfo {
        tape_id: caps["tape"].to_string(),
        vault_location: Some(caps["vault"].to_string()),
    })
}

/// Stored vault locations always use a hyphen separator.
pub fn normalize_vault_location(location: &str) -> String {
    location.replace(' ', "-")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Carrier {
    A,
    B,
}

impl Carrier {
    pub const ALL: [Carrier; 2] = [Carrier::A, Carrier::B];

    pub fn field(self) -> Field {
        match self {
            Carrier::A => Field::CarrierA,
            Carrier::B => Field::CarrierB,
        }
    }

    pub fn location_field(self) -> Field {
        match self {
            Carrier::A => Field::CarrierALocation,
            Carrier::B => Field::CarrierBLocation,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnparsedCarrier {
    pub id: u64,
    pub text: String,
}

#[derive(Debug, Clone, Default)]
pub struct TapeInfoPlan {
    pub changes: Vec<Change>,
    pub updated: usize,
    pub unparsed: Vec<UnparsedCarrier>,
}

/// Decide how one carrier column should be rewritten: valid text becomes
/// the bare tape id plus a normalized vault location, invalid text is
/// collected for an operator.
pub fn plan_carrier_cleanup(records: &[Record], carrier: Carrier) -> TapeInfoPlan {
    let mut plan = TapeInfoPlan::default();
    for record in records.iter().filter(|r| !r.is_blank(carrier.field())) {
        let raw = record.get(carrier.field());
        let Some(info) = parse(raw) else {
            plan.unparsed.push(UnparsedCarrier {
                id: record.id,
                text: raw.to_string(),
            });
            continue;
        };

        let mut changed = false;
        if raw != info.tape_id {
            plan.changes.push(Change::SetField {
                id: record.id,
                field: carrier.field(),
                value: info.tape_id.clone(),
            });
            changed = true;
        }
        if let Some(location) = info.vault_location.as_deref() {
            let location = normalize_vault_location(location);
            if record.get(carrier.location_field()) != location {
                plan.changes.push(Change::SetField {
                    id: record.id,
                    field: carrier.location_field(),
                    value: location,
                });
                changed = true;
            }
        }
        if changed {
            plan.updated += 1;
        }
    }
    plan
}
