use crate::catalog::inventory::DEFAULT_FALSE_POSITIVES;
use crate::catalog::reconcile::{DEFAULT_DIGITAL_LAB_LOCATION, DEFAULT_HEADER_VALUE, ReconcileRules};
use crate::error::CatalogError;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleanupConfig {
    pub header_value: String,
    pub digital_lab_location: String,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            header_value: DEFAULT_HEADER_VALUE.to_string(),
            digital_lab_location: DEFAULT_DIGITAL_LAB_LOCATION.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryConfig {
    pub false_positives: Vec<String>,
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self {
            false_positives: DEFAULT_FALSE_POSITIVES
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HardDriveConfig {
    pub location: String,
}

impl Default for HardDriveConfig {
    fn default() -> Self {
        Self {
            location: "217".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CatalogConfig {
    pub cleanup: CleanupConfig,
    pub inventory: InventoryConfig,
    pub hard_drive: HardDriveConfig,
}

impl CatalogConfig {
    pub fn reconcile_rules(&self) -> ReconcileRules {
        ReconcileRules {
            header_value: self.cleanup.header_value.clone(),
            digital_lab_location: self.cleanup.digital_lab_location.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct PartialCatalogConfig {
    cleanup: Option<CleanupConfig>,
    inventory: Option<InventoryConfig>,
    hard_drive: Option<HardDriveConfig>,
}

fn env_or_string(var: &str, fallback: &str) -> String {
    match env::var(var) {
        Ok(v) if !v.trim().is_empty() => v.trim().to_string(),
        _ => fallback.to_string(),
    }
}

fn env_or_csv(var: &str, fallback: &[String]) -> Vec<String> {
    match env::var(var) {
        Ok(v) => {
            let out = v
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(ToOwned::to_owned)
                .collect::<Vec<_>>();
            if out.is_empty() {
                fallback.to_vec()
            } else {
                out
            }
        }
        Err(_) => fallback.to_vec(),
    }
}

fn validate(cfg: &CatalogConfig) -> Result<(), CatalogError> {
    if cfg.cleanup.header_value.trim().is_empty() {
        return Err(CatalogError::InvalidConfig(
            "cleanup.header_value cannot be empty".into(),
        ));
    }
    if cfg.cleanup.digital_lab_location.trim().is_empty() {
        return Err(CatalogError::InvalidConfig(
            "cleanup.digital_lab_location cannot be empty".into(),
        ));
    }
    if cfg
        .inventory
        .false_positives
        .iter()
        .any(|fp| fp.trim().is_empty())
    {
        return Err(CatalogError::InvalidConfig(
            "inventory.false_positives cannot contain blank entries".into(),
        ));
    }
    if cfg.hard_drive.location.trim().is_empty() {
        return Err(CatalogError::InvalidConfig(
            "hard_drive.location cannot be empty".into(),
        ));
    }
    Ok(())
}

pub fn resolve_config_path() -> Option<PathBuf> {
    if let Ok(custom) = env::var("LABCAT_CONFIG_PATH") {
        let trimmed = custom.trim();
        if !trimmed.is_empty() {
            return Some(PathBuf::from(trimmed));
        }
    }

    let home = dirs::home_dir()?;
    Some(home.join(".labcat").join("labcat.toml"))
}

fn merge_config_text(base: &mut CatalogConfig, raw: &str) -> Result<()> {
    let parsed: PartialCatalogConfig = toml::from_str(raw)?;
    if let Some(cleanup) = parsed.cleanup {
        base.cleanup = cleanup;
    }
    if let Some(inventory) = parsed.inventory {
        base.inventory = inventory;
    }
    if let Some(hard_drive) = parsed.hard_drive {
        base.hard_drive = hard_drive;
    }
    Ok(())
}

fn merge_file_config(base: &mut CatalogConfig) -> Result<()> {
    let Some(path) = resolve_config_path() else {
        return Ok(());
    };
    if !path.exists() {
        return Ok(());
    }

    let raw = fs::read_to_string(&path)
        .map_err(|err| CatalogError::InvalidConfig(format!("{}: {err}", path.display())))?;
    merge_config_text(base, &raw)
        .map_err(|err| CatalogError::InvalidConfig(format!("{}: {err}", path.display())).into())
}

fn apply_env_overrides(cfg: &mut CatalogConfig) {
    cfg.cleanup.header_value = env_or_string("LABCAT_HEADER_VALUE", &cfg.cleanup.header_value);
    cfg.cleanup.digital_lab_location = env_or_string(
        "LABCAT_DIGITAL_LAB_LOCATION",
        &cfg.cleanup.digital_lab_location,
    );
    cfg.inventory.false_positives = env_or_csv(
        "LABCAT_INVENTORY_FALSE_POSITIVES",
        &cfg.inventory.false_positives,
    );
    cfg.hard_drive.location =
        env_or_string("LABCAT_HARD_DRIVE_LOCATION", &cfg.hard_drive.location);
}

pub fn load_config() -> Result<CatalogConfig> {
    let mut cfg = CatalogConfig::default();
    merge_file_config(&mut cfg)?;
    apply_env_overrides(&mut cfg);
    validate(&cfg)?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let cfg = CatalogConfig::default();
        assert!(validate(&cfg).is_ok());
        assert_eq!(cfg.inventory.false_positives, vec!["T01", "FE3018T"]);
        assert_eq!(cfg.reconcile_rules(), ReconcileRules::default());
    }

    #[test]
    fn file_sections_replace_defaults_independently() {
        let mut cfg = CatalogConfig::default();
        merge_config_text(
            &mut cfg,
            r#"
[inventory]
false_positives = ["T01", "T02"]

[hard_drive]
location = "S217"
"#,
        )
        .expect("parse");
        assert_eq!(cfg.inventory.false_positives, vec!["T01", "T02"]);
        assert_eq!(cfg.hard_drive.location, "S217");
        assert_eq!(cfg.cleanup.header_value, DEFAULT_HEADER_VALUE);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let mut cfg = CatalogConfig::default();
        assert!(merge_config_text(&mut cfg, "[cleanup]\nheader_value = 3\n").is_err());
    }

    #[test]
    fn blank_values_fail_validation() {
        let mut cfg = CatalogConfig::default();
        cfg.cleanup.header_value = "  ".into();
        assert!(matches!(
            validate(&cfg),
            Err(CatalogError::InvalidConfig(msg)) if msg.contains("header_value")
        ));

        let mut cfg = CatalogConfig::default();
        cfg.inventory.false_positives.push(String::new());
        assert!(validate(&cfg).is_err());
    }
}
