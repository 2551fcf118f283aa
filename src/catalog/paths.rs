use anyhow::Result;
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct CatalogPaths {
    pub labcat_home: PathBuf,
    pub store_file: PathBuf,
    pub logs_dir: PathBuf,
    pub reports_dir: PathBuf,
}

fn required_home_dir() -> Result<PathBuf> {
    if let Some(home) = dirs::home_dir() {
        return Ok(home);
    }
    Err(anyhow::anyhow!("HOME directory could not be resolved"))
}

fn env_or_default_path(var: &str, fallback: PathBuf) -> PathBuf {
    match env::var(var) {
        Ok(v) if !v.trim().is_empty() => PathBuf::from(v.trim()),
        _ => fallback,
    }
}

pub fn resolve_paths() -> Result<CatalogPaths> {
    let labcat_home = match env::var("LABCAT_HOME") {
        Ok(v) if !v.trim().is_empty() => PathBuf::from(v.trim()),
        _ => required_home_dir()?.join(".labcat"),
    };

    let store_file = env_or_default_path("LABCAT_STORE_PATH", labcat_home.join("store.json"));
    let logs_dir = env_or_default_path("LABCAT_LOGS_DIR", labcat_home.join("logs"));
    let reports_dir = env_or_default_path("LABCAT_REPORTS_DIR", labcat_home.join("reports"));

    Ok(CatalogPaths {
        labcat_home,
        store_file,
        logs_dir,
        reports_dir,
    })
}
