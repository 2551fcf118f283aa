use std::env;
use std::path::PathBuf;

mod generated {
    include!(concat!(env!("OUT_DIR"), "/labcat_env_keys.rs"));
}

fn fallback_dotenv_path(labcat_home: Option<PathBuf>, home_dir: Option<PathBuf>) -> Option<PathBuf> {
    if let Some(home) = labcat_home {
        return Some(home.join(".env"));
    }
    Some(home_dir?.join(".labcat/.env"))
}

pub fn load_dotenv() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    let fallback = fallback_dotenv_path(
        env::var_os("LABCAT_HOME").map(PathBuf::from),
        dirs::home_dir(),
    );

    let Some(path) = fallback else {
        return;
    };
    if path.is_file() {
        let _ = dotenvy::from_path(&path);
    }
}

/// `LABCAT_*` keys this build never reads, usually typos.
pub fn unknown_labcat_keys<I>(keys: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut unknown = keys
        .into_iter()
        .filter(|key| key.starts_with("LABCAT_"))
        .filter(|key| !generated::KNOWN_ENV_KEYS.contains(&key.as_str()))
        .collect::<Vec<_>>();
    unknown.sort();
    unknown.dedup();
    unknown
}

#[cfg(test)]
mod tests {
    use super::{fallback_dotenv_path, unknown_labcat_keys};
    use std::path::PathBuf;

    #[test]
    fn fallback_uses_labcat_home_directly() {
        let got = fallback_dotenv_path(
            Some(PathBuf::from("/srv/catalog")),
            Some(PathBuf::from("/home/alice")),
        );

        let want = Some(PathBuf::from("/srv/catalog/.env"));
        assert_eq!(got, want);
    }

    #[test]
    fn fallback_uses_home_when_labcat_home_unset() {
        let got = fallback_dotenv_path(None, Some(PathBuf::from("/home/alice")));
        let want = Some(PathBuf::from("/home/alice/.labcat/.env"));
        assert_eq!(got, want);
    }

    #[test]
    fn known_keys_and_foreign_prefixes_are_ignored() {
        // Built at runtime so the build script does not allow-list it.
        let typo = format!("LABCAT_{}", "STORE_PTH");
        let got = unknown_labcat_keys(vec![
            "LABCAT_HOME".to_string(),
            typo.clone(),
            "PATH".to_string(),
        ]);
        assert_eq!(got, vec![typo]);
    }

    #[test]
    fn every_key_read_by_the_catalog_is_known_but_the_warn_tag_is_not() {
        let warn_tag = format!("LABCAT_{}", "WARN");
        let got = unknown_labcat_keys(vec![
            "LABCAT_STORE_PATH".to_string(),
            "LABCAT_REPORTS_DIR".to_string(),
            "LABCAT_CONFIG_PATH".to_string(),
            "LABCAT_INVENTORY_FALSE_POSITIVES".to_string(),
            "LABCAT_HARD_DRIVE_LOCATION".to_string(),
            warn_tag.clone(),
        ]);
        assert_eq!(got, vec![warn_tag]);
    }
}
