use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

const KEY_PREFIX: &str = "LABCAT_";

fn source_files(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            files.extend(source_files(&path)?);
        } else if path.extension().is_some_and(|ext| ext == "rs") {
            files.push(path);
        }
    }
    Ok(files)
}

fn is_key_char(c: char) -> bool {
    c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_'
}

/// Keys are read through `env::var*` with a whole string literal, so only
/// `"LABCAT_..."` literals closed right after the key count. Format strings
/// such as the warn line tag never match.
fn quoted_env_keys(source: &str) -> Vec<&str> {
    source
        .match_indices(&format!("\"{KEY_PREFIX}"))
        .filter_map(|(start, _)| {
            let rest = &source[start + 1..];
            let end = rest.find(|c: char| !is_key_char(c))?;
            let key = &rest[..end];
            (key.len() > KEY_PREFIX.len() && rest[end..].starts_with('"')).then_some(key)
        })
        .collect()
}

fn render_known_keys(keys: &BTreeSet<String>) -> String {
    let mut out = String::from("pub const KNOWN_ENV_KEYS: &[&str] = &[\n");
    for key in keys {
        out.push_str(&format!("    \"{key}\",\n"));
    }
    out.push_str("];\n");
    out
}

fn write_known_keys() -> std::io::Result<()> {
    let mut keys = BTreeSet::new();
    for file in source_files(Path::new("src"))? {
        let content = fs::read_to_string(&file)?;
        keys.extend(quoted_env_keys(&content).into_iter().map(str::to_string));
    }

    let out_dir = env::var_os("OUT_DIR").ok_or_else(|| std::io::Error::other("OUT_DIR not set"))?;
    fs::write(
        Path::new(&out_dir).join("labcat_env_keys.rs"),
        render_known_keys(&keys),
    )
}

fn main() {
    if let Err(err) = write_known_keys() {
        panic!("failed to generate LABCAT env key list: {err}");
    }

    let now = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default();
    println!(
        "cargo:rustc-env=BUILD_UUID={:x}-{:x}",
        now.as_secs(),
        now.subsec_nanos()
    );
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed=src");
}
