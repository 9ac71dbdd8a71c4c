use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

const ENV_PREFIX: &str = "STATS_";
const QUOTED_PREFIX: &str = "\"STATS_";
const SCAN_ROOT: &str = "src";

fn collect_rs_files(dir: &Path, out: &mut Vec<PathBuf>) -> std::io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_rs_files(&path, out)?;
        } else if path.extension().is_some_and(|ext| ext == "rs") {
            out.push(path);
        }
    }
    Ok(())
}

fn is_env_key(token: &str) -> bool {
    token.len() > ENV_PREFIX.len()
        && token.starts_with(ENV_PREFIX)
        && !token.ends_with('_')
        && token
            .bytes()
            .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit() || b == b'_')
}

/// Keys read through `env::var("STATS_...")`-style literals. Prefix
/// fragments such as `format!("STATS_{}")` and mentions in doc comments
/// are not keys.
fn quoted_env_keys(source: &str) -> impl Iterator<Item = &str> {
    source.match_indices(QUOTED_PREFIX).filter_map(|(start, _)| {
        let rest = &source[start + 1..];
        let token = &rest[..rest.find('"')?];
        is_env_key(token).then_some(token)
    })
}

fn scan_env_keys(root: &Path) -> std::io::Result<BTreeSet<String>> {
    let mut files = Vec::new();
    collect_rs_files(root, &mut files)?;
    files.sort();

    let mut keys = BTreeSet::new();
    for file in files {
        let content = fs::read_to_string(&file)?;
        keys.extend(quoted_env_keys(&content).map(str::to_string));
    }
    Ok(keys)
}

fn write_allowlist(keys: &BTreeSet<String>, out: &Path) -> std::io::Result<()> {
    let mut f = fs::File::create(out)?;
    writeln!(f, "pub const GENERATED_STATS_ENV_ALLOWLIST: &[&str] = &[")?;
    for key in keys {
        writeln!(f, "    {key:?},")?;
    }
    writeln!(f, "];")?;
    Ok(())
}

fn main() {
    let out_dir = match env::var("OUT_DIR") {
        Ok(dir) => PathBuf::from(dir),
        Err(err) => panic!("OUT_DIR unavailable: {err}"),
    };
    let result = scan_env_keys(Path::new(SCAN_ROOT))
        .and_then(|keys| write_allowlist(&keys, &out_dir.join("stats_env_allowlist.rs")));
    if let Err(err) = result {
        panic!("failed to generate STATS env allowlist: {err}");
    }
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed={SCAN_ROOT}");
}
