use anyhow::Result;
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct StatsPaths {
    pub stats_home: PathBuf,
    pub data_dir: PathBuf,
    pub config_file: PathBuf,
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

pub fn resolve_paths() -> Result<StatsPaths> {
    let home = required_home_dir()?;
    let cwd = env::current_dir()?;
    let stats_home = env_or_default_path("STATS_HOME", home.join(".stream-stats"));
    let data_dir = env_or_default_path("STATS_DATA_DIR", cwd.join("daily_data"));
    let config_file = env_or_default_path("STATS_CONFIG_PATH", stats_home.join("stats.toml"));

    Ok(StatsPaths {
        stats_home,
        data_dir,
        config_file,
    })
}
