use std::env;
use std::path::PathBuf;

fn fallback_dotenv_path(stats_home: Option<PathBuf>, home_dir: Option<PathBuf>) -> Option<PathBuf> {
    match (stats_home, home_dir) {
        (Some(stats_home), _) => Some(stats_home.join(".env")),
        (None, Some(home)) => Some(home.join(".stream-stats/.env")),
        (None, None) => None,
    }
}

pub fn load_dotenv() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    let fallback = fallback_dotenv_path(
        env::var_os("STATS_HOME").map(PathBuf::from),
        dirs::home_dir(),
    );

    let Some(path) = fallback else {
        return;
    };
    if path.is_file() {
        let _ = dotenvy::from_path(&path);
    }
}
