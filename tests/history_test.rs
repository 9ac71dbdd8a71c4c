use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn write(dir: &Path, name: &str, body: &str) {
    fs::write(dir.join(name), body).expect("write fixture");
}

fn stats_cmd(root: &Path) -> assert_cmd::Command {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("stream-stats");
    cmd.current_dir(root)
        .env("STATS_HOME", root.join("home"))
        .env("STATS_CONFIG_PATH", root.join("home/stats.toml"))
        .env_remove("STATS_IMPLAUSIBLE_DELTA");
    cmd
}

#[test]
fn career_history_skips_implausible_jumps() {
    let tmp = tempdir().expect("tempdir");
    let data = tmp.path().join("daily_data");
    fs::create_dir_all(&data).expect("mkdir data");
    write(&data, "2025-01-01_meta.json", r#"{"career_total": 1000}"#);
    write(&data, "2025-01-02_meta.json", r#"{"career_total": 1500}"#);
    write(&data, "2025-01-03_meta.json", r#"{"career_total": 900000000}"#);
    write(&data, "2025-01-04_meta.json", r#"{"career_total": 900000700}"#);

    stats_cmd(tmp.path())
        .args(["history", "career"])
        .assert()
        .success()
        .stdout(predicate::str::contains("2025-01-02 500"))
        .stdout(predicate::str::contains("2025-01-03").not())
        .stdout(predicate::str::contains("2025-01-04 700"))
        .stdout(predicate::str::contains("points=2 mean=600"));
}

#[test]
fn song_history_matches_cleaned_names() {
    let tmp = tempdir().expect("tempdir");
    let data = tmp.path().join("daily_data");
    fs::create_dir_all(&data).expect("mkdir data");
    write(&data, "2025-01-01_songs.csv", "Song,Daily,Streams\n\"we can’t be friends*\",\"1,200\",10\n");
    write(&data, "2025-01-02_songs.csv", "Song,Daily,Streams\nother,5,5\n");
    write(&data, "2025-01-03_songs.csv", "Song,Daily,Streams\nwe can't be friends,900,10\n");

    let output = stats_cmd(tmp.path())
        .args(["--json", "history", "song", "we can't be friends"])
        .output()
        .expect("run history");
    assert!(output.status.success());

    let report: Value = serde_json::from_slice(&output.stdout).expect("json report");
    let points = report["data"]["points"].as_array().expect("points");
    assert_eq!(points.len(), 2);
    assert_eq!(points[0]["date"], "2025-01-01");
    assert_eq!(points[0]["value"], 1200);
    assert_eq!(points[1]["value"], 900);
}

#[test]
fn empty_series_is_reported() {
    let tmp = tempdir().expect("tempdir");
    fs::create_dir_all(tmp.path().join("daily_data")).expect("mkdir data");

    stats_cmd(tmp.path())
        .args(["history", "album", "Positions"])
        .assert()
        .success()
        .stdout(predicate::str::contains("history: issues"))
        .stdout(predicate::str::contains("no history points for album:Positions"));
}
