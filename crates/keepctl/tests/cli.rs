use std::fs::{self, File};
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// Temp workspace with a profile dir, backup dir and a config pointing at both.
struct Fixture {
    temp: TempDir,
    config: PathBuf,
}

impl Fixture {
    fn new(interval_secs: f64) -> anyhow::Result<Self> {
        let temp = TempDir::new()?;
        let profiles = temp.path().join("profiles");
        fs::create_dir_all(&profiles)?;

        let config = temp.path().join("profilekeep.toml");
        fs::write(
            &config,
            format!(
                "[profilekeep]\nprofile_dir = {:?}\nbackup_dir = {:?}\ntime_between_saves_seconds = {:?}\n",
                profiles.display().to_string(),
                temp.path().join("backups").display().to_string(),
                interval_secs,
            ),
        )?;
        Ok(Self { temp, config })
    }

    fn profiles(&self) -> PathBuf {
        self.temp.path().join("profiles")
    }

    fn backups(&self) -> PathBuf {
        self.temp.path().join("backups")
    }

    fn keepctl(&self) -> anyhow::Result<Command> {
        let mut cmd = Command::cargo_bin("keepctl")?;
        cmd.current_dir(self.temp.path())
            .arg("--config")
            .arg(&self.config)
            .env_remove("PROFILEKEEP_PROFILE_DIR")
            .env_remove("PROFILEKEEP_BACKUP_DIR")
            .env_remove("PROFILEKEEP_ENABLE_BACKUP")
            .env_remove("PROFILEKEEP_BACKUP_INTERVAL");
        Ok(cmd)
    }
}

fn zips_in(dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    Ok(fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "zip"))
        .collect())
}

#[test]
fn test_fingerprint_prints_digest() -> anyhow::Result<()> {
    let fixture = Fixture::new(3600.0)?;
    let file = fixture.temp.path().join("data.bin");
    fs::write(&file, b"Concurrent Data")?;

    fixture
        .keepctl()?
        .arg("fingerprint")
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::starts_with("5c735d76fe3537a0f35cf4a4eb14a532"));
    Ok(())
}

#[test]
fn test_fingerprint_missing_file_fails() -> anyhow::Result<()> {
    let fixture = Fixture::new(3600.0)?;
    fixture
        .keepctl()?
        .args(["fingerprint", "nope.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to read"));
    Ok(())
}

#[test]
fn test_backup_writes_archive() -> anyhow::Result<()> {
    let fixture = Fixture::new(3600.0)?;
    fs::write(fixture.profiles().join("alice-s1.json"), br#"{"info":{"id":"s1"}}"#)?;

    fixture
        .keepctl()?
        .arg("backup")
        .assert()
        .success()
        .stdout(predicate::str::contains(".zip"));

    let zips = zips_in(&fixture.backups())?;
    assert_eq!(zips.len(), 1);
    let archive = zip::ZipArchive::new(File::open(&zips[0])?)?;
    assert_eq!(
        archive.file_names().collect::<Vec<_>>(),
        vec!["profiles/alice-s1.json"]
    );
    Ok(())
}

#[test]
fn test_run_saves_profiles_and_backs_up() -> anyhow::Result<()> {
    let fixture = Fixture::new(0.0)?;
    let profile = serde_json::json!({ "info": { "id": "s1", "username": "alice" } });
    fs::write(
        fixture.profiles().join("alice-s1.json"),
        serde_json::to_vec(&profile)?,
    )?;

    fixture
        .keepctl()?
        .args(["run", "--interval-secs", "0", "--ticks", "2"])
        .assert()
        .success();

    // Rewritten once in the host's pretty format.
    let saved = fs::read_to_string(fixture.profiles().join("alice-s1.json"))?;
    assert!(saved.contains('\n'));
    assert!(!zips_in(&fixture.backups())?.is_empty());
    Ok(())
}

#[test]
fn test_run_survives_profile_without_username() -> anyhow::Result<()> {
    let fixture = Fixture::new(3600.0)?;
    fs::write(fixture.profiles().join("anon-a0.json"), br#"{"info":{"id":"a0"}}"#)?;
    let profile = serde_json::json!({ "info": { "id": "s1", "username": "alice" } });
    fs::write(
        fixture.profiles().join("alice-s1.json"),
        serde_json::to_vec(&profile)?,
    )?;

    fixture
        .keepctl()?
        .args(["run", "--interval-secs", "0", "--ticks", "2"])
        .assert()
        .success()
        .stderr(predicate::str::contains("profile save failed"));

    let saved = fs::read_to_string(fixture.profiles().join("alice-s1.json"))?;
    assert!(saved.contains('\n'));
    Ok(())
}
