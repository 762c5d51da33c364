//! Interval backup scheduler.
//!
//! The scheduler never reads a clock. The host tells it how long it has been
//! since the last backup ran, and it archives once that exceeds the
//! configured interval.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::info;

use crate::archive::Archiver;
use crate::error::Result;
use crate::tick::TickTask;

/// Registration name for the backup tick task.
pub const BACKUP_TASK_NAME: &str = "profilekeep-backup";

#[derive(Debug, Clone)]
pub struct BackupScheduler {
    threshold_secs: f64,
    source_dir: PathBuf,
    archiver: Archiver,
    last_backup: Option<PathBuf>,
    backups_created: u64,
}

impl BackupScheduler {
    pub fn new(interval: Duration, source_dir: impl Into<PathBuf>, archiver: Archiver) -> Self {
        Self {
            threshold_secs: interval.as_secs_f64(),
            source_dir: source_dir.into(),
            archiver,
            last_backup: None,
            backups_created: 0,
        }
    }

    /// Back up if `elapsed_secs` is strictly greater than the interval.
    pub fn on_tick(&mut self, elapsed_secs: f64) -> Result<bool> {
        if elapsed_secs <= self.threshold_secs {
            return Ok(false);
        }

        info!(
            elapsed_secs,
            threshold_secs = self.threshold_secs,
            "backing up profiles"
        );
        let path = self.archiver.create_backup(&self.source_dir)?;
        self.last_backup = Some(path);
        self.backups_created += 1;
        Ok(true)
    }

    pub fn threshold_secs(&self) -> f64 {
        self.threshold_secs
    }

    pub fn source_dir(&self) -> &Path {
        &self.source_dir
    }

    /// Path of the most recent archive this scheduler wrote.
    pub fn last_backup(&self) -> Option<&Path> {
        self.last_backup.as_deref()
    }

    pub fn backups_created(&self) -> u64 {
        self.backups_created
    }
}

impl TickTask for BackupScheduler {
    fn name(&self) -> &str {
        BACKUP_TASK_NAME
    }

    fn on_tick(&mut self, since_last_run: f64) -> anyhow::Result<bool> {
        Ok(BackupScheduler::on_tick(self, since_last_run)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn scheduler(temp: &TempDir, secs: u64) -> anyhow::Result<BackupScheduler> {
        let source = temp.path().join("profiles");
        fs::create_dir_all(&source)?;
        fs::write(source.join("alice-s1.json"), b"{}")?;
        let archiver = Archiver::new(temp.path().join("backups"));
        archiver.ensure_backup_dir()?;
        Ok(BackupScheduler::new(Duration::from_secs(secs), source, archiver))
    }

    fn archives(temp: &TempDir) -> anyhow::Result<usize> {
        Ok(fs::read_dir(temp.path().join("backups"))?.count())
    }

    #[test]
    fn test_threshold_is_strict() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let mut sched = scheduler(&temp, 60)?;

        assert!(!sched.on_tick(60.0)?);
        assert_eq!(archives(&temp)?, 0);

        assert!(sched.on_tick(60.001)?);
        assert_eq!(archives(&temp)?, 1);
        assert_eq!(sched.backups_created(), 1);
        assert!(sched.last_backup().is_some_and(|p| p.exists()));
        Ok(())
    }

    #[test]
    fn test_below_threshold_is_noop() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let mut sched = scheduler(&temp, 3600)?;
        for _ in 0..4 {
            assert!(!sched.on_tick(1000.0)?);
        }
        assert_eq!(archives(&temp)?, 0);
        assert!(sched.last_backup().is_none());
        Ok(())
    }

    #[test]
    fn test_archive_failure_propagates() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let mut sched = scheduler(&temp, 1)?;
        fs::remove_dir_all(temp.path().join("backups"))?;

        assert!(sched.on_tick(5.0).is_err());
        assert_eq!(sched.backups_created(), 0);
        Ok(())
    }

    #[test]
    fn test_task_name_is_stable() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let sched = scheduler(&temp, 1)?;
        assert_eq!(TickTask::name(&sched), BACKUP_TASK_NAME);
        assert_eq!(sched.threshold_secs(), 1.0);
        Ok(())
    }
}
