//! Startup wiring: pick the persistence strategy and register backups.

use tracing::info;

use crate::archive::Archiver;
use crate::config::KeepConfig;
use crate::error::Result;
use crate::guard::DedupGuard;
use crate::host::{DirectPersistence, HostState, PersistenceStrategy, ProfileHost};
use crate::scheduler::BackupScheduler;
use crate::tick::TickRegistry;

/// The dedup guard when `enable_name_change` is set, the stock strategy otherwise.
pub fn persistence_for(config: &KeepConfig) -> Box<dyn PersistenceStrategy> {
    if config.enable_name_change {
        Box::new(DedupGuard::new())
    } else {
        Box::new(DirectPersistence)
    }
}

/// Build a host from config with the configured strategy.
pub fn host_for(config: &KeepConfig) -> ProfileHost {
    ProfileHost::new(HostState::from_config(config), persistence_for(config))
}

/// Create the backup directory and register the backup task, if backups are enabled.
///
/// Returns whether a scheduler was registered. Calling this again replaces
/// the previous registration.
pub fn install_backups(config: &KeepConfig, registry: &mut TickRegistry) -> Result<bool> {
    if !config.enable_backup {
        return Ok(false);
    }

    let archiver = Archiver::new(&config.backup_dir);
    if archiver.ensure_backup_dir()? {
        info!(dir = %config.backup_dir.display(), "missing backup folder, created it");
    }

    let scheduler = BackupScheduler::new(
        config.backup_interval(),
        &config.profile_dir,
        archiver,
    );
    registry.register(Box::new(scheduler));
    Ok(true)
}
