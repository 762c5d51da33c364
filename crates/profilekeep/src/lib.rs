//! Deduplicating profile persistence with interval backups.
//!
//! Two pieces, both driven synchronously by a host:
//! - **`DedupGuard`**: a `PersistenceStrategy` that fingerprints each
//!   serialized profile and only writes when the bytes changed
//! - **`BackupScheduler`**: a `TickTask` that zips the profile directory once
//!   the host reports enough time since the last backup
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use profilekeep::{keeper, KeepConfig, TickRegistry};
//!
//! let config = KeepConfig::load(None).unwrap();
//! let mut host = keeper::host_for(&config);
//! let mut ticks = TickRegistry::new();
//! keeper::install_backups(&config, &mut ticks).unwrap();
//!
//! host.load_all().unwrap();
//! let saved = host.save_all();  // writes only what changed
//! assert!(saved.is_clean());
//! ticks.tick(30.0).unwrap();  // backs up once the interval has passed
//! ```
//!
//! # Layout
//!
//! - profiles: `<profile_dir>/<username>-<session_id>.json`
//! - backups: `<backup_dir>/<MM_DD_YYYY-HH_MM_SS>.zip`

pub mod archive;
pub mod config;
pub mod error;
pub mod fingerprint;
pub mod guard;
pub mod hooks;
pub mod host;
pub mod keeper;
pub mod profile;
pub mod scheduler;
pub mod tick;

// Re-exports for convenience
pub use archive::Archiver;
pub use config::KeepConfig;
pub use error::{KeepError, Result};
pub use fingerprint::Fingerprint;
pub use guard::{DedupGuard, GuardStats};
pub use hooks::{FnHook, LoadRouter, PreSaveHook};
pub use host::{DirectPersistence, HostState, PersistenceStrategy, ProfileFormat, ProfileHost, SaveReport, SaveSummary};
pub use profile::{Profile, ProfileMap};
pub use scheduler::{BackupScheduler, BACKUP_TASK_NAME};
pub use tick::{TickRegistry, TickTask};
