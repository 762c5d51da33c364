//! DedupGuard: fingerprint-gated profile persistence.
//!
//! A save only touches the disk when the serialized profile differs from the
//! bytes this guard last wrote for that session. The fingerprint cache is
//! updated after the write lands, so cache and disk never disagree.
//!
//! ```text
//! save(id)  -> pre-save hooks -> encode -> fingerprint -> changed? -> write + cache
//! load(name) -> read <name>.json -> decode -> profiles[info.id] -> load routers
//! ```

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::time::Instant;

use tracing::debug;

use crate::error::{KeepError, Result};
use crate::fingerprint::Fingerprint;
use crate::hooks::run_load_routers;
use crate::host::{HostState, PersistenceStrategy, PreparedSave, SaveReport};
use crate::profile::Profile;

/// Counters for writes performed and skipped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GuardStats {
    pub writes: u64,
    pub skipped: u64,
}

/// Persistence strategy that skips byte-identical rewrites.
#[derive(Debug, Default)]
pub struct DedupGuard {
    fingerprints: HashMap<String, Fingerprint>,
    stats: GuardStats,
}

impl DedupGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fingerprint of the last bytes written for a session.
    pub fn fingerprint(&self, session_id: &str) -> Option<&Fingerprint> {
        self.fingerprints.get(session_id)
    }

    pub fn stats(&self) -> GuardStats {
        self.stats
    }

    /// Number of sessions with a cached fingerprint.
    pub fn tracked(&self) -> usize {
        self.fingerprints.len()
    }
}

impl PersistenceStrategy for DedupGuard {
    fn save(&mut self, host: &mut HostState, session_id: &str) -> Result<SaveReport> {
        let start = Instant::now();
        let PreparedSave { path, bytes } = host.prepare_save(session_id)?;

        let fingerprint = Fingerprint::of(&bytes);
        let changed = self.fingerprints.get(session_id) != Some(&fingerprint);

        if changed {
            write_profile(&path, &bytes)?;
            self.fingerprints
                .insert(session_id.to_string(), fingerprint.clone());
            self.stats.writes += 1;
        } else {
            self.stats.skipped += 1;
            debug!(session_id, fingerprint = fingerprint.short(), "profile unchanged, skipping write");
        }

        Ok(SaveReport {
            fingerprint,
            written: changed,
            elapsed: start.elapsed(),
        })
    }

    fn load(&mut self, host: &mut HostState, name: &str) -> Result<()> {
        load_into(host, name).map(|_| ())
    }
}

/// Replace the file at `path` with `bytes`.
///
/// Writes a sibling `.tmp` file and renames it over the target, so a reader
/// never sees a half-written profile.
pub(crate) fn write_profile(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| KeepError::io(parent, e))?;
    }

    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, bytes).map_err(|e| KeepError::io(&tmp, e))?;
    fs::rename(&tmp, path).map_err(|e| KeepError::io(path, e))?;
    Ok(())
}

/// Load `<profile_dir>/<name>.json` into the host and run load routers.
///
/// A missing file is not an error: `name` becomes the session id and an
/// empty placeholder is registered unless the session already has a profile.
/// Returns the session id the profile was stored under.
pub(crate) fn load_into(host: &mut HostState, name: &str) -> Result<String> {
    let path = host.load_path(name);

    let session_id = if path.exists() {
        let start = Instant::now();
        let bytes = fs::read(&path).map_err(|e| KeepError::io(&path, e))?;
        let profile = host.format.decode(&bytes)?;
        let session_id = profile
            .session_id()
            .ok_or_else(|| KeepError::MissingField {
                field: "info.id",
                context: path.display().to_string(),
            })?
            .to_string();
        host.profiles.insert(session_id.clone(), profile);
        debug!(session_id = %session_id, "profile took {:?} to load", start.elapsed());
        session_id
    } else {
        debug!(name, "no profile file, registering placeholder");
        host.profiles
            .entry(name.to_string())
            .or_insert_with(Profile::empty);
        name.to_string()
    };

    if !host.load_routers.is_empty() {
        let profile = host.profile(&session_id)?.clone();
        let profile = run_load_routers(&host.load_routers, profile)?;
        host.profiles.insert(session_id.clone(), profile);
    }

    Ok(session_id)
}
