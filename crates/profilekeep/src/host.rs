//! Host-side seams: the profile store and the persistence strategy it is built with.
//!
//! The host owns profiles, hooks and the on-disk layout. How a save or load
//! actually hits the disk is a `PersistenceStrategy` chosen once, when the
//! host is constructed.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tracing::error;

use crate::config::KeepConfig;
use crate::error::{KeepError, Result};
use crate::fingerprint::Fingerprint;
use crate::guard;
use crate::hooks::{run_pre_save, LoadRouter, PreSaveHook};
use crate::profile::{Profile, ProfileMap};

/// How profiles are turned into bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProfileFormat {
    /// Single-line JSON.
    Compact,
    /// Indented JSON.
    #[default]
    Pretty,
}

impl ProfileFormat {
    /// Map the host's `compress_profiles` feature flag to a format.
    pub fn from_compress_flag(compress: bool) -> Self {
        if compress {
            Self::Compact
        } else {
            Self::Pretty
        }
    }

    pub fn encode(&self, profile: &Profile) -> Result<Vec<u8>> {
        let bytes = match self {
            Self::Compact => serde_json::to_vec(profile)?,
            Self::Pretty => serde_json::to_vec_pretty(profile)?,
        };
        Ok(bytes)
    }

    pub fn decode(&self, bytes: &[u8]) -> Result<Profile> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// Everything a persistence strategy may read or replace.
pub struct HostState {
    pub profiles: ProfileMap,
    pub pre_save: Vec<Box<dyn PreSaveHook>>,
    pub load_routers: Vec<Box<dyn LoadRouter>>,
    pub profile_dir: PathBuf,
    pub format: ProfileFormat,
}

impl HostState {
    pub fn new(profile_dir: impl Into<PathBuf>) -> Self {
        Self {
            profiles: ProfileMap::new(),
            pre_save: Vec::new(),
            load_routers: Vec::new(),
            profile_dir: profile_dir.into(),
            format: ProfileFormat::default(),
        }
    }

    pub fn from_config(config: &KeepConfig) -> Self {
        Self::new(&config.profile_dir).with_format(ProfileFormat::from_compress_flag(
            config.compress_profiles,
        ))
    }

    pub fn with_format(mut self, format: ProfileFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_pre_save(mut self, hook: Box<dyn PreSaveHook>) -> Self {
        self.pre_save.push(hook);
        self
    }

    pub fn with_load_router(mut self, router: Box<dyn LoadRouter>) -> Self {
        self.load_routers.push(router);
        self
    }

    pub fn profile(&self, session_id: &str) -> Result<&Profile> {
        self.profiles
            .get(session_id)
            .ok_or_else(|| KeepError::ProfileNotFound(session_id.to_string()))
    }

    /// `<profile_dir>/<username>-<session_id>.json` for a loaded profile.
    pub fn save_path(&self, session_id: &str) -> Result<PathBuf> {
        let username = self
            .profile(session_id)?
            .username()
            .ok_or_else(|| KeepError::MissingField {
                field: "info.username",
                context: format!("for session {}", session_id),
            })?;
        Ok(self
            .profile_dir
            .join(format!("{}-{}.json", username, session_id)))
    }

    /// `<profile_dir>/<name>.json`.
    pub fn load_path(&self, name: &str) -> PathBuf {
        self.profile_dir.join(format!("{}.json", name))
    }

    /// Resolve the save path, run pre-save hooks and encode.
    ///
    /// The hooked profile replaces the map entry; nothing touches the disk.
    pub(crate) fn prepare_save(&mut self, session_id: &str) -> Result<PreparedSave> {
        let path = self.save_path(session_id)?;

        let profile = self.profile(session_id)?.clone();
        let (profile, _failures) = run_pre_save(&self.pre_save, session_id, profile);
        let bytes = self.format.encode(&profile)?;
        self.profiles.insert(session_id.to_string(), profile);

        Ok(PreparedSave { path, bytes })
    }
}

/// Encoded profile bytes and where they go.
pub(crate) struct PreparedSave {
    pub path: PathBuf,
    pub bytes: Vec<u8>,
}

/// What a save did.
#[derive(Debug, Clone)]
pub struct SaveReport {
    pub fingerprint: Fingerprint,
    /// Whether bytes hit the disk.
    pub written: bool,
    /// Wall-clock time taken. Diagnostic only.
    pub elapsed: Duration,
}

/// Strategy the host delegates profile saves and loads to.
pub trait PersistenceStrategy {
    fn save(&mut self, host: &mut HostState, session_id: &str) -> Result<SaveReport>;

    /// Load `<profile_dir>/<name>.json` into the profile map.
    fn load(&mut self, host: &mut HostState, name: &str) -> Result<()>;
}

/// The host's stock strategy: run hooks, always write.
#[derive(Debug, Default)]
pub struct DirectPersistence;

impl PersistenceStrategy for DirectPersistence {
    fn save(&mut self, host: &mut HostState, session_id: &str) -> Result<SaveReport> {
        let start = Instant::now();
        let PreparedSave { path, bytes } = host.prepare_save(session_id)?;
        guard::write_profile(&path, &bytes)?;

        Ok(SaveReport {
            fingerprint: Fingerprint::of(&bytes),
            written: true,
            elapsed: start.elapsed(),
        })
    }

    fn load(&mut self, host: &mut HostState, name: &str) -> Result<()> {
        guard::load_into(host, name).map(|_| ())
    }
}

/// Outcome of `ProfileHost::save_all`, split per session.
#[derive(Debug, Default)]
pub struct SaveSummary {
    pub saved: Vec<(String, SaveReport)>,
    pub failed: Vec<(String, KeepError)>,
}

impl SaveSummary {
    /// Sessions whose bytes hit the disk.
    pub fn written(&self) -> usize {
        self.saved.iter().filter(|(_, r)| r.written).count()
    }

    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// A profile store wired to one persistence strategy.
pub struct ProfileHost {
    state: HostState,
    strategy: Box<dyn PersistenceStrategy>,
}

impl ProfileHost {
    pub fn new(state: HostState, strategy: Box<dyn PersistenceStrategy>) -> Self {
        Self { state, strategy }
    }

    pub fn state(&self) -> &HostState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut HostState {
        &mut self.state
    }

    pub fn profile(&self, session_id: &str) -> Result<&Profile> {
        self.state.profile(session_id)
    }

    pub fn insert_profile(&mut self, session_id: impl Into<String>, profile: Profile) {
        self.state.profiles.insert(session_id.into(), profile);
    }

    pub fn save_profile(&mut self, session_id: &str) -> Result<SaveReport> {
        self.strategy.save(&mut self.state, session_id)
    }

    pub fn load_profile(&mut self, name: &str) -> Result<()> {
        self.strategy.load(&mut self.state, name)
    }

    /// Save every profile in the map, in session-id order.
    ///
    /// A session that fails to save is logged and recorded in
    /// `SaveSummary::failed`; the remaining sessions are still saved.
    pub fn save_all(&mut self) -> SaveSummary {
        let mut ids: Vec<String> = self.state.profiles.keys().cloned().collect();
        ids.sort();

        let mut summary = SaveSummary::default();
        for id in ids {
            match self.save_profile(&id) {
                Ok(report) => summary.saved.push((id, report)),
                Err(err) => {
                    error!(session_id = %id, error = %err, "profile save failed");
                    summary.failed.push((id, err));
                }
            }
        }
        summary
    }

    /// Load every `*.json` file in the profile directory. Returns how many were loaded.
    pub fn load_all(&mut self) -> Result<usize> {
        let names = discover_profiles(&self.state.profile_dir)?;
        for name in &names {
            self.load_profile(name)?;
        }
        Ok(names.len())
    }
}

/// File stems of `*.json` files directly inside `dir`, sorted.
pub fn discover_profiles(dir: &Path) -> Result<Vec<String>> {
    let entries = fs::read_dir(dir).map_err(|e| KeepError::io(dir, e))?;

    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| KeepError::io(dir, e))?;
        let path = entry.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                names.push(stem.to_string());
            }
        }
    }
    names.sort();
    Ok(names)
}
