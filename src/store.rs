use anyhow::{Context, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Path, PathBuf};

use crate::models::{JobApplication, UserProfile, ViewMode};

const APPS_SLOT: &str = "applications.json";
const PROFILE_SLOT: &str = "profile.json";
const VIEW_SLOT: &str = "view.json";

/// Whole-file JSON slot storage. Each slot holds one JSON value and is
/// replaced on every write; there is no locking and no partial update, so the
/// only ordering guarantee is last write wins.
pub struct Store {
    dir: PathBuf,
}

impl Store {
    pub fn open() -> Result<Self> {
        Self::open_at(Self::default_dir())
    }

    pub fn open_at(dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create data directory {}", dir.display()))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn default_dir() -> PathBuf {
        // Use XDG data directory or fallback
        if let Some(proj_dirs) = directories::ProjectDirs::from("", "", "hiretrace") {
            proj_dirs.data_dir().to_path_buf()
        } else {
            PathBuf::from(".hiretrace")
        }
    }

    /// Absent slot yields the default; a present but unparsable slot fails
    /// during parse and the error propagates to the caller.
    fn read_slot<T: DeserializeOwned>(&self, slot: &str, default: impl FnOnce() -> T) -> Result<T> {
        let path = self.dir.join(slot);
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(default()),
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read {}", path.display()));
            }
        };
        serde_json::from_str(&raw).with_context(|| format!("Failed to parse {}", path.display()))
    }

    fn write_slot<T: Serialize>(&self, slot: &str, value: &T) -> Result<()> {
        let path = self.dir.join(slot);
        let json = serde_json::to_string_pretty(value)?;
        fs::write(&path, json).with_context(|| format!("Failed to write {}", path.display()))
    }

    pub fn load_applications(&self) -> Result<Vec<JobApplication>> {
        self.read_slot(APPS_SLOT, Vec::new)
    }

    pub fn save_applications(&self, apps: &[JobApplication]) -> Result<()> {
        self.write_slot(APPS_SLOT, &apps)
    }

    pub fn load_profile(&self) -> Result<UserProfile> {
        self.read_slot(PROFILE_SLOT, UserProfile::default)
    }

    pub fn save_profile(&self, profile: &UserProfile) -> Result<()> {
        self.write_slot(PROFILE_SLOT, profile)
    }

    pub fn load_view_mode(&self) -> Result<ViewMode> {
        self.read_slot(VIEW_SLOT, || ViewMode::Grid)
    }

    pub fn save_view_mode(&self, mode: ViewMode) -> Result<()> {
        self.write_slot(VIEW_SLOT, &mode)
    }
}
