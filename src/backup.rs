use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::models::{JobApplication, UserProfile};

/// Import failures the user must see differently: an unreadable/unparsable
/// file versus a well-formed JSON document that is not a backup.
#[derive(Debug, Error)]
pub enum BackupError {
    #[error("Failed to read the backup file")]
    Read(#[source] std::io::Error),
    #[error("Failed to read the backup file")]
    Parse(#[source] serde_json::Error),
    #[error("Invalid backup file format")]
    InvalidFormat,
}

/// On-disk backup document: `{ applications, profile, exportedAt }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupSnapshot {
    pub applications: Vec<JobApplication>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<UserProfile>,
    pub exported_at: String,
}

pub fn snapshot(applications: &[JobApplication], profile: &UserProfile) -> BackupSnapshot {
    BackupSnapshot {
        applications: applications.to_vec(),
        profile: Some(profile.clone()),
        exported_at: Utc::now().to_rfc3339(),
    }
}

pub fn default_filename(date: NaiveDate) -> String {
    format!("hiretrace-backup-{}.json", date.format("%Y-%m-%d"))
}

pub fn write_backup(path: &Path, snapshot: &BackupSnapshot) -> Result<()> {
    let json = serde_json::to_string_pretty(snapshot)?;
    fs::write(path, json).with_context(|| format!("Failed to write backup to {}", path.display()))
}

pub fn read_backup(path: &Path) -> std::result::Result<BackupSnapshot, BackupError> {
    let raw = fs::read_to_string(path).map_err(BackupError::Read)?;
    parse_backup(&raw)
}

/// Accept only documents carrying an array-typed `applications` field whose
/// records deserialize as applications. Anything else is an invalid format;
/// non-JSON input is a read failure.
pub fn parse_backup(raw: &str) -> std::result::Result<BackupSnapshot, BackupError> {
    let value: serde_json::Value = serde_json::from_str(raw).map_err(BackupError::Parse)?;
    let is_backup = value
        .get("applications")
        .map(|a| a.is_array())
        .unwrap_or(false);
    if !is_backup {
        return Err(BackupError::InvalidFormat);
    }
    serde_json::from_value(value).map_err(|_| BackupError::InvalidFormat)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{JobDraft, Theme};
    use crate::state::Tracker;
    use tempfile::TempDir;

    fn sample_tracker() -> Tracker {
        let mut t = Tracker::new(
            Vec::new(),
            UserProfile {
                name: "Jo".to_string(),
                master_resume: "Resume text".to_string(),
                theme: Theme::Indigo,
            },
        );
        t.create(JobDraft {
            company: "Acme".to_string(),
            role: "Engineer".to_string(),
            ..Default::default()
        });
        t.create(JobDraft {
            company: "Globex".to_string(),
            role: "Product Manager".to_string(),
            ..Default::default()
        });
        t
    }

    #[test]
    fn test_export_import_round_trip() {
        let tracker = sample_tracker();
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(default_filename(
            NaiveDate::from_ymd_opt(2026, 8, 7).unwrap(),
        ));

        let snap = snapshot(tracker.applications(), tracker.profile());
        write_backup(&path, &snap).unwrap();

        let restored = read_backup(&path).unwrap();
        assert_eq!(restored.applications, tracker.applications());
        assert_eq!(restored.profile.as_ref(), Some(tracker.profile()));
        assert_eq!(restored.exported_at, snap.exported_at);
    }

    #[test]
    fn test_default_filename_is_date_stamped() {
        let name = default_filename(NaiveDate::from_ymd_opt(2026, 8, 7).unwrap());
        assert_eq!(name, "hiretrace-backup-2026-08-07.json");
    }

    #[test]
    fn test_exported_at_is_rfc3339() {
        let tracker = sample_tracker();
        let snap = snapshot(tracker.applications(), tracker.profile());
        assert!(chrono::DateTime::parse_from_rfc3339(&snap.exported_at).is_ok());
    }

    #[test]
    fn test_rejects_missing_applications_field() {
        let err = parse_backup(r#"{"profile": {"theme": "light"}}"#).unwrap_err();
        assert!(matches!(err, BackupError::InvalidFormat));
    }

    #[test]
    fn test_rejects_non_array_applications_field() {
        let err = parse_backup(r#"{"applications": {"0": {}}, "exportedAt": "x"}"#).unwrap_err();
        assert!(matches!(err, BackupError::InvalidFormat));
    }

    #[test]
    fn test_rejects_malformed_records_as_invalid_format() {
        let raw = r#"{"applications": [{"company": "Acme"}], "exportedAt": "2026-08-07T00:00:00Z"}"#;
        let err = parse_backup(raw).unwrap_err();
        assert!(matches!(err, BackupError::InvalidFormat));
    }

    #[test]
    fn test_non_json_is_a_read_failure() {
        let err = parse_backup("this is not json").unwrap_err();
        assert!(matches!(err, BackupError::Parse(_)));
        assert_eq!(err.to_string(), "Failed to read the backup file");
    }

    #[test]
    fn test_profile_is_optional_on_import() {
        let raw = r#"{"applications": [], "exportedAt": "2026-08-07T00:00:00Z"}"#;
        let snap = parse_backup(raw).unwrap();
        assert!(snap.profile.is_none());
        assert!(snap.applications.is_empty());
    }
}
