use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Pipeline stage of an application. Serialized forms match the persisted
/// data contract ("Wishlist", "Applied", ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatus {
    Wishlist,
    Applied,
    Interviewing,
    Offer,
    Rejected,
    Ghosted,
}

impl JobStatus {
    /// Pipeline order, used for board columns and stats.
    pub const ALL: [JobStatus; 6] = [
        JobStatus::Wishlist,
        JobStatus::Applied,
        JobStatus::Interviewing,
        JobStatus::Offer,
        JobStatus::Rejected,
        JobStatus::Ghosted,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Wishlist => "Wishlist",
            JobStatus::Applied => "Applied",
            JobStatus::Interviewing => "Interviewing",
            JobStatus::Offer => "Offer",
            JobStatus::Rejected => "Rejected",
            JobStatus::Ghosted => "Ghosted",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "wishlist" => Ok(JobStatus::Wishlist),
            "applied" => Ok(JobStatus::Applied),
            "interviewing" => Ok(JobStatus::Interviewing),
            "offer" => Ok(JobStatus::Offer),
            "rejected" => Ok(JobStatus::Rejected),
            "ghosted" => Ok(JobStatus::Ghosted),
            _ => Err(format!(
                "Unknown status '{}'. Expected one of: wishlist, applied, interviewing, offer, rejected, ghosted",
                s
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    StatusChange,
    ManualNote,
}

/// One immutable entry in an application's activity log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityEntry {
    pub id: String,
    /// Epoch milliseconds.
    pub timestamp: i64,
    pub note: String,
    #[serde(rename = "type")]
    pub kind: ActivityKind,
}

/// A labeled calendar event tied to one application (e.g. an interview date).
/// Dates are stored as entered: "YYYY-MM-DD" or a full RFC3339 timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportantDate {
    pub label: String,
    pub date: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobApplication {
    pub id: String,
    pub company: String,
    pub role: String,
    #[serde(default)]
    pub url: String,
    pub status: JobStatus,
    #[serde(default)]
    pub applied_date: String,
    #[serde(default)]
    pub important_dates: Vec<ImportantDate>,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub salary: String,
    #[serde(default)]
    pub location: String,
    /// Epoch milliseconds of the most recent mutation. Never behind the
    /// newest activity log timestamp.
    pub last_updated: i64,
    #[serde(default)]
    pub activity_log: Vec<ActivityEntry>,
}

/// Input for creating an application: everything the user supplies, nothing
/// the tracker assigns (id, lastUpdated, activity log).
#[derive(Debug, Clone, Default)]
pub struct JobDraft {
    pub company: String,
    pub role: String,
    pub url: String,
    pub status: Option<JobStatus>,
    pub applied_date: String,
    pub important_dates: Vec<ImportantDate>,
    pub notes: String,
    pub salary: String,
    pub location: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
    Indigo,
    Sage,
    Sunset,
}

impl Theme {
    pub const ALL: [Theme; 5] = [
        Theme::Light,
        Theme::Dark,
        Theme::Indigo,
        Theme::Sage,
        Theme::Sunset,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
            Theme::Indigo => "indigo",
            Theme::Sage => "sage",
            Theme::Sunset => "sunset",
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Theme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            "indigo" => Ok(Theme::Indigo),
            "sage" => Ok(Theme::Sage),
            "sunset" => Ok(Theme::Sunset),
            _ => Err(format!(
                "Unknown theme '{}'. Expected one of: light, dark, indigo, sage, sunset",
                s
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub master_resume: String,
    pub theme: Theme,
}

impl Default for UserProfile {
    fn default() -> Self {
        Self {
            name: String::new(),
            master_resume: String::new(),
            theme: Theme::Light,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    Grid,
    Board,
}

impl ViewMode {
    pub fn toggled(self) -> Self {
        match self {
            ViewMode::Grid => ViewMode::Board,
            ViewMode::Board => ViewMode::Grid,
        }
    }
}

/// Structured result of an AI analysis request. Transient; never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiAnalysis {
    pub summary: String,
    #[serde(default)]
    pub interview_tips: Vec<String>,
    #[serde(default)]
    pub follow_up_draft: String,
    pub match_score: Option<f64>,
    pub missing_keywords: Option<Vec<String>>,
}

/// A web reference returned alongside AI research text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroundingSource {
    pub uri: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompanyResearch {
    pub text: String,
    pub sources: Vec<GroundingSource>,
}

/// Opaque unique id for applications and log entries.
pub fn new_id() -> String {
    let mut rng = rand::thread_rng();
    (0..16)
        .map(|_| rng.sample(rand::distributions::Alphanumeric) as char)
        .collect()
}
