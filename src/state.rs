use anyhow::{Result, anyhow};
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};

use crate::models::{
    ActivityEntry, ActivityKind, JobApplication, JobDraft, JobStatus, UserProfile, new_id,
};

pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// An important date falling inside the reminder window, annotated with its
/// owning application.
#[derive(Debug, Clone, PartialEq)]
pub struct Deadline {
    pub label: String,
    pub when: DateTime<Utc>,
    pub role: String,
    pub company: String,
}

/// Single owner of the in-memory application list and profile. All mutations
/// go through here; presentation gets read-only views.
pub struct Tracker {
    applications: Vec<JobApplication>,
    profile: UserProfile,
}

impl Tracker {
    pub fn new(applications: Vec<JobApplication>, profile: UserProfile) -> Self {
        Self {
            applications,
            profile,
        }
    }

    pub fn applications(&self) -> &[JobApplication] {
        &self.applications
    }

    pub fn profile(&self) -> &UserProfile {
        &self.profile
    }

    /// Profile saves are wholesale, never field-by-field.
    pub fn set_profile(&mut self, profile: UserProfile) {
        self.profile = profile;
    }

    pub fn get(&self, id: &str) -> Option<&JobApplication> {
        self.applications.iter().find(|a| a.id == id)
    }

    /// Resolve a full id or unique id prefix.
    pub fn resolve_id(&self, prefix: &str) -> Result<String> {
        if let Some(app) = self.get(prefix) {
            return Ok(app.id.clone());
        }
        let matches: Vec<&JobApplication> = self
            .applications
            .iter()
            .filter(|a| a.id.starts_with(prefix))
            .collect();
        match matches.len() {
            0 => Err(anyhow!("No application matches id '{}'", prefix)),
            1 => Ok(matches[0].id.clone()),
            n => Err(anyhow!(
                "Id '{}' is ambiguous ({} applications match)",
                prefix,
                n
            )),
        }
    }

    /// Create an application from a draft: assigns an id, stamps lastUpdated,
    /// seeds the activity log with a single "Application created" entry, and
    /// prepends to the list. Returns the id.
    pub fn create(&mut self, draft: JobDraft) -> String {
        let now = now_millis();
        let id = new_id();
        let app = JobApplication {
            id: id.clone(),
            company: draft.company,
            role: draft.role,
            url: draft.url,
            status: draft.status.unwrap_or(JobStatus::Wishlist),
            applied_date: draft.applied_date,
            important_dates: draft.important_dates,
            notes: draft.notes,
            salary: draft.salary,
            location: draft.location,
            last_updated: now,
            activity_log: vec![ActivityEntry {
                id: new_id(),
                timestamp: now,
                note: "Application created".to_string(),
                kind: ActivityKind::StatusChange,
            }],
        };
        self.applications.insert(0, app);
        id
    }

    /// Replace the entry with a matching id verbatim. The caller is
    /// responsible for any log entries on field edits; there is no diffing.
    pub fn update(&mut self, app: JobApplication) -> bool {
        match self.applications.iter_mut().find(|a| a.id == app.id) {
            Some(slot) => {
                *slot = app;
                true
            }
            None => false,
        }
    }

    /// Move an application to a new status. A no-op when the status is
    /// unchanged; otherwise appends one status_change log entry and bumps
    /// lastUpdated, both from the same clock read.
    pub fn change_status(&mut self, id: &str, status: JobStatus) -> bool {
        let Some(app) = self.applications.iter_mut().find(|a| a.id == id) else {
            return false;
        };
        if app.status == status {
            return false;
        }
        let now = now_millis();
        app.activity_log.push(ActivityEntry {
            id: new_id(),
            timestamp: now,
            note: format!("Status updated to {}", status),
            kind: ActivityKind::StatusChange,
        });
        app.status = status;
        app.last_updated = now;
        true
    }

    /// Append a free-text manual_note entry and bump lastUpdated.
    pub fn add_note(&mut self, id: &str, text: &str) -> bool {
        let Some(app) = self.applications.iter_mut().find(|a| a.id == id) else {
            return false;
        };
        let now = now_millis();
        app.activity_log.push(ActivityEntry {
            id: new_id(),
            timestamp: now,
            note: text.to_string(),
            kind: ActivityKind::ManualNote,
        });
        app.last_updated = now;
        true
    }

    /// Remove by id. Irreversible; confirmation is a presentation concern.
    pub fn delete(&mut self, id: &str) -> bool {
        let before = self.applications.len();
        self.applications.retain(|a| a.id != id);
        self.applications.len() != before
    }

    /// Derived view: case-insensitive substring match of the query against
    /// company or role, AND the status filter (None = All), ordered by
    /// lastUpdated descending. Pure function of current state.
    pub fn filtered(&self, query: &str, filter: Option<JobStatus>) -> Vec<&JobApplication> {
        let needle = query.to_lowercase();
        let mut out: Vec<&JobApplication> = self
            .applications
            .iter()
            .filter(|a| {
                let matches_query = needle.is_empty()
                    || a.company.to_lowercase().contains(&needle)
                    || a.role.to_lowercase().contains(&needle);
                let matches_filter = filter.is_none_or(|f| a.status == f);
                matches_query && matches_filter
            })
            .collect();
        out.sort_by(|a, b| b.last_updated.cmp(&a.last_updated));
        out
    }

    /// Derived view: every important date across all applications falling in
    /// [now, now + 48h], inclusive at both ends, in natural application order.
    pub fn upcoming_deadlines(&self, now: DateTime<Utc>) -> Vec<Deadline> {
        let horizon = now + Duration::hours(48);
        self.applications
            .iter()
            .flat_map(|app| {
                app.important_dates.iter().filter_map(|d| {
                    let when = parse_when(&d.date)?;
                    if when >= now && when <= horizon {
                        Some(Deadline {
                            label: d.label.clone(),
                            when,
                            role: app.role.clone(),
                            company: app.company.clone(),
                        })
                    } else {
                        None
                    }
                })
            })
            .collect()
    }

    /// Derived view: per-status totals in pipeline order.
    pub fn status_counts(&self) -> Vec<(JobStatus, usize)> {
        JobStatus::ALL
            .iter()
            .map(|&s| {
                (
                    s,
                    self.applications.iter().filter(|a| a.status == s).count(),
                )
            })
            .collect()
    }
}

/// Parse a stored date string: RFC3339, "YYYY-MM-DDTHH:MM[:SS]", or bare
/// "YYYY-MM-DD" taken as midnight UTC.
fn parse_when(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"] {
        if let Ok(ndt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(ndt.and_utc());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(date.and_hms_opt(0, 0, 0)?.and_utc());
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ImportantDate;
    use chrono::TimeZone;

    fn tracker() -> Tracker {
        Tracker::new(Vec::new(), UserProfile::default())
    }

    fn draft(company: &str, role: &str) -> JobDraft {
        JobDraft {
            company: company.to_string(),
            role: role.to_string(),
            applied_date: "2026-08-01".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_create_seeds_single_log_entry() {
        let mut t = tracker();
        let before = now_millis();
        let id = t.create(draft("Acme", "Engineer"));
        let after = now_millis();

        let app = t.get(&id).unwrap();
        assert_eq!(app.activity_log.len(), 1);
        assert_eq!(app.activity_log[0].kind, ActivityKind::StatusChange);
        assert_eq!(app.activity_log[0].note, "Application created");
        assert!(app.last_updated >= before && app.last_updated <= after);
        assert_eq!(app.status, JobStatus::Wishlist);
    }

    #[test]
    fn test_create_prepends() {
        let mut t = tracker();
        t.create(draft("First", "A"));
        let second = t.create(draft("Second", "B"));
        assert_eq!(t.applications()[0].id, second);
    }

    #[test]
    fn test_status_change_to_same_status_is_noop() {
        let mut t = tracker();
        let id = t.create(draft("Acme", "Engineer"));
        let snapshot = t.get(&id).unwrap().clone();

        assert!(!t.change_status(&id, JobStatus::Wishlist));

        let app = t.get(&id).unwrap();
        assert_eq!(app.activity_log.len(), 1);
        assert_eq!(app.last_updated, snapshot.last_updated);
        assert_eq!(*app, snapshot);
    }

    #[test]
    fn test_status_change_appends_one_entry() {
        let mut t = tracker();
        let id = t.create(draft("Acme", "Engineer"));
        let before = now_millis();

        assert!(t.change_status(&id, JobStatus::Applied));

        let app = t.get(&id).unwrap();
        assert_eq!(app.status, JobStatus::Applied);
        assert_eq!(app.activity_log.len(), 2);
        let entry = &app.activity_log[1];
        assert_eq!(entry.note, "Status updated to Applied");
        assert_eq!(entry.kind, ActivityKind::StatusChange);
        assert!(app.last_updated >= before);
        assert_eq!(app.last_updated, entry.timestamp);
    }

    #[test]
    fn test_log_stays_time_ordered_after_mutations() {
        let mut t = tracker();
        let id = t.create(draft("Acme", "Engineer"));
        t.change_status(&id, JobStatus::Applied);
        t.add_note(&id, "Spoke with recruiter");
        t.change_status(&id, JobStatus::Interviewing);

        let app = t.get(&id).unwrap();
        let stamps: Vec<i64> = app.activity_log.iter().map(|e| e.timestamp).collect();
        assert!(stamps.windows(2).all(|w| w[0] <= w[1]));
        assert!(app.last_updated >= *stamps.last().unwrap());
    }

    #[test]
    fn test_add_note_appends_manual_note() {
        let mut t = tracker();
        let id = t.create(draft("Acme", "Engineer"));
        let prev_updated = t.get(&id).unwrap().last_updated;

        assert!(t.add_note(&id, "Sent follow-up email"));

        let app = t.get(&id).unwrap();
        assert_eq!(app.activity_log.len(), 2);
        assert_eq!(app.activity_log[1].kind, ActivityKind::ManualNote);
        assert_eq!(app.activity_log[1].note, "Sent follow-up email");
        assert!(app.last_updated >= prev_updated);
    }

    #[test]
    fn test_update_replaces_verbatim() {
        let mut t = tracker();
        let id = t.create(draft("Acme", "Engineer"));
        let mut edited = t.get(&id).unwrap().clone();
        edited.company = "Acme Corp".to_string();
        edited.salary = "$150k".to_string();
        edited.last_updated += 1;

        assert!(t.update(edited.clone()));
        assert_eq!(*t.get(&id).unwrap(), edited);

        let mut unknown = edited;
        unknown.id = "nope".to_string();
        assert!(!t.update(unknown));
    }

    #[test]
    fn test_delete_removes_entry() {
        let mut t = tracker();
        let id = t.create(draft("Acme", "Engineer"));
        assert!(t.delete(&id));
        assert!(t.get(&id).is_none());
        assert!(!t.delete(&id));
    }

    #[test]
    fn test_filtered_matches_company_or_role_case_insensitive() {
        let mut t = tracker();
        t.create(draft("Acme", "Backend Engineer"));
        t.create(draft("Globex", "Product Manager"));
        t.create(draft("Initech", "engineer, platform"));

        let hits = t.filtered("ENGINEER", None);
        assert_eq!(hits.len(), 2);
        assert!(hits.iter().all(|a| a.role.to_lowercase().contains("engineer")));

        let hits = t.filtered("globex", None);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].company, "Globex");
    }

    #[test]
    fn test_filtered_applies_status_filter() {
        let mut t = tracker();
        let a = t.create(draft("Acme", "Engineer"));
        t.create(draft("Globex", "Engineer"));
        t.change_status(&a, JobStatus::Applied);

        let hits = t.filtered("", Some(JobStatus::Applied));
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, a);

        let hits = t.filtered("engineer", Some(JobStatus::Wishlist));
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].company, "Globex");
    }

    #[test]
    fn test_filtered_sorted_by_last_updated_desc_and_idempotent() {
        let mut t = tracker();
        let a = t.create(draft("Acme", "Engineer"));
        let b = t.create(draft("Globex", "Engineer"));
        let c = t.create(draft("Initech", "Engineer"));

        // Bump the oldest past everything else so the order differs from
        // insertion order regardless of clock resolution.
        let newest = t.applications().iter().map(|x| x.last_updated).max().unwrap();
        let mut bumped = t.get(&a).unwrap().clone();
        bumped.last_updated = newest + 10;
        t.update(bumped);

        let first: Vec<String> = t.filtered("", None).iter().map(|x| x.id.clone()).collect();
        let second: Vec<String> = t.filtered("", None).iter().map(|x| x.id.clone()).collect();
        assert_eq!(first, second);

        let updated: Vec<i64> = t.filtered("", None).iter().map(|x| x.last_updated).collect();
        assert!(updated.windows(2).all(|w| w[0] >= w[1]));
        assert_eq!(first[0], a);
        assert!(first.contains(&b) && first.contains(&c));
    }

    #[test]
    fn test_deadline_window_boundaries() {
        let now = Utc.with_ymd_and_hms(2026, 8, 7, 12, 0, 0).unwrap();
        let mut t = tracker();
        let id = t.create(draft("Acme", "Engineer"));
        let mut app = t.get(&id).unwrap().clone();
        app.important_dates = vec![
            ImportantDate {
                label: "at horizon".to_string(),
                date: "2026-08-09T12:00:00Z".to_string(),
            },
            ImportantDate {
                label: "past horizon".to_string(),
                date: "2026-08-09T12:00:00.001Z".to_string(),
            },
            ImportantDate {
                label: "in the past".to_string(),
                date: "2026-08-07T11:59:59Z".to_string(),
            },
            ImportantDate {
                label: "right now".to_string(),
                date: "2026-08-07T12:00:00Z".to_string(),
            },
        ];
        t.update(app);

        let due: Vec<String> = t
            .upcoming_deadlines(now)
            .into_iter()
            .map(|d| d.label)
            .collect();
        assert_eq!(due, vec!["at horizon".to_string(), "right now".to_string()]);
    }

    #[test]
    fn test_deadlines_annotated_with_owning_application() {
        let now = Utc.with_ymd_and_hms(2026, 8, 7, 12, 0, 0).unwrap();
        let mut t = tracker();
        let id = t.create(draft("Acme", "Engineer"));
        let mut app = t.get(&id).unwrap().clone();
        app.important_dates = vec![ImportantDate {
            label: "Phone screen".to_string(),
            date: "2026-08-08".to_string(),
        }];
        t.update(app);

        let due = t.upcoming_deadlines(now);
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].role, "Engineer");
        assert_eq!(due[0].company, "Acme");
        assert_eq!(due[0].when, Utc.with_ymd_and_hms(2026, 8, 8, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_unparsable_dates_are_skipped() {
        let now = Utc.with_ymd_and_hms(2026, 8, 7, 12, 0, 0).unwrap();
        let mut t = tracker();
        let id = t.create(draft("Acme", "Engineer"));
        let mut app = t.get(&id).unwrap().clone();
        app.important_dates = vec![ImportantDate {
            label: "sometime".to_string(),
            date: "next Tuesday".to_string(),
        }];
        t.update(app);
        assert!(t.upcoming_deadlines(now).is_empty());
    }

    #[test]
    fn test_status_counts_in_pipeline_order() {
        let mut t = tracker();
        let a = t.create(draft("Acme", "Engineer"));
        t.create(draft("Globex", "PM"));
        t.change_status(&a, JobStatus::Offer);

        let counts = t.status_counts();
        assert_eq!(counts.len(), 6);
        assert_eq!(counts[0], (JobStatus::Wishlist, 1));
        assert_eq!(counts[3], (JobStatus::Offer, 1));
        assert_eq!(counts.iter().map(|(_, n)| n).sum::<usize>(), 2);
    }

    #[test]
    fn test_resolve_id_by_unique_prefix() {
        let mut t = tracker();
        let id = t.create(draft("Acme", "Engineer"));
        assert_eq!(t.resolve_id(&id).unwrap(), id);
        assert_eq!(t.resolve_id(&id[..6]).unwrap(), id);
        assert!(t.resolve_id("definitely-not-an-id").is_err());
    }

    #[test]
    fn test_acme_scenario() {
        let mut t = tracker();
        let id = t.create(JobDraft {
            company: "Acme".to_string(),
            role: "Engineer".to_string(),
            status: Some(JobStatus::Wishlist),
            ..Default::default()
        });

        assert_eq!(t.applications().len(), 1);
        let app = t.get(&id).unwrap();
        assert_eq!(app.activity_log.len(), 1);
        assert_eq!(app.activity_log[0].note, "Application created");

        t.change_status(&id, JobStatus::Applied);
        let app = t.get(&id).unwrap();
        assert_eq!(app.activity_log.len(), 2);
        assert_eq!(app.activity_log[1].note, "Status updated to Applied");
        assert_eq!(app.status, JobStatus::Applied);
    }
}
