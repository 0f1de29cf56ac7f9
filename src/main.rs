mod ai;
mod backup;
mod models;
mod state;
mod store;
mod tui;

use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, Local, Utc};
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;

use ai::GeminiClient;
use models::{ImportantDate, JobDraft, JobStatus, Theme, UserProfile};
use state::Tracker;
use store::Store;

#[derive(Parser)]
#[command(name = "hiretrace")]
#[command(about = "Track job applications - pipeline, reminders, backups, and AI insight")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a job application
    Add {
        /// Company name
        company: String,

        /// Role title
        role: String,

        /// Job posting URL
        #[arg(short, long)]
        url: Option<String>,

        /// Initial status (wishlist, applied, interviewing, offer, rejected, ghosted)
        #[arg(short, long)]
        status: Option<String>,

        /// Date applied (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        applied: Option<String>,

        /// Location
        #[arg(short, long)]
        location: Option<String>,

        /// Salary text, e.g. "$150k - $180k"
        #[arg(long)]
        salary: Option<String>,

        /// Free-text notes
        #[arg(short, long)]
        notes: Option<String>,

        /// Important date as "label=YYYY-MM-DD" (repeatable)
        #[arg(long = "date", value_name = "LABEL=DATE")]
        dates: Vec<String>,
    },

    /// List applications
    List {
        /// Filter by status (wishlist, applied, interviewing, offer, rejected, ghosted)
        #[arg(short, long)]
        status: Option<String>,

        /// Case-insensitive match against company or role
        #[arg(short, long)]
        query: Option<String>,
    },

    /// Show application details
    Show {
        /// Application id (any unique prefix)
        id: String,
    },

    /// Edit fields on an application
    Edit {
        /// Application id (any unique prefix)
        id: String,

        #[arg(long)]
        company: Option<String>,

        #[arg(long)]
        role: Option<String>,

        #[arg(long)]
        url: Option<String>,

        #[arg(long)]
        applied: Option<String>,

        #[arg(long)]
        location: Option<String>,

        #[arg(long)]
        salary: Option<String>,

        /// Replace the free-text notes
        #[arg(long)]
        notes: Option<String>,

        /// Add an important date as "label=YYYY-MM-DD" (repeatable)
        #[arg(long = "date", value_name = "LABEL=DATE")]
        dates: Vec<String>,
    },

    /// Move an application to a new status
    Status {
        /// Application id (any unique prefix)
        id: String,

        /// New status (wishlist, applied, interviewing, offer, rejected, ghosted)
        status: String,
    },

    /// Append a note to an application's activity log
    Note {
        /// Application id (any unique prefix)
        id: String,

        /// Note text
        text: String,
    },

    /// Delete an application
    Delete {
        /// Application id (any unique prefix)
        id: String,

        /// Skip confirmation
        #[arg(short, long)]
        yes: bool,
    },

    /// Open the interactive board
    Board,

    /// Show pipeline stats
    Stats,

    /// Show important dates due in the next 48 hours
    Reminders,

    /// Export applications and profile to a backup file
    Export {
        /// Output path (defaults to hiretrace-backup-<YYYY-MM-DD>.json)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Import a backup file, replacing all current data
    Import {
        /// Backup file to import
        file: PathBuf,

        /// Skip confirmation
        #[arg(short, long)]
        yes: bool,
    },

    /// Manage your search profile
    Profile {
        #[command(subcommand)]
        command: ProfileCommands,
    },

    /// AI analysis of an application (summary, interview tips, resume match)
    Analyze {
        /// Application id (any unique prefix)
        id: String,

        /// Skip resume matching even if a master resume is saved
        #[arg(long)]
        no_resume: bool,
    },

    /// AI web research about a company
    Research {
        /// Company name
        company: String,
    },
}

#[derive(Subcommand)]
enum ProfileCommands {
    /// Show the saved profile
    Show,

    /// Set your name
    Name { name: String },

    /// Load master resume text from a file
    Resume {
        /// Path to a plain-text resume
        file: PathBuf,
    },

    /// Set the color theme (light, dark, indigo, sage, sunset)
    Theme { theme: String },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let store = Store::open()?;
    let mut tracker = Tracker::new(store.load_applications()?, store.load_profile()?);

    match cli.command {
        Commands::Add {
            company,
            role,
            url,
            status,
            applied,
            location,
            salary,
            notes,
            dates,
        } => {
            let status = status.map(|s| parse_status(&s)).transpose()?;
            let important_dates = dates
                .iter()
                .map(|d| parse_date_arg(d))
                .collect::<Result<Vec<_>>>()?;

            let id = tracker.create(JobDraft {
                company,
                role,
                url: url.unwrap_or_default(),
                status,
                applied_date: applied
                    .unwrap_or_else(|| Local::now().format("%Y-%m-%d").to_string()),
                important_dates,
                notes: notes.unwrap_or_default(),
                salary: salary.unwrap_or_default(),
                location: location.unwrap_or_default(),
            });
            store.save_applications(tracker.applications())?;
            println!("Added application {}", id);
        }

        Commands::List { status, query } => {
            let filter = status.map(|s| parse_status(&s)).transpose()?;
            let apps = tracker.filtered(query.as_deref().unwrap_or(""), filter);
            if apps.is_empty() {
                println!("No applications found.");
            } else {
                println!(
                    "{:<18} {:<13} {:<22} {:<26} {:<17}",
                    "ID", "STATUS", "COMPANY", "ROLE", "UPDATED"
                );
                println!("{}", "-".repeat(96));
                for app in apps {
                    println!(
                        "{:<18} {:<13} {:<22} {:<26} {:<17}",
                        app.id,
                        app.status.to_string(),
                        truncate(&app.company, 20),
                        truncate(&app.role, 24),
                        fmt_millis(app.last_updated)
                    );
                }
            }
        }

        Commands::Show { id } => {
            let id = tracker.resolve_id(&id)?;
            let app = tracker
                .get(&id)
                .ok_or_else(|| anyhow!("Application {} not found", id))?;
            println!("{} @ {}", app.role, app.company);
            println!("Id: {}", app.id);
            println!("Status: {}", app.status);
            if !app.url.is_empty() {
                println!("URL: {}", app.url);
            }
            if !app.location.is_empty() {
                println!("Location: {}", app.location);
            }
            if !app.salary.is_empty() {
                println!("Salary: {}", app.salary);
            }
            if !app.applied_date.is_empty() {
                println!("Applied: {}", app.applied_date);
            }
            println!("Updated: {}", fmt_millis(app.last_updated));
            if !app.important_dates.is_empty() {
                println!("\nImportant dates:");
                for d in &app.important_dates {
                    println!("  {} - {}", d.date, d.label);
                }
            }
            if !app.notes.is_empty() {
                println!("\nNotes:\n{}", textwrap::indent(&textwrap::fill(&app.notes, 76), "  "));
            }
            if !app.activity_log.is_empty() {
                println!("\nActivity:");
                for entry in &app.activity_log {
                    println!("  {}  {}", fmt_millis(entry.timestamp), entry.note);
                }
            }
        }

        Commands::Edit {
            id,
            company,
            role,
            url,
            applied,
            location,
            salary,
            notes,
            dates,
        } => {
            let id = tracker.resolve_id(&id)?;
            let mut app = tracker
                .get(&id)
                .ok_or_else(|| anyhow!("Application {} not found", id))?
                .clone();

            if let Some(v) = company {
                app.company = v;
            }
            if let Some(v) = role {
                app.role = v;
            }
            if let Some(v) = url {
                app.url = v;
            }
            if let Some(v) = applied {
                app.applied_date = v;
            }
            if let Some(v) = location {
                app.location = v;
            }
            if let Some(v) = salary {
                app.salary = v;
            }
            if let Some(v) = notes {
                app.notes = v;
            }
            for d in &dates {
                app.important_dates.push(parse_date_arg(d)?);
            }
            app.last_updated = state::now_millis();

            tracker.update(app);
            store.save_applications(tracker.applications())?;
            println!("Updated application {}", id);
        }

        Commands::Status { id, status } => {
            let id = tracker.resolve_id(&id)?;
            let status = parse_status(&status)?;
            if tracker.change_status(&id, status) {
                store.save_applications(tracker.applications())?;
                println!("Moved {} to {}", id, status);
            } else {
                println!("Status unchanged.");
            }
        }

        Commands::Note { id, text } => {
            let id = tracker.resolve_id(&id)?;
            tracker.add_note(&id, &text);
            store.save_applications(tracker.applications())?;
            println!("Added note to {}", id);
        }

        Commands::Delete { id, yes } => {
            let id = tracker.resolve_id(&id)?;
            let app = tracker
                .get(&id)
                .ok_or_else(|| anyhow!("Application {} not found", id))?;
            let label = format!("{} @ {}", app.role, app.company);
            if !yes && !confirm(&format!("Delete '{}'? This cannot be undone.", label))? {
                println!("Cancelled.");
                return Ok(());
            }
            tracker.delete(&id);
            store.save_applications(tracker.applications())?;
            println!("Deleted '{}'.", label);
        }

        Commands::Board => {
            tui::run_board(&mut tracker, &store)?;
        }

        Commands::Stats => {
            let counts = tracker.status_counts();
            let total: usize = counts.iter().map(|(_, n)| n).sum();
            println!("{:<14} {:>6}", "STATUS", "COUNT");
            println!("{}", "-".repeat(21));
            for (status, count) in counts {
                println!("{:<14} {:>6}", status.to_string(), count);
            }
            println!("{}", "-".repeat(21));
            println!("{:<14} {:>6}", "Total", total);
        }

        Commands::Reminders => {
            let deadlines = tracker.upcoming_deadlines(Utc::now());
            if deadlines.is_empty() {
                println!("No deadlines in the next 48 hours.");
            } else {
                for d in deadlines {
                    println!(
                        "{}  {} ({} @ {})",
                        d.when.format("%Y-%m-%d %H:%M"),
                        d.label,
                        d.role,
                        d.company
                    );
                }
            }
        }

        Commands::Export { output } => {
            let path = output.unwrap_or_else(|| {
                PathBuf::from(backup::default_filename(Local::now().date_naive()))
            });
            let snapshot = backup::snapshot(tracker.applications(), tracker.profile());
            backup::write_backup(&path, &snapshot)?;
            println!(
                "Exported {} application(s) to {}",
                snapshot.applications.len(),
                path.display()
            );
        }

        Commands::Import { file, yes } => {
            let snapshot = backup::read_backup(&file)?;
            if !yes
                && !confirm("This will overwrite your current data. Are you sure you want to proceed?")?
            {
                println!("Import cancelled.");
                return Ok(());
            }
            let profile = snapshot
                .profile
                .unwrap_or_else(|| tracker.profile().clone());
            let count = snapshot.applications.len();
            tracker = Tracker::new(snapshot.applications, profile);
            store.save_applications(tracker.applications())?;
            store.save_profile(tracker.profile())?;
            println!("Data imported successfully ({} application(s)).", count);
        }

        Commands::Profile { command } => match command {
            ProfileCommands::Show => {
                let profile = tracker.profile();
                println!("Name: {}", if profile.name.is_empty() { "(not set)" } else { &profile.name });
                println!("Theme: {}", profile.theme);
                if profile.master_resume.is_empty() {
                    println!("Master resume: (not set)");
                } else {
                    println!(
                        "Master resume: {} characters",
                        profile.master_resume.chars().count()
                    );
                }
            }

            ProfileCommands::Name { name } => {
                let profile = UserProfile {
                    name,
                    ..tracker.profile().clone()
                };
                tracker.set_profile(profile);
                store.save_profile(tracker.profile())?;
                println!("Profile name saved.");
            }

            ProfileCommands::Resume { file } => {
                let content = std::fs::read_to_string(&file)
                    .with_context(|| format!("Failed to read resume file: {}", file.display()))?;
                let profile = UserProfile {
                    master_resume: content,
                    ..tracker.profile().clone()
                };
                tracker.set_profile(profile);
                store.save_profile(tracker.profile())?;
                println!("Master resume saved.");
            }

            ProfileCommands::Theme { theme } => {
                let theme: Theme = theme.parse().map_err(|e: String| anyhow!(e))?;
                let profile = UserProfile {
                    theme,
                    ..tracker.profile().clone()
                };
                tracker.set_profile(profile);
                store.save_profile(tracker.profile())?;
                println!("Theme set to {}.", theme);
            }
        },

        Commands::Analyze { id, no_resume } => {
            let id = tracker.resolve_id(&id)?;
            let app = tracker
                .get(&id)
                .ok_or_else(|| anyhow!("Application {} not found", id))?;

            let resume = tracker.profile().master_resume.as_str();
            let resume = if no_resume || resume.is_empty() {
                None
            } else {
                Some(resume)
            };
            let notes = if app.notes.is_empty() {
                "No details."
            } else {
                app.notes.as_str()
            };

            println!("Analyzing {} @ {}...", app.role, app.company);
            let client = GeminiClient::new()?;
            let analysis = client.analyze_application(&app.role, &app.company, notes, resume)?;

            println!("\n--- Summary ---");
            println!("{}", textwrap::fill(&analysis.summary, 78));

            if let Some(score) = analysis.match_score {
                println!("\nResume match score: {:.0}%", score);
            }
            if let Some(keywords) = &analysis.missing_keywords {
                if !keywords.is_empty() {
                    println!("Missing keywords: {}", keywords.join(", "));
                }
            }

            if !analysis.interview_tips.is_empty() {
                println!("\n--- Interview Tips ---");
                for (i, tip) in analysis.interview_tips.iter().enumerate() {
                    println!("{}. {}", i + 1, textwrap::fill(tip, 75));
                }
            }

            if !analysis.follow_up_draft.is_empty() {
                println!("\n--- Follow-up Draft ---");
                println!("{}", textwrap::fill(&analysis.follow_up_draft, 78));
            }
        }

        Commands::Research { company } => {
            println!("Researching {}...", company);
            let client = GeminiClient::new()?;
            let research = client.research_company(&company)?;

            println!("\n{}", textwrap::fill(&research.text, 78));
            if !research.sources.is_empty() {
                println!("\nSources:");
                for source in &research.sources {
                    println!("  {} - {}", source.title, source.uri);
                }
            }
        }
    }

    Ok(())
}

fn parse_status(s: &str) -> Result<JobStatus> {
    s.parse().map_err(|e: String| anyhow!(e))
}

/// Parse a "label=YYYY-MM-DD" argument.
fn parse_date_arg(arg: &str) -> Result<ImportantDate> {
    let (label, date) = arg
        .split_once('=')
        .ok_or_else(|| anyhow!("Expected LABEL=DATE, got '{}'", arg))?;
    if label.is_empty() || date.is_empty() {
        return Err(anyhow!("Expected LABEL=DATE, got '{}'", arg));
    }
    Ok(ImportantDate {
        label: label.to_string(),
        date: date.to_string(),
    })
}

fn confirm(prompt: &str) -> Result<bool> {
    print!("{} [y/N] ", prompt);
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    let answer = line.trim().to_lowercase();
    Ok(answer == "y" || answer == "yes")
}

fn fmt_millis(ms: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(ms)
        .map(|d| d.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_default()
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        s.to_string()
    } else {
        format!("{}...", &s[..max.saturating_sub(3)])
    }
}
