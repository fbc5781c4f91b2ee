mod api;
mod config;
mod models;
mod session;
mod tui;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;

use api::{ApiClient, CoverLetterRequest, JobPayload};
use models::{filter_by_status, JobStatus};
use session::{require_token, FileTokenStorage, TokenStorage};

#[derive(Parser)]
#[command(name = "jobsync")]
#[command(about = "Job application tracking - search, track, and generate cover letters")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new account
    Signup {
        /// Email address
        email: String,

        /// Password (prompted interactively if omitted)
        #[arg(short, long)]
        password: Option<String>,
    },

    /// Log in and store the session token
    Login {
        /// Email address
        email: String,

        /// Password (prompted interactively if omitted)
        #[arg(short, long)]
        password: Option<String>,
    },

    /// Log out and forget the session token
    Logout,

    /// Add an application to the tracker
    Add {
        /// Company name
        company: String,

        /// Job role
        role: String,

        /// Application status
        #[arg(short, long, value_enum, default_value_t = JobStatus::Applied)]
        status: JobStatus,

        /// Free-form notes
        #[arg(short, long)]
        notes: Option<String>,
    },

    /// List tracked applications
    List {
        /// Filter by status (omit for all)
        #[arg(short, long, value_enum)]
        status: Option<JobStatus>,
    },

    /// Show one application in full
    Show {
        /// Application ID
        id: String,
    },

    /// Edit an application (unspecified fields keep their current value)
    Edit {
        /// Application ID
        id: String,

        #[arg(long)]
        company: Option<String>,

        #[arg(long)]
        role: Option<String>,

        #[arg(long, value_enum)]
        status: Option<JobStatus>,

        #[arg(long)]
        notes: Option<String>,
    },

    /// Delete an application
    Delete {
        /// Application ID
        id: String,

        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },

    /// Show application statistics
    Stats,

    /// Browse applications interactively
    Browse {
        /// Start filtered to a status
        #[arg(short, long, value_enum)]
        status: Option<JobStatus>,
    },

    /// Search external job postings
    Search {
        /// Search keywords
        keywords: String,

        /// Country code (us, gb, ca, ...)
        #[arg(short, long, default_value = "us")]
        location: String,

        /// Result page
        #[arg(short, long, default_value = "1")]
        page: u32,

        /// Results per page
        #[arg(long, default_value = "10")]
        per_page: u32,

        /// Import result number N into the tracker
        #[arg(long, value_name = "N")]
        import: Option<usize>,
    },

    /// Generate an AI cover letter
    CoverLetter {
        /// Job title
        #[arg(short, long)]
        title: String,

        /// Company name
        #[arg(short, long)]
        company: String,

        /// Job description text
        #[arg(short, long)]
        description: Option<String>,

        /// Read the job description from a file
        #[arg(long, conflicts_with = "description")]
        description_file: Option<PathBuf>,

        /// Your name
        #[arg(long)]
        name: Option<String>,

        /// Your key skills
        #[arg(long)]
        skills: Option<String>,

        /// Write the letter to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = config::load_config()?;
    let api = ApiClient::new(&settings.base_url);
    let storage = FileTokenStorage::open_default()?;

    match cli.command {
        Commands::Signup { email, password } => {
            let password = match password {
                Some(p) => p,
                None => {
                    let first = prompt_line("Password: ")?;
                    let second = prompt_line("Confirm password: ")?;
                    if first != second {
                        bail!("Passwords do not match");
                    }
                    first
                }
            };
            validate_signup_password(&password)?;

            let response = api.signup(&email, &password)?;
            println!("{}", response.message);
            println!("You can now log in with 'jobsync login {}'.", email);
        }

        Commands::Login { email, password } => {
            let password = match password {
                Some(p) => p,
                None => prompt_line("Password: ")?,
            };
            let token = api.login(&email, &password)?;
            storage.save(&token)?;
            println!("Logged in as {}.", email);
        }

        Commands::Logout => {
            storage.clear()?;
            println!("Logged out.");
        }

        Commands::Add {
            company,
            role,
            status,
            notes,
        } => {
            let token = require_token(&storage)?;
            let payload = JobPayload::new(company, role, status, notes.unwrap_or_default())?;
            let response = api.create_job(&token, &payload)?;
            println!("{} (ID: {})", response.message, response.id);
        }

        Commands::List { status } => {
            let token = require_token(&storage)?;
            let jobs = api.get_jobs(&token)?;
            let jobs = filter_by_status(&jobs, status);
            if jobs.is_empty() {
                match status {
                    Some(s) => println!("No {} applications.", s),
                    None => println!("No applications yet. Add one to get started!"),
                }
            } else {
                println!(
                    "{:<26} {:<11} {:<28} {:<20} {:<10}",
                    "ID", "STATUS", "ROLE", "COMPANY", "CREATED"
                );
                println!("{}", "-".repeat(97));
                for job in &jobs {
                    println!(
                        "{:<26} {:<11} {:<28} {:<20} {:<10}",
                        job.id,
                        job.status,
                        truncate(&job.role, 26),
                        truncate(&job.company, 18),
                        job.created_date()
                    );
                }
                println!("\n{} application(s)", jobs.len());
            }
        }

        Commands::Show { id } => {
            let token = require_token(&storage)?;
            let jobs = api.get_jobs(&token)?;
            match jobs.iter().find(|j| j.id == id) {
                Some(job) => {
                    println!("{} at {}", job.role, job.company);
                    println!("ID: {}", job.id);
                    println!("Status: {}", job.status);
                    println!("Created: {}", job.created_date());
                    if !job.notes.is_empty() {
                        println!("\n--- Notes ---\n{}", job.notes);
                    }
                }
                None => println!("Application {} not found.", id),
            }
        }

        Commands::Edit {
            id,
            company,
            role,
            status,
            notes,
        } => {
            let token = require_token(&storage)?;
            let jobs = api.get_jobs(&token)?;
            let job = jobs
                .iter()
                .find(|j| j.id == id)
                .ok_or_else(|| anyhow!("Application {} not found", id))?;

            // The backend takes a full document on PUT, so merge the edits
            // over the current fields and revalidate.
            let current = JobPayload::from_application(job);
            let payload = JobPayload::new(
                company.unwrap_or(current.company),
                role.unwrap_or(current.role),
                status.unwrap_or(current.status),
                notes.unwrap_or(current.notes),
            )?;
            let response = api.update_job(&token, &id, &payload)?;
            println!("{}", response.message);
        }

        Commands::Delete { id, yes } => {
            let token = require_token(&storage)?;
            if !yes {
                let answer = prompt_line(&format!("Delete application {}? [y/N] ", id))?;
                if !answer.eq_ignore_ascii_case("y") {
                    println!("Aborted.");
                    return Ok(());
                }
            }
            let response = api.delete_job(&token, &id)?;
            println!("{}", response.message);
        }

        Commands::Stats => {
            let token = require_token(&storage)?;
            let stats = api.get_stats(&token)?;
            println!("{:<12} {:>5}", "Total", stats.total);
            println!("{:<12} {:>5}", "Applied", stats.applied);
            println!("{:<12} {:>5}", "Interview", stats.interviews);
            println!("{:<12} {:>5}", "Offers", stats.offers);
            println!("{:<12} {:>5}", "Accepted", stats.accepted);
            println!("{:<12} {:>5}", "Rejected", stats.rejected);
            println!();
            println!("Interview conversion: {:>3}%", stats.interview_rate());
            println!("Offer rate:           {:>3}%", stats.offer_rate());
            println!("Acceptance rate:      {:>3}%", stats.acceptance_rate());
        }

        Commands::Browse { status } => {
            let token = require_token(&storage)?;
            tui::run_browse(&api, &token, status)?;
        }

        Commands::Search {
            keywords,
            location,
            page,
            per_page,
            import,
        } => {
            let results = api.search_external(&keywords, &location, page, per_page)?;

            if results.jobs.is_empty() {
                println!("No jobs found. Try different keywords or location.");
                return Ok(());
            }

            println!("Found {} jobs (page {})\n", results.total, page);
            for (i, posting) in results.jobs.iter().enumerate() {
                println!("{:>3}. {} - {}", i + 1, posting.title, posting.company);
                let mut meta = Vec::new();
                if !posting.location.is_empty() {
                    meta.push(posting.location.clone());
                }
                if let Some(contract) = &posting.contract_type {
                    meta.push(contract.clone());
                }
                if let Some(salary) = posting.salary_range() {
                    meta.push(salary);
                }
                if !meta.is_empty() {
                    println!("     {}", meta.join("  |  "));
                }
                let description = posting.plain_description();
                if !description.is_empty() {
                    for line in textwrap::fill(&description, 72).lines() {
                        println!("     {}", line);
                    }
                }
                if let Some(url) = &posting.job_url {
                    println!("     {}", url);
                }
                println!();
            }

            if let Some(n) = import {
                let posting = results
                    .jobs
                    .get(n.wrapping_sub(1))
                    .ok_or_else(|| anyhow!("No search result number {}", n))?;
                let token = storage
                    .load()?
                    .ok_or_else(|| anyhow!("Please log in to import jobs"))?;
                let payload = JobPayload::from_posting(posting)?;
                api.create_job(&token, &payload)?;
                println!(
                    "Successfully imported: {} at {}",
                    posting.title, posting.company
                );
            }
        }

        Commands::CoverLetter {
            title,
            company,
            description,
            description_file,
            name,
            skills,
            output,
        } => {
            let description = match (description, description_file) {
                (Some(text), _) => text,
                (None, Some(path)) => std::fs::read_to_string(&path).with_context(|| {
                    format!("Failed to read job description from {}", path.display())
                })?,
                (None, None) => bail!("Provide a job description with --description or --description-file"),
            };

            let request = CoverLetterRequest {
                job_title: title,
                company_name: company,
                job_description: description,
                user_name: name,
                user_skills: skills,
            };

            println!("Generating cover letter...");
            let letter = api.generate_cover_letter(&request)?;

            if let Some(path) = output {
                std::fs::write(&path, &letter)
                    .with_context(|| format!("Failed to write to {}", path.display()))?;
                println!("Cover letter saved to: {}", path.display());
            } else {
                println!("\n--- Cover Letter ---\n{}", letter);
            }
        }
    }

    Ok(())
}

fn validate_signup_password(password: &str) -> Result<()> {
    if password.chars().count() < 6 {
        bail!("Password must be at least 6 characters");
    }
    Ok(())
}

fn prompt_line(prompt: &str) -> Result<String> {
    print!("{}", prompt);
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\n', '\r']).to_string())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}
