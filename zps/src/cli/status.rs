// zps/src/cli/status.rs
use std::collections::HashMap;
use std::io::{self, IsTerminal, Write};
use std::time::Instant;

use colored::*;
use tokio::sync::broadcast;
use zps_common::pipeline::SyncEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum JobStatus {
    Syncing,
    Success,
    Failed,
}

impl JobStatus {
    fn display_state(&self) -> &'static str {
        match self {
            JobStatus::Syncing => "syncing",
            JobStatus::Success => "synced",
            JobStatus::Failed => "failed",
        }
    }

    fn slot_indicator(&self) -> String {
        match self {
            JobStatus::Syncing => " ↓".yellow().to_string(),
            JobStatus::Success => " ✓".green().bold().to_string(),
            JobStatus::Failed => " ✗".red().bold().to_string(),
        }
    }

    fn colored_state(&self) -> ColoredString {
        match self {
            JobStatus::Syncing => self.display_state().yellow(),
            JobStatus::Success => self.display_state().green().bold(),
            JobStatus::Failed => self.display_state().red().bold(),
        }
    }
}

struct JobInfo {
    slug: String,
    status: JobStatus,
    commit: Option<String>,
    start_time: Instant,
    pool_id: usize,
}

impl JobInfo {
    fn elapsed_str(&self) -> String {
        format!("{:.1}s", self.start_time.elapsed().as_secs_f64())
    }

    fn commit_str(&self) -> &str {
        match &self.commit {
            Some(c) => &c[..c.len().min(7)],
            None => "–",
        }
    }
}

struct StatusDisplay {
    jobs: HashMap<String, JobInfo>,
    job_order: Vec<String>,
    total_jobs: usize,
    next_pool_id: usize,
    live: bool,
    header_printed: bool,
    last_line_count: usize,
}

impl StatusDisplay {
    fn new() -> Self {
        Self {
            jobs: HashMap::new(),
            job_order: Vec::new(),
            total_jobs: 0,
            next_pool_id: 1,
            live: io::stdout().is_terminal(),
            header_printed: false,
            last_line_count: 0,
        }
    }

    fn add_job(&mut self, slug: String) {
        if !self.jobs.contains_key(&slug) {
            let job_info = JobInfo {
                slug: slug.clone(),
                status: JobStatus::Syncing,
                commit: None,
                start_time: Instant::now(),
                pool_id: self.next_pool_id,
            };
            self.jobs.insert(slug.clone(), job_info);
            self.job_order.push(slug);
            self.next_pool_id += 1;
        }
    }

    fn update_job_status(&mut self, slug: &str, status: JobStatus, commit: Option<String>) {
        if let Some(job) = self.jobs.get_mut(slug) {
            job.status = status;
            if commit.is_some() {
                job.commit = commit;
            }
        }
    }

    /// Redraws the table in place on a terminal; otherwise only the final
    /// render prints anything.
    fn render(&mut self, final_render: bool) {
        if !self.live && !final_render {
            return;
        }
        if self.header_printed && self.live {
            self.clear_previous_output();
        }

        self.print_header();
        let job_output = self.build_job_rows();
        print!("{job_output}");
        println!("{}", "─".repeat(44).dimmed());

        let completed = self
            .jobs
            .values()
            .filter(|j| j.status == JobStatus::Success)
            .count();
        let failed = self
            .jobs
            .values()
            .filter(|j| j.status == JobStatus::Failed)
            .count();
        println!(
            "{} {}/{}",
            self.generate_progress_bar(completed, failed),
            completed + failed,
            self.total_jobs
        );

        self.header_printed = true;
        self.last_line_count = 1 + job_output.lines().count() + 1 + 1;
        let _ = io::stdout().flush();
    }

    fn print_header(&self) {
        println!(
            "{:<6} {:<10} {:<30} {:>8} {:>6} {}",
            "IID".bold().dimmed(),
            "STATE".bold().dimmed(),
            "PLUGIN".bold().dimmed(),
            "COMMIT".bold().dimmed(),
            "TIME".bold().dimmed(),
            "SLOT".bold().dimmed()
        );
    }

    fn build_job_rows(&self) -> String {
        let mut output = String::new();
        for slug in &self.job_order {
            if let Some(job) = self.jobs.get(slug) {
                output.push_str(&format!(
                    "{:<6} {:<10} {:<30} {:>8} {:>6} {}\n",
                    format!("#{:02}", job.pool_id).cyan(),
                    job.status.colored_state(),
                    job.slug.cyan(),
                    job.commit_str(),
                    job.elapsed_str(),
                    job.status.slot_indicator()
                ));
            }
        }
        output
    }

    fn clear_previous_output(&self) {
        for _ in 0..self.last_line_count {
            print!("\x1b[1A\x1b[2K");
        }
        let _ = io::stdout().flush();
    }

    fn generate_progress_bar(&self, completed: usize, failed: usize) -> String {
        if self.total_jobs == 0 {
            return "".to_string();
        }

        let total_done = completed + failed;
        let progress_width = 8;
        let filled = (total_done * progress_width) / self.total_jobs;
        let remaining = progress_width - filled.min(progress_width);

        let filled_str = "▍".repeat(filled).green();
        let remaining_str = "·".repeat(remaining).dimmed();

        format!("{filled_str}{remaining_str}")
    }
}

pub async fn handle_events(mut event_rx: broadcast::Receiver<SyncEvent>) {
    let mut display = StatusDisplay::new();
    let mut logs_buffer = Vec::new();

    loop {
        match event_rx.recv().await {
            Ok(event) => match event {
                SyncEvent::SyncStarted {
                    total_jobs,
                    workers,
                } => {
                    display.total_jobs = total_jobs;
                    println!(
                        "{} {} plugins on {} workers",
                        "Syncing".cyan().bold(),
                        total_jobs,
                        workers
                    );
                }
                SyncEvent::JobStarted { slug, .. } => {
                    display.add_job(slug);
                    display.render(false);
                }
                SyncEvent::JobSucceeded { slug, kind, commit } => {
                    display.update_job_status(&slug, JobStatus::Success, Some(commit));
                    logs_buffer.push(format!("{}: {} ({})", "Synced".green(), slug.cyan(), kind));
                    display.render(false);
                }
                SyncEvent::JobFailed {
                    slug, repo, error, ..
                } => {
                    display.update_job_status(&slug, JobStatus::Failed, None);
                    logs_buffer.push(format!(
                        "{} {} ({}): {}",
                        "✗".red().bold(),
                        slug.cyan(),
                        repo,
                        error.red()
                    ));
                    display.render(false);
                }
                SyncEvent::LogWarn { message } => {
                    logs_buffer.push(message.yellow().to_string());
                }
                SyncEvent::SyncFinished {
                    duration_secs,
                    success_count,
                    fail_count,
                } => {
                    if display.total_jobs > 0 {
                        display.render(true);
                    }
                    println!();
                    println!(
                        "{} in {:.2}s ({} succeeded, {} failed)",
                        "Sync finished".bold(),
                        duration_secs,
                        success_count,
                        fail_count
                    );
                    if !logs_buffer.is_empty() {
                        println!();
                        for log in &logs_buffer {
                            println!("{log}");
                        }
                    }
                    break;
                }
            },
            Err(broadcast::error::RecvError::Closed) => {
                break;
            }
            Err(broadcast::error::RecvError::Lagged(_)) => {
                // Ignore lag for now
            }
        }
    }
}
