use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use confluence_backup::config::{self, CycleConfig, TlsPolicy, DEFAULT_CONFIG_PATH};
use confluence_backup::managers::cycle::BackupCycle;
use confluence_backup::managers::logging::{self, LoggingConfig};
use confluence_backup::sinks;
use confluence_backup::utils::confluence::{ConfluenceClient, JobId};
use confluence_backup::utils::confluence_ops::RealConfluenceOps;
use confluence_backup::utils::poller::PollPolicy;
use confluence_backup::utils::retention;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "confluence-backup")]
#[command(about = "Back up a Confluence space: trigger, wait, download, rotate", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to configuration file (TOML, or JSON by extension)
    #[arg(short, long, env = "CONFLUENCE_BACKUP_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one backup cycle (default)
    Run {
        /// Give up polling after this many minutes (overrides config)
        #[arg(long)]
        deadline_minutes: Option<u64>,
    },

    /// Validate configuration and print the effective values
    Validate,

    /// Delete local archives older than the retention window
    Prune,

    /// Show the state of a backup job
    Status {
        /// Job id returned when the backup was triggered
        #[arg(short, long)]
        job: u64,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = logging::with_bootstrap_logging(|| {
        config::load_config(&cli.config, |name| std::env::var(name).ok())
    })
    .with_context(|| format!("Failed to load configuration from {:?}", cli.config))?;

    // Must keep guard alive
    let _log_guard = logging::init_logging(&LoggingConfig::from_settings(&config.logging))?;

    let command = cli.command.unwrap_or(Commands::Run {
        deadline_minutes: None,
    });

    match command {
        Commands::Run { deadline_minutes } => run_cycle(config, deadline_minutes)?,

        Commands::Validate => {
            print_config(&config);
            println!("\n✓ Configuration is valid");
        }

        Commands::Prune => {
            let report = retention::sweep_old_archives(
                &config.backup_dir,
                &config.space_key,
                config.retention_days,
                chrono::Utc::now(),
            )
            .context("Cleanup failed")?;

            if report.disabled {
                println!("Retention disabled (retention_days = {})", config.retention_days);
            } else {
                println!(
                    "✓ Examined {} archive(s), deleted {}",
                    report.examined,
                    report.deleted.len()
                );
                for path in &report.deleted {
                    println!("  - {}", path.display());
                }
                for path in &report.failed {
                    eprintln!("  ✗ could not remove {}", path.display());
                }
            }
        }

        Commands::Status { job } => {
            let client = ConfluenceClient::from_config(&config)?;
            let status = client
                .job_status(JobId(job))
                .with_context(|| format!("Failed to query job {}", job))?;

            println!("Job {}: {}", job, status.state);
            if let Some(file_name) = &status.file_name {
                println!("File: {}", file_name);
            }
            if status.state.is_terminal() {
                println!("File ready: {}", if status.file_exists { "Yes" } else { "No" });
            }
        }
    }

    Ok(())
}

fn run_cycle(config: CycleConfig, deadline_minutes: Option<u64>) -> Result<()> {
    let client = ConfluenceClient::from_config(&config)?;
    let ops = RealConfluenceOps::new(client);
    let sink = sinks::build_sink(&config).context("Failed to set up archive sink")?;

    let mut policy = PollPolicy::from_settings(&config.poll);
    if let Some(minutes) = deadline_minutes.filter(|m| *m > 0) {
        policy = policy.with_deadline_minutes(minutes);
    }

    println!("Backing up space '{}'...", config.space_key);
    let cycle = BackupCycle::new(config, Box::new(ops), sink).with_poll_policy(policy);
    let report = cycle.run()?;

    println!(
        "✓ Backup completed: {} ({} bytes)",
        report.archive.path.display(),
        report.archive.bytes
    );
    if let Some(location) = &report.upload.location {
        println!("✓ Uploaded to {}", location);
    }
    if let Some(sweep) = &report.sweep {
        if !sweep.deleted.is_empty() {
            println!("Removed {} old archive(s)", sweep.deleted.len());
        }
    }

    Ok(())
}

fn print_config(config: &CycleConfig) {
    println!("=== Effective configuration ===\n");
    println!("Base URL:        {}", config.base_url);
    println!("Space:           {}", config.space_key);
    println!("Token:           ****");
    println!("Backup dir:      {}", config.backup_dir.display());
    println!("Request timeout: {} minutes", config.request_timeout.as_secs() / 60);
    println!("Retention:       {} days", config.retention_days);

    let tls = match &config.tls {
        TlsPolicy::Verify => "verify".to_string(),
        TlsPolicy::Pinned(ca) => format!("pinned ({})", ca.display()),
        TlsPolicy::Insecure => "insecure (certificate checks disabled)".to_string(),
    };
    println!("TLS:             {}", tls);

    println!("Poll interval:   {} seconds", config.poll.interval.as_secs());
    match config.poll.max_attempts {
        Some(attempts) => println!("Poll attempts:   {}", attempts),
        None => println!("Poll attempts:   unlimited"),
    }
    if let Some(deadline) = config.poll.deadline {
        println!("Poll deadline:   {} minutes", deadline.as_secs() / 60);
    }

    println!("Verify archive:  {}", yes_no(config.verify_archive));
    println!("Resume pending:  {}", yes_no(config.resume_pending_job));

    match &config.s3 {
        Some(s3) => {
            println!("Sink:            s3://{}/{}", s3.bucket, s3.key_prefix.trim_matches('/'));
            if let Some(region) = &s3.region {
                println!("  Region:        {}", region);
            }
            if let Some(endpoint) = &s3.endpoint {
                println!("  Endpoint:      {}", endpoint);
            }
            println!("  Delete local:  {}", yes_no(config.delete_after_upload));
        }
        None => println!("Sink:            local only"),
    }

    match &config.logging.directory {
        Some(dir) => println!(
            "Log files:       {} ({}, keep {})",
            dir.display(),
            config.logging.level,
            config.logging.max_files
        ),
        None => println!("Log files:       disabled"),
    }
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "Yes"
    } else {
        "No"
    }
}
