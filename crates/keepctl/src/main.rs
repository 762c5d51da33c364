use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use profilekeep::{keeper, Archiver, Fingerprint, KeepConfig, TickRegistry};

/// Deduplicating profile saves with interval zip backups
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Config file (TOML). Defaults to ./profilekeep.toml or ~/.config/profilekeep/config.toml
    #[arg(short, long, global = true, env = "PROFILEKEEP_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Archive the profile directory now
    Backup,

    /// Print the fingerprint of a file's bytes
    Fingerprint {
        file: PathBuf,
    },

    /// Load every profile, then save and tick on an interval
    Run {
        /// Seconds to sleep between ticks
        #[arg(long, default_value = "5")]
        interval_secs: u64,

        /// Stop after this many ticks (runs forever if omitted)
        #[arg(long)]
        ticks: Option<u64>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Fingerprint { file } => {
            let data = std::fs::read(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            println!("{}  {}", Fingerprint::of(&data), file.display());
        }
        Commands::Backup => {
            let config = KeepConfig::load(cli.config.as_deref())?;
            let archiver = Archiver::new(&config.backup_dir);
            archiver
                .ensure_backup_dir()
                .context("failed to create backup directory")?;
            let path = archiver
                .create_backup(&config.profile_dir)
                .context("backup failed")?;
            println!("{}", path.display());
        }
        Commands::Run {
            interval_secs,
            ticks,
        } => {
            let config = KeepConfig::load(cli.config.as_deref())?;
            run(&config, Duration::from_secs(interval_secs), ticks)?;
        }
    }

    Ok(())
}

/// Single-threaded host loop: every interval, save all profiles and feed
/// the real elapsed time to the tick registry.
fn run(config: &KeepConfig, interval: Duration, ticks: Option<u64>) -> Result<()> {
    std::fs::create_dir_all(&config.profile_dir).with_context(|| {
        format!(
            "failed to create profile directory {}",
            config.profile_dir.display()
        )
    })?;

    let mut host = keeper::host_for(config);
    let loaded = host.load_all().context("failed to load profiles")?;
    tracing::info!(
        loaded,
        dedup = config.enable_name_change,
        "profiles loaded from {}",
        config.profile_dir.display()
    );

    let mut registry = TickRegistry::new();
    if keeper::install_backups(config, &mut registry)? {
        tracing::info!(
            every_secs = config.time_between_saves_seconds,
            "backups to {}",
            config.backup_dir.display()
        );
    }

    let mut last = Instant::now();
    let mut count = 0u64;
    while ticks.map_or(true, |limit| count < limit) {
        thread::sleep(interval);
        let delta = last.elapsed().as_secs_f64();
        last = Instant::now();

        let summary = host.save_all();
        let written = summary.written();
        let ran = registry.tick(delta)?;

        tracing::debug!(
            tick = count,
            written,
            skipped = summary.saved.len() - written,
            failed = summary.failed.len(),
            ?ran,
            "tick"
        );
        count += 1;
    }

    Ok(())
}
