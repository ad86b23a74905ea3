//! lcdl CLI
//!
//! Entry point for the `lcdl` command-line tool.

use clap::{Parser, Subcommand};
use chrono::Utc;
use lcdl::config::DEFAULT_CONFIG_PATH;
use lcdl::listener::{Listener, PollSettings};
use lcdl::storage::{scan, StorageRoot};
use lcdl::{
    Artifact, ArtifactIngestor, Changelog, ChangelogIngestor, ChangelogOutcome, Config,
    Dispatcher, IngestOutcome, LocalFiles, Registry,
};
use lcdl_resolver::Resolution;
use lcdl_telegram::BotClient;
use std::path::PathBuf;
use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "lcdl")]
#[command(about = "Download Lawnchair builds posted to a Telegram channel", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Listen to the channel and ingest new builds and changelogs
    Run {
        /// Path to config file (default: lcdl.toml)
        #[arg(long, short = 'c')]
        config: Option<PathBuf>,
    },

    /// Verify the configuration file
    Verify {
        /// Path to config file (default: lcdl.toml)
        #[arg(long, short = 'c')]
        config: Option<PathBuf>,
    },

    /// Explain how a file name or changelog line resolves
    Resolve {
        /// Treat the input as a changelog message instead of a file name
        #[arg(long)]
        changelog: bool,

        /// Output in JSON format
        #[arg(long)]
        json: bool,

        /// File name or changelog text
        input: String,
    },

    /// Ingest a local build file, e.g. to backfill a missed post
    Ingest {
        /// Path to config file (default: lcdl.toml)
        #[arg(long, short = 'c')]
        config: Option<PathBuf>,

        /// Build file to store
        file: PathBuf,

        /// Changelog text file to store alongside the build
        #[arg(long)]
        changelog: Option<PathBuf>,
    },

    /// Show stored versions and where the latest pointers lead
    Status {
        /// Path to config file (default: lcdl.toml)
        #[arg(long, short = 'c')]
        config: Option<PathBuf>,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run { config } => run_listener(config),
        Commands::Verify { config } => run_verify(config),
        Commands::Resolve {
            changelog,
            json,
            input,
        } => run_resolve(changelog, json, &input),
        Commands::Ingest {
            config,
            file,
            changelog,
        } => run_ingest(config, file, changelog),
        Commands::Status { config, json } => run_status(config, json),
    }
}

fn load_config(config_path: Option<PathBuf>) -> Config {
    let path = config_path.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
    match Config::load(&path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error ({}): {}", path.display(), e);
            process::exit(1);
        }
    }
}

fn init_logging(config: &Config) {
    if let Err(e) = lcdl::logging::init(&config.logging) {
        eprintln!("Error setting up logging: {}", e);
        process::exit(1);
    }
}

fn run_listener(config_path: Option<PathBuf>) {
    let config = load_config(config_path);
    init_logging(&config);

    let client = match BotClient::with_api_url(
        config.telegram.api_key.clone(),
        config.telegram.api_url.clone(),
        config.download_timeout(),
    ) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("Error creating Bot API client: {}", e);
            process::exit(1);
        }
    };

    let shutdown = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&shutdown);
    if let Err(e) = ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst)) {
        eprintln!("Error installing signal handler: {}", e);
        process::exit(1);
    }

    tracing::info!(
        download_dir = %config.storage.download_dir.display(),
        allowed_chats = ?config.telegram.allowed_chats,
        "configuration loaded"
    );

    let dispatcher = Dispatcher::from_config(&config, &client);
    let settings = PollSettings {
        timeout: config.poll_timeout(),
        retry_interval: config.poll_interval(),
    };
    let mut listener = Listener::new(&client, dispatcher, settings);
    listener.run(&shutdown);
}

fn run_verify(config_path: Option<PathBuf>) {
    let path = config_path.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));

    match Config::load(&path) {
        Ok(config) => {
            println!("Configuration valid: {}", path.display());
            println!();
            println!("  API URL: {}", config.telegram.api_url);
            let chats: Vec<String> = config
                .telegram
                .allowed_chats
                .iter()
                .map(|c| c.to_string())
                .collect();
            println!("  Allowed chats: {}", chats.join(", "));
            println!("  Download dir: {}", config.storage.download_dir.display());
            match config.download_timeout() {
                Some(t) => println!("  Download timeout: {}s", t.as_secs()),
                None => println!("  Download timeout: none"),
            }
            println!("  Log level: {}", config.logging.level);
            if let Some(ref dir) = config.logging.directory {
                println!("  Log directory: {}", dir.display());
            }
        }
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            process::exit(1);
        }
    }
}

fn run_resolve(changelog: bool, json: bool, input: &str) {
    let resolution = if changelog {
        Resolution::for_changelog(input)
    } else {
        Resolution::for_file_name(&Registry::default(), input)
    };

    if json {
        match resolution.to_json() {
            Ok(out) => println!("{}", out),
            Err(e) => {
                eprintln!("Error serializing output: {}", e);
                process::exit(1);
            }
        }
    } else {
        print!("{}", resolution.to_human());
    }

    if !resolution.is_resolved() {
        process::exit(1);
    }
}

fn run_ingest(config_path: Option<PathBuf>, file: PathBuf, changelog: Option<PathBuf>) {
    let config = load_config(config_path);
    init_logging(&config);

    let (dir, file_name) = match (file.parent(), file.file_name()) {
        (Some(dir), Some(name)) => (dir.to_path_buf(), name.to_string_lossy().into_owned()),
        _ => {
            eprintln!("Not a file: {}", file.display());
            process::exit(1);
        }
    };
    let size_bytes = match std::fs::metadata(&file) {
        Ok(meta) => meta.len(),
        Err(e) => {
            eprintln!("Cannot read {}: {}", file.display(), e);
            process::exit(1);
        }
    };

    let storage = StorageRoot::new(&config.storage.download_dir);
    let artifacts = ArtifactIngestor::new(Registry::default(), storage.clone(), LocalFiles::new(dir));
    let artifact = Artifact {
        file_name: file_name.clone(),
        mime_type: None,
        size_bytes,
        remote_file_id: file_name,
        posted_at: Utc::now(),
    };

    let mut ok = true;
    match artifacts.ingest(&artifact) {
        IngestOutcome::Ingested(stored) => {
            println!("Stored {} ({})", stored.artifact_path.display(), stored.md5);
        }
        IngestOutcome::Rejected(reason) => {
            eprintln!("Rejected: {}", reason);
            ok = false;
        }
        IngestOutcome::PartialFailure(e) => {
            eprintln!("Failed: {}", e);
            ok = false;
        }
    }

    if let Some(path) = changelog {
        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) => {
                eprintln!("Cannot read {}: {}", path.display(), e);
                process::exit(1);
            }
        };
        let changelogs = ChangelogIngestor::new(storage);
        match changelogs.ingest(&Changelog {
            text,
            posted_at: Utc::now(),
        }) {
            ChangelogOutcome::Ingested(stored) => {
                println!("Stored {}", stored.changelog_path.display());
            }
            ChangelogOutcome::Rejected(reason) => {
                eprintln!("Changelog rejected: {}", reason);
                ok = false;
            }
        }
    }

    if !ok {
        process::exit(1);
    }
}

fn run_status(config_path: Option<PathBuf>, json: bool) {
    let config = load_config(config_path);
    let storage = StorageRoot::new(&config.storage.download_dir);

    let summaries = match scan(&storage) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error scanning {}: {}", storage.path().display(), e);
            process::exit(1);
        }
    };

    if json {
        match serde_json::to_string_pretty(&summaries) {
            Ok(out) => println!("{}", out),
            Err(e) => {
                eprintln!("Error serializing output: {}", e);
                process::exit(1);
            }
        }
        return;
    }

    if summaries.is_empty() {
        println!("No builds stored under {}", storage.path().display());
        return;
    }

    for summary in &summaries {
        println!("{}", summary.project);
        println!("  Versions: {}", summary.versions.join(", "));
        for link in &summary.latest {
            let marker = if link.dangling { " (dangling)" } else { "" };
            println!("  latest/{} -> {}{}", link.name, link.target.display(), marker);
        }
    }
}
