mod accounts;
mod activity;
mod catalog;
mod cli;
mod clock;
mod config;
mod error;
mod model;
mod password;
mod session;
mod simulate;
mod store;
mod throttle;
mod users;

use anyhow::Result;
use clap::Parser;
use std::cell::RefCell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "testdeck", about = "Console for the telecom test-management dashboard")]
pub struct Args {
    #[arg(long, help = "Config file path")]
    pub config: Option<PathBuf>,

    #[arg(long, env = "TESTDECK_STORAGE", help = "Storage file (overrides config)")]
    pub storage: Option<PathBuf>,

    #[arg(long, help = "Activity log directory")]
    pub activity_dir: Option<PathBuf>,

    #[arg(long, help = "Skip the simulated delays")]
    pub no_delay: bool,

    #[arg(long, help = "Verbose output")]
    pub verbose: bool,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let mut cfg = if let Some(config_path) = &args.config {
        config::Config::load_from(config_path)?
    } else {
        config::Config::load().unwrap_or_else(|e| {
            eprintln!("Warning: could not load config, using defaults: {}", e);
            config::Config::default()
        })
    };

    if let Some(path) = &args.storage {
        cfg.storage.path = Some(path.clone());
    }
    if args.no_delay {
        cfg.simulation = config::SimulationConfig::instant();
    }

    if let Err(errors) = cfg.validate() {
        for e in &errors {
            eprintln!("Config warning {}", e);
        }
        return Err(anyhow::anyhow!(
            "Invalid configuration ({} problem(s))",
            errors.len()
        ));
    }

    let storage_path = cfg.storage_path();
    let kv = store::FileStore::open(&storage_path)?;
    let accounts =
        accounts::AccountStore::new(kv, clock::SystemClock, cfg.account_settings());

    let activity_dir = args
        .activity_dir
        .clone()
        .unwrap_or_else(|| config::project_dir().join("activity"));
    std::fs::create_dir_all(&activity_dir)?;

    let run_id = uuid::Uuid::new_v4().to_string();
    let activity_path = activity_dir.join(format!("{}.jsonl", run_id));
    let activity = activity::ActivityLog::new(&activity_path, &run_id)?;

    if args.verbose {
        eprintln!("[VERBOSE] Storage: {}", storage_path.display());
        eprintln!("[VERBOSE] Activity log: {}", activity_path.display());
    }

    let ctx = cli::Context {
        args,
        run_id,
        config: cfg,
        accounts: RefCell::new(accounts),
        activity: RefCell::new(activity),
        data_file: RefCell::new(None),
    };

    cli::run_repl(ctx)
}
