use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::level_filters::LevelFilter;
use tracing::{info, warn};
use vigil::probe::http::expand_env;
use vigil::{Debouncer, LogSender, Notifier, SlackSender};

mod config;
mod monitoring;
mod targets;

use config::{Config, NotifierSettings, duration_field};
use monitoring::Scheduler;

#[derive(Parser)]
#[command(name = "vigil", version)]
#[command(about = "Health checks with debounced notifications", long_about = None)]
struct Cli {
    /// Config file, defaults to $XDG_CONFIG_HOME/vigil/config.toml
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Run a single cycle and print the results as JSON
    #[arg(long)]
    once: bool,

    /// Time between cycles, overrides `check.interval`
    #[arg(short, long)]
    interval: Option<String>,

    /// Print the loaded configuration and exit
    #[arg(long)]
    print_config: bool,

    /// More logs, repeat for trace
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn notifier(settings: &NotifierSettings) -> anyhow::Result<Arc<dyn Notifier>> {
    let Some(webhook) = &settings.webhook else {
        warn!("No webhook configured, notifications only go to the log");
        return Ok(Arc::new(Debouncer::new(LogSender)));
    };

    let mut sender = SlackSender::new(expand_env(webhook)).context("building webhook client")?;
    if let Some(username) = &settings.username {
        sender = sender.with_username(username.clone());
    }
    if let Some(channel) = &settings.channel {
        sender = sender.with_channel(channel.clone());
    }

    Ok(Arc::new(Debouncer::new(sender)))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    logger::init_with_level(match cli.verbose {
        0 => LevelFilter::INFO,
        1 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    });

    let cfg = Config::from_config(cli.config.as_ref())?;
    if cli.print_config {
        print!("{cfg}");
        return Ok(());
    }

    let interval = duration_field("interval", cli.interval.as_deref().unwrap_or(&cfg.check.interval))?;
    anyhow::ensure!(!interval.is_zero(), "interval must be greater than zero");
    let checks = targets::build_checks(&cfg).await?;
    let scheduler = Scheduler::new(checks, notifier(&cfg.notifier)?, interval);

    if cli.once {
        let results = scheduler.run_cycle().await;
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(());
    }

    info!(interval = ?interval, "starting checks");
    tokio::select! {
        () = scheduler.run() => {}
        signal = tokio::signal::ctrl_c() => {
            signal.context("listening for shutdown signal")?;
            info!("shutting down");
        }
    }

    Ok(())
}
