//! Strictly Werewolf - terminal front end
//!
//! Loads a match file, seats the human at the keyboard and prints the
//! match as it unfolds.

#![warn(missing_docs)]

mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Command};
use std::path::Path;
use std::sync::Arc;
use strictly_match::{
    ChannelSink, Console, JsonlSink, MatchFile, MatchRunner, ReplayHub, ReplaySink,
};
use strictly_werewolf::{GamePhaseEngine, RoleKind};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn,strictly_match=info".into()),
        )
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Play {
            config,
            replay,
            spectate,
            seed,
        } => play(&config, replay.as_deref(), spectate, seed).await,
        Command::CheckConfig { config } => check_config(&config),
        Command::Probe { config } => probe(&config).await,
    }
}

/// Play one match against stdin.
#[instrument(skip_all, fields(config = %config.display(), spectate))]
async fn play(config: &Path, replay: Option<&Path>, spectate: bool, seed: Option<u64>) -> Result<()> {
    let file = MatchFile::from_file(config)?;
    let mut settings = file.to_settings(spectate)?;
    if let Some(seed) = seed {
        settings = settings.with_seed(seed);
    }
    let human = *settings.human_seat();

    let mut engine = GamePhaseEngine::new(settings)?;
    engine.advance()?;
    let names: Vec<String> = engine
        .state()
        .players()
        .iter()
        .map(|p| p.name().to_string())
        .collect();

    let (channel, mut records) = ChannelSink::new();
    let mut sinks: Vec<Arc<dyn ReplaySink>> = vec![Arc::new(channel)];
    if let Some(path) = replay {
        let sink = JsonlSink::create(path)
            .with_context(|| format!("Failed to create replay file {}", path.display()))?;
        info!(path = %sink.path().display(), "Recording replay");
        sinks.push(Arc::new(sink));
    }
    let hub = Arc::new(ReplayHub::new(sinks));

    let console = Console::new(names, human);
    let printer = tokio::spawn(async move {
        while let Some(record) = records.recv().await {
            if let Some(line) = console.describe(&record) {
                println!("{line}");
            }
        }
    });

    let mut runner = MatchRunner::new(engine, file.gateway()?)
        .with_replay(hub)
        .with_session_mode(*file.session_mode())
        .with_max_days(*file.game().max_days());

    if human.is_some() {
        println!("Commands: vote <seat>, say <text>, pass, kill/protect/inspect/poison <seat>, heal, shoot <seat>, hold");
        let (tx, rx) = mpsc::channel(16);
        tokio::spawn(async move {
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                if tx.send(line).await.is_err() {
                    break;
                }
            }
        });
        runner = runner.with_human(rx);
    }

    let summary = runner.run().await?;
    // the runner dropped the hub, so the printer drains and stops
    if let Err(e) = printer.await {
        warn!(error = %e, "Printer task failed");
    }

    println!();
    match summary.winner() {
        Some(faction) => println!("{} win on day {}.", faction, summary.days()),
        None => println!("No winner."),
    }
    for seat in summary.seats() {
        let status = if *seat.alive() { "alive" } else { "dead" };
        let you = if *seat.human() { " (you)" } else { "" };
        println!("  #{} {}{}: {} [{}]", seat.seat().index(), seat.name(), you, seat.role(), status);
    }
    Ok(())
}

/// Print the table a match file describes.
fn check_config(config: &Path) -> Result<()> {
    let file = MatchFile::from_file(config)?;
    let settings = file.to_settings(false)?;
    let roles = file.distribution()?;

    println!("{} seats", settings.seats());
    for role in RoleKind::all() {
        let count = roles.count(role);
        if count > 0 {
            println!("  {role}: {count}");
        }
    }
    match settings.human_seat() {
        Some(seat) => println!("Human plays {seat} as {}", settings.human_name()),
        None => println!("No human seat"),
    }
    println!("Session mode: {}", file.session_mode());
    let gateway = file.gateway()?;
    let providers = gateway.provider_names();
    if providers.is_empty() {
        println!("No remote providers; AI seats use the local fallback");
    } else {
        println!("Providers: {}", providers.join(", "));
    }
    Ok(())
}

/// Probe every provider once.
async fn probe(config: &Path) -> Result<()> {
    let file = MatchFile::from_file(config)?;
    let gateway = file.gateway()?;
    for report in gateway.probe_all().await {
        match report.error() {
            None => println!(
                "{:<16} {:<18} ok     {} ms",
                report.provider(),
                report.kind().to_string(),
                report.latency().as_millis()
            ),
            Some(e) => println!(
                "{:<16} {:<18} FAILED {}",
                report.provider(),
                report.kind().to_string(),
                e
            ),
        }
    }
    Ok(())
}
