//! `adsim`: run a live ad engine in the terminal.
//!
//! Reads `adsim.toml` (or the path given with `--config`), fetches campaigns
//! from the marketplace feed or a local JSON file, and prints every engine
//! event. Type commands on stdin to act as the user or the host screen.
//!
//! # Usage
//!
//! ```text
//! adsim --feed-url https://chit.example --token $SESSION
//! adsim --campaigns campaigns.json --json
//! adsim --fixed
//! ```

mod browser;
mod input;
mod settings;

use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use browser::SystemBrowser;
use chit_ads_core::{AdEngine, EngineEvent, picker::UniformPicker, source::AdSource};
use chit_ads_feed::{FileAdSource, HttpAdSource};
use chit_ads_runtime::RunningEngine;
use clap::Parser;
use input::Input;
use settings::{Overrides, SimConfig, SimMode};
use tokio::io::{AsyncBufReadExt as _, BufReader};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "adsim", version, about = "Chit-fund ad engine simulator")]
struct Args {
  /// Path to a TOML config file.
  #[arg(short, long, value_name = "FILE", default_value = "adsim.toml")]
  config: PathBuf,

  /// Base URL of the marketplace API.
  #[arg(long, env = "CHITADS_FEED_URL")]
  feed_url: Option<String>,

  /// Session token for the feed.
  #[arg(long, env = "CHITADS_TOKEN")]
  token: Option<String>,

  /// Read the signed-in merchant's own campaign instead of the public feed.
  #[arg(long)]
  merchant: bool,

  /// Load campaigns from a local JSON file.
  #[arg(long, value_name = "FILE")]
  campaigns: Option<PathBuf>,

  /// Run the fixed-interval brand variant.
  #[arg(long)]
  fixed: bool,

  /// Print events as JSON lines.
  #[arg(long)]
  json: bool,
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Logs go to stderr; stdout carries events.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .with_writer(std::io::stderr)
    .init();

  let args = Args::parse();
  let mut cfg = SimConfig::load(&args.config)?;
  cfg.apply(Overrides {
    feed_url:  args.feed_url,
    token:     args.token,
    merchant:  args.merchant,
    fixed:     args.fixed,
    campaigns: args.campaigns,
  });

  let engine = match cfg.mode {
    SimMode::Rotation => AdEngine::rotation(cfg.engine.clone()),
    SimMode::Fixed => {
      AdEngine::fixed_interval(cfg.engine.clone(), Box::new(UniformPicker::from_os()))
    }
  }
  .context("invalid engine configuration")?;
  tracing::info!(session = %engine.session_id(), mode = ?cfg.mode, "engine ready");

  match &cfg.campaigns {
    Some(path) => {
      let source = FileAdSource::new(path, cfg.feed.media_base());
      run(engine, source, args.json).await
    }
    None => {
      let source = HttpAdSource::new(cfg.feed.clone())
        .context("failed to build feed client")?;
      tracing::info!(url = %cfg.feed.feed_url(), "reading campaign feed");
      run(engine, source, args.json).await
    }
  }
}

// ─── Event loop ───────────────────────────────────────────────────────────────

async fn run<S>(engine: AdEngine, source: S, json: bool) -> anyhow::Result<()>
where
  S: AdSource + 'static,
{
  let RunningEngine {
    handle,
    mut events,
    task,
  } = chit_ads_runtime::spawn(engine, Arc::new(source), SystemBrowser);

  eprintln!("{}", input::HELP);
  let mut lines = BufReader::new(tokio::io::stdin()).lines();

  loop {
    tokio::select! {
      event = events.recv() => match event {
        Some(event) => print_event(&event, json)?,
        None => break,
      },
      line = lines.next_line() => {
        let Some(line) = line.context("failed to read stdin")? else {
          break;
        };
        if line.trim().is_empty() {
          continue;
        }
        let Some(command) = Input::parse(&line) else {
          eprintln!("unknown command {:?}; {}", line.trim(), input::HELP);
          continue;
        };
        match command {
          Input::Pause => handle.pause().await?,
          Input::Resume => handle.resume().await?,
          Input::Dismiss(request) => handle.dismiss(request).await?,
          Input::Tap => handle.tap().await?,
          Input::Refresh => handle.refresh().await?,
          Input::Status => {
            let snap = handle.snapshot().await?;
            if json {
              println!("{}", serde_json::to_string(&snap)?);
            } else {
              println!("{}", input::describe_snapshot(&snap));
            }
          }
          Input::Quit => break,
        }
      }
    }
  }

  handle.shutdown().await.ok();
  task.await.context("engine task panicked")?;
  Ok(())
}

fn print_event(event: &EngineEvent, json: bool) -> anyhow::Result<()> {
  if json {
    println!("{}", event.to_json()?);
  } else {
    println!("{}", input::describe(event));
  }
  Ok(())
}
