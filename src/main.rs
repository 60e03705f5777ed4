mod app;
mod backend;
mod cache;
mod commands;
mod config;
mod db;
mod domain;
mod event;
mod logging;
mod query;
mod ui;

use clap::Parser;
use color_eyre::{eyre::eyre, Result};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "rollcall")]
#[command(about = "A terminal UI for team attendance, holidays and permissions")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/rollcall/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Invite code to join the team with
  #[arg(short, long)]
  invite: Option<String>,

  /// Directory CSV exports are written to
  #[arg(short, long)]
  export_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  // Load configuration
  let config = config::Config::load(args.config.as_deref())?;

  let log_path = match &config.log_file {
    Some(path) => path.clone(),
    None => logging::default_log_path()?,
  };
  let _guard = logging::init(&log_path)?;
  tracing::info!(version = env!("CARGO_PKG_VERSION"), "starting rollcall");

  let db = db::Database::open(&config.state_path()?)?;
  let settings = db::SettingsStore::new(db);

  let identity = config::Config::identity_token()?;
  let transport = backend::transport::HttpTransport::new(&config.backend.url, identity)
    .map_err(|e| eyre!("Failed to create backend transport: {}", e))?;

  let options = app::Options {
    invite: args.invite,
    export_dir: args.export_dir,
  };

  // Initialize and run the app
  let mut app = app::App::new(config, Arc::new(transport), settings, options);
  app.run().await?;

  tracing::info!("exiting");
  Ok(())
}
