//! tolk - speech-to-speech translation relay.

mod config;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tolk_relay::AppState;
use tracing_subscriber::EnvFilter;

/// Speech-to-speech translation relay.
///
/// Clients stream an utterance over /ws (or upload it to /translate) and
/// receive it back as speech in the target language.
#[derive(Parser, Debug)]
#[command(name = "tolk")]
#[command(about = "Speech-to-speech translation relay")]
#[command(version)]
struct Args {
    /// Config file (default is ~/.tolk/relay/config.yaml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Listen address, e.g. :5000 (overrides config)
    #[arg(long)]
    listen: Option<String>,

    /// Directory of static files to serve (overrides config)
    #[arg(long)]
    static_dir: Option<PathBuf>,

    /// Validate the config and exit
    #[arg(long)]
    check: bool,

    /// Verbose output
    #[arg(short = 'v', long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();

    let mut cfg = config::load_config(args.config.as_deref())?;
    if let Some(listen) = args.listen {
        cfg.listen = listen;
    }
    if let Some(dir) = args.static_dir {
        cfg.static_dir = Some(dir);
    }

    let pipeline = cfg.build_pipeline().context("build pipeline")?;
    if args.check {
        println!("config ok");
        return Ok(());
    }

    tracing::info!(
        languages = %cfg.languages,
        transcriber = %cfg.transcriber.endpoint.url,
        translator = %cfg.translator.endpoint.url,
        synthesizer = %cfg.synthesizer.provider.endpoint.url,
        "tolk: starting relay"
    );

    let state = AppState::new(pipeline, cfg.session_options());
    tolk_relay::server::serve(&cfg.listen, state, cfg.static_dir.clone()).await?;
    Ok(())
}
