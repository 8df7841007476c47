use clap::Parser;
use log::{error, info};
use meowkov::atoms::constants::{DEFAULT_CONFIG_PATH, VERSION};
use meowkov::engine::{import, irc};
use meowkov::{open_store, BotConfig, Corpus, EngineResult, Responder};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "meowkov", version = VERSION, about = "Markov-chain IRC chat bot")]
struct Args {
    /// Path to the JSON configuration file
    #[arg(short, long, env = "MEOWKOV_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Learn lines piped on stdin instead of connecting to IRC
    #[arg(long)]
    import: bool,

    /// Remove the existing corpus before importing
    #[arg(long, requires = "import")]
    purge: bool,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    let config = match BotConfig::load(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("meowkov: {}", e);
            std::process::exit(1);
        }
    };

    // Per-seed corpus dumps would dominate a bulk import.
    let level = if config.debug && !args.import { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    if let Err(e) = run(args, config).await {
        error!("{}", e);
        std::process::exit(1);
    }
}

async fn run(args: Args, config: BotConfig) -> EngineResult<()> {
    info!("meowkov {} starting, corpus backend: {:?}", VERSION, config.corpus_backend);
    let store = open_store(&config).await?;
    let responder = Arc::new(Responder::new(&config, Corpus::new(store)));

    if args.import {
        import::import_stdin(responder.clone(), args.purge).await?;
        return responder.corpus().persist().await;
    }
    irc::run_bridge(&config, responder).await
}
