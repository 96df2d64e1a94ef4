use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use go_testgen::completion::{CompletionClient, OpenAiClient};
use go_testgen::config::{self, Config, Overrides};
use go_testgen::generate::{self, Options};

/// Env var controlling diagnostic log level (e.g. `debug`)
const ENV_LOG: &str = "GO_TESTGEN_LOG";

#[derive(Parser)]
#[command(author, version = env!("CARGO_PKG_VERSION"), about = "Generate Go test cases for top-level functions with an LLM", long_about = None)]
struct Cli {
    /// Directory (or single .go file) to scan
    #[arg(default_value = ".")]
    path: PathBuf,

    /// Chat model to use (overrides GPT_MODEL)
    #[arg(long)]
    model: Option<String>,

    /// API base URL (overrides OPENAI_BASE_URL)
    #[arg(long)]
    base_url: Option<String>,

    /// Skip functions longer than this many lines
    #[arg(long)]
    max_lines: Option<usize>,

    /// Request timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Config file (defaults to ./.go-testgen.toml when present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// List functions that would be sent without calling the API
    #[arg(long)]
    dry_run: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().filter_or(ENV_LOG, "warn")).init();

    let cli = Cli::parse();

    let overrides = Overrides {
        model: cli.model,
        base_url: cli.base_url,
        max_function_lines: cli.max_lines,
        timeout_secs: cli.timeout,
    };
    let config = Config::load(cli.config.as_deref(), &overrides)?;
    log::debug!("resolved config: {:?}", config);

    let options = Options {
        max_function_lines: config.max_function_lines,
    };

    let client: Option<Box<dyn CompletionClient>> = if cli.dry_run {
        println!("🔍 Dry run - no completion requests will be sent");
        None
    } else {
        let api_key = config::api_key()?;
        if config.model_defaulted {
            println!("Using GPT-3.5-turbo by default");
        }
        Some(Box::new(OpenAiClient::new(api_key, &config)?))
    };

    let summary = generate::run(&cli.path, client.as_deref(), &options)?;

    println!();
    println!("{}", summary);
    Ok(())
}
