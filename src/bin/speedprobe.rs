use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use speedprobe::client::Client;
use speedprobe::config::{RawTestConfig, ServerConfig, TestConfig};
use speedprobe::emitter::{Emitter, HumanReadableEmitter, JsonEmitter};
use speedprobe::{params, server};
use tracing_subscriber::EnvFilter;

#[derive(Clone, Debug, clap::ValueEnum)]
enum Format {
    Human,
    Json,
}

#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Measure latency, download and upload against a server
    Test(TestArgs),
    /// Run the measurement server
    Serve(ServeArgs),
}

#[derive(Args, Debug)]
struct TestArgs {
    /// Server base URL, e.g. http://127.0.0.1:8080
    #[arg(long)]
    server: Option<String>,
    /// Number of sequential echo round trips
    #[arg(long)]
    ping_count: Option<u32>,
    /// Number of 1 MiB download units
    #[arg(long, visible_alias = "download-megabytes")]
    download_units: Option<u32>,
    /// Number of 1 MiB upload units
    #[arg(long, visible_alias = "upload-megabytes")]
    upload_units: Option<u32>,
    /// Time budget of each subtest, in seconds
    #[arg(long)]
    deadline_seconds: Option<u64>,
    /// JSON file with default settings; flags take precedence
    #[arg(long)]
    config: Option<PathBuf>,
    /// Output format to use: 'human' or 'json' for batch processing
    #[arg(long, default_value = "human")]
    format: Format,
    /// Skip fetching the server status before testing
    #[arg(long)]
    no_status: bool,
}

#[derive(Args, Debug)]
struct ServeArgs {
    /// Address to listen on
    #[arg(long, default_value = params::DEFAULT_BIND_ADDRESS)]
    bind: SocketAddr,
    /// Chunks a download may queue ahead of the socket
    #[arg(long, default_value_t = params::HIGH_WATER_MARK)]
    high_water_mark: usize,
    /// Largest accepted upload body in bytes
    #[arg(long, default_value_t = params::MAX_UPLOAD_SIZE)]
    max_upload_size: usize,
}

impl TestArgs {
    fn load(&self) -> Result<TestConfig, speedprobe::config::ConfigError> {
        let file = match &self.config {
            Some(path) => RawTestConfig::from_json_file(path)?,
            None => RawTestConfig::default(),
        };
        let flags = RawTestConfig {
            server: self.server.clone(),
            ping_count: self.ping_count,
            download_units: self.download_units,
            upload_units: self.upload_units,
            deadline_seconds: self.deadline_seconds,
        };
        TestConfig::try_from(file.merge(flags))
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Test(args) => run_test(args).await,
        Command::Serve(args) => run_server(args).await,
    }
}

async fn run_test(args: TestArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = match args.load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    };
    tracing::info!(server = %config.server(), "starting test");

    let mut emitter: Box<dyn Emitter> = match args.format {
        Format::Human => Box::new(HumanReadableEmitter::new(std::io::stdout())),
        Format::Json => Box::new(JsonEmitter::new(std::io::stdout())),
    };

    let client = Client::new(config)?;

    if !args.no_status {
        match client.server_status().await {
            Ok(status) => emitter.on_server(&status)?,
            Err(e) => tracing::warn!("server status unavailable: {e}"),
        }
    }

    client.run(emitter.as_mut()).await;
    Ok(())
}

async fn run_server(args: ServeArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = ServerConfig {
        high_water_mark: args.high_water_mark,
        max_upload_size: args.max_upload_size,
        ..ServerConfig::new(args.bind)
    };
    let config = match config.validate() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    };

    server::serve(config).await?;
    Ok(())
}
