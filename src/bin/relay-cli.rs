use std::path::PathBuf;

use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::Value;

use media_relay::config::{load_config, RelayConfig};
use media_relay::headers::HeaderSelector;
use media_relay::intercept::MediaClassifier;

#[derive(Parser)]
#[command(name = "relay-cli")]
#[command(about = "Management CLI for the media relay", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8081")]
    url: String,

    #[arg(short, long, default_value = "CHANGE_ME_IN_PRODUCTION")]
    key: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check relay status
    Status,
    /// Show request counters
    Stats,
    /// Inspect the response cache
    Cache,
    /// Drop every cached response
    ClearCache,
    /// Show how a URL would be handled, without contacting the relay
    Inspect {
        url: String,

        /// Use this configuration instead of the built-in defaults
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let path = match cli.command {
        Commands::Inspect { url, config } => return inspect(&url, config),
        Commands::Status => "status",
        Commands::Stats => "stats",
        Commands::Cache | Commands::ClearCache => "cache",
    };
    let clear = matches!(cli.command, Commands::ClearCache);

    let client = reqwest::Client::new();
    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", cli.key))?,
    );

    let endpoint = format!("{}/admin/{}", cli.url.trim_end_matches('/'), path);
    let request = if clear {
        client.delete(endpoint)
    } else {
        client.get(endpoint)
    };
    let res = request.headers(headers).send().await?;
    print_response(res).await
}

fn inspect(url: &str, config: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let config = match config {
        Some(path) => load_config(&path)?,
        None => RelayConfig::default(),
    };
    let classifier = MediaClassifier::from_config(&config.intercept);
    let selector = HeaderSelector::from_config(&config.rewrite)?;

    let Some(marker) = classifier.matched_marker(url) else {
        println!("{url}\n  media: no (passed through unchanged)");
        return Ok(());
    };

    let bundle = selector.select(url);
    println!("{url}");
    println!("  media: yes (matched '{marker}')");
    println!("  group: {}", bundle.group());
    println!("  merge: {:?}", config.rewrite.merge_mode);
    println!("  on failure: {:?}", config.upstream.failure_policy);
    println!("  headers:");
    for (name, value) in bundle.iter() {
        println!("    {}: {}", name, value.to_str().unwrap_or("<binary>"));
    }
    Ok(())
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: Admin API returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
