use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use tokio::io::Stdin;
use tracing::{debug, warn};

use crate::config::{Config, QualityConfig, DEFAULT_CONFIG_PATH};
use crate::core::artist::ArtistExpansion;
use crate::core::batch::{AutoContinue, BatchRunner, ConsoleGate, PassObserver, RetryGranularity, RetryPolicy};
use crate::core::counter::RunCounter;
use crate::core::descriptor::{classify, Descriptor, MediaType};
use crate::core::dispatch::Outcome;
use crate::core::metadata::SearchKind;
use crate::server::{start_server, AppState};
use crate::services::Services;
use crate::utils::parse_selection;

#[derive(Parser)]
#[command(name = "amdl-ng")]
#[command(about = "Bulk Apple Music downloader with retry passes and an HTTP task server")]
#[command(version)]
#[command(args_conflicts_with_subcommands = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Apple Music URLs to download (search terms with --search)
    #[arg(value_name = "URL")]
    pub urls: Vec<String>,

    /// Download Dolby Atmos
    #[arg(long)]
    pub atmos: bool,

    /// Download AAC
    #[arg(long)]
    pub aac: bool,

    /// Select individual tracks
    #[arg(long)]
    pub select: bool,

    /// Only download the selected song of an album link
    #[arg(long)]
    pub song: bool,

    /// Download every album of an artist without asking
    #[arg(long)]
    pub all_album: bool,

    /// Only print quality information and debug logs
    #[arg(long, global = true)]
    pub debug: bool,

    #[arg(long, value_name = "N")]
    pub alac_max: Option<u32>,

    #[arg(long, value_name = "N")]
    pub atmos_max: Option<u32>,

    #[arg(long, value_name = "KIND")]
    pub aac_type: Option<String>,

    #[arg(long, value_name = "KIND")]
    pub mv_audio_type: Option<String>,

    #[arg(long, value_name = "N")]
    pub mv_max: Option<u32>,

    /// Configuration file
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Search the catalog (album, song or artist) with the positional words as query
    #[arg(long, value_name = "TYPE")]
    pub search: Option<SearchKind>,

    /// Retry failed passes without waiting for Enter
    #[arg(long)]
    pub auto_retry: bool,

    /// Give up after this many passes
    #[arg(long, value_name = "N")]
    pub max_passes: Option<u32>,

    /// Retry only the items that failed instead of the whole list
    #[arg(long)]
    pub retry_failed_only: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the HTTP task server
    Serve {
        #[arg(long, default_value_t = 8080)]
        port: u16,

        #[arg(long, default_value_t = IpAddr::V4(Ipv4Addr::LOCALHOST))]
        bind: IpAddr,
    },
}

impl Cli {
    /// Runs the command. Failures are printed and the run returns normally.
    pub async fn run(&self) -> Result<()> {
        let config = match Config::load(&self.config) {
            Ok(config) => config,
            Err(e) => {
                println!("load Config failed: {e}");
                return Ok(());
            }
        };
        debug!(config = ?config.redacted(), "configuration loaded");
        let services = match Services::from_config(&config) {
            Ok(services) => services,
            Err(e) => {
                println!("Failed to create HTTP client: {e}");
                return Ok(());
            }
        };

        if let Some(Command::Serve { port, bind }) = &self.command {
            let addr = SocketAddr::new(*bind, *port);
            if let Err(e) = start_server(AppState::new(services, config), addr).await {
                println!("Server failed: {e:#}");
            }
            return Ok(());
        }

        if self.search.is_some() && self.urls.is_empty() {
            println!("Error: --search requires a query");
            Cli::command().print_help()?;
            return Ok(());
        }

        let token = match services.tokens.token().await {
            Ok(token) => token,
            Err(e) => {
                warn!(error = %e, "token acquisition failed");
                println!("Failed to get token.");
                return Ok(());
            }
        };

        let mut console = ConsoleGate::stdin();
        let mut urls = self.urls.clone();
        if let Some(kind) = self.search {
            match search(&services, &config, kind, &urls.join(" "), &token, &mut console).await {
                Ok(Some(url)) => urls = vec![url],
                Ok(None) => return Ok(()),
                Err(e) => {
                    println!("\nSearch process failed: {e:#}");
                    return Ok(());
                }
            }
        }
        if urls.is_empty() {
            println!("No URLs provided. Please provide at least one URL.");
            return Ok(());
        }

        let mut artist_folder = config.artist_folder_format.clone();
        if classify(&urls[0]).media_type == MediaType::Artist {
            let expansion = match services.expander(&config).expand(&urls[0], &token).await {
                Ok(expansion) => expansion,
                Err(e) => {
                    warn!(error = ?e, "artist expansion failed");
                    println!("{e}");
                    return Ok(());
                }
            };
            artist_folder = expansion.folder_format.clone();
            urls = if self.all_album {
                expansion.urls
            } else {
                match select_from(&expansion, &mut console).await {
                    Ok(urls) => urls,
                    Err(e) => {
                        println!("Failed to read selection: {e:#}");
                        return Ok(());
                    }
                }
            };
            if urls.is_empty() {
                println!("Nothing selected.");
                return Ok(());
            }
        }

        let quality = self.quality(&config);
        let router = services.router(&config, &artist_folder);
        let runner = BatchRunner::new(&router, &token, &quality, self.retry_policy());
        let mut observer = ConsoleObserver;
        let report = if self.auto_retry {
            runner.run(&urls, &mut observer, &mut AutoContinue).await
        } else {
            runner.run(&urls, &mut observer, &mut console).await
        };

        if !report.succeeded() {
            println!(
                "Stopped after {} passes with {} errors",
                report.passes, report.counter.error
            );
            for (url, reason) in &report.failed {
                println!("  {url}: {reason}");
            }
        }

        Ok(())
    }

    /// Config values overridden by whatever flags were given.
    pub fn quality(&self, config: &Config) -> QualityConfig {
        let mut quality = QualityConfig::from_config(config);
        quality.atmos = self.atmos;
        quality.aac = self.aac;
        quality.select = self.select;
        quality.song_only = self.song;
        quality.debug = self.debug;
        if let Some(max) = self.alac_max {
            quality.alac_max = max;
        }
        if let Some(max) = self.atmos_max {
            quality.atmos_max = max;
        }
        if let Some(kind) = &self.aac_type {
            quality.aac_type = kind.clone();
        }
        if let Some(kind) = &self.mv_audio_type {
            quality.mv_audio_type = kind.clone();
        }
        if let Some(max) = self.mv_max {
            quality.mv_max = max;
        }
        quality
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            granularity: if self.retry_failed_only {
                RetryGranularity::FailedOnly
            } else {
                RetryGranularity::FullList
            },
            max_passes: self.max_passes.filter(|n| *n > 0),
        }
    }
}

/// Prints queue progress and the per-pass tally.
struct ConsoleObserver;

impl PassObserver for ConsoleObserver {
    fn item_started(&mut self, index: usize, total: usize, _url: &str, descriptor: &Descriptor) {
        println!("Queue {} of {}: {}", index + 1, total, descriptor.media_type.label());
    }

    fn item_skipped(&mut self, _index: usize, _total: usize, url: &str, reason: &str) {
        debug!(url, reason, "skipped");
        if reason != MediaType::Invalid.label() {
            println!("{reason}");
        }
    }

    fn item_finished(&mut self, _index: usize, _total: usize, url: &str, outcome: &Outcome) {
        match outcome {
            Outcome::Success => {}
            Outcome::SkippedPrecondition(reason) => println!("{reason}"),
            Outcome::Unavailable(reason) => println!("Unavailable: {reason}"),
            Outcome::NotSong(reason) => println!("Not a song: {reason}"),
            Outcome::Failed(reason) => println!("Failed to download {url}: {reason}"),
        }
    }

    fn pass_finished(&mut self, _pass: u32, counter: &RunCounter) {
        println!("{counter}");
    }
}

async fn select_from(expansion: &ArtistExpansion, console: &mut ConsoleGate<Stdin>) -> Result<Vec<String>> {
    println!("{} ({})", expansion.artist_name, expansion.artist_id);
    for (i, url) in expansion.urls.iter().enumerate() {
        let kind = if i < expansion.album_count { "Album" } else { "Music Video" };
        println!("{:>4}. [{kind}] {url}", i + 1);
    }

    let answer = console
        .prompt("Please select from the list (e.g. 1, 3-5 or all): ")
        .await?
        .unwrap_or_default();
    Ok(parse_selection(&answer, expansion.urls.len())
        .into_iter()
        .map(|i| expansion.urls[i].clone())
        .collect())
}

async fn search(
    services: &Services,
    config: &Config,
    kind: SearchKind,
    term: &str,
    token: &str,
    console: &mut ConsoleGate<Stdin>,
) -> Result<Option<String>> {
    let hits = services
        .catalog
        .search(&config.storefront, kind, term, token)
        .await
        .with_context(|| format!("search for '{term}' failed"))?;
    if hits.is_empty() {
        println!("No results found.");
        return Ok(None);
    }

    for (i, hit) in hits.iter().enumerate() {
        match &hit.detail {
            Some(detail) => println!("{:>3}. {} - {}", i + 1, hit.name, detail),
            None => println!("{:>3}. {}", i + 1, hit.name),
        }
    }

    let answer = console.prompt("Select a number (empty to exit): ").await?.unwrap_or_default();
    if answer.is_empty() {
        return Ok(None);
    }
    match answer.parse::<usize>() {
        Ok(n) if (1..=hits.len()).contains(&n) => Ok(Some(hits[n - 1].url.clone())),
        _ => {
            println!("Invalid selection.");
            Ok(None)
        }
    }
}
