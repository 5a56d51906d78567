use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use gate::banner::{BannerInfo, print_banner, print_session_summary};
use gate::config::Settings;
use gate::connectors::{ConnectionRequest, ConnectionResult};
use gate::consts::{DEFAULT_HISTORY_LIMIT, default_config_path, default_journal_path};
use gate::events::EventBus;
use gate::gateway::Gateway;
use gate::journal::Journal;
use gate::journal::sqlite::SqliteJournal;

#[derive(Parser)]
#[command(name = "gate", version, about = "Route requests to named connectors.")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Settings file (default: ~/.gate/gate.json)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// SQLite journal path (use :memory: for ephemeral)
    #[arg(short, long)]
    db: Option<String>,

    /// Don't record routed requests
    #[arg(long, default_value_t = false)]
    no_journal: bool,

    /// Connect timeout in seconds, overriding the settings file (0 disables)
    #[arg(short, long)]
    timeout: Option<u64>,
}

#[derive(Subcommand)]
enum Command {
    /// Route one request and print the result as JSON
    Route {
        connector: String,
        source: String,
        destination: String,
    },
    /// Route every request in a JSON array file concurrently
    Batch { file: PathBuf },
    /// Hand a payload to a connector
    Send { connector: String, payload: String },
    /// List registered connectors
    Connectors,
    /// Show recently routed requests
    History {
        #[arg(short, long, default_value_t = DEFAULT_HISTORY_LIMIT)]
        limit: usize,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(default_config_path);
    let settings = Settings::load(&config_path)?;
    let mut gateway_config = settings.gateway_config();
    if let Some(secs) = cli.timeout {
        gateway_config.connect_timeout = (secs > 0).then(|| Duration::from_secs(secs));
    }

    let events = EventBus::default();
    let logger = events.spawn_logger();

    let registry = settings.build_registry(&events)?;
    let gateway = Gateway::new(Arc::new(registry), events.clone(), gateway_config.clone());

    // Opened only by the commands that record or read history.
    let journal_path = (!cli.no_journal).then(|| {
        cli.db
            .clone()
            .unwrap_or_else(|| default_journal_path().display().to_string())
    });

    match cli.command {
        Some(Command::Route {
            connector,
            source,
            destination,
        }) => {
            let request = ConnectionRequest::new(source, destination, connector);
            let journal = open_journal(journal_path.as_deref())?;
            let result = route_and_record(&gateway, journal.as_deref(), &request).await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Some(Command::Batch { file }) => {
            let raw = std::fs::read_to_string(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            let requests: Vec<ConnectionRequest> = serde_json::from_str(&raw)
                .with_context(|| format!("invalid request list in {}", file.display()))?;
            let journal = open_journal(journal_path.as_deref())?;
            let results = gateway.route_many(&requests).await;
            if let Some(journal) = journal.as_deref() {
                for (request, result) in requests.iter().zip(&results) {
                    journal.record(request, result).await?;
                }
            }
            println!("{}", serde_json::to_string_pretty(&results)?);
        }
        Some(Command::Send { connector, payload }) => {
            gateway.send(&connector, &payload).await;
        }
        Some(Command::Connectors) => {
            for d in gateway.registry().descriptions() {
                println!("{:<12} {}", d.name, d.kind);
            }
        }
        Some(Command::History { limit }) => {
            let Some(journal) = open_journal(journal_path.as_deref())? else {
                bail!("journal is disabled (--no-journal)");
            };
            for entry in journal.recent(limit).await? {
                println!(
                    "{}  {:<10} {} -> {}  {}",
                    entry.timestamp,
                    entry.result.connector_name(),
                    entry.source,
                    entry.destination,
                    entry.result.status(),
                );
            }
        }
        None => {
            let journal = open_journal(journal_path.as_deref())?;
            let names = gateway.registry().names();
            print_banner(&BannerInfo {
                config: &config_path,
                connectors: &names,
                connect_timeout: gateway_config.connect_timeout,
                max_attempts: gateway_config.max_attempts,
                journal: match journal_path.as_deref() {
                    None => "off",
                    Some(":memory:") => "ephemeral",
                    Some(path) => path,
                },
            });
            repl(&gateway, journal.as_deref()).await?;
            print_session_summary(gateway.stats());
        }
    }

    // Every bus handle must go before the logger can drain and exit.
    drop(gateway);
    drop(events);
    let _ = logger.await;
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("gate=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn open_journal(path: Option<&str>) -> anyhow::Result<Option<Box<dyn Journal>>> {
    let Some(path) = path else {
        return Ok(None);
    };
    if path != ":memory:" {
        let path = PathBuf::from(path);
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
    }
    Ok(Some(Box::new(SqliteJournal::open(path)?)))
}

async fn route_and_record(
    gateway: &Gateway,
    journal: Option<&dyn Journal>,
    request: &ConnectionRequest,
) -> anyhow::Result<ConnectionResult> {
    let result = gateway.route(request).await;
    if let Some(journal) = journal {
        journal.record(request, &result).await?;
    }
    Ok(result)
}

const REPL_HELP: &str = "\
  <connector> <source> <destination>   route a request
  send <connector> <payload...>        hand a payload to a connector
  connectors                           list connectors
  quit                                 leave";

async fn repl(gateway: &Gateway, journal: Option<&dyn Journal>) -> anyhow::Result<()> {
    // Async stdin so Ctrl+C is caught at the prompt too
    let stdin = BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();

    loop {
        print!("\ngate> ");
        io::stdout().flush()?;

        let line = tokio::select! {
            result = lines.next_line() => {
                match result {
                    Ok(Some(line)) => line,
                    Ok(None) => {
                        println!();
                        break;
                    }
                    Err(e) => {
                        eprintln!("input error: {}", e);
                        break;
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                println!();
                break;
            }
        };

        let words: Vec<&str> = line.split_whitespace().collect();
        match words.as_slice() {
            [] => continue,
            ["quit" | "exit"] => break,
            ["help"] => println!("{REPL_HELP}"),
            ["connectors"] => println!("{}", gateway.registry().names().join(", ")),
            ["send", connector, payload @ ..] if !payload.is_empty() => {
                gateway.send(connector, &payload.join(" ")).await;
            }
            [connector, source, destination] => {
                let request = ConnectionRequest::new(*source, *destination, *connector);
                match route_and_record(gateway, journal, &request).await {
                    Ok(result) => println!("=> {}", serde_json::to_string(&result)?),
                    Err(e) => eprintln!("error: {}", e),
                }
            }
            _ => println!("{REPL_HELP}"),
        }
    }
    Ok(())
}
