//! Rostrum - moderated debate chat server
//!
//! `serve` hosts channels; `join`, `create` and `list` talk to a running
//! server from the terminal.

use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use rostrum_core::Config;
use rostrum_net::{Client, ClientEvent, Registry, Server};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod openrouter;
mod terminal;

/// How long `create` and `list` wait for the server's answer
const REPLY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Parser)]
#[command(name = "rostrum", version, about = "Turn-gated debate chat with an AI moderator")]
struct Cli {
    /// Config file (defaults to the platform config directory)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v, -vv, -vvv); RUST_LOG takes precedence
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Host debate channels
    Serve,
    /// Join a channel from the terminal
    Join {
        /// Server address
        addr: SocketAddr,
        channel: String,
        /// Display name; empty becomes "Guest"
        name: String,
        /// Channel secret; omit to watch read-only
        #[arg(long)]
        secret: Option<String>,
    },
    /// Create a channel on a running server
    Create {
        name: String,
        #[arg(long, default_value = "")]
        secret: String,
        /// Server address (defaults to the configured bind port on localhost)
        #[arg(long)]
        server: Option<SocketAddr>,
    },
    /// List channels on a running server
    List {
        #[arg(long)]
        server: Option<SocketAddr>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = Config::load(cli.config.as_deref()).context("loading configuration")?;

    match cli.command {
        Command::Serve => serve(config).await,
        Command::Join {
            addr,
            channel,
            name,
            secret,
        } => terminal::run(addr, &channel, &name, secret.as_deref()).await,
        Command::Create {
            name,
            secret,
            server,
        } => create(server.unwrap_or_else(|| local_addr(&config)), &name, &secret).await,
        Command::List { server } => list(server.unwrap_or_else(|| local_addr(&config))).await,
    }
}

fn init_logging(verbose: u8) {
    let fallback = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

async fn serve(config: Config) -> Result<()> {
    tracing::info!(model = %config.ai.model, "Starting Rostrum");

    let api_key = config.ai.api_key()?;
    let analyst = Arc::new(openrouter::OpenRouter::new(&config.ai, api_key)?);

    let registry = Arc::new(Registry::from_config(&config, analyst).await?);
    let server = Server::start(config.server.bind, registry).await?;
    println!("Rostrum listening on {}", server.addr());

    tokio::signal::ctrl_c().await?;
    tracing::info!("Interrupt received");
    server.shutdown().await;
    Ok(())
}

async fn create(addr: SocketAddr, name: &str, secret: &str) -> Result<()> {
    let mut client = Client::connect(addr).await?;
    client.create_channel(name, secret).await?;

    match next_reply(&mut client).await? {
        ClientEvent::ChannelCreated { name, channel_id } => {
            println!("Created {} ({})", name, channel_id);
        }
        ClientEvent::Refused { reason } => bail!("create refused: {}", reason),
        other => bail!("unexpected reply: {:?}", other),
    }
    client.disconnect();
    Ok(())
}

async fn list(addr: SocketAddr) -> Result<()> {
    let mut client = Client::connect(addr).await?;
    client.list_channels().await?;

    match next_reply(&mut client).await? {
        ClientEvent::Channels(channels) if channels.is_empty() => println!("No channels."),
        ClientEvent::Channels(channels) => {
            for channel in channels {
                println!(
                    "{:<24} {:>3} connected  {:?}",
                    channel.name, channel.occupancy, channel.phase
                );
            }
        }
        other => bail!("unexpected reply: {:?}", other),
    }
    client.disconnect();
    Ok(())
}

async fn next_reply(client: &mut Client) -> Result<ClientEvent> {
    tokio::time::timeout(REPLY_TIMEOUT, client.next_event())
        .await
        .context("server did not answer")?
        .context("connection closed")
}

/// Loopback address on the configured port
fn local_addr(config: &Config) -> SocketAddr {
    let bind = config.server.bind;
    if bind.ip().is_unspecified() {
        SocketAddr::from((Ipv4Addr::LOCALHOST, bind.port()))
    } else {
        bind
    }
}
