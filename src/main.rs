//! realtime-tail - Binary Entry Point
//!
//! Connects to one channel and prints every event as a JSON line.

use clap::Parser;
use tokio_stream::StreamExt;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use food_realtime::{handler, Channel, ConnectionState, RealtimeClient, RealtimeConfig};

type CliResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Tail a realtime channel of the food delivery platform
///
/// Examples:
///   realtime-tail orders 12 --token $TOKEN --type order.updated
///   realtime-tail admin --token $TOKEN
#[derive(Parser, Debug)]
#[command(author, version)]
struct Cli {
    /// Channel name: customer, orders, delivery, admin or chat
    channel: String,

    /// Resource id (restaurant, rider, room...); omitted for admin
    id: Option<u64>,

    /// Bearer token
    #[arg(long, env = "REALTIME_TOKEN")]
    token: String,

    /// Resume from this event id
    #[arg(long)]
    since: Option<String>,

    /// Event types to print (repeatable)
    #[arg(long = "type", value_name = "EVENT_TYPE", required = true)]
    event_types: Vec<String>,
}

#[tokio::main]
async fn main() -> CliResult<()> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = RealtimeConfig::from_env();
    let channel = Channel::parse(&cli.channel, cli.id)?;
    let client = RealtimeClient::new(&config, channel, &cli.token)?;

    for event_type in &cli.event_types {
        client.on(
            event_type.clone(),
            handler(|event| match serde_json::to_string(event) {
                Ok(line) => println!("{line}"),
                Err(e) => tracing::warn!(error = %e, "Failed to render event"),
            }),
        );
    }

    info!(%channel, "Connecting");
    client.connect(cli.since.as_deref()).await;

    let mut states = client.state_stream();
    loop {
        tokio::select! {
            state = states.next() => {
                match state {
                    Some(ConnectionState::Failed) => {
                        tracing::error!("Giving up after repeated connection failures");
                        break;
                    }
                    Some(state) => info!(%state, "Connection state changed"),
                    None => break,
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, disconnecting");
                break;
            }
        }
    }

    client.disconnect();
    if let Some(last) = client.last_event_id() {
        info!(last_event_id = %last, "Resume with --since {last}");
    }
    Ok(())
}
