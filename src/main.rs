//! syxlog - log printable debug text embedded in MIDI SysEx messages
//!
//! Connects to every MIDI input port, watches for hotplug, and prints the
//! ASCII payload of SysEx messages tagged with the recognized vendor id,
//! one line per message.

use anyhow::Result;
use clap::Parser;
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod decoder;
mod endpoint;
mod registry;
mod sink;

use crate::decoder::DecoderConfig;
use crate::endpoint::{EndpointProvider, SourceEvent};
use crate::registry::Registry;
use crate::sink::ConsoleSink;

/// Log printable debug text embedded in MIDI SysEx messages
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// SysEx vendor id byte that tags debug messages (decimal or 0x-hex)
    #[arg(long, default_value = "0x70", value_parser = parse_byte)]
    vendor_id: u8,

    /// Abort an in-progress message on any non-realtime status byte, as the
    /// MIDI specification requires
    #[arg(long)]
    respect_interrupt: bool,

    /// Prefix each output line with its source id
    #[arg(long)]
    tag_sources: bool,

    /// Seconds between MIDI port rescans (hotplug detection)
    #[arg(long, default_value = "1")]
    rescan_secs: u64,

    /// Log level (error, warn, info, debug, trace)
    #[arg(short, long, env = "LOG_LEVEL", default_value = "warn")]
    log_level: String,

    /// List available MIDI input ports and exit
    #[arg(long)]
    list_ports: bool,
}

fn parse_byte(s: &str) -> Result<u8, String> {
    let parsed = if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u8::from_str_radix(hex, 16)
    } else {
        s.parse::<u8>()
    };
    parsed.map_err(|e| format!("invalid byte value '{}': {}", s, e))
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let args = Args::parse();
    init_logging(&args.log_level)?;

    if args.list_ports {
        endpoint::print_input_ports()?;
        return Ok(());
    }

    let config = DecoderConfig {
        vendor_id: args.vendor_id,
        respect_interrupt: args.respect_interrupt,
    };
    let mut registry = Registry::new(config, ConsoleSink::new(args.tag_sources));

    let (event_tx, mut event_rx) = mpsc::channel(1000);
    let mut provider = EndpointProvider::new(event_tx);
    provider.rescan()?;

    info!(
        "listening for SysEx debug text (vendor id 0x{:02X})",
        args.vendor_id
    );

    let mut rescan =
        tokio::time::interval(std::time::Duration::from_secs(args.rescan_secs.max(1)));
    rescan.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    // Single-threaded event loop: every registry mutation happens here, so
    // decoders are never touched concurrently
    loop {
        tokio::select! {
            Some(event) = event_rx.recv() => match event {
                SourceEvent::Added(id, name) => {
                    info!("source added: {} (id {})", name, id);
                    registry.on_source_added(id);
                }
                SourceEvent::Removed(id) => {
                    info!("source removed: id {}", id);
                    registry.on_source_removed(id);
                }
                SourceEvent::Bytes(id, bytes) => registry.dispatch(id, &bytes),
            },
            _ = rescan.tick() => {
                if let Err(e) = provider.rescan() {
                    warn!("port rescan failed: {}", e);
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("shutdown signal received");
                break;
            }
        }
    }

    Ok(())
}

fn init_logging(level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_thread_names(false),
        )
        .init();

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_byte_hex_and_decimal() {
        assert_eq!(parse_byte("0x70"), Ok(0x70));
        assert_eq!(parse_byte("0X2a"), Ok(0x2A));
        assert_eq!(parse_byte("112"), Ok(112));
        assert!(parse_byte("0x100").is_err());
        assert!(parse_byte("nope").is_err());
    }
}
