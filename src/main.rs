use std::time::Duration;

use clap::Parser;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use switchview::layout;
use switchview::model::{Device, StatusResponse};
use switchview::secret::SecretString;
use switchview::snmp::Poller;
use switchview::version;
use switchview::view;

#[derive(Parser)]
#[command(name = "switchview")]
#[command(about = "Poll a switch over SNMP and print its port status view", long_about = None)]
struct Args {
    /// Device address (IPv4 or hostname)
    #[arg(long, env = "SWITCHVIEW_TARGET")]
    target: String,

    /// SNMPv2c community string
    #[arg(long, env = "SWITCHVIEW_COMMUNITY", default_value = "public")]
    community: String,

    /// Treat physical port 0 as a real faceplate port
    #[arg(long)]
    allow_port_zero: bool,

    /// Keep polling at this interval in seconds (one-shot when omitted)
    #[arg(long)]
    interval: Option<u64>,

    /// Pretty-print the JSON output
    #[arg(long)]
    pretty: bool,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    info!(version = version::current_version(), "switchview starting");

    let device = Device {
        id: 0,
        name: args.target.clone(),
        ip_address: args.target.clone(),
        community: SecretString::new(args.community.clone()),
        detected_ports: 0,
        allow_port_zero: args.allow_port_zero,
        enabled: true,
        layout: layout::default_layout(),
        created_at: chrono::Utc::now(),
    };

    let poller = Poller::new();
    let token = CancellationToken::new();

    let signal_token = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, aborting");
            signal_token.cancel();
        }
    });

    loop {
        match poll_once(&poller, &device, &token).await {
            Ok(response) => {
                let json = if args.pretty {
                    serde_json::to_string_pretty(&response)
                } else {
                    serde_json::to_string(&response)
                };
                match json {
                    Ok(json) => println!("{json}"),
                    Err(e) => error!("failed to encode view: {e}"),
                }
            }
            Err(e) => error!("poll failed: {e}"),
        }

        let Some(interval) = args.interval else {
            break;
        };
        tokio::select! {
            _ = token.cancelled() => break,
            _ = sleep(Duration::from_secs(interval)) => {}
        }
    }
}

/// Poll the device once and render it through a layout synthesized from the
/// answering ports, so the view reflects the real faceplate.
async fn poll_once(
    poller: &Poller,
    device: &Device,
    token: &CancellationToken,
) -> anyhow::Result<StatusResponse> {
    let result = poller.poll(device, token).await?;
    let layout = match layout::synthesize(&result, device.allow_port_zero) {
        Ok((layout, detected)) => {
            info!(ports = detected, "synthesized layout");
            layout
        }
        Err(e) => {
            info!("{e}, falling back to the default layout");
            device.layout.clone()
        }
    };
    let sections = view::map_sections(&layout, &result.interfaces, device.allow_port_zero);
    Ok(StatusResponse {
        system: result.system,
        sections,
    })
}
