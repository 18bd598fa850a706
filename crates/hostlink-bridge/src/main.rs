//! hostlink bridge binary.
//!
//! Runs the inside proxy: client VMs reach it through the in-process
//! messaging substrate, the outside proxy dials in over TCP.
//!
//! # Usage
//!
//! ```bash
//! hostlink-bridge --bind 127.0.0.1:3270
//! ```
//!
//! The bridge runs until the privileged END control message arrives;
//! Ctrl-C is delivered as that message.

use clap::Parser;
use hostlink_bridge::{MemoryVmcf, Runtime, TcpDialServer};
use hostlink_core::VmId;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// hostlink inside proxy
#[derive(Parser, Debug)]
#[command(name = "hostlink-bridge")]
#[command(about = "Bridge between client VMs and an outside proxy over a dialed display channel")]
#[command(version)]
struct Args {
    /// Address the outside proxy dials in to
    #[arg(short, long, default_value = "127.0.0.1:3270")]
    bind: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    tracing::info!("hostlink bridge starting");

    let (dial, dial_signals) = TcpDialServer::bind(&args.bind).await?;
    tracing::info!("dial channel listening on {}", dial.local_addr());

    let (vmcf, handle, substrate_signals) = MemoryVmcf::new();

    // Ctrl-C plays the privileged END control message
    tokio::spawn({
        let control = handle.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                control.send_control(VmId::MAINT, "END");
            }
        }
    });

    Runtime::new(vmcf, dial, substrate_signals, dial_signals).run().await?;

    tracing::info!("hostlink bridge stopped");
    Ok(())
}
