//! Chess relay server binary.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin server
//! cargo run --bin server -- --host 0.0.0.0 --port 3000
//! ```

use chess_relay_rs::{common::logger::setup_logger, server::run_server};
use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "server")]
#[command(about = "WebSocket relay server for two-player chess", long_about = None)]
struct Args {
    /// Host address to bind the server to
    #[arg(short = 'H', long, default_value = "0.0.0.0")]
    host: String,

    /// Port number to bind the server to (deployment environments set PORT)
    #[arg(short = 'p', long, env = "PORT", default_value = "3000")]
    port: u16,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), "info");

    let args = Args::parse();

    if let Err(e) = run_server(args.host, args.port).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
