//! Queue and signaling server demo
//!
//! Run with: cargo run --example queue_server [BIND_ADDR]
//!
//! Examples:
//!   cargo run --example queue_server                    # binds to 0.0.0.0:$PORT (3000)
//!   cargo run --example queue_server localhost          # binds to 127.0.0.1:3000
//!   cargo run --example queue_server 127.0.0.1:3001     # binds to 127.0.0.1:3001
//!
//! ## Drawing a ticket
//!
//!   curl -X POST localhost:3000/api/queue -d '{"type":"in-store","customerName":"Ana"}'
//!
//! ## Watching the queue
//!
//!   websocat ws://localhost:3000/api/socket
//!   {"event":"queue.request"}
//!
//! ## Environment
//!
//! - `PORT`: default port when no address is given
//! - `QUEUECAST_STUN`: comma-separated STUN URLs sent to clients
//! - `RUST_LOG`: log filter, e.g. `queuecast=trace`

use std::net::SocketAddr;

use queuecast::{QueueServer, ServerConfig};

/// Parse bind address from command line argument.
///
/// Accepts formats:
/// - "localhost" -> 127.0.0.1:<port>
/// - "localhost:3001" -> 127.0.0.1:3001
/// - "127.0.0.1" -> 127.0.0.1:<port>
/// - "0.0.0.0:3000" -> 0.0.0.0:3000
fn parse_bind_addr(arg: &str, default_port: u16) -> Result<SocketAddr, String> {
    let normalized = arg.replace("localhost", "127.0.0.1");

    if let Ok(addr) = normalized.parse::<SocketAddr>() {
        return Ok(addr);
    }

    if let Ok(ip) = normalized.parse::<std::net::IpAddr>() {
        return Ok(SocketAddr::new(ip, default_port));
    }

    Err(format!(
        "Invalid bind address: '{}'. Expected format: IP:PORT or IP or 'localhost'",
        arg
    ))
}

fn print_usage() {
    eprintln!("Usage: queue_server [BIND_ADDR]");
    eprintln!();
    eprintln!("Arguments:");
    eprintln!("  BIND_ADDR    Address to bind to (default: 0.0.0.0:$PORT, PORT defaults to 3000)");
    eprintln!();
    eprintln!("Examples:");
    eprintln!("  queue_server                      # binds to 0.0.0.0:3000");
    eprintln!("  queue_server localhost            # binds to 127.0.0.1:3000");
    eprintln!("  queue_server 127.0.0.1:3001       # binds to 127.0.0.1:3001");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().skip(1).collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_usage();
        return Ok(());
    }

    let mut config = ServerConfig::from_env();

    if let Some(addr_str) = args.first() {
        match parse_bind_addr(addr_str, config.bind_addr.port()) {
            Ok(addr) => config = config.bind(addr),
            Err(e) => {
                eprintln!("Error: {}", e);
                eprintln!();
                print_usage();
                std::process::exit(1);
            }
        }
    }

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("queuecast=debug".parse()?)
                .add_directive("queue_server=debug".parse()?)
                .add_directive("tower_http=info".parse()?),
        )
        .init();

    println!("Starting queue server on {}", config.bind_addr);
    println!();
    println!("REST:      http://{}/api/queue", config.bind_addr);
    println!("WebSocket: ws://{}{}", config.bind_addr, config.ws_path);
    println!("Health:    http://{}/health", config.bind_addr);
    println!();

    let server = QueueServer::new(config);

    let shutdown = async {
        let _ = tokio::signal::ctrl_c().await;
        println!("\nShutting down...");
    };

    if let Err(e) = server.run_until(shutdown).await {
        eprintln!("Server error: {}", e);
    }

    Ok(())
}
