//! Pairlink server binary.
//!
//! Serves an `echo` topic that returns each request unchanged. Ctrl-C closes
//! the listener and signals in-flight handlers; connections already accepted
//! finish their exchange.

use std::time::Duration;

use clap::Parser;
use pairlink_core::Limits;
use pairlink_proto::Data;
use pairlink_server::{HandlerContext, HandlerError, Server, ServerConfig};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Pairlink protocol server
#[derive(Parser, Debug)]
#[command(name = "pairlink-server", version, about)]
struct Args {
    /// Address to listen on
    #[arg(long, default_value = "127.0.0.1:8080")]
    addr: String,

    /// Deadline for one connection's whole exchange, in milliseconds
    #[arg(long, default_value_t = 250)]
    conn_timeout_ms: u64,

    /// Advisory deadline for one handler call, in milliseconds
    #[arg(long, default_value_t = 250)]
    handle_timeout_ms: u64,

    /// Maximum accepted payload size in bytes (0 disables the check)
    #[arg(long, default_value_t = 1024)]
    body_limit: usize,
}

impl Args {
    fn config(&self) -> ServerConfig {
        let limits = Limits::default()
            .with_body(self.body_limit)
            .with_connection_timeout(Duration::from_millis(self.conn_timeout_ms))
            .with_handle_timeout(Duration::from_millis(self.handle_timeout_ms));
        ServerConfig::new(self.addr.clone()).with_limits(limits)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let server = Server::new(args.config());

    server
        .handle("echo", |_ctx: HandlerContext, request: Data| async move {
            Ok::<_, HandlerError>(request)
        })
        .await;

    server.cancel_on(async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("shutting down"),
            Err(e) => {
                error!(error = %e, "failed to listen for ctrl-c");
                std::future::pending::<()>().await;
            },
        }
    });

    server.serve().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_is_well_formed() {
        Args::command().debug_assert();
    }

    #[test]
    fn flags_map_onto_config() {
        let args = Args::parse_from([
            "pairlink-server",
            "--addr",
            "0.0.0.0:9000",
            "--conn-timeout-ms",
            "500",
            "--body-limit",
            "4096",
        ]);
        let config = args.config();

        assert_eq!(config.addr, "0.0.0.0:9000");
        assert_eq!(config.limits.body, 4096);
        assert_eq!(config.limits.timeouts.connection, Duration::from_millis(500));
        assert_eq!(config.limits.timeouts.handle, Duration::from_millis(250));
    }
}
