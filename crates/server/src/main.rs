use std::net::ToSocketAddrs;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use tidedb_common::{DEFAULT_HOST, DEFAULT_PORT, DEFAULT_TICK_MS, MAX_CONNECTIONS};
use tidedb_server::{Dispatcher, Server, ServerConfig};

#[derive(Parser, Debug)]
#[command(name = "tidedb-server", about = "TideDB: in-memory data store")]
struct Args {
    #[arg(long, default_value = DEFAULT_HOST)]
    host: String,
    #[arg(long, default_value_t = DEFAULT_PORT)]
    port: u16,
    #[arg(long, default_value_t = MAX_CONNECTIONS)]
    max_connections: usize,
    /// Espera máxima do event loop entre ticks, em milissegundos
    #[arg(long, default_value_t = DEFAULT_TICK_MS, value_parser = clap::value_parser!(u64).range(1..))]
    tick_ms: u64,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tidedb_server=info".into()),
        )
        .init();

    let args = Args::parse();
    let addr = (args.host.as_str(), args.port)
        .to_socket_addrs()
        .with_context(|| format!("endereço inválido: {}:{}", args.host, args.port))?
        .next()
        .with_context(|| format!("nenhum endereço para {}", args.host))?;

    let config = ServerConfig {
        addr,
        max_connections: args.max_connections,
        tick: Duration::from_millis(args.tick_ms),
        ..ServerConfig::default()
    };

    let mut server = Server::bind(config, Dispatcher::new())
        .with_context(|| format!("falha ao escutar em {addr}"))?;
    info!("TideDB escutando em {}", server.local_addr()?);

    server.run()?;
    Ok(())
}
