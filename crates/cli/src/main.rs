mod client;
mod format;

use std::io::{self, Write};

use clap::Parser;

use tidedb_common::{DEFAULT_HOST, DEFAULT_PORT};

use crate::client::Client;
use crate::format::{format_frame, tokenize};

#[derive(Parser, Debug)]
#[command(name = "tidedb-cli", about = "TideDB CLI client")]
struct Args {
    #[arg(long, default_value = DEFAULT_HOST)]
    host: String,
    #[arg(long, short, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Comando para executar diretamente (modo não interativo)
    #[arg(trailing_var_arg = true)]
    command: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let addr = format!("{}:{}", args.host, args.port);
    let mut client = Client::connect(&addr).await?;

    // Modo comando único (via argumentos)
    if !args.command.is_empty() {
        let response = client.request(&args.command).await?;
        println!("{}", format_frame(&response));
        return Ok(());
    }

    let stdin = io::stdin();
    let mut input = String::new();

    loop {
        print!("{addr}> ");
        io::stdout().flush()?;

        input.clear();
        if stdin.read_line(&mut input)? == 0 {
            break; // EOF
        }

        let line = input.trim();
        if line.eq_ignore_ascii_case("quit") || line.eq_ignore_ascii_case("exit") {
            break;
        }

        let tokens = tokenize(line);
        if tokens.is_empty() {
            continue;
        }

        match client.request(&tokens).await {
            Ok(response) => println!("{}", format_frame(&response)),
            Err(e) => {
                // conexão perdida ou fechada por erro de protocolo
                println!("(error) {e}");
                break;
            }
        }
    }

    Ok(())
}
