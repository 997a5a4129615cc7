use std::io;

use anyhow::Context;
use cacheport::cli::{self, Args, Command};
use clap::Parser;
use tokio::io::{stdin, stdout, BufReader};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    cli::validate(&args)?;
    let cache = cli::open(&args)
        .await
        .with_context(|| format!("failed to open cache at {}", args.addr))?;

    match args.command {
        Command::Interactive => {
            cli::interactive(cache.as_ref(), args.json, BufReader::new(stdin()), stdout()).await
        }
        Command::Op(op) => {
            let outcome = cli::run(cache.as_ref(), op).await?;
            println!("{}", outcome.render(args.json)?);
            Ok(())
        }
    }
}
