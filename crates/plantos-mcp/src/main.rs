//! Plantos MCP Server - Entry Point
//!
//! Usage:
//!   plantos-mcp                         # Serve over stdio (what hosts spawn)
//!   plantos-mcp serve -t http -p 8080   # Serve over HTTP
//!   plantos-mcp login                   # Device flow, prints a local config snippet
//!   plantos-mcp login -f remote --server-url URL
//!   plantos-mcp tools                   # Print the tool catalog

use anyhow::Result;
use argh::FromArgs;
use plantos_mcp::cli::{LoginCommand, ServeCommand, ToolsCommand};
use tokio::sync::watch;

/// Plantos MCP Server - Agricultural intelligence for AI assistants
#[derive(FromArgs)]
struct Args {
    /// show version information
    #[argh(switch, short = 'V')]
    version: bool,

    #[argh(subcommand)]
    command: Option<Command>,
}

#[derive(FromArgs)]
#[argh(subcommand)]
enum Command {
    Serve(ServeCommand),
    Login(LoginCommand),
    Tools(ToolsCommand),
}

async fn serve(cmd: ServeCommand) -> Result<()> {
    let (shutdown_tx, shutdown_rx) = watch::channel(());

    ctrlc::set_handler(move || {
        log::info!("Received Ctrl+C, shutting down gracefully...");
        shutdown_tx.send(()).ok();
    })?;

    cmd.run(shutdown_rx).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args: Args = argh::from_env();

    if args.version {
        println!("plantos-mcp {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    // stdout carries the MCP protocol in stdio mode, so logs always go to stderr
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    match args.command {
        None => serve(ServeCommand::default()).await?,
        Some(Command::Serve(cmd)) => serve(cmd).await?,
        Some(Command::Login(cmd)) => cmd.run().await?,
        Some(Command::Tools(cmd)) => cmd.run()?,
    }

    Ok(())
}
