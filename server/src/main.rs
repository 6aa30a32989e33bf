use std::{net::SocketAddr, sync::Arc};

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use platform_authz::ALL_PERMISSIONS;
use platform_obs::{ObsConfig, init_tracing};
use server::{
    bootstrap,
    config::AppConfig,
    http::{self, ServeConfig},
};

#[derive(Parser, Debug)]
#[command(name = "rbac-server", version, about = "RBAC-gated API server")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP server.
    Serve(ServeCommand),
    /// Print the permission catalog as JSON.
    Permissions {
        #[arg(long, help = "Print identifiers without the namespace prefix")]
        unprefixed: bool,
    },
}

#[derive(Args, Debug)]
struct ServeCommand {
    #[arg(long, env = "BIND_ADDR", help = "Overrides the configured bind address")]
    bind: Option<SocketAddr>,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing(ObsConfig::from_env("rbac-server")?)?;
    let cli = Cli::parse();
    match cli.command {
        Command::Serve(cmd) => run_server(cmd).await,
        Command::Permissions { unprefixed } => print_permissions(unprefixed),
    }
}

async fn run_server(cmd: ServeCommand) -> Result<()> {
    let mut config = AppConfig::load()?;
    if let Some(bind) = cmd.bind {
        config.bind_addr = bind;
    }
    let serve_config = ServeConfig::new(config.bind_addr);
    let state = bootstrap(Arc::new(config)).await?;
    http::serve(serve_config, state).await
}

fn print_permissions(unprefixed: bool) -> Result<()> {
    let ids: Vec<String> = ALL_PERMISSIONS
        .iter()
        .map(|perm| {
            if unprefixed {
                perm.unprefixed()
            } else {
                perm.as_str().to_string()
            }
        })
        .collect();
    println!("{}", serde_json::to_string_pretty(&ids)?);
    Ok(())
}
