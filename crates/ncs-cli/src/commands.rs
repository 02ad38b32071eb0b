use anyhow::Context;
use colored::Colorize;

use ncs_server::{NcsServer, ServerConfig};

use crate::cli::*;

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Serve(ref args) => cmd_serve(load_config(&cli)?, args).await,
        Command::Config(ref args) => cmd_config(&cli, args),
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<ServerConfig> {
    match cli.config {
        Some(ref path) => ServerConfig::load(path)
            .with_context(|| format!("failed to load {}", path.display())),
        None => Ok(ServerConfig::default()),
    }
}

fn apply_overrides(mut config: ServerConfig, args: &ServeArgs) -> ServerConfig {
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }
    if let Some(secs) = args.wait_timeout {
        config.wait_timeout_secs = secs;
    }
    if let Some(ref states) = args.states {
        config.states = Some(states.clone());
    }
    config
}

async fn cmd_serve(config: ServerConfig, args: &ServeArgs) -> anyhow::Result<()> {
    let config = apply_overrides(config, args);
    let states = match config.states {
        Some(ref s) => s.join(", "),
        None => "any".into(),
    };
    println!("{} NCS server on {}", "✓".green().bold(), config.bind_addr.to_string().bold());
    let timeout = match config.wait_timeout() {
        Some(d) => format!("{}s", d.as_secs()),
        None => "none".into(),
    };
    println!("  Wait timeout: {}", timeout.cyan());
    println!("  States: {}", states.yellow());

    let server = NcsServer::new(config)?;
    server.serve().await?;
    tracing::info!("server stopped");
    Ok(())
}

fn cmd_config(cli: &Cli, args: &ConfigArgs) -> anyhow::Result<()> {
    let config = if args.defaults {
        ServerConfig::default()
    } else {
        load_config(cli)?
    };
    print!("{}", config.to_toml()?);
    Ok(())
}
