use std::{net::SocketAddr, path::Path, sync::Arc};

use clap::Parser;
use color_eyre::{
    Result,
    eyre::{Context, eyre},
};
use decoy::{
    adapters::{StubHandler, build_router},
    config::{ServerConfig, ServerConfigValidator, load_config, load_config_or_default},
    core::{EndpointRegistry, HistoryLog},
    tracing_setup,
    utils::GracefulShutdown,
};

#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    #[clap(subcommand)]
    command: Option<Commands>,

    #[clap(short, long, default_value = "decoy.toml")]
    config: String,

    /// Listen port, overriding the configured address
    #[clap(short, long)]
    port: Option<u16>,
}

#[derive(Parser, Debug)]
enum Commands {
    /// Start the stub server (default)
    Serve {
        /// Configuration file to use
        #[clap(short, long, default_value = "decoy.toml")]
        config: String,
        /// Listen port, overriding the configured address
        #[clap(short, long)]
        port: Option<u16>,
    },
    /// Validate configuration file
    Validate {
        /// Configuration file to validate
        #[clap(short, long, default_value = "decoy.toml")]
        config: String,
    },
    /// Initialize a new configuration file
    Init {
        /// Output path for the new config file
        #[clap(short, long, default_value = "decoy.toml")]
        config: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let args = Args::parse();

    // Determine the command to run
    let (command, config_path, port) = match args.command {
        Some(Commands::Serve { config, port }) => ("serve", config, port.or(args.port)),
        Some(Commands::Validate { config }) => ("validate", config, None),
        Some(Commands::Init { config }) => ("init", config, None),
        None => ("serve", args.config, args.port),
    };

    match command {
        "validate" => {
            return validate_config_command(&config_path);
        }
        "init" => {
            return init_config_command(&config_path).await;
        }
        "serve" => {
            // Continue with normal server startup
        }
        _ => unreachable!(),
    }

    tracing_setup::init_tracing().context("Failed to initialize tracing")?;

    tracing::info!("Loading configuration from {config_path}");
    let mut config = load_config_or_default(&config_path)
        .with_context(|| format!("Failed to load config from {config_path}"))?;
    if let Some(port) = port {
        config = config.with_port(port);
    }
    ServerConfigValidator::validate(&config).map_err(|e| eyre!("Invalid configuration:\n{e}"))?;

    serve(config).await
}

async fn serve(config: ServerConfig) -> Result<()> {
    let registry = Arc::new(EndpointRegistry::new(config.registry_ttl));
    let history = Arc::new(HistoryLog::new(config.history_ttl));
    let handler = Arc::new(StubHandler::new(registry.clone(), history.clone()));

    // Background eviction sweep for both stores
    let sweep_registry = registry.clone();
    let sweep_history = history.clone();
    let sweep_interval = config.sweep_interval;
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(sweep_interval);
        loop {
            tick.tick().await;
            sweep_registry.evict_expired().await;
            sweep_history.evict_expired().await;
        }
    });

    // Start signal handler for graceful shutdown
    let graceful_shutdown = Arc::new(GracefulShutdown::new());
    let signal_handler_shutdown = graceful_shutdown.clone();
    tokio::spawn(async move {
        signal_handler_shutdown.run_signal_handler().await;
    });

    let addr: SocketAddr = config
        .listen_addr
        .parse()
        .context("Failed to parse listen address")?;

    let app = build_router(handler);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    tracing::info!(
        "Decoy stub server listening on {} (registry TTL: {}, history TTL: {})",
        addr,
        humantime::format_duration(config.registry_ttl),
        humantime::format_duration(config.history_ttl)
    );
    println!("Decoy stub server listening on {addr}");

    tokio::select! {
        result = axum::serve(listener, app) => {
            result.context("Server error")
        }
        shutdown_reason = graceful_shutdown.wait_for_shutdown_signal() => {
            tracing::info!("Shutdown signal received: {:?}", shutdown_reason);
            Ok(())
        }
    }
}

/// Validate configuration file and exit
fn validate_config_command(config_path: &str) -> Result<()> {
    println!("🔍 Validating configuration file: {config_path}");

    if !Path::new(config_path).exists() {
        eprintln!("❌ Error: Configuration file '{config_path}' not found");
        std::process::exit(1);
    }

    let config = match load_config(config_path) {
        Ok(config) => {
            println!("✅ Configuration parsing: OK");
            config
        }
        Err(e) => {
            eprintln!("❌ Configuration parsing failed:");
            eprintln!("   {e}");
            std::process::exit(1);
        }
    };

    match ServerConfigValidator::validate(&config) {
        Ok(()) => {
            println!("✅ Configuration validation: OK");
            println!();
            println!("📋 Configuration Summary:");
            println!("   • Listen Address: {}", config.listen_addr);
            println!(
                "   • Registry TTL: {}",
                humantime::format_duration(config.registry_ttl)
            );
            println!(
                "   • History TTL: {}",
                humantime::format_duration(config.history_ttl)
            );
            println!(
                "   • Sweep Interval: {}",
                humantime::format_duration(config.sweep_interval)
            );
            Ok(())
        }
        Err(e) => {
            eprintln!("❌ Configuration validation failed:");
            eprintln!("{e}");
            println!();
            println!("💡 Common fixes:");
            println!("   • Verify listen address format (e.g., '127.0.0.1:3000')");
            println!("   • Durations use humantime units (e.g., '5m', '10s')");
            std::process::exit(1);
        }
    }
}

/// Initialize a new configuration file
async fn init_config_command(config_path: &str) -> Result<()> {
    let path = Path::new(config_path);
    if path.exists() {
        eprintln!("❌ Error: Configuration file '{config_path}' already exists");
        std::process::exit(1);
    }

    let default_config = r#"# Decoy Stub Server Configuration

# The address to listen on
listen_addr = "127.0.0.1:3000"

# How long a registered endpoint lives without being replaced or consumed
registry_ttl = "5m"

# How long a recorded request stays in the history window
history_ttl = "10s"

# Interval between background eviction sweeps
sweep_interval = "30s"
"#;

    tokio::fs::write(path, default_config)
        .await
        .context("Failed to write config file")?;
    println!("✅ Created default configuration at: {config_path}");
    println!("   Run 'decoy serve --config {config_path}' to start the server");
    Ok(())
}
