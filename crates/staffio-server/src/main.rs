use clap::Parser;

use staffio_server::cli::{
    Cli, ClientArgs, ClientCommands, Commands, OutputFormat, PasswordArgs, PasswordCommands,
};
use staffio_server::commands::{client, database, directory};
use staffio_server::config::{AppConfig, DEFAULT_CONFIG_PATH, loader::load_config};
use staffio_server::observability;
use staffio_server::output::{print_error, print_json};

/// How the configuration path was determined.
#[derive(Debug, Clone, Copy)]
enum ConfigSource {
    /// From --config CLI argument
    CliArgument,
    /// From STAFFIO_CONFIG environment variable
    EnvironmentVariable,
    /// Default path (staffio.toml), optional
    Default,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CliArgument => write!(f, "CLI argument (--config)"),
            Self::EnvironmentVariable => write!(f, "environment variable (STAFFIO_CONFIG)"),
            Self::Default => write!(f, "default"),
        }
    }
}

#[tokio::main]
async fn main() {
    if let Err(e) = dotenvy::dotenv() {
        // .env is optional
        if !matches!(e, dotenvy::Error::Io(ref io_err) if io_err.kind() == std::io::ErrorKind::NotFound)
        {
            eprintln!("Warning: Failed to load .env file: {e}");
        }
    }

    observability::init_tracing_with_level("warn");

    let cli = Cli::parse();
    let source = config_source(&cli);
    let cfg = match load_config(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            print_error(&format!("Configuration error: {e}"));
            std::process::exit(2);
        }
    };
    tracing::debug!(
        path = cli.config.as_deref().unwrap_or(DEFAULT_CONFIG_PATH),
        source = %source,
        "Configuration loaded"
    );
    observability::apply_logging_level(&cfg.logging.level);

    if let Err(e) = run(&cli, &cfg).await {
        print_error(&format!("{e:#}"));
        std::process::exit(1);
    }
}

fn config_source(cli: &Cli) -> ConfigSource {
    match &cli.config {
        None => ConfigSource::Default,
        Some(path) if std::env::var("STAFFIO_CONFIG").is_ok_and(|env| &env == path) => {
            ConfigSource::EnvironmentVariable
        }
        Some(_) => ConfigSource::CliArgument,
    }
}

async fn run(cli: &Cli, cfg: &AppConfig) -> anyhow::Result<()> {
    let format = cli.format;
    match &cli.command {
        Commands::Migrate => database::migrate(cfg).await,
        Commands::Check => database::check(cfg).await,
        Commands::Purge => database::purge(cfg).await,
        Commands::Scopes => database::scopes(cfg, format).await,
        Commands::Client(ClientArgs { command }) => match command {
            ClientCommands::List(args) => client::list(cfg, args, format).await,
            ClientCommands::Show(args) => client::show(cfg, &args.code, format).await,
            ClientCommands::Add(args) => client::add(cfg, args, format).await,
        },
        Commands::Password(PasswordArgs { command }) => match command {
            PasswordCommands::Change(args) => directory::password_change(cfg, args).await,
            PasswordCommands::Reset(args) => directory::password_reset(cfg, args).await,
        },
        Commands::Authenticate(args) => directory::authenticate(cfg, args, format).await,
        Commands::Staff(args) => directory::staff(cfg, args, format).await,
        Commands::Config => {
            let shown = cfg.redacted();
            match format {
                OutputFormat::Json => print_json(&shown),
                OutputFormat::Table => {
                    println!("{}", toml::to_string_pretty(&shown)?);
                    Ok(())
                }
            }
        }
    }
}
