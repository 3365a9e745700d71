use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(name = "staffio")]
#[command(about = "Staff directory and OAuth credential store administration")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to the TOML config file
    #[arg(short, long, global = true, env = "STAFFIO_CONFIG")]
    pub config: Option<String>,

    /// Output format
    #[arg(short, long, global = true, default_value = "table")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, ValueEnum, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Apply the embedded database migrations
    Migrate,
    /// Check database and directory connectivity
    Check,
    /// Delete expired authorization codes and access tokens
    Purge,
    /// Manage OAuth clients
    Client(ClientArgs),
    /// Show the configured scopes
    Scopes,
    /// Change or reset a staff password on every directory source
    Password(PasswordArgs),
    /// Verify a staff member's credentials
    Authenticate(AuthenticateArgs),
    /// Look up a staff member
    Staff(StaffArgs),
    /// Print the effective configuration
    Config,
}

#[derive(clap::Args, Debug)]
pub struct ClientArgs {
    #[command(subcommand)]
    pub command: ClientCommands,
}

#[derive(Subcommand, Debug)]
pub enum ClientCommands {
    /// List registered clients
    List(ClientListArgs),
    /// Show one client by its public code
    Show(ClientShowArgs),
    /// Register a new client
    Add(ClientAddArgs),
}

#[derive(clap::Args, Debug)]
pub struct ClientListArgs {
    /// Page size
    #[arg(long, default_value_t = 20)]
    pub limit: i64,
    /// Rows to skip
    #[arg(long, default_value_t = 0)]
    pub offset: i64,
    /// Sort key (id or created), prefix with '-' for descending
    #[arg(long, allow_hyphen_values = true)]
    pub sort: Vec<String>,
}

#[derive(clap::Args, Debug)]
pub struct ClientShowArgs {
    /// Public client code
    pub code: String,
}

#[derive(clap::Args, Debug)]
pub struct ClientAddArgs {
    /// Display name
    #[arg(long)]
    pub name: String,
    /// Public client code
    #[arg(long)]
    pub code: String,
    /// Client secret
    #[arg(long, env = "STAFFIO_CLIENT_SECRET", hide_env_values = true)]
    pub secret: String,
    /// Registered redirect URI
    #[arg(long)]
    pub redirect_uri: String,
    /// Allowed grant types
    #[arg(long = "grant-type", default_values_t = [String::from("authorization_code"), String::from("refresh_token")])]
    pub grant_types: Vec<String>,
    /// Allowed response types
    #[arg(long = "response-type", default_values_t = [String::from("code")])]
    pub response_types: Vec<String>,
    /// Allowed scopes
    #[arg(long = "scope")]
    pub scopes: Vec<String>,
}

#[derive(clap::Args, Debug)]
pub struct PasswordArgs {
    #[command(subcommand)]
    pub command: PasswordCommands,
}

#[derive(Subcommand, Debug)]
pub enum PasswordCommands {
    /// Change a password, binding as the user with the old one
    Change(PasswordChangeArgs),
    /// Reset a password with the administrative identity
    Reset(PasswordResetArgs),
}

#[derive(clap::Args, Debug)]
pub struct PasswordChangeArgs {
    /// Staff uid
    pub uid: String,
    /// Current password
    #[arg(long, env = "STAFFIO_OLD_PASSWORD", hide_env_values = true)]
    pub old_password: String,
    /// New password
    #[arg(long, env = "STAFFIO_NEW_PASSWORD", hide_env_values = true)]
    pub new_password: String,
}

#[derive(clap::Args, Debug)]
pub struct PasswordResetArgs {
    /// Staff uid
    pub uid: String,
    /// New password
    #[arg(long, env = "STAFFIO_NEW_PASSWORD", hide_env_values = true)]
    pub new_password: String,
}

#[derive(clap::Args, Debug)]
pub struct AuthenticateArgs {
    /// Staff uid
    pub uid: String,
    /// Password
    #[arg(long, env = "STAFFIO_PASSWORD", hide_env_values = true)]
    pub password: String,
}

#[derive(clap::Args, Debug)]
pub struct StaffArgs {
    /// Staff uid, or a full DN with --dn
    pub key: String,
    /// Treat the key as a distinguished name
    #[arg(long)]
    pub dn: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_client_list_sorting() {
        let cli = Cli::try_parse_from([
            "staffio", "client", "list", "--limit", "5", "--sort", "-created", "--sort", "id",
        ])
        .unwrap();
        let Commands::Client(ClientArgs {
            command: ClientCommands::List(args),
        }) = cli.command
        else {
            panic!("expected client list");
        };
        assert_eq!(args.limit, 5);
        assert_eq!(args.offset, 0);
        assert_eq!(args.sort, vec!["-created".to_string(), "id".to_string()]);
    }

    #[test]
    fn test_parse_client_add_defaults() {
        let cli = Cli::try_parse_from([
            "staffio",
            "client",
            "add",
            "--name",
            "Wiki",
            "--code",
            "wiki",
            "--secret",
            "s3cret",
            "--redirect-uri",
            "https://wiki.example.org/cb",
            "--scope",
            "basic",
        ])
        .unwrap();
        let Commands::Client(ClientArgs {
            command: ClientCommands::Add(args),
        }) = cli.command
        else {
            panic!("expected client add");
        };
        assert_eq!(args.grant_types, vec!["authorization_code", "refresh_token"]);
        assert_eq!(args.response_types, vec!["code"]);
        assert_eq!(args.scopes, vec!["basic"]);
    }

    #[test]
    fn test_parse_password_reset() {
        let cli = Cli::try_parse_from([
            "staffio",
            "--format",
            "json",
            "password",
            "reset",
            "bob",
            "--new-password",
            "fresh",
        ])
        .unwrap();
        assert_eq!(cli.format, OutputFormat::Json);
        let Commands::Password(PasswordArgs {
            command: PasswordCommands::Reset(args),
        }) = cli.command
        else {
            panic!("expected password reset");
        };
        assert_eq!(args.uid, "bob");
        assert_eq!(args.new_password, "fresh");
    }
}
