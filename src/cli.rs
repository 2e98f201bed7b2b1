/// CLI argument parsing

use clap::{Args, Parser, Subcommand, ValueEnum};

use bandada_group::core::Provenance;

// Build timestamp injected at compile time
pub const VERSION_WITH_BUILD: &str = concat!(env!("CARGO_PKG_VERSION"), " (built: ", env!("BUILD_TIMESTAMP"), ")");

#[derive(Parser)]
#[command(name = "bandada-group")]
#[command(author, version = VERSION_WITH_BUILD, about, long_about = None)]
pub struct Cli {
    /// Off-chain API base URL (overrides config and BANDADA_API_URL)
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// JSON-RPC endpoint for on-chain groups (overrides config and BANDADA_RPC_URL)
    #[arg(long, global = true)]
    pub rpc_url: Option<String>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

/// Selects the group a command works on
#[derive(Args, Debug, Clone)]
pub struct GroupArgs {
    /// Group id
    pub group_id: String,

    /// Where the group lives: on-chain (read-only) or off-chain
    #[arg(long = "type", default_value = "off-chain")]
    pub group_type: Provenance,
}

/// Skip interactive confirmation
#[derive(Args, Debug, Clone, Copy)]
pub struct ConfirmArgs {
    /// Answer yes to confirmation prompts
    #[arg(short, long)]
    pub yes: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show a group and its members
    Show {
        #[command(flatten)]
        group: GroupArgs,

        /// Only list members whose id contains this text (case-insensitive)
        #[arg(short, long, default_value = "")]
        search: String,
    },

    /// Add a member to an off-chain group
    AddMember {
        #[command(flatten)]
        group: GroupArgs,

        /// Member id (identity commitment)
        member_id: String,
    },

    /// Remove a member from an off-chain group
    RemoveMember {
        #[command(flatten)]
        group: GroupArgs,

        member_id: String,

        #[command(flatten)]
        confirm: ConfirmArgs,
    },

    /// Enable or disable API key access for an off-chain group
    ApiAccess {
        #[command(flatten)]
        group: GroupArgs,

        state: Toggle,
    },

    /// Generate a new API key
    RotateKey {
        #[command(flatten)]
        group: GroupArgs,

        #[command(flatten)]
        confirm: ConfirmArgs,
    },

    /// Delete an off-chain group
    RemoveGroup {
        #[command(flatten)]
        group: GroupArgs,

        /// Group name, typed exactly
        #[arg(long)]
        confirm_name: String,

        #[command(flatten)]
        confirm: ConfirmArgs,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toggle {
    On,
    Off,
}

impl Toggle {
    pub fn enabled(self) -> bool {
        self == Toggle::On
    }
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// View configuration
    Show,

    /// Set a configuration value
    Set {
        key: ConfigKey,
        value: String,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigKey {
    ApiUrl,
    RpcUrl,
    SemaphoreAddress,
    StartBlock,
    SessionCookie,
    RequestTimeoutSecs,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_remove_group() {
        let cli = Cli::try_parse_from([
            "bandada-group",
            "remove-group",
            "g1",
            "--confirm-name",
            "My Group",
            "--yes",
        ])
        .unwrap();

        match cli.command {
            Commands::RemoveGroup {
                group,
                confirm_name,
                confirm,
            } => {
                assert_eq!(group.group_id, "g1");
                assert_eq!(group.group_type, Provenance::OffChain);
                assert_eq!(confirm_name, "My Group");
                assert!(confirm.yes);
            }
            _ => panic!("expected remove-group"),
        }
    }

    #[test]
    fn test_parse_group_type() {
        let cli = Cli::try_parse_from(["bandada-group", "show", "42", "--type", "on-chain"]).unwrap();
        match cli.command {
            Commands::Show { group, search } => {
                assert_eq!(group.group_type, Provenance::OnChain);
                assert_eq!(search, "");
            }
            _ => panic!("expected show"),
        }

        assert!(Cli::try_parse_from(["bandada-group", "show", "42", "--type", "chain"]).is_err());
    }

    #[test]
    fn test_parse_api_access() {
        let cli = Cli::try_parse_from(["bandada-group", "api-access", "g1", "on"]).unwrap();
        match cli.command {
            Commands::ApiAccess { state, .. } => assert!(state.enabled()),
            _ => panic!("expected api-access"),
        }
    }
}
