mod cli;

use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use bandada_group::core::{
    ApiClient, AutoConfirm, ConfirmationGate, GroupApi, GroupGateway, GroupSession,
    GroupView, MutationOutcome, Navigation, OnchainReader, Provenance, Reconciliation,
    RemovalOutcome, RouteContext, TerminalGate,
};
use bandada_group::utils::{format_timestamp, mask_sensitive, AppConfig};
use cli::{Cli, Commands, ConfigCommands, ConfigKey, ConfirmArgs, GroupArgs};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = AppConfig::load()?;
    if let Some(url) = cli.api_url.clone() {
        config.api_url = url;
    }
    if let Some(url) = cli.rpc_url.clone() {
        config.rpc_url = url;
    }

    match cli.command {
        Commands::Show { group, search } => handle_show(&config, &group, &search).await,
        Commands::AddMember { group, member_id } => {
            handle_add_member(&config, &group, member_id).await
        }
        Commands::RemoveMember {
            group,
            member_id,
            confirm,
        } => handle_remove_member(&config, &group, &member_id, confirm).await,
        Commands::ApiAccess { group, state } => {
            handle_api_access(&config, &group, state.enabled()).await
        }
        Commands::RotateKey { group, confirm } => handle_rotate_key(&config, &group, confirm).await,
        Commands::RemoveGroup {
            group,
            confirm_name,
            confirm,
        } => handle_remove_group(&config, &group, &confirm_name, confirm).await,
        Commands::Config { command } => handle_config(command),
    }
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };

    let filter = if verbose == 0 {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
    } else {
        EnvFilter::new(default_level)
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Off-chain client plus the gateway selected by the route
struct Backend {
    gateway: GroupGateway,
    api: Option<Arc<ApiClient>>,
}

fn backend(config: &AppConfig, provenance: Provenance) -> Result<Backend> {
    match provenance {
        Provenance::OnChain => {
            let reader = OnchainReader::new(
                &config.rpc_url,
                &config.semaphore_address,
                config.start_block,
            )?;
            Ok(Backend {
                gateway: GroupGateway::OnChain(Arc::new(reader)),
                api: None,
            })
        }
        Provenance::OffChain => {
            let api = Arc::new(ApiClient::new(
                &config.api_url,
                config.session_cookie.clone(),
                Duration::from_secs(config.request_timeout_secs),
            )?);
            Ok(Backend {
                gateway: GroupGateway::OffChain(api.clone()),
                api: Some(api),
            })
        }
    }
}

fn route(args: &GroupArgs) -> RouteContext {
    RouteContext::new(args.group_id.clone(), args.group_type)
}

fn gate(args: ConfirmArgs) -> Box<dyn ConfirmationGate> {
    if args.yes {
        Box::new(AutoConfirm)
    } else {
        Box::new(TerminalGate)
    }
}

/// Show a spinner while a request is pending
async fn pending<F: Future>(message: &str, fut: F) -> F::Output {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(100));

    let output = fut.await;
    spinner.finish_and_clear();
    output
}

async fn open_session(config: &AppConfig, args: &GroupArgs) -> Result<(GroupSession, Backend)> {
    let backend = backend(config, route(args).provenance)?;
    let session = pending(
        "Loading group...",
        GroupSession::open(route(args), backend.gateway.clone()),
    )
    .await?;
    Ok((session, backend))
}

fn require_off_chain(session: &GroupSession) -> Result<()> {
    if session.provenance() == Provenance::OnChain {
        bail!("On-chain groups are read-only from this client");
    }
    Ok(())
}

fn report(outcome: MutationOutcome, action: &str) -> Result<()> {
    match outcome {
        MutationOutcome::Applied(Reconciliation::ServerConfirmed) => {
            println!("{} {}", "✓".green(), action);
        }
        MutationOutcome::Applied(Reconciliation::LocalOnly) => {
            println!("{} {} (local copy updated)", "✓".green(), action);
        }
        MutationOutcome::Declined => println!("Cancelled"),
        MutationOutcome::Failed => bail!("{} failed, nothing was changed", action),
        MutationOutcome::Discarded => {
            println!("{} {}: response arrived too late and was ignored", "⚠".yellow(), action);
        }
    }
    Ok(())
}

fn print_view(view: &GroupView) {
    println!("{}", view.name.bold());
    if let Some(description) = &view.description {
        println!("{}", description.dimmed());
    }
    println!();

    println!("{:<14} {}", "Group ID:", view.id);
    println!("{:<14} {}", "Type:", view.provenance);
    if let Some(created_at) = view.created_at {
        println!("{:<14} {}", "Created:", format_timestamp(created_at));
    }
    println!("{:<14} {}", "Members:", view.member_count_display);
    println!("{:<14} {}", "Max capacity:", view.capacity_display);
    println!("{:<14} {}", "Tree depth:", view.tree_depth);

    if view.show_api_panel {
        println!();
        let state = if view.api_enabled {
            "enabled".green()
        } else {
            "disabled".red()
        };
        println!("{:<14} {}", "API access:", state);
        if view.api_enabled {
            println!("{:<14} {}", "API key:", view.clipboard);
        }
    }

    println!();
    if view.member_count == 0 {
        println!("No members in the group yet.");
    } else if view.members.is_empty() {
        println!("No members match the search.");
    } else {
        for row in &view.members {
            println!("  {}", row.display);
        }
    }
}

async fn finish(session: GroupSession) -> Result<()> {
    let view = session.view("").await?;
    println!();
    print_view(&view);
    session.close().await;
    Ok(())
}

async fn handle_show(config: &AppConfig, args: &GroupArgs, search: &str) -> Result<()> {
    let (session, _backend) = open_session(config, args).await?;
    let view = session.view(search).await?;
    print_view(&view);
    session.close().await;
    Ok(())
}

/// Persist the member through the API, then hand the server's answer to the
/// controller. A failed request is a cancelled sub-flow.
async fn handle_add_member(config: &AppConfig, args: &GroupArgs, member_id: String) -> Result<()> {
    let (session, backend) = open_session(config, args).await?;
    require_off_chain(&session)?;

    let api = backend
        .api
        .ok_or_else(|| anyhow!("Off-chain API client not configured"))?;
    let membership = session
        .membership()
        .ok_or_else(|| anyhow!("Members cannot be managed for this group"))?;

    let result = pending("Adding member...", api.add_member(&args.group_id, &member_id)).await;
    match result {
        Ok(ack) => {
            report(membership.reconcile_add(member_id, ack).await, "Member added")?;
            finish(session).await
        }
        Err(e) => {
            eprintln!("{} Failed to add member: {}", "✗".red(), e);
            report(membership.add_member(None).await, "Member added")?;
            bail!("Member was not added")
        }
    }
}

async fn handle_remove_member(
    config: &AppConfig,
    args: &GroupArgs,
    member_id: &str,
    confirm: ConfirmArgs,
) -> Result<()> {
    let (session, _backend) = open_session(config, args).await?;
    require_off_chain(&session)?;

    let membership = session
        .membership()
        .ok_or_else(|| anyhow!("Members cannot be managed for this group"))?;
    let gate = gate(confirm);

    let outcome = membership.remove_member(member_id, gate.as_ref()).await;
    report(outcome, "Member removed")?;
    finish(session).await
}

async fn handle_api_access(config: &AppConfig, args: &GroupArgs, enabled: bool) -> Result<()> {
    let (session, _backend) = open_session(config, args).await?;
    require_off_chain(&session)?;

    let access = session
        .access()
        .await
        .ok_or_else(|| anyhow!("API keys are not available for groups with credentials"))?;

    let outcome = pending("Updating API access...", access.set_api_access(enabled)).await;
    let action = if enabled { "API access enabled" } else { "API access disabled" };
    report(outcome, action)?;
    finish(session).await
}

async fn handle_rotate_key(config: &AppConfig, args: &GroupArgs, confirm: ConfirmArgs) -> Result<()> {
    let (session, _backend) = open_session(config, args).await?;
    require_off_chain(&session)?;

    let access = session
        .access()
        .await
        .ok_or_else(|| anyhow!("API keys are not available for groups with credentials"))?;
    let gate = gate(confirm);

    report(access.regenerate_api_key(gate.as_ref()).await, "New API key generated")?;
    finish(session).await
}

async fn handle_remove_group(
    config: &AppConfig,
    args: &GroupArgs,
    confirm_name: &str,
    confirm: ConfirmArgs,
) -> Result<()> {
    let (session, _backend) = open_session(config, args).await?;
    require_off_chain(&session)?;

    let lifecycle = session
        .lifecycle()
        .await
        .ok_or_else(|| anyhow!("This group cannot be removed from here"))?;

    let armed = lifecycle
        .arm(confirm_name)
        .ok_or_else(|| anyhow!("To remove this group, type its name exactly"))?;
    let gate = gate(confirm);

    match armed.remove_group(gate.as_ref()).await {
        RemovalOutcome::Removed(Navigation::GroupsList) => {
            session.close().await;
            println!("{} Group removed", "✓".green());
            println!("Run `bandada-group show <id>` to open another group.");
            Ok(())
        }
        RemovalOutcome::Declined => {
            println!("Cancelled");
            Ok(())
        }
        RemovalOutcome::Failed => Err(anyhow!("Failed to remove group, nothing was changed")),
    }
}

/// Works on the file itself, without environment or flag overrides
fn handle_config(command: ConfigCommands) -> Result<()> {
    let path = AppConfig::config_path()?;
    let mut config = AppConfig::load_from(&path)?;

    match command {
        ConfigCommands::Show => {
            println!("Configuration ({}):\n", path.display());
            println!("api_url:              {}", config.api_url);
            println!("rpc_url:              {}", config.rpc_url);
            println!("semaphore_address:    {}", config.semaphore_address);
            println!("start_block:          {}", config.start_block);
            println!(
                "session_cookie:       {}",
                config
                    .session_cookie
                    .as_deref()
                    .map(|c| mask_sensitive(c, 4))
                    .unwrap_or_else(|| "<not set>".to_string())
            );
            println!("request_timeout_secs: {}", config.request_timeout_secs);
        }
        ConfigCommands::Set { key, value } => {
            match key {
                ConfigKey::ApiUrl => config.api_url = value,
                ConfigKey::RpcUrl => config.rpc_url = value,
                ConfigKey::SemaphoreAddress => config.semaphore_address = value,
                ConfigKey::StartBlock => {
                    config.start_block = value.parse().context("start_block must be a number")?
                }
                ConfigKey::SessionCookie => config.session_cookie = Some(value),
                ConfigKey::RequestTimeoutSecs => {
                    config.request_timeout_secs = value
                        .parse()
                        .context("request_timeout_secs must be a number")?
                }
            }
            config.save_to(&path)?;
            println!("{} Configuration saved", "✓".green());
        }
    }

    Ok(())
}
