use anyhow::Context;
use campus_groups::domain::ports::AuthClient;
use campus_groups::utils::logger;
use campus_groups::utils::validation::{self, Validate};
use campus_groups::{
    AppConfig, CliConfig, Command, GroupDirectory, GroupId, GroupsError, RestBackend,
};
use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    let config = AppConfig::from_file(&cli.config)
        .with_context(|| format!("failed to load configuration from {}", cli.config))?;

    if cli.json_logs || config.json_logs() {
        logger::init_json_logger(cli.verbose, config.log_level());
    } else {
        logger::init_cli_logger(cli.verbose, config.log_level());
    }

    tracing::info!("Starting campus-groups");
    if cli.verbose {
        tracing::debug!("Command: {:?}", cli.command);
    }

    if let Err(e) = start(&cli, &config).await {
        tracing::error!(
            "❌ {} (Category: {:?}, Severity: {:?}, retryable: {})",
            e,
            e.category(),
            e.severity(),
            e.is_retryable()
        );
        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 {}", e.recovery_suggestion());
        std::process::exit(e.exit_code());
    }

    Ok(())
}

/// Validates the config, builds the backend and runs the command.
async fn start(cli: &CliConfig, config: &AppConfig) -> Result<(), GroupsError> {
    config.validate()?;
    let backend = RestBackend::new(config.backend.clone())?;
    let directory = GroupDirectory::with_settings(backend, config.directory_settings());
    run(cli, &directory).await
}

async fn run(
    cli: &CliConfig,
    directory: &GroupDirectory<RestBackend>,
) -> Result<(), GroupsError> {
    let signed_in = match &cli.email {
        Some(email) => {
            let password = validation::validate_required_field("password", &cli.password)?;
            directory
                .backend()
                .sign_in_with_password(email, password)
                .await?;
            true
        }
        None => false,
    };

    let outcome = execute(cli, directory).await;

    if signed_in {
        if let Err(e) = directory.backend().sign_out().await {
            tracing::warn!("Sign-out failed: {}", e);
        }
    }

    let output = outcome?;
    println!("{}", output);
    Ok(())
}

async fn execute(
    cli: &CliConfig,
    directory: &GroupDirectory<RestBackend>,
) -> Result<String, GroupsError> {
    let output = match &cli.command {
        Command::Discover {
            search,
            page,
            page_size,
        } => {
            let page_size = page_size.unwrap_or(directory.settings().default_page_size);
            let envelope = directory.discover_groups(search, *page, page_size).await?;
            serde_json::to_string_pretty(&envelope)?
        }
        Command::MyGroups => {
            let groups = directory.my_groups().await?;
            serde_json::to_string_pretty(&groups)?
        }
        Command::RequestJoin { group_id } => {
            let membership = directory.request_to_join(GroupId(*group_id)).await?;
            serde_json::to_string_pretty(&membership)?
        }
    };
    Ok(output)
}
