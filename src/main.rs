use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use poseidon_deploy::config::AppConfig;
use poseidon_deploy::deploy::{AbortHandle, PollOptions, poll_deployment, run_deploy};
use poseidon_deploy::providers::HostingProvider;
use poseidon_deploy::server::{self, AppState};
use poseidon_deploy::shared::{DeployRequest, DeploymentRef, EnvVar, Framework, ProviderKind};

#[derive(Parser)]
#[command(name = "poseidon-deploy")]
#[command(about = "Deploy GitHub repositories to Vercel or Render with automatic retry")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the deployment HTTP API
    Serve,
    /// Deploy a repository once and print the result as JSON
    Deploy {
        /// Hosting provider (vercel or render)
        #[arg(long, default_value = "vercel")]
        provider: ProviderKind,

        /// Repository in owner/name format (bare names use GITHUB_USERNAME)
        repository: String,

        #[arg(long)]
        branch: Option<String>,

        /// Project or service name (defaults to the repository name)
        #[arg(long)]
        name: Option<String>,

        /// Sub-directory holding the app's package.json
        #[arg(long)]
        root_directory: Option<String>,

        /// Framework preset; auto-detected when omitted
        #[arg(long)]
        framework: Option<Framework>,

        /// Environment variables as KEY=VALUE
        #[arg(long = "env", value_name = "KEY=VALUE")]
        env: Vec<String>,

        /// Only try the requested configuration
        #[arg(long)]
        no_retry: bool,

        /// Follow the deployment until it finishes
        #[arg(long)]
        wait: bool,
    },
    /// Follow an existing deployment until it finishes
    Watch {
        #[arg(long, default_value = "vercel")]
        provider: ProviderKind,

        deployment_id: String,

        /// Owning service (required for Render)
        #[arg(long)]
        service_id: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "poseidon_deploy=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = AppConfig::from_env()?;

    match cli.command {
        Command::Serve => {
            tracing::info!(listen_addr = %config.listen_addr, "Starting Poseidon Deploy");
            server::run(config).await?;
        }
        Command::Deploy {
            provider,
            repository,
            branch,
            name,
            root_directory,
            framework,
            env,
            no_retry,
            wait,
        } => {
            let state = AppState::from_config(&config);
            let client = state.provider(provider)?;

            let request = DeployRequest {
                project_name: name,
                branch,
                root_directory,
                framework,
                environment_variables: parse_env_args(&env)?,
                enable_retry: !no_retry,
                ..DeployRequest::new(config.github.qualify_repository(&repository))
            };

            let result = run_deploy(state.github.as_ref(), client.as_ref(), &request).await?;
            println!("{}", serde_json::to_string_pretty(&result)?);

            if wait {
                let deployment =
                    DeploymentRef::with_service(&result.deployment_id, &result.project_id);
                watch(client, deployment).await?;
            }
        }
        Command::Watch {
            provider,
            deployment_id,
            service_id,
        } => {
            let client = AppState::from_config(&config).provider(provider)?;
            let deployment = DeploymentRef {
                id: deployment_id,
                service_id,
            };
            watch(client, deployment).await?;
        }
    }

    Ok(())
}

/// Poll until the deployment finishes; Ctrl-C aborts
async fn watch(provider: Arc<dyn HostingProvider>, deployment: DeploymentRef) -> anyhow::Result<()> {
    let (handle, signal) = AbortHandle::channel();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            handle.abort();
        }
    });

    let mut last_status = String::new();
    let finished = poll_deployment(
        provider.as_ref(),
        &deployment,
        PollOptions::for_provider(provider.as_ref()),
        |current| {
            if current.status != last_status {
                eprintln!("{}: {}", current.id, current.status);
                last_status = current.status.clone();
            }
        },
        signal,
    )
    .await?;

    println!("{}", serde_json::to_string_pretty(&finished)?);
    Ok(())
}

fn parse_env_args(args: &[String]) -> anyhow::Result<Vec<EnvVar>> {
    args.iter()
        .map(|arg| {
            let (key, value) = arg
                .split_once('=')
                .ok_or_else(|| anyhow::anyhow!("Invalid --env '{}', expected KEY=VALUE", arg))?;
            Ok(EnvVar::new(key, value))
        })
        .collect()
}
