//! App Service tunnel relay
//!
//! Binds a loopback TCP port and relays every accepted connection to the
//! remote debugging tunnel of one App Service app, so a local debugger can
//! attach to the remote process as if it were local.

use std::sync::Arc;

use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use aztunnel_core::RelayConfig;
use aztunnel_core::auth::{AccessTokenProvider, AzureAdTokenProvider, StaticTokenProvider};
use aztunnel_core::target::{AppServiceOs, AppServiceTarget};
use aztunnel_relay::{RelayServerProvider, TunnelStatusClient};

#[derive(Parser, Debug)]
#[command(name = "aztunnel-relay")]
#[command(version, about = "Azure App Service remote-debug tunnel relay")]
struct Args {
    /// App Service resource ID (also the Windows tunnel agent identity)
    #[arg(long, env = "AZTUNNEL_APP_ID")]
    app_id: String,

    /// Hostname of the app's Kudu (SCM) site, e.g. "myapp.scm.azurewebsites.net"
    #[arg(long, env = "AZTUNNEL_KUDU_HOST")]
    kudu_host: String,

    /// Subscription the app belongs to
    #[arg(long, env = "AZTUNNEL_SUBSCRIPTION_ID")]
    subscription_id: String,

    /// Operating system of the App Service plan
    #[arg(long, default_value = "linux", env = "AZTUNNEL_OS")]
    os: String,

    /// Azure AD tenant for client-credential token requests
    #[arg(long, env = "AZTUNNEL_TENANT_ID")]
    tenant_id: Option<String>,

    /// Azure AD application (client) ID
    #[arg(long, env = "AZTUNNEL_CLIENT_ID")]
    client_id: Option<String>,

    /// Azure AD client secret
    #[arg(long, env = "AZTUNNEL_CLIENT_SECRET", hide_env_values = true)]
    client_secret: Option<String>,

    /// Pre-acquired bearer token (skips Azure AD)
    #[arg(long, env = "AZTUNNEL_ACCESS_TOKEN", hide_env_values = true)]
    access_token: Option<String>,

    /// Skip the tunnel readiness probe on Linux targets
    #[arg(long, env = "AZTUNNEL_SKIP_READINESS_PROBE")]
    skip_readiness_probe: bool,

    /// Log level filter (e.g. "info", "debug", "warn")
    #[arg(long, default_value = "info", env = "AZTUNNEL_LOG_LEVEL")]
    log_level: String,

    /// Output logs as JSON (for structured log aggregation)
    #[arg(long, env = "AZTUNNEL_LOG_JSON")]
    log_json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let env_filter = tracing_subscriber::EnvFilter::new(std::env::var("RUST_LOG").unwrap_or_else(
        |_| format!("aztunnel_relay={0},aztunnel_core={0}", args.log_level),
    ));
    if args.log_json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    info!(
        version = env!("CARGO_PKG_VERSION"),
        app_id = %args.app_id,
        kudu_host = %args.kudu_host,
        "Starting aztunnel-relay"
    );

    let os: AppServiceOs = args.os.parse()?;
    let target = AppServiceTarget::new(args.app_id, args.kudu_host, args.subscription_id, os);

    let token_provider: Arc<dyn AccessTokenProvider> = if let Some(token) = args.access_token {
        Arc::new(StaticTokenProvider::new(token))
    } else {
        match (args.tenant_id, args.client_id, args.client_secret) {
            (Some(tenant), Some(client), Some(secret)) => {
                Arc::new(AzureAdTokenProvider::new(tenant, client, secret))
            }
            _ => anyhow::bail!(
                "either --access-token or --tenant-id/--client-id/--client-secret must be provided"
            ),
        }
    };

    if os == AppServiceOs::Linux && !args.skip_readiness_probe {
        info!(app = %target.id, "Waiting for the remote tunnel to start");
        TunnelStatusClient::new(target.clone(), Arc::clone(&token_provider))
            .wait_until_started()
            .await?;
    }

    let provider = RelayServerProvider::new(RelayConfig::from_env(), token_provider);
    let server = provider.relay_server_for(&target).await?;
    let credentials = server.remote_credentials();

    info!(
        host = %credentials.host,
        port = credentials.port,
        user = %credentials.user_name,
        "Debugger endpoint ready"
    );

    tokio::signal::ctrl_c().await?;
    info!("Received Ctrl+C shutdown signal");
    provider.shutdown();

    Ok(())
}
