//! api-probe: exercise the API client from a terminal.
//!
//! Usage:
//!   api-probe get <path> [--no-auth] [--param k=v]...   Issue a GET
//!   api-probe post <path> [<json>] [--no-auth]          Issue a POST
//!   api-probe login <access-token> <refresh-token>      Store a session in the OS keyring
//!   api-probe logout                                    Forget the stored session
//!   api-probe status                                    Show session state

use anyhow::{bail, Context};
use api_client_core::credentials::KeyringStore;
use api_client_core::transport::HttpTransport;
use api_client_core::{ApiClient, QueryParams, RequestOptions};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

const KEYRING_SERVICE: &str = "api-client-core";

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("api_client_core=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        print_usage();
        std::process::exit(1);
    }

    let result = match args[1].as_str() {
        "get" => cmd_get(&args[2..]).await,
        "post" => cmd_post(&args[2..]).await,
        "login" => cmd_login(&args[2..]).await,
        "logout" => cmd_logout().await,
        "status" => cmd_status().await,
        "help" | "--help" | "-h" => {
            print_usage();
            Ok(())
        }
        other => {
            eprintln!("Unknown command: {other}");
            eprintln!();
            print_usage();
            std::process::exit(1);
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(2);
    }
}

fn print_usage() {
    println!(
        r#"api-probe: API client probe

USAGE:
    api-probe <COMMAND> [OPTIONS]

COMMANDS:
    get <path> [--no-auth] [--param k=v]...   Issue a GET request
    post <path> [<json>] [--no-auth]          Issue a POST request
    login <access-token> <refresh-token>      Store a session in the OS keyring
    logout                                    Forget the stored session
    status                                    Show session state
    help                                      Show this help message

ENVIRONMENT:
    API_BASE_URL                Base URL endpoints are appended to
    API_TIMEOUT_MS              Per-request timeout
    API_MAX_RETRY_ATTEMPTS      Retries per endpoint
    API_RETRY_BASE_DELAY_MS     First backoff delay
    RUST_LOG                    Log filter (default: api_client_core=info)"#
    );
}

async fn client() -> anyhow::Result<ApiClient> {
    let transport = HttpTransport::new().context("creating HTTP transport")?;
    let client = ApiClient::builder()
        .transport(Arc::new(transport))
        .credential_backend(Arc::new(KeyringStore::new(KEYRING_SERVICE)))
        .build()
        .await
        .context("building client")?;
    Ok(client)
}

fn options(args: &[String]) -> RequestOptions {
    let mut opts = RequestOptions::new();
    if args.iter().any(|a| a == "--no-auth") {
        opts = opts.skip_auth();
    }
    opts
}

fn params(args: &[String]) -> anyhow::Result<QueryParams> {
    let mut params = QueryParams::new();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if arg == "--param" {
            let pair = iter.next().context("--param needs k=v")?;
            let (k, v) = pair
                .split_once('=')
                .with_context(|| format!("malformed --param '{pair}', expected k=v"))?;
            params.insert(k.to_string(), v.to_string());
        }
    }
    Ok(params)
}

fn print_json(value: &impl serde::Serialize) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn cmd_get(args: &[String]) -> anyhow::Result<()> {
    let Some(path) = args.first() else {
        bail!("usage: api-probe get <path>");
    };
    let params = params(&args[1..])?;
    let client = client().await?;
    let envelope = client
        .get::<serde_json::Value>(path, Some(&params), Some(options(args)))
        .await?;
    print_json(&envelope)
}

async fn cmd_post(args: &[String]) -> anyhow::Result<()> {
    let Some(path) = args.first() else {
        bail!("usage: api-probe post <path> [<json>]");
    };
    let body = match args.get(1).filter(|a| !a.starts_with("--")) {
        Some(raw) => Some(serde_json::from_str(raw).context("body is not valid JSON")?),
        None => None,
    };
    let client = client().await?;
    let envelope = client
        .post::<serde_json::Value>(path, body, Some(options(args)))
        .await?;
    print_json(&envelope)
}

async fn cmd_login(args: &[String]) -> anyhow::Result<()> {
    let (Some(access), Some(refresh)) = (args.first(), args.get(1)) else {
        bail!("usage: api-probe login <access-token> <refresh-token>");
    };
    let client = client().await?;
    client.login(access.as_str(), refresh.as_str()).await;
    if client.credential_store().is_persistence_degraded() {
        eprintln!("warning: keyring unavailable, session kept for this process only");
    }
    println!("session stored");
    Ok(())
}

async fn cmd_logout() -> anyhow::Result<()> {
    client().await?.logout().await;
    println!("session cleared");
    Ok(())
}

async fn cmd_status() -> anyhow::Result<()> {
    let client = client().await?;
    println!("base url:      {}", client.config().base_url);
    println!("auth state:    {:?}", client.auth_state());
    match client.credentials() {
        Some(pair) => println!("issued at:     {}", pair.issued_at.to_rfc3339()),
        None => println!("issued at:     -"),
    }
    Ok(())
}
