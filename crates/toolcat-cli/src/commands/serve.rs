//! `toolcat serve`: the interact backend over HTTP.
//!
//! `POST /interact` takes `{"option": N, "search_term"?}` and answers with the
//! same JSON the directory catalog would return for that operation.

use std::{future::Future, net::SocketAddr, sync::Arc};

use anyhow::{Context, Result};
use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
};
use clap::Args;
use console::style;
use serde_json::{Value, json};
use tokio::{net::TcpListener, signal};
use toolcat_core::Config;
use toolcat_graph::GraphClient;
use toolcat_tools::{InteractAction, directory::run_action};
use tracing::{info, warn};

use crate::catalogs;

#[derive(Args)]
pub struct ServeArgs {
    /// Address to bind.
    #[arg(short, long, default_value = "127.0.0.1:5000")]
    pub addr: String,
}

pub async fn run(args: &ServeArgs, config: &Config) -> Result<()> {
    let client = catalogs::graph_client(config)?;

    // Sign in before accepting requests so a device-code prompt shows up now.
    client
        .access_token()
        .await
        .context("failed to acquire Microsoft Graph token")?;

    let shutdown = async {
        let _ = signal::ctrl_c().await;
        info!("Received shutdown signal");
    };
    run_with_shutdown(args, client, shutdown).await
}

async fn run_with_shutdown<F>(args: &ServeArgs, client: GraphClient, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr: SocketAddr = args
        .addr
        .parse()
        .with_context(|| format!("invalid --addr value: {}", args.addr))?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind interact backend on {addr}"))?;

    info!(address = %addr, "Starting interact backend");
    println!(
        "{} Interact backend running on http://{}/interact",
        style("✓").green().bold(),
        addr
    );
    println!("Press Ctrl+C to stop\n");

    axum::serve(listener, router(client))
        .with_graceful_shutdown(shutdown)
        .await
        .context("interact backend error")?;

    info!("Interact backend stopped");
    Ok(())
}

pub(crate) fn router(client: GraphClient) -> Router {
    Router::new()
        .route("/interact", post(interact))
        .with_state(Arc::new(client))
}

async fn interact(
    State(client): State<Arc<GraphClient>>,
    body: Result<Json<Value>, JsonRejection>,
) -> Response {
    let request = match body {
        Ok(Json(request)) => request,
        Err(rejection) => {
            warn!(error = %rejection, "Rejected malformed request body");
            return bad_request(&format!("Invalid request body: {}", rejection.body_text()));
        }
    };

    let option = request.get("option").unwrap_or(&Value::Null);
    let Some(action) = option
        .as_u64()
        .and_then(|n| u8::try_from(n).ok())
        .and_then(InteractAction::from_option)
    else {
        warn!(%option, "Rejected unknown option");
        return bad_request(&format!("Invalid option: {option}"));
    };
    let search_term = request.get("search_term").and_then(Value::as_str);

    match run_action(&client, action, search_term).await {
        Ok(reply) => Json(reply).into_response(),
        Err(e) => {
            warn!(%action, error = %e, "Graph request failed");
            (StatusCode::BAD_GATEWAY, Json(json!({"error": e.to_string()}))).into_response()
        }
    }
}

fn bad_request(message: &str) -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({"error": message}))).into_response()
}
