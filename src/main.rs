use anyhow::Result;
use clap::Parser;
use rmcp::transport::sse_server::SseServer;
use rmcp::transport::streamable_http_server::{
    StreamableHttpService, session::local::LocalSessionManager,
};
use rmcp::{ServiceExt, transport::stdio};

use gitlab_mcp::{api, config, http, service};

pub const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1:3001";

#[derive(Parser, Clone)]
#[command(version = env!("CARGO_PKG_VERSION"), about, long_about = None)]
struct Cli {
    #[arg(
        long = "transport",
        value_name = "TRANSPORT",
        env = "GITLAB_MCP_TRANSPORT",
        default_value = "stdio",
        value_parser = ["stdio", "sse", "streamable-http"]
    )]
    transport: String,

    #[arg(
        long = "bind-address",
        value_name = "ADDRESS",
        env = "GITLAB_MCP_BIND_ADDRESS",
        default_value = DEFAULT_BIND_ADDRESS
    )]
    bind_address: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let state = api::AppState::new(config::Config::from_env());

    tracing::info!("Starting gitlab-mcp server");

    match cli.transport.as_str() {
        "stdio" => {
            tracing::info!("Starting gitlab-mcp with stdio transport");
            let service = service::GitLabService::new(state)
                .serve(stdio())
                .await
                .inspect_err(|e| {
                    tracing::error!("Serving error: {:?}", e);
                })?;
            service.waiting().await?;
        }
        "sse" => {
            tracing::info!(
                "Starting gitlab-mcp with SSE transport at {}",
                cli.bind_address
            );
            let ct = SseServer::serve(cli.bind_address.parse()?)
                .await?
                .with_service(move || service::GitLabService::new(state.clone()));

            tokio::signal::ctrl_c().await?;
            ct.cancel();
        }
        "streamable-http" => {
            tracing::info!(
                "Starting gitlab-mcp with streamable-http transport at {}/mcp",
                cli.bind_address
            );

            let mcp_state = state.clone();
            let mcp = StreamableHttpService::new(
                move || Ok(service::GitLabService::new(mcp_state.clone())),
                LocalSessionManager::default().into(),
                Default::default(),
            );

            let router = http::router(state).nest_service("/mcp", mcp);

            let _ = axum::serve(
                tokio::net::TcpListener::bind(cli.bind_address).await?,
                router,
            )
            .with_graceful_shutdown(async {
                tokio::signal::ctrl_c().await.ok();
                tracing::info!("Received Ctrl+C, shutting down gitlab-mcp server...");
            })
            .await;
        }
        _ => unreachable!(),
    }

    Ok(())
}
