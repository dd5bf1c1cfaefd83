use anyhow::Context;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = estoque_api::config::ApiConfig::from_env()?;
    estoque_observability::init(config.log_format);

    let app = estoque_api::app::build_app(&config).await?;

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
