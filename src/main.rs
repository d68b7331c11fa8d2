use roomstay::{App, AppState, ConfigBuilder};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ConfigBuilder::new().from_env().build()?;
    roomstay::init_tracing_with_config(&config);

    let state = AppState::from_config(config)?;

    // Cached mode compiles everything now so broken templates fail the deploy
    if state.templates.use_cache() {
        state.templates.warm()?;
    }

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        environment = %state.config.environment,
        "Starting roomstay"
    );

    App::new(state).serve().await?;
    tracing::info!("Shutdown complete");
    Ok(())
}
