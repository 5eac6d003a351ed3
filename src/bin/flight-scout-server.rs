use flight_scout::server::{app, AppState};
use flight_scout::session::FileStore;
use flight_scout::{ReferenceData, Settings};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "flight_scout=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let settings = Settings::load()?;
    let reference = ReferenceData::load(&settings.data)?;
    let store = Arc::new(FileStore::new(&settings.session.store_path));
    let state = AppState::new(&settings, reference, store)?;

    state.rates.load(&state.rate_client).await;

    let addr = SocketAddr::from(([0, 0, 0, 0], settings.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app(state)).await?;
    Ok(())
}
