//! Walks one session through its life against a running auth server.
//!
//! ```text
//! PORTCULLIS_BASE_URL=http://localhost:8080 \
//! DEMO_EMAIL=alice@example.com DEMO_PASSWORD=hunter2 \
//!     cargo run -p session-cli
//! ```

use portcullis::prelude::*;
use tokio::sync::watch;

#[tokio::main]
async fn main() -> Result<(), PortcullisError> {
    portcullis::init_tracing();

    let email = std::env::var("DEMO_EMAIL").unwrap_or_else(|_| "demo@example.com".into());
    let password = std::env::var("DEMO_PASSWORD").unwrap_or_else(|_| "demo".into());

    let config = ClientConfig::from_env()?;
    let mut client = PortcullisClient::builder(config).build()?;
    let location = client.start("/").await?;
    tracing::info!(%location, status = %client.machine().status(), "started");
    let mut locations = client.router().subscribe();

    let (stop, shutdown) = watch::channel(false);
    let keepalive = client.spawn_keepalive(shutdown);

    if let Err(e) = client.machine().login(&email, &password).await {
        tracing::error!(error = %e.user_message(), "login failed");
        return Err(e.into());
    }
    // The login landing is applied by the router's driver.
    let _ = locations.changed().await;
    tracing::info!(location = ?client.router().current(), "signed in");

    match client.machine().active_sessions().await {
        Ok(sessions) => {
            for session in sessions {
                tracing::info!(
                    id = %session.id,
                    agent = %session.user_agent,
                    ip = %session.ip_address,
                    "active session"
                );
            }
        }
        Err(e) => tracing::warn!(error = %e, "could not list sessions"),
    }

    let location = client.router().navigate("/settings").await?;
    tracing::info!(%location, "navigated");

    client.machine().logout().await;
    if let Some(message) = client.machine().error_message() {
        tracing::warn!(%message, "logout");
    }

    stop.send_replace(true);
    let _ = keepalive.await;
    Ok(())
}
