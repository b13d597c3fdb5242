use std::sync::Arc;
use std::time::Duration;

use groundwork::prelude::*;
use tracing::info;

// ---------------------------------------------------------------------------
// Demo setup
// ---------------------------------------------------------------------------

/// Short enough to watch two silent renewals in under a minute.
const TOKEN_LIFETIME: Duration = Duration::from_secs(40);
const REFRESH_MARGIN: Duration = Duration::from_secs(25);

fn gateway() -> Arc<LocalAuthGateway> {
    Arc::new(LocalAuthGateway::new(LocalAuthGatewayConfig {
        token_lifetime: TOKEN_LIFETIME,
        ..LocalAuthGatewayConfig::default()
    }))
}

/// Prints every published session change until the channel closes.
fn watch_session(mut rx: tokio::sync::watch::Receiver<SessionSnapshot>) {
    tokio::spawn(async move {
        while rx.changed().await.is_ok() {
            let snapshot = rx.borrow_and_update().clone();
            let user = snapshot
                .identity
                .as_ref()
                .map_or("-", |identity| identity.username.as_str());
            info!(phase = %snapshot.phase, %user, "session changed");
        }
    });
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<(), GroundworkError> {
    groundwork::init_tracing();

    let store_path = std::env::temp_dir().join("groundwork-session-demo.json");
    let gateway = gateway();

    let session = SessionClientBuilder::new()
        .session_config(SessionConfig {
            refresh_margin: REFRESH_MARGIN,
            ..SessionConfig::default()
        })
        .file_store(&store_path)?
        .start(Arc::clone(&gateway))
        .await;
    watch_session(session.subscribe());

    // A token left by a previous run belongs to a gateway that no longer
    // exists, so start() has already logged it out.
    info!(phase = %session.phase(), "session restored");

    let created = session
        .register(&SignUpData::new("site-admin", "admin@groundwork.dev", "concrete42"))
        .await?;
    info!(user = %created.username, id = %created.id, "registered");

    session
        .login(&Credentials::new("site-admin", "concrete42"))
        .await?;
    let first = session.token();
    info!(
        role = session.role().as_deref().unwrap_or("-"),
        "logged in, renewal every {}s",
        (TOKEN_LIFETIME - REFRESH_MARGIN).as_secs()
    );

    // Two renewals happen on their own while we wait.
    tokio::time::sleep((TOKEN_LIFETIME - REFRESH_MARGIN) * 2 + Duration::from_secs(1)).await;
    info!(
        rotated = session.token() != first,
        live_tokens = gateway.active_tokens(),
        "after waiting"
    );

    // The server forgets the token: the next renewal fails and forces a
    // logout.
    if let Some(token) = session.token() {
        gateway.revoke(&token);
    }
    if let Err(e) = session.refresh_token().await {
        info!(error = %e, "renewal rejected");
    }
    info!(authenticated = session.is_authenticated(), "after revoke");

    session
        .login(&Credentials::new("site-admin", "concrete42"))
        .await?;
    session.logout().await;
    info!(
        live_tokens = gateway.active_tokens(),
        store = %store_path.display(),
        "done"
    );

    Ok(())
}
