mod config;

use std::net::SocketAddr;
use std::sync::Arc;

use lettre::message::Mailbox;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use docket_api::auth::{AppState, AppStateInner, JwtSettings};
use docket_api::mailer::{LogMailer, MailTransport, SmtpMailer};
use docket_api::notify::Notifier;

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "docket=debug,tower_http=debug".into()),
        )
        .init();

    let config = Config::from_env()?;

    // Init database
    let db = docket_db::Database::open(&config.db_path)?;
    for username in &config.staff_usernames {
        if db.set_staff(username, true)? {
            info!("Granted staff to {}", username);
        } else {
            warn!("Cannot grant staff to unknown user {}", username);
        }
    }

    // Mail delivery
    let transport: Arc<dyn MailTransport> = match &config.smtp {
        Some(smtp) => {
            info!("Sending notifications via {}:{}", smtp.host, smtp.port);
            Arc::new(SmtpMailer::new(&smtp.host, smtp.port, smtp.credentials.clone())?)
        }
        None => Arc::new(LogMailer),
    };
    let from: Mailbox = config.notifier_address.parse()?;

    // Shared state
    let state: AppState = Arc::new(AppStateInner {
        db,
        jwt: JwtSettings {
            secret: config.jwt_secret.clone(),
            ttl: chrono::Duration::seconds(config.jwt_ttl_secs),
            refresh_window: chrono::Duration::seconds(config.jwt_refresh_secs),
        },
        notifier: Notifier::new(transport, from, config.display_tz),
    });

    let app = docket_api::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("Docket server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
