use std::sync::Arc;

use safetrip_api::config::{init_db, Config, EmailBackend, StorageBackend};
use safetrip_api::memory::MemoryStore;
use safetrip_api::modules::{
    auth::crud::{OtpCrud, UserCrud},
    emergency::crud::AlertCrud,
    profile::crud::ProfileCrud,
};
use safetrip_api::services::{
    clock::SystemClock,
    email::{LogEmailGateway, SmtpEmailGateway},
    gateway::{EmailGateway, SmsGateway},
    otp::SecureCodeGenerator,
    sms::{DisabledSmsGateway, TwilioSmsGateway},
};
use safetrip_api::{create_app, AppState, Backends};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "safetrip_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let email: Arc<dyn EmailGateway> = match (config.email_backend, config.smtp.as_ref()) {
        (EmailBackend::Smtp, Some(smtp)) => Arc::new(SmtpEmailGateway::new(smtp)?),
        _ => {
            tracing::warn!("EMAIL_BACKEND=log: emails are written to the log, not sent");
            Arc::new(LogEmailGateway)
        }
    };

    let sms: Arc<dyn SmsGateway> = match config.twilio.as_ref() {
        Some(twilio) => Arc::new(TwilioSmsGateway::new(twilio)),
        None => {
            tracing::warn!("Twilio is not configured; SMS alerts are disabled");
            Arc::new(DisabledSmsGateway)
        }
    };

    let backends = match (config.storage, config.database_url.as_deref()) {
        (StorageBackend::MySql, Some(url)) => {
            let pool = init_db(url).await?;
            tracing::info!("Connected to MySQL");
            Backends {
                users: Arc::new(UserCrud::new(pool.clone())),
                profiles: Arc::new(ProfileCrud::new(pool.clone())),
                otp_ledger: Arc::new(OtpCrud::new(pool.clone())),
                alerts: Arc::new(AlertCrud::new(pool)),
                email,
                sms,
                clock: Arc::new(SystemClock),
                codes: Arc::new(SecureCodeGenerator),
            }
        }
        _ => {
            tracing::warn!("STORAGE=memory: data is lost on restart");
            let store = Arc::new(MemoryStore::new());
            Backends {
                users: store.clone(),
                profiles: store.clone(),
                otp_ledger: store.clone(),
                alerts: store,
                email,
                sms,
                clock: Arc::new(SystemClock),
                codes: Arc::new(SecureCodeGenerator),
            }
        }
    };

    let app = create_app(AppState::new(&config, backends)?);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server running on http://{}", config.bind_addr);
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .await?;

    Ok(())
}
