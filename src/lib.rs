pub mod config;
pub mod error;
pub mod memory;
pub mod modules;
pub mod services;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, timeout::TimeoutLayer, trace::TraceLayer};

use config::Config;
use modules::auth::interface::{OtpLedger, UserRepository};
use modules::emergency::interface::AlertRepository;
use modules::profile::interface::ProfileRepository;
use modules::{auth::auth_routes, emergency::emergency_routes, metrics::metrics_routes, profile::profile_routes};
use services::alert::{AlertConfig, AlertDispatcher};
use services::clock::Clock;
use services::gateway::{EmailGateway, Mailer, SmsGateway};
use services::metrics::{metrics_middleware, MetricsRegistry};
use services::otp::{CodeGenerator, OtpService};
use services::rate_limit::{create_rate_limiter, RateLimitLayer};
use services::security::security_headers;
use services::token::TokenService;

/// Storage, gateways and sources of time and randomness the app is built on.
pub struct Backends {
    pub users: Arc<dyn UserRepository>,
    pub profiles: Arc<dyn ProfileRepository>,
    pub otp_ledger: Arc<dyn OtpLedger>,
    pub alerts: Arc<dyn AlertRepository>,
    pub email: Arc<dyn EmailGateway>,
    pub sms: Arc<dyn SmsGateway>,
    pub clock: Arc<dyn Clock>,
    pub codes: Arc<dyn CodeGenerator>,
}

pub struct AppState {
    pub users: Arc<dyn UserRepository>,
    pub profiles: Arc<dyn ProfileRepository>,
    pub otp: OtpService,
    pub dispatcher: AlertDispatcher,
    pub tokens: Arc<TokenService>,
    pub clock: Arc<dyn Clock>,
    pub metrics: Arc<MetricsRegistry>,
    pub default_country_code: String,
    pub request_timeout: Duration,
    pub rate_limit_burst: u32,
    pub trust_proxy_headers: bool,
}

impl AppState {
    pub fn new(config: &Config, backends: Backends) -> Result<Self, Box<dyn std::error::Error>> {
        let tokens = Arc::new(TokenService::new(&config.token_secret, config.token_max_age()));
        let mailer = Mailer::new(
            backends.email,
            config.email_from.clone(),
            Duration::from_secs(config.email_timeout_secs),
        );

        let otp = OtpService::new(
            backends.users.clone(),
            backends.otp_ledger,
            mailer.clone(),
            tokens.clone(),
            backends.clock.clone(),
            backends.codes,
            config.otp_policy(),
        );

        let dispatcher = AlertDispatcher::new(
            backends.users.clone(),
            backends.profiles.clone(),
            backends.alerts,
            mailer,
            backends.sms,
            backends.clock.clone(),
            AlertConfig {
                authority_emails: config.authority_alert_emails.clone(),
                default_country_code: config.default_phone_country_code.clone(),
                sms_from: config
                    .twilio
                    .as_ref()
                    .map(|t| t.from_number.clone())
                    .unwrap_or_default(),
                sms_timeout: Duration::from_secs(config.sms_timeout_secs),
                sms_total_timeout: Duration::from_secs(config.sms_total_timeout_secs),
            },
        );

        Ok(Self {
            users: backends.users,
            profiles: backends.profiles,
            otp,
            dispatcher,
            tokens,
            clock: backends.clock,
            metrics: MetricsRegistry::new()?,
            default_country_code: config.default_phone_country_code.clone(),
            request_timeout: Duration::from_secs(config.request_timeout_secs),
            rate_limit_burst: config.rate_limit_burst,
            trust_proxy_headers: config.trust_proxy_headers,
        })
    }
}

pub fn create_app(state: AppState) -> Router {
    let state = Arc::new(state);
    let rate_limiter = create_rate_limiter(state.rate_limit_burst);

    Router::new()
        .route("/", get(root))
        .route("/register", post(modules::auth::controller::register))
        .nest("/auth", auth_routes())
        .nest("/profile", profile_routes())
        .nest("/emergency", emergency_routes())
        .merge(metrics_routes())
        .layer(middleware::from_fn(security_headers))
        .layer(RequestBodyLimitLayer::new(1024 * 100)) // 100KB max body
        .layer(RateLimitLayer::new(rate_limiter, state.trust_proxy_headers))
        .layer(TimeoutLayer::new(state.request_timeout))
        .layer(middleware::from_fn_with_state(state.metrics.clone(), metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn root() -> &'static str {
    "SafeTrip API"
}
