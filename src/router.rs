use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use url::Url;

use crate::config::{Config, Settings};
use crate::db::ExplDb;
use crate::error::ExplError;
use crate::handlers::{
    listing::EntryListFormatter,
    web,
    webhook::{AddHandler, DelHandler, ExplHandler, FindHandler, TopHandler},
};
use crate::middleware::{compose, proxy_headers, require_token, timeout};
use crate::security::{Clock, TokenCodec};
use crate::types::EntryFormatter;
use crate::webhook::{into_http, webhook};

/// Shared by every handler. The pool and the signing key are the only
/// process-wide state; both are safe to share without locking.
#[derive(Clone)]
pub struct AppState {
    pub db: ExplDb,
    pub codec: Arc<TokenCodec>,
    pub clock: Arc<dyn Clock>,
    pub formatter: Arc<EntryFormatter>,
    pub settings: Arc<Settings>,
}

impl AppState {
    pub fn new(
        db: ExplDb,
        codec: Arc<TokenCodec>,
        clock: Arc<dyn Clock>,
        settings: Settings,
    ) -> Result<Self, ExplError> {
        if !settings.public_url.is_empty() {
            Url::parse(&settings.public_url).map_err(|e| {
                ExplError::InvalidConfig(format!("public_url {:?}: {e}", settings.public_url))
            })?;
        }
        let formatter = EntryFormatter::new(settings.time_format.clone(), settings.utc_offset()?)?;
        Ok(Self {
            db,
            codec,
            clock,
            formatter: Arc::new(formatter),
            settings: Arc::new(settings),
        })
    }

    pub fn list_formatter(&self) -> EntryListFormatter {
        EntryListFormatter::new(self)
    }
}

/// Route table. Every endpoint gets the timeout and proxy-header stages;
/// webhook endpoints additionally require their operation's secret.
pub fn expl_router(state: AppState, config: &Config) -> Router {
    let web_chain = compose(
        timeout::<AppState>(state.settings.handler_timeout()),
        proxy_headers::<AppState>(config.use_proxy_headers),
    );
    let webhook_chain = compose(&web_chain, into_http::<AppState>);
    let webhook_chain = &webhook_chain;
    let secured = move |secret: &str| compose(webhook_chain, require_token(Arc::from(secret)));

    let secrets = &config.secrets;
    Router::new()
        .route(
            "/api/add",
            secured(&secrets.add)(webhook(AddHandler::new(state.clone()))),
        )
        .route(
            "/api/expl",
            secured(&secrets.expl)(webhook(ExplHandler::new(state.clone()))),
        )
        .route(
            "/api/del",
            secured(&secrets.del)(webhook(DelHandler::new(state.clone()))),
        )
        .route(
            "/api/find",
            secured(&secrets.find)(webhook(FindHandler::new(state.clone()))),
        )
        .route(
            "/api/top",
            secured(&secrets.top)(webhook(TopHandler::new(state.clone()))),
        )
        .route("/expl/{token}", web_chain(get(web::expl_page)))
        .route("/find/{token}", web_chain(get(web::find_page)))
        .with_state(state)
}
