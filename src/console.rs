//! Console composition root
//!
//! Owns the single cache handle and API client and hands them to the session
//! and every entity store. Logout is coordinated here because it spans all of
//! them.

use crate::api::models::{Credentials, UserRecord};
use crate::api::{ApiClient, HttpTransport, ReqwestTransport};
use crate::auth::SessionStore;
use crate::cache::{SharedCache, SqliteCache};
use crate::core::config::{Config, StoresConfig};
use crate::core::error::{ApiResult, Result};
use crate::db::DatabaseManager;
use crate::store::{
    CategoryStore, CompanyStore, EntityStore, Orchestrator, ProductStore, ProviderStore, Resettable, Resource,
    RoleStore, StockMovementStore, UnitStore, UserStore,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// Notifications for whatever renders the console
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleEvent {
    SignedIn { user_id: i64 },
    /// The session is gone; the login screen should be shown
    NavigateToLogin,
}

pub struct Console {
    api: ApiClient,
    cache: SharedCache,
    events: broadcast::Sender<ConsoleEvent>,
    pub session: SessionStore,
    pub users: UserStore,
    pub roles: RoleStore,
    pub companies: CompanyStore,
    pub products: ProductStore,
    pub categories: CategoryStore,
    pub units: UnitStore,
    pub providers: ProviderStore,
    pub stock_movements: StockMovementStore,
}

impl Console {
    /// Build a console backed by the SQLite cache and the reqwest transport
    pub fn new(config: &Config) -> Result<Self> {
        let db = DatabaseManager::new(
            &config.cache.path,
            config.cache.pool_size,
            Duration::from_millis(config.cache.busy_timeout),
        )?;
        let transport = ReqwestTransport::new(&config.api)?;

        info!(
            base_url = %transport.base_url(),
            cache = ?db.db_path(),
            "Console initialized"
        );

        Ok(Self::with_parts(
            Arc::new(transport),
            Arc::new(SqliteCache::new(db)),
            &config.stores,
        ))
    }

    /// Wire the stores around an explicit transport and cache
    pub fn with_parts(transport: Arc<dyn HttpTransport>, cache: SharedCache, stores: &StoresConfig) -> Self {
        let api = ApiClient::new(transport);
        let orchestrator = Orchestrator::new(cache.clone(), stores.resolution);
        let (events, _) = broadcast::channel(16);

        Self {
            session: SessionStore::new(api.clone(), orchestrator.clone()),
            users: store(&api, &orchestrator, stores),
            roles: store(&api, &orchestrator, stores),
            companies: store(&api, &orchestrator, stores),
            products: store(&api, &orchestrator, stores),
            categories: store(&api, &orchestrator, stores),
            units: store(&api, &orchestrator, stores),
            providers: store(&api, &orchestrator, stores),
            stock_movements: store(&api, &orchestrator, stores),
            api,
            cache,
            events,
        }
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn cache(&self) -> &SharedCache {
        &self.cache
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ConsoleEvent> {
        self.events.subscribe()
    }

    /// Sign in and load the signed-in user
    pub async fn login(&self, credentials: &Credentials) -> ApiResult<UserRecord> {
        self.session.login(credentials).await?;
        let user = self.session.fetch_self().await?;
        self.emit(ConsoleEvent::SignedIn { user_id: user.id });
        Ok(user)
    }

    /// Tear the session down
    ///
    /// The backend is told first, but its answer does not matter: the cache
    /// is emptied, every store is reset and the login screen is requested
    /// either way.
    pub async fn logout(&self) {
        match self.session.logout_remote().await {
            Ok(ack) => debug!(message = ?ack.message, "Backend acknowledged logout"),
            Err(e) => warn!("Remote logout failed, continuing locally: {}", e),
        }

        match self.cache.clear_all() {
            Ok(removed) => debug!(removed, "Cache cleared"),
            Err(e) => warn!("Failed to clear cache: {}", e),
        }

        for store in self.stores() {
            store.reset();
        }
        self.session.clear();

        info!("Signed out");
        self.emit(ConsoleEvent::NavigateToLogin);
    }

    /// Every entity store, for operations that span them all
    pub fn stores(&self) -> [&dyn Resettable; 8] {
        [
            &self.users,
            &self.roles,
            &self.companies,
            &self.products,
            &self.categories,
            &self.units,
            &self.providers,
            &self.stock_movements,
        ]
    }

    fn emit(&self, event: ConsoleEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }
}

fn store<R: Resource>(api: &ApiClient, orchestrator: &Orchestrator, stores: &StoresConfig) -> EntityStore<R> {
    EntityStore::new(api.clone(), orchestrator.clone(), stores.sync_for(R::NAME))
}
