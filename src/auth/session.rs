//! Session store
//!
//! Holds the bearer token and the signed-in user. The token is mirrored to
//! the cache so a later process can resume the session, but `authenticated`
//! only becomes true after the backend has accepted the token in this
//! process (login or `/auth/me`).

use crate::api::models::{Credentials, LoginResponse, MeResponse, ProfileUpdate, UserRecord};
use crate::api::{Ack, ApiClient, Envelope};
use crate::cache::{self, keys};
use crate::core::error::{ApiResult, ErrorInfo};
use crate::store::normalize;
use crate::store::orchestrator::{write, Orchestrator};
use crate::store::state::{Message, RequestLedger, Slot, Tracked};
use crate::store::Resettable;
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::{RwLock, RwLockReadGuard};
use tracing::{info, warn};

#[derive(Debug, Clone, Default, Serialize)]
pub struct SessionState {
    pub user: Option<UserRecord>,
    #[serde(skip_serializing)]
    pub token: Option<String>,
    pub authenticated: bool,
    pub error: Option<ErrorInfo>,
    pub status: Option<u16>,
    pub message: Option<String>,
    #[serde(skip)]
    ledger: RequestLedger,
}

impl SessionState {
    pub fn loading(&self) -> bool {
        self.ledger.loading()
    }

    fn clear(&mut self) {
        self.user = None;
        self.token = None;
        self.authenticated = false;
        self.error = None;
        self.status = None;
        self.message = None;
        self.ledger.reset();
    }
}

impl Tracked for SessionState {
    fn ledger(&self) -> &RequestLedger {
        &self.ledger
    }

    fn ledger_mut(&mut self) -> &mut RequestLedger {
        &mut self.ledger
    }

    fn record_success(&mut self, status: u16) {
        self.status = Some(status);
        self.error = None;
    }

    fn record_failure(&mut self, error: &ErrorInfo) {
        self.status = error.status_code;
        self.error = Some(error.clone());
    }

    fn set_message(&mut self, message: Option<String>) {
        self.message = message;
    }
}

/// Token from a login; a failed login drops the whole session
#[derive(Debug, Clone, Copy)]
struct SessionToken;

impl Slot<SessionState> for SessionToken {
    type Value = String;

    fn name(self) -> Option<&'static str> {
        Some("token")
    }

    fn assign(self, state: &mut SessionState, value: Option<String>) {
        match value {
            Some(token) => {
                state.token = Some(token);
                state.authenticated = true;
            }
            None => {
                state.token = None;
                state.user = None;
                state.authenticated = false;
            }
        }
    }
}

/// User from `/auth/me`; a failure means "not signed in" but keeps the token
#[derive(Debug, Clone, Copy)]
struct SessionUser;

impl Slot<SessionState> for SessionUser {
    type Value = UserRecord;

    fn name(self) -> Option<&'static str> {
        Some("user")
    }

    fn assign(self, state: &mut SessionState, value: Option<UserRecord>) {
        state.authenticated = value.is_some();
        state.user = value;
    }
}

/// User after a profile update; a failed update leaves the session alone
#[derive(Debug, Clone, Copy)]
struct ProfileUser;

impl Slot<SessionState> for ProfileUser {
    type Value = UserRecord;

    fn name(self) -> Option<&'static str> {
        Some("user")
    }

    fn assign(self, state: &mut SessionState, value: Option<UserRecord>) {
        if let Some(user) = value {
            state.user = Some(user);
        }
    }
}

pub struct SessionStore {
    api: ApiClient,
    orchestrator: Orchestrator,
    state: RwLock<SessionState>,
}

impl SessionStore {
    /// Create the store and resume any cached session
    pub fn new(api: ApiClient, orchestrator: Orchestrator) -> Self {
        let store = Self {
            api,
            orchestrator,
            state: RwLock::new(SessionState::default()),
        };
        store.hydrate();
        store
    }

    /// Reload token and user from the cache and re-attach the token
    pub fn hydrate(&self) {
        let backing = self.orchestrator.cache().as_ref();
        let token: Option<String> = cache::load(backing, keys::TOKEN);
        let user: Option<UserRecord> = cache::load(backing, keys::CURRENT_USER);

        self.api.set_bearer(token.clone());
        let mut state = write(&self.state);
        state.token = token;
        state.user = user;
        state.authenticated = false;
    }

    fn read(&self) -> RwLockReadGuard<'_, SessionState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    pub fn snapshot(&self) -> SessionState {
        self.read().clone()
    }

    pub fn token(&self) -> Option<String> {
        self.read().token.clone()
    }

    pub fn user(&self) -> Option<UserRecord> {
        self.read().user.clone()
    }

    pub fn authenticated(&self) -> bool {
        self.read().authenticated
    }

    pub fn loading(&self) -> bool {
        self.read().loading()
    }

    pub fn error(&self) -> Option<ErrorInfo> {
        self.read().error.clone()
    }

    /// Exchange credentials for a bearer token
    pub async fn login(&self, credentials: &Credentials) -> ApiResult<String> {
        let outcome = self
            .orchestrator
            .execute(&self.state, Some(keys::TOKEN), SessionToken, || async {
                let response = self
                    .api
                    .post_json::<_, LoginResponse>("/auth/login", credentials)
                    .await?;
                Ok(response.map(|login| login.access_token))
            })
            .await;

        match &outcome {
            Ok(_) => {
                // Attach whatever token the state holds, which may be a newer login's
                self.api.set_bearer(self.token());
                info!(dni = %credentials.dni, "Signed in");
            }
            Err(error) => {
                self.api.set_bearer(None);
                self.forget(&[keys::TOKEN, keys::CURRENT_USER]);
                warn!(dni = %credentials.dni, "Sign-in failed: {}", error);
            }
        }

        outcome
    }

    /// Load the signed-in user (`POST /auth/me`)
    pub async fn fetch_self(&self) -> ApiResult<UserRecord> {
        let outcome = self
            .orchestrator
            .execute(&self.state, Some(keys::CURRENT_USER), SessionUser, || async {
                let response = self.api.post::<Envelope<MeResponse>>("/auth/me").await?;
                Ok(response.into_data()?.map(|me| me.user))
            })
            .await;

        if outcome.is_err() {
            self.forget(&[keys::CURRENT_USER]);
        }
        outcome
    }

    /// Multipart `PUT /users/{id}` for the signed-in user's own profile
    pub async fn update_profile(&self, id: i64, update: ProfileUpdate) -> ApiResult<UserRecord> {
        self.orchestrator
            .execute(&self.state, Some(keys::CURRENT_USER), ProfileUser, || async move {
                self.api
                    .put_multipart::<Envelope<UserRecord>>(&format!("/users/{}", id), update.into_form())
                    .await?
                    .into_data()
            })
            .await
    }

    /// Merge fields into the session user locally and re-persist it
    pub fn patch_user(&self, changes: &Map<String, Value>) -> ApiResult<Option<UserRecord>> {
        let mut state = write(&self.state);
        let Some(user) = state.user.as_ref() else {
            return Ok(None);
        };

        let patched = normalize::merge_record(user, changes)?;
        cache::store(self.orchestrator.cache().as_ref(), keys::CURRENT_USER, &patched);
        state.user = Some(patched.clone());
        Ok(Some(patched))
    }

    /// Notify the backend of a logout
    pub async fn logout_remote(&self) -> ApiResult<Ack> {
        self.orchestrator
            .execute(&self.state, None, Message::<Ack>::new(), || async {
                self.api.post::<Ack>("/auth/logout").await
            })
            .await
    }

    /// Drop token and user and detach the bearer
    pub fn clear(&self) {
        write(&self.state).clear();
        self.api.set_bearer(None);
    }

    fn forget(&self, keys: &[&str]) {
        let backing = self.orchestrator.cache();
        for key in keys {
            if let Err(e) = backing.clear(key) {
                warn!(key = *key, "Failed to clear cache entry: {}", e);
            }
        }
    }
}

impl Resettable for SessionStore {
    fn resource(&self) -> &'static str {
        "session"
    }

    fn reset(&self) {
        self.clear();
    }
}
