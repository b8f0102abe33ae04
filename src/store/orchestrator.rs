//! Request orchestrator
//!
//! Every container request goes through [`Orchestrator::execute`]:
//!
//! 1. raise `loading` on the target state
//! 2. invoke the deferred call
//! 3. on success, persist the payload under the cache key and assign it to
//!    the slot; on failure, record the error/status and null the slot
//! 4. lower `loading`, whatever happened (including cancellation)
//!
//! The call is taken as a closure so nothing can be dispatched before step 1.

use crate::api::Response;
use crate::cache::{self, SharedCache};
use crate::core::error::ApiResult;
use crate::store::state::{Slot, Ticket, Tracked};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::{RwLock, RwLockWriteGuard};
use tracing::{debug, warn};

/// Which response wins when requests for the same slot overlap
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionPolicy {
    /// The last response to arrive is applied
    #[default]
    LastResolved,
    /// A response is dropped once a later-dispatched one has been applied
    LatestDispatched,
}

pub(crate) fn write<S>(state: &RwLock<S>) -> RwLockWriteGuard<'_, S> {
    state.write().unwrap_or_else(|e| e.into_inner())
}

/// Lowers `loading` if the request future is dropped before resolving
struct InFlight<'a, S: Tracked> {
    state: &'a RwLock<S>,
    ticket: Ticket,
    armed: bool,
}

impl<S: Tracked> InFlight<'_, S> {
    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl<S: Tracked> Drop for InFlight<'_, S> {
    fn drop(&mut self) {
        if self.armed {
            write(self.state).ledger_mut().finish(self.ticket);
        }
    }
}

#[derive(Clone)]
pub struct Orchestrator {
    cache: SharedCache,
    policy: ResolutionPolicy,
}

impl Orchestrator {
    pub fn new(cache: SharedCache, policy: ResolutionPolicy) -> Self {
        Self { cache, policy }
    }

    pub fn policy(&self) -> ResolutionPolicy {
        self.policy
    }

    pub fn cache(&self) -> &SharedCache {
        &self.cache
    }

    /// Run `call` against `state`, routing its payload into `slot`
    ///
    /// The payload is returned to the caller even when it was not applied
    /// (stale epoch, or superseded under [`ResolutionPolicy::LatestDispatched`]).
    pub async fn execute<S, L, F, Fut>(
        &self,
        state: &RwLock<S>,
        cache_key: Option<&str>,
        slot: L,
        call: F,
    ) -> ApiResult<L::Value>
    where
        S: Tracked,
        L: Slot<S>,
        L::Value: Serialize + Clone,
        F: FnOnce() -> Fut,
        Fut: Future<Output = ApiResult<Response<L::Value>>>,
    {
        let ticket = write(state).ledger_mut().begin(slot.name());
        let mut in_flight = InFlight {
            state,
            ticket,
            armed: true,
        };

        let outcome = call().await;

        let mut guard = write(state);
        in_flight.disarm();

        let applies = if !guard.ledger().is_current(ticket) {
            debug!(slot = ?slot.name(), "Discarding response dispatched before a reset");
            false
        } else if self.policy == ResolutionPolicy::LatestDispatched
            && guard.ledger().is_superseded(ticket)
        {
            debug!(slot = ?slot.name(), "Discarding response superseded by a newer request");
            false
        } else {
            true
        };

        let result = match outcome {
            Ok(response) => {
                if applies {
                    if let Some(key) = cache_key {
                        // Cache what the server sent, not the record re-encoded
                        match &response.raw {
                            Some(raw) => cache::store(self.cache.as_ref(), key, raw),
                            None => cache::store(self.cache.as_ref(), key, &response.body),
                        }
                    }
                    slot.assign(&mut *guard, Some(response.body.clone()));
                    guard.record_success(response.status);
                    guard.ledger_mut().mark_applied(ticket);
                }
                Ok(response.body)
            }
            Err(error) => {
                if applies {
                    warn!(
                        slot = ?slot.name(),
                        status = ?error.status_code,
                        error_type = error.error_type(),
                        "Request failed: {}",
                        error
                    );
                    guard.record_failure(&error);
                    slot.assign(&mut *guard, None);
                }
                Err(error)
            }
        };

        guard.ledger_mut().finish(ticket);
        result
    }
}
