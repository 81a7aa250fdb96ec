#[cfg(test)]
#[path = "refresh_coordinator_test.rs"]
mod tests;

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::PoisonError;

use futures::future::BoxFuture;
use futures::future::Shared;
use futures::FutureExt;

use super::SessionStore;
use crate::domain::models::AuthorityBox;
use crate::domain::models::RenewError;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The store holds a rotated credential pair.
    Renewed,
    /// The authority refused the refresh credential and the session was
    /// cleared.
    Rejected,
    /// Renewal failed for transport or server reasons. The session was kept.
    Unavailable,
    /// There was no refresh credential to renew with.
    NoCredential,
}

impl RefreshOutcome {
    pub fn is_fresh(&self) -> bool {
        return *self == RefreshOutcome::Renewed;
    }
}

type PendingRenewal = Shared<BoxFuture<'static, RefreshOutcome>>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    return mutex.lock().unwrap_or_else(PoisonError::into_inner);
}

/// Keeps at most one renewal in flight. Every caller arriving while a renewal
/// runs awaits the same result instead of starting another one.
#[derive(Clone)]
pub struct RefreshCoordinator {
    store: SessionStore,
    authority: AuthorityBox,
    in_flight: Arc<Mutex<Option<PendingRenewal>>>,
}

impl RefreshCoordinator {
    pub fn new(store: SessionStore, authority: AuthorityBox) -> RefreshCoordinator {
        return RefreshCoordinator {
            store,
            authority,
            in_flight: Arc::new(Mutex::new(None)),
        };
    }

    pub fn is_renewing(&self) -> bool {
        return lock(&self.in_flight).is_some();
    }

    /// Renews unconditionally and reports whether the store now holds a
    /// usable credential.
    pub async fn ensure_fresh(&self) -> bool {
        return self.renew_after(None).await.is_fresh();
    }

    /// Renews the session after a request was rejected with
    /// `stale_access_token`. When the store already moved on to another
    /// access token, a renewal completed in the meantime and nothing is sent.
    pub async fn renew_after(&self, stale_access_token: Option<&str>) -> RefreshOutcome {
        let pending = {
            let mut in_flight = lock(&self.in_flight);
            match in_flight.as_ref() {
                Some(pending) => pending.clone(),
                None => {
                    if let (Some(stale), Some(current)) =
                        (stale_access_token, self.store.access_token())
                    {
                        if stale != current {
                            return RefreshOutcome::Renewed;
                        }
                    }

                    let Some(refresh_token) = self.store.refresh_token() else {
                        return RefreshOutcome::NoCredential;
                    };

                    let pending = self.start(refresh_token);
                    *in_flight = Some(pending.clone());
                    pending
                }
            }
        };

        return pending.await;
    }

    fn start(&self, refresh_token: String) -> PendingRenewal {
        let store = self.store.clone();
        let authority = self.authority.clone();
        let in_flight = self.in_flight.clone();

        return async move {
            tracing::debug!("Renewing session");
            let outcome = match authority.renew(&refresh_token).await {
                Ok(tokens) => {
                    if store.rotate(&refresh_token, tokens) {
                        RefreshOutcome::Renewed
                    } else {
                        tracing::debug!("Session changed while renewing, dropping new credentials");
                        RefreshOutcome::NoCredential
                    }
                }
                Err(RenewError::Rejected(reason)) => {
                    tracing::warn!(%reason, "Refresh credential rejected, clearing session");
                    if !store.clear_if_current(&refresh_token) {
                        tracing::debug!("Session changed while renewing, keeping it");
                    }
                    RefreshOutcome::Rejected
                }
                Err(RenewError::Transport(reason)) => {
                    tracing::warn!(%reason, "Session renewal failed, keeping session");
                    RefreshOutcome::Unavailable
                }
            };

            *lock(&in_flight) = None;
            return outcome;
        }
        .boxed()
        .shared();
    }
}
