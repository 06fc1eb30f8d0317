use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;
use tracing::{info, warn};
use uuid::Uuid;

use crate::backend_client::{BackendError, CvBackend};
use crate::config::Config;
use crate::errors::AppError;
use crate::models::cv::SubmissionPayload;
use crate::storage::SessionStores;
use crate::wizard::machine::Blocked;
use crate::wizard::{SubmitOutcome, Wizard};

pub type SharedWizard = Arc<Mutex<Wizard>>;

/// How often idle sessions are looked for.
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// A wizard held in memory, with the last time a request reached it.
struct LiveSession {
    wizard: SharedWizard,
    last_seen: Instant,
}

impl LiveSession {
    fn new(wizard: SharedWizard) -> Self {
        Self {
            wizard,
            last_seen: Instant::now(),
        }
    }

    /// Busy sessions are locked by a request or waiting on a submission.
    fn is_busy(&self) -> bool {
        self.wizard
            .try_lock()
            .map(|wizard| wizard.state().submitting)
            .unwrap_or(true)
    }
}

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub backend: Arc<dyn CvBackend>,
    /// Per-session document stores; memory or `SESSION_DIR`.
    pub stores: Arc<SessionStores>,
    /// Wizards currently mounted in this process.
    sessions: Arc<RwLock<HashMap<Uuid, LiveSession>>>,
}

impl AppState {
    pub fn new(config: Config, backend: Arc<dyn CvBackend>, stores: SessionStores) -> Self {
        Self {
            config,
            backend,
            stores: Arc::new(stores),
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Mounts a fresh wizard for a new session and starts its health check.
    pub async fn mount(&self, template_id: String) -> Result<(Uuid, SharedWizard), AppError> {
        let session = Uuid::new_v4();
        let store = self.stores.open(session)?;
        let wizard = self.track(session, Wizard::mount(store, template_id));
        self.sessions
            .write()
            .await
            .insert(session, LiveSession::new(wizard.clone()));
        info!("Mounted wizard for session {session}");
        self.spawn_health_check(wizard.clone());
        Ok((session, wizard))
    }

    /// Returns the session's wizard, remounting it from its store when this
    /// process no longer holds it.
    pub async fn wizard(&self, session: Uuid) -> Result<SharedWizard, AppError> {
        let mut sessions = self.sessions.write().await;
        if let Some(live) = sessions.get_mut(&session) {
            live.last_seen = Instant::now();
            return Ok(live.wizard.clone());
        }
        if !self.stores.contains(session) {
            return Err(AppError::NotFound(format!("Session {session} not found")));
        }

        let store = self.stores.open(session)?;
        let wizard = self.track(session, Wizard::resume(store));
        sessions.insert(session, LiveSession::new(wizard.clone()));
        drop(sessions);

        info!("Remounted wizard for session {session}");
        self.spawn_health_check(wizard.clone());
        Ok(wizard)
    }

    /// Drops a session's wizard from memory.
    pub async fn forget(&self, session: Uuid) {
        self.sessions.write().await.remove(&session);
    }

    /// Sends `payload` and settles the session's wizard with the answer.
    ///
    /// The backend call is bounded by `BACKEND_TIMEOUT_SECS` whatever the
    /// client implementation, so the wizard always leaves the submitting state.
    pub async fn settle_submit(
        self,
        session: Uuid,
        wizard: SharedWizard,
        payload: SubmissionPayload,
    ) -> Result<SubmitOutcome, Blocked> {
        let secs = self.config.backend_timeout_secs;
        let result = tokio::time::timeout(Duration::from_secs(secs), self.backend.submit(&payload))
            .await
            .unwrap_or(Err(BackendError::Timeout { secs }));

        let outcome = wizard.lock().await.finish_submit(result)?;
        if matches!(outcome, SubmitOutcome::Completed { .. }) {
            self.forget(session).await;
        }
        Ok(outcome)
    }

    /// Unloads sessions nobody has touched for `idle` and discards their
    /// stored documents. Returns how many were evicted.
    pub async fn evict_idle(&self, idle: Duration) -> usize {
        let now = Instant::now();
        let mut sessions = self.sessions.write().await;
        let expired: Vec<Uuid> = sessions
            .iter()
            .filter(|(_, live)| now.duration_since(live.last_seen) >= idle && !live.is_busy())
            .map(|(session, _)| *session)
            .collect();

        for session in &expired {
            sessions.remove(session);
            if let Err(e) = self.stores.discard(*session) {
                warn!("Failed to discard store for idle session {session}: {e}");
            }
        }
        if !expired.is_empty() {
            info!("Evicted {} idle session(s)", expired.len());
        }
        expired.len()
    }

    /// Starts the background task that evicts sessions idle for `SESSION_IDLE_SECS`.
    pub fn spawn_idle_sweeper(&self) {
        let state = self.clone();
        let idle = Duration::from_secs(self.config.session_idle_secs);
        let period = SWEEP_INTERVAL.min(idle).max(Duration::from_secs(1));
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                state.evict_idle(idle).await;
            }
        });
    }

    /// Wraps a wizard so its store is discarded once it completes.
    fn track(&self, session: Uuid, wizard: Wizard) -> SharedWizard {
        let stores = self.stores.clone();
        let wizard = wizard.on_complete(move || {
            if let Err(e) = stores.discard(session) {
                warn!("Failed to discard store for completed session {session}: {e}");
            }
        });
        Arc::new(Mutex::new(wizard))
    }

    fn spawn_health_check(&self, wizard: SharedWizard) {
        let backend = self.backend.clone();
        tokio::spawn(async move {
            let result = backend.health().await;
            wizard.lock().await.record_health(result);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend_client::SubmitResponse;
    use async_trait::async_trait;

    /// Healthy backend whose submissions never answer.
    struct HangingBackend;

    #[async_trait]
    impl CvBackend for HangingBackend {
        async fn health(&self) -> Result<bool, BackendError> {
            Ok(true)
        }

        async fn submit(&self, _payload: &SubmissionPayload) -> Result<SubmitResponse, BackendError> {
            std::future::pending().await
        }
    }

    fn state() -> AppState {
        let config = Config {
            backend_url: "http://backend.test".into(),
            backend_health_path: "/health".into(),
            backend_submit_path: "/submit".into(),
            backend_timeout_secs: 2,
            session_dir: None,
            session_idle_secs: 60,
            port: 0,
            rust_log: "info".into(),
        };
        AppState::new(config, Arc::new(HangingBackend), SessionStores::in_memory())
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_sessions_are_evicted() {
        let state = state();
        let (stale, _) = state.mount("1".into()).await.unwrap();
        tokio::time::advance(Duration::from_secs(45)).await;
        let (fresh, _) = state.mount("2".into()).await.unwrap();
        tokio::time::advance(Duration::from_secs(20)).await;

        assert_eq!(state.evict_idle(Duration::from_secs(60)).await, 1);
        assert!(matches!(state.wizard(stale).await, Err(AppError::NotFound(_))));
        assert!(!state.stores.contains(stale));
        assert!(state.wizard(fresh).await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_touched_session_is_kept() {
        let state = state();
        let (session, _) = state.mount("1".into()).await.unwrap();
        tokio::time::advance(Duration::from_secs(50)).await;
        state.wizard(session).await.unwrap();
        tokio::time::advance(Duration::from_secs(50)).await;

        assert_eq!(state.evict_idle(Duration::from_secs(60)).await, 0);
        assert!(state.wizard(session).await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_submitting_session_is_not_evicted() {
        let state = state();
        let (session, wizard) = state.mount("1".into()).await.unwrap();
        {
            let mut wizard = wizard.lock().await;
            wizard.record_health(Ok(true));
            for (path, value) in [
                ("personal.fullName", "Nimal"),
                ("personal.email", "a@b.co"),
                ("personal.whatsapp", "0771234567"),
            ] {
                wizard.set_field(path, value.into()).unwrap();
            }
            while !wizard.state().step.is_last() {
                wizard.next().unwrap();
            }
            wizard.begin_submit().unwrap();
        }
        tokio::time::advance(Duration::from_secs(120)).await;

        assert_eq!(state.evict_idle(Duration::from_secs(60)).await, 0);
        assert!(state.wizard(session).await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_hanging_submit_times_out_as_failure() {
        let state = state();
        let (session, wizard) = state.mount("1".into()).await.unwrap();
        let payload = {
            let mut wizard = wizard.lock().await;
            wizard.record_health(Ok(true));
            wizard.set_field("personal.fullName", "Nimal".into()).unwrap();
            wizard.set_field("personal.email", "a@b.co".into()).unwrap();
            wizard.set_field("personal.whatsapp", "0771234567".into()).unwrap();
            while !wizard.state().step.is_last() {
                wizard.next().unwrap();
            }
            wizard.begin_submit().unwrap()
        };

        let outcome = state
            .clone()
            .settle_submit(session, wizard.clone(), payload)
            .await
            .unwrap();
        assert_eq!(
            outcome,
            SubmitOutcome::Failed {
                reason: "Backend did not respond within 2s".into()
            }
        );
        assert!(!wizard.lock().await.state().submitting);
    }
}
