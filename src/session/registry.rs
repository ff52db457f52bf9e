//! Session registry
//!
//! Shared id → session mapping. The map lock is only held while looking a
//! session up; each session sits behind its own mutex, so a message being
//! processed on one session (including a slow inference fallback) never
//! blocks the others. Idle sessions are reaped by `expire_idle` sweeps since
//! abandoned conversations would otherwise accumulate forever.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::info;
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::error::{SessionError, SessionResult};
use crate::session::types::{ChatMessage, DisambiguationSession};
use crate::session::SessionEngine;

type SessionSlot = Arc<Mutex<DisambiguationSession>>;

pub struct SessionRegistry {
    sessions: Mutex<HashMap<Uuid, SessionSlot>>,
    idle_timeout: chrono::Duration,
}

impl SessionRegistry {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            idle_timeout: config.session_idle_timeout,
        }
    }

    /// Register a session and return its id.
    pub async fn insert(&self, session: DisambiguationSession) -> Uuid {
        let id = session.session_id;
        self.sessions
            .lock()
            .await
            .insert(id, Arc::new(Mutex::new(session)));
        id
    }

    /// Route one user message to a session. Only that session's lock is held
    /// while the engine works.
    pub async fn handle_message(
        &self,
        engine: &SessionEngine,
        session_id: Uuid,
        text: &str,
    ) -> SessionResult<ChatMessage> {
        let slot = self.slot(session_id).await?;
        let mut session = slot.lock().await;
        engine.handle_message(&mut session, text).await
    }

    /// Snapshot of a session's current state.
    pub async fn get(&self, session_id: Uuid) -> SessionResult<DisambiguationSession> {
        let slot = self.slot(session_id).await?;
        let session = slot.lock().await;
        Ok(session.clone())
    }

    /// Remove and return a session (completed or abandoned).
    pub async fn remove(&self, session_id: Uuid) -> SessionResult<DisambiguationSession> {
        let slot = self
            .sessions
            .lock()
            .await
            .remove(&session_id)
            .ok_or_else(|| SessionError::NotFound {
                session_id: session_id.to_string(),
            })?;
        match Arc::try_unwrap(slot) {
            Ok(mutex) => Ok(mutex.into_inner()),
            // Another task still holds the slot; hand back a snapshot.
            Err(slot) => Ok(slot.lock().await.clone()),
        }
    }

    /// Drop every session idle longer than the configured timeout and return
    /// the reaped ids.
    pub async fn expire_idle(&self, now: DateTime<Utc>) -> Vec<Uuid> {
        let mut sessions = self.sessions.lock().await;
        let expired: Vec<Uuid> = sessions
            .iter()
            .filter_map(|(id, slot)| {
                // A locked slot is mid-message, hence not idle.
                let session = slot.try_lock().ok()?;
                (session.idle_for(now) > self.idle_timeout).then_some(*id)
            })
            .collect();
        for id in &expired {
            sessions.remove(id);
        }
        if !expired.is_empty() {
            info!(count = expired.len(), "expired idle sessions");
        }
        expired
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.lock().await.is_empty()
    }

    async fn slot(&self, session_id: Uuid) -> SessionResult<SessionSlot> {
        self.sessions
            .lock()
            .await
            .get(&session_id)
            .cloned()
            .ok_or_else(|| SessionError::NotFound {
                session_id: session_id.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ambiguity::AmbiguityItem;
    use crate::error::EngineResult;
    use crate::project::Project;
    use crate::session::InferenceClient;
    use async_trait::async_trait;
    use chrono::Duration;
    use serde_json::json;

    fn engine() -> SessionEngine {
        SessionEngine::new(EngineConfig::default())
    }

    fn incomplete_project() -> Project {
        Project::from_value(json!({
            "project_id": "P-R",
            "is_existing_building": true,
            "has_secondary_uses": false,
            "files": ["memoria.pdf", "planos.pdf"]
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_insert_route_and_remove() {
        let e = engine();
        let registry = SessionRegistry::new(&EngineConfig::default());

        let id = registry.insert(e.start(incomplete_project())).await;
        assert_eq!(registry.len().await, 1);

        registry.handle_message(&e, id, "residencial").await.unwrap();
        let session = registry.get(id).await.unwrap();
        assert_eq!(session.resolutions.len(), 1);

        let removed = registry.remove(id).await.unwrap();
        assert_eq!(removed.session_id, id);
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn test_unknown_session_is_not_found() {
        let registry = SessionRegistry::new(&EngineConfig::default());
        let err = registry.get(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, SessionError::NotFound { .. }));

        let err = registry
            .handle_message(&engine(), Uuid::new_v4(), "hola")
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_expire_idle_reaps_old_sessions() {
        let e = engine();
        let registry = SessionRegistry::new(&EngineConfig::default());
        let id = registry.insert(e.start(incomplete_project())).await;

        // Nothing expires inside the timeout window.
        assert!(registry.expire_idle(Utc::now()).await.is_empty());

        let later = Utc::now() + Duration::minutes(31);
        let expired = registry.expire_idle(later).await;
        assert_eq!(expired, vec![id]);
        assert!(registry.is_empty().await);
    }

    struct SlowInference;

    #[async_trait]
    impl InferenceClient for SlowInference {
        async fn suggest(
            &self,
            _item: &AmbiguityItem,
            _transcript: &[ChatMessage],
        ) -> EngineResult<String> {
            tokio::time::sleep(std::time::Duration::from_millis(200)).await;
            Ok("residencial".to_string())
        }
    }

    #[tokio::test]
    async fn test_slow_session_does_not_block_others() {
        let e = Arc::new(
            SessionEngine::new(EngineConfig::default()).with_inference(Box::new(SlowInference)),
        );
        let registry = Arc::new(SessionRegistry::new(&EngineConfig::default()));

        let slow_id = registry.insert(e.start(incomplete_project())).await;
        let fast_id = registry.insert(e.start(incomplete_project())).await;

        // The slow session waits 200ms on the inference fallback.
        let slow = {
            let e = Arc::clone(&e);
            let registry = Arc::clone(&registry);
            tokio::spawn(async move { registry.handle_message(&e, slow_id, "???").await })
        };
        // Let the spawned task reach the inference await.
        tokio::task::yield_now().await;

        // The other session is served while the slow one is still waiting.
        tokio::time::timeout(
            std::time::Duration::from_millis(100),
            registry.handle_message(&e, fast_id, "garaje-aparcamiento"),
        )
        .await
        .expect("other sessions must not wait on the slow one")
        .unwrap();

        slow.await.unwrap().unwrap();
        let slow_session = registry.get(slow_id).await.unwrap();
        assert_eq!(slow_session.resolutions.len(), 1);
    }
}
