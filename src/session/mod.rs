//! Guided disambiguation sessions
//!
//! `SessionEngine` drives the clarification conversation: it detects
//! ambiguities, asks one question at a time, analyzes each reply, and applies
//! accepted resolutions back onto the project record. Components are
//! injected explicitly; the engine owns one detector and one analyzer and
//! drives any number of sessions.

pub mod analyzer;
pub mod registry;
pub mod types;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{info, warn};

use crate::ambiguity::{
    AmbiguityDetector, AmbiguityItem, AmbiguityStatus, ResolutionRecord, ResolvedBy,
};
use crate::config::EngineConfig;
use crate::error::{EngineResult, SessionError, SessionResult};
use crate::project::Project;

pub use analyzer::{Analysis, AnswerAnalyzer};
pub use registry::SessionRegistry;
pub use types::{ChatMessage, DisambiguationSession, MessageRole, QuickReply, SessionState};

/// Confidence recorded when a default candidate is applied after the
/// clarification attempts are exhausted.
const DEFAULT_RESOLUTION_CONFIDENCE: f64 = 0.5;

/// Optional text-completion fallback consulted when deterministic analysis
/// fails. Its output is untrusted: it is re-validated through the same
/// analyzers and never applied verbatim.
#[async_trait]
pub trait InferenceClient: Send + Sync {
    async fn suggest(
        &self,
        item: &AmbiguityItem,
        transcript: &[ChatMessage],
    ) -> EngineResult<String>;
}

/// Drives disambiguation sessions; one engine serves many sessions.
pub struct SessionEngine {
    detector: AmbiguityDetector,
    analyzer: AnswerAnalyzer,
    config: EngineConfig,
    inference: Option<Box<dyn InferenceClient>>,
}

impl SessionEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            detector: AmbiguityDetector::new(config.clone()),
            analyzer: AnswerAnalyzer::new(),
            config,
            inference: None,
        }
    }

    pub fn with_inference(mut self, inference: Box<dyn InferenceClient>) -> Self {
        self.inference = Some(inference);
        self
    }

    /// Run detection and open a session. With nothing to clarify the session
    /// completes immediately.
    pub fn start(&self, project: Project) -> DisambiguationSession {
        let mut session = DisambiguationSession::new(project);
        session.state = SessionState::Detecting;

        let items = self.detector.detect(&session.project);
        session.detected_count = items.len();
        session.queue = items.into();

        if session.queue.is_empty() {
            session.state = SessionState::Completed;
            session.transcript.push(ChatMessage::assistant(
                "No se detectaron ambigüedades en el proyecto. \
                 Puede continuar con la verificación.",
            ));
        } else {
            session.state = SessionState::Resolving;
            if let Some(item) = session.queue.front_mut() {
                item.advance_status(AmbiguityStatus::Resolving);
            }
            let question = self.question_for(session.queue.front());
            if let Some(question) = question {
                session.transcript.push(question);
            }
        }
        info!(
            session_id = %session.session_id,
            detected = session.detected_count,
            "session started"
        );
        session
    }

    /// Process one user message. Exactly one item is worked on per call; the
    /// queue advances only when the active item is resolved or given up on.
    pub async fn handle_message(
        &self,
        session: &mut DisambiguationSession,
        text: &str,
    ) -> SessionResult<ChatMessage> {
        if session.state != SessionState::Resolving {
            return Err(SessionError::InvalidState {
                session_id: session.session_id.to_string(),
                state: format!("{:?}", session.state),
            });
        }
        session.touch();
        session.transcript.push(ChatMessage::user(text));

        let item = session
            .queue
            .front()
            .cloned()
            .ok_or_else(|| SessionError::InvalidState {
                session_id: session.session_id.to_string(),
                state: "resolving with empty queue".to_string(),
            })?;

        // A quick-reply click sends the candidate value itself.
        if let Some(value) = self.quick_reply_value(&item, text) {
            self.accept(session, &item, value, 1.0, ResolvedBy::User, "Opción seleccionada");
            return Ok(self.advance(session));
        }

        let analysis = self.analyzer.analyze(&item, text);
        if let Some(value) = analysis
            .value
            .filter(|_| analysis.confidence >= self.config.accept_confidence)
        {
            self.accept(
                session,
                &item,
                value,
                analysis.confidence,
                ResolvedBy::User,
                &analysis.note,
            );
            return Ok(self.advance(session));
        }

        // Deterministic analysis failed; consult the inference fallback and
        // re-validate whatever it suggests.
        if let Some(inference) = &self.inference {
            match inference.suggest(&item, &session.transcript).await {
                Ok(suggestion) => {
                    let revalidated = self.analyzer.analyze(&item, &suggestion);
                    if let Some(value) = revalidated
                        .value
                        .filter(|_| revalidated.confidence >= self.config.accept_confidence)
                    {
                        self.accept(
                            session,
                            &item,
                            value,
                            revalidated.confidence,
                            ResolvedBy::Inferred,
                            &revalidated.note,
                        );
                        return Ok(self.advance(session));
                    }
                }
                Err(err) => warn!(%err, "inference fallback failed"),
            }
        }

        session.attempts += 1;
        if session.attempts < self.config.max_clarification_attempts {
            // Stay on the same item and restate why the answer fell short.
            let question = item
                .suggested_questions
                .first()
                .cloned()
                .unwrap_or_else(|| item.title.clone());
            let reply = ChatMessage::assistant(format!("{} {question}", analysis.note))
                .with_quick_replies(quick_replies(&item));
            session.transcript.push(reply.clone());
            return Ok(reply);
        }

        // Attempts exhausted: fall back to the first candidate when the item
        // has machine-usable options, otherwise give the item up.
        session.attempts = 0;
        if let Some(candidate) = item.possible_resolutions.first() {
            let value = candidate.value.clone();
            self.accept(
                session,
                &item,
                value,
                DEFAULT_RESOLUTION_CONFIDENCE,
                ResolvedBy::Default,
                "Valor por defecto aplicado tras agotar las aclaraciones",
            );
        } else {
            let mut failed = session.queue.pop_front().unwrap_or(item);
            failed.advance_status(AmbiguityStatus::Failed);
            info!(item = %failed.id, "ambiguity given up after retries");
            session.failed.push(failed);
        }
        Ok(self.advance(session))
    }

    fn quick_reply_value(&self, item: &AmbiguityItem, text: &str) -> Option<Value> {
        let trimmed = text.trim();
        item.possible_resolutions
            .iter()
            .find(|c| {
                c.value.as_str() == Some(trimmed)
                    || c.description.eq_ignore_ascii_case(trimmed)
            })
            .map(|c| c.value.clone())
    }

    fn accept(
        &self,
        session: &mut DisambiguationSession,
        item: &AmbiguityItem,
        value: Value,
        confidence: f64,
        resolved_by: ResolvedBy,
        note: &str,
    ) {
        self.detector
            .apply_resolution(&mut session.project, item, &value);
        session.resolutions.push(ResolutionRecord::new(
            item.id.clone(),
            value,
            confidence,
            resolved_by,
            note,
        ));
        if let Some(mut resolved) = session.queue.pop_front() {
            resolved.advance_status(AmbiguityStatus::Resolved);
        }
        session.attempts = 0;
        info!(session_id = %session.session_id, item = %item.id, ?resolved_by, "ambiguity resolved");
    }

    /// Move to the next item or complete the session, returning the reply.
    fn advance(&self, session: &mut DisambiguationSession) -> ChatMessage {
        debug_assert!(session.accounting_holds());
        let reply = match session.queue.front_mut() {
            Some(item) => {
                item.advance_status(AmbiguityStatus::Resolving);
                let item = &*item;
                let question = item
                    .suggested_questions
                    .first()
                    .cloned()
                    .unwrap_or_else(|| item.title.clone());
                ChatMessage::assistant(question).with_quick_replies(quick_replies(item))
            }
            None => {
                session.state = SessionState::Completed;
                ChatMessage::assistant(format!(
                    "Aclaraciones completadas: {} resueltas, {} sin resolver. \
                     Puede continuar con la verificación.",
                    session.resolutions.len(),
                    session.failed.len()
                ))
            }
        };
        session.transcript.push(reply.clone());
        reply
    }

    fn question_for(&self, item: Option<&AmbiguityItem>) -> Option<ChatMessage> {
        let item = item?;
        let question = item
            .suggested_questions
            .first()
            .cloned()
            .unwrap_or_else(|| item.title.clone());
        Some(ChatMessage::assistant(question).with_quick_replies(quick_replies(item)))
    }
}

fn quick_replies(item: &AmbiguityItem) -> Vec<QuickReply> {
    item.possible_resolutions
        .iter()
        .map(|c| QuickReply {
            label: c.description.clone(),
            value: c.value.clone(),
        })
        .collect()
}
