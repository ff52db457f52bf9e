//! Session state model
//!
//! A disambiguation session is single-threaded cooperative state: one user
//! message is processed at a time and the queue is never mutated
//! concurrently. The state machine is `Idle → Detecting → (Completed |
//! Resolving) → Completed`; `Completed` is the only terminal state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::VecDeque;
use uuid::Uuid;

use crate::ambiguity::{AmbiguityItem, ResolutionRecord};
use crate::project::Project;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    Detecting,
    Resolving,
    Completed,
}

impl SessionState {
    pub fn is_terminal(self) -> bool {
        self == SessionState::Completed
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    User,
    Assistant,
    System,
}

/// A quick-reply option offered with a clarifying question; `value` is the
/// machine-usable resolution applied when the option is picked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuickReply {
    pub label: String,
    pub value: Value,
}

/// One turn of the session transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub quick_replies: Vec<QuickReply>,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
            timestamp: Utc::now(),
            quick_replies: vec![],
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
            timestamp: Utc::now(),
            quick_replies: vec![],
        }
    }

    pub fn with_quick_replies(mut self, quick_replies: Vec<QuickReply>) -> Self {
        self.quick_replies = quick_replies;
        self
    }
}

/// The mutable state of one guided clarification conversation.
///
/// Behavior lives in `SessionEngine`; this struct is the data it drives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisambiguationSession {
    pub session_id: Uuid,
    pub project: Project,
    pub state: SessionState,
    /// Unresolved items, front is the active one.
    pub queue: VecDeque<AmbiguityItem>,
    /// Items given up on after exhausting clarification attempts.
    pub failed: Vec<AmbiguityItem>,
    pub resolutions: Vec<ResolutionRecord>,
    pub transcript: Vec<ChatMessage>,
    /// Clarification attempts spent on the active item.
    pub attempts: u32,
    /// Items found by the initial detection pass.
    pub detected_count: usize,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

impl DisambiguationSession {
    pub fn new(project: Project) -> Self {
        let now = Utc::now();
        Self {
            session_id: Uuid::new_v4(),
            project,
            state: SessionState::Idle,
            queue: VecDeque::new(),
            failed: Vec::new(),
            resolutions: Vec::new(),
            transcript: Vec::new(),
            attempts: 0,
            detected_count: 0,
            created_at: now,
            last_activity: now,
        }
    }

    pub fn active_item(&self) -> Option<&AmbiguityItem> {
        self.queue.front()
    }

    /// Every detected item is accounted for exactly once.
    pub fn accounting_holds(&self) -> bool {
        self.resolutions.len() + self.failed.len() + self.queue.len() == self.detected_count
    }

    pub fn touch(&mut self) {
        self.last_activity = Utc::now();
    }

    pub fn idle_for(&self, now: DateTime<Utc>) -> chrono::Duration {
        now - self.last_activity
    }
}
