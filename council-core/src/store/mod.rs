//! Decision Store: persistence seam for debate sessions.
//!
//! The engine only appends: it creates a session, appends each successful
//! member response, and appends at most one synthesis. Reads (`get_session`,
//! `list_sessions`) serve history front ends.
//!
//! Two backends ship with the crate:
//! - [`MemoryDecisionStore`]: process-local, for tests and one-shot runs.
//! - [`FileDecisionStore`]: the same model snapshotted to a JSON file.

pub mod file;
pub mod memory;

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::council::{DebatePoint, ModelResponseResult, SynthesisResult};
use crate::errors::StoreError;

pub use file::FileDecisionStore;
pub use memory::MemoryDecisionStore;

/// Identifier handed out by [`DecisionStore::create_session`].
pub type SessionId = u64;

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Shared reference to a store backend
pub type SharedDecisionStore = Arc<dyn DecisionStore>;

/// A stored council member response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredResponse {
    pub model_id: String,
    pub text: String,
    pub chunk_count: u64,
    pub elapsed_seconds: f64,
    pub created_at: DateTime<Utc>,
}

/// A stored chairman synthesis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredSynthesis {
    pub consensus_items: Vec<String>,
    pub debates: Vec<DebatePoint>,
    pub synthesis_text: String,
    pub created_at: DateTime<Utc>,
}

impl StoredSynthesis {
    pub fn to_result(&self) -> SynthesisResult {
        SynthesisResult {
            consensus_items: self.consensus_items.clone(),
            debates: self.debates.clone(),
            synthesis_text: self.synthesis_text.clone(),
        }
    }
}

/// Everything persisted for one debate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionRecord {
    pub id: SessionId,
    pub query: String,
    pub chairman: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub responses: Vec<StoredResponse>,
    pub synthesis: Option<StoredSynthesis>,
}

impl DecisionRecord {
    pub fn summary(&self) -> DecisionSummary {
        DecisionSummary {
            id: self.id,
            query: self.query.clone(),
            chairman: self.chairman.clone(),
            created_at: self.created_at,
            response_count: self.responses.len(),
            has_synthesis: self.synthesis.is_some(),
        }
    }
}

/// List view of a [`DecisionRecord`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionSummary {
    pub id: SessionId,
    pub query: String,
    pub chairman: String,
    pub created_at: DateTime<Utc>,
    pub response_count: usize,
    pub has_synthesis: bool,
}

/// Persistence contract consumed by the engine.
#[async_trait]
pub trait DecisionStore: Send + Sync {
    /// Open a new session record and return its id.
    async fn create_session(&self, query: &str, chairman: &str) -> StoreResult<SessionId>;

    /// Record one successful council response.
    async fn append_response(
        &self,
        session_id: SessionId,
        response: &ModelResponseResult,
    ) -> StoreResult<()>;

    /// Record the chairman synthesis. A session holds at most one.
    async fn append_synthesis(
        &self,
        session_id: SessionId,
        synthesis: &SynthesisResult,
    ) -> StoreResult<()>;

    async fn get_session(&self, session_id: SessionId) -> StoreResult<Option<DecisionRecord>>;

    /// Newest first.
    async fn list_sessions(&self, skip: usize, limit: usize) -> StoreResult<Vec<DecisionSummary>>;
}

/// Backend-independent state shared by the memory and file stores.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct StoreState {
    next_id: SessionId,
    records: BTreeMap<SessionId, DecisionRecord>,
}

impl StoreState {
    pub(crate) fn create_session(&mut self, query: &str, chairman: &str) -> SessionId {
        self.next_id += 1;
        let id = self.next_id;
        let now = Utc::now();
        self.records.insert(
            id,
            DecisionRecord {
                id,
                query: query.to_string(),
                chairman: chairman.to_string(),
                created_at: now,
                updated_at: now,
                responses: Vec::new(),
                synthesis: None,
            },
        );
        id
    }

    pub(crate) fn append_response(
        &mut self,
        session_id: SessionId,
        response: &ModelResponseResult,
    ) -> StoreResult<()> {
        let record = self.record_mut(session_id)?;
        let now = Utc::now();
        record.responses.push(StoredResponse {
            model_id: response.model_id.clone(),
            text: response.text.clone(),
            chunk_count: response.chunk_count,
            elapsed_seconds: response.elapsed_seconds(),
            created_at: now,
        });
        record.updated_at = now;
        Ok(())
    }

    pub(crate) fn append_synthesis(
        &mut self,
        session_id: SessionId,
        synthesis: &SynthesisResult,
    ) -> StoreResult<()> {
        let record = self.record_mut(session_id)?;
        if record.synthesis.is_some() {
            return Err(StoreError::SynthesisExists(session_id));
        }
        let now = Utc::now();
        record.synthesis = Some(StoredSynthesis {
            consensus_items: synthesis.consensus_items.clone(),
            debates: synthesis.debates.clone(),
            synthesis_text: synthesis.synthesis_text.clone(),
            created_at: now,
        });
        record.updated_at = now;
        Ok(())
    }

    pub(crate) fn get(&self, session_id: SessionId) -> Option<DecisionRecord> {
        self.records.get(&session_id).cloned()
    }

    pub(crate) fn list(&self, skip: usize, limit: usize) -> Vec<DecisionSummary> {
        // Ids are allocated in creation order, so reverse id order is newest first.
        self.records
            .values()
            .rev()
            .skip(skip)
            .take(limit)
            .map(DecisionRecord::summary)
            .collect()
    }

    fn record_mut(&mut self, session_id: SessionId) -> StoreResult<&mut DecisionRecord> {
        self.records
            .get_mut(&session_id)
            .ok_or(StoreError::NotFound(session_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn response(model: &str) -> ModelResponseResult {
        ModelResponseResult {
            model_id: model.to_string(),
            text: format!("{model} says hi"),
            chunk_count: 3,
            elapsed: Duration::from_millis(250),
        }
    }

    #[test]
    fn ids_are_monotonic() {
        let mut state = StoreState::default();
        let a = state.create_session("q1", "chair");
        let b = state.create_session("q2", "chair");
        assert_eq!(a, 1);
        assert_eq!(b, 2);
    }

    #[test]
    fn append_to_unknown_session_fails() {
        let mut state = StoreState::default();
        let err = state.append_response(42, &response("m")).unwrap_err();
        assert!(matches!(err, StoreError::NotFound(42)));
    }

    #[test]
    fn second_synthesis_rejected() {
        let mut state = StoreState::default();
        let id = state.create_session("q", "chair");
        state
            .append_synthesis(id, &SynthesisResult::default())
            .unwrap();
        let err = state
            .append_synthesis(id, &SynthesisResult::default())
            .unwrap_err();
        assert!(matches!(err, StoreError::SynthesisExists(i) if i == id));
    }

    #[test]
    fn list_is_newest_first_and_paginated() {
        let mut state = StoreState::default();
        for i in 0..5 {
            state.create_session(&format!("q{i}"), "chair");
        }
        let page = state.list(1, 2);
        let ids: Vec<_> = page.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![4, 3]);
        assert!(state.list(10, 5).is_empty());
    }

    #[test]
    fn summary_counts_responses() {
        let mut state = StoreState::default();
        let id = state.create_session("q", "chair");
        state.append_response(id, &response("a")).unwrap();
        state.append_response(id, &response("b")).unwrap();
        let summary = state.get(id).unwrap().summary();
        assert_eq!(summary.response_count, 2);
        assert!(!summary.has_synthesis);
    }
}
