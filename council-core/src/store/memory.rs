//! Process-local Decision Store.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use super::{
    DecisionRecord, DecisionStore, DecisionSummary, SessionId, StoreResult, StoreState,
};
use crate::council::{ModelResponseResult, SynthesisResult};

/// In-memory store. Contents vanish with the process.
#[derive(Debug, Default)]
pub struct MemoryDecisionStore {
    state: RwLock<StoreState>,
}

impl MemoryDecisionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }
}

#[async_trait]
impl DecisionStore for MemoryDecisionStore {
    async fn create_session(&self, query: &str, chairman: &str) -> StoreResult<SessionId> {
        let id = self.state.write().await.create_session(query, chairman);
        debug!(session_id = id, "Session record created");
        Ok(id)
    }

    async fn append_response(
        &self,
        session_id: SessionId,
        response: &ModelResponseResult,
    ) -> StoreResult<()> {
        self.state
            .write()
            .await
            .append_response(session_id, response)
    }

    async fn append_synthesis(
        &self,
        session_id: SessionId,
        synthesis: &SynthesisResult,
    ) -> StoreResult<()> {
        self.state
            .write()
            .await
            .append_synthesis(session_id, synthesis)
    }

    async fn get_session(&self, session_id: SessionId) -> StoreResult<Option<DecisionRecord>> {
        Ok(self.state.read().await.get(session_id))
    }

    async fn list_sessions(&self, skip: usize, limit: usize) -> StoreResult<Vec<DecisionSummary>> {
        Ok(self.state.read().await.list(skip, limit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::council::DebatePoint;
    use std::time::Duration;

    #[tokio::test]
    async fn full_record_lifecycle() {
        let store = MemoryDecisionStore::new();
        let id = store.create_session("Tabs or spaces?", "chair").await.unwrap();

        store
            .append_response(
                id,
                &ModelResponseResult {
                    model_id: "a".into(),
                    text: "tabs".into(),
                    chunk_count: 1,
                    elapsed: Duration::from_secs(2),
                },
            )
            .await
            .unwrap();

        let synthesis = SynthesisResult {
            consensus_items: vec!["Be consistent".into()],
            debates: vec![DebatePoint::new("Width", "a vs b")],
            synthesis_text: "Pick one.".into(),
        };
        store.append_synthesis(id, &synthesis).await.unwrap();

        let record = store.get_session(id).await.unwrap().unwrap();
        assert_eq!(record.query, "Tabs or spaces?");
        assert_eq!(record.responses.len(), 1);
        assert_eq!(record.responses[0].elapsed_seconds, 2.0);
        assert_eq!(record.synthesis.unwrap().to_result(), synthesis);
        assert!(record.updated_at >= record.created_at);
    }

    #[tokio::test]
    async fn unknown_session_reads_as_none() {
        let store = MemoryDecisionStore::new();
        assert!(store.get_session(9).await.unwrap().is_none());
        assert!(store.list_sessions(0, 10).await.unwrap().is_empty());
    }
}
