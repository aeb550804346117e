//! JSON-file Decision Store.
//!
//! The whole store is one pretty-printed JSON snapshot, rewritten after every
//! mutation (write to a sibling temp file, then rename). No durability is
//! promised beyond that.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::{
    DecisionRecord, DecisionStore, DecisionSummary, SessionId, StoreResult, StoreState,
};
use crate::council::{ModelResponseResult, SynthesisResult};
use crate::errors::StoreError;

/// On-disk layout.
#[derive(Debug, Serialize, Deserialize)]
struct StoreSnapshot<S> {
    /// Schema version for forward compatibility.
    version: u32,
    state: S,
}

/// Current schema version.
const CURRENT_VERSION: u32 = 1;

/// Decision Store backed by a single JSON file.
#[derive(Debug)]
pub struct FileDecisionStore {
    path: PathBuf,
    state: Mutex<StoreState>,
}

impl FileDecisionStore {
    /// Open the store at `path`, creating an empty one if the file is missing.
    pub async fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let path = path.into();
        let state = match tokio::fs::read_to_string(&path).await {
            Ok(json) => {
                let snapshot: StoreSnapshot<StoreState> = serde_json::from_str(&json)?;
                if snapshot.version > CURRENT_VERSION {
                    return Err(StoreError::Io(std::io::Error::new(
                        std::io::ErrorKind::InvalidData,
                        format!(
                            "store version {} is newer than supported {}",
                            snapshot.version,
                            CURRENT_VERSION
                        ),
                    )));
                }
                info!(path = %path.display(), "Decision store loaded");
                snapshot.state
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %path.display(), "Decision store not found, starting empty");
                StoreState::default()
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            path,
            state: Mutex::new(state),
        })
    }

    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// Apply `mutate` to a copy of the state, write the copy, and only then
    /// make it current. A failed write leaves the in-memory state untouched.
    async fn commit<T>(
        &self,
        mutate: impl FnOnce(&mut StoreState) -> StoreResult<T>,
    ) -> StoreResult<T> {
        let mut state = self.state.lock().await;
        let mut next = state.clone();
        let value = mutate(&mut next)?;
        self.persist(&next).await?;
        *state = next;
        Ok(value)
    }

    async fn persist(&self, state: &StoreState) -> StoreResult<()> {
        let snapshot = StoreSnapshot {
            version: CURRENT_VERSION,
            state,
        };
        let json = serde_json::to_string_pretty(&snapshot)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        debug!(path = %self.path.display(), "Decision store persisted");
        Ok(())
    }
}

#[async_trait]
impl DecisionStore for FileDecisionStore {
    async fn create_session(&self, query: &str, chairman: &str) -> StoreResult<SessionId> {
        self.commit(|state| Ok(state.create_session(query, chairman)))
            .await
    }

    async fn append_response(
        &self,
        session_id: SessionId,
        response: &ModelResponseResult,
    ) -> StoreResult<()> {
        self.commit(|state| state.append_response(session_id, response))
            .await
    }

    async fn append_synthesis(
        &self,
        session_id: SessionId,
        synthesis: &SynthesisResult,
    ) -> StoreResult<()> {
        self.commit(|state| state.append_synthesis(session_id, synthesis))
            .await
    }

    async fn get_session(&self, session_id: SessionId) -> StoreResult<Option<DecisionRecord>> {
        Ok(self.state.lock().await.get(session_id))
    }

    async fn list_sessions(&self, skip: usize, limit: usize) -> StoreResult<Vec<DecisionSummary>> {
        Ok(self.state.lock().await.list(skip, limit))
    }
}
