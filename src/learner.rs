use std::collections::BTreeMap;

use futures::Stream;
use tokio::sync::{RwLock, broadcast};
use tracing::warn;

use crate::{error::PaxosError, types::PaxosValue};

/// Records the value chosen for each sequence number.
///
/// `learn` must be idempotent, and a learner must cope with never being taught a value:
/// it can always recover one by running phase one itself.
#[async_trait::async_trait]
pub trait PaxosLearner: Send + Sync + 'static {
    fn identity(&self) -> &str;

    async fn learn(&self, seq: i64, value: &PaxosValue) -> Result<(), PaxosError>;

    async fn learned_value(&self, seq: i64) -> Result<Option<PaxosValue>, PaxosError>;

    async fn greatest_learned_value(&self) -> Result<Option<PaxosValue>, PaxosError>;

    /// Every learned value with a sequence number `>= seq`, in sequence order.
    async fn learned_values_since(&self, seq: i64) -> Result<Vec<PaxosValue>, PaxosError>;
}

/// In-memory learner.
///
/// The first value taught for a sequence number wins. Teaching it again is a no-op and a
/// conflicting value is logged and dropped.
pub struct InMemoryLearner {
    identity: String,
    values: RwLock<BTreeMap<i64, PaxosValue>>,
    sender: broadcast::Sender<PaxosValue>,
}

impl InMemoryLearner {
    pub fn new(identity: impl Into<String>) -> Self {
        Self::with_buffer(identity, 1000)
    }

    pub fn with_buffer(identity: impl Into<String>, buffer: usize) -> Self {
        let (sender, _) = broadcast::channel(buffer);
        Self {
            identity: identity.into(),
            values: RwLock::new(BTreeMap::new()),
            sender,
        }
    }

    /// Stream of values as they are learned from now on.
    ///
    /// A subscriber that falls behind the buffer skips the values it missed.
    pub fn subscribe_learned(&self) -> impl Stream<Item = PaxosValue> + Send + 'static {
        let mut receiver = self.sender.subscribe();
        async_stream::stream! {
            loop {
                match receiver.recv().await {
                    Ok(value) => yield value,
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }

    pub async fn len(&self) -> usize {
        self.values.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.values.read().await.is_empty()
    }
}

#[async_trait::async_trait]
impl PaxosLearner for InMemoryLearner {
    fn identity(&self) -> &str {
        &self.identity
    }

    async fn learn(&self, seq: i64, value: &PaxosValue) -> Result<(), PaxosError> {
        let mut values = self.values.write().await;
        if let Some(existing) = values.get(&seq) {
            if existing != value {
                warn!(
                    learner = %self.identity,
                    seq,
                    "ignoring conflicting value for an already learned sequence"
                );
            }
            return Ok(());
        }
        values.insert(seq, value.clone());
        drop(values);
        let _ = self.sender.send(value.clone());
        Ok(())
    }

    async fn learned_value(&self, seq: i64) -> Result<Option<PaxosValue>, PaxosError> {
        Ok(self.values.read().await.get(&seq).cloned())
    }

    async fn greatest_learned_value(&self) -> Result<Option<PaxosValue>, PaxosError> {
        Ok(self
            .values
            .read()
            .await
            .last_key_value()
            .map(|(_, value)| value.clone()))
    }

    async fn learned_values_since(&self, seq: i64) -> Result<Vec<PaxosValue>, PaxosError> {
        Ok(self
            .values
            .read()
            .await
            .range(seq..)
            .map(|(_, value)| value.clone())
            .collect())
    }
}
