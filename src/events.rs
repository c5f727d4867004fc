//! Notifications a proposer emits as rounds progress.
//!
//! `propose` only returns the chosen payload or an error. Callers that want more, such as the
//! proposal id that won a sequence number or the learners that missed a chosen value and need
//! to catch up out of band, subscribe to the proposer's [`ProposerEventBus`]. Publishing never
//! blocks or fails a round.

use tokio::sync::broadcast;
use tracing::trace;

use crate::types::{PaxosPhase, PaxosValue, ProposalId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProposerEvent {
    /// A quorum of acceptors accepted `value`; it is now chosen for `seq`.
    ValueChosen {
        seq: i64,
        proposal_id: ProposalId,
        value: PaxosValue,
    },
    /// The round could not reach a quorum in `phase`.
    RoundFailed {
        seq: i64,
        proposal_id: ProposalId,
        phase: PaxosPhase,
    },
    /// Teaching a learner the chosen value failed. The round itself still succeeded.
    LearnerFailed {
        seq: i64,
        learner: String,
        reason: String,
    },
}

/// Sink for [`ProposerEvent`]s. Cloned into every learner broadcast task of a round.
pub trait ProposerEventBus: Clone + Send + Sync + 'static {
    /// Type returned to consumers that subscribe to proposer events.
    type Receiver;

    fn subscribe(&self) -> Self::Receiver;
    fn publish(&self, event: ProposerEvent);
}

/// Fan-out to any number of subscribers. A subscriber that falls more than the buffer behind
/// sees `RecvError::Lagged` and loses the oldest events.
#[derive(Clone)]
pub struct BroadcastEventBus {
    sender: broadcast::Sender<ProposerEvent>,
}

impl BroadcastEventBus {
    pub fn new(buffer: usize) -> Self {
        let (sender, _) = broadcast::channel(buffer.max(1));
        Self { sender }
    }
}

impl Default for BroadcastEventBus {
    fn default() -> Self {
        Self::new(1000)
    }
}

impl ProposerEventBus for BroadcastEventBus {
    type Receiver = broadcast::Receiver<ProposerEvent>;

    fn subscribe(&self) -> Self::Receiver {
        self.sender.subscribe()
    }

    fn publish(&self, event: ProposerEvent) {
        if let Err(broadcast::error::SendError(event)) = self.sender.send(event) {
            trace!(?event, "no subscribers for proposer event");
        }
    }
}
