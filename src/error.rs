use crate::types::PaxosPhase;

#[derive(Debug, thiserror::Error)]
pub enum PaxosError {
    #[error("Failed to acquire quorum in paxos phase {phase}")]
    RoundFailure { phase: PaxosPhase },
    #[error("Proposal numbers exhausted: the counter reached {last}")]
    ProposalNumbersExhausted { last: u64 },

    #[error(
        "Quorum size {quorum_size} must be a majority of the {acceptor_count} acceptors and no larger than the acceptor set"
    )]
    InvalidQuorumSize {
        quorum_size: usize,
        acceptor_count: usize,
    },
    #[error("Invalid proposer configuration: {0}")]
    InvalidConfiguration(String),
    #[error("No tokio runtime available: {0}")]
    NoRuntime(#[from] tokio::runtime::TryCurrentError),

    #[error("Peer {peer} unavailable: {reason}")]
    PeerUnavailable { peer: String, reason: String },

    #[error("Malformed message: {0}")]
    MalformedMessage(String),
    #[error("Failed to decode message: {0}")]
    Decode(#[from] prost::DecodeError),
}

impl PaxosError {
    /// Round failures are the only errors a caller can fix by proposing again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, PaxosError::RoundFailure { .. })
    }

    pub(crate) fn peer_unavailable(peer: impl Into<String>, reason: impl ToString) -> Self {
        PaxosError::PeerUnavailable {
            peer: peer.into(),
            reason: reason.to_string(),
        }
    }
}
