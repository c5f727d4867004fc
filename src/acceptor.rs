use std::collections::BTreeMap;

use parking_lot::Mutex;
use tracing::debug;

use crate::{
    error::PaxosError,
    types::{PaxosPromise, PaxosProposal, PaxosResponse, PaxosValue, ProposalId},
};

/// The voting role of Paxos.
///
/// Implementations must never promise an id lower than one they have already promised or
/// accepted for the same sequence number, and must record an accepted proposal durably
/// before acknowledging it.
#[async_trait::async_trait]
pub trait PaxosAcceptor: Send + Sync + 'static {
    /// Stable identity of this acceptor, echoed in [`PaxosResponse::peer_identity`].
    fn identity(&self) -> &str;

    async fn prepare(&self, seq: i64, proposal_id: &ProposalId)
    -> Result<PaxosPromise, PaxosError>;

    async fn accept(
        &self,
        seq: i64,
        proposal: &PaxosProposal,
    ) -> Result<PaxosResponse, PaxosError>;

    /// Highest sequence number this acceptor has prepared or accepted anything for.
    async fn latest_sequence_prepared_or_accepted(&self) -> Result<Option<i64>, PaxosError>;
}

/// Acceptor state for one sequence number.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AcceptorState {
    pub promised_id: Option<ProposalId>,
    pub last_accepted_id: Option<ProposalId>,
    pub last_accepted_value: Option<PaxosValue>,
}

impl AcceptorState {
    fn permits(&self, proposal_id: &ProposalId) -> bool {
        self.promised_id
            .as_ref()
            .is_none_or(|promised| proposal_id >= promised)
    }

    fn promise(&self, success: bool, fallback: &ProposalId) -> PaxosPromise {
        let promised_id = self
            .promised_id
            .clone()
            .unwrap_or_else(|| fallback.clone());
        if success {
            PaxosPromise::accept(
                promised_id,
                self.last_accepted_id.clone(),
                self.last_accepted_value.clone(),
            )
        } else {
            PaxosPromise::reject(
                promised_id,
                self.last_accepted_id.clone(),
                self.last_accepted_value.clone(),
            )
        }
    }
}

/// In-process acceptor keeping its state in memory.
///
/// Suitable as the local acceptor of a replica whose durability is handled elsewhere, and
/// as a test double.
pub struct InMemoryAcceptor {
    identity: String,
    states: Mutex<BTreeMap<i64, AcceptorState>>,
}

impl InMemoryAcceptor {
    pub fn new(identity: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            states: Mutex::new(BTreeMap::new()),
        }
    }

    /// Snapshot of the state held for `seq`.
    pub fn state(&self, seq: i64) -> Option<AcceptorState> {
        self.states.lock().get(&seq).cloned()
    }

    fn handle_prepare(&self, seq: i64, proposal_id: &ProposalId) -> PaxosPromise {
        let mut states = self.states.lock();
        let state = states.entry(seq).or_default();
        if !state.permits(proposal_id) {
            debug!(
                acceptor = %self.identity,
                seq,
                %proposal_id,
                "rejecting prepare below promised id"
            );
            return state.promise(false, proposal_id);
        }
        state.promised_id = Some(proposal_id.clone());
        state.promise(true, proposal_id)
    }

    fn handle_accept(&self, seq: i64, proposal: &PaxosProposal) -> PaxosResponse {
        let mut states = self.states.lock();
        let state = states.entry(seq).or_default();
        if !state.permits(&proposal.id) {
            debug!(
                acceptor = %self.identity,
                seq,
                proposal_id = %proposal.id,
                "rejecting accept below promised id"
            );
            return PaxosResponse::new(false, self.identity.clone());
        }
        state.promised_id = Some(proposal.id.clone());
        state.last_accepted_id = Some(proposal.id.clone());
        state.last_accepted_value = Some(proposal.value.clone());
        PaxosResponse::new(true, self.identity.clone())
    }
}

#[async_trait::async_trait]
impl PaxosAcceptor for InMemoryAcceptor {
    fn identity(&self) -> &str {
        &self.identity
    }

    async fn prepare(
        &self,
        seq: i64,
        proposal_id: &ProposalId,
    ) -> Result<PaxosPromise, PaxosError> {
        Ok(self.handle_prepare(seq, proposal_id))
    }

    async fn accept(
        &self,
        seq: i64,
        proposal: &PaxosProposal,
    ) -> Result<PaxosResponse, PaxosError> {
        Ok(self.handle_accept(seq, proposal))
    }

    async fn latest_sequence_prepared_or_accepted(&self) -> Result<Option<i64>, PaxosError> {
        Ok(self.states.lock().keys().next_back().copied())
    }
}
