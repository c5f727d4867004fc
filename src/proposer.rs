//! The proposer side of single-decree Paxos.
//!
//! A [`PaxosProposer`] drives one instance of the protocol per call to
//! [`PaxosProposer::propose`]: phase one (prepare / promise) and phase two (accept) run
//! against every acceptor through [`collect_quorum_responses`], and the chosen value is then
//! taught to the learners. The proposer is long-lived and may serve many sequence numbers
//! concurrently; the proposal counter is the only state shared between calls.

use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use tokio::runtime::Handle;
use tracing::{debug, info, warn};

use crate::{
    acceptor::PaxosAcceptor,
    config::ProposerBuilder,
    error::PaxosError,
    events::{BroadcastEventBus, ProposerEvent, ProposerEventBus},
    learner::PaxosLearner,
    quorum::{collect_quorum_responses, greatest_promise, has_quorum},
    types::{PaxosKey, PaxosPhase, PaxosProposal, PaxosValue, ProposalId},
};

pub struct PaxosProposer<E = BroadcastEventBus>
where
    E: ProposerEventBus,
{
    proposer_identity: String,
    acceptors: Vec<Arc<dyn PaxosAcceptor>>,
    learners: Vec<Arc<dyn PaxosLearner>>,
    local_learner: Option<Arc<dyn PaxosLearner>>,
    quorum_size: usize,
    request_timeout: Duration,
    proposal_number: AtomicU64,
    executor: Handle,
    event_bus: E,
}

pub type DefaultPaxosProposer = PaxosProposer<BroadcastEventBus>;

impl DefaultPaxosProposer {
    pub fn builder() -> ProposerBuilder {
        ProposerBuilder::new()
    }
}

impl<E> PaxosProposer<E>
where
    E: ProposerEventBus,
{
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn from_parts(
        proposer_identity: String,
        acceptors: Vec<Arc<dyn PaxosAcceptor>>,
        learners: Vec<Arc<dyn PaxosLearner>>,
        local_learner: Option<Arc<dyn PaxosLearner>>,
        quorum_size: usize,
        request_timeout: Duration,
        executor: Handle,
        event_bus: E,
    ) -> Self {
        Self {
            proposer_identity,
            acceptors,
            learners,
            local_learner,
            quorum_size,
            request_timeout,
            proposal_number: AtomicU64::new(0),
            executor,
            event_bus,
        }
    }

    /// Drive the Paxos instance for `key` to a decision and return the chosen payload.
    ///
    /// The returned payload is the one chosen cluster-wide, which is not necessarily `data`:
    /// if any acceptor reports a previously accepted value, that value is proposed instead.
    ///
    /// Fails with [`PaxosError::RoundFailure`] if either phase misses its quorum. Calling
    /// again retries with a higher proposal number. Once an acceptor has reported a promise
    /// at `u64::MAX` no higher number exists, and every call fails with
    /// [`PaxosError::ProposalNumbersExhausted`].
    ///
    /// # Examples
    ///
    /// ```rust
    /// use std::sync::Arc;
    /// use single_decree_paxos::{
    ///     acceptor::{InMemoryAcceptor, PaxosAcceptor},
    ///     learner::InMemoryLearner,
    ///     proposer::DefaultPaxosProposer,
    ///     types::PaxosKey,
    /// };
    ///
    /// async fn example() -> Result<(), Box<dyn std::error::Error>> {
    ///     let acceptors: Vec<Arc<dyn PaxosAcceptor>> = (0..3)
    ///         .map(|i| Arc::new(InMemoryAcceptor::new(format!("acceptor-{i}"))) as Arc<dyn PaxosAcceptor>)
    ///         .collect();
    ///     let proposer = DefaultPaxosProposer::builder()
    ///         .with_acceptors(acceptors)
    ///         .with_local_learner(Arc::new(InMemoryLearner::new("local")))
    ///         .build()?;
    ///
    ///     let chosen = proposer.propose(PaxosKey::new(1), Some(b"leader-a".to_vec())).await?;
    ///     assert_eq!(chosen.as_deref(), Some(&b"leader-a"[..]));
    ///     Ok(())
    /// }
    /// ```
    pub async fn propose(
        &self,
        key: PaxosKey,
        data: Option<Vec<u8>>,
    ) -> Result<Option<Vec<u8>>, PaxosError> {
        let seq = key.seq;
        let proposal_id = self.next_proposal_id()?;
        debug!(seq, %proposal_id, "starting paxos round");

        let to_propose = PaxosValue::new(key, data);
        let chosen = self
            .prepare_and_promise(seq, &proposal_id, to_propose)
            .await?;
        self.collect_acceptances(seq, &proposal_id, &chosen).await?;

        info!(seq, %proposal_id, "value chosen");
        self.event_bus.publish(ProposerEvent::ValueChosen {
            seq,
            proposal_id,
            value: chosen.clone(),
        });

        self.broadcast_learned_value(seq, &chosen).await;
        Ok(chosen.data)
    }

    /// Blocking form of [`propose`](Self::propose), run on the proposer's executor.
    ///
    /// # Panics
    ///
    /// Panics when called from within an asynchronous execution context.
    pub fn propose_blocking(
        &self,
        key: PaxosKey,
        data: Option<Vec<u8>>,
    ) -> Result<Option<Vec<u8>>, PaxosError> {
        self.executor.block_on(self.propose(key, data))
    }

    /// Phase one. Returns the value phase two must propose.
    async fn prepare_and_promise(
        &self,
        seq: i64,
        proposal_id: &ProposalId,
        value: PaxosValue,
    ) -> Result<PaxosValue, PaxosError> {
        let promises = collect_quorum_responses(
            &self.acceptors,
            move |acceptor| acceptor.prepare(seq, proposal_id),
            self.quorum_size,
            self.request_timeout,
        )
        .await;

        if !has_quorum(&promises, self.quorum_size) {
            for promise in &promises {
                self.advance_proposal_number(promise.promised_id.number);
            }
            return Err(self.round_failure(seq, proposal_id, PaxosPhase::One, promises.len()));
        }

        match greatest_promise(&promises).and_then(|p| p.last_accepted_value.as_ref()) {
            Some(accepted) => {
                debug!(seq, %proposal_id, "adopting previously accepted value");
                Ok(accepted.clone())
            }
            None => Ok(value),
        }
    }

    /// Phase two.
    async fn collect_acceptances(
        &self,
        seq: i64,
        proposal_id: &ProposalId,
        value: &PaxosValue,
    ) -> Result<(), PaxosError> {
        let proposal = PaxosProposal::new(proposal_id.clone(), value.clone());
        let proposal = &proposal;
        let responses = collect_quorum_responses(
            &self.acceptors,
            move |acceptor| acceptor.accept(seq, proposal),
            self.quorum_size,
            self.request_timeout,
        )
        .await;

        if !has_quorum(&responses, self.quorum_size) {
            return Err(self.round_failure(seq, proposal_id, PaxosPhase::Two, responses.len()));
        }
        Ok(())
    }

    /// Teach every remote learner in the background, then the local learner in place.
    async fn broadcast_learned_value(&self, seq: i64, value: &PaxosValue) {
        let local_identity = self.local_learner.as_ref().map(|l| l.identity());

        for learner in &self.learners {
            if local_identity == Some(learner.identity()) {
                continue;
            }

            let learner = Arc::clone(learner);
            let value = value.clone();
            let event_bus = self.event_bus.clone();
            self.executor.spawn(async move {
                if let Err(e) = learner.learn(seq, &value).await {
                    warn!(learner = learner.identity(), seq, error = %e, "failed to teach learner");
                    event_bus.publish(ProposerEvent::LearnerFailed {
                        seq,
                        learner: learner.identity().to_string(),
                        reason: e.to_string(),
                    });
                }
            });
        }

        if let Some(local) = &self.local_learner
            && let Err(e) = local.learn(seq, value).await
        {
            warn!(learner = local.identity(), seq, error = %e, "failed to teach local learner");
            self.event_bus.publish(ProposerEvent::LearnerFailed {
                seq,
                learner: local.identity().to_string(),
                reason: e.to_string(),
            });
        }
    }

    fn round_failure(
        &self,
        seq: i64,
        proposal_id: &ProposalId,
        phase: PaxosPhase,
        received: usize,
    ) -> PaxosError {
        warn!(
            seq,
            %proposal_id,
            %phase,
            received,
            quorum_size = self.quorum_size,
            "failed to acquire quorum"
        );
        self.event_bus.publish(ProposerEvent::RoundFailed {
            seq,
            proposal_id: proposal_id.clone(),
            phase,
        });
        PaxosError::RoundFailure { phase }
    }

    /// Claim the next proposal number. Never wraps: a counter at `u64::MAX` is exhausted.
    fn next_proposal_id(&self) -> Result<ProposalId, PaxosError> {
        let previous = self
            .proposal_number
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_add(1))
            .map_err(|last| {
                warn!(last, "proposal numbers exhausted");
                PaxosError::ProposalNumbersExhausted { last }
            })?;
        Ok(ProposalId::new(previous + 1, self.proposer_identity.clone()))
    }

    /// Raise the counter to at least `observed` so the next attempt outbids it.
    fn advance_proposal_number(&self, observed: u64) {
        self.proposal_number.fetch_max(observed, Ordering::SeqCst);
    }

    pub fn subscribe_to_events(&self) -> E::Receiver {
        self.event_bus.subscribe()
    }

    pub fn quorum_size(&self) -> usize {
        self.quorum_size
    }

    pub fn proposer_identity(&self) -> &str {
        &self.proposer_identity
    }

    /// Number used by the most recent proposal, or the floor the next one will exceed.
    pub fn latest_proposal_number(&self) -> u64 {
        self.proposal_number.load(Ordering::SeqCst)
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    pub fn acceptor_count(&self) -> usize {
        self.acceptors.len()
    }
}
