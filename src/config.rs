use std::{sync::Arc, time::Duration};

use tokio::runtime::Handle;

use crate::{
    acceptor::PaxosAcceptor,
    error::PaxosError,
    events::{BroadcastEventBus, ProposerEventBus},
    learner::PaxosLearner,
    proposer::PaxosProposer,
    quorum::{DEFAULT_REMOTE_REQUESTS_TIMEOUT, majority_quorum_size},
};

/// Tunables of a proposer that do not depend on the peer handles themselves.
#[derive(Debug, Clone)]
pub struct ProposerConfig {
    /// Successful replies needed per phase. `None` means a simple majority of the acceptors.
    pub quorum_size: Option<usize>,
    /// Collection window for each phase.
    pub request_timeout: Duration,
    /// Identity used as the tie-break in proposal ids. `None` generates a random UUID.
    pub proposer_identity: Option<String>,
}

impl Default for ProposerConfig {
    fn default() -> Self {
        Self {
            quorum_size: None,
            request_timeout: DEFAULT_REMOTE_REQUESTS_TIMEOUT,
            proposer_identity: None,
        }
    }
}

impl ProposerConfig {
    /// Quorum size this config yields for `acceptor_count` acceptors.
    pub fn resolve_quorum_size(&self, acceptor_count: usize) -> usize {
        self.quorum_size
            .unwrap_or_else(|| majority_quorum_size(acceptor_count))
    }

    /// Validate the configuration against the acceptor set it will be used with.
    pub fn validate(&self, acceptor_count: usize) -> Result<(), PaxosError> {
        let quorum_size = self.resolve_quorum_size(acceptor_count);
        if quorum_size <= acceptor_count / 2 || quorum_size > acceptor_count {
            return Err(PaxosError::InvalidQuorumSize {
                quorum_size,
                acceptor_count,
            });
        }
        if self.request_timeout.is_zero() {
            return Err(PaxosError::InvalidConfiguration(
                "request timeout must be greater than zero".to_string(),
            ));
        }
        if let Some(identity) = &self.proposer_identity
            && identity.is_empty()
        {
            return Err(PaxosError::InvalidConfiguration(
                "proposer identity must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Assembles a [`PaxosProposer`] from its peers and configuration.
pub struct ProposerBuilder {
    acceptors: Vec<Arc<dyn PaxosAcceptor>>,
    learners: Vec<Arc<dyn PaxosLearner>>,
    local_learner: Option<Arc<dyn PaxosLearner>>,
    executor: Option<Handle>,
    config: ProposerConfig,
}

impl ProposerBuilder {
    pub fn new() -> Self {
        Self {
            acceptors: Vec::new(),
            learners: Vec::new(),
            local_learner: None,
            executor: None,
            config: ProposerConfig::default(),
        }
    }

    /// Replace the acceptor set.
    pub fn with_acceptors(mut self, acceptors: Vec<Arc<dyn PaxosAcceptor>>) -> Self {
        self.acceptors = acceptors;
        self
    }

    pub fn with_acceptor(mut self, acceptor: Arc<dyn PaxosAcceptor>) -> Self {
        self.acceptors.push(acceptor);
        self
    }

    /// Replace the learner set.
    pub fn with_learners(mut self, learners: Vec<Arc<dyn PaxosLearner>>) -> Self {
        self.learners = learners;
        self
    }

    pub fn with_learner(mut self, learner: Arc<dyn PaxosLearner>) -> Self {
        self.learners.push(learner);
        self
    }

    /// Learner taught synchronously before `propose` returns.
    ///
    /// It is skipped during the asynchronous broadcast when it also appears in the learner
    /// set (matched by identity).
    pub fn with_local_learner(mut self, learner: Arc<dyn PaxosLearner>) -> Self {
        self.local_learner = Some(learner);
        self
    }

    pub fn with_quorum_size(mut self, quorum_size: usize) -> Self {
        self.config.quorum_size = Some(quorum_size);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    pub fn with_proposer_identity(mut self, identity: impl Into<String>) -> Self {
        self.config.proposer_identity = Some(identity.into());
        self
    }

    /// Runtime used for learner broadcast and for [`PaxosProposer::propose_blocking`].
    /// Defaults to the runtime `build` is called from.
    pub fn with_executor(mut self, executor: Handle) -> Self {
        self.executor = Some(executor);
        self
    }

    /// Set all scalar configuration at once.
    pub fn with_config(mut self, config: ProposerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn validate(&self) -> Result<(), PaxosError> {
        self.config.validate(self.acceptors.len())
    }

    pub fn build(self) -> Result<PaxosProposer<BroadcastEventBus>, PaxosError> {
        self.build_with_event_bus(BroadcastEventBus::default())
    }

    pub fn build_with_event_bus<E: ProposerEventBus>(
        self,
        event_bus: E,
    ) -> Result<PaxosProposer<E>, PaxosError> {
        self.validate()?;
        let executor = match self.executor {
            Some(handle) => handle,
            None => Handle::try_current()?,
        };
        let quorum_size = self.config.resolve_quorum_size(self.acceptors.len());
        let proposer_identity = self
            .config
            .proposer_identity
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        Ok(PaxosProposer::from_parts(
            proposer_identity,
            self.acceptors,
            self.learners,
            self.local_learner,
            quorum_size,
            self.config.request_timeout,
            executor,
            event_bus,
        ))
    }
}

impl Default for ProposerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
