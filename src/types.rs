use std::{cmp::Ordering, fmt};

/// Which half of a Paxos round a message or failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PaxosPhase {
    /// Prepare / promise.
    One,
    /// Accept.
    Two,
}

impl fmt::Display for PaxosPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaxosPhase::One => f.write_str("one"),
            PaxosPhase::Two => f.write_str("two"),
        }
    }
}

/// Identity of a single proposal: a proposer-local counter plus the proposer's identity.
///
/// Ordered by `number` first and by `proposer_identity` on ties, so two proposers can never
/// produce ids that compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProposalId {
    pub number: u64,
    pub proposer_identity: String,
}

impl ProposalId {
    pub fn new(number: u64, proposer_identity: impl Into<String>) -> Self {
        Self {
            number,
            proposer_identity: proposer_identity.into(),
        }
    }
}

impl Ord for ProposalId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.number
            .cmp(&other.number)
            .then_with(|| self.proposer_identity.cmp(&other.proposer_identity))
    }
}

impl PartialOrd for ProposalId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for ProposalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.number, self.proposer_identity)
    }
}

/// Identifies the independent Paxos instance a message belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PaxosKey {
    pub seq: i64,
}

impl PaxosKey {
    pub fn new(seq: i64) -> Self {
        Self { seq }
    }
}

impl From<i64> for PaxosKey {
    fn from(seq: i64) -> Self {
        Self::new(seq)
    }
}

/// A value bound to a sequence number. The payload is opaque and may be absent.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PaxosValue {
    pub key: PaxosKey,
    pub data: Option<Vec<u8>>,
}

impl PaxosValue {
    pub fn new(key: PaxosKey, data: Option<Vec<u8>>) -> Self {
        Self { key, data }
    }

    pub fn seq(&self) -> i64 {
        self.key.seq
    }

    pub fn data(&self) -> Option<&[u8]> {
        self.data.as_deref()
    }
}

/// Phase two message body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaxosProposal {
    pub id: ProposalId,
    pub value: PaxosValue,
}

impl PaxosProposal {
    pub fn new(id: ProposalId, value: PaxosValue) -> Self {
        Self { id, value }
    }
}

/// An acceptor's answer to `prepare`.
///
/// A rejection still carries the acceptor's current promised and accepted state so the
/// proposer can fast-forward its counter and recover previously accepted values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaxosPromise {
    pub promised_id: ProposalId,
    pub last_accepted_id: Option<ProposalId>,
    pub last_accepted_value: Option<PaxosValue>,
    pub success: bool,
}

impl PaxosPromise {
    pub fn accept(
        promised_id: ProposalId,
        last_accepted_id: Option<ProposalId>,
        last_accepted_value: Option<PaxosValue>,
    ) -> Self {
        Self {
            promised_id,
            last_accepted_id,
            last_accepted_value,
            success: true,
        }
    }

    pub fn reject(
        promised_id: ProposalId,
        last_accepted_id: Option<ProposalId>,
        last_accepted_value: Option<PaxosValue>,
    ) -> Self {
        Self {
            promised_id,
            last_accepted_id,
            last_accepted_value,
            success: false,
        }
    }
}

/// Acknowledgement for phase two and learner requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaxosResponse {
    pub success: bool,
    pub peer_identity: String,
}

impl PaxosResponse {
    pub fn new(success: bool, peer_identity: impl Into<String>) -> Self {
        Self {
            success,
            peer_identity: peer_identity.into(),
        }
    }
}
