//! Conversions between domain types and `paxos.v1` wire messages.

use crate::{
    error::PaxosError,
    protos::paxos::v1 as wire,
    types::{PaxosKey, PaxosPromise, PaxosProposal, PaxosResponse, PaxosValue, ProposalId},
};

pub(crate) fn required<T>(field: Option<T>, name: &str) -> Result<T, PaxosError> {
    field.ok_or_else(|| PaxosError::MalformedMessage(format!("missing field `{name}`")))
}

impl From<&ProposalId> for wire::ProposalId {
    fn from(id: &ProposalId) -> Self {
        Self {
            number: id.number,
            proposer_identity: id.proposer_identity.clone(),
        }
    }
}

impl From<wire::ProposalId> for ProposalId {
    fn from(id: wire::ProposalId) -> Self {
        ProposalId::new(id.number, id.proposer_identity)
    }
}

impl From<&PaxosValue> for wire::Value {
    fn from(value: &PaxosValue) -> Self {
        Self {
            seq: value.key.seq,
            data: value.data.clone(),
        }
    }
}

impl From<wire::Value> for PaxosValue {
    fn from(value: wire::Value) -> Self {
        PaxosValue::new(PaxosKey::new(value.seq), value.data)
    }
}

impl From<&PaxosProposal> for wire::Proposal {
    fn from(proposal: &PaxosProposal) -> Self {
        Self {
            id: Some((&proposal.id).into()),
            value: Some((&proposal.value).into()),
        }
    }
}

impl TryFrom<wire::Proposal> for PaxosProposal {
    type Error = PaxosError;

    fn try_from(proposal: wire::Proposal) -> Result<Self, Self::Error> {
        Ok(PaxosProposal::new(
            required(proposal.id, "proposal.id")?.into(),
            required(proposal.value, "proposal.value")?.into(),
        ))
    }
}

impl From<&PaxosPromise> for wire::Promise {
    fn from(promise: &PaxosPromise) -> Self {
        Self {
            promised_id: Some((&promise.promised_id).into()),
            last_accepted_id: promise.last_accepted_id.as_ref().map(Into::into),
            last_accepted_value: promise.last_accepted_value.as_ref().map(Into::into),
            success: promise.success,
        }
    }
}

impl TryFrom<wire::Promise> for PaxosPromise {
    type Error = PaxosError;

    fn try_from(promise: wire::Promise) -> Result<Self, Self::Error> {
        Ok(PaxosPromise {
            promised_id: required(promise.promised_id, "promise.promised_id")?.into(),
            last_accepted_id: promise.last_accepted_id.map(Into::into),
            last_accepted_value: promise.last_accepted_value.map(Into::into),
            success: promise.success,
        })
    }
}

impl From<&PaxosResponse> for wire::Response {
    fn from(response: &PaxosResponse) -> Self {
        Self {
            success: response.success,
            peer_identity: response.peer_identity.clone(),
        }
    }
}

impl From<wire::Response> for PaxosResponse {
    fn from(response: wire::Response) -> Self {
        PaxosResponse::new(response.success, response.peer_identity)
    }
}
