//! Acceptors and learners reached through a byte transport.
//!
//! [`RemoteAcceptor`] and [`RemoteLearner`] encode each call as a `paxos.v1` request, hand
//! it to a [`PaxosTransport`] and decode the reply. On the serving side a
//! [`PaxosRequestHandler`] decodes requests and dispatches them to local role
//! implementations. [`serve`] wires the two together in-process over tokio channels.

use std::sync::Arc;

use prost::Message;
use tokio::{
    sync::{mpsc, oneshot},
    task::JoinHandle,
};
use tracing::{debug, warn};

use crate::{
    acceptor::PaxosAcceptor,
    codec::required,
    error::PaxosError,
    learner::PaxosLearner,
    protos::paxos::v1::{
        self as wire, PaxosReply, PaxosRequest, paxos_reply::Reply, paxos_request::Request,
    },
    types::{PaxosPromise, PaxosProposal, PaxosResponse, PaxosValue, ProposalId},
};

/// Request/reply exchange with a single remote endpoint.
#[async_trait::async_trait]
pub trait PaxosTransport: Send + Sync + 'static {
    fn endpoint(&self) -> &str;

    async fn call(&self, request: Vec<u8>) -> Result<Vec<u8>, PaxosError>;
}

async fn round_trip<T: PaxosTransport>(
    transport: &T,
    request: Request,
) -> Result<Reply, PaxosError> {
    let bytes = PaxosRequest {
        request: Some(request),
    }
    .encode_to_vec();
    let reply = PaxosReply::decode(transport.call(bytes).await?.as_slice())?;
    match required(reply.reply, "reply")? {
        Reply::Error(reason) => Err(PaxosError::peer_unavailable(transport.endpoint(), reason)),
        reply => Ok(reply),
    }
}

fn unexpected(reply: Reply) -> PaxosError {
    PaxosError::MalformedMessage(format!("unexpected reply: {reply:?}"))
}

pub struct RemoteAcceptor<T: PaxosTransport> {
    identity: String,
    transport: T,
}

impl<T: PaxosTransport> RemoteAcceptor<T> {
    pub fn new(identity: impl Into<String>, transport: T) -> Self {
        Self {
            identity: identity.into(),
            transport,
        }
    }
}

#[async_trait::async_trait]
impl<T: PaxosTransport> PaxosAcceptor for RemoteAcceptor<T> {
    fn identity(&self) -> &str {
        &self.identity
    }

    async fn prepare(
        &self,
        seq: i64,
        proposal_id: &ProposalId,
    ) -> Result<PaxosPromise, PaxosError> {
        let request = Request::Prepare(wire::PrepareRequest {
            seq,
            proposal_id: Some(proposal_id.into()),
        });
        match round_trip(&self.transport, request).await? {
            Reply::Promise(promise) => promise.try_into(),
            other => Err(unexpected(other)),
        }
    }

    async fn accept(
        &self,
        seq: i64,
        proposal: &PaxosProposal,
    ) -> Result<PaxosResponse, PaxosError> {
        let request = Request::Accept(wire::AcceptRequest {
            seq,
            proposal: Some(proposal.into()),
        });
        match round_trip(&self.transport, request).await? {
            Reply::Response(response) => Ok(response.into()),
            other => Err(unexpected(other)),
        }
    }

    async fn latest_sequence_prepared_or_accepted(&self) -> Result<Option<i64>, PaxosError> {
        let request = Request::LatestSequence(wire::LatestSequenceRequest {});
        match round_trip(&self.transport, request).await? {
            Reply::LatestSequence(latest) => Ok(latest.seq),
            other => Err(unexpected(other)),
        }
    }
}

pub struct RemoteLearner<T: PaxosTransport> {
    identity: String,
    transport: T,
}

impl<T: PaxosTransport> RemoteLearner<T> {
    pub fn new(identity: impl Into<String>, transport: T) -> Self {
        Self {
            identity: identity.into(),
            transport,
        }
    }
}

#[async_trait::async_trait]
impl<T: PaxosTransport> PaxosLearner for RemoteLearner<T> {
    fn identity(&self) -> &str {
        &self.identity
    }

    async fn learn(&self, seq: i64, value: &PaxosValue) -> Result<(), PaxosError> {
        let request = Request::Learn(wire::LearnRequest {
            seq,
            value: Some(value.into()),
        });
        match round_trip(&self.transport, request).await? {
            Reply::Learned(_) => Ok(()),
            other => Err(unexpected(other)),
        }
    }

    async fn learned_value(&self, seq: i64) -> Result<Option<PaxosValue>, PaxosError> {
        let request = Request::LearnedValue(wire::LearnedValueRequest { seq });
        match round_trip(&self.transport, request).await? {
            Reply::Value(value) => Ok(value.value.map(Into::into)),
            other => Err(unexpected(other)),
        }
    }

    async fn greatest_learned_value(&self) -> Result<Option<PaxosValue>, PaxosError> {
        let request = Request::GreatestLearned(wire::GreatestLearnedRequest {});
        match round_trip(&self.transport, request).await? {
            Reply::Value(value) => Ok(value.value.map(Into::into)),
            other => Err(unexpected(other)),
        }
    }

    async fn learned_values_since(&self, seq: i64) -> Result<Vec<PaxosValue>, PaxosError> {
        let request = Request::LearnedSince(wire::LearnedSinceRequest { seq });
        match round_trip(&self.transport, request).await? {
            Reply::Values(list) => Ok(list.values.into_iter().map(Into::into).collect()),
            other => Err(unexpected(other)),
        }
    }
}

/// Serves encoded requests against local role implementations.
#[derive(Clone, Default)]
pub struct PaxosRequestHandler {
    acceptor: Option<Arc<dyn PaxosAcceptor>>,
    learner: Option<Arc<dyn PaxosLearner>>,
}

impl PaxosRequestHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_acceptor(mut self, acceptor: Arc<dyn PaxosAcceptor>) -> Self {
        self.acceptor = Some(acceptor);
        self
    }

    pub fn with_learner(mut self, learner: Arc<dyn PaxosLearner>) -> Self {
        self.learner = Some(learner);
        self
    }

    /// Decode `request`, run it and encode the reply. Failures are encoded as error replies.
    pub async fn handle(&self, request: &[u8]) -> Vec<u8> {
        let reply = match self.dispatch(request).await {
            Ok(reply) => reply,
            Err(e) => {
                debug!(error = %e, "request failed");
                Reply::Error(e.to_string())
            }
        };
        PaxosReply { reply: Some(reply) }.encode_to_vec()
    }

    async fn dispatch(&self, request: &[u8]) -> Result<Reply, PaxosError> {
        let request = required(PaxosRequest::decode(request)?.request, "request")?;
        match request {
            Request::Prepare(prepare) => {
                let proposal_id: ProposalId =
                    required(prepare.proposal_id, "prepare.proposal_id")?.into();
                let promise = self.acceptor()?.prepare(prepare.seq, &proposal_id).await?;
                Ok(Reply::Promise((&promise).into()))
            }
            Request::Accept(accept) => {
                let proposal: PaxosProposal =
                    required(accept.proposal, "accept.proposal")?.try_into()?;
                let response = self.acceptor()?.accept(accept.seq, &proposal).await?;
                Ok(Reply::Response((&response).into()))
            }
            Request::LatestSequence(_) => {
                let seq = self
                    .acceptor()?
                    .latest_sequence_prepared_or_accepted()
                    .await?;
                Ok(Reply::LatestSequence(wire::OptionalSeq { seq }))
            }
            Request::Learn(learn) => {
                let value: PaxosValue = required(learn.value, "learn.value")?.into();
                self.learner()?.learn(learn.seq, &value).await?;
                Ok(Reply::Learned(wire::Learned {}))
            }
            Request::LearnedValue(query) => {
                let value = self.learner()?.learned_value(query.seq).await?;
                Ok(Reply::Value(wire::OptionalValue {
                    value: value.as_ref().map(Into::into),
                }))
            }
            Request::GreatestLearned(_) => {
                let value = self.learner()?.greatest_learned_value().await?;
                Ok(Reply::Value(wire::OptionalValue {
                    value: value.as_ref().map(Into::into),
                }))
            }
            Request::LearnedSince(query) => {
                let values = self.learner()?.learned_values_since(query.seq).await?;
                Ok(Reply::Values(wire::ValueList {
                    values: values.iter().map(Into::into).collect(),
                }))
            }
        }
    }

    fn acceptor(&self) -> Result<&Arc<dyn PaxosAcceptor>, PaxosError> {
        self.acceptor
            .as_ref()
            .ok_or_else(|| PaxosError::MalformedMessage("endpoint has no acceptor".to_string()))
    }

    fn learner(&self) -> Result<&Arc<dyn PaxosLearner>, PaxosError> {
        self.learner
            .as_ref()
            .ok_or_else(|| PaxosError::MalformedMessage("endpoint has no learner".to_string()))
    }
}

type Envelope = (Vec<u8>, oneshot::Sender<Vec<u8>>);

/// In-process transport to an endpoint started with [`serve`].
#[derive(Clone)]
pub struct ChannelTransport {
    endpoint: String,
    sender: mpsc::Sender<Envelope>,
}

#[async_trait::async_trait]
impl PaxosTransport for ChannelTransport {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn call(&self, request: Vec<u8>) -> Result<Vec<u8>, PaxosError> {
        let (reply_to, reply) = oneshot::channel();
        self.sender
            .send((request, reply_to))
            .await
            .map_err(|_| PaxosError::peer_unavailable(&self.endpoint, "endpoint closed"))?;
        reply
            .await
            .map_err(|_| PaxosError::peer_unavailable(&self.endpoint, "request dropped"))
    }
}

/// A running endpoint. Shutting it down makes every [`ChannelTransport`] to it fail.
pub struct ServerHandle {
    endpoint: String,
    task: JoinHandle<()>,
}

impl ServerHandle {
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn shutdown(&self) {
        warn!(endpoint = %self.endpoint, "shutting down paxos endpoint");
        self.task.abort();
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Start serving `handler` on the current runtime and return a transport to it.
///
/// `buffer` bounds the requests queued ahead of the handler; it is raised to at least one.
pub fn serve(
    endpoint: impl Into<String>,
    handler: PaxosRequestHandler,
    buffer: usize,
) -> (ChannelTransport, ServerHandle) {
    let endpoint = endpoint.into();
    let (sender, mut receiver) = mpsc::channel::<Envelope>(buffer.max(1));

    let task = tokio::spawn(async move {
        while let Some((request, reply_to)) = receiver.recv().await {
            let handler = handler.clone();
            tokio::spawn(async move {
                let reply = handler.handle(&request).await;
                let _ = reply_to.send(reply);
            });
        }
    });

    (
        ChannelTransport {
            endpoint: endpoint.clone(),
            sender,
        },
        ServerHandle { endpoint, task },
    )
}
