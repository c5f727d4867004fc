//! Fan-out to a set of peers with a bounded collection window.

use std::{cmp::Ordering, future::Future, time::Duration};

use futures::{
    FutureExt,
    stream::{FuturesUnordered, StreamExt},
};
use tokio::time::{Instant, timeout_at};
use tracing::debug;

use crate::{
    error::PaxosError,
    types::{PaxosPromise, PaxosResponse},
};

/// Default window for a single round of remote requests.
pub const DEFAULT_REMOTE_REQUESTS_TIMEOUT: Duration = Duration::from_secs(5);

/// A reply that can count towards a quorum.
pub trait QuorumResponse {
    fn is_successful(&self) -> bool;
}

impl QuorumResponse for PaxosPromise {
    fn is_successful(&self) -> bool {
        self.success
    }
}

impl QuorumResponse for PaxosResponse {
    fn is_successful(&self) -> bool {
        self.success
    }
}

/// Smallest quorum that is a strict majority of `peer_count`.
pub fn majority_quorum_size(peer_count: usize) -> usize {
    peer_count / 2 + 1
}

/// True iff at least `quorum_size` of the responses report success.
pub fn has_quorum<R: QuorumResponse>(responses: &[R], quorum_size: usize) -> bool {
    responses.iter().filter(|r| r.is_successful()).count() >= quorum_size
}

/// Issue `request` against every peer concurrently and return the replies gathered, in
/// arrival order.
///
/// Collection stops as soon as `quorum_size` successful replies are in, or once the peers
/// still outstanding can no longer lift the successes to `quorum_size`, or when `timeout`
/// elapses. Replies that are already available at that point are kept as well. A peer that
/// errors is logged and left out of the result; a peer that has not answered is abandoned.
/// This never fails: callers judge the outcome with [`has_quorum`].
pub async fn collect_quorum_responses<'a, P, R, F, Fut>(
    peers: &'a [P],
    request: F,
    quorum_size: usize,
    timeout: Duration,
) -> Vec<R>
where
    F: Fn(&'a P) -> Fut,
    Fut: Future<Output = Result<R, PaxosError>>,
    R: QuorumResponse,
{
    let deadline = Instant::now() + timeout;
    let mut in_flight: FuturesUnordered<Fut> = peers.iter().map(request).collect();
    let mut responses = Vec::with_capacity(peers.len());
    let mut successes = 0;

    while successes < quorum_size && successes + in_flight.len() >= quorum_size {
        match timeout_at(deadline, in_flight.next()).await {
            Ok(Some(Ok(response))) => {
                if response.is_successful() {
                    successes += 1;
                }
                responses.push(response);
            }
            Ok(Some(Err(e))) => debug!(error = %e, "peer request failed"),
            Ok(None) => break,
            Err(_) => {
                debug!(
                    outstanding = in_flight.len(),
                    received = responses.len(),
                    quorum_size,
                    "quorum collection window elapsed"
                );
                return responses;
            }
        }
    }

    while let Some(Some(reply)) = in_flight.next().now_or_never() {
        match reply {
            Ok(response) => responses.push(response),
            Err(e) => debug!(error = %e, "peer request failed"),
        }
    }
    debug!(
        successes,
        received = responses.len(),
        abandoned = in_flight.len(),
        quorum_size,
        "quorum collection finished"
    );

    responses
}

/// Order promises by the proposal they last accepted.
///
/// A promise without an accepted proposal is less than any promise with one.
pub fn compare_by_last_accepted(a: &PaxosPromise, b: &PaxosPromise) -> Ordering {
    match (&a.last_accepted_id, &b.last_accepted_id) {
        (Some(a_id), Some(b_id)) => a_id.cmp(b_id),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => Ordering::Equal,
    }
}

/// The promise whose accepted value phase two must carry forward, if any were received.
pub fn greatest_promise(promises: &[PaxosPromise]) -> Option<&PaxosPromise> {
    promises.iter().max_by(|a, b| compare_by_last_accepted(a, b))
}
