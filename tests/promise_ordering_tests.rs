use std::cmp::Ordering;

use single_decree_paxos::{
    quorum::{compare_by_last_accepted, greatest_promise, has_quorum, majority_quorum_size},
    types::{PaxosKey, PaxosPhase, PaxosPromise, PaxosResponse, PaxosValue, ProposalId},
};

const SEQ: i64 = 1;

fn value(payload: &str) -> PaxosValue {
    PaxosValue::new(PaxosKey::new(SEQ), Some(payload.as_bytes().to_vec()))
}

fn accepted_promise(promised: u64, accepted: u64, payload: &str) -> PaxosPromise {
    PaxosPromise::accept(
        ProposalId::new(promised, "proposer"),
        Some(ProposalId::new(accepted, "proposer")),
        Some(value(payload)),
    )
}

#[test]
fn test_proposal_id_orders_by_number_then_identity() {
    let low = ProposalId::new(3, "zzz");
    let high = ProposalId::new(5, "aaa");
    assert!(low < high, "number dominates the identity");

    let a = ProposalId::new(5, "proposer-a");
    let b = ProposalId::new(5, "proposer-b");
    assert!(a < b, "identity breaks ties lexicographically");
    assert_eq!(a.cmp(&a.clone()), Ordering::Equal);
}

#[test]
fn test_greatest_promise_picks_highest_accepted() {
    let p1 = PaxosPromise::accept(ProposalId::new(9, "proposer"), None, None);
    let p2 = accepted_promise(9, 3, "three");
    let p3 = accepted_promise(9, 5, "five");

    for promises in [
        vec![p1.clone(), p2.clone(), p3.clone()],
        vec![p3.clone(), p1.clone(), p2.clone()],
        vec![p2.clone(), p3.clone(), p1.clone()],
    ] {
        let greatest = greatest_promise(&promises).expect("non-empty");
        assert_eq!(greatest.last_accepted_value, Some(value("five")));
    }
}

#[test]
fn test_promise_without_accepted_value_is_least() {
    // Higher promised id but nothing accepted still loses to an accepted proposal.
    let empty = PaxosPromise::accept(ProposalId::new(100, "proposer"), None, None);
    let accepted = accepted_promise(2, 1, "one");

    assert_eq!(compare_by_last_accepted(&empty, &accepted), Ordering::Less);
    assert_eq!(compare_by_last_accepted(&accepted, &empty), Ordering::Greater);
    assert_eq!(compare_by_last_accepted(&empty, &empty), Ordering::Equal);
    assert!(greatest_promise(&[]).is_none());
}

#[test]
fn test_has_quorum_counts_only_successes() {
    let responses = vec![
        PaxosResponse::new(true, "a"),
        PaxosResponse::new(false, "b"),
        PaxosResponse::new(true, "c"),
    ];
    assert!(has_quorum(&responses, 2));
    assert!(!has_quorum(&responses, 3));

    let promises = vec![
        PaxosPromise::reject(ProposalId::new(7, "other"), None, None),
        PaxosPromise::accept(ProposalId::new(1, "me"), None, None),
    ];
    assert!(!has_quorum(&promises, 2));
    assert!(has_quorum(&promises, 1));
}

#[test]
fn test_majority_quorum_size() {
    assert_eq!(majority_quorum_size(1), 1);
    assert_eq!(majority_quorum_size(2), 2);
    assert_eq!(majority_quorum_size(3), 2);
    assert_eq!(majority_quorum_size(4), 3);
    assert_eq!(majority_quorum_size(5), 3);
}

#[test]
fn test_phase_display() {
    assert_eq!(PaxosPhase::One.to_string(), "one");
    assert_eq!(PaxosPhase::Two.to_string(), "two");
}
