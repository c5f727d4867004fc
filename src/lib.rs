//! A single-decree Paxos proposer for electing leaders and agreeing on ordered values.
//!
//! Each call to [`proposer::PaxosProposer::propose`] runs one Paxos instance for one sequence
//! number against a fixed set of acceptors: it collects promises from a quorum, carries
//! forward any value a quorum member already accepted, collects acceptances from a quorum,
//! and then teaches the chosen value to the learners. At most one value is ever chosen per
//! sequence number, even with several proposers competing and replicas failing.
//!
//! ## Pieces
//!
//! - [`quorum`] fans a request out to every peer and collects replies within a bounded window.
//! - [`acceptor::PaxosAcceptor`] and [`learner::PaxosLearner`] are the role interfaces the
//!   proposer talks to. In-memory implementations are provided, and [`remote`] adapts any
//!   byte transport into the same interfaces using the protobuf messages in [`protos`].
//! - [`config::ProposerBuilder`] validates the quorum against the acceptor set and builds the
//!   proposer.
//!
//! Repeated successful proposals are the building block for leader leases and timestamp
//! services. Those layers live outside this crate.

/// Protobuf wire messages for remote acceptors and learners.
pub mod protos {
    pub mod paxos {
        pub mod v1 {
            include!(concat!(env!("OUT_DIR"), "/paxos.v1.rs"));
        }
    }
}

pub mod acceptor;
pub mod codec;
pub mod config;
pub mod error;
pub mod events;
pub mod learner;
pub mod proposer;
pub mod quorum;
pub mod remote;
pub mod types;
