//! Zero-knowledge proofs over the discrete-logarithm instance

pub mod dlog;
pub mod dlog_eq;
