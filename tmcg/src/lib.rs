#![warn(missing_docs)]
#![allow(clippy::many_single_char_names)]
#![deny(clippy::correctness)]

//! Cryptographic toolbox for mental card games
//!
//! Mutually-distrusting players jointly shuffle and deal cards over an
//! insecure channel, with no trusted dealer. Cards can be encoded as
//! matrices of quadratic residues against each player's key, or as
//! ElGamal pairs under a shared threshold key; both encodings come with
//! zero-knowledge proofs for every masking and shuffling operation.

#[cfg(test)]
#[macro_use]
extern crate lazy_static;

#[macro_use]
mod macros;

pub mod card;
pub mod constants;
pub mod encoding;
pub mod error;
pub mod hash;
pub mod keys;
mod parse;
pub mod perm;
pub mod schnorr;
pub mod stack;
pub mod toolbox;
pub mod vtmf;
pub mod zkp;

/// Result specialization for toolbox errors
pub type Result<T> = std::result::Result<T, self::error::Error>;
