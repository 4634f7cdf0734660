//! The verifiable decryption protocol

use super::{Vtmf, VtmfCard};
use crate::{zkp::dlog_eq, Result};
use rug::Integer;
use std::collections::HashSet;

/// One party's share of a masked card's secret
pub type SecretShare = Integer;

/// Zero-knowledge proof of a secret share
pub type SecretShareProof = dlog_eq::Proof;

/// The decryption protocol for one masked card
///
/// Accumulates every party's share, each verified against that party's
/// key share, until the card can be opened.
pub struct Reveal<'a> {
    vtmf: &'a Vtmf,
    c: VtmfCard,
    d: Integer,
    seen: HashSet<Integer>,
}

impl<'a> Reveal<'a> {
    pub(super) fn new(vtmf: &'a Vtmf, c: VtmfCard) -> Self {
        Self {
            d: Integer::from(1),
            seen: HashSet::new(),
            vtmf,
            c,
        }
    }

    /// Publishing step: computes the own share and its proof.
    pub fn reveal_share(&mut self) -> Result<(SecretShare, SecretShareProof)> {
        if !self.seen.is_empty() {
            return Err(DecryptionError::RepeatedReveal.into());
        }

        let g = self.vtmf.g.generator();
        let p = self.vtmf.g.modulus();

        let own = self.vtmf.own_share();
        let d = Integer::from(self.c.c1.pow_mod_ref(&self.vtmf.x, p).unwrap());
        let proof = dlog_eq::prove(&self.vtmf.g, &d, &own, &self.c.c1, g, &self.vtmf.x);
        self.d *= &d;
        self.d %= p;
        self.seen.insert(own);
        Ok((d, proof))
    }

    /// Accumulating step: verifies and folds in another party's share.
    ///
    /// `share` is the contributing party's key share `h_i`.
    pub fn add_share(
        &mut self,
        share: &Integer,
        di: &SecretShare,
        proof: &SecretShareProof,
    ) -> Result<()> {
        if self.seen.is_empty() {
            return Err(DecryptionError::RevealFirst.into());
        }
        if self.is_complete() {
            return Err(DecryptionError::TooManyShares.into());
        }
        if !self.vtmf.hi.contains(share) {
            return Err(DecryptionError::UnknownKeyShare.into());
        }
        if self.seen.contains(share) {
            return Err(DecryptionError::TooManyShares.into());
        }

        let g = self.vtmf.g.generator();
        let p = self.vtmf.g.modulus();

        if dlog_eq::verify(&self.vtmf.g, di, share, &self.c.c1, g, proof) {
            self.d *= di;
            self.d %= p;
            self.seen.insert(share.clone());
            Ok(())
        } else {
            Err(DecryptionError::ProofFailure.into())
        }
    }

    /// Tests whether every party's share has been folded in.
    pub fn is_complete(&self) -> bool {
        self.seen.len() == self.vtmf.n as usize
    }

    /// Decrypting step: opens the card to its group element.
    pub fn decrypt(self) -> Result<Integer> {
        if !self.is_complete() {
            return Err(DecryptionError::IncompleteSecret.into());
        }

        let p = self.vtmf.g.modulus();
        let d1 = Integer::from(self.d.invert_ref(p).unwrap());

        Ok(&self.c.c2 * d1 % p)
    }
}

/// An error resulting from wrong usage of the decryption protocol
#[derive(Debug)]
pub enum DecryptionError {
    /// Occurs when the reveal step is attempted a second time
    RepeatedReveal,
    /// Occurs when shares are accumulated before the own reveal
    RevealFirst,
    /// Occurs when there are more key shares than expected
    TooManyShares,
    /// Occurs when an unknown key share is used
    UnknownKeyShare,
    /// Occurs when a proof of a share is incorrect
    ProofFailure,
    /// Occurs when decryption is attempted without all shares
    IncompleteSecret,
}
