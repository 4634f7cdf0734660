//! The capability set shared by the two card encodings
//!
//! Stacks, shuffle secrets and the shuffle proofs only need three
//! operations from an encoding: drawing a fresh masking secret, masking
//! a card, and composing two secrets applied in sequence. The
//! quadratic-residue family implements them against a key ring, the
//! discrete-logarithm family against a [Vtmf] instance.

use crate::{
    card::{Card, CardSecret},
    keys::PublicKeyRing,
    stack::WireRecord,
    vtmf::{Vtmf, VtmfCard, VtmfCardSecret},
};
use rand::Rng;
use rug::Integer;
use tmcg_num::rand::{strong_rng, Coprimes};

/// The operations a card encoding offers to the shuffle machinery
pub trait Encoding {
    /// The card representation
    type Card: WireRecord;
    /// The per-card masking secret
    type Secret: WireRecord;

    /// Draws a fresh, type-preserving masking secret.
    fn random_secret(&self) -> Self::Secret;

    /// Applies the masking operation.
    fn mask(&self, c: &Self::Card, cs: &Self::Secret) -> Self::Card;

    /// Composes two secrets applied in sequence into one.
    fn compose(&self, first: &Self::Secret, then: &Self::Secret) -> Self::Secret;

    /// Tests whether a revealed secret preserves card types.
    fn preserves_types(&self, cs: &Self::Secret) -> bool;

    /// Tests whether a received card has the shape this encoding
    /// operates on.
    fn valid_card(&self, c: &Self::Card) -> bool;

    /// Tests whether a received secret has the shape this encoding
    /// operates on.
    fn valid_secret(&self, cs: &Self::Secret) -> bool;
}

/// The quadratic-residue encoding against a ring of player keys
#[derive(Clone, Copy)]
pub struct ResidueEncoding<'a> {
    /// The ring of every player's public key
    pub ring: &'a PublicKeyRing,
    /// The number of type bits per card
    pub bits: usize,
}

impl<'a> ResidueEncoding<'a> {
    /// Creates the encoding for a key ring and type width.
    pub fn new(ring: &'a PublicKeyRing, bits: usize) -> Self {
        assert!(!ring.is_empty() && bits > 0);
        Self { ring, bits }
    }
}

impl<'a> Encoding for ResidueEncoding<'a> {
    type Card = Card;
    type Secret = CardSecret;

    fn random_secret(&self) -> CardSecret {
        let mut rng = strong_rng();
        let players = self.ring.len();
        let mut cs = CardSecret::new(players, self.bits);
        for j in 0..self.bits {
            let mut parity = false;
            for i in 0..players {
                cs.r[i][j] = rng.sample(&Coprimes(self.ring.keys[i].modulus()));
                let b: bool = rng.gen();
                cs.b[i][j] = Integer::from(b as u32);
                parity ^= b;
            }
            // the toggles of every column cancel out, so masking leaves
            // the encoded type alone
            if parity {
                cs.b[0][j] = Integer::from(cs.b[0][j].is_even() as u32);
            }
        }
        cs
    }

    fn mask(&self, c: &Card, cs: &CardSecret) -> Card {
        let players = c.players();
        let bits = c.bits();
        let mut out = Card::new(players, bits);
        for i in 0..players {
            let key = &self.ring.keys[i];
            for j in 0..bits {
                out.z[i][j] = key.mask(&c.z[i][j], &cs.r[i][j], cs.b[i][j].is_odd());
            }
        }
        out
    }

    fn compose(&self, first: &CardSecret, then: &CardSecret) -> CardSecret {
        let players = first.players();
        let bits = first.bits();
        let mut out = CardSecret::new(players, bits);
        for i in 0..players {
            let key = &self.ring.keys[i];
            for j in 0..bits {
                let (r, b) = key.combine_masks(
                    &first.r[i][j],
                    first.b[i][j].is_odd(),
                    &then.r[i][j],
                    then.b[i][j].is_odd(),
                );
                out.r[i][j] = r;
                out.b[i][j] = Integer::from(b as u32);
            }
        }
        out
    }

    fn preserves_types(&self, cs: &CardSecret) -> bool {
        if !self.valid_secret(cs) {
            return false;
        }
        (0..cs.bits()).all(|j| {
            let mut parity = false;
            for i in 0..cs.players() {
                parity ^= cs.b[i][j].is_odd();
            }
            !parity
        })
    }

    fn valid_card(&self, c: &Card) -> bool {
        c.players() == self.ring.len() && c.bits() == self.bits
    }

    fn valid_secret(&self, cs: &CardSecret) -> bool {
        cs.players() == self.ring.len() && cs.bits() == self.bits
    }
}

/// The discrete-logarithm encoding against a VTMF instance
#[derive(Clone, Copy)]
pub struct DlogEncoding<'a>(pub &'a Vtmf);

impl<'a> Encoding for DlogEncoding<'a> {
    type Card = VtmfCard;
    type Secret = VtmfCardSecret;

    fn random_secret(&self) -> VtmfCardSecret {
        self.0.random_secret()
    }

    fn mask(&self, c: &VtmfCard, cs: &VtmfCardSecret) -> VtmfCard {
        self.0.mask(c, cs)
    }

    fn compose(&self, first: &VtmfCardSecret, then: &VtmfCardSecret) -> VtmfCardSecret {
        self.0.compose(first, then)
    }

    fn preserves_types(&self, _: &VtmfCardSecret) -> bool {
        true
    }

    fn valid_card(&self, _: &VtmfCard) -> bool {
        true
    }

    fn valid_secret(&self, _: &VtmfCardSecret) -> bool {
        true
    }
}
