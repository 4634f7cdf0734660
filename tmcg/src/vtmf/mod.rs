//! The discrete-logarithm card encoding
//!
//! A verifiable *k*-out-of-*k* threshold masking function: the players
//! accumulate a shared ElGamal-like key over a Schnorr group, cards are
//! pairs `(c1, c2)` in the subgroup, and masking multiplies in a fresh
//! encryption of one. Nobody learns a card alone; everybody can open one
//! together, each share travelling with an equality-of-logs proof.

use crate::{
    constants::MAX_CARDS,
    parse::{radix, Scanner},
    schnorr::Group,
    zkp::dlog_eq,
    Result,
};
use rand::Rng;
use rug::Integer;
use std::fmt::{self, Display, Formatter};
use tmcg_num::{fpowm, rand::{strong_rng, Modulo}};

mod kex;
pub use self::kex::*;

mod dec;
pub use self::dec::*;

/// Zero-knowledge proof accompanying a masking operation
pub type MaskProof = dlog_eq::Proof;

/// A card under the discrete-logarithm encoding
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VtmfCard {
    pub(crate) c1: Integer,
    pub(crate) c2: Integer,
}

/// The secret of one masking operation
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VtmfCardSecret {
    pub(crate) r: Integer,
}

/// A verifiable *k*-out-of-*k* threshold masking function instance
#[derive(Clone, Debug)]
pub struct Vtmf {
    g: Group,
    n: u32,
    x: Integer,
    h: Integer,
    hi: Vec<Integer>,
}

impl VtmfCard {
    /// Gets the first component.
    pub fn first(&self) -> &Integer {
        &self.c1
    }

    /// Gets the second component.
    pub fn second(&self) -> &Integer {
        &self.c2
    }

    /// Imports a card from its textual form.
    pub fn import(s: &str) -> Result<VtmfCard> {
        let mut sc = Scanner::new(s, "crd", '|')?;
        let c1 = sc.integer_field()?;
        let c2 = sc.integer_field()?;
        sc.finish()?;
        Ok(VtmfCard { c1, c2 })
    }
}

impl VtmfCardSecret {
    /// Gets the masking exponent.
    pub fn exponent(&self) -> &Integer {
        &self.r
    }

    /// Imports a secret from its textual form.
    pub fn import(s: &str) -> Result<VtmfCardSecret> {
        let mut sc = Scanner::new(s, "crs", '|')?;
        let r = sc.integer_field()?;
        sc.finish()?;
        Ok(VtmfCardSecret { r })
    }
}

impl Display for VtmfCard {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "crd|{}|{}|", radix(&self.c1), radix(&self.c2))
    }
}

impl Display for VtmfCardSecret {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "crs|{}|", radix(&self.r))
    }
}

derive_wire_conversions!(VtmfCard);
derive_wire_conversions!(VtmfCardSecret);

impl Vtmf {
    pub(crate) fn new_unchecked(g: Group, n: u32, x: Integer, h: Integer, hi: Vec<Integer>) -> Self {
        fpowm::precompute(&h, g.bits(), g.modulus());
        Self { g, n, x, h, hi }
    }

    pub(crate) fn validate(self) -> Option<Self> {
        if self.n < 2 || self.hi.len() != self.n as usize {
            return None;
        }
        let p = self.g.modulus();
        let prod = self
            .hi
            .iter()
            .fold(Integer::from(1), |acc, h| acc * h % p);
        if prod != self.h {
            return None;
        }
        if !self.hi.iter().all(|h| self.g.has_element(h)) {
            return None;
        }
        for (i, h) in self.hi.iter().enumerate() {
            if self.hi[..i].contains(h) {
                return None;
            }
        }
        Some(self)
    }

    /// Gets the group this instance works over.
    pub fn group(&self) -> &Group {
        &self.g
    }

    /// Gets the number of parties.
    pub fn parties(&self) -> u32 {
        self.n
    }

    /// Gets the combined public key.
    pub fn shared_key(&self) -> &Integer {
        &self.h
    }

    /// Gets one party's key share.
    pub fn key_share(&self, seat: usize) -> Option<&Integer> {
        self.hi.get(seat)
    }

    /// Gets the own key share.
    pub fn own_share(&self) -> Integer {
        self.g.element(&self.x)
    }

    /// Encodes a card type as a group element.
    pub fn element_of_type(&self, card_type: usize) -> Integer {
        self.g.element(&Integer::from(card_type as u64))
    }

    /// Finds the card type a group element encodes, searching the
    /// bounded type space.
    pub fn decode_type(&self, value: &Integer) -> Option<usize> {
        (0..MAX_CARDS).find(|&t| self.element_of_type(t) == *value)
    }

    /// Applies the non-secret masking operation to a group element.
    pub fn mask_open(&self, m: &Integer) -> VtmfCard {
        VtmfCard {
            c1: Integer::from(1),
            c2: m.clone(),
        }
    }

    /// Undoes a non-secret masking operation.
    pub fn unmask_open(&self, c: &VtmfCard) -> Option<Integer> {
        if c.c1 == 1 {
            Some(c.c2.clone())
        } else {
            None
        }
    }

    /// Draws a fresh masking secret.
    pub fn random_secret(&self) -> VtmfCardSecret {
        let r = strong_rng().sample(&Modulo(self.g.order()));
        VtmfCardSecret { r }
    }

    /// Applies the masking operation.
    pub fn mask(&self, c: &VtmfCard, cs: &VtmfCardSecret) -> VtmfCard {
        let p = self.g.modulus();
        let g = self.g.generator();

        let gr = fpowm::pow_mod(g, &cs.r, p).unwrap();
        let hr = fpowm::pow_mod(&self.h, &cs.r, p).unwrap();
        VtmfCard {
            c1: gr * &c.c1 % p,
            c2: hr * &c.c2 % p,
        }
    }

    /// Composes two masking secrets applied in sequence.
    pub fn compose(&self, first: &VtmfCardSecret, then: &VtmfCardSecret) -> VtmfCardSecret {
        let r = (Integer::from(&first.r + &then.r)) % self.g.order();
        VtmfCardSecret { r }
    }

    /// Proves that `cc` masks the same value as `c`.
    pub fn prove_mask(&self, c: &VtmfCard, cc: &VtmfCard, cs: &VtmfCardSecret) -> MaskProof {
        let p = self.g.modulus();
        let g = self.g.generator();

        let c11 = Integer::from(c.c1.invert_ref(p).unwrap());
        let gr = &cc.c1 * c11 % p;
        let c21 = Integer::from(c.c2.invert_ref(p).unwrap());
        let hr = &cc.c2 * c21 % p;
        dlog_eq::prove(&self.g, &gr, &hr, g, &self.h, &cs.r)
    }

    /// Verifies that `cc` masks the same value as `c`.
    pub fn verify_mask(&self, c: &VtmfCard, cc: &VtmfCard, proof: &MaskProof) -> bool {
        let p = self.g.modulus();
        let g = self.g.generator();

        if !self.g.has_element(&cc.c1) || !self.g.has_element(&cc.c2) {
            return false;
        }
        let c11 = match c.c1.invert_ref(p) {
            Some(i) => Integer::from(i),
            None => return false,
        };
        let gr = &cc.c1 * c11 % p;
        let c21 = match c.c2.invert_ref(p) {
            Some(i) => Integer::from(i),
            None => return false,
        };
        let hr = &cc.c2 * c21 % p;
        dlog_eq::verify(&self.g, &gr, &hr, g, &self.h, proof)
    }

    /// Starts an instance of the verifiable decryption protocol.
    pub fn unmask(&self, c: VtmfCard) -> Reveal {
        Reveal::new(self, c)
    }
}
