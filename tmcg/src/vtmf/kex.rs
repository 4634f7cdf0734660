//! The key exchange protocol
//!
//! Every party contributes `h_i = g^{x_i}` with a proof of knowledge of
//! `x_i`; the combined key is the product of all contributions. Shares
//! must be taken in seat order so that all parties agree on seat
//! indices.

use crate::{
    schnorr::Group,
    vtmf::Vtmf,
    zkp::dlog,
    Result,
};
use rand::Rng;
use rug::Integer;
use std::io::{BufRead, Write};
use tmcg_num::rand::{strong_rng, Modulo};

/// The VTMF key exchange protocol
pub struct KeyExchange {
    g: Group,
    n: u32,
    x: Option<Integer>,
    own_share: Option<(Integer, dlog::Proof)>,
    hi: Vec<Integer>,
}

impl KeyExchange {
    /// Creates a new [KeyExchange] instance for a given number of
    /// parties with an agreed group.
    pub fn new(g: Group, parties: u32) -> Self {
        assert!(parties > 1);
        Self {
            g,
            n: parties,
            x: None,
            own_share: None,
            hi: Vec::new(),
        }
    }

    /// Gets the number of parties in this [KeyExchange].
    pub fn parties(&self) -> u32 {
        self.n
    }

    /// Gets the group for this [KeyExchange].
    pub fn group(&self) -> &Group {
        &self.g
    }

    /// Tests whether the own key share has been generated.
    pub fn has_private_key(&self) -> bool {
        self.x.is_some()
    }

    /// Tests whether all shares have been collected.
    pub fn has_all_keys(&self) -> bool {
        self.hi.len() == self.n as usize
    }

    /// Uses a given secret exponent and returns the share and proof to
    /// be published.
    pub fn use_private_key(&mut self, x: Integer) -> Result<(Integer, dlog::Proof)> {
        if self.has_private_key() {
            return Err(KeyExchangeError::RepeatedKeyGeneration.into());
        }
        if x <= 1 || x >= *self.g.order() {
            return Err(KeyExchangeError::InvalidPrivateKey.into());
        }

        let h = self.g.element(&x);
        let proof = dlog::prove(&self.g, &h, &x);
        self.x = Some(x);
        self.own_share = Some((h.clone(), proof.clone()));
        self.hi.push(h.clone());
        Ok((h, proof))
    }

    /// Generates a fresh secret exponent and returns the share and proof
    /// to be published.
    pub fn generate_key(&mut self) -> Result<(Integer, dlog::Proof)> {
        let mut rng = strong_rng();
        let x = loop {
            let x = rng.sample(&Modulo(self.g.order()));
            if x > 1 {
                break x;
            }
        };
        self.use_private_key(x)
    }

    /// Accumulates another party's share after checking its proof.
    pub fn update_key(&mut self, h: Integer, proof: &dlog::Proof) -> Result<()> {
        if !self.has_private_key() {
            return Err(KeyExchangeError::NoKeyGenerated.into());
        }
        if self.has_all_keys() {
            return Err(KeyExchangeError::RepeatedKeyGeneration.into());
        }
        if !self.g.has_element(&h) {
            return Err(KeyExchangeError::InvalidPublicKey.into());
        }
        if !dlog::verify(&self.g, &h, proof) {
            return Err(KeyExchangeError::ProofFailure.into());
        }

        self.hi.push(h);
        Ok(())
    }

    /// Writes the own share and its proof to a stream.
    pub fn publish_key(&self, w: &mut dyn Write) -> Result<()> {
        let (h, proof) = self
            .own_share
            .as_ref()
            .ok_or(KeyExchangeError::NoKeyGenerated)?;
        crate::parse::send_integer(w, h)?;
        proof.write_to(w)
    }

    /// Reads another party's share and proof from a stream and
    /// accumulates it.
    pub fn receive_key(&mut self, r: &mut dyn BufRead) -> Result<()> {
        let cap = crate::constants::MAX_STACK_CHARS;
        let h = crate::parse::recv_integer(r, cap)?;
        let proof = dlog::Proof::read_from(r, cap)?;
        self.update_key(h, &proof)
    }

    /// Finalizes the key exchange protocol and creates a [Vtmf] instance.
    pub fn finalize(self) -> Result<Vtmf> {
        if !self.has_all_keys() {
            return Err(KeyExchangeError::IncompleteExchange.into());
        }

        let p = self.g.modulus();
        let h = self
            .hi
            .iter()
            .fold(Integer::from(1), |acc, hi| acc * hi % p);
        Vtmf::new_unchecked(self.g, self.n, self.x.unwrap(), h, self.hi)
            .validate()
            .ok_or_else(|| KeyExchangeError::IncompleteExchange.into())
    }
}

/// An error resulting from wrong usage of the key exchange protocol
#[derive(Debug)]
pub enum KeyExchangeError {
    /// Occurs when an operation that requires a key is attempted before
    /// generating keys
    NoKeyGenerated,
    /// Occurs when key generation is attempted after a key has already
    /// been generated
    RepeatedKeyGeneration,
    /// Occurs when a key exchange is attempted with a share outside the
    /// group
    InvalidPublicKey,
    /// Occurs when an out-of-range secret exponent is supplied
    InvalidPrivateKey,
    /// Occurs when attempting to finalize the exchange before it is
    /// complete
    IncompleteExchange,
    /// Occurs when a share's proof of knowledge does not verify
    ProofFailure,
}

#[cfg(test)]
mod test {
    use super::KeyExchange;
    use crate::{schnorr::Groups, zkp::dlog};
    use rand::{thread_rng, Rng};
    use rug::Integer;
    use std::io::BufReader;

    fn group() -> crate::schnorr::Group {
        thread_rng().sample(&Groups {
            field_bits: 1024,
            group_bits: 160,
        })
    }

    #[test]
    fn exchange_accumulates_the_product_key() {
        let g = group();
        let mut kex0 = KeyExchange::new(g.clone(), 2);
        let (h0, p0) = kex0.generate_key().unwrap();
        let mut kex1 = KeyExchange::new(g.clone(), 2);
        let (h1, p1) = kex1.generate_key().unwrap();

        kex0.update_key(h1.clone(), &p1).unwrap();
        kex1.update_key(h0.clone(), &p0).unwrap();

        let vtmf0 = kex0.finalize().unwrap();
        let vtmf1 = kex1.finalize().unwrap();
        let expect = h0 * h1 % g.modulus();
        assert_eq!(*vtmf0.shared_key(), expect);
        assert_eq!(*vtmf1.shared_key(), expect);
        assert_eq!(vtmf0.key_share(0), vtmf1.key_share(1));
    }

    #[test]
    fn shares_without_valid_proofs_are_rejected() {
        let g = group();
        let mut kex0 = KeyExchange::new(g.clone(), 2);
        kex0.generate_key().unwrap();
        let mut kex1 = KeyExchange::new(g.clone(), 2);
        let (h1, p1) = kex1.generate_key().unwrap();

        // proof for a different share does not transfer
        let other = g.element(&Integer::from(999u32));
        assert!(kex0.update_key(other, &p1).is_err());
        assert!(kex0.update_key(h1, &p1).is_ok());
    }

    #[test]
    fn misuse_is_reported() {
        let g = group();
        let mut kex = KeyExchange::new(g.clone(), 2);
        let h = g.element(&Integer::from(5u32));
        let proof = dlog::prove(&g, &h, &Integer::from(5u32));
        // no own key yet
        assert!(kex.update_key(h.clone(), &proof).is_err());
        kex.generate_key().unwrap();
        assert!(kex.generate_key().is_err());
        // incomplete finalize
        assert!(KeyExchange::new(g, 2).finalize().is_err());
    }

    #[test]
    fn shares_transfer_over_streams() {
        let g = group();
        let mut kex0 = KeyExchange::new(g.clone(), 2);
        let (h0, p0) = kex0.generate_key().unwrap();
        let mut kex1 = KeyExchange::new(g, 2);
        kex1.generate_key().unwrap();

        let mut buf = Vec::new();
        kex0.publish_key(&mut buf).unwrap();
        let mut r = BufReader::new(&buf[..]);
        kex1.receive_key(&mut r).unwrap();

        let vtmf1 = kex1.finalize().unwrap();
        assert_eq!(vtmf1.key_share(1), Some(&h0));
        let _ = p0;
    }
}
