//! Interactive zero-knowledge proofs on values and cards
//!
//! Every proof is a sigma protocol repeated for `security` independent
//! rounds, one challenge bit per round. Provers return as soon as a
//! stream fails; verifiers absorb stream failure as rejection, so a
//! caller can time out a proof by closing the underlying stream.

use super::Toolbox;
use crate::{
    card::{Card, CardSecret},
    constants::MAX_STACK_CHARS,
    encoding::{Encoding, ResidueEncoding},
    error::Error,
    keys::{PublicKey, PublicKeyRing, SecretKey},
    parse::{recv, recv_bit, recv_integer, send_bit, send_integer},
    Result,
};
use rand::Rng;
use rug::Integer;
use std::io::{BufRead, Write};
use tmcg_num::rand::{strong_rng, Coprimes};

// the inverse link between two masks of the same value: given
// zz = mask(z, r, b) and zz' = mask(z, rr, bb), the pair taking zz to
// zz' is (rr/r * y^{-1 if only r toggled}, b ^ bb)
fn unlink(
    key: &PublicKey,
    r: &Integer,
    b: bool,
    rr: &Integer,
    bb: bool,
) -> (Integer, bool) {
    let m = key.modulus();
    let r_inv = r.clone().invert(m).expect("mask blind is invertible");
    let mut link = Integer::from(rr * &r_inv) % m;
    if b && !bb {
        let y_inv = key
            .witness()
            .clone()
            .invert(m)
            .expect("witness is invertible");
        link *= y_inv;
        link %= m;
    }
    (link, b ^ bb)
}

/// Interactive proofs on single values
impl Toolbox {
    /// Proves that `t` is a quadratic residue modulo the own modulus.
    pub fn prove_quadratic_residue(
        &self,
        key: &SecretKey,
        t: &Integer,
        fin: &mut dyn BufRead,
        out: &mut dyn Write,
    ) -> Result<()> {
        let m = key.modulus();
        let root = key.sqrt(t);
        let mut rng = strong_rng();

        for _ in 0..self.security {
            let r = rng.sample(&Coprimes(m));
            let commit = Integer::from(&r * &r) % m;
            send_integer(out, &commit)?;

            if !recv_bit(fin)? {
                send_integer(out, &r)?;
            } else {
                let resp = r * &root % m;
                send_integer(out, &resp)?;
            }
        }
        Ok(())
    }

    /// Verifies that `t` is a quadratic residue modulo the key's modulus.
    pub fn verify_quadratic_residue(
        &self,
        key: &PublicKey,
        t: &Integer,
        fin: &mut dyn BufRead,
        out: &mut dyn Write,
    ) -> bool {
        let m = key.modulus();
        let mut rng = strong_rng();

        let mut run = || -> Result<bool> {
            for _ in 0..self.security {
                let commit = recv_integer(fin, MAX_STACK_CHARS)?;
                let bit: bool = rng.gen();
                send_bit(out, bit)?;
                let resp = recv_integer(fin, MAX_STACK_CHARS)?;

                let mut sq = Integer::from(&resp * &resp);
                sq %= m;
                let expect = if bit {
                    Integer::from(&commit * t) % m
                } else {
                    commit
                };
                if sq != expect {
                    return Ok(false);
                }
            }
            Ok(true)
        };
        run().unwrap_or(false)
    }

    /// Proves that `t` is a non-residue by deciding the residuosity of
    /// the verifier's challenges.
    pub fn prove_nonquadratic_residue(
        &self,
        key: &SecretKey,
        _t: &Integer,
        fin: &mut dyn BufRead,
        out: &mut dyn Write,
    ) -> Result<()> {
        for _ in 0..self.security {
            let u = recv_integer(fin, MAX_STACK_CHARS)?;
            send_bit(out, !key.is_qr(&u))?;
        }
        Ok(())
    }

    /// Verifies that `t` is a non-residue modulo the key's modulus.
    pub fn verify_nonquadratic_residue(
        &self,
        key: &PublicKey,
        t: &Integer,
        fin: &mut dyn BufRead,
        out: &mut dyn Write,
    ) -> bool {
        let m = key.modulus();
        let mut rng = strong_rng();

        let mut run = || -> Result<bool> {
            for _ in 0..self.security {
                let r = rng.sample(&Coprimes(m));
                let b: bool = rng.gen();
                let mut u = Integer::from(&r * &r) % m;
                if b {
                    u *= t;
                    u %= m;
                }
                send_integer(out, &u)?;
                if recv_bit(fin)? != b {
                    return Ok(false);
                }
            }
            Ok(true)
        };
        run().unwrap_or(false)
    }

    /// Proves that the own witness `y` is a non-residue, leaking nothing
    /// even to a cheating verifier.
    ///
    /// The verifier opens every challenge after the guess; a challenge
    /// that does not open as a mask of one aborts the exchange.
    pub fn prove_nonquadratic_residue_perfect_zk(
        &self,
        key: &SecretKey,
        fin: &mut dyn BufRead,
        out: &mut dyn Write,
    ) -> Result<()> {
        let m = key.modulus();
        let y = key.witness();

        for _ in 0..self.security {
            let u = recv_integer(fin, MAX_STACK_CHARS)?;
            let guess = !key.is_qr(&u);
            send_bit(out, guess)?;

            let r = recv_integer(fin, MAX_STACK_CHARS)?;
            let mut expect = Integer::from(&r * &r) % m;
            if guess {
                expect *= y;
                expect %= m;
            }
            if expect != u {
                return Err(Error::Protocol("challenge does not open"));
            }
        }
        Ok(())
    }

    /// Verifies that the key's witness `y` is a non-residue, opening
    /// every challenge after the prover's guess.
    pub fn verify_nonquadratic_residue_perfect_zk(
        &self,
        key: &PublicKey,
        fin: &mut dyn BufRead,
        out: &mut dyn Write,
    ) -> bool {
        let m = key.modulus();
        let mut rng = strong_rng();

        let mut run = || -> Result<bool> {
            for _ in 0..self.security {
                let r = rng.sample(&Coprimes(m));
                let b: bool = rng.gen();
                let u = key.mask(&Integer::from(1), &r, b);
                send_integer(out, &u)?;
                let guess = recv_bit(fin)?;
                send_integer(out, &r)?;
                if guess != b {
                    return Ok(false);
                }
            }
            Ok(true)
        };
        run().unwrap_or(false)
    }

    /// Proves that `zz = z·r²·y^b` without revealing `(r, b)`.
    pub fn prove_mask_value(
        &self,
        key: &PublicKey,
        z: &Integer,
        r: &Integer,
        b: bool,
        fin: &mut dyn BufRead,
        out: &mut dyn Write,
    ) -> Result<()> {
        let m = key.modulus();
        let mut rng = strong_rng();

        for _ in 0..self.security {
            let rr = rng.sample(&Coprimes(m));
            let bb: bool = rng.gen();
            let commit = key.mask(z, &rr, bb);
            send_integer(out, &commit)?;

            if !recv_bit(fin)? {
                send_integer(out, &rr)?;
                send_bit(out, bb)?;
            } else {
                let (link, flip) = unlink(key, r, b, &rr, bb);
                send_integer(out, &link)?;
                send_bit(out, flip)?;
            }
        }
        Ok(())
    }

    /// Verifies that `zz` masks the same value as `z`.
    pub fn verify_mask_value(
        &self,
        key: &PublicKey,
        z: &Integer,
        zz: &Integer,
        fin: &mut dyn BufRead,
        out: &mut dyn Write,
    ) -> bool {
        let mut rng = strong_rng();

        let mut run = || -> Result<bool> {
            for _ in 0..self.security {
                let commit = recv_integer(fin, MAX_STACK_CHARS)?;
                let bit: bool = rng.gen();
                send_bit(out, bit)?;
                let rr = recv_integer(fin, MAX_STACK_CHARS)?;
                let bb = recv_bit(fin)?;

                let base = if bit { zz } else { z };
                if key.mask(base, &rr, bb) != commit {
                    return Ok(false);
                }
            }
            Ok(true)
        };
        run().unwrap_or(false)
    }

    /// Proves that a value of the form `r²·y^b` masks one.
    pub fn prove_mask_one(
        &self,
        key: &PublicKey,
        r: &Integer,
        b: bool,
        fin: &mut dyn BufRead,
        out: &mut dyn Write,
    ) -> Result<()> {
        self.prove_mask_value(key, &Integer::from(1), r, b, fin, out)
    }

    /// Verifies that `t` masks one.
    pub fn verify_mask_one(
        &self,
        key: &PublicKey,
        t: &Integer,
        fin: &mut dyn BufRead,
        out: &mut dyn Write,
    ) -> bool {
        self.verify_mask_value(key, &Integer::from(1), t, fin, out)
    }
}

/// Interactive proofs on cards
impl Toolbox {
    /// Proves that `cc` is `c` masked with `cs`.
    pub fn prove_mask_card(
        &self,
        ring: &PublicKeyRing,
        _c: &Card,
        cc: &Card,
        cs: &CardSecret,
        fin: &mut dyn BufRead,
        out: &mut dyn Write,
    ) -> Result<()> {
        self.check_ring(ring);
        let enc = ResidueEncoding::new(ring, self.type_bits);

        for _ in 0..self.security {
            let fresh = enc.random_secret();
            let commit = enc.mask(cc, &fresh);
            commit.write_to(out)?;

            if !recv_bit(fin)? {
                fresh.write_to(out)?;
            } else {
                enc.compose(cs, &fresh).write_to(out)?;
            }
        }
        Ok(())
    }

    /// Verifies that `cc` masks the same card as `c`.
    pub fn verify_mask_card(
        &self,
        ring: &PublicKeyRing,
        c: &Card,
        cc: &Card,
        fin: &mut dyn BufRead,
        out: &mut dyn Write,
    ) -> bool {
        self.check_ring(ring);
        let enc = ResidueEncoding::new(ring, self.type_bits);
        if !enc.valid_card(c) || !enc.valid_card(cc) {
            return false;
        }
        let mut rng = strong_rng();

        let mut run = || -> Result<bool> {
            for _ in 0..self.security {
                let commit: Card = recv(fin, MAX_STACK_CHARS)?;
                if !enc.valid_card(&commit) {
                    return Ok(false);
                }
                let bit: bool = rng.gen();
                send_bit(out, bit)?;
                let secret: CardSecret = recv(fin, MAX_STACK_CHARS)?;
                if !enc.preserves_types(&secret) {
                    return Ok(false);
                }
                let base = if bit { c } else { cc };
                if enc.mask(base, &secret) != commit {
                    return Ok(false);
                }
            }
            Ok(true)
        };
        run().unwrap_or(false)
    }

    /// Proves the structure of a private card from its creation secret.
    pub fn prove_private_card(
        &self,
        cs: &CardSecret,
        ring: &PublicKeyRing,
        fin: &mut dyn BufRead,
        out: &mut dyn Write,
    ) -> Result<()> {
        self.check_ring(ring);
        for i in 0..self.players {
            for j in 0..self.type_bits {
                self.prove_mask_one(
                    &ring.keys[i],
                    &cs.r[i][j],
                    cs.b[i][j].is_odd(),
                    fin,
                    out,
                )?;
            }
        }
        Ok(())
    }

    /// Verifies that a card is a well-formed private card of the owner's
    /// seat: every entry masks one and rows of other seats hold exactly
    /// one.
    pub fn verify_private_card(
        &self,
        c: &Card,
        ring: &PublicKeyRing,
        owner: usize,
        fin: &mut dyn BufRead,
        out: &mut dyn Write,
    ) -> bool {
        self.check_ring(ring);
        if owner >= self.players {
            return false;
        }
        if c.players() != self.players || c.bits() != self.type_bits {
            return false;
        }
        for i in 0..self.players {
            for j in 0..self.type_bits {
                if i != owner && *c.value(i, j) != 1 {
                    return false;
                }
                if !self.verify_mask_one(&ring.keys[i], c.value(i, j), fin, out) {
                    return false;
                }
            }
        }
        true
    }

    /// Releases the residuosity of the own row of a card, one claim and
    /// proof per type bit.
    pub fn prove_card_secret(
        &self,
        c: &Card,
        key: &SecretKey,
        owner: usize,
        fin: &mut dyn BufRead,
        out: &mut dyn Write,
    ) -> Result<()> {
        assert!(owner < self.players);
        assert_eq!(c.players(), self.players);
        assert_eq!(c.bits(), self.type_bits);

        for j in 0..self.type_bits {
            let z = c.value(owner, j);
            let nqr = !key.is_qr(z);
            send_bit(out, nqr)?;
            if nqr {
                self.prove_nonquadratic_residue(key, z, fin, out)?;
            } else {
                self.prove_quadratic_residue(key, z, fin, out)?;
            }
        }
        Ok(())
    }

    /// Verifies another player's residuosity claims for its card row,
    /// filling that row of the card secret.
    pub fn verify_card_secret(
        &self,
        c: &Card,
        key: &PublicKey,
        owner: usize,
        cs: &mut CardSecret,
        fin: &mut dyn BufRead,
        out: &mut dyn Write,
    ) -> bool {
        if owner >= self.players {
            return false;
        }
        if c.players() != self.players || c.bits() != self.type_bits {
            return false;
        }
        if cs.players() != self.players || cs.bits() != self.type_bits {
            return false;
        }

        for j in 0..self.type_bits {
            let nqr = match recv_bit(fin) {
                Ok(b) => b,
                Err(_) => return false,
            };
            let z = c.value(owner, j).clone();
            let ok = if nqr {
                self.verify_nonquadratic_residue(key, &z, fin, out)
            } else {
                self.verify_quadratic_residue(key, &z, fin, out)
            };
            if !ok {
                return false;
            }
            cs.r[owner][j] = Integer::from(1);
            cs.b[owner][j] = Integer::from(nqr as u32);
        }
        true
    }
}
