//! Rabin encryption with SAEP padding and PRab signatures

use super::{PublicKey, SecretKey};
use crate::{
    constants::{PRAB_K0, SAEP_S0},
    hash::{xof, Hash},
    parse::{radix, Scanner},
};
use digest::Digest;
use rand::Rng;
use rug::{integer::Order, Integer};
use tmcg_num::rand::strong_rng;

// sizes in octets, derived from the modulus; None when the modulus is
// too small to carry the padding
fn saep_sizes(m: &Integer) -> Option<(usize, usize)> {
    let bits = m.significant_bits() as usize;
    let s2 = 2 * SAEP_S0;
    if bits / 8 <= s2 {
        return None;
    }
    let s1 = bits / 8 - s2;
    if 8 * s2 >= bits / 2 || s2 >= s1 || 8 * SAEP_S0 >= bits / 4 {
        return None;
    }
    Some((s1, s2))
}

fn prab_sizes(m: &Integer) -> Option<(usize, usize)> {
    let bits = m.significant_bits() as usize;
    let mdsize = Hash::output_size();
    let mnsize = bits / 8;
    if bits <= 8 * mnsize || mnsize <= mdsize + PRAB_K0 {
        return None;
    }
    Some((mdsize, mnsize))
}

fn to_padded_bytes(x: &Integer, len: usize) -> Option<Vec<u8>> {
    let digits = x.to_digits::<u8>(Order::MsfBe);
    if digits.len() > len {
        return None;
    }
    let mut out = vec![0u8; len - digits.len()];
    out.extend_from_slice(&digits);
    Some(out)
}

impl PublicKey {
    /// Encrypts a plaintext of exactly [SAEP_S0] bytes.
    pub fn encrypt(&self, value: &[u8]) -> String {
        assert_eq!(value.len(), SAEP_S0);
        let (s1, s2) = saep_sizes(&self.m).expect("modulus too small for the padding");

        let mut r = vec![0u8; s1];
        strong_rng().fill(&mut r[..]);

        let mut mt = vec![0u8; s2];
        mt[..SAEP_S0].copy_from_slice(value);
        for (b, g) in mt.iter_mut().zip(xof(s2, &r)) {
            *b ^= g;
        }

        mt.extend_from_slice(&r);
        let mut c = Integer::from_digits(&mt, Order::MsfBe);
        c.square_mut();
        c %= &self.m;

        format!("enc|{}|{}|", self.keyid(), radix(&c))
    }
}

impl SecretKey {
    /// Encrypts a plaintext of exactly [SAEP_S0] bytes under the own key.
    pub fn encrypt(&self, value: &[u8]) -> String {
        self.public().encrypt(value)
    }

    /// Decrypts a ciphertext record, recovering [SAEP_S0] bytes.
    ///
    /// Returns `None` when the record is malformed, addressed to another
    /// key, or no square root carries the padding redundancy.
    pub fn decrypt(&self, value: &str) -> Option<Vec<u8>> {
        let (s1, s2) = saep_sizes(&self.m)?;

        let mut sc = Scanner::new(value, "enc", '|').ok()?;
        if sc.field().ok()? != self.keyid() {
            return None;
        }
        let c = sc.integer_field().ok()?;
        sc.finish().ok()?;

        if !self.pre.crt.is_qr(&c) {
            return None;
        }
        for root in &self.pre.crt.sqrt_all(&c) {
            let bytes = match to_padded_bytes(root, s1 + s2) {
                Some(b) => b,
                None => continue,
            };
            let (mt, r) = bytes.split_at(s2);
            let mut mt = mt.to_vec();
            for (b, g) in mt.iter_mut().zip(xof(s2, r)) {
                *b ^= g;
            }
            if mt[SAEP_S0..].iter().all(|&b| b == 0) {
                mt.truncate(SAEP_S0);
                return Some(mt);
            }
        }
        None
    }

    /// Signs data with the Rabin function over a PRab-padded digest.
    pub fn sign(&self, data: &str) -> String {
        let (mdsize, mnsize) = prab_sizes(&self.m).expect("modulus too small for the padding");
        let mut rng = strong_rng();

        let pre = loop {
            let mut r = vec![0u8; PRAB_K0];
            rng.fill(&mut r[..]);

            let w = Hash::new().chain(data.as_bytes()).chain(&r).result();
            let g12 = xof(mnsize - mdsize, &w);

            for (b, g) in r.iter_mut().zip(&g12[..PRAB_K0]) {
                *b ^= g;
            }

            let mut bytes = w.to_vec();
            bytes.extend_from_slice(&r);
            bytes.extend_from_slice(&g12[PRAB_K0..]);
            let pre = Integer::from_digits(&bytes, Order::MsfBe);
            if self.pre.crt.is_qr(&pre) {
                break pre;
            }
        };

        let roots = self.pre.crt.sqrt_all(&pre);
        let pick: usize = rng.gen_range(0, 4);

        format!("sig|{}|{}|", self.keyid(), radix(&roots[pick]))
    }
}

impl PublicKey {
    /// Verifies a signature record over the given data.
    pub fn verify(&self, data: &str, sig: &str) -> bool {
        let (mdsize, mnsize) = match prab_sizes(&self.m) {
            Some(s) => s,
            None => return false,
        };

        let parsed = Scanner::new(sig, "sig", '|').and_then(|mut sc| {
            let keyid = sc.field()?.to_string();
            let v = sc.integer_field()?;
            sc.finish()?;
            Ok((keyid, v))
        });
        let (keyid, v) = match parsed {
            Ok(p) => p,
            Err(_) => return false,
        };
        if keyid != self.keyid() {
            return false;
        }

        let mut sq = Integer::from(&v * &v);
        sq %= &self.m;
        let bytes = match to_padded_bytes(&sq, mnsize) {
            Some(b) => b,
            None => return false,
        };
        let (w, rest) = bytes.split_at(mdsize);
        let (r, gamma) = rest.split_at(PRAB_K0);

        let g12 = xof(mnsize - mdsize, w);
        let mut r = r.to_vec();
        for (b, g) in r.iter_mut().zip(&g12[..PRAB_K0]) {
            *b ^= g;
        }

        let w2 = Hash::new().chain(data.as_bytes()).chain(&r).result();
        w == &w2[..] && gamma == &g12[PRAB_K0..]
    }
}

#[cfg(test)]
mod test {
    use crate::keys::test::{ALICE, BOB};

    #[test]
    fn decryption_inverts_encryption() {
        let plaintext = *b"twenty byte messages";
        let record = ALICE.public().encrypt(&plaintext);
        assert!(record.starts_with("enc|"));
        let recovered = ALICE.decrypt(&record).expect("no root matched");
        assert_eq!(recovered, plaintext);
    }

    #[test]
    fn decryption_under_another_key_fails() {
        let plaintext = *b"twenty byte messages";
        let record = ALICE.public().encrypt(&plaintext);
        assert!(BOB.decrypt(&record).is_none());
    }

    #[test]
    fn decryption_rejects_malformed_records() {
        assert!(ALICE.decrypt("garbage").is_none());
        assert!(ALICE.decrypt("enc|ID32^nope|123|").is_none());
    }

    #[test]
    fn signatures_verify_and_tampering_is_detected() {
        let sig = ALICE.sign("a signed statement");
        assert!(ALICE.verify("a signed statement", &sig));
        assert!(ALICE.public().verify("a signed statement", &sig));

        assert!(!ALICE.verify("another statement", &sig));
        assert!(!BOB.public().verify("a signed statement", &sig));

        // flip one character of the signature value
        let flipped = {
            let mut chars: Vec<char> = sig.chars().collect();
            let at = sig.len() - 10;
            chars[at] = if chars[at] == '1' { '2' } else { '1' };
            chars.into_iter().collect::<String>()
        };
        assert!(!ALICE.verify("a signed statement", &flipped));
    }

    #[test]
    fn fresh_signatures_differ() {
        let a = ALICE.sign("data");
        let b = ALICE.sign("data");
        assert_ne!(a, b, "signature padding seed repeated");
    }
}
