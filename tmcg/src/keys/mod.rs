//! Quadratic-residue key material
//!
//! A key pair is built around a Blum integer `m = pq` from two safe
//! primes and a public non-residue witness `y`. The public key carries a
//! non-interactive proof that `m` is square-free, a product of two prime
//! powers, and that `y` really is a non-residue with Jacobi symbol +1,
//! together with a self-signature binding the owner's identity to the
//! parameters.

use crate::{
    constants::{KEYID_SIZE, MAX_KEY_BITS, MR_ITERATIONS},
    error::Error,
    parse::{radix, Scanner},
    Result,
};
use rand::Rng;
use rug::{integer::IsPrime, Integer};
use std::fmt::{self, Display, Formatter};
use tmcg_num::{
    prime::{generate_safe_prime_with, SEARCH_ITERATIONS},
    rand::{weak_rng, Modulo},
    sqrt::{is_qr_mod_pq, BlumCrt},
};

mod nizk;
mod saep;

/// A secret key
///
/// Besides the identity and the prime factorization, this holds the
/// shortcuts derived from `(m, y, p, q)`: they are a pure function of the
/// persistent fields and are rebuilt by [finalise](RawSecretKey::finalise)
/// after generation and import.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SecretKey {
    name: String,
    email: String,
    key_type: String,
    m: Integer,
    y: Integer,
    p: Integer,
    q: Integer,
    nizk: String,
    sig: String,
    pre: Precomputed,
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct Precomputed {
    y_inv: Integer,
    m_inv_phi: Integer,
    crt: BlumCrt,
}

/// A public key
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PublicKey {
    name: String,
    email: String,
    key_type: String,
    m: Integer,
    y: Integer,
    nizk: String,
    sig: String,
}

/// An ordered sequence of public keys, one per seat
#[derive(Clone, Debug, Default)]
pub struct PublicKeyRing {
    /// The keys, at fixed seat indices
    pub keys: Vec<PublicKey>,
}

/// An imported secret key before its shortcuts are rebuilt
struct RawSecretKey {
    name: String,
    email: String,
    key_type: String,
    m: Integer,
    y: Integer,
    p: Integer,
    q: Integer,
    nizk: String,
    sig: String,
}

impl RawSecretKey {
    /// Derives the non-persistent shortcuts, yielding a usable key.
    fn finalise(self) -> Result<SecretKey> {
        let y_inv = self
            .y
            .clone()
            .invert(&self.m)
            .map_err(|_| Error::Parse("y is not invertible"))?;
        let mut phi = Integer::from(&self.m - &self.p);
        phi -= &self.q;
        phi += 1;
        let m_inv_phi = self
            .m
            .clone()
            .invert(&phi)
            .map_err(|_| Error::Parse("m is not invertible mod phi"))?;
        let crt = BlumCrt::new(self.p.clone(), self.q.clone())
            .ok_or(Error::Parse("p and q are not a Blum pair"))?;
        if *crt.modulus() != self.m {
            return Err(Error::Parse("m is not pq"));
        }
        Ok(SecretKey {
            name: self.name,
            email: self.email,
            key_type: self.key_type,
            m: self.m,
            y: self.y,
            p: self.p,
            q: self.q,
            nizk: self.nizk,
            sig: self.sig,
            pre: Precomputed {
                y_inv,
                m_inv_phi,
                crt,
            },
        })
    }
}

impl SecretKey {
    /// Generates a fresh key pair of the given modulus bit length.
    pub fn generate(name: &str, email: &str, keysize: u32) -> SecretKey {
        assert!(keysize >= 512 && keysize <= MAX_KEY_BITS);

        let key_type = format!("TMCG/RABIN_{}_NIZK", keysize);
        let prime_bits = keysize / 2 + 1;

        // the SAEP bound keeps m inside [2^keysize, 2^{keysize+1} + 2^keysize)
        let mut upper = Integer::from(1) << (keysize + 1);
        upper += Integer::from(1) << keysize;

        let (p, q, m) = loop {
            let p = generate_safe_prime_with(prime_bits, SEARCH_ITERATIONS, |_| true);
            let q = generate_safe_prime_with(prime_bits, SEARCH_ITERATIONS, |q| {
                !q.is_congruent(&p, &Integer::from(8))
            });
            let m = Integer::from(&p * &q);
            if m.significant_bits() >= keysize + 1 && m < upper {
                break (p, q, m);
            }
        };

        // y from Z°_m that is a non-residue modulo both primes; the search
        // runs in the weak tier, the result is checked right here
        let mut rng = weak_rng();
        let y = loop {
            let y = rng.sample(&Modulo(&m));
            if y.jacobi(&m) == 1 && !is_qr_mod_pq(&y, &p, &q) {
                break y;
            }
        };

        let raw = RawSecretKey {
            name: name.to_string(),
            email: email.to_string(),
            key_type,
            m,
            y,
            p,
            q,
            nizk: String::new(),
            sig: String::new(),
        };
        let mut key = raw.finalise().expect("generated parameters are consistent");

        key.nizk = nizk::produce(&key.m, &key.y, &key.pre.m_inv_phi, &key.pre.crt);

        // self-signature: sign with the placeholder key id, then rewrite
        // it with the id derived from the signature itself
        let placeholder = key.keyid();
        let data = key.signed_data();
        let sig = key.sign(&data);
        key.sig = sig;
        let keyid = key.keyid();
        key.sig = key.sig.replacen(&placeholder, &keyid, 1);

        key
    }

    /// Gets the owner's name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Gets the owner's email address
    pub fn email(&self) -> &str {
        &self.email
    }

    /// Gets the key type tag
    pub fn key_type(&self) -> &str {
        &self.key_type
    }

    /// Gets the modulus
    pub fn modulus(&self) -> &Integer {
        &self.m
    }

    /// Gets the non-residue witness
    pub fn witness(&self) -> &Integer {
        &self.y
    }

    /// Gets a public key that corresponds with this key
    pub fn public(&self) -> PublicKey {
        PublicKey {
            name: self.name.clone(),
            email: self.email.clone(),
            key_type: self.key_type.clone(),
            m: self.m.clone(),
            y: self.y.clone(),
            nizk: self.nizk.clone(),
            sig: self.sig.clone(),
        }
    }

    /// Tests whether a value is a quadratic residue modulo `m`.
    pub fn is_qr(&self, a: &Integer) -> bool {
        self.pre.crt.is_qr(a)
    }

    /// Undoes a known masking operation `zz = z·r²·y^b mod m`.
    pub fn unmask(&self, zz: &Integer, r: &Integer, b: bool) -> Integer {
        let r2_inv = Integer::from(r * r)
            .invert(&self.m)
            .expect("mask blind is invertible");
        let mut z = Integer::from(zz * &r2_inv) % &self.m;
        if b {
            z *= &self.pre.y_inv;
            z %= &self.m;
        }
        z
    }

    /// Computes one square root modulo `m`.
    pub(crate) fn sqrt(&self, a: &Integer) -> Integer {
        self.pre.crt.sqrt(a)
    }

    /// Validates the key structure, its proof bundle and self-signature.
    pub fn check(&self) -> bool {
        self.public().check()
    }

    /// Gets the identity part of the self-signature
    pub fn selfid(&self) -> String {
        selfid_of(&self.sig)
    }

    /// Gets the key id derived from the self-signature
    pub fn keyid(&self) -> String {
        keyid_of(&self.sig)
    }

    fn signed_data(&self) -> String {
        signed_data(
            &self.name,
            &self.email,
            &self.key_type,
            &self.m,
            &self.y,
            &self.nizk,
        )
    }

    /// Verifies a signature made with this key.
    pub fn verify(&self, data: &str, sig: &str) -> bool {
        self.public().verify(data, sig)
    }

    /// Imports a key from its textual form.
    pub fn import(s: &str) -> Result<SecretKey> {
        let mut sc = Scanner::new(s, "sec", '|')?;
        let name = sc.nonempty_field()?.to_string();
        let email = sc.nonempty_field()?.to_string();
        let key_type = sc.nonempty_field()?.to_string();
        let m = sc.integer_field()?;
        let y = sc.integer_field()?;
        let p = sc.integer_field()?;
        let q = sc.integer_field()?;
        let nizk = sc.nonempty_field()?.to_string();
        let sig = sc.rest().to_string();
        RawSecretKey {
            name,
            email,
            key_type,
            m,
            y,
            p,
            q,
            nizk,
            sig,
        }
        .finalise()
    }
}

impl PublicKey {
    /// Gets the owner's name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Gets the owner's email address
    pub fn email(&self) -> &str {
        &self.email
    }

    /// Gets the key type tag
    pub fn key_type(&self) -> &str {
        &self.key_type
    }

    /// Gets the modulus
    pub fn modulus(&self) -> &Integer {
        &self.m
    }

    /// Gets the non-residue witness
    pub fn witness(&self) -> &Integer {
        &self.y
    }

    /// Applies the masking operation `z·r²·y^b mod m`.
    pub fn mask(&self, z: &Integer, r: &Integer, b: bool) -> Integer {
        let mut zz = Integer::from(r * r);
        zz %= &self.m;
        zz *= z;
        zz %= &self.m;
        if b {
            zz *= &self.y;
            zz %= &self.m;
        }
        zz
    }

    /// Composes two masks into the single equivalent mask.
    ///
    /// `y²` is itself a square, so the doubled witness folds into the
    /// multiplicative part.
    pub fn combine_masks(
        &self,
        r1: &Integer,
        b1: bool,
        r2: &Integer,
        b2: bool,
    ) -> (Integer, bool) {
        let mut r = Integer::from(r1 * r2);
        r %= &self.m;
        if b1 && b2 {
            r *= &self.y;
            r %= &self.m;
        }
        (r, b1 ^ b2)
    }

    /// Gets the identity part of the self-signature
    pub fn selfid(&self) -> String {
        selfid_of(&self.sig)
    }

    /// Gets the key id derived from the self-signature
    pub fn keyid(&self) -> String {
        keyid_of(&self.sig)
    }

    /// Gets the key id a signature claims to be made with.
    pub fn sigid(sig: &str) -> Option<String> {
        let mut sc = Scanner::new(sig, "sig", '|').ok()?;
        sc.field().ok().map(str::to_string)
    }

    fn signed_data(&self) -> String {
        signed_data(
            &self.name,
            &self.email,
            &self.key_type,
            &self.m,
            &self.y,
            &self.nizk,
        )
    }

    /// Validates the key structure, its proof bundle and self-signature.
    pub fn check(&self) -> bool {
        if self.y.jacobi(&self.m) != 1 {
            return false;
        }
        if self.m.is_even() {
            return false;
        }
        if self.m.is_probably_prime(MR_ITERATIONS) != IsPrime::No {
            return false;
        }
        if !self.verify(&self.signed_data(), &self.sig) {
            return false;
        }
        if self.is_fermat_prime() {
            return false;
        }
        nizk::verify(&self.m, &self.y, &self.nizk)
    }

    // m = 2^t + 1 with t a power of two, confirmed by Pepin's test on 5
    fn is_fermat_prime(&self) -> bool {
        let mm1 = Integer::from(&self.m - 1u32);
        if !mm1.is_power_of_two() {
            return false;
        }
        let t = mm1.significant_bits() - 1;
        if !t.is_power_of_two() {
            return false;
        }
        if self.m == 5 {
            return true;
        }
        let e = Integer::from(1) << (t / 2);
        let check = Integer::from(5u32).pow_mod(&e, &self.m).unwrap();
        check == Integer::from(&self.m - 1u32)
    }

    /// Imports a key from its textual form.
    pub fn import(s: &str) -> Result<PublicKey> {
        let mut sc = Scanner::new(s, "pub", '|')?;
        let name = sc.nonempty_field()?.to_string();
        let email = sc.nonempty_field()?.to_string();
        let key_type = sc.nonempty_field()?.to_string();
        let m = sc.integer_field()?;
        let y = sc.integer_field()?;
        let nizk = sc.nonempty_field()?.to_string();
        let sig = sc.rest().to_string();
        Ok(PublicKey {
            name,
            email,
            key_type,
            m,
            y,
            nizk,
            sig,
        })
    }
}

impl PublicKeyRing {
    /// Creates a ring from per-seat keys.
    pub fn new(keys: Vec<PublicKey>) -> Self {
        Self { keys }
    }

    /// Gets the number of seats.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Tests whether the ring is empty.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

fn signed_data(
    name: &str,
    email: &str,
    key_type: &str,
    m: &Integer,
    y: &Integer,
    nizk: &str,
) -> String {
    format!(
        "{}|{}|{}|{}|{}|{}|",
        name,
        email,
        key_type,
        radix(m),
        radix(y),
        nizk
    )
}

const SELFSIG: &str = "SELFSIG-SELFSIG-SELFSIG-SELFSIG-SELFSIG-SELFSIG";

fn selfid_of(sig: &str) -> String {
    if sig.is_empty() {
        // self-signature bootstrap
        return SELFSIG.to_string();
    }
    let id = Scanner::new(sig, "sig", '|').and_then(|mut sc| {
        sc.field()?;
        sc.field().map(str::to_string)
    });
    id.unwrap_or_else(|_| "ERROR".to_string())
}

fn keyid_of(sig: &str) -> String {
    let selfid = selfid_of(sig);
    let n = KEYID_SIZE.min(selfid.len());
    format!("ID{}^{}", KEYID_SIZE, &selfid[selfid.len() - n..])
}

impl Display for SecretKey {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(
            f,
            "sec|{}|{}|{}|{}|{}|{}|{}|{}|{}",
            self.name,
            self.email,
            self.key_type,
            radix(&self.m),
            radix(&self.y),
            radix(&self.p),
            radix(&self.q),
            self.nizk,
            self.sig
        )
    }
}

impl Display for PublicKey {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(
            f,
            "pub|{}|{}|{}|{}|{}|{}|{}",
            self.name,
            self.email,
            self.key_type,
            radix(&self.m),
            radix(&self.y),
            self.nizk,
            self.sig
        )
    }
}

derive_wire_conversions!(SecretKey);
derive_wire_conversions!(PublicKey);
