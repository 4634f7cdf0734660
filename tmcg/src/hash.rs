//! Cryptographic hash functions

use digest::Digest;
use rug::{integer::Order, Integer};

/// The hash function used by the toolbox
pub type Hash = ripemd160::Ripemd160;

/// Expands the digest of `data` to an arbitrary length.
///
/// Output blocks are digests of the data salted with a running block
/// counter, so distinct lengths share a prefix but no block is reused
/// across positions.
pub fn xof(len: usize, data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(len + Hash::output_size());
    let mut counter = 0u32;
    while out.len() < len {
        let block = Hash::new()
            .chain(&counter.to_be_bytes())
            .chain(data)
            .result();
        out.extend_from_slice(&block);
        counter += 1;
    }
    out.truncate(len);
    out
}

/// A deterministic hash chain producing common random group elements.
///
/// Prover and verifier run the same chain from the same seed; every
/// candidate drawn extends the chain, whether or not it satisfies the
/// membership test, so both sides stay in lockstep.
#[derive(Clone, Debug)]
pub struct Oracle {
    input: String,
}

impl Oracle {
    /// Creates a chain seeded with the given integers
    pub fn new(seed: &[&Integer]) -> Self {
        let input = seed
            .iter()
            .map(|i| i.to_string())
            .collect::<Vec<_>>()
            .join("^");
        Self { input }
    }

    fn draw(&mut self, m: &Integer) -> Integer {
        let bytes = ((m.significant_bits() / 8) as usize).max(1);
        let raw = xof(bytes, self.input.as_bytes());
        let mut c = Integer::from_digits(&raw, Order::MsfBe);
        c %= m;
        self.input += &c.to_string();
        c
    }

    /// Produces the next element of `Z*_m` on the chain
    pub fn next_coprime(&mut self, m: &Integer) -> Integer {
        loop {
            let c = self.draw(m);
            let gcd = Integer::from(c.gcd_ref(m));
            if gcd == 1 {
                return c;
            }
        }
    }

    /// Produces the next element of `Z°_m` (Jacobi symbol +1) on the chain
    pub fn next_jacobi_one(&mut self, m: &Integer) -> Integer {
        loop {
            let c = self.draw(m);
            if c.jacobi(m) == 1 {
                return c;
            }
        }
    }

    /// Produces the next element of the order-`q` subgroup of `Z*_p`,
    /// where `p = kq + 1`
    pub fn next_in_subgroup(&mut self, p: &Integer, k: &Integer) -> Integer {
        loop {
            let c = self.draw(p);
            let e = Integer::from(c.pow_mod_ref(k, p).unwrap());
            if e > 1 {
                return e;
            }
        }
    }
}
