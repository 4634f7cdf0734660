//! The non-interactive proof bundle attached to a public key
//!
//! Three stages under the random-oracle heuristic, each drawing its
//! challenges from the common hash chain seeded with `(m, y)`:
//! square-freeness of `m`, `m` being a product of two prime powers, and
//! `y` being a non-residue with Jacobi symbol +1.

use crate::{
    constants::{NIZK_STAGE1, NIZK_STAGE2, NIZK_STAGE3},
    hash::Oracle,
    parse::{radix, Scanner},
    Result,
};
use rug::Integer;
use tmcg_num::sqrt::BlumCrt;

/// Produces the proof bundle for a freshly generated key.
pub(super) fn produce(m: &Integer, y: &Integer, m_inv_phi: &Integer, crt: &BlumCrt) -> String {
    let mut oracle = Oracle::new(&[m, y]);
    let mut out = String::from("nzk^");

    // stage 1: m is square-free; c^{m^{-1} mod phi(m)} is an m-th root
    out += &format!("{}^", NIZK_STAGE1);
    for _ in 0..NIZK_STAGE1 {
        let c = oracle.next_coprime(m);
        let r = c.pow_mod(m_inv_phi, m).unwrap();
        out += &radix(&r);
        out.push('^');
    }

    // stage 2: m is a product of two prime powers; exactly one of
    // +-c, +-2c is a residue
    out += &format!("{}^", NIZK_STAGE2);
    for _ in 0..NIZK_STAGE2 {
        let c = oracle.next_coprime(m);
        let r = variants(&c, m)
            .iter()
            .find(|v| crt.is_qr(v))
            .map(|v| smallest_root(crt, v))
            .unwrap_or_default();
        out += &radix(&r);
        out.push('^');
    }

    // stage 3: y is a non-residue; either c or c*y has a root
    out += &format!("{}^", NIZK_STAGE3);
    for _ in 0..NIZK_STAGE3 {
        let mut c = oracle.next_jacobi_one(m);
        if !crt.is_qr(&c) {
            c *= y;
            c %= m;
        }
        let r = smallest_root(crt, &c);
        out += &radix(&r);
        out.push('^');
    }

    out
}

/// Verifies a proof bundle against the key parameters.
pub(super) fn verify(m: &Integer, y: &Integer, nizk: &str) -> bool {
    check(m, y, nizk).is_ok()
}

fn check(m: &Integer, y: &Integer, nizk: &str) -> Result<()> {
    use crate::error::Error;

    let mut sc = Scanner::new(nizk, "nzk", '^')?;
    let mut oracle = Oracle::new(&[m, y]);

    let stage1 = sc.size_field()?;
    if stage1 < NIZK_STAGE1 {
        return Err(Error::Parse("stage 1 too short"));
    }
    for _ in 0..stage1 {
        let c = oracle.next_coprime(m);
        let r = sc.integer_field()?;
        let rm = r.pow_mod(m, m).map_err(|_| Error::Parse("bad response"))?;
        if rm != c {
            return Err(Error::Parse("stage 1 response"));
        }
    }

    let stage2 = sc.size_field()?;
    if stage2 < NIZK_STAGE2 {
        return Err(Error::Parse("stage 2 too short"));
    }
    for _ in 0..stage2 {
        let c = oracle.next_coprime(m);
        let r = sc.integer_field()?;
        let mut sq = Integer::from(&r * &r);
        sq %= m;
        if !variants(&c, m).contains(&sq) {
            return Err(Error::Parse("stage 2 response"));
        }
    }

    let stage3 = sc.size_field()?;
    if stage3 < NIZK_STAGE3 {
        return Err(Error::Parse("stage 3 too short"));
    }
    for _ in 0..stage3 {
        let c = oracle.next_jacobi_one(m);
        let r = sc.integer_field()?;
        let mut sq = Integer::from(&r * &r);
        sq %= m;
        let cy = Integer::from(&c * y) % m;
        if sq != c && sq != cy {
            return Err(Error::Parse("stage 3 response"));
        }
    }

    sc.finish()
}

// +c, -c, +2c, -2c, all reduced mod m
fn variants(c: &Integer, m: &Integer) -> [Integer; 4] {
    let pos = c.clone();
    let neg = Integer::from(m - c);
    let two = Integer::from(c * 2u32) % m;
    let negtwo = Integer::from(m - &two);
    [pos, neg, two, negtwo]
}

fn smallest_root(crt: &BlumCrt, a: &Integer) -> Integer {
    let roots = crt.sqrt_all(a);
    roots.iter().min().cloned().unwrap_or_default()
}
