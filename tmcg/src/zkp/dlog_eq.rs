//! Chaum and Pedersen's zero-knowledge proof of equality of discrete
//! logarithms

use crate::{
    hash::Hash,
    parse::{recv_integer, send_integer},
    schnorr::Group,
    Result,
};
use digest::Digest;
use rand::{thread_rng, Rng};
use rug::{integer::Order, Integer};
use std::{
    cmp::Ordering,
    io::{BufRead, Write},
};
use tmcg_num::{fpowm, rand::Modulo};

/// Non-interactive proof result
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Proof {
    c: Integer,
    r: Integer,
}

/// Generates a non-interactive zero-knowledge proof that
/// log_g(x) = log_h(y)
pub fn prove(
    group: &Group,
    x: &Integer,
    y: &Integer,
    g: &Integer,
    h: &Integer,
    alpha: &Integer,
) -> Proof {
    let p = group.modulus();
    let q = group.order();
    let omega = thread_rng().sample(&Modulo(q));
    let a = fpowm::pow_mod(g, &omega, p).unwrap();
    let b = fpowm::pow_mod(h, &omega, p).unwrap();

    let c = challenge(&a, &b, x, y, g, h);
    let r = (&omega - Integer::from(&c * alpha)) % q;
    Proof { c, r }
}

/// Verifies a non-interactive zero-knowledge proof that
/// log_g(x) = log_h(y)
pub fn verify(
    group: &Group,
    x: &Integer,
    y: &Integer,
    g: &Integer,
    h: &Integer,
    proof: &Proof,
) -> bool {
    let p = group.modulus();
    let q = group.order();

    if proof.r.cmp_abs(q) != Ordering::Less {
        return false;
    }

    let xc = Integer::from(x.pow_mod_ref(&proof.c, p).unwrap());
    let gr = match fpowm::pow_mod(g, &proof.r, p) {
        Some(v) => v,
        None => return false,
    };
    let a = gr * xc % p;

    let yc = Integer::from(y.pow_mod_ref(&proof.c, p).unwrap());
    let hr = match fpowm::pow_mod(h, &proof.r, p) {
        Some(v) => v,
        None => return false,
    };
    let b = hr * yc % p;

    let c1 = challenge(&a, &b, x, y, g, h);

    proof.c == c1
}

fn challenge(
    a: &Integer,
    b: &Integer,
    x: &Integer,
    y: &Integer,
    g: &Integer,
    h: &Integer,
) -> Integer {
    Integer::from_digits(
        &Hash::new()
            .chain(&a.to_digits(Order::MsfBe))
            .chain(&b.to_digits(Order::MsfBe))
            .chain(&x.to_digits(Order::MsfBe))
            .chain(&y.to_digits(Order::MsfBe))
            .chain(&g.to_digits(Order::MsfBe))
            .chain(&h.to_digits(Order::MsfBe))
            .result(),
        Order::MsfBe,
    )
}

impl Proof {
    /// Writes this proof as two integer lines.
    pub fn write_to(&self, w: &mut dyn Write) -> Result<()> {
        send_integer(w, &self.c)?;
        send_integer(w, &self.r)
    }

    /// Reads a proof from two integer lines.
    pub fn read_from(r: &mut dyn BufRead, cap: usize) -> Result<Proof> {
        let c = recv_integer(r, cap)?;
        let rr = recv_integer(r, cap)?;
        Ok(Proof { c, r: rr })
    }
}

#[cfg(test)]
mod test {
    use super::{prove, verify};
    use crate::schnorr::Groups;
    use rand::{thread_rng, Rng};
    use rug::Integer;
    use tmcg_num::{fpowm, rand::Modulo};

    #[test]
    fn prove_and_verify_agree() {
        let mut rng = thread_rng();
        let dist = Groups {
            field_bits: 1024,
            group_bits: 160,
        };
        let group = rng.sample(&dist);
        let g = group.element(&rng.sample(&Modulo(group.order())));
        let h = group.element(&rng.sample(&Modulo(group.order())));
        let p = group.modulus();

        let i = rng.sample(&Modulo(group.order()));
        let x = fpowm::pow_mod(&g, &i, p).unwrap();
        let y = fpowm::pow_mod(&h, &i, p).unwrap();
        let mut proof = prove(&group, &x, &y, &g, &h, &i);

        let ok = verify(&group, &x, &y, &g, &h, &proof);
        assert!(
            ok,
            "proof isn't valid\n\tx = {}\n\ty = {}\n\tg = {}\n\th = {}\n\tproof = {:?}",
            x, y, g, h, proof
        );

        // break the proof
        proof.c += 1;
        let ok = verify(&group, &x, &y, &g, &h, &proof);
        assert!(
            !ok,
            "invalid proof was accepted\n\tx = {}\n\ty = {}\n\tproof = {:?}",
            x, y, proof
        );
    }

    #[test]
    fn proofs_do_not_transfer_to_other_statements() {
        let mut rng = thread_rng();
        let dist = Groups {
            field_bits: 1024,
            group_bits: 160,
        };
        let group = rng.sample(&dist);
        let g = group.element(&rng.sample(&Modulo(group.order())));
        let h = group.element(&rng.sample(&Modulo(group.order())));
        let p = group.modulus();

        let i = rng.sample(&Modulo(group.order()));
        let x = fpowm::pow_mod(&g, &i, p).unwrap();
        let y = fpowm::pow_mod(&h, &i, p).unwrap();
        let proof = prove(&group, &x, &y, &g, &h, &i);

        let x2 = Integer::from(&x * &x) % p;
        assert!(!verify(&group, &x2, &y, &g, &h, &proof));
    }
}
