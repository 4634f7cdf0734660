//! Schnorr's zero-knowledge proof of knowledge of a discrete logarithm

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

/// Generates a non-interactive zero-knowledge proof of knowledge of
/// x = log_g(h)
pub fn prove(group: &Group, h: &Integer, x: &Integer) -> Proof {
    let p = group.modulus();
    let q = group.order();
    let g = group.generator();

    let omega = thread_rng().sample(&Modulo(q));
    let t = fpowm::pow_mod(g, &omega, p).unwrap();

    let c = challenge(&t, h, g);
    let r = (&omega - Integer::from(&c * x)) % q;
    Proof { c, r }
}

/// Verifies a non-interactive zero-knowledge proof of knowledge of
/// x = log_g(h)
pub fn verify(group: &Group, h: &Integer, proof: &Proof) -> bool {
    let p = group.modulus();
    let q = group.order();
    let g = group.generator();

    if proof.r.cmp_abs(q) != Ordering::Less {
        return false;
    }

    let hc = Integer::from(h.pow_mod_ref(&proof.c, p).unwrap());
    let gr = match fpowm::pow_mod(g, &proof.r, p) {
        Some(x) => x,
        None => return false,
    };
    let t = gr * hc % p;

    proof.c == challenge(&t, h, g)
}

fn challenge(t: &Integer, h: &Integer, g: &Integer) -> Integer {
    Integer::from_digits(
        &Hash::new()
            .chain(&t.to_digits(Order::MsfBe))
            .chain(&h.to_digits(Order::MsfBe))
            .chain(&g.to_digits(Order::MsfBe))
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
    use super::{prove, verify, Proof};
    use crate::schnorr::Groups;
    use rand::{thread_rng, Rng};
    use std::io::BufReader;
    use tmcg_num::rand::Modulo;

    #[test]
    fn prove_and_verify_agree() {
        let mut rng = thread_rng();
        let dist = Groups {
            field_bits: 1024,
            group_bits: 160,
        };
        let group = rng.sample(&dist);

        let x = rng.sample(&Modulo(group.order()));
        let h = group.element(&x);
        let mut proof = prove(&group, &h, &x);

        let ok = verify(&group, &h, &proof);
        assert!(ok, "proof isn't valid\n\th = {}\n\tproof = {:?}", h, proof);

        // break the proof
        proof.c += 1;
        let ok = verify(&group, &h, &proof);
        assert!(!ok, "invalid proof was accepted\n\tproof = {:?}", proof);
    }

    #[test]
    fn proof_roundtrips_via_lines() {
        let mut rng = thread_rng();
        let dist = Groups {
            field_bits: 1024,
            group_bits: 160,
        };
        let group = rng.sample(&dist);
        let x = rng.sample(&Modulo(group.order()));
        let h = group.element(&x);
        let proof = prove(&group, &h, &x);

        let mut buf = Vec::new();
        proof.write_to(&mut buf).unwrap();
        let mut r = BufReader::new(&buf[..]);
        let recovered = Proof::read_from(&mut r, 4096).unwrap();
        assert_eq!(proof, recovered);
        assert!(verify(&group, &h, &recovered));
    }
}
