//! Schnorr groups

use crate::{
    constants::MR_ITERATIONS,
    error::Error,
    hash::Oracle,
    parse::{radix, Scanner},
    Result,
};
use rand::{distributions::Distribution, Rng};
use rug::{integer::IsPrime, Assign, Integer};
use std::fmt::{self, Display, Formatter};
use tmcg_num::{
    fpowm,
    prime::{generate_prime_with, SEARCH_ITERATIONS},
    rand::BitsExact,
};

/// A Schnorr group.
///
/// A prime-order subgroup of `Z*_p`, with `p = kq + 1` and a generator
/// `g` of order `q`. The generator is derived from the group parameters
/// through the hash chain, so it carries no hidden structure.
#[derive(Clone, Debug)]
pub struct Group {
    p: Integer,
    q: Integer,
    k: Integer,
    g: Integer,
}

impl Group {
    unsafe fn new_unchecked(p: Integer, q: Integer, k: Integer, g: Integer) -> Self {
        fpowm::precompute(&g, q.significant_bits(), &p);
        Self { p, q, k, g }
    }

    /// Creates a new group from the given parameters
    pub fn new(p: Integer, q: Integer, k: Integer, g: Integer) -> Option<Self> {
        // SAFE: the value is checked before returning
        unsafe { Self::new_unchecked(p, q, k, g) }.validate()
    }

    /// Gets the modulus of the group (aka *p*)
    pub fn modulus(&self) -> &Integer {
        &self.p
    }

    /// Gets the order of the group (aka *q*)
    pub fn order(&self) -> &Integer {
        &self.q
    }

    /// Gets the bit size of the group order (aka *|q|*)
    pub fn bits(&self) -> u32 {
        self.q.significant_bits()
    }

    /// Gets the factor between the modulus and the order (aka *k*)
    pub fn factor(&self) -> &Integer {
        &self.k
    }

    /// Gets the generator of the group (aka *g*)
    pub fn generator(&self) -> &Integer {
        &self.g
    }

    /// Tests whether a given number is an element of the group
    pub fn has_element(&self, e: &Integer) -> bool {
        if *e <= 0 || *e >= self.p {
            return false;
        }

        let x = Integer::from(e.pow_mod_ref(&self.q, &self.p).unwrap());
        x == 1
    }

    /// Retrieves the i-th element of the group
    pub fn element(&self, i: &Integer) -> Integer {
        fpowm::pow_mod(&self.g, i, &self.p).unwrap()
    }

    fn validate(self) -> Option<Self> {
        let mut x = Integer::from(&self.q * &self.k);
        x += 1;
        if self.p != x {
            return None;
        }

        if self.p.is_probably_prime(MR_ITERATIONS) == IsPrime::No
            || self.q.is_probably_prime(MR_ITERATIONS) == IsPrime::No
        {
            return None;
        }

        x.assign(self.q.gcd_ref(&self.k));
        if x != 1 {
            return None;
        }

        x.assign(&self.p - 1);
        if self.g <= 1 || self.g == x {
            return None;
        }

        x = fpowm::pow_mod(&self.g, &self.q, &self.p).unwrap();
        if x != 1 {
            return None;
        }

        Some(self)
    }

    /// Imports a group from its textual form.
    pub fn import(s: &str) -> Result<Group> {
        let mut sc = Scanner::new(s, "grp", '|')?;
        let p = sc.integer_field()?;
        let q = sc.integer_field()?;
        let k = sc.integer_field()?;
        let g = sc.integer_field()?;
        sc.finish()?;
        Group::new(p, q, k, g).ok_or(Error::Parse("invalid group parameters"))
    }
}

impl PartialEq for Group {
    fn eq(&self, rhs: &Self) -> bool {
        self.p == rhs.p && self.q == rhs.q && self.k == rhs.k && self.g == rhs.g
    }
}

impl Eq for Group {}

impl Display for Group {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(
            f,
            "grp|{}|{}|{}|{}|",
            radix(&self.p),
            radix(&self.q),
            radix(&self.k),
            radix(&self.g)
        )
    }
}

derive_wire_conversions!(Group);

/// A distribution that produces Schnorr groups from primes *p*, *q* with
/// the given bit sizes.
#[derive(Clone, Debug)]
pub struct Groups {
    /// The number of bits in the field
    pub field_bits: u32,
    /// The number of bits in the subgroup
    pub group_bits: u32,
}

impl Default for Groups {
    fn default() -> Self {
        Groups {
            field_bits: crate::constants::DDH_BITS,
            group_bits: crate::constants::DLSE_BITS,
        }
    }
}

impl Distribution<Group> for Groups {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Group {
        let q = generate_prime_with(self.group_bits, SEARCH_ITERATIONS, |_| true);

        let mut k;
        let mut p = Integer::new();
        let mut div = Integer::new();
        loop {
            k = rng.sample(&BitsExact(self.field_bits - self.group_bits));
            if k.is_odd() {
                k += 1;
            }

            p.assign(&q * &k);
            p += 1;

            div.assign(k.gcd_ref(&q));
            if div == 1
                && p.significant_bits() == self.field_bits
                && p.is_probably_prime(SEARCH_ITERATIONS) != IsPrime::No
            {
                break;
            }
        }

        // the generator comes off the hash chain over (p, q), so anyone
        // can re-derive it from the published parameters
        let mut oracle = Oracle::new(&[&p, &q]);
        let g = oracle.next_in_subgroup(&p, &k);

        // SAFE: we just generated these values properly
        unsafe { Group::new_unchecked(p, q, k, g) }
    }
}
