//! Prime numbers

use crate::rand::{very_strong_rng, Bits};
use rand::Rng;
use rug::{integer::IsPrime, Assign, Integer};

/// The number of Miller-Rabin iterations used while searching for primes.
///
/// The probability of a composite surviving is less than 4^-25.
pub const SEARCH_ITERATIONS: u32 = 25;

/// Generates a random probable prime with the given number of bits that
/// passes the given test.
pub fn generate_prime_with<F>(bits: u32, iterations: u32, test: F) -> Integer
where
    F: Fn(&Integer) -> bool,
{
    let mut rng = very_strong_rng();
    let mut n = Integer::new();
    loop {
        n.assign(rng.sample(&Bits(bits)));
        n.set_bit(0, true);
        n.set_bit(bits - 1, true);
        if test(&n) && n.is_probably_prime(iterations) != IsPrime::No {
            return n;
        }
    }
}

/// Generates a random safe probable prime with the given number of bits
/// that passes the given test.
///
/// The search samples a fresh odd starting point with the top bit set and
/// then walks upwards in steps of two until both the candidate and the
/// candidate's Sophie Germain half are probable primes.
pub fn generate_safe_prime_with<F>(bits: u32, iterations: u32, test: F) -> Integer
where
    F: Fn(&Integer) -> bool,
{
    let mut rng = very_strong_rng();
    let mut p = Integer::new();
    let mut half = Integer::new();
    loop {
        loop {
            p.assign(rng.sample(&Bits(bits)));
            p.set_bit(bits - 1, true);
            if p.significant_bits() == bits {
                break;
            }
        }
        p.set_bit(0, true);

        // walk a bounded window before resampling, so one unlucky start
        // does not pin the search
        for _ in 0..4096u32 {
            half.assign(&p - 1u32);
            half >>= 1;
            if test(&p)
                && p.is_probably_prime(iterations) != IsPrime::No
                && half.is_probably_prime(iterations) != IsPrime::No
            {
                return p.clone();
            }
            p += 2;
            if p.significant_bits() != bits {
                break;
            }
        }
    }
}
