//! Fast exponentiation tables

use rug::Integer;
use std::{collections::HashMap, sync::Mutex};

lazy_static! {
    static ref FPOWM_TABLES: Mutex<HashMap<(Integer, Integer), FastPowModTable>> =
        Mutex::new(HashMap::new());
}

/// Precomputes a fast modular exponentiation table
pub fn precompute(base: &Integer, bits: u32, modulus: &Integer) -> bool {
    let key = (base.clone(), modulus.clone());
    match FPOWM_TABLES.lock() {
        Ok(mut cache) => {
            cache
                .entry(key)
                .or_insert_with(|| FastPowModTable::new(base, bits, modulus));
            true
        }
        _ => false,
    }
}

/// Computes a modular exponentiation using precomputed tables if possible
pub fn pow_mod(b: &Integer, e: &Integer, m: &Integer) -> Option<Integer> {
    match FPOWM_TABLES.lock() {
        Ok(cache) => {
            let key = (b.clone(), m.clone());
            match cache.get(&key) {
                Some(fpowm) => fpowm.pow_mod(e),
                None => key.0.pow_mod(e, m).ok(),
            }
        }
        _ => None,
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct FastPowModTable {
    table: Vec<Integer>,
    modulus: Integer,
}

impl FastPowModTable {
    fn new(base: &Integer, bits: u32, modulus: &Integer) -> FastPowModTable {
        let mut table = Vec::new();
        table.reserve_exact(bits as usize + 1);

        let mut g = base.clone();
        table.push(g.clone());
        for _ in 0..bits {
            g.square_mut();
            g %= modulus;
            table.push(g.clone());
        }
        FastPowModTable {
            table,
            modulus: modulus.clone(),
        }
    }

    fn pow_mod(&self, exponent: &Integer) -> Option<Integer> {
        let exp_abs = exponent.clone().abs();
        let bits = exp_abs.significant_bits() as usize;

        if bits <= self.table.len() {
            let mut r = Integer::from(1);
            for i in 0..bits {
                if exp_abs.get_bit(i as u32) {
                    r *= &self.table[i];
                    r %= &self.modulus;
                }
            }
            if *exponent < 0 {
                r.invert_mut(&self.modulus).ok()?
            }
            Some(r)
        } else {
            self.table[0]
                .pow_mod_ref(exponent, &self.modulus)
                .map(Integer::from)
        }
    }
}

#[cfg(test)]
mod test {
    use super::{pow_mod, precompute};
    use crate::rand::{strong_rng, Bits, Modulo};
    use rand::Rng;
    use rug::Integer;

    #[test]
    fn pow_mod_agrees_with_plain_exponentiation() {
        let mut rng = strong_rng();
        let m = {
            let mut m: Integer = rng.sample(&Bits(256));
            m.set_bit(0, true);
            m
        };
        let g = rng.sample(&Modulo(&m));
        assert!(precompute(&g, 256, &m));

        for _ in 0..16 {
            let e = rng.sample(&Bits(200));
            let plain = Integer::from(g.pow_mod_ref(&e, &m).unwrap());
            let fast = pow_mod(&g, &e, &m).unwrap();
            assert_eq!(
                plain, fast,
                "table disagrees\n\tg = {}\n\te = {}\n\tm = {}",
                g, e, m
            );
        }
    }

    #[test]
    fn pow_mod_works_without_precomputation() {
        let mut rng = strong_rng();
        let m = Integer::from(1_000_003);
        let b = rng.sample(&Modulo(&m));
        let e = Integer::from(65_537);
        let plain = Integer::from(b.pow_mod_ref(&e, &m).unwrap());
        assert_eq!(pow_mod(&b, &e, &m), Some(plain));
    }
}
