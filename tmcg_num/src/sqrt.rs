//! Modular square roots and residuosity
//!
//! Square roots modulo a prime follow Adleman, Manders and Miller, with
//! the usual shortcuts for the 3 (mod 4) and 5 (mod 8) classes. Roots
//! modulo a two-prime product are recovered by the Chinese remainder
//! theorem; [BlumCrt] carries the precomputed witnesses that make the
//! Blum-integer case a pair of fixed exponentiations.

use crate::rand::{weak_rng, Modulo};
use rand::Rng;
use rug::{Assign, Integer};

/// Tests whether a value is a quadratic residue modulo a product of the
/// two given primes.
pub fn is_qr_mod_pq(a: &Integer, p: &Integer, q: &Integer) -> bool {
    a.jacobi(p) == 1 && a.jacobi(q) == 1
}

/// Computes a square root of `a` modulo the prime `p`.
///
/// Returns zero when `a` is zero or not a residue.
pub fn sqrt_mod_prime(a: &Integer, p: &Integer) -> Integer {
    if *a == 0 || a.jacobi(p) != 1 {
        return Integer::new();
    }

    if p.is_congruent_u(3, 4) {
        let e = Integer::from(p + 1u32) >> 2;
        return Integer::from(a.pow_mod_ref(&e, p).unwrap());
    }

    // s = (p-1)/4
    let mut s = Integer::from(p - 1u32) >> 2;
    if p.is_congruent_u(5, 8) {
        let check = Integer::from(a.pow_mod_ref(&s, p).unwrap());
        let e = Integer::from(p + 3u32) >> 3;
        let mut root = Integer::from(a.pow_mod_ref(&e, p).unwrap());
        if check != 1 {
            // a^{(p-1)/4} = -1; correct with a non-residue
            let b = non_residue(p);
            let bs = b.pow_mod(&s, p).unwrap();
            root *= bs;
            root %= p;
        }
        return root;
    }

    // p = 1 (mod 8)
    let mut check = Integer::from(a.pow_mod_ref(&s, p).unwrap());
    while check == 1 {
        if s.is_odd() {
            s += 1;
            s >>= 1;
            return Integer::from(a.pow_mod_ref(&s, p).unwrap());
        }
        s >>= 1;
        check.assign(a.pow_mod_ref(&s, p).unwrap());
    }

    // a^s = -1 (mod p)
    let b = non_residue(p);
    let minus_one = Integer::from(p - 1u32);
    let half = Integer::from(&minus_one >> 1);
    let mut t = half.clone();
    let mut prod = Integer::new();
    while s.is_even() {
        s >>= 1;
        t >>= 1;
        prod.assign(a.pow_mod_ref(&s, p).unwrap());
        prod *= Integer::from(b.pow_mod_ref(&t, p).unwrap());
        prod %= p;
        if prod == minus_one {
            t += &half;
        }
    }
    s += 1;
    s >>= 1;
    t >>= 1;
    let mut root = Integer::from(a.pow_mod_ref(&s, p).unwrap());
    root *= Integer::from(b.pow_mod_ref(&t, p).unwrap());
    root %= p;
    root
}

/// Computes the four square roots of `a` modulo `n = pq`.
///
/// Returns zeros when `p` and `q` are not co-prime or `a` is not a
/// residue.
pub fn sqrt_mod_pq_all(a: &Integer, p: &Integer, q: &Integer, n: &Integer) -> [Integer; 4] {
    // u·p + v·q = 1, so u·p covers the 1 (mod q) residue class
    let up = match p.clone().invert(q) {
        Ok(u) => u * p,
        Err(_) => {
            return [Integer::new(), Integer::new(), Integer::new(), Integer::new()];
        }
    };
    let vq = Integer::from(1u32) - &up;

    let root_p = sqrt_mod_prime(a, p);
    let root_q = sqrt_mod_prime(a, q);
    crt_roots(&root_p, &root_q, &up, &vq, n)
}

/// Computes the smallest square root of `a` modulo `n = pq`.
pub fn sqrt_mod_pq(a: &Integer, p: &Integer, q: &Integer, n: &Integer) -> Integer {
    let roots = sqrt_mod_pq_all(a, p, q, n);
    smallest(roots)
}

fn crt_roots(
    root_p: &Integer,
    root_q: &Integer,
    up: &Integer,
    vq: &Integer,
    n: &Integer,
) -> [Integer; 4] {
    let mut r1 = Integer::from(root_q * up);
    r1 += Integer::from(root_p * vq);
    r1 %= n;
    if r1 < 0 {
        r1 += n;
    }
    let r2 = Integer::from(n - &r1);
    let mut r3 = Integer::from(-root_q.clone() * up);
    r3 += Integer::from(root_p * vq);
    r3 %= n;
    if r3 < 0 {
        r3 += n;
    }
    let r4 = Integer::from(n - &r3);
    [r1, r2, r3, r4]
}

fn smallest(roots: [Integer; 4]) -> Integer {
    let [r1, r2, r3, r4] = roots;
    let mut min = r1;
    for r in vec![r2, r3, r4] {
        if r < min {
            min = r;
        }
    }
    min
}

fn non_residue(p: &Integer) -> Integer {
    let mut rng = weak_rng();
    loop {
        let b = rng.sample(&Modulo(p));
        if b.jacobi(p) == -1 {
            return b;
        }
    }
}

/// Precomputed CRT witnesses for square roots modulo a Blum integer.
///
/// Holds `u·p` and `v·q` with `u·p + v·q = 1`, together with the fixed
/// exponents `(p+1)/4` and `(q+1)/4`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlumCrt {
    p: Integer,
    q: Integer,
    n: Integer,
    up: Integer,
    vq: Integer,
    p14: Integer,
    q14: Integer,
}

impl BlumCrt {
    /// Creates a context from two distinct primes, both 3 (mod 4).
    pub fn new(p: Integer, q: Integer) -> Option<Self> {
        if !p.is_congruent_u(3, 4) || !q.is_congruent_u(3, 4) {
            return None;
        }
        let up = match p.clone().invert(&q) {
            Ok(u) => u * &p,
            Err(_) => return None,
        };
        let vq = Integer::from(1u32) - &up;
        let n = Integer::from(&p * &q);
        let p14 = Integer::from(&p + 1u32) >> 2;
        let q14 = Integer::from(&q + 1u32) >> 2;
        Some(Self {
            p,
            q,
            n,
            up,
            vq,
            p14,
            q14,
        })
    }

    /// Gets the modulus `pq`.
    pub fn modulus(&self) -> &Integer {
        &self.n
    }

    /// Tests whether `a` is a quadratic residue modulo `pq`.
    pub fn is_qr(&self, a: &Integer) -> bool {
        is_qr_mod_pq(a, &self.p, &self.q)
    }

    /// Computes one square root of `a` modulo `pq`.
    pub fn sqrt(&self, a: &Integer) -> Integer {
        let root_p = Integer::from(a.pow_mod_ref(&self.p14, &self.p).unwrap());
        let root_q = Integer::from(a.pow_mod_ref(&self.q14, &self.q).unwrap());
        let mut root = root_q * &self.up;
        root += root_p * &self.vq;
        root %= &self.n;
        if root < 0 {
            root += &self.n;
        }
        root
    }

    /// Computes all four square roots of `a` modulo `pq`.
    pub fn sqrt_all(&self, a: &Integer) -> [Integer; 4] {
        let root_p = Integer::from(a.pow_mod_ref(&self.p14, &self.p).unwrap());
        let root_q = Integer::from(a.pow_mod_ref(&self.q14, &self.q).unwrap());
        crt_roots(&root_p, &root_q, &self.up, &self.vq, &self.n)
    }
}

#[cfg(test)]
mod test {
    use super::{is_qr_mod_pq, sqrt_mod_pq_all, sqrt_mod_prime, BlumCrt};
    use crate::{
        prime::{generate_prime_with, SEARCH_ITERATIONS},
        rand::{strong_rng, Modulo},
    };
    use rand::Rng;
    use rug::Integer;

    fn square_mod(x: &Integer, n: &Integer) -> Integer {
        Integer::from(x * x) % n
    }

    #[test]
    fn sqrt_mod_prime_inverts_squaring_in_all_branches() {
        for residue in &[3u32, 5, 1] {
            let p = generate_prime_with(128, SEARCH_ITERATIONS, |p| {
                if *residue == 1 {
                    p.is_congruent_u(1, 8)
                } else {
                    p.is_congruent_u(*residue, 8)
                }
            });
            for _ in 0..8 {
                let x = strong_rng().sample(&Modulo(&p));
                if x == 0 {
                    continue;
                }
                let a = square_mod(&x, &p);
                let root = sqrt_mod_prime(&a, &p);
                assert_eq!(
                    square_mod(&root, &p),
                    a,
                    "root doesn't square back\n\tp = {}\n\ta = {}\n\troot = {}",
                    p,
                    a,
                    root
                );
            }
        }
    }

    #[test]
    fn sqrt_mod_prime_rejects_non_residues() {
        let p = generate_prime_with(128, SEARCH_ITERATIONS, |p| p.is_congruent_u(3, 4));
        let mut x = Integer::from(2);
        while x.jacobi(&p) != -1 {
            x += 1;
        }
        assert_eq!(sqrt_mod_prime(&x, &p), 0);
        assert_eq!(sqrt_mod_prime(&Integer::new(), &p), 0);
    }

    #[test]
    fn sqrt_mod_pq_all_produces_four_distinct_roots() {
        let p = generate_prime_with(128, SEARCH_ITERATIONS, |p| p.is_congruent_u(3, 4));
        let q = generate_prime_with(128, SEARCH_ITERATIONS, |q| {
            q.is_congruent_u(3, 4) && *q != p
        });
        let n = Integer::from(&p * &q);
        let x = strong_rng().sample(&Modulo(&n));
        let a = square_mod(&x, &n);

        let roots = sqrt_mod_pq_all(&a, &p, &q, &n);
        for r in &roots {
            assert_eq!(
                square_mod(r, &n),
                a,
                "root doesn't square back\n\tn = {}\n\ta = {}\n\troot = {}",
                n,
                a,
                r
            );
        }
        for i in 0..4 {
            for j in 0..4 {
                if i != j {
                    assert_ne!(roots[i], roots[j], "roots {} and {} collide", i, j);
                }
            }
        }
    }

    #[test]
    fn blum_crt_agrees_with_the_generic_roots() {
        let p = generate_prime_with(128, SEARCH_ITERATIONS, |p| p.is_congruent_u(3, 4));
        let q = generate_prime_with(128, SEARCH_ITERATIONS, |q| {
            q.is_congruent_u(3, 4) && *q != p
        });
        let crt = BlumCrt::new(p.clone(), q.clone()).unwrap();
        let n = crt.modulus().clone();

        let x = strong_rng().sample(&Modulo(&n));
        let a = square_mod(&x, &n);
        assert!(crt.is_qr(&a));
        assert!(is_qr_mod_pq(&a, &p, &q));

        let root = crt.sqrt(&a);
        assert_eq!(square_mod(&root, &n), a);

        let all = crt.sqrt_all(&a);
        let generic = sqrt_mod_pq_all(&a, &p, &q, &n);
        for r in &all {
            assert!(generic.contains(r), "fast root {} not among CRT roots", r);
        }
    }

    #[test]
    fn blum_crt_rejects_bad_prime_classes() {
        let p = generate_prime_with(128, SEARCH_ITERATIONS, |p| p.is_congruent_u(1, 4));
        let q = generate_prime_with(128, SEARCH_ITERATIONS, |q| q.is_congruent_u(3, 4));
        assert!(BlumCrt::new(p, q).is_none());
    }
}
