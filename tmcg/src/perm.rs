//! Permutation-related utilities

use core::ops::Deref;
use rand::{distributions::Distribution, seq::SliceRandom, Rng};

/// A permutation
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Permutation(Vec<usize>);

impl Permutation {
    /// Creates a permutation from a vector, if it is one
    pub fn from_vec(v: Vec<usize>) -> Option<Self> {
        let mut seen = vec![false; v.len()];
        for &i in &v {
            if i >= v.len() || seen[i] {
                return None;
            }
            seen[i] = true;
        }
        Some(Permutation(v))
    }

    /// Computes the inverse permutation
    pub fn invert(&self) -> Permutation {
        let mut inv = vec![0; self.0.len()];
        for (i, &p) in self.0.iter().enumerate() {
            inv[p] = i;
        }
        Permutation(inv)
    }

    /// Gets the offset of this permutation, if it is a cyclic shift
    pub fn shift_of(&self) -> Option<usize> {
        let n = self.0.len();
        if n == 0 {
            return Some(0);
        }
        let c = self.0[0];
        for (i, &p) in self.0.iter().enumerate() {
            if p != (i + c) % n {
                return None;
            }
        }
        Some(c)
    }
}

impl Deref for Permutation {
    type Target = [usize];

    fn deref(&self) -> &[usize] {
        &self.0
    }
}

/// A distribution that produces shuffle permutations of the given size
pub struct Shuffles(pub usize);

/// A distribution that produces cyclic shift permutations of the given size
pub struct Shifts(pub usize);

impl Distribution<Permutation> for Shuffles {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Permutation {
        let mut v = Vec::with_capacity(self.0);
        v.extend(0..self.0);

        v.shuffle(rng);
        Permutation(v)
    }
}

impl Distribution<Permutation> for Shifts {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Permutation {
        let c: usize = rng.gen();
        let v = (0..self.0).map(|i| (i + c % self.0) % self.0).collect();
        Permutation(v)
    }
}

#[cfg(test)]
mod test {
    use super::{Permutation, Shifts, Shuffles};
    use rand::{thread_rng, Rng};

    #[test]
    fn from_vec_accepts_permutations_only() {
        assert!(Permutation::from_vec(vec![2, 0, 1]).is_some());
        assert!(Permutation::from_vec(vec![0, 0, 1]).is_none());
        assert!(Permutation::from_vec(vec![0, 3]).is_none());
    }

    #[test]
    fn invert_undoes_the_permutation() {
        let pi = thread_rng().sample(&Shuffles(16));
        let inv = pi.invert();
        for i in 0..16 {
            assert_eq!(inv[pi[i]], i);
        }
    }

    #[test]
    fn shuffles_produce_permutations() {
        let pi = thread_rng().sample(&Shuffles(52));
        assert!(Permutation::from_vec(pi.to_vec()).is_some());
    }

    #[test]
    fn shifts_produce_cyclic_permutations() {
        let pi = thread_rng().sample(&Shifts(52));
        let c = pi.shift_of().expect("not a shift");
        for i in 0..52 {
            assert_eq!(pi[i], (i + c) % 52);
        }
    }

    #[test]
    fn general_shuffles_are_rarely_shifts() {
        let mut shifts = 0;
        for _ in 0..32 {
            if thread_rng().sample(&Shuffles(16)).shift_of().is_some() {
                shifts += 1;
            }
        }
        assert!(shifts < 32, "every shuffle came out cyclic");
    }
}
