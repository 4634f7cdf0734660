//! The shuffle core
//!
//! A shuffle is a stack secret: a permutation plus one fresh masking
//! secret per position. Mixing applies it, gluing composes two of them,
//! and the cut-and-choose argument convinces everyone that a mixed
//! stack really is a permutation of the original, without showing
//! which.

use super::Toolbox;
use crate::{
    constants::MAX_STACK_CHARS,
    encoding::Encoding,
    parse::{recv, recv_bit, send, send_bit},
    perm::{Shifts, Shuffles},
    stack::{OpenStack, Stack, StackSecret},
    Result,
};
use rand::Rng;
use std::io::{BufRead, Write};
use tmcg_num::rand::strong_rng;

impl Toolbox {
    /// Creates a fresh stack secret of the given size.
    ///
    /// When `cyclic` is set the permutation is a random cyclic shift
    /// instead of a full Fisher-Yates shuffle.
    pub fn create_stack_secret<E: Encoding>(
        &self,
        enc: &E,
        cyclic: bool,
        size: usize,
    ) -> StackSecret<E::Secret> {
        let mut rng = strong_rng();
        let pi = if cyclic {
            rng.sample(&Shifts(size))
        } else {
            rng.sample(&Shuffles(size))
        };

        let mut ss = StackSecret::new();
        for i in 0..size {
            ss.push(pi[i], enc.random_secret());
        }
        ss
    }

    /// Applies a stack secret: position `i` of the result is the masked
    /// card drawn from the secret's source position.
    pub fn mix_stack<E: Encoding>(
        &self,
        enc: &E,
        s: &Stack<E::Card>,
        ss: &StackSecret<E::Secret>,
    ) -> Stack<E::Card> {
        assert!(!s.is_empty());
        assert_eq!(s.len(), ss.len());

        let mut out = Stack::new();
        for (from, secret) in ss.iter() {
            out.push(enc.mask(&s[*from], secret));
        }
        out
    }

    /// Applies a stack secret to an open stack, the types travelling
    /// with their cards.
    pub fn mix_open_stack<E: Encoding>(
        &self,
        enc: &E,
        os: &OpenStack<E::Card>,
        ss: &StackSecret<E::Secret>,
    ) -> OpenStack<E::Card> {
        assert!(!os.is_empty());
        assert_eq!(os.len(), ss.len());

        let mut out = OpenStack::new();
        for (from, secret) in ss.iter() {
            let (card_type, card) = &os[*from];
            out.push(*card_type, enc.mask(card, secret));
        }
        out
    }

    /// Composes two stack secrets applied in sequence into one.
    pub fn glue_stack_secret<E: Encoding>(
        &self,
        enc: &E,
        sigma: &StackSecret<E::Secret>,
        pi: &StackSecret<E::Secret>,
    ) -> StackSecret<E::Secret> {
        assert_eq!(sigma.len(), pi.len());

        let mut out = StackSecret::new();
        for (from, secret) in pi.iter() {
            let (source, inner) = &sigma[*from];
            out.push(*source, enc.compose(inner, secret));
        }
        out
    }

    /// Proves that `s2` is a mask-shuffle of `s` with the secret `ss`.
    pub fn prove_stack_equality<E: Encoding>(
        &self,
        enc: &E,
        s: &Stack<E::Card>,
        s2: &Stack<E::Card>,
        ss: &StackSecret<E::Secret>,
        cyclic: bool,
        fin: &mut dyn BufRead,
        out: &mut dyn Write,
    ) -> Result<()> {
        assert_eq!(s.len(), s2.len());
        assert_eq!(s.len(), ss.len());

        for _ in 0..self.security {
            let rho = self.create_stack_secret(enc, cyclic, s.len());
            let s3 = self.mix_stack(enc, s2, &rho);
            send(out, &s3)?;

            if !recv_bit(fin)? {
                send(out, &rho)?;
            } else {
                send(out, &self.glue_stack_secret(enc, ss, &rho))?;
            }
        }
        Ok(())
    }

    /// Verifies that `s2` is a mask-shuffle of `s`.
    ///
    /// With `cyclic` set, every opened permutation must additionally be
    /// a cyclic shift.
    pub fn verify_stack_equality<E: Encoding>(
        &self,
        enc: &E,
        s: &Stack<E::Card>,
        s2: &Stack<E::Card>,
        cyclic: bool,
        fin: &mut dyn BufRead,
        out: &mut dyn Write,
    ) -> bool {
        if s.is_empty() || s.len() != s2.len() {
            return false;
        }
        if !s.iter().chain(s2.iter()).all(|c| enc.valid_card(c)) {
            return false;
        }
        let mut rng = strong_rng();

        let mut run = || -> Result<bool> {
            for _ in 0..self.security {
                let s3: Stack<E::Card> = recv(fin, MAX_STACK_CHARS)?;
                if s3.len() != s.len() || !s3.iter().all(|c| enc.valid_card(c)) {
                    return Ok(false);
                }

                let bit: bool = rng.gen();
                send_bit(out, bit)?;

                let opened: StackSecret<E::Secret> = recv(fin, MAX_STACK_CHARS)?;
                if opened.len() != s.len() {
                    return Ok(false);
                }
                if !opened.iter().all(|(_, cs)| enc.preserves_types(cs)) {
                    return Ok(false);
                }
                if cyclic {
                    let pi = match opened.permutation() {
                        Some(pi) => pi,
                        None => return Ok(false),
                    };
                    if pi.shift_of().is_none() {
                        return Ok(false);
                    }
                }

                let base = if bit { s } else { s2 };
                if self.mix_stack(enc, base, &opened) != s3 {
                    return Ok(false);
                }
            }
            Ok(true)
        };
        run().unwrap_or(false)
    }
}

#[cfg(test)]
mod test {
    use super::super::{pipe::duplex, Toolbox};
    use crate::{
        encoding::{DlogEncoding, ResidueEncoding},
        keys::{
            test::{ALICE, BOB},
            PublicKeyRing,
        },
        stack::Stack,
        vtmf::test::pair,
    };
    use std::thread;

    fn deck(tmcg: &Toolbox, ring: &PublicKeyRing, n: usize) -> Stack<crate::card::Card> {
        let mut s = Stack::new();
        for t in 0..n {
            s.push(tmcg.create_open_card(ring, t));
        }
        s
    }

    #[test]
    fn mixing_composes_with_gluing() {
        let tmcg = Toolbox::new(16, 2, 4);
        let ring = PublicKeyRing::new(vec![ALICE.public(), BOB.public()]);
        let enc = ResidueEncoding::new(&ring, 4);
        let s = deck(&tmcg, &ring, 6);

        let sigma = tmcg.create_stack_secret(&enc, false, 6);
        let pi = tmcg.create_stack_secret(&enc, false, 6);

        let stepwise = tmcg.mix_stack(&enc, &tmcg.mix_stack(&enc, &s, &sigma), &pi);
        let glued = tmcg.mix_stack(&enc, &s, &tmcg.glue_stack_secret(&enc, &sigma, &pi));
        assert_eq!(stepwise, glued);
    }

    #[test]
    fn open_stacks_mix_with_their_types() {
        let tmcg = Toolbox::new(16, 1, 4);
        let ring = PublicKeyRing::new(vec![ALICE.public()]);
        let enc = ResidueEncoding::new(&ring, 4);

        let mut os = crate::stack::OpenStack::new();
        for t in 0..5 {
            os.push(t, tmcg.create_open_card(&ring, t));
        }
        let ss = tmcg.create_stack_secret(&enc, false, 5);
        let mixed = tmcg.mix_open_stack(&enc, &os, &ss);

        for (card_type, card) in mixed.iter() {
            let cs = tmcg.self_card_secret(card, &ALICE, 0);
            assert_eq!(tmcg.type_of_card(&cs), *card_type);
        }
    }

    #[test]
    fn mixed_stacks_keep_the_multiset_of_types() {
        let tmcg = Toolbox::new(16, 1, 4);
        let ring = PublicKeyRing::new(vec![ALICE.public()]);
        let enc = ResidueEncoding::new(&ring, 4);
        let s = deck(&tmcg, &ring, 8);

        let ss = tmcg.create_stack_secret(&enc, false, 8);
        let s2 = tmcg.mix_stack(&enc, &s, &ss);

        let mut types: Vec<usize> = s2
            .iter()
            .map(|c| {
                let cs = tmcg.self_card_secret(c, &ALICE, 0);
                tmcg.type_of_card(&cs)
            })
            .collect();
        types.sort();
        assert_eq!(types, (0..8).collect::<Vec<_>>());
    }

    #[test]
    fn stack_equality_proof_convinces_the_verifier() {
        let tmcg = Toolbox::new(16, 2, 4);
        let ring = PublicKeyRing::new(vec![ALICE.public(), BOB.public()]);
        let enc = ResidueEncoding::new(&ring, 4);
        let s = deck(&tmcg, &ring, 5);
        let ss = tmcg.create_stack_secret(&enc, false, 5);
        let s2 = tmcg.mix_stack(&enc, &s, &ss);

        let ((mut pin, mut pout), (mut vin, mut vout)) = duplex();
        let (sc, s2c, ssc) = (s.clone(), s2.clone(), ss.clone());
        let prover = thread::spawn(move || {
            let ring = PublicKeyRing::new(vec![ALICE.public(), BOB.public()]);
            let enc = ResidueEncoding::new(&ring, 4);
            tmcg.prove_stack_equality(&enc, &sc, &s2c, &ssc, false, &mut pin, &mut pout)
        });
        let ok = tmcg.verify_stack_equality(&enc, &s, &s2, false, &mut vin, &mut vout);
        prover.join().unwrap().unwrap();
        assert!(ok);
    }

    #[test]
    fn stack_equality_rejects_an_unrelated_stack() {
        let tmcg = Toolbox::new(16, 1, 4);
        let ring = PublicKeyRing::new(vec![ALICE.public()]);
        let enc = ResidueEncoding::new(&ring, 4);
        let s = deck(&tmcg, &ring, 5);
        let ss = tmcg.create_stack_secret(&enc, false, 5);
        // the claimed shuffle is a shuffle of a different deck
        let mut other = deck(&tmcg, &ring, 5);
        other.pop();
        other.push(tmcg.create_open_card(&ring, 9));
        let s2 = tmcg.mix_stack(&enc, &other, &ss);

        let ((mut pin, mut pout), (mut vin, mut vout)) = duplex();
        let (sc, s2c, ssc) = (s.clone(), s2.clone(), ss.clone());
        let prover = thread::spawn(move || {
            let ring = PublicKeyRing::new(vec![ALICE.public()]);
            let enc = ResidueEncoding::new(&ring, 4);
            let _ = tmcg.prove_stack_equality(&enc, &sc, &s2c, &ssc, false, &mut pin, &mut pout);
        });
        let ok = tmcg.verify_stack_equality(&enc, &s, &s2, false, &mut vin, &mut vout);
        let _ = prover.join();
        assert!(!ok, "shuffle of a different deck was accepted");
    }

    #[test]
    fn cyclic_proofs_reject_general_permutations() {
        let tmcg = Toolbox::new(16, 1, 4);
        let ring = PublicKeyRing::new(vec![ALICE.public()]);
        let enc = ResidueEncoding::new(&ring, 4);
        let s = deck(&tmcg, &ring, 6);

        // a cheating prover shuffles fully while claiming a cyclic shift
        let ss = loop {
            let ss = tmcg.create_stack_secret(&enc, false, 6);
            let pi = ss.permutation().unwrap();
            if pi.shift_of().is_none() {
                break ss;
            }
        };
        let s2 = tmcg.mix_stack(&enc, &s, &ss);

        let ((mut pin, mut pout), (mut vin, mut vout)) = duplex();
        let (sc, s2c, ssc) = (s.clone(), s2.clone(), ss.clone());
        let prover = thread::spawn(move || {
            let ring = PublicKeyRing::new(vec![ALICE.public()]);
            let enc = ResidueEncoding::new(&ring, 4);
            let _ = tmcg.prove_stack_equality(&enc, &sc, &s2c, &ssc, true, &mut pin, &mut pout);
        });
        let ok = tmcg.verify_stack_equality(&enc, &s, &s2, true, &mut vin, &mut vout);
        let _ = prover.join();
        assert!(!ok, "non-cyclic permutation passed the cyclic check");
    }

    #[test]
    fn vtmf_shuffle_roundtrips_with_joint_reveal() {
        let tmcg = Toolbox::new(16, 2, 4);
        let (vtmf0, vtmf1) = pair();

        let mut s = Stack::new();
        for t in 0..8 {
            s.push(tmcg.create_open_card_vtmf(&vtmf0, t));
        }
        let enc0 = DlogEncoding(&vtmf0);
        let ss = tmcg.create_stack_secret(&enc0, false, 8);
        let s2 = tmcg.mix_stack(&enc0, &s, &ss);

        // the other player checks the shuffle
        let ((mut pin, mut pout), (mut vin, mut vout)) = duplex();
        let (sc, s2c, ssc) = (s.clone(), s2.clone(), ss.clone());
        let vtmf0c = vtmf0.clone();
        let prover = thread::spawn(move || {
            let enc = DlogEncoding(&vtmf0c);
            tmcg.prove_stack_equality(&enc, &sc, &s2c, &ssc, false, &mut pin, &mut pout)
        });
        let enc1 = DlogEncoding(&vtmf1);
        let ok = tmcg.verify_stack_equality(&enc1, &s, &s2, false, &mut vin, &mut vout);
        prover.join().unwrap().unwrap();
        assert!(ok);

        // joint reveal of every card recovers the full multiset
        let mut types = Vec::new();
        for card in s2.iter() {
            let ((pin, mut pout), (mut vin, _vout)) = duplex();
            let cardc = card.clone();
            let vtmf0c = vtmf0.clone();
            let prover = thread::spawn(move || {
                let _hold = pin;
                tmcg.prove_card_secret_vtmf(&vtmf0c, &cardc, &mut pout)
            });
            let (mut rev, _, _) = tmcg.self_card_secret_vtmf(&vtmf1, card).unwrap();
            assert!(tmcg.verify_card_secret_vtmf(&vtmf0.own_share(), &mut rev, &mut vin));
            prover.join().unwrap().unwrap();
            types.push(tmcg.type_of_card_vtmf(&vtmf1, rev).unwrap());
        }
        types.sort();
        assert_eq!(types, (0..8).collect::<Vec<_>>());
    }
}
