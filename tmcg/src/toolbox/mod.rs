//! The toolbox facade
//!
//! One [Toolbox] instance fixes the table: the soundness level of every
//! interactive proof, the number of players, and the width of the card
//! type space. All card and stack operations of both encodings hang off
//! it; the interactive proofs exchange line-oriented transcripts over a
//! caller-supplied pair of byte streams.

use crate::{
    card::{Card, CardSecret},
    constants::{MAX_CARDS, MAX_PLAYERS, MAX_TYPEBITS},
    keys::{PublicKeyRing, SecretKey},
    vtmf::{Reveal, SecretShare, SecretShareProof, Vtmf, VtmfCard, VtmfCardSecret},
    Result,
};
use rug::Integer;
use std::io::{BufRead, Write};

mod proofs;
mod shuffle;

/// The toolbox for one table of players
#[derive(Clone, Copy, Debug)]
pub struct Toolbox {
    security: u32,
    players: usize,
    type_bits: usize,
    max_card_type: usize,
}

impl Toolbox {
    /// Creates a toolbox for `players` seats, card types of `type_bits`
    /// bits, and proofs of `security` parallel rounds.
    pub fn new(security: u32, players: usize, type_bits: usize) -> Toolbox {
        assert!(security > 0);
        assert!(players > 0 && players <= MAX_PLAYERS);
        assert!(type_bits > 0 && type_bits <= MAX_TYPEBITS);
        let max_card_type = 1 << type_bits;
        assert!(max_card_type <= MAX_CARDS);
        Toolbox {
            security,
            players,
            type_bits,
            max_card_type,
        }
    }

    /// Gets the number of parallel proof rounds.
    pub fn security(&self) -> u32 {
        self.security
    }

    /// Gets the number of players.
    pub fn players(&self) -> usize {
        self.players
    }

    /// Gets the number of card type bits.
    pub fn type_bits(&self) -> usize {
        self.type_bits
    }

    /// Gets the number of distinct card types.
    pub fn max_card_type(&self) -> usize {
        self.max_card_type
    }

    fn check_ring(&self, ring: &PublicKeyRing) {
        assert_eq!(ring.len(), self.players);
    }
}

/// Operations on cards under the quadratic-residue encoding
impl Toolbox {
    /// Creates an open card of the given type.
    ///
    /// The first row carries the type; every other row holds one.
    pub fn create_open_card(&self, ring: &PublicKeyRing, card_type: usize) -> Card {
        self.check_ring(ring);
        assert!(card_type < self.max_card_type);

        let mut c = Card::new(self.players, self.type_bits);
        for j in 0..self.type_bits {
            if card_type & (1 << j) != 0 {
                c.z[0][j] = ring.keys[0].witness().clone();
            }
        }
        c
    }

    /// Creates a private card of the given type for the owner's seat.
    ///
    /// The owner's row encodes the type bits behind fresh masks; every
    /// other row holds one, which the owner proves with
    /// [prove_private_card](Toolbox::prove_private_card).
    pub fn create_private_card(
        &self,
        ring: &PublicKeyRing,
        owner: usize,
        card_type: usize,
    ) -> (Card, CardSecret) {
        use rand::Rng;
        use tmcg_num::rand::{strong_rng, Coprimes};

        self.check_ring(ring);
        assert!(owner < self.players);
        assert!(card_type < self.max_card_type);

        let mut rng = strong_rng();
        let key = &ring.keys[owner];
        let mut c = Card::new(self.players, self.type_bits);
        let mut cs = CardSecret::new(self.players, self.type_bits);
        for i in 0..self.players {
            for j in 0..self.type_bits {
                cs.r[i][j] = Integer::from(1);
            }
        }
        for j in 0..self.type_bits {
            let r = rng.sample(&Coprimes(key.modulus()));
            let b = card_type & (1 << j) != 0;
            c.z[owner][j] = key.mask(&Integer::from(1), &r, b);
            cs.r[owner][j] = r;
            cs.b[owner][j] = Integer::from(b as u32);
        }
        (c, cs)
    }

    /// Draws a fresh type-preserving card secret for masking.
    pub fn create_card_secret(&self, ring: &PublicKeyRing) -> CardSecret {
        use crate::encoding::{Encoding, ResidueEncoding};

        self.check_ring(ring);
        ResidueEncoding::new(ring, self.type_bits).random_secret()
    }

    /// Applies the masking operation to a card.
    pub fn mask_card(&self, ring: &PublicKeyRing, c: &Card, cs: &CardSecret) -> Card {
        use crate::encoding::{Encoding, ResidueEncoding};

        self.check_ring(ring);
        ResidueEncoding::new(ring, self.type_bits).mask(c, cs)
    }

    /// Derives the own row of a card secret from the own prime factors.
    pub fn self_card_secret(&self, c: &Card, key: &SecretKey, owner: usize) -> CardSecret {
        assert!(owner < self.players);
        assert_eq!(c.players(), self.players);
        assert_eq!(c.bits(), self.type_bits);

        let mut cs = CardSecret::new(self.players, self.type_bits);
        for i in 0..self.players {
            for j in 0..self.type_bits {
                cs.r[i][j] = Integer::from(1);
            }
        }
        for j in 0..self.type_bits {
            let nqr = !key.is_qr(c.value(owner, j));
            cs.b[owner][j] = Integer::from(nqr as u32);
        }
        cs
    }

    /// Recovers the type of a fully revealed card.
    pub fn type_of_card(&self, cs: &CardSecret) -> usize {
        cs.card_type()
    }
}

/// Operations on cards under the discrete-logarithm encoding
impl Toolbox {
    /// Creates an open card of the given type.
    pub fn create_open_card_vtmf(&self, vtmf: &Vtmf, card_type: usize) -> VtmfCard {
        assert!(card_type < self.max_card_type);
        vtmf.mask_open(&vtmf.element_of_type(card_type))
    }

    /// Creates a private card of the given type.
    ///
    /// Correctness of the initial mask travels with
    /// [prove_mask_card_vtmf](Toolbox::prove_mask_card_vtmf) against the
    /// open card of the same type.
    pub fn create_private_card_vtmf(
        &self,
        vtmf: &Vtmf,
        card_type: usize,
    ) -> (VtmfCard, VtmfCardSecret) {
        assert!(card_type < self.max_card_type);
        let cs = vtmf.random_secret();
        let c = vtmf.mask(&vtmf.mask_open(&vtmf.element_of_type(card_type)), &cs);
        (c, cs)
    }

    /// Draws a fresh card secret for masking.
    pub fn create_card_secret_vtmf(&self, vtmf: &Vtmf) -> VtmfCardSecret {
        vtmf.random_secret()
    }

    /// Applies the masking operation to a card.
    pub fn mask_card_vtmf(&self, vtmf: &Vtmf, c: &VtmfCard, cs: &VtmfCardSecret) -> VtmfCard {
        vtmf.mask(c, cs)
    }

    /// Proves that `cc` masks the same value as `c`.
    pub fn prove_mask_card_vtmf(
        &self,
        vtmf: &Vtmf,
        c: &VtmfCard,
        cc: &VtmfCard,
        cs: &VtmfCardSecret,
        out: &mut dyn Write,
    ) -> Result<()> {
        vtmf.prove_mask(c, cc, cs).write_to(out)
    }

    /// Verifies that `cc` masks the same value as `c`.
    pub fn verify_mask_card_vtmf(
        &self,
        vtmf: &Vtmf,
        c: &VtmfCard,
        cc: &VtmfCard,
        fin: &mut dyn BufRead,
    ) -> bool {
        use crate::constants::MAX_STACK_CHARS;
        use crate::vtmf::MaskProof;

        match MaskProof::read_from(fin, MAX_STACK_CHARS) {
            Ok(proof) => vtmf.verify_mask(c, cc, &proof),
            Err(_) => false,
        }
    }

    /// Starts the decryption protocol for a card, folding in the own
    /// share.
    pub fn self_card_secret_vtmf<'a>(
        &self,
        vtmf: &'a Vtmf,
        c: &VtmfCard,
    ) -> Result<(Reveal<'a>, SecretShare, SecretShareProof)> {
        let mut rev = vtmf.unmask(c.clone());
        let (d, proof) = rev.reveal_share()?;
        Ok((rev, d, proof))
    }

    /// Publishes the own decryption share of a card.
    pub fn prove_card_secret_vtmf(
        &self,
        vtmf: &Vtmf,
        c: &VtmfCard,
        out: &mut dyn Write,
    ) -> Result<()> {
        let mut rev = vtmf.unmask(c.clone());
        let (d, proof) = rev.reveal_share()?;
        crate::parse::send_integer(out, &d)?;
        proof.write_to(out)
    }

    /// Reads and verifies another party's decryption share.
    ///
    /// `share` is the sending party's key share.
    pub fn verify_card_secret_vtmf(
        &self,
        share: &Integer,
        rev: &mut Reveal,
        fin: &mut dyn BufRead,
    ) -> bool {
        use crate::constants::MAX_STACK_CHARS;

        let read = crate::parse::recv_integer(fin, MAX_STACK_CHARS).and_then(|d| {
            let proof = SecretShareProof::read_from(fin, MAX_STACK_CHARS)?;
            Ok((d, proof))
        });
        match read {
            Ok((d, proof)) => rev.add_share(share, &d, &proof).is_ok(),
            Err(_) => false,
        }
    }

    /// Opens a fully revealed card to its type.
    pub fn type_of_card_vtmf(&self, vtmf: &Vtmf, rev: Reveal) -> Option<usize> {
        let value = rev.decrypt().ok()?;
        vtmf.decode_type(&value).filter(|&t| t < self.max_card_type)
    }
}

#[cfg(test)]
pub(crate) mod pipe {
    //! In-memory duplex byte streams for exercising the interactive
    //! proofs in two threads

    use std::{
        cmp,
        io::{self, BufReader, Read, Write},
        sync::mpsc::{channel, Receiver, Sender},
    };

    pub struct PipeReader {
        rx: Receiver<Vec<u8>>,
        buf: Vec<u8>,
        pos: usize,
    }

    pub struct PipeWriter {
        tx: Sender<Vec<u8>>,
    }

    /// Creates both ends of a duplex connection.
    pub fn duplex() -> (
        (BufReader<PipeReader>, PipeWriter),
        (BufReader<PipeReader>, PipeWriter),
    ) {
        let (tx_a, rx_b) = channel();
        let (tx_b, rx_a) = channel();
        let a = (
            BufReader::new(PipeReader {
                rx: rx_a,
                buf: Vec::new(),
                pos: 0,
            }),
            PipeWriter { tx: tx_a },
        );
        let b = (
            BufReader::new(PipeReader {
                rx: rx_b,
                buf: Vec::new(),
                pos: 0,
            }),
            PipeWriter { tx: tx_b },
        );
        (a, b)
    }

    impl Read for PipeReader {
        fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
            while self.pos >= self.buf.len() {
                match self.rx.recv() {
                    Ok(b) => {
                        self.buf = b;
                        self.pos = 0;
                    }
                    Err(_) => return Ok(0),
                }
            }
            let n = cmp::min(out.len(), self.buf.len() - self.pos);
            out[..n].copy_from_slice(&self.buf[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }
    }

    impl Write for PipeWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.tx
                .send(buf.to_vec())
                .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "peer closed"))?;
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }
}

#[cfg(test)]
mod test {
    use super::Toolbox;
    use crate::keys::{test::ALICE, PublicKeyRing};

    #[test]
    fn open_cards_encode_the_type_in_the_first_row() {
        let tmcg = Toolbox::new(16, 2, 6);
        let ring = PublicKeyRing::new(vec![ALICE.public(), ALICE.public()]);
        let c = tmcg.create_open_card(&ring, 0b101);

        assert_eq!(c.players(), 2);
        assert_eq!(c.bits(), 6);
        assert_eq!(*c.value(0, 0), *ALICE.public().witness());
        assert_eq!(*c.value(0, 1), 1);
        assert_eq!(*c.value(0, 2), *ALICE.public().witness());
        for j in 0..6 {
            assert_eq!(*c.value(1, j), 1);
        }
    }

    #[test]
    fn self_card_secret_recovers_open_card_types() {
        let tmcg = Toolbox::new(16, 1, 6);
        let ring = PublicKeyRing::new(vec![ALICE.public()]);
        for t in &[0usize, 1, 7, 42, 63] {
            let c = tmcg.create_open_card(&ring, *t);
            let cs = tmcg.self_card_secret(&c, &ALICE, 0);
            assert_eq!(tmcg.type_of_card(&cs), *t, "type {} did not roundtrip", t);
        }
    }

    #[test]
    fn masking_preserves_recoverable_types() {
        let tmcg = Toolbox::new(16, 1, 6);
        let ring = PublicKeyRing::new(vec![ALICE.public()]);
        let c = tmcg.create_open_card(&ring, 23);
        let cs = tmcg.create_card_secret(&ring);
        let cc = tmcg.mask_card(&ring, &c, &cs);
        assert_ne!(c, cc);

        let opened = tmcg.self_card_secret(&cc, &ALICE, 0);
        assert_eq!(tmcg.type_of_card(&opened), 23);
    }

    #[test]
    fn private_cards_open_to_their_type() {
        let tmcg = Toolbox::new(16, 2, 6);
        let ring = PublicKeyRing::new(vec![ALICE.public(), ALICE.public()]);
        let (c, cs) = tmcg.create_private_card(&ring, 1, 7);
        assert_eq!(tmcg.type_of_card(&cs), 7);
        // non-owner rows hold one
        for j in 0..6 {
            assert_eq!(*c.value(0, j), 1);
        }
    }
}
