//! Cards encoded as matrices of residues
//!
//! A card is a `k × w` matrix: one row per player, one column per type
//! bit. Column `j` encodes bit `j` through the quadratic character of
//! the column's entries against each player's modulus; masking
//! re-randomizes every entry without interaction.

use crate::{
    constants::{MAX_PLAYERS, MAX_TYPEBITS},
    error::Error,
    parse::{radix, Scanner},
    Result,
};
use rug::Integer;
use std::fmt::{self, Display, Formatter};

/// A card
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Card {
    pub(crate) z: Vec<Vec<Integer>>,
}

/// The secrets of one masking operation on a card
///
/// `r` holds the multiplicative blinds, `b` the witness toggles; both
/// matrices match the card's shape.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CardSecret {
    pub(crate) r: Vec<Vec<Integer>>,
    pub(crate) b: Vec<Vec<Integer>>,
}

impl Card {
    /// Creates a card of the given shape with all entries one.
    pub fn new(players: usize, bits: usize) -> Card {
        assert!(players > 0 && bits > 0);
        Card {
            z: vec![vec![Integer::from(1); bits]; players],
        }
    }

    /// Gets the number of player rows.
    pub fn players(&self) -> usize {
        self.z.len()
    }

    /// Gets the number of type bit columns.
    pub fn bits(&self) -> usize {
        self.z[0].len()
    }

    /// Gets one matrix entry.
    pub fn value(&self, row: usize, col: usize) -> &Integer {
        &self.z[row][col]
    }

    /// Imports a card from its textual form.
    pub fn import(s: &str) -> Result<Card> {
        let mut sc = Scanner::new(s, "crd", '|')?;
        let players = sc.size_field()?;
        if players < 1 || players > MAX_PLAYERS {
            return Err(Error::Parse("bad player count"));
        }
        let bits = sc.size_field()?;
        if bits < 1 || bits > MAX_TYPEBITS {
            return Err(Error::Parse("bad type bit count"));
        }
        let mut z = Vec::with_capacity(players);
        for _ in 0..players {
            let mut row = Vec::with_capacity(bits);
            for _ in 0..bits {
                row.push(sc.integer_field()?);
            }
            z.push(row);
        }
        sc.finish()?;
        Ok(Card { z })
    }
}

impl CardSecret {
    /// Creates a secret of the given shape with all entries zero.
    pub fn new(players: usize, bits: usize) -> CardSecret {
        assert!(players > 0 && bits > 0);
        CardSecret {
            r: vec![vec![Integer::new(); bits]; players],
            b: vec![vec![Integer::new(); bits]; players],
        }
    }

    /// Gets the number of player rows.
    pub fn players(&self) -> usize {
        self.r.len()
    }

    /// Gets the number of type bit columns.
    pub fn bits(&self) -> usize {
        self.r[0].len()
    }

    /// Gets one multiplicative blind.
    pub fn blind(&self, row: usize, col: usize) -> &Integer {
        &self.r[row][col]
    }

    /// Gets one witness toggle.
    pub fn toggle(&self, row: usize, col: usize) -> &Integer {
        &self.b[row][col]
    }

    /// Recovers the encoded type: bit `j` is the parity of column `j`'s
    /// toggles across all rows.
    pub fn card_type(&self) -> usize {
        let mut t = 0;
        for j in 0..self.bits() {
            let mut bit = false;
            for i in 0..self.players() {
                bit ^= self.b[i][j].is_odd();
            }
            if bit {
                t |= 1 << j;
            }
        }
        t
    }

    /// Imports a card secret from its textual form.
    pub fn import(s: &str) -> Result<CardSecret> {
        let mut sc = Scanner::new(s, "crs", '|')?;
        let players = sc.size_field()?;
        if players < 1 || players > MAX_PLAYERS {
            return Err(Error::Parse("bad player count"));
        }
        let bits = sc.size_field()?;
        if bits < 1 || bits > MAX_TYPEBITS {
            return Err(Error::Parse("bad type bit count"));
        }
        let mut r = Vec::with_capacity(players);
        let mut b = Vec::with_capacity(players);
        for _ in 0..players {
            let mut rrow = Vec::with_capacity(bits);
            let mut brow = Vec::with_capacity(bits);
            for _ in 0..bits {
                rrow.push(sc.integer_field()?);
                brow.push(sc.integer_field()?);
            }
            r.push(rrow);
            b.push(brow);
        }
        sc.finish()?;
        Ok(CardSecret { r, b })
    }
}

impl Display for Card {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "crd|{}|{}|", self.players(), self.bits())?;
        for row in &self.z {
            for z in row {
                write!(f, "{}|", radix(z))?;
            }
        }
        Ok(())
    }
}

impl Display for CardSecret {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "crs|{}|{}|", self.players(), self.bits())?;
        for (rrow, brow) in self.r.iter().zip(&self.b) {
            for (r, b) in rrow.iter().zip(brow) {
                write!(f, "{}|{}|", radix(r), radix(b))?;
            }
        }
        Ok(())
    }
}

derive_wire_conversions!(Card);
derive_wire_conversions!(CardSecret);

#[cfg(test)]
mod test {
    use super::{Card, CardSecret};
    use rug::Integer;
    use std::str::FromStr;

    #[test]
    fn card_roundtrips_via_string() {
        let mut card = Card::new(3, 5);
        card.z[1][2] = Integer::from(123_456_789);
        card.z[2][4] = Integer::from(42);

        let exported = card.to_string();
        let recovered = Card::from_str(&exported).unwrap();
        assert_eq!(card, recovered);
    }

    #[test]
    fn card_import_is_strict() {
        assert!(Card::import("crd|2|2|1|1|1|1|").is_ok());
        // wrong magic
        assert!(Card::import("crs|2|2|1|1|1|1|").is_err());
        // missing entry
        assert!(Card::import("crd|2|2|1|1|1|").is_err());
        // trailing garbage
        assert!(Card::import("crd|1|1|1|x").is_err());
        // zero and oversized shapes
        assert!(Card::import("crd|0|1|").is_err());
        assert!(Card::import("crd|1|100|1|").is_err());
    }

    #[test]
    fn card_secret_roundtrips_via_string() {
        let mut cs = CardSecret::new(2, 4);
        cs.r[0][0] = Integer::from(77);
        cs.b[1][3] = Integer::from(1);

        let exported = cs.to_string();
        let recovered = CardSecret::from_str(&exported).unwrap();
        assert_eq!(cs, recovered);
    }

    #[test]
    fn card_type_xors_toggles_across_rows() {
        let mut cs = CardSecret::new(3, 4);
        // bit 0: one toggle; bit 1: two toggles cancel; bit 2: three
        cs.b[0][0] = Integer::from(1);
        cs.b[0][1] = Integer::from(1);
        cs.b[1][1] = Integer::from(1);
        cs.b[0][2] = Integer::from(1);
        cs.b[1][2] = Integer::from(1);
        cs.b[2][2] = Integer::from(1);
        assert_eq!(cs.card_type(), 0b101);
    }
}
