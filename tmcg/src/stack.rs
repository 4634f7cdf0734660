//! Stacks of cards and their shuffle secrets

use crate::{
    constants::MAX_CARDS,
    error::Error,
    parse::Scanner,
    perm::Permutation,
    Result,
};
use std::{
    fmt::{self, Display, Formatter},
    ops::Deref,
    str::FromStr,
};

/// The bounds every wire-transferable record satisfies
pub trait WireRecord: Clone + PartialEq + Display + FromStr<Err = Error> {}

impl<T> WireRecord for T where T: Clone + PartialEq + Display + FromStr<Err = Error> {}

/// An ordered sequence of cards
#[derive(Clone, Debug)]
pub struct Stack<C> {
    cards: Vec<C>,
}

/// An ordered sequence of (type, card) pairs
#[derive(Clone, Debug)]
pub struct OpenStack<C> {
    /// The pairs, in stack order
    pub cards: Vec<(usize, C)>,
}

/// A permutation paired with per-position card secrets
///
/// Entry `i` holds the source position that lands at `i` after the
/// shuffle, and the secret masking that card.
#[derive(Clone, Debug)]
pub struct StackSecret<S> {
    pairs: Vec<(usize, S)>,
}

impl<C> Default for Stack<C> {
    fn default() -> Self {
        Stack { cards: Vec::new() }
    }
}

impl<C: WireRecord> Stack<C> {
    /// Creates an empty stack.
    pub fn new() -> Self {
        Self::default()
    }

    /// Pushes a card onto the stack; input past [MAX_CARDS] is dropped.
    pub fn push(&mut self, c: C) {
        if self.cards.len() < MAX_CARDS {
            self.cards.push(c);
        }
    }

    /// Pushes every card of another stack.
    pub fn push_stack(&mut self, s: &Stack<C>) {
        if self.cards.len() + s.cards.len() <= MAX_CARDS {
            self.cards.extend_from_slice(&s.cards);
        }
    }

    /// Pushes the cards of an open stack, dropping the types.
    pub fn push_open_stack(&mut self, s: &OpenStack<C>) {
        if self.cards.len() + s.cards.len() <= MAX_CARDS {
            self.cards.extend(s.cards.iter().map(|(_, c)| c.clone()));
        }
    }

    /// Removes and returns the top card.
    pub fn pop(&mut self) -> Option<C> {
        self.cards.pop()
    }

    /// Removes every card.
    pub fn clear(&mut self) {
        self.cards.clear();
    }

    /// Tests whether an equal card is on the stack.
    pub fn find(&self, c: &C) -> bool {
        self.cards.iter().any(|x| x == c)
    }

    /// Removes the first card equal to `c`.
    pub fn remove(&mut self, c: &C) -> bool {
        match self.cards.iter().position(|x| x == c) {
            Some(i) => {
                self.cards.remove(i);
                true
            }
            None => false,
        }
    }

    /// Removes every card equal to `c`, counting them.
    pub fn remove_all(&mut self, c: &C) -> usize {
        let mut counter = 0;
        while self.remove(c) {
            counter += 1;
        }
        counter
    }

    /// Reads one stack from a newline-terminated line.
    pub fn read_from(r: &mut dyn std::io::BufRead) -> Result<Stack<C>> {
        crate::parse::recv(r, crate::constants::MAX_STACK_CHARS)
    }

    /// Writes this stack as a newline-terminated line.
    pub fn write_to(&self, w: &mut dyn std::io::Write) -> Result<()> {
        crate::parse::send(w, self)
    }

    /// Imports a stack from its textual form.
    pub fn import(s: &str) -> Result<Stack<C>> {
        let mut sc = Scanner::new(s, "stk", '^')?;
        let size = sc.size_field()?;
        if size < 1 || size > MAX_CARDS {
            return Err(Error::Parse("bad stack size"));
        }
        let mut cards = Vec::with_capacity(size);
        for _ in 0..size {
            cards.push(sc.nonempty_field()?.parse()?);
        }
        sc.finish()?;
        Ok(Stack { cards })
    }
}

impl<C> Deref for Stack<C> {
    type Target = [C];

    fn deref(&self) -> &[C] {
        &self.cards
    }
}

impl<C: PartialEq> PartialEq for Stack<C> {
    fn eq(&self, rhs: &Self) -> bool {
        self.cards == rhs.cards
    }
}

impl<C: WireRecord> Display for Stack<C> {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "stk^{}^", self.cards.len())?;
        for c in &self.cards {
            write!(f, "{}^", c)?;
        }
        Ok(())
    }
}

impl<C: WireRecord> FromStr for Stack<C> {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::import(s)
    }
}

impl<C> Default for OpenStack<C> {
    fn default() -> Self {
        OpenStack { cards: Vec::new() }
    }
}

impl<C: WireRecord> OpenStack<C> {
    /// Creates an empty open stack.
    pub fn new() -> Self {
        Self::default()
    }

    /// Pushes a typed card; input past [MAX_CARDS] is dropped.
    pub fn push(&mut self, card_type: usize, c: C) {
        if self.cards.len() < MAX_CARDS {
            self.cards.push((card_type, c));
        }
    }

    /// Removes and returns the top typed card.
    pub fn pop(&mut self) -> Option<(usize, C)> {
        self.cards.pop()
    }

    /// Gets the position of the first card of the given type.
    pub fn find_type(&self, card_type: usize) -> Option<usize> {
        self.cards.iter().position(|(t, _)| *t == card_type)
    }

    /// Moves the first card of the given type onto a stack.
    pub fn move_to_stack(&mut self, card_type: usize, s: &mut Stack<C>) -> bool {
        match self.find_type(card_type) {
            Some(i) => {
                let (_, c) = self.cards.remove(i);
                s.push(c);
                true
            }
            None => false,
        }
    }
}

impl<C> Deref for OpenStack<C> {
    type Target = [(usize, C)];

    fn deref(&self) -> &[(usize, C)] {
        &self.cards
    }
}

impl<C: PartialEq> PartialEq for OpenStack<C> {
    fn eq(&self, rhs: &Self) -> bool {
        self.cards == rhs.cards
    }
}

impl<S> Default for StackSecret<S> {
    fn default() -> Self {
        StackSecret { pairs: Vec::new() }
    }
}

impl<S: Clone + Display + FromStr<Err = Error>> StackSecret<S> {
    /// Creates an empty stack secret.
    pub fn new() -> Self {
        Self::default()
    }

    /// Pushes a (source position, secret) pair; input past [MAX_CARDS]
    /// is dropped.
    pub fn push(&mut self, index: usize, secret: S) {
        if self.pairs.len() < MAX_CARDS {
            self.pairs.push((index, secret));
        }
    }

    /// Gets the entry whose source position is `index`.
    pub fn find_position(&self, index: usize) -> Option<usize> {
        self.pairs.iter().position(|(i, _)| *i == index)
    }

    /// Tests whether some entry has source position `index`.
    pub fn find(&self, index: usize) -> bool {
        self.find_position(index).is_some()
    }

    /// Extracts the permutation formed by the source positions.
    pub fn permutation(&self) -> Option<Permutation> {
        Permutation::from_vec(self.pairs.iter().map(|(i, _)| *i).collect())
    }

    /// Reads one stack secret from a newline-terminated line.
    pub fn read_from(r: &mut dyn std::io::BufRead) -> Result<StackSecret<S>> {
        crate::parse::recv(r, crate::constants::MAX_STACK_CHARS)
    }

    /// Writes this stack secret as a newline-terminated line.
    pub fn write_to(&self, w: &mut dyn std::io::Write) -> Result<()> {
        crate::parse::send(w, self)
    }

    /// Imports a stack secret, validating the permutation.
    pub fn import(s: &str) -> Result<StackSecret<S>> {
        let mut sc = Scanner::new(s, "sts", '^')?;
        let size = sc.size_field()?;
        if size < 1 || size > MAX_CARDS {
            return Err(Error::Parse("bad stack size"));
        }
        let mut pairs = Vec::with_capacity(size);
        for _ in 0..size {
            let index = sc.size_field()?;
            if index >= size {
                return Err(Error::Parse("bad permutation index"));
            }
            let secret = sc.nonempty_field()?.parse()?;
            pairs.push((index, secret));
        }
        sc.finish()?;
        let ss = StackSecret { pairs };
        if ss.permutation().is_none() {
            return Err(Error::Parse("indices are not a permutation"));
        }
        Ok(ss)
    }
}

impl<S> Deref for StackSecret<S> {
    type Target = [(usize, S)];

    fn deref(&self) -> &[(usize, S)] {
        &self.pairs
    }
}

impl<S: Clone + Display + FromStr<Err = Error>> Display for StackSecret<S> {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "sts^{}^", self.pairs.len())?;
        for (i, s) in &self.pairs {
            write!(f, "{}^{}^", i, s)?;
        }
        Ok(())
    }
}

impl<S: Clone + Display + FromStr<Err = Error>> FromStr for StackSecret<S> {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::import(s)
    }
}

#[cfg(test)]
mod test {
    use super::{OpenStack, Stack, StackSecret};
    use crate::card::{Card, CardSecret};
    use rug::Integer;
    use std::str::FromStr;

    fn sample_card(tag: u32) -> Card {
        let mut c = Card::new(2, 3);
        c.z[0][0] = Integer::from(tag);
        c
    }

    #[test]
    fn stack_container_operations_work() {
        let mut s = Stack::new();
        s.push(sample_card(1));
        s.push(sample_card(2));
        s.push(sample_card(2));
        assert_eq!(s.len(), 3);
        assert!(s.find(&sample_card(2)));
        assert!(!s.find(&sample_card(9)));

        assert!(s.remove(&sample_card(2)));
        assert_eq!(s.len(), 2);
        assert_eq!(s.remove_all(&sample_card(2)), 1);

        assert_eq!(s.pop(), Some(sample_card(1)));
        assert!(s.pop().is_none());
    }

    #[test]
    fn stacks_append_from_stacks_and_open_stacks() {
        let mut a = Stack::new();
        a.push(sample_card(1));
        let mut b = Stack::new();
        b.push(sample_card(2));
        a.push_stack(&b);

        let mut os = OpenStack::new();
        os.push(4, sample_card(3));
        a.push_open_stack(&os);

        assert_eq!(a.len(), 3);
        assert_eq!(a[1], sample_card(2));
        assert_eq!(a[2], sample_card(3));
    }

    #[test]
    fn stack_roundtrips_via_string() {
        let mut s = Stack::new();
        for i in 0..4 {
            s.push(sample_card(i));
        }
        let exported = s.to_string();
        let recovered: Stack<Card> = exported.parse().unwrap();
        assert_eq!(s, recovered);
    }

    #[test]
    fn stack_import_is_strict() {
        assert!(Stack::<Card>::from_str("stk^0^").is_err());
        assert!(Stack::<Card>::from_str("stk^1^").is_err());
        assert!(Stack::<Card>::from_str("stk^1^crd|1|1|1|^extra").is_err());
        let bad_card = "stk^1^crd|1|1|^";
        assert!(Stack::<Card>::from_str(bad_card).is_err());
    }

    #[test]
    fn open_stack_tracks_types() {
        let mut os = OpenStack::new();
        os.push(7, sample_card(1));
        os.push(3, sample_card(2));
        assert_eq!(os.find_type(3), Some(1));
        assert_eq!(os.find_type(8), None);

        let mut s = Stack::new();
        assert!(os.move_to_stack(7, &mut s));
        assert_eq!(os.len(), 1);
        assert_eq!(s.len(), 1);
        assert_eq!(s[0], sample_card(1));
    }

    #[test]
    fn stack_secret_roundtrips_and_validates_the_permutation() {
        let mut ss: StackSecret<CardSecret> = StackSecret::new();
        ss.push(1, CardSecret::new(2, 3));
        ss.push(2, CardSecret::new(2, 3));
        ss.push(0, CardSecret::new(2, 3));
        assert!(ss.permutation().is_some());
        assert_eq!(ss.find_position(2), Some(1));

        let exported = ss.to_string();
        let recovered: StackSecret<CardSecret> = exported.parse().unwrap();
        assert_eq!(recovered.len(), 3);
        assert_eq!(recovered.permutation().unwrap()[0], 1);

        // duplicate index: not a permutation
        let cs = CardSecret::new(1, 1).to_string();
        let dup = format!("sts^2^0^{}^0^{}^", cs, cs);
        assert!(StackSecret::<CardSecret>::from_str(&dup).is_err());
    }
}
