#![warn(missing_docs)]
#![deny(clippy::correctness)]
#![allow(clippy::many_single_char_names)]

//! Numeric utilities for the TMCG toolbox

#[macro_use]
extern crate lazy_static;

/// Random number generation
pub mod rand;

/// Prime numbers
pub mod prime;

/// Modular square roots and residuosity
pub mod sqrt;

/// Fast exponentiation tables
pub mod fpowm;
