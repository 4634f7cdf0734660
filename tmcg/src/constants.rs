//! Compile-time limits and protocol defaults

/// Maximum number of players sharing one card encoding
pub const MAX_PLAYERS: usize = 32;

/// Maximum number of bits in a card type
pub const MAX_TYPEBITS: usize = 8;

/// Maximum number of cards in a stack
pub const MAX_CARDS: usize = 512;

/// Maximum length in bytes of a serialized stack record
pub const MAX_STACK_CHARS: usize = 16 * 1024 * 1024;

/// Default modulus bit length for key generation
pub const KEY_SIZE: u32 = 1024;

/// Maximum modulus bit length accepted by key generation
pub const MAX_KEY_BITS: u32 = 4096;

/// Number of trailing signature characters forming a key id
pub const KEYID_SIZE: usize = 32;

/// Radix of integer fields in the textual wire format
pub const IO_BASE: i32 = 36;

/// Iterations of the square-freeness stage of the key proof
pub const NIZK_STAGE1: usize = 16;

/// Iterations of the prime-power stage of the key proof
pub const NIZK_STAGE2: usize = 128;

/// Iterations of the non-residue stage of the key proof
pub const NIZK_STAGE3: usize = 128;

/// Plaintext and redundancy octets of the SAEP padding
pub const SAEP_S0: usize = 20;

/// Random seed octets of the signature padding
pub const PRAB_K0: usize = 20;

/// Field bit length of the discrete-logarithm instance
pub const DDH_BITS: u32 = 1024;

/// Subgroup bit length of the discrete-logarithm instance
pub const DLSE_BITS: u32 = 160;

/// Miller-Rabin iterations for structural key checks
pub const MR_ITERATIONS: u32 = 64;
