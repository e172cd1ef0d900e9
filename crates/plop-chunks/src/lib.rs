//! plop-chunks: content-defined chunking with a keyed rolling hash
//!
//! - `pol`: polynomials over GF(2) and derivation of an irreducible
//!   degree-53 polynomial from a random stream
//! - `rabin`: streaming Rabin chunker parameterized by such a polynomial
//!
//! Because the polynomial is derived from a shared secret, every holder
//! of that secret splits identical input at identical boundaries, which
//! is what makes cross-user deduplication possible.

pub mod pol;
pub mod rabin;

pub use pol::{derive_polynomial, Pol};
pub use rabin::{Chunker, ChunkerConfig, Tables, WINDOW_SIZE};
