//! Bit-granular stream primitives for the replica codec.
//!
//! This crate provides [`BitWriter`] and [`BitReader`] for bit-level encoding and decoding,
//! plus the self-describing adaptive number encoding used for counts, lengths and
//! dictionary identifiers.
//!
//! # Design Principles
//!
//! - **No unsafe code** - Safety is paramount.
//! - **Bounded reads** - The reader never reads past its declared bit length.
//! - **No domain knowledge** - This crate knows nothing about schemas or dictionaries.
//! - **Explicit errors** - All failures return structured errors, never panic.
//!
//! # Example
//!
//! ```
//! use bitstream::{BitReader, BitWriter};
//!
//! let mut writer = BitWriter::new();
//! writer.write_bit(true).unwrap();
//! writer.write_bits(42, 7).unwrap();
//! writer.write_adaptive_number(300).unwrap();
//!
//! let bits = writer.bits_written();
//! let bytes = writer.finish();
//!
//! let mut reader = BitReader::with_bit_len(&bytes, bits);
//! assert!(reader.read_bit().unwrap());
//! assert_eq!(reader.read_bits(7).unwrap(), 42);
//! assert_eq!(reader.read_adaptive_number().unwrap(), 300);
//! assert!(reader.is_empty());
//! ```

mod adaptive;
mod error;
mod reader;
mod writer;

pub use adaptive::{adaptive_bit_count, ADAPTIVE_WIDTHS};
pub use error::{BitError, BitResult};
pub use reader::BitReader;
pub use writer::BitWriter;
