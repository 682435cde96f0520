//! # OxiBz Core
//!
//! Core components for the OxiBz compression library.
//!
//! This crate provides the codec-independent building blocks:
//!
//! - [`bitstream`]: MSB-first bit output
//! - [`crc`]: the bzip2 CRC-32 and its stream combination rule
//! - [`traits`]: the streaming [`Compressor`] contract
//! - [`error`]: Error types
//!
//! ## Example
//!
//! ```rust
//! use oxibz_core::bitstream::BitWriter;
//! use oxibz_core::crc::BzCrc32;
//!
//! let mut writer = BitWriter::new(Vec::new());
//! writer.write_bits(0x5A, 8).unwrap();
//! assert_eq!(writer.into_inner().unwrap(), vec![0x5A]);
//!
//! assert_eq!(BzCrc32::compute(b"123456789"), 0xFC89_1918);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod bitstream;
pub mod crc;
pub mod error;
pub mod traits;

// Re-exports for convenience
pub use bitstream::BitWriter;
pub use crc::BzCrc32;
pub use error::{OxiBzError, Result};
pub use traits::{CompressStatus, Compressor, FlushMode};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::bitstream::BitWriter;
    pub use crate::crc::BzCrc32;
    pub use crate::error::{OxiBzError, Result};
    pub use crate::traits::{CompressStatus, Compressor, FlushMode};
}
