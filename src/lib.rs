//! Encoder and decoder for BC1 and BC7 texture compression blocks.
//!
//! Every 4x4 group of RGBA pixels compresses independently into a
//! fixed-size block: two endpoint colors on a format-specific lattice plus
//! a small palette index per pixel. The encoder searches for the endpoint
//! pair minimizing the weighted squared error of the decoded block, using
//! principal-axis seeding, exhaustive contiguous-partition least squares,
//! and exact single-color encodings.
//!
//! ```
//! use bcn_codec::{compress_bc1_block, decompress_bc1_block, CompressOptions};
//!
//! let red = [[255, 0, 0, 255]; 16];
//! let block = compress_bc1_block(&red, &CompressOptions::default());
//! assert_eq!(decompress_bc1_block(block), red);
//! ```
//!
//! Blocks share no state, so callers are free to compress blocks from as
//! many threads as they like; [`surface`] does exactly that for whole
//! images when the `rayon` feature (default) is enabled.

#![forbid(unsafe_code)]

mod bc7data;
mod bits;
mod colorblock;
mod colorset;
mod decode;
mod encode;
mod error;
mod gamma;
mod math;
mod quantize;
pub mod surface;

pub use decode::{decompress_bc1_block, decompress_bc7_block};
pub use encode::{
    compress_bc1_block, compress_bc7_block, CompressOptions, ErrorMetric, Quality,
};
pub use error::DecodeError;
pub use gamma::compute_gamma_lut;

/// The supported block formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    /// 8-byte blocks: 5-6-5 endpoints, 2-bit indices, optional
    /// punch-through transparency.
    Bc1,
    /// 16-byte blocks: eight modes with per-mode endpoint precision,
    /// partitions and channel rotation.
    Bc7,
}

impl Format {
    /// The size of one compressed block in bytes.
    pub const fn block_size(self) -> usize {
        match self {
            Format::Bc1 => 8,
            Format::Bc7 => 16,
        }
    }

    /// The compressed size of a surface, accounting for padding to whole
    /// blocks.
    pub const fn compressed_size(self, width: usize, height: usize) -> usize {
        width.div_ceil(4) * height.div_ceil(4) * self.block_size()
    }
}
