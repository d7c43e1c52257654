//! Whole-surface compression on top of the block codecs.
//!
//! Surfaces are tightly packed RGBA8 buffers. Blocks are independent, so
//! compression is parallelized over rows of blocks when the `rayon` feature
//! is enabled; output is identical either way.

use crate::encode::{compress_bc1_block_masked, compress_bc7_block_masked};
use crate::{CompressOptions, DecodeError, Format};

/// Compresses an RGBA8 surface into tightly packed blocks.
///
/// Blocks that hang over the edge of the surface only take their in-bounds
/// pixels into account.
///
/// ## Panics
///
/// Panics if `rgba.len() != width * height * 4`.
pub fn compress_surface(
    format: Format,
    rgba: &[u8],
    width: usize,
    height: usize,
    options: &CompressOptions,
) -> Vec<u8> {
    assert_eq!(rgba.len(), width * height * 4, "surface buffer size mismatch");
    if width == 0 || height == 0 {
        return Vec::new();
    }

    let source: &[[u8; 4]] = bytemuck::cast_slice(rgba);
    let blocks_wide = width.div_ceil(4);
    let blocks_high = height.div_ceil(4);

    let compress_row = |block_y: usize| -> Vec<u8> {
        let mut row = Vec::with_capacity(blocks_wide * format.block_size());
        for block_x in 0..blocks_wide {
            let (pixels, mask) = gather_block(source, width, height, block_x, block_y);
            match format {
                Format::Bc1 => row.extend(compress_bc1_block_masked(&pixels, mask, options)),
                Format::Bc7 => row.extend(compress_bc7_block_masked(&pixels, mask, options)),
            }
        }
        row
    };

    #[cfg(feature = "rayon")]
    let rows: Vec<Vec<u8>> = {
        use rayon::prelude::*;
        (0..blocks_high).into_par_iter().map(compress_row).collect()
    };
    #[cfg(not(feature = "rayon"))]
    let rows: Vec<Vec<u8>> = (0..blocks_high).map(compress_row).collect();

    rows.concat()
}

/// Decompresses tightly packed blocks into an RGBA8 surface.
///
/// ## Panics
///
/// Panics if `data.len()` does not match the compressed size of the
/// surface.
pub fn decompress_surface(
    format: Format,
    data: &[u8],
    width: usize,
    height: usize,
) -> Result<Vec<u8>, DecodeError> {
    assert_eq!(
        data.len(),
        format.compressed_size(width, height),
        "compressed buffer size mismatch"
    );

    let mut rgba = vec![0_u8; width * height * 4];
    let output: &mut [[u8; 4]] = bytemuck::cast_slice_mut(&mut rgba);
    let blocks_wide = width.div_ceil(4);

    for (block_index, block) in data.chunks_exact(format.block_size()).enumerate() {
        let pixels = match format {
            Format::Bc1 => {
                let mut bytes = [0_u8; 8];
                bytes.copy_from_slice(block);
                crate::decompress_bc1_block(bytes)
            }
            Format::Bc7 => {
                let mut bytes = [0_u8; 16];
                bytes.copy_from_slice(block);
                crate::decompress_bc7_block(bytes)?
            }
        };

        let block_x = block_index % blocks_wide;
        let block_y = block_index / blocks_wide;
        for py in 0..4 {
            for px in 0..4 {
                let x = block_x * 4 + px;
                let y = block_y * 4 + py;
                if x < width && y < height {
                    output[y * width + x] = pixels[py * 4 + px];
                }
            }
        }
    }

    Ok(rgba)
}

fn gather_block(
    source: &[[u8; 4]],
    width: usize,
    height: usize,
    block_x: usize,
    block_y: usize,
) -> ([[u8; 4]; 16], u16) {
    let mut pixels = [[0_u8; 4]; 16];
    let mut mask = 0_u16;
    for py in 0..4 {
        for px in 0..4 {
            let x = block_x * 4 + px;
            let y = block_y * 4 + py;
            if x < width && y < height {
                pixels[py * 4 + px] = source[y * width + x];
                mask |= 1 << (py * 4 + px);
            }
        }
    }
    (pixels, mask)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient_surface(width: usize, height: usize) -> Vec<u8> {
        let mut rgba = Vec::with_capacity(width * height * 4);
        for y in 0..height {
            for x in 0..width {
                let v = ((x * 255) / width.max(1)) as u8;
                rgba.extend([v, (y * 7) as u8, 255 - v, 255]);
            }
        }
        rgba
    }

    #[test]
    fn surface_sizes() {
        assert_eq!(Format::Bc1.compressed_size(16, 32), 256);
        assert_eq!(Format::Bc1.compressed_size(15, 30), 256);
        assert_eq!(Format::Bc7.compressed_size(16, 32), 512);
        assert_eq!(Format::Bc7.compressed_size(1, 1), 16);
    }

    #[test]
    fn round_trip_has_matching_dimensions() {
        for (width, height) in [(8, 8), (5, 7), (1, 1), (13, 4)] {
            let rgba = gradient_surface(width, height);
            for format in [Format::Bc1, Format::Bc7] {
                let compressed =
                    compress_surface(format, &rgba, width, height, &CompressOptions::default());
                assert_eq!(compressed.len(), format.compressed_size(width, height));
                let decompressed =
                    decompress_surface(format, &compressed, width, height).unwrap();
                assert_eq!(decompressed.len(), rgba.len());
            }
        }
    }

    #[test]
    fn bc7_surface_round_trip_is_faithful_for_flat_colors() {
        let width = 6;
        let height = 6;
        let mut rgba = Vec::new();
        for _ in 0..width * height {
            rgba.extend([10, 200, 30, 255]);
        }
        let compressed = compress_surface(Format::Bc7, &rgba, width, height, &Default::default());
        let decompressed = decompress_surface(Format::Bc7, &compressed, width, height).unwrap();
        assert_eq!(rgba, decompressed);
    }
}
