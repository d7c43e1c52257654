use crate::colorblock;

/// Decodes an 8-byte BC1 block into 16 RGBA pixels.
///
/// Blocks in the three-entry regime decode index 3 as transparent black;
/// everything else is fully opaque. All bit patterns are valid.
pub fn decompress_bc1_block(block: [u8; 8]) -> [[u8; 4]; 16] {
    colorblock::decode_block(block)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_block_decodes() {
        // white and black endpoints in the four-entry regime, indices
        // cycling through all four palette entries
        let block = [0xff, 0xff, 0x00, 0x00, 0xe4, 0xe4, 0xe4, 0xe4];
        let pixels = decompress_bc1_block(block);
        assert_eq!(pixels[0], [255, 255, 255, 255]);
        assert_eq!(pixels[1], [0, 0, 0, 255]);
        assert_eq!(pixels[2], [170, 170, 170, 255]);
        assert_eq!(pixels[3], [85, 85, 85, 255]);
    }

    #[test]
    fn transparent_block_decodes() {
        let block = [0, 0, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff];
        assert!(decompress_bc1_block(block).iter().all(|p| *p == [0, 0, 0, 0]));
    }
}
