use crate::bc7data::{anchors, interpolate, subset_of, weights, PBits, MODES};
use crate::bits::BitReader;
use crate::error::DecodeError;
use crate::quantize::replicate;

/// Decodes a 16-byte BC7 block into 16 RGBA pixels.
///
/// All eight modes are supported. The reserved pattern (a low byte of 0)
/// is rejected with [`DecodeError::ReservedMode`].
pub fn decompress_bc7_block(block: [u8; 16]) -> Result<[[u8; 4]; 16], DecodeError> {
    let mut reader = BitReader::new(block);

    if reader.low_u8() == 0 {
        return Err(DecodeError::ReservedMode);
    }
    let mode_index = reader.low_u8().trailing_zeros();
    reader.read(mode_index + 1);
    let mode = &MODES[mode_index as usize];

    let partition = if mode.partition_bits > 0 {
        reader.read(mode.partition_bits)
    } else {
        0
    };
    let rotation = if mode.rotation_bits > 0 {
        reader.read(mode.rotation_bits)
    } else {
        0
    };
    let index_selection = if mode.index_selection_bits > 0 {
        reader.read(1)
    } else {
        0
    };

    // endpoint channel fields, all endpoints per channel
    let endpoint_count = (mode.subsets * 2) as usize;
    let mut codes = [[0_u8; 4]; 6];
    for channel in 0..3 {
        for endpoint in 0..endpoint_count {
            codes[endpoint][channel] = reader.read(mode.cb) as u8;
        }
    }
    if mode.ab > 0 {
        for endpoint in 0..endpoint_count {
            codes[endpoint][3] = reader.read(mode.ab) as u8;
        }
    }

    // append p-bits as LSBs
    let has_pbit = mode.pbits != PBits::None;
    match mode.pbits {
        PBits::None => {}
        PBits::PerEndpoint => {
            for endpoint in codes.iter_mut().take(endpoint_count) {
                let p = reader.read(1) as u8;
                for code in endpoint.iter_mut() {
                    *code = (*code << 1) | p;
                }
            }
        }
        PBits::PerSubset => {
            for subset in 0..mode.subsets as usize {
                let p = reader.read(1) as u8;
                for endpoint in &mut codes[subset * 2..subset * 2 + 2] {
                    for code in endpoint.iter_mut() {
                        *code = (*code << 1) | p;
                    }
                }
            }
        }
    }

    // expand to 8 bits per channel
    let cb = mode.cb + has_pbit as u32;
    let ab = if mode.ab > 0 {
        mode.ab + has_pbit as u32
    } else {
        0
    };
    let mut endpoints = [[0_u8; 4]; 6];
    for (endpoint, code) in endpoints.iter_mut().zip(&codes).take(endpoint_count) {
        for channel in 0..3 {
            endpoint[channel] = replicate(code[channel], cb);
        }
        endpoint[3] = if ab > 0 { replicate(code[3], ab) } else { 255 };
    }

    // index lists; dual-index modes store the 2-bit list first
    let anchor_list = anchors(mode.subsets, partition);
    let anchor_slice = &anchor_list[..mode.subsets as usize];
    let primary = reader.read_indices(mode.ib, anchor_slice);
    let (color_indices, color_bits, alpha_indices, alpha_bits) = if mode.ib2 > 0 {
        let secondary = reader.read_indices(mode.ib2, &[0]);
        if index_selection == 0 {
            (primary, mode.ib, secondary, mode.ib2)
        } else {
            (secondary, mode.ib2, primary, mode.ib)
        }
    } else {
        (primary, mode.ib, primary, mode.ib)
    };

    let color_weights = weights(color_bits);
    let alpha_weights = weights(alpha_bits);

    let mut pixels = [[0_u8; 4]; 16];
    for (pixel_index, pixel) in pixels.iter_mut().enumerate() {
        let subset = subset_of(mode, partition, pixel_index);
        let e0 = endpoints[subset * 2];
        let e1 = endpoints[subset * 2 + 1];

        let cw = color_weights[color_indices[pixel_index] as usize];
        pixel[0] = interpolate(e0[0], e1[0], cw);
        pixel[1] = interpolate(e0[1], e1[1], cw);
        pixel[2] = interpolate(e0[2], e1[2], cw);
        pixel[3] = if ab > 0 {
            let aw = alpha_weights[alpha_indices[pixel_index] as usize];
            interpolate(e0[3], e1[3], aw)
        } else {
            255
        };

        if rotation > 0 {
            pixel.swap(rotation as usize - 1, 3);
        }
    }

    Ok(pixels)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bits::BitWriter;

    #[test]
    fn reserved_mode_is_rejected() {
        let mut block = [0_u8; 16];
        block[1] = 0xab;
        assert_eq!(decompress_bc7_block(block), Err(DecodeError::ReservedMode));
    }

    #[test]
    fn mode_6_constant_block_decodes_exactly() {
        // both endpoints hold (180, 66, 90, 200) via the p-bits
        let color = [180_u8, 66, 90, 200];
        let mut writer = BitWriter::new();
        writer.write_mode(6);
        for channel in 0..4 {
            writer.write((color[channel] >> 1) as u32, 7);
            writer.write((color[channel] >> 1) as u32, 7);
        }
        writer.write((color[0] & 1) as u32, 1);
        writer.write((color[0] & 1) as u32, 1);
        writer.write_indices(&[0; 16], 4, &[0]);

        let pixels = decompress_bc7_block(writer.finish()).unwrap();
        assert!(pixels.iter().all(|p| *p == color));
    }

    #[test]
    fn mode_5_rotation_swaps_channels_back() {
        // rotation 1 stores the red channel in the alpha slot, so the
        // stored "red" endpoints carry the original alpha
        let mut writer = BitWriter::new();
        writer.write_mode(5);
        writer.write(1, 2); // rotation: alpha <-> red
        writer.write(127, 7); // stored red = original alpha, fully opaque
        writer.write(127, 7);
        for _ in 0..2 {
            writer.write(0, 7); // green and blue endpoints
            writer.write(0, 7);
        }
        writer.write(200, 8); // stored alpha = original red
        writer.write(200, 8);
        writer.write_indices(&[0; 16], 2, &[0]);
        writer.write_indices(&[0; 16], 2, &[0]);

        let pixels = decompress_bc7_block(writer.finish()).unwrap();
        assert!(pixels.iter().all(|p| *p == [200, 0, 0, 255]));
    }

    #[test]
    fn mode_0_reads_three_subsets() {
        // partition 0 of the 3-subset table; each subset gets a flat color
        let mut writer = BitWriter::new();
        writer.write_mode(0);
        writer.write(0, 4);
        for channel_value in [[0_u32, 0, 15, 15, 8, 8]; 3] {
            for value in channel_value {
                writer.write(value, 4);
            }
        }
        for p in [0_u32, 0, 1, 1, 0, 0] {
            writer.write(p, 1);
        }
        writer.write_indices(&[0; 16], 3, &[0, 3, 15]);

        let pixels = decompress_bc7_block(writer.finish()).unwrap();
        // subset colors after the p-bit and 4->5->8 bit expansion
        let expected = [
            [0, 0, 0, 255],
            [255, 255, 255, 255],
            [132, 132, 132, 255],
        ];
        for (i, pixel) in pixels.iter().enumerate() {
            let subset = (crate::bc7data::PARTITIONS_3[0] >> (i * 2)) & 0b11;
            assert_eq!(*pixel, expected[subset as usize], "pixel {i}");
        }
    }

    #[test]
    fn mode_4_honors_the_index_selection_bit() {
        let build = |index_selection: u32| {
            let mut writer = BitWriter::new();
            writer.write_mode(4);
            writer.write(0, 2); // no rotation
            writer.write(index_selection, 1);
            for _ in 0..3 {
                writer.write(0, 5); // color endpoints black..white
                writer.write(31, 5);
            }
            writer.write(0, 6); // alpha endpoints transparent..opaque
            writer.write(63, 6);

            let mut two_bit = [3_u8; 16];
            two_bit[0] = 1;
            let mut three_bit = [0_u8; 16];
            three_bit[0] = 3;
            writer.write_indices(&two_bit, 2, &[0]);
            writer.write_indices(&three_bit, 3, &[0]);
            decompress_bc7_block(writer.finish()).unwrap()
        };

        // selection 0: color reads the 2-bit list, alpha the 3-bit list
        let pixels = build(0);
        assert_eq!(pixels[5], [255, 255, 255, 0]);
        assert_eq!(pixels[0], [84, 84, 84, 108]);

        // selection 1 swaps the two lists
        let pixels = build(1);
        assert_eq!(pixels[5], [0, 0, 0, 255]);
        assert_eq!(pixels[0], [108, 108, 108, 84]);
    }

    #[test]
    fn mode_1_uses_the_partition_table() {
        // partition 0 splits the block into two vertical halves; give
        // subset 0 black endpoints and subset 1 white endpoints
        let mut writer = BitWriter::new();
        writer.write_mode(1);
        writer.write(0, 6); // partition 0
        for _ in 0..3 {
            for value in [0_u32, 0, 63, 63] {
                writer.write(value, 6);
            }
        }
        writer.write(0, 1); // subset 0 p-bit
        writer.write(1, 1); // subset 1 p-bit
        writer.write_indices(&[0; 16], 3, &[0, 15]);

        let pixels = decompress_bc7_block(writer.finish()).unwrap();
        for (i, pixel) in pixels.iter().enumerate() {
            let expected = if crate::bc7data::PARTITIONS_2[0] & (1 << i) == 0 {
                [0, 0, 0, 255]
            } else {
                [255, 255, 255, 255]
            };
            assert_eq!(*pixel, expected, "pixel {i}");
        }
    }
}
