//! Format constants shared by the BC7 encoder and decoder: the per-mode
//! parameter table, partition shapes with their anchor pixels, and the
//! interpolation weight tables.

/// How a mode stores its endpoint LSBs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PBits {
    /// No extra precision bits.
    None,
    /// One bit per endpoint, appended to every channel of that endpoint.
    PerEndpoint,
    /// One bit per subset, shared by both endpoints of the subset.
    PerSubset,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct Bc7Mode {
    pub subsets: u32,
    pub partition_bits: u32,
    pub rotation_bits: u32,
    pub index_selection_bits: u32,
    /// Color bits per channel per endpoint, excluding p-bits.
    pub cb: u32,
    /// Alpha bits per endpoint, excluding p-bits. 0 means alpha decodes as 255.
    pub ab: u32,
    pub pbits: PBits,
    /// Primary index width.
    pub ib: u32,
    /// Secondary index width for the dual-index modes, 0 otherwise.
    pub ib2: u32,
}

pub(crate) const MODES: [Bc7Mode; 8] = [
    Bc7Mode { subsets: 3, partition_bits: 4, rotation_bits: 0, index_selection_bits: 0, cb: 4, ab: 0, pbits: PBits::PerEndpoint, ib: 3, ib2: 0 },
    Bc7Mode { subsets: 2, partition_bits: 6, rotation_bits: 0, index_selection_bits: 0, cb: 6, ab: 0, pbits: PBits::PerSubset, ib: 3, ib2: 0 },
    Bc7Mode { subsets: 3, partition_bits: 6, rotation_bits: 0, index_selection_bits: 0, cb: 5, ab: 0, pbits: PBits::None, ib: 2, ib2: 0 },
    Bc7Mode { subsets: 2, partition_bits: 6, rotation_bits: 0, index_selection_bits: 0, cb: 7, ab: 0, pbits: PBits::PerEndpoint, ib: 2, ib2: 0 },
    Bc7Mode { subsets: 1, partition_bits: 0, rotation_bits: 2, index_selection_bits: 1, cb: 5, ab: 6, pbits: PBits::None, ib: 2, ib2: 3 },
    Bc7Mode { subsets: 1, partition_bits: 0, rotation_bits: 2, index_selection_bits: 0, cb: 7, ab: 8, pbits: PBits::None, ib: 2, ib2: 2 },
    Bc7Mode { subsets: 1, partition_bits: 0, rotation_bits: 0, index_selection_bits: 0, cb: 7, ab: 7, pbits: PBits::PerEndpoint, ib: 4, ib2: 0 },
    Bc7Mode { subsets: 2, partition_bits: 6, rotation_bits: 0, index_selection_bits: 0, cb: 5, ab: 5, pbits: PBits::PerEndpoint, ib: 2, ib2: 0 },
];

/// Subset index of every pixel for the 2-subset partition shapes, one bit
/// per pixel, pixel 0 in the LSB.
pub(crate) const PARTITIONS_2: [u16; 64] = [
    0xcccc, 0x8888, 0xeeee, 0xecc8, 0xc880, 0xfeec, 0xfec8, 0xec80,
    0xc800, 0xffec, 0xfe80, 0xe800, 0xffe8, 0xff00, 0xfff0, 0xf000,
    0xf710, 0x008e, 0x7100, 0x08ce, 0x008c, 0x7310, 0x3100, 0x8cce,
    0x088c, 0x3110, 0x6666, 0x366c, 0x17e8, 0x0ff0, 0x718e, 0x399c,
    0xaaaa, 0xf0f0, 0x5a5a, 0x33cc, 0x3c3c, 0x55aa, 0x9696, 0xa55a,
    0x73ce, 0x13c8, 0x324c, 0x3bdc, 0x6996, 0xc33c, 0x9966, 0x0660,
    0x0272, 0x04e4, 0x4e40, 0x2720, 0xc936, 0x936c, 0x39c6, 0x639c,
    0x9336, 0x9cc6, 0x817e, 0xe718, 0xccf0, 0x0fcc, 0x7744, 0xee22,
];

/// Anchor pixel of the second subset for each 2-subset partition shape.
/// The first subset's anchor is always pixel 0.
pub(crate) const ANCHORS_2: [u8; 64] = [
    15, 15, 15, 15, 15, 15, 15, 15, 15, 15, 15, 15, 15, 15, 15, 15,
    15, 2, 8, 2, 2, 8, 8, 15, 2, 8, 2, 2, 8, 8, 2, 2,
    15, 15, 6, 8, 2, 8, 15, 15, 2, 8, 2, 2, 2, 15, 15, 6,
    6, 2, 6, 8, 15, 15, 2, 2, 15, 15, 15, 15, 15, 2, 2, 15,
];

/// Subset index of every pixel for the 3-subset partition shapes, two bits
/// per pixel, pixel 0 in the LSBs.
pub(crate) const PARTITIONS_3: [u32; 64] = [
    0xaa685050, 0x6a5a5040, 0x5a5a4200, 0x5450a0a8, 0xa5a50000, 0xa0a05050, 0x5555a0a0, 0x5a5a5050,
    0xaa550000, 0xaa555500, 0xaaaa5500, 0x90909090, 0x94949494, 0xa4a4a4a4, 0xa9a59450, 0x2a0a4250,
    0xa5945040, 0x0a425054, 0xa5a5a500, 0x55a0a0a0, 0xa8a85454, 0x6a6a4040, 0xa4a45000, 0x1a1a0500,
    0x0050a4a4, 0xaaa59090, 0x14696914, 0x69691400, 0xa08585a0, 0xaa821414, 0x50a4a450, 0x6a5a0200,
    0xa9a58000, 0x5090a0a8, 0xa8a09050, 0x24242424, 0x00aa5500, 0x24924924, 0x24499224, 0x50a50a50,
    0x500aa550, 0xaaaa4444, 0x66660000, 0xa5a0a5a0, 0x50a050a0, 0x69286928, 0x44aaaa44, 0x66666600,
    0xaa444444, 0x54a854a8, 0x95809580, 0x96969600, 0xa85454a8, 0x80959580, 0xaa141414, 0x96960000,
    0xaaaa1414, 0xa05050a0, 0xa0a5a5a0, 0x96000000, 0x40804080, 0xa9a8a9a8, 0xaaaaaa44, 0x2a4a5254,
];

/// Anchor pixels of the second and third subset for each 3-subset shape.
pub(crate) const ANCHORS_3_SECOND: [u8; 64] = [
    3, 3, 8, 3, 8, 3, 3, 8, 8, 8, 6, 6, 6, 5, 3, 3,
    3, 3, 8, 3, 3, 3, 6, 8, 3, 8, 6, 6, 8, 5, 10, 8,
    8, 3, 3, 5, 6, 8, 8, 10, 6, 3, 8, 5, 3, 6, 6, 8,
    3, 3, 5, 5, 5, 8, 5, 10, 5, 10, 8, 13, 3, 12, 3, 3,
];
pub(crate) const ANCHORS_3_THIRD: [u8; 64] = [
    15, 8, 15, 15, 15, 15, 15, 15, 15, 15, 15, 15, 15, 15, 15, 8,
    15, 8, 15, 15, 15, 8, 15, 10, 5, 15, 8, 10, 15, 15, 15, 15,
    15, 15, 15, 10, 10, 10, 9, 15, 15, 15, 15, 15, 15, 15, 15, 15,
    15, 15, 15, 15, 15, 15, 15, 15, 15, 15, 15, 15, 15, 15, 15, 8,
];

#[inline]
pub(crate) fn subset_of(mode: &Bc7Mode, partition: u32, pixel: usize) -> usize {
    match mode.subsets {
        1 => 0,
        2 => ((PARTITIONS_2[partition as usize] >> pixel) & 1) as usize,
        _ => ((PARTITIONS_3[partition as usize] >> (pixel * 2)) & 0b11) as usize,
    }
}

/// Anchor pixel positions for the given subset count and partition shape.
pub(crate) fn anchors(subsets: u32, partition: u32) -> [u8; 3] {
    // unused slots repeat pixel 0, which is always an anchor
    match subsets {
        1 => [0, 0, 0],
        2 => [0, ANCHORS_2[partition as usize], 0],
        _ => [
            0,
            ANCHORS_3_SECOND[partition as usize],
            ANCHORS_3_THIRD[partition as usize],
        ],
    }
}

pub(crate) const WEIGHTS_2: [u16; 4] = [0, 21, 43, 64];
pub(crate) const WEIGHTS_3: [u16; 8] = [0, 9, 18, 27, 37, 46, 55, 64];
pub(crate) const WEIGHTS_4: [u16; 16] = [0, 4, 9, 13, 17, 21, 26, 30, 34, 38, 43, 47, 51, 55, 60, 64];

pub(crate) fn weights(index_bits: u32) -> &'static [u16] {
    match index_bits {
        2 => &WEIGHTS_2,
        3 => &WEIGHTS_3,
        4 => &WEIGHTS_4,
        _ => unreachable!("index width must be 2, 3 or 4"),
    }
}

/// Interpolates two 8-bit endpoint values with a weight from the tables.
#[inline]
pub(crate) fn interpolate(e0: u8, e1: u8, weight: u16) -> u8 {
    (((64 - weight) * e0 as u16 + weight * e1 as u16 + 32) >> 6) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interpolation_hits_endpoints() {
        for bits in 2..=4 {
            let table = weights(bits);
            assert_eq!(interpolate(17, 203, table[0]), 17);
            assert_eq!(interpolate(17, 203, *table.last().unwrap()), 203);
        }
    }

    #[test]
    fn every_anchor_is_in_its_subset() {
        for partition in 0..64 {
            let a2 = ANCHORS_2[partition] as usize;
            assert_eq!((PARTITIONS_2[partition] >> a2) & 1, 1);
            assert_eq!(PARTITIONS_2[partition] & 1, 0, "pixel 0 is subset 0");

            // the two extra anchors are stored by pixel position, so either
            // one may belong to subset 1 or 2
            let second = ANCHORS_3_SECOND[partition] as usize;
            let third = ANCHORS_3_THIRD[partition] as usize;
            assert!(second < third);
            let mut subsets = [
                (PARTITIONS_3[partition] >> (second * 2)) & 0b11,
                (PARTITIONS_3[partition] >> (third * 2)) & 0b11,
            ];
            subsets.sort_unstable();
            assert_eq!(subsets, [1, 2]);
            assert_eq!(PARTITIONS_3[partition] & 0b11, 0, "pixel 0 is subset 0");
        }
    }

    #[test]
    fn weight_tables_are_symmetric() {
        for bits in 2..=4 {
            let table = weights(bits);
            for (i, &w) in table.iter().enumerate() {
                assert_eq!(w + table[table.len() - 1 - i], 64);
            }
        }
    }
}
