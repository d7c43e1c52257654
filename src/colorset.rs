//! The weighted point set a block is fitted against.
//!
//! Pixels are deduplicated so the fits only see the distinct colors of a
//! block, with per-point weights carrying multiplicity. A remap table leads
//! back to pixel positions for the final index writeback.

use bitflags::bitflags;
use glam::Vec4;

bitflags! {
    /// The channels that participate in fitting and error accumulation.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub(crate) struct ChannelMask: u8 {
        const R = 0b0001;
        const G = 0b0010;
        const B = 0b0100;
        const A = 0b1000;
    }
}

impl ChannelMask {
    pub const RGB: Self = Self::R.union(Self::G).union(Self::B);
    pub const RGBA: Self = Self::RGB.union(Self::A);
}

pub(crate) struct ColorSet {
    points: [Vec4; 16],
    bytes: [[u8; 4]; 16],
    weights: [f32; 16],
    count: usize,
    /// Point index per pixel; -1 for transparent or unused pixels.
    remap: [i8; 16],
    transparent: bool,
}

impl ColorSet {
    /// Builds the point set of a block.
    ///
    /// `mask` selects the pixels that are part of the image (edge blocks use
    /// partial masks). `pixel_weights` carries the fitting weight of every
    /// pixel; merged points accumulate the weights of their pixels. With a
    /// non-zero `alpha_cutoff`, pixels below the cutoff are excluded from
    /// fitting and marked for the transparent palette slot. Channels outside
    /// `channels` are zeroed in the stored points so they do not influence
    /// endpoints or errors.
    pub fn new(
        pixels: &[[u8; 4]; 16],
        mask: u16,
        channels: ChannelMask,
        pixel_weights: &[f32; 16],
        alpha_cutoff: u8,
    ) -> Self {
        let mut set = Self {
            points: [Vec4::ZERO; 16],
            bytes: [[0; 4]; 16],
            weights: [0.0; 16],
            count: 0,
            remap: [-1; 16],
            transparent: false,
        };

        for (i, &pixel) in pixels.iter().enumerate() {
            if mask & (1 << i) == 0 {
                continue;
            }
            if alpha_cutoff > 0 && pixel[3] < alpha_cutoff {
                set.transparent = true;
                continue;
            }

            let mut masked = pixel;
            for channel in 0..4 {
                if !channels.contains(ChannelMask::from_bits_truncate(1 << channel)) {
                    masked[channel] = 0;
                }
            }

            // ensure each color is only allocated one point
            let weight = pixel_weights[i];
            match set.bytes[..set.count].iter().position(|&b| b == masked) {
                Some(point) => {
                    set.weights[point] += weight;
                    set.remap[i] = point as i8;
                }
                None => {
                    let point = set.count;
                    set.bytes[point] = masked;
                    set.points[point] = Vec4::new(
                        masked[0] as f32,
                        masked[1] as f32,
                        masked[2] as f32,
                        masked[3] as f32,
                    ) / 255.0;
                    set.weights[point] = weight;
                    set.remap[i] = point as i8;
                    set.count += 1;
                }
            }
        }

        set
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn points(&self) -> &[Vec4] {
        &self.points[..self.count]
    }

    pub fn weights(&self) -> &[f32] {
        &self.weights[..self.count]
    }

    pub fn point_bytes(&self, point: usize) -> [u8; 4] {
        debug_assert!(point < self.count);
        self.bytes[point]
    }

    /// Whether any masked-in pixel fell below the alpha cutoff.
    pub fn is_transparent(&self) -> bool {
        self.transparent
    }

    /// Per-channel bounds of the point set.
    pub fn bounds(&self) -> (Vec4, Vec4) {
        let mut min = Vec4::ONE;
        let mut max = Vec4::ZERO;
        for point in self.points() {
            min = min.min(*point);
            max = max.max(*point);
        }
        if self.count == 0 {
            (Vec4::ZERO, Vec4::ZERO)
        } else {
            (min, max)
        }
    }

    /// Spreads per-point palette slots back to pixel positions.
    ///
    /// Transparent and unused pixels receive `default_slot`.
    pub fn remap_to_pixels(&self, slots: &[u8], default_slot: u8) -> [u8; 16] {
        debug_assert!(slots.len() >= self.count);
        let mut indices = [default_slot; 16];
        for (pixel, &point) in self.remap.iter().enumerate() {
            if point >= 0 {
                indices[pixel] = slots[point as usize];
            }
        }
        indices
    }
}
