//! Endpoint quantization onto the per-channel lattices of the block formats.
//!
//! A lattice code expands to 8 bits by bit replication and to a float by a
//! further division by 255. Quantization picks the code whose expansion is
//! nearest to the input, which is not always the code produced by uniform
//! rounding, so the rounded candidate is compared against its neighbors.

use glam::Vec4;

/// Expands a `bits`-wide code to 8 bits by replicating its bit pattern.
#[inline]
pub(crate) fn replicate(value: u8, bits: u32) -> u8 {
    debug_assert!((1..=8).contains(&bits));
    debug_assert!((value as u32) < (1 << bits));

    let mut out = (value as u32) << (8 - bits);
    let mut filled = bits;
    while filled < 8 {
        out |= out >> filled;
        filled *= 2;
    }
    out as u8
}

/// Where a format stores endpoint LSBs that are not part of the per-channel
/// fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SharedBits {
    None,
    /// Each endpoint carries one extra LSB shared by all of its channels.
    PerEndpoint,
    /// Both endpoints share a single extra LSB.
    PerPair,
}

/// A pair of quantized endpoints.
///
/// Codes are stored at the *effective* channel width, i.e. with any shared
/// bit already merged in as the LSB. Channels without storage hold code 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct QuantizedPair {
    pub start: [u8; 4],
    pub end: [u8; 4],
}

impl QuantizedPair {
    pub fn swapped(self) -> Self {
        Self {
            start: self.end,
            end: self.start,
        }
    }

    /// The serialized endpoint bits as one integer, for deterministic
    /// tie-breaking between candidates of equal error.
    pub fn bit_pattern(self) -> u64 {
        let mut pattern = 0_u64;
        for (i, &code) in self.start.iter().chain(self.end.iter()).enumerate() {
            pattern |= (code as u64) << (i * 8);
        }
        pattern
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct Quantizer {
    bits: [u32; 4],
    shared: SharedBits,
}

impl Quantizer {
    /// A quantizer with `cb` bits per color channel and `ab` bits of alpha.
    pub const fn new(cb: u32, ab: u32, shared: SharedBits) -> Self {
        Self {
            bits: [cb, cb, cb, ab],
            shared,
        }
    }

    /// BC1's 5-6-5 color lattice.
    pub const fn bc1() -> Self {
        Self {
            bits: [5, 6, 5, 0],
            shared: SharedBits::None,
        }
    }

    /// Effective bits of the given channel, including shared bits.
    fn effective_bits(&self, channel: usize) -> u32 {
        let bits = self.bits[channel];
        if bits == 0 {
            0
        } else {
            bits + (self.shared != SharedBits::None) as u32
        }
    }

    /// The largest code of every channel, for callers scaling errors to the
    /// lattice resolution.
    pub fn gridinv(&self) -> Vec4 {
        let grid = |channel| {
            let bits = self.effective_bits(channel);
            if bits == 0 {
                0.0
            } else {
                ((1_u32 << bits) - 1) as f32
            }
        };
        Vec4::new(grid(0), grid(1), grid(2), grid(3))
    }

    /// Expands lattice codes to 8-bit channel values. Channels without
    /// storage decode as fully opaque.
    pub fn expand_bytes(&self, codes: [u8; 4]) -> [u8; 4] {
        let mut out = [0_u8; 4];
        for channel in 0..4 {
            let bits = self.effective_bits(channel);
            out[channel] = if bits == 0 {
                if channel == 3 {
                    255
                } else {
                    0
                }
            } else {
                replicate(codes[channel], bits)
            };
        }
        out
    }

    /// Expands lattice codes to a normalized color.
    pub fn lookup_lattice(&self, codes: [u8; 4]) -> Vec4 {
        let bytes = self.expand_bytes(codes);
        Vec4::new(
            bytes[0] as f32,
            bytes[1] as f32,
            bytes[2] as f32,
            bytes[3] as f32,
        ) / 255.0
    }

    /// Quantizes a pair of continuous endpoints to the nearest lattice
    /// points, searching both shared-bit assignments where applicable.
    pub fn quantize_pair(&self, start: Vec4, end: Vec4) -> QuantizedPair {
        match self.shared {
            SharedBits::None => QuantizedPair {
                start: self.quantize_free(start),
                end: self.quantize_free(end),
            },
            SharedBits::PerEndpoint => QuantizedPair {
                start: self.quantize_with_best_parity(&[start])[0],
                end: self.quantize_with_best_parity(&[end])[0],
            },
            SharedBits::PerPair => {
                let both = self.quantize_with_best_parity(&[start, end]);
                QuantizedPair {
                    start: both[0],
                    end: both[1],
                }
            }
        }
    }

    fn quantize_free(&self, value: Vec4) -> [u8; 4] {
        let gridinv = self.gridinv();
        let mut codes = [0_u8; 4];
        for channel in 0..4 {
            let bits = self.effective_bits(channel);
            if bits != 0 {
                codes[channel] = quantize_channel(value[channel], bits, gridinv[channel]);
            }
        }
        codes
    }

    /// Quantizes the endpoints once per parity of the shared LSB and keeps
    /// the assignment with the lower squared reconstruction error.
    fn quantize_with_best_parity(&self, endpoints: &[Vec4]) -> [[u8; 4]; 2] {
        debug_assert!(matches!(endpoints.len(), 1 | 2));

        let gridinv = self.gridinv();
        let mut best = [[0_u8; 4]; 2];
        let mut best_error = f32::INFINITY;
        for parity in 0..2_u8 {
            let mut codes = [[0_u8; 4]; 2];
            let mut error = 0.0;
            for (e, &value) in endpoints.iter().enumerate() {
                for channel in 0..4 {
                    let bits = self.effective_bits(channel);
                    if bits == 0 {
                        continue;
                    }
                    let code =
                        quantize_channel_parity(value[channel], bits, gridinv[channel], parity);
                    let delta = replicate(code, bits) as f32 / 255.0 - value[channel];
                    error += delta * delta;
                    codes[e][channel] = code;
                }
            }
            if error < best_error {
                best_error = error;
                best = codes;
            }
        }
        best
    }
}

/// Nearest `bits`-wide code under bit-replicated expansion.
///
/// `grid` is the largest code of the channel; uniform rounding onto the
/// grid gives a first candidate which is then compared against its
/// neighbors under the actual expansion.
fn quantize_channel(value: f32, bits: u32, grid: f32) -> u8 {
    let grid = grid as i32;
    let target = value.clamp(0.0, 1.0) * 255.0;

    let base = (value.clamp(0.0, 1.0) * grid as f32).round_ties_even() as i32;
    let mut best = base.clamp(0, grid) as u8;
    let mut best_dist = (replicate(best, bits) as f32 - target).abs();
    for candidate in [base - 1, base + 1] {
        if (0..=grid).contains(&candidate) {
            let dist = (replicate(candidate as u8, bits) as f32 - target).abs();
            if dist < best_dist {
                best_dist = dist;
                best = candidate as u8;
            }
        }
    }
    best
}

/// Nearest `bits`-wide code whose LSB equals `parity`.
fn quantize_channel_parity(value: f32, bits: u32, grid: f32, parity: u8) -> u8 {
    let grid = grid as i32;
    let target = value.clamp(0.0, 1.0) * 255.0;
    let base = (value.clamp(0.0, 1.0) * grid as f32).round_ties_even() as i32;

    let mut best = None;
    let mut best_dist = f32::INFINITY;
    for candidate in (base - 2)..=(base + 2) {
        if (0..=grid).contains(&candidate) && (candidate & 1) as u8 == parity {
            let dist = (replicate(candidate as u8, bits) as f32 - target).abs();
            if dist < best_dist {
                best_dist = dist;
                best = Some(candidate as u8);
            }
        }
    }
    // the window always contains codes of both parities
    best.unwrap_or(parity)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replicate_extremes() {
        for bits in 1..=8 {
            assert_eq!(replicate(0, bits), 0);
            assert_eq!(replicate(((1_u32 << bits) - 1) as u8, bits), 255);
        }
        assert_eq!(replicate(0b10000, 5), 0b10000100);
        assert_eq!(replicate(0b100000, 6), 0b10000010);
    }

    #[test]
    fn quantization_is_idempotent() {
        let quantizers = [
            Quantizer::bc1(),
            Quantizer::new(7, 7, SharedBits::PerEndpoint),
            Quantizer::new(6, 0, SharedBits::PerPair),
            Quantizer::new(7, 8, SharedBits::None),
        ];
        for q in quantizers {
            for i in 0..=255_u32 {
                let v = Vec4::splat(i as f32 / 255.0);
                let first = q.quantize_pair(v, 1.0 - v);
                let expanded_start = q.lookup_lattice(first.start);
                let expanded_end = q.lookup_lattice(first.end);
                let second = q.quantize_pair(expanded_start, expanded_end);
                assert_eq!(first, second);
            }
        }
    }

    #[test]
    fn exact_lattice_values_survive() {
        let q = Quantizer::bc1();
        for r in 0..32_u8 {
            let v = Vec4::new(replicate(r, 5) as f32 / 255.0, 0.0, 0.0, 0.0);
            let pair = q.quantize_pair(v, v);
            assert_eq!(pair.start[0], r);
            assert_eq!(pair.end[0], r);
        }
    }

    #[test]
    fn shared_parity_is_uniform() {
        let q = Quantizer::new(7, 7, SharedBits::PerEndpoint);
        let pair = q.quantize_pair(
            Vec4::new(0.1, 0.5, 0.9, 0.3),
            Vec4::new(0.4, 0.2, 0.6, 0.8),
        );
        for codes in [pair.start, pair.end] {
            let parity = codes[0] & 1;
            assert!(codes.iter().all(|&c| c & 1 == parity));
        }
    }

    #[test]
    fn pair_sharing_uses_one_parity() {
        let q = Quantizer::new(6, 0, SharedBits::PerPair);
        let pair = q.quantize_pair(
            Vec4::new(0.11, 0.52, 0.93, 0.0),
            Vec4::new(0.48, 0.27, 0.66, 0.0),
        );
        let parity = pair.start[0] & 1;
        for codes in [pair.start, pair.end] {
            for channel in 0..3 {
                assert_eq!(codes[channel] & 1, parity);
            }
        }
    }

    #[test]
    fn channel_quantization_is_truly_nearest() {
        // replication makes the lattice slightly non-uniform, so verify
        // against exhaustive search
        for bits in [4, 5, 6, 7] {
            let grid = (1_u32 << bits) - 1;
            for i in 0..=1000 {
                let v = i as f32 / 1000.0;
                let code = quantize_channel(v, bits, grid as f32);
                let chosen = (replicate(code, bits) as f32 - v * 255.0).abs();
                for other in 0..=grid {
                    let dist = (replicate(other as u8, bits) as f32 - v * 255.0).abs();
                    assert!(chosen <= dist);
                }
            }
        }
    }
}
