use glam::Vec4;

use super::{
    best_slots, clusterfit::ClusterFit, pixel_weights, rangefit, refine_endpoints,
    CompressOptions, Quality, RefineOptions,
};
use crate::bc7data::{interpolate, ANCHORS_2, PARTITIONS_2, WEIGHTS_2, WEIGHTS_3, WEIGHTS_4};
use crate::bits::BitWriter;
use crate::colorset::{ChannelMask, ColorSet};
use crate::quantize::{QuantizedPair, Quantizer, SharedBits};

/// Compresses a 4x4 block of RGBA pixels into a 16-byte BC7 block.
///
/// The encoder emits the single-subset modes 5 and 6 and, at the highest
/// quality, the two-subset mode 1. Blocks of a single color are encoded
/// exactly.
pub fn compress_bc7_block(pixels: &[[u8; 4]; 16], options: &CompressOptions) -> [u8; 16] {
    compress_bc7_block_masked(pixels, u16::MAX, options)
}

/// Like [`compress_bc7_block`], but only the pixels selected by `mask`
/// contribute to the fit. Used for blocks that hang over the image edge.
pub(crate) fn compress_bc7_block_masked(
    pixels: &[[u8; 4]; 16],
    mask: u16,
    options: &CompressOptions,
) -> [u8; 16] {
    if let Some(color) = uniform_color(pixels, mask) {
        return single_color_block(color);
    }

    let metric = options.metric_vec(true);
    let weights = pixel_weights(pixels, options.weight_by_alpha);

    let mut best: Option<([u8; 16], f32)> = None;

    mode6_candidate(pixels, mask, &weights, metric, options, &mut best);

    if options.quality >= Quality::Normal {
        let rotations: &[u32] = if options.quality >= Quality::Highest {
            &[0, 1, 2, 3]
        } else {
            &[0]
        };
        for &rotation in rotations {
            mode5_candidates(pixels, mask, &weights, metric, rotation, options, &mut best);
        }
    }

    if options.quality >= Quality::Highest {
        mode1_candidates(pixels, mask, &weights, metric, &mut best);
    }

    let (block, _) = best.expect("mode 6 always yields a candidate");
    block
}

fn consider(block: [u8; 16], error: f32, best: &mut Option<([u8; 16], f32)>) {
    let replace = match best {
        None => true,
        Some((_, best_error)) => error < *best_error,
    };
    if replace {
        *best = Some((block, error));
    }
}

/// The color shared by all masked-in pixels, if there is one. A fully
/// masked-out block counts as uniform so edge handling stays total.
fn uniform_color(pixels: &[[u8; 4]; 16], mask: u16) -> Option<[u8; 4]> {
    let mut color = pixels[0];
    let mut first = true;
    for (i, &pixel) in pixels.iter().enumerate() {
        if mask & (1 << i) == 0 {
            continue;
        }
        if first {
            color = pixel;
            first = false;
        } else if pixel != color {
            return None;
        }
    }
    Some(color)
}

/// A block of a single color can be stored exactly in mode 5: for every
/// 8-bit value there is a pair of 7-bit endpoints whose second palette
/// entry reproduces it, and the 8-bit alpha endpoints store alpha directly.
fn single_color_block(color: [u8; 4]) -> [u8; 16] {
    let mut start = [0_u8; 4];
    let mut end = [0_u8; 4];
    for channel in 0..3 {
        let c = color[channel];
        start[channel] = c >> 1;
        end[channel] = (if c < 128 { c + 1 } else { c - 1 }) >> 1;
    }
    let pair = QuantizedPair { start, end };
    serialize_mode5(0, pair, [1; 16], [color[3]; 2], [0; 16])
}

// ---------------------------------------------------------------------------
// mode 6

fn mode6_candidate(
    pixels: &[[u8; 4]; 16],
    mask: u16,
    weights: &[f32; 16],
    metric: Vec4,
    options: &CompressOptions,
    best: &mut Option<([u8; 16], f32)>,
) {
    let set = ColorSet::new(pixels, mask, ChannelMask::RGBA, weights, 0);
    if set.count() == 0 {
        return;
    }
    let quantizer = Quantizer::new(7, 7, SharedBits::PerEndpoint);

    let eval = |endpoints: (Vec4, Vec4)| {
        let pair = quantizer.quantize_pair(endpoints.0, endpoints.1);
        let palette = rgba_palette(&quantizer, pair, &WEIGHTS_4);
        let (slots, error) = best_slots(&set, &palette, metric);
        (pair, slots, error)
    };

    let seed = rangefit::range_endpoints(&set);
    let endpoints = if options.quality >= Quality::Normal {
        let (min, max) = set.bounds();
        let refine = RefineOptions::endpoint_search((max - min).length());
        refine_endpoints(seed, &refine, |candidate| eval(candidate).2)
    } else {
        seed
    };

    let (pair, slots, error) = eval(endpoints);
    let indices = set.remap_to_pixels(&slots, 0);
    consider(serialize_mode6(pair, indices), error, best);
}

fn serialize_mode6(mut pair: QuantizedPair, mut indices: [u8; 16]) -> [u8; 16] {
    if indices[0] >= 8 {
        pair = pair.swapped();
        for index in indices.iter_mut() {
            *index = 15 - *index;
        }
    }

    let mut writer = BitWriter::new();
    writer.write_mode(6);
    for channel in 0..4 {
        writer.write((pair.start[channel] >> 1) as u32, 7);
        writer.write((pair.end[channel] >> 1) as u32, 7);
    }
    for codes in [pair.start, pair.end] {
        // the p-bit is the shared LSB of all four channels
        debug_assert!(codes.iter().all(|&c| c & 1 == codes[0] & 1));
        writer.write((codes[0] & 1) as u32, 1);
    }
    writer.write_indices(&indices, 4, &[0]);
    writer.finish()
}

// ---------------------------------------------------------------------------
// mode 5

#[allow(clippy::too_many_arguments)]
fn mode5_candidates(
    pixels: &[[u8; 4]; 16],
    mask: u16,
    weights: &[f32; 16],
    metric: Vec4,
    rotation: u32,
    options: &CompressOptions,
    best: &mut Option<([u8; 16], f32)>,
) {
    let rotated = rotate_pixels(pixels, rotation);
    let rotated_metric = rotate_metric(metric, rotation);
    let mut color_metric = rotated_metric;
    color_metric.w = 0.0;

    let set = ColorSet::new(&rotated, mask, ChannelMask::RGB, weights, 0);
    if set.count() == 0 {
        return;
    }
    let quantizer = Quantizer::new(7, 0, SharedBits::None);

    let alpha = fit_alpha(&rotated, mask, weights, rotated_metric.w);

    let eval = |endpoints: (Vec4, Vec4)| {
        let pair = quantizer.quantize_pair(endpoints.0, endpoints.1);
        let palette = color_palette(&quantizer, pair, &WEIGHTS_2);
        let (slots, error) = best_slots(&set, &palette, color_metric);
        (pair, slots, error)
    };

    let seed = rangefit::range_endpoints(&set);
    let (min, max) = set.bounds();
    let refine = RefineOptions::endpoint_search((max - min).length());
    let endpoints = refine_endpoints(seed, &refine, |candidate| eval(candidate).2);

    let (pair, slots, error) = eval(endpoints);
    let indices = set.remap_to_pixels(&slots, 0);
    consider(
        serialize_mode5(rotation, pair, indices, alpha.endpoints, alpha.indices),
        error + alpha.error,
        best,
    );

    if options.quality >= Quality::Highest && set.count() > 1 {
        let cluster = ClusterFit::new(&set, color_metric);
        let interior = [
            WEIGHTS_2[1] as f32 / 64.0,
            WEIGHTS_2[2] as f32 / 64.0,
        ];
        if let Some(candidate) = cluster.fit4(interior, &quantizer, |pair| {
            color_palette(&quantizer, pair, &WEIGHTS_2)
        }) {
            let indices = set.remap_to_pixels(&candidate.slots, 0);
            consider(
                serialize_mode5(rotation, candidate.pair, indices, alpha.endpoints, alpha.indices),
                candidate.error + alpha.error,
                best,
            );
        }
    }
}

struct AlphaFit {
    endpoints: [u8; 2],
    indices: [u8; 16],
    error: f32,
}

/// Fits the separate two-index alpha channel of mode 5.
///
/// The endpoints start at the observed extremes and are nudged by a short
/// decaying-step search, the same scheme the color endpoints use.
fn fit_alpha(pixels: &[[u8; 4]; 16], mask: u16, weights: &[f32; 16], alpha_metric: f32) -> AlphaFit {
    let mut min = 255_u8;
    let mut max = 0_u8;
    for (i, pixel) in pixels.iter().enumerate() {
        if mask & (1 << i) != 0 {
            min = min.min(pixel[3]);
            max = max.max(pixel[3]);
        }
    }
    if min > max {
        // no masked-in pixels
        (min, max) = (255, 255);
    }

    let eval = |lo: f32, hi: f32| {
        let e0 = (lo * 255.0 + 0.5) as u8;
        let e1 = (hi * 255.0 + 0.5) as u8;
        let palette = WEIGHTS_2.map(|w| interpolate(e0, e1, w));

        let mut indices = [0_u8; 16];
        let mut error = 0.0;
        for (i, pixel) in pixels.iter().enumerate() {
            if mask & (1 << i) == 0 {
                continue;
            }
            let mut slot = 0;
            let mut best = pixel[3].abs_diff(palette[0]);
            for (k, &entry) in palette.iter().enumerate().skip(1) {
                let diff = pixel[3].abs_diff(entry);
                if diff < best {
                    best = diff;
                    slot = k;
                }
            }
            indices[i] = slot as u8;
            let diff = alpha_metric * best as f32 / 255.0;
            error += weights[i] * diff * diff;
        }
        ([e0, e1], indices, error)
    };

    let mut best = (min as f32 / 255.0, max as f32 / 255.0);
    let mut best_error = eval(best.0, best.1).2;
    let mut step = 0.2 * (best.1 - best.0);
    while step >= 1.0 / 255.0 {
        for (d0, d1) in [(step, 0.0), (0.0, step), (-step, 0.0), (0.0, -step)] {
            let candidate = (
                (best.0 + d0).clamp(0.0, 1.0),
                (best.1 + d1).clamp(0.0, 1.0),
            );
            let error = eval(candidate.0, candidate.1).2;
            if error < best_error {
                best_error = error;
                best = candidate;
            }
        }
        step *= 0.5;
    }

    let (endpoints, indices, error) = eval(best.0, best.1);
    AlphaFit {
        endpoints,
        indices,
        error,
    }
}

fn serialize_mode5(
    rotation: u32,
    mut pair: QuantizedPair,
    mut color_indices: [u8; 16],
    mut alpha: [u8; 2],
    mut alpha_indices: [u8; 16],
) -> [u8; 16] {
    if color_indices[0] >= 2 {
        pair = pair.swapped();
        for index in color_indices.iter_mut() {
            *index = 3 - *index;
        }
    }
    if alpha_indices[0] >= 2 {
        alpha.swap(0, 1);
        for index in alpha_indices.iter_mut() {
            *index = 3 - *index;
        }
    }

    let mut writer = BitWriter::new();
    writer.write_mode(5);
    writer.write(rotation, 2);
    for channel in 0..3 {
        writer.write(pair.start[channel] as u32, 7);
        writer.write(pair.end[channel] as u32, 7);
    }
    writer.write(alpha[0] as u32, 8);
    writer.write(alpha[1] as u32, 8);
    writer.write_indices(&color_indices, 2, &[0]);
    writer.write_indices(&alpha_indices, 2, &[0]);
    writer.finish()
}

fn rotate_pixels(pixels: &[[u8; 4]; 16], rotation: u32) -> [[u8; 4]; 16] {
    if rotation == 0 {
        return *pixels;
    }
    let channel = rotation as usize - 1;
    pixels.map(|mut pixel| {
        pixel.swap(channel, 3);
        pixel
    })
}

fn rotate_metric(metric: Vec4, rotation: u32) -> Vec4 {
    if rotation == 0 {
        return metric;
    }
    let mut lanes = metric.to_array();
    lanes.swap(rotation as usize - 1, 3);
    Vec4::from_array(lanes)
}

// ---------------------------------------------------------------------------
// mode 1

fn mode1_candidates(
    pixels: &[[u8; 4]; 16],
    mask: u16,
    weights: &[f32; 16],
    metric: Vec4,
    best: &mut Option<([u8; 16], f32)>,
) {
    let quantizer = Quantizer::new(6, 0, SharedBits::PerPair);
    let mut color_metric = metric;
    color_metric.w = 0.0;

    // mode 1 decodes alpha as 255 regardless of the input, which every
    // partition pays for equally
    let mut alpha_penalty = 0.0;
    for (i, pixel) in pixels.iter().enumerate() {
        if mask & (1 << i) != 0 {
            let diff = metric.w * (pixel[3] as f32 / 255.0 - 1.0);
            alpha_penalty += weights[i] * diff * diff;
        }
    }

    for partition in 0..64_u32 {
        let partition_mask = PARTITIONS_2[partition as usize];

        let mut pairs = [QuantizedPair {
            start: [0; 4],
            end: [0; 4],
        }; 2];
        let mut slots = [0_u8; 16];
        let mut error = alpha_penalty;

        for subset in 0..2 {
            let subset_mask = if subset == 0 {
                mask & !partition_mask
            } else {
                mask & partition_mask
            };
            let set = ColorSet::new(pixels, subset_mask, ChannelMask::RGB, weights, 0);
            if set.count() == 0 {
                continue;
            }

            let seed = rangefit::range_endpoints(&set);
            let pair = quantizer.quantize_pair(seed.0, seed.1);
            let palette = color_palette(&quantizer, pair, &WEIGHTS_3);
            let (subset_slots, subset_error) = best_slots(&set, &palette, color_metric);

            pairs[subset as usize] = pair;
            error += subset_error;
            let indices = set.remap_to_pixels(&subset_slots, 0);
            for i in 0..16 {
                if subset_mask & (1 << i) != 0 {
                    slots[i] = indices[i];
                }
            }
        }

        consider(serialize_mode1(partition, pairs, slots), error, best);
    }
}

fn serialize_mode1(
    partition: u32,
    mut pairs: [QuantizedPair; 2],
    mut slots: [u8; 16],
) -> [u8; 16] {
    let partition_mask = PARTITIONS_2[partition as usize];
    let anchor1 = ANCHORS_2[partition as usize];

    for subset in 0..2 {
        let anchor = if subset == 0 { 0 } else { anchor1 as usize };
        if slots[anchor] >= 4 {
            pairs[subset] = pairs[subset].swapped();
            for (i, slot) in slots.iter_mut().enumerate() {
                if ((partition_mask >> i) & 1) as usize == subset {
                    *slot = 7 - *slot;
                }
            }
        }
    }

    let mut writer = BitWriter::new();
    writer.write_mode(1);
    writer.write(partition, 6);
    for channel in 0..3 {
        for codes in [pairs[0].start, pairs[0].end, pairs[1].start, pairs[1].end] {
            writer.write((codes[channel] >> 1) as u32, 6);
        }
    }
    for pair in &pairs {
        // one p-bit per subset, shared by both endpoints
        debug_assert!(pair
            .start
            .iter()
            .take(3)
            .chain(pair.end.iter().take(3))
            .all(|&c| c & 1 == pair.start[0] & 1));
        writer.write((pair.start[0] & 1) as u32, 1);
    }
    writer.write_indices(&slots, 3, &[0, anchor1]);
    writer.finish()
}

// ---------------------------------------------------------------------------
// palettes

/// The decoded palette of a color-only mode, with a zero alpha lane to
/// match alpha-masked point sets.
fn color_palette<const K: usize>(
    quantizer: &Quantizer,
    pair: QuantizedPair,
    table: &[u16; K],
) -> [Vec4; K] {
    let start = quantizer.expand_bytes(pair.start);
    let end = quantizer.expand_bytes(pair.end);
    std::array::from_fn(|k| {
        let w = table[k];
        Vec4::new(
            interpolate(start[0], end[0], w) as f32,
            interpolate(start[1], end[1], w) as f32,
            interpolate(start[2], end[2], w) as f32,
            0.0,
        ) / 255.0
    })
}

/// The decoded palette of an RGBA mode.
fn rgba_palette<const K: usize>(
    quantizer: &Quantizer,
    pair: QuantizedPair,
    table: &[u16; K],
) -> [Vec4; K] {
    let start = quantizer.expand_bytes(pair.start);
    let end = quantizer.expand_bytes(pair.end);
    std::array::from_fn(|k| {
        let w = table[k];
        Vec4::new(
            interpolate(start[0], end[0], w) as f32,
            interpolate(start[1], end[1], w) as f32,
            interpolate(start[2], end[2], w) as f32,
            interpolate(start[3], end[3], w) as f32,
        ) / 255.0
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_color_blocks_decode_exactly() {
        for color in [[123, 45, 67, 210], [0, 0, 0, 0], [255, 1, 128, 255]] {
            let block = single_color_block(color);
            // five zero bits, then the mode bit
            assert_eq!(block[0] & 0x3f, 1 << 5);
            let pixels = crate::decode::decompress_bc7_block(block).unwrap();
            assert!(pixels.iter().all(|p| *p == color), "{color:?}");
        }
    }

    #[test]
    fn output_is_deterministic() {
        let mut pixels = [[0_u8; 4]; 16];
        for (i, pixel) in pixels.iter_mut().enumerate() {
            *pixel = [(i * 7) as u8, (i * 23) as u8, (i * 3) as u8, 255 - i as u8];
        }
        for quality in [Quality::Fast, Quality::Normal, Quality::Highest] {
            let options = CompressOptions {
                quality,
                ..Default::default()
            };
            let first = compress_bc7_block(&pixels, &options);
            assert_eq!(compress_bc7_block(&pixels, &options), first);
        }
    }
}
