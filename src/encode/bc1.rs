use glam::Vec4;

use super::{
    best_slots, clusterfit::ClusterFit, metric_distance, pixel_weights, rangefit, singlefit,
    singlefit::Regime, CompressOptions, FitCandidate, Quality,
};
use crate::colorblock;
use crate::colorset::{ChannelMask, ColorSet};
use crate::quantize::{QuantizedPair, Quantizer};

/// Compresses a 4x4 block of RGBA pixels into an 8-byte BC1 block.
///
/// With a non-zero [`alpha_cutoff`](CompressOptions::alpha_cutoff), pixels
/// below the cutoff become punch-through transparent. All other pixels
/// decode fully opaque.
pub fn compress_bc1_block(pixels: &[[u8; 4]; 16], options: &CompressOptions) -> [u8; 8] {
    compress_bc1_block_masked(pixels, u16::MAX, options)
}

/// Like [`compress_bc1_block`], but only the pixels selected by `mask`
/// contribute to the fit. Used for blocks that hang over the image edge.
pub(crate) fn compress_bc1_block_masked(
    pixels: &[[u8; 4]; 16],
    mask: u16,
    options: &CompressOptions,
) -> [u8; 8] {
    let metric = options.metric_vec(false);
    let weights = pixel_weights(pixels, options.weight_by_alpha);
    let set = ColorSet::new(pixels, mask, ChannelMask::RGB, &weights, options.alpha_cutoff);

    if set.count() == 0 {
        return transparent_block();
    }

    let quantizer = Quantizer::bc1();
    // the four-entry palette has no transparent slot
    let allow_four = !set.is_transparent();

    let mut best: Option<(FitCandidate, Regime)> = None;
    fn consider(
        candidate: FitCandidate,
        regime: Regime,
        best: &mut Option<(FitCandidate, Regime)>,
    ) {
        let replace = match best {
            None => true,
            Some((current, _)) => candidate.error < current.error,
        };
        if replace {
            *best = Some((candidate, regime));
        }
    }

    if set.count() == 1 {
        let color = set.point_bytes(0);
        if allow_four {
            let (pair, slot) = singlefit::single_color_fit(color, metric, Regime::Four);
            let candidate = score_single(&set, pair, slot, colorblock::fit_palette4(pair), metric);
            consider(candidate, Regime::Four, &mut best);
        }
        let (pair, slot) = singlefit::single_color_fit(color, metric, Regime::Three);
        let candidate = score_single(&set, pair, slot, colorblock::fit_palette3(pair), metric);
        consider(candidate, Regime::Three, &mut best);
    } else {
        let (start, end) = rangefit::range_endpoints(&set);
        let pair = quantizer.quantize_pair(start, end);
        let cluster =
            (options.quality >= Quality::Normal).then(|| ClusterFit::new(&set, metric));

        // four-entry candidates first, cluster before the three-entry
        // regime, so recompressing a decoded block settles on the same
        // encoding it came from
        if allow_four {
            let (slots, error) = best_slots(&set, &colorblock::fit_palette4(pair), metric);
            consider(FitCandidate { pair, slots, error }, Regime::Four, &mut best);

            if let Some(cluster) = &cluster {
                if let Some(candidate) =
                    cluster.fit4([1.0 / 3.0, 2.0 / 3.0], &quantizer, colorblock::fit_palette4)
                {
                    consider(candidate, Regime::Four, &mut best);
                }
            }
        }

        let (slots, error) = best_slots(&set, &colorblock::fit_palette3(pair), metric);
        consider(FitCandidate { pair, slots, error }, Regime::Three, &mut best);

        if let Some(cluster) = &cluster {
            if set.is_transparent() || options.quality >= Quality::Highest {
                if let Some(candidate) = cluster.fit3(&quantizer, colorblock::fit_palette3) {
                    consider(candidate, Regime::Three, &mut best);
                }
            }
        }
    }

    let (candidate, regime) = best.expect("a non-empty set always yields a candidate");
    match regime {
        Regime::Four => {
            colorblock::write_block4(candidate.pair, set.remap_to_pixels(&candidate.slots, 0))
        }
        Regime::Three => {
            colorblock::write_block3(candidate.pair, set.remap_to_pixels(&candidate.slots, 3))
        }
    }
}

fn score_single<const K: usize>(
    set: &ColorSet,
    pair: QuantizedPair,
    slot: u8,
    palette: [Vec4; K],
    metric: Vec4,
) -> FitCandidate {
    debug_assert_eq!(set.count(), 1);
    let mut slots = [0_u8; 16];
    slots[0] = slot;
    let error =
        set.weights()[0] * metric_distance(metric, set.points()[0], palette[slot as usize]);
    FitCandidate { pair, slots, error }
}

/// A block that decodes to 16 transparent pixels. The endpoints are
/// arbitrary as long as `c0 <= c1`; distinct values are chosen because some
/// decoders mishandle `c0 == c1`.
fn transparent_block() -> [u8; 8] {
    let pair = QuantizedPair {
        start: [0, 0, 0, 0],
        end: [31, 63, 31, 0],
    };
    colorblock::write_block3(pair, [3; 16])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::colorblock::decode_block;

    #[test]
    fn transparent_input_yields_transparent_pixels() {
        let pixels = [[90, 120, 30, 0]; 16];
        let options = CompressOptions {
            alpha_cutoff: 128,
            ..Default::default()
        };
        let block = compress_bc1_block(&pixels, &options);
        assert_eq!(block, [0, 0, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff]);
        assert!(decode_block(block).iter().all(|p| *p == [0, 0, 0, 0]));
    }

    #[test]
    fn punch_through_pixels_do_not_move_endpoints() {
        let mut pixels = [[200, 40, 40, 255]; 16];
        // a wildly different but transparent color
        pixels[3] = [0, 255, 0, 0];
        pixels[12] = [0, 255, 0, 0];

        let options = CompressOptions {
            alpha_cutoff: 128,
            ..Default::default()
        };
        let decoded = decode_block(compress_bc1_block(&pixels, &options));
        assert_eq!(decoded[3], [0, 0, 0, 0]);
        assert_eq!(decoded[12], [0, 0, 0, 0]);
        // opaque pixels keep the red color, unaffected by the green outlier
        assert_eq!(decoded[0][3], 255);
        assert!(decoded[0][0] > 150 && decoded[0][1] < 80);
    }

    #[test]
    fn output_is_deterministic() {
        let mut pixels = [[0_u8; 4]; 16];
        for (i, pixel) in pixels.iter_mut().enumerate() {
            *pixel = [(i * 13) as u8, (i * 31) as u8, (255 - i * 11) as u8, 255];
        }
        let options = CompressOptions::default();
        let first = compress_bc1_block(&pixels, &options);
        for _ in 0..10 {
            assert_eq!(compress_bc1_block(&pixels, &options), first);
        }
    }
}
