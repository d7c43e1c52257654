use glam::Vec4;

use crate::colorset::ColorSet;

mod bc1;
mod bc7;
mod clusterfit;
mod rangefit;
mod singlefit;

pub use bc1::compress_bc1_block;
pub use bc7::compress_bc7_block;

pub(crate) use bc1::compress_bc1_block_masked;
pub(crate) use bc7::compress_bc7_block_masked;

/// The trade-off between compression speed and output quality.
///
/// Each level tries a strict superset of the candidate encodings of the
/// level below it, so for any block the error at `Highest` is less than or
/// equal to the error at `Normal`, which is less than or equal to the error
/// at `Fast`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum Quality {
    /// Axis-aligned endpoint seeds only. Suitable for previews and
    /// interactive tooling.
    Fast,
    /// Adds endpoint refinement and the cheaper alternative modes.
    #[default]
    Normal,
    /// Exhausts all partition and rotation trials and runs the cluster
    /// optimizer wherever the format permits it.
    Highest,
}

/// The per-channel weighting applied inside the squared-error norm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ErrorMetric {
    /// All channels are weighted equally.
    #[default]
    Uniform,
    /// Rec. 709 luma weights, biasing the fit towards channels the eye is
    /// more sensitive to.
    Perceptual,
}

/// Options for compressing blocks.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub struct CompressOptions {
    /// The compression quality. Default: [`Quality::Normal`].
    pub quality: Quality,
    /// The error metric. Default: [`ErrorMetric::Uniform`].
    pub metric: ErrorMetric,
    /// Scales the fitting weight of each pixel by its alpha value, which
    /// improves perceived quality for alpha-blended images.
    ///
    /// Default: `false`.
    pub weight_by_alpha: bool,
    /// Pixels with an alpha below this cutoff become punch-through
    /// transparent in formats with a transparent palette slot (BC1). Their
    /// color does not influence endpoint placement. 0 disables the cutoff.
    ///
    /// Default: `0`.
    pub alpha_cutoff: u8,
    /// Removes the alpha channel from error accumulation. Alpha is still
    /// encoded; it just does not compete with color precision during
    /// fitting.
    ///
    /// Default: `false`.
    pub exclude_alpha_from_color_error: bool,
}

impl Default for CompressOptions {
    fn default() -> Self {
        Self {
            quality: Quality::Normal,
            metric: ErrorMetric::Uniform,
            weight_by_alpha: false,
            alpha_cutoff: 0,
            exclude_alpha_from_color_error: false,
        }
    }
}

impl CompressOptions {
    /// The metric as a weight vector. `alpha` selects whether the alpha
    /// lane participates at all.
    pub(crate) fn metric_vec(&self, alpha: bool) -> Vec4 {
        let mut metric = match self.metric {
            ErrorMetric::Uniform => Vec4::ONE,
            ErrorMetric::Perceptual => Vec4::new(0.2126, 0.7152, 0.0722, 1.0),
        };
        if !alpha || self.exclude_alpha_from_color_error {
            metric.w = 0.0;
        }
        metric
    }
}

/// The fitting weight of every pixel of a block.
///
/// Weighting by alpha slightly biases each weight upwards so fully
/// transparent pixels keep a small influence instead of vanishing.
pub(crate) fn pixel_weights(pixels: &[[u8; 4]; 16], weight_by_alpha: bool) -> [f32; 16] {
    if weight_by_alpha {
        pixels.map(|pixel| (pixel[3] as f32 + 1.0) / 256.0)
    } else {
        [1.0; 16]
    }
}

/// Weighted squared distance between two colors under a metric.
#[inline]
pub(crate) fn metric_distance(metric: Vec4, a: Vec4, b: Vec4) -> f32 {
    let diff = metric * (a - b);
    diff.dot(diff)
}

/// One candidate encoding produced by a fit: quantized endpoints, a palette
/// slot per point of the set, and the weighted error of the assignment.
#[derive(Debug, Clone)]
pub(crate) struct FitCandidate {
    pub pair: crate::quantize::QuantizedPair,
    pub slots: [u8; 16],
    pub error: f32,
}

/// Assigns every point of the set to its nearest palette entry.
///
/// Returns the per-point palette slots and the total weighted error.
pub(crate) fn best_slots(set: &ColorSet, palette: &[Vec4], metric: Vec4) -> ([u8; 16], f32) {
    let mut slots = [0_u8; 16];
    let mut total_error = 0.0;
    for (i, (&point, &weight)) in set.points().iter().zip(set.weights()).enumerate() {
        let mut best = 0_u8;
        let mut best_error = metric_distance(metric, point, palette[0]);
        for (slot, &entry) in palette.iter().enumerate().skip(1) {
            let error = metric_distance(metric, point, entry);
            if error < best_error {
                best = slot as u8;
                best_error = error;
            }
        }
        slots[i] = best;
        total_error += weight * best_error;
    }
    (slots, total_error)
}

#[derive(Debug, Clone)]
pub(crate) struct RefineOptions {
    /// The initial step size.
    pub step_initial: f32,
    /// The step size is multiplied by this value after each pass.
    pub step_decay: f32,
    /// Refinement stops once the step size falls below this value.
    pub step_min: f32,
    /// The maximum number of passes.
    pub max_iter: u32,
}

impl RefineOptions {
    pub fn endpoint_search(extent: f32) -> Self {
        Self {
            step_initial: 0.25 * extent.max(1.0 / 255.0),
            step_decay: 0.5,
            step_min: 1.0 / 255.0 / 2.0,
            max_iter: 6,
        }
    }
}

/// Iteratively nudges a pair of endpoints along the channel axes, keeping
/// any move that lowers the error reported by `compute_error`.
pub(crate) fn refine_endpoints(
    start: (Vec4, Vec4),
    options: &RefineOptions,
    mut compute_error: impl FnMut((Vec4, Vec4)) -> f32,
) -> (Vec4, Vec4) {
    let mut best = start;
    let mut step = options.step_initial;
    if step <= options.step_min {
        return best;
    }

    let mut error = compute_error(best);
    let mut iters = 0;
    while step > options.step_min && iters < options.max_iter {
        for axis in 0..4 {
            for delta in [step, -step] {
                let mut offset = Vec4::ZERO;
                offset[axis] = delta;

                for candidate in [
                    ((best.0 + offset).clamp(Vec4::ZERO, Vec4::ONE), best.1),
                    (best.0, (best.1 + offset).clamp(Vec4::ZERO, Vec4::ONE)),
                ] {
                    let new_error = compute_error(candidate);
                    if new_error < error {
                        error = new_error;
                        best = candidate;
                    }
                }
            }
        }
        step *= options.step_decay;
        iters += 1;
    }

    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::colorset::ChannelMask;

    #[test]
    fn best_slots_picks_nearest_entries() {
        let pixels = [
            [0, 0, 0, 255],
            [255, 255, 255, 255],
            [90, 90, 90, 255],
            [170, 170, 170, 255],
            [0, 0, 0, 255],
            [0, 0, 0, 255],
            [0, 0, 0, 255],
            [0, 0, 0, 255],
            [0, 0, 0, 255],
            [0, 0, 0, 255],
            [0, 0, 0, 255],
            [0, 0, 0, 255],
            [0, 0, 0, 255],
            [0, 0, 0, 255],
            [0, 0, 0, 255],
            [0, 0, 0, 255],
        ];
        let set = ColorSet::new(&pixels, u16::MAX, ChannelMask::RGB, &[1.0; 16], 0);
        let palette = [
            Vec4::ZERO,
            Vec4::new(1.0 / 3.0, 1.0 / 3.0, 1.0 / 3.0, 0.0),
            Vec4::new(2.0 / 3.0, 2.0 / 3.0, 2.0 / 3.0, 0.0),
            Vec4::new(1.0, 1.0, 1.0, 0.0),
        ];
        let (slots, error) = best_slots(&set, &palette, Vec4::new(1.0, 1.0, 1.0, 0.0));
        assert_eq!(&slots[..set.count()], &[0, 3, 1, 2]);
        assert!(error < 0.1);
    }

    #[test]
    fn refinement_never_regresses() {
        let target = Vec4::new(0.3, 0.6, 0.1, 0.0);
        let seed = (Vec4::ZERO, Vec4::ONE);
        let eval = |(a, b): (Vec4, Vec4)| {
            metric_distance(Vec4::ONE, a, target) + metric_distance(Vec4::ONE, b, target)
        };
        let initial = eval(seed);
        let refined = refine_endpoints(seed, &RefineOptions::endpoint_search(1.0), eval);
        assert!(eval(refined) <= initial);
    }
}
