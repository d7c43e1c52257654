//! Least-squares endpoint search over ordered partitions.
//!
//! Points are sorted by their projection onto the principal axis. Every
//! contiguous partition of the sorted points into K clusters admits a
//! closed-form optimal endpoint pair: with interpolation weight `w_k` for
//! cluster k, writing `a_i = 1 - w_k(i)` and `b_i = w_k(i)`, the normal
//! equations reduce to a 2x2 system in the endpoint colors. Enumerating all
//! partitions and keeping the best quantized solution yields the optimal
//! contiguous clustering for the block.

use glam::{Vec3A, Vec4, Vec4Swizzles};

use crate::colorset::ColorSet;
use crate::encode::{metric_distance, FitCandidate};
use crate::math::{principal_component, weighted_covariance};
use crate::quantize::{QuantizedPair, Quantizer};

#[derive(Clone, Copy, Default)]
struct Sum {
    x: Vec4,
    w: f32,
}

impl Sum {
    fn add(self, other: Sum) -> Sum {
        Sum {
            x: self.x + other.x,
            w: self.w + other.w,
        }
    }
    fn sub(self, other: Sum) -> Sum {
        Sum {
            x: self.x - other.x,
            w: self.w - other.w,
        }
    }
}

pub(crate) struct ClusterFit<'a> {
    set: &'a ColorSet,
    metric: Vec4,
    /// Point indices in ascending projection order.
    order: [u8; 16],
    /// Per sorted position: the point scaled by its weight, and the weight.
    entries: [Sum; 16],
    total: Sum,
}

impl<'a> ClusterFit<'a> {
    pub fn new(set: &'a ColorSet, metric: Vec4) -> Self {
        debug_assert!(set.count() > 0);

        let covariance = weighted_covariance(set.points(), set.weights());
        let mut axis = principal_component(covariance);
        if axis.length_squared() < f32::EPSILON {
            axis = Vec3A::X;
        }

        let count = set.count();
        let mut projections = [0.0_f32; 16];
        for (i, &point) in set.points().iter().enumerate() {
            projections[i] = axis.dot(Vec3A::from(point.xyz()));
        }

        let mut order: [u8; 16] = std::array::from_fn(|i| i as u8);
        order[..count].sort_by(|&a, &b| {
            projections[a as usize]
                .partial_cmp(&projections[b as usize])
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.cmp(&b))
        });

        let mut entries = [Sum::default(); 16];
        let mut total = Sum::default();
        for (position, &point) in order[..count].iter().enumerate() {
            let weight = set.weights()[point as usize];
            let entry = Sum {
                x: set.points()[point as usize] * weight,
                w: weight,
            };
            entries[position] = entry;
            total = total.add(entry);
        }

        Self {
            set,
            metric,
            order,
            entries,
            total,
        }
    }

    /// Searches all partitions into three clusters with interpolation
    /// weights `{0, 1/2, 1}`.
    pub fn fit3(
        &self,
        quantizer: &Quantizer,
        palette_of: impl Fn(QuantizedPair) -> [Vec4; 3],
    ) -> Option<FitCandidate> {
        let n = self.set.count();
        let mut best: Option<(FitCandidate, f32)> = None;

        let mut part0 = Sum::default();
        for c0 in 0..=n {
            let mut part1 = Sum::default();
            for c1 in 0..=(n - c0) {
                let part2 = self.total.sub(part0).sub(part1);
                let parts = [part0, part1, part2];
                self.consider(
                    &parts,
                    &[0.0, 0.5, 1.0],
                    &[c0, c0 + c1],
                    quantizer,
                    &palette_of,
                    &mut best,
                );
                if c1 < n - c0 {
                    part1 = part1.add(self.entries[c0 + c1]);
                }
            }
            if c0 < n {
                part0 = part0.add(self.entries[c0]);
            }
        }

        best.map(|(candidate, _)| candidate)
    }

    /// Searches all partitions into four clusters. The two interior
    /// interpolation weights are format-specific.
    pub fn fit4(
        &self,
        interior: [f32; 2],
        quantizer: &Quantizer,
        palette_of: impl Fn(QuantizedPair) -> [Vec4; 4],
    ) -> Option<FitCandidate> {
        let n = self.set.count();
        let codebook = [0.0, interior[0], interior[1], 1.0];
        let mut best: Option<(FitCandidate, f32)> = None;

        let mut part0 = Sum::default();
        for c0 in 0..=n {
            let mut part1 = Sum::default();
            for c1 in 0..=(n - c0) {
                let mut part2 = Sum::default();
                for c2 in 0..=(n - c0 - c1) {
                    let part3 = self.total.sub(part0).sub(part1).sub(part2);
                    let parts = [part0, part1, part2, part3];
                    self.consider(
                        &parts,
                        &codebook,
                        &[c0, c0 + c1, c0 + c1 + c2],
                        quantizer,
                        &palette_of,
                        &mut best,
                    );
                    if c2 < n - c0 - c1 {
                        part2 = part2.add(self.entries[c0 + c1 + c2]);
                    }
                }
                if c1 < n - c0 {
                    part1 = part1.add(self.entries[c0 + c1]);
                }
            }
            if c0 < n {
                part0 = part0.add(self.entries[c0]);
            }
        }

        best.map(|(candidate, _)| candidate)
    }

    /// Solves one partition and folds it into the running best.
    fn consider<const K: usize>(
        &self,
        parts: &[Sum; K],
        codebook: &[f32; K],
        cuts: &[usize],
        quantizer: &Quantizer,
        palette_of: &impl Fn(QuantizedPair) -> [Vec4; K],
        best: &mut Option<(FitCandidate, f32)>,
    ) {
        // normal equations of the weighted least-squares problem
        let mut alpha2_sum = 0.0;
        let mut beta2_sum = 0.0;
        let mut alphabeta_sum = 0.0;
        let mut alphax_sum = Vec4::ZERO;
        let mut betax_sum = Vec4::ZERO;
        for (part, &w) in parts.iter().zip(codebook) {
            let alpha = 1.0 - w;
            alpha2_sum += alpha * alpha * part.w;
            beta2_sum += w * w * part.w;
            alphabeta_sum += alpha * w * part.w;
            alphax_sum += alpha * part.x;
            betax_sum += w * part.x;
        }

        let factor = alpha2_sum * beta2_sum - alphabeta_sum * alphabeta_sum;
        if factor.abs() <= f32::EPSILON {
            return;
        }

        let start = (alphax_sum * beta2_sum - betax_sum * alphabeta_sum) / factor;
        let end = (betax_sum * alpha2_sum - alphax_sum * alphabeta_sum) / factor;

        let pair = quantizer.quantize_pair(
            start.clamp(Vec4::ZERO, Vec4::ONE),
            end.clamp(Vec4::ZERO, Vec4::ONE),
        );
        let palette = palette_of(pair);

        // score the partition-implied assignment against the decoded palette
        let mut error = 0.0;
        let mut slots = [0_u8; 16];
        for position in 0..self.set.count() {
            let cluster = cuts.iter().filter(|&&cut| position >= cut).count();
            let point = self.order[position] as usize;
            slots[point] = cluster as u8;
            error += self.set.weights()[point]
                * metric_distance(self.metric, self.set.points()[point], palette[cluster]);
        }

        let magnitude = quantizer.lookup_lattice(pair.start).length_squared()
            + quantizer.lookup_lattice(pair.end).length_squared();
        let better = match best {
            None => true,
            Some((current, best_magnitude)) => {
                error < current.error
                    || (error == current.error
                        && (magnitude < *best_magnitude
                            || (magnitude == *best_magnitude
                                && pair.bit_pattern() < current.pair.bit_pattern())))
            }
        };
        if better {
            *best = Some((FitCandidate { pair, slots, error }, magnitude));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::colorblock;
    use crate::colorset::ChannelMask;

    fn fit(pixels: &[[u8; 4]; 16]) -> FitCandidate {
        let set = ColorSet::new(pixels, u16::MAX, ChannelMask::RGB, &[1.0; 16], 0);
        let metric = Vec4::new(1.0, 1.0, 1.0, 0.0);
        ClusterFit::new(&set, metric)
            .fit4(
                [1.0 / 3.0, 2.0 / 3.0],
                &Quantizer::bc1(),
                colorblock::fit_palette4,
            )
            .expect("multiple distinct colors must produce a candidate")
    }

    #[test]
    fn recovers_exact_two_color_split() {
        let mut pixels = [[0_u8; 4]; 16];
        for (i, pixel) in pixels.iter_mut().enumerate() {
            *pixel = if i % 2 == 0 {
                [0, 0, 0, 255]
            } else {
                [255, 255, 255, 255]
            };
        }
        let candidate = fit(&pixels);
        assert_eq!(candidate.error, 0.0);

        let start = colorblock::pack_565(candidate.pair.start);
        let end = colorblock::pack_565(candidate.pair.end);
        let mut packed = [start, end];
        packed.sort_unstable();
        assert_eq!(packed, [0x0000, 0xffff]);
    }

    #[test]
    fn four_grays_on_a_line_are_exact() {
        // chosen so every level is exactly representable: the decoded
        // palette of (0, 255) is {0, 85, 170, 255}
        let levels = [0_u8, 85, 170, 255];
        let mut pixels = [[0_u8; 4]; 16];
        for (i, pixel) in pixels.iter_mut().enumerate() {
            let v = levels[i / 4];
            *pixel = [v, v, v, 255];
        }
        let candidate = fit(&pixels);
        assert_eq!(candidate.error, 0.0);
    }

    #[test]
    fn single_color_has_no_partition_solution() {
        let pixels = [[128, 128, 128, 255]; 16];
        let set = ColorSet::new(&pixels, u16::MAX, ChannelMask::RGB, &[1.0; 16], 0);
        let metric = Vec4::new(1.0, 1.0, 1.0, 0.0);
        let candidate = ClusterFit::new(&set, metric).fit4(
            [1.0 / 3.0, 2.0 / 3.0],
            &Quantizer::bc1(),
            colorblock::fit_palette4,
        );
        assert!(candidate.is_none());
    }
}
