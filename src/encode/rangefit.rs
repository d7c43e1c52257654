//! Axis-aligned endpoint seeding.
//!
//! Projects the point set onto its principal axis and takes the extremes of
//! the projection as endpoint seeds. Fast, and the rank-1 fallback for point
//! sets the cluster optimizer cannot handle.

use glam::{Vec3A, Vec4, Vec4Swizzles};

use crate::colorset::ColorSet;
use crate::math::{principal_component, weighted_covariance};

/// Continuous endpoint seeds along the principal axis of the set, clamped
/// to the per-channel bounds of the block.
///
/// The alpha components are seeded from the alpha extremes, paired by the
/// sign of the correlation between the color projection and alpha so the
/// endpoints traverse the set in a consistent direction.
pub(crate) fn range_endpoints(set: &ColorSet) -> (Vec4, Vec4) {
    debug_assert!(set.count() > 0);

    let covariance = weighted_covariance(set.points(), set.weights());
    let mut axis = principal_component(covariance);
    if axis.length_squared() < f32::EPSILON {
        axis = Vec3A::X;
    } else {
        axis = axis.normalize();
    }

    let mut total = 0.0;
    let mut centroid = Vec3A::ZERO;
    let mut alpha_mean = 0.0;
    for (&point, &weight) in set.points().iter().zip(set.weights()) {
        total += weight;
        centroid += weight * Vec3A::from(point.xyz());
        alpha_mean += weight * point.w;
    }
    centroid /= total;
    alpha_mean /= total;

    let mut min_t = f32::INFINITY;
    let mut max_t = f32::NEG_INFINITY;
    let mut alpha_min = f32::INFINITY;
    let mut alpha_max = f32::NEG_INFINITY;
    let mut alpha_correlation = 0.0;
    for (&point, &weight) in set.points().iter().zip(set.weights()) {
        let t = axis.dot(Vec3A::from(point.xyz()) - centroid);
        min_t = min_t.min(t);
        max_t = max_t.max(t);
        alpha_min = alpha_min.min(point.w);
        alpha_max = alpha_max.max(point.w);
        alpha_correlation += weight * t * (point.w - alpha_mean);
    }

    let start_rgb = centroid + min_t * axis;
    let end_rgb = centroid + max_t * axis;
    let (start_alpha, end_alpha) = if alpha_correlation >= 0.0 {
        (alpha_min, alpha_max)
    } else {
        (alpha_max, alpha_min)
    };

    let start = Vec4::new(start_rgb.x, start_rgb.y, start_rgb.z, start_alpha);
    let end = Vec4::new(end_rgb.x, end_rgb.y, end_rgb.z, end_alpha);

    // projections can overshoot the observed extent
    let (min, max) = set.bounds();
    (start.clamp(min, max), end.clamp(min, max))
}
