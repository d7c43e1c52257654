//! Weighted covariance and principal-axis extraction for small point clouds.
//!
//! The eigensolver follows the closed-form characteristic-cubic approach for
//! symmetric 3x3 matrices. Only the color channels enter the covariance; the
//! alpha lane of the input points is ignored.

use glam::{Vec3A, Vec4, Vec4Swizzles};

/// A symmetric 3x3 matrix stored as its upper triangle
/// `[xx, xy, xz, yy, yz, zz]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Sym3x3(pub [f32; 6]);

impl Sym3x3 {
    const ZERO: Self = Sym3x3([0.0; 6]);
}

/// Computes the weighted covariance matrix of the color channels of `points`.
///
/// Entries with zero weight contribute nothing. Returns the zero matrix for
/// an empty or fully unweighted set.
pub(crate) fn weighted_covariance(points: &[Vec4], weights: &[f32]) -> Sym3x3 {
    debug_assert_eq!(points.len(), weights.len());

    let mut total = 0.0;
    let mut centroid = Vec3A::ZERO;
    for (point, &weight) in points.iter().zip(weights) {
        total += weight;
        centroid += weight * Vec3A::from(point.xyz());
    }
    if total > 0.0 {
        centroid /= total;
    }

    let mut covariance = Sym3x3::ZERO;
    for (point, &weight) in points.iter().zip(weights) {
        let a = Vec3A::from(point.xyz()) - centroid;
        let b = weight * a;

        covariance.0[0] += a.x * b.x;
        covariance.0[1] += a.x * b.y;
        covariance.0[2] += a.x * b.z;
        covariance.0[3] += a.y * b.y;
        covariance.0[4] += a.y * b.z;
        covariance.0[5] += a.z * b.z;
    }
    covariance
}

/// Returns an (unnormalized) eigenvector for the eigenvalue of largest
/// magnitude.
///
/// A non-zero multiple of the identity yields `(1, 1, 1)`. The zero matrix
/// falls through the repeated-root path and yields the zero vector, so
/// callers needing a direction must check for it.
pub(crate) fn principal_component(smatrix: Sym3x3) -> Vec3A {
    let m = smatrix.0;

    // characteristic cubic: -l^3 + c2*l^2 - c1*l + c0
    let c0 = m[0] * m[3] * m[5] + 2.0 * m[1] * m[2] * m[4]
        - m[0] * m[4] * m[4]
        - m[3] * m[2] * m[2]
        - m[5] * m[1] * m[1];
    let c1 = m[0] * m[3] + m[0] * m[5] + m[3] * m[5]
        - m[1] * m[1]
        - m[2] * m[2]
        - m[4] * m[4];
    let c2 = m[0] + m[3] + m[5];

    // depressed cubic: l^3 + a*l + b
    let a = c1 - (1.0 / 3.0) * c2 * c2;
    let b = (-2.0 / 27.0) * c2 * c2 * c2 + (1.0 / 3.0) * c1 * c2 - c0;

    let q = 0.25 * b * b + (1.0 / 27.0) * a * a * a;

    if q > f32::EPSILON {
        // one real root: the matrix is a multiple of the identity
        Vec3A::ONE
    } else if q < -f32::EPSILON {
        // three distinct roots
        let theta = f32::atan2((-q).sqrt(), -0.5 * b);
        let rho = (0.25 * b * b - q).sqrt();

        let rt = rho.cbrt();
        let ct = (theta / 3.0).cos();
        let st = (theta / 3.0).sin();

        let mut l1 = (1.0 / 3.0) * c2 + 2.0 * rt * ct;
        let l2 = (1.0 / 3.0) * c2 - rt * (ct + 3.0_f32.sqrt() * st);
        let l3 = (1.0 / 3.0) * c2 - rt * (ct - 3.0_f32.sqrt() * st);

        if l2.abs() > l1.abs() {
            l1 = l2;
        }
        if l3.abs() > l1.abs() {
            l1 = l3;
        }

        multiplicity_1_evector(smatrix, l1)
    } else {
        // |q| within tolerance always means a double root here; a true
        // triple root is just the identity-multiple case again
        let rt = if b < 0.0 {
            -(-0.5 * b).cbrt()
        } else {
            (0.5 * b).cbrt()
        };

        let l1 = (1.0 / 3.0) * c2 + rt; // repeated
        let l2 = (1.0 / 3.0) * c2 - 2.0 * rt;

        if l1.abs() > l2.abs() {
            multiplicity_2_evector(smatrix, l1)
        } else {
            multiplicity_1_evector(smatrix, l2)
        }
    }
}

/// Eigenvector for a simple eigenvalue, via the adjugate of `M - l*I`.
///
/// The column holding the largest-magnitude entry is selected to avoid
/// catastrophic cancellation in near-singular columns.
fn multiplicity_1_evector(smatrix: Sym3x3, evalue: f32) -> Vec3A {
    let s = smatrix.0;
    let m = [
        s[0] - evalue,
        s[1],
        s[2],
        s[3] - evalue,
        s[4],
        s[5] - evalue,
    ];

    let u = [
        m[3] * m[5] - m[4] * m[4],
        m[2] * m[4] - m[1] * m[5],
        m[1] * m[4] - m[2] * m[3],
        m[0] * m[5] - m[2] * m[2],
        m[1] * m[2] - m[4] * m[0],
        m[0] * m[3] - m[1] * m[1],
    ];

    let mut mc = u[0].abs();
    let mut mi = 0;
    for (i, &value) in u.iter().enumerate().skip(1) {
        let c = value.abs();
        if c > mc {
            mc = c;
            mi = i;
        }
    }

    match mi {
        0 => Vec3A::new(u[0], u[1], u[2]),
        1 | 3 => Vec3A::new(u[1], u[3], u[4]),
        _ => Vec3A::new(u[2], u[4], u[5]),
    }
}

/// Eigenvector for a double eigenvalue, picked orthogonal to the largest row
/// of `M - l*I`.
fn multiplicity_2_evector(smatrix: Sym3x3, evalue: f32) -> Vec3A {
    let s = smatrix.0;
    let m = [
        s[0] - evalue,
        s[1],
        s[2],
        s[3] - evalue,
        s[4],
        s[5] - evalue,
    ];

    let mut mc = m[0].abs();
    let mut mi = 0;
    for (i, &value) in m.iter().enumerate().skip(1) {
        let c = value.abs();
        if c > mc {
            mc = c;
            mi = i;
        }
    }

    match mi {
        0 | 1 => Vec3A::new(-m[1], m[0], 0.0),
        2 => Vec3A::new(m[2], 0.0, -m[0]),
        3 | 4 => Vec3A::new(0.0, -m[4], m[3]),
        _ => Vec3A::new(0.0, -m[5], m[4]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn covariance_of(points: &[Vec4]) -> Sym3x3 {
        let weights = vec![1.0; points.len()];
        weighted_covariance(points, &weights)
    }

    #[test]
    fn covariance_of_identical_points_is_zero() {
        let points = [Vec4::new(0.5, 0.25, 0.75, 1.0); 4];
        let cov = covariance_of(&points);
        assert_eq!(cov.0, [0.0; 6]);
    }

    #[test]
    fn principal_component_of_axis_aligned_spread() {
        // points spread only along green
        let points = [
            Vec4::new(0.5, 0.0, 0.5, 1.0),
            Vec4::new(0.5, 1.0, 0.5, 1.0),
            Vec4::new(0.5, 0.25, 0.5, 1.0),
            Vec4::new(0.5, 0.75, 0.5, 1.0),
        ];
        let axis = principal_component(covariance_of(&points)).normalize();
        assert!(axis.x.abs() < 1e-4);
        assert!(axis.y.abs() > 0.999);
        assert!(axis.z.abs() < 1e-4);
    }

    #[test]
    fn principal_component_of_diagonal_line() {
        let points: Vec<Vec4> = (0..8)
            .map(|i| {
                let t = i as f32 / 7.0;
                Vec4::new(t, t, t, 1.0)
            })
            .collect();
        let axis = principal_component(covariance_of(&points)).normalize();
        let expected = Vec3A::ONE.normalize();
        assert!(axis.dot(expected).abs() > 0.999);
    }

    #[test]
    fn zero_matrix_yields_the_zero_vector() {
        // every adjugate column vanishes, leaving no direction to pick;
        // callers fall back to a fixed axis on this output
        let axis = principal_component(Sym3x3::ZERO);
        assert_eq!(axis, Vec3A::ZERO);
    }

    #[test]
    fn weights_shift_the_axis() {
        // heavily weighted red spread vs. a light green outlier
        let points = [
            Vec4::new(0.0, 0.0, 0.0, 1.0),
            Vec4::new(1.0, 0.0, 0.0, 1.0),
            Vec4::new(0.5, 1.0, 0.0, 1.0),
        ];
        let weights = [8.0, 8.0, 0.25];
        let axis = principal_component(weighted_covariance(&points, &weights)).normalize();
        assert!(axis.x.abs() > 0.9);
    }
}
