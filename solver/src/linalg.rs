//! Dense kernels shared by the solvers and the forward model.
//!
//! Products are split by rows across the rayon pool, every output element is computed
//! by a single thread so the results don't depend on the scheduling. Reductions are
//! sequential and accumulate in `f64`.

use ndarray::{Zip, prelude::*};

/// Upper bound on the power iterations used to estimate the operator norm.
pub const POWER_ITERATIONS: usize = 16;

/// Relative change between two power iteration estimates considered converged.
pub const POWER_TOLERANCE: f64 = 1e-6;

/// Computes `out = a · x`.
///
/// # Arguments
/// * `a` - A row major matrix of shape `(m, n)`.
/// * `x` - A vector of length `n`.
/// * `out` - Where to write the resulting vector of length `m`.
///
/// # Panics
/// If the dimensions of the operands don't match.
pub fn mat_vec(a: ArrayView2<f32>, x: ArrayView1<f32>, mut out: ArrayViewMut1<f32>) {
    Zip::from(&mut out)
        .and(a.rows())
        .par_for_each(|o, row| *o = row.dot(&x));
}

/// The squared euclidean norm of `v`.
pub fn norm_sq(v: ArrayView1<f32>) -> f64 {
    v.iter().map(|&x| (x as f64) * (x as f64)).sum()
}

/// The euclidean norm of `v`.
pub fn norm(v: ArrayView1<f32>) -> f64 {
    norm_sq(v).sqrt()
}

/// Computes `y = y + alpha · x`.
///
/// # Arguments
/// * `alpha` - The scale of `x`.
/// * `x` - The vector to add.
/// * `y` - The vector to update in place.
pub fn axpy(alpha: f64, x: ArrayView1<f32>, mut y: ArrayViewMut1<f32>) {
    Zip::from(&mut y)
        .and(&x)
        .for_each(|y, &x| *y = (*y as f64 + alpha * x as f64) as f32);
}

/// Computes `p = z + beta · p`, the conjugate direction update.
///
/// # Arguments
/// * `z` - The new (preconditioned) gradient.
/// * `beta` - The conjugation coefficient.
/// * `p` - The previous search direction, updated in place.
pub fn conjugate(z: ArrayView1<f32>, beta: f64, mut p: ArrayViewMut1<f32>) {
    Zip::from(&mut p)
        .and(&z)
        .for_each(|p, &z| *p = (z as f64 + beta * *p as f64) as f32);
}

/// Estimates the operator 2-norm of `aᵗa`, that is, its largest eigenvalue, by power
/// iteration from a constant starting vector.
///
/// # Arguments
/// * `a` - A matrix of shape `(m, n)`.
/// * `at` - The transpose of `a`, of shape `(n, m)`.
///
/// # Returns
/// The estimated norm, `0` if `a` annihilates the iterate.
pub fn operator_norm(a: ArrayView2<f32>, at: ArrayView2<f32>) -> f64 {
    let (m, n) = a.dim();
    if m == 0 || n == 0 {
        return 0.;
    }

    let mut v = Array1::from_elem(n, (1. / (n as f64).sqrt()) as f32);
    let mut av = Array1::zeros(m);
    let mut w = Array1::zeros(n);
    let mut estimate = 0.;

    for _ in 0..POWER_ITERATIONS {
        mat_vec(a, v.view(), av.view_mut());
        mat_vec(at, av.view(), w.view_mut());

        let next = norm(w.view());
        if next == 0. || !next.is_finite() {
            return 0.;
        }

        v.zip_mut_with(&w, |v, &w| *v = (w as f64 / next) as f32);

        let converged = (next - estimate).abs() <= POWER_TOLERANCE * next;
        estimate = next;

        if converged {
            break;
        }
    }

    estimate
}
