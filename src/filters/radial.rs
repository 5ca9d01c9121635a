//! Radially symmetric high-pass weighting of an unshifted spectrum.

use crate::math_tools::erf;
use ndarray::{Array2, Zip};
use num_complex::Complex64;

/// Radial frequency of spectrum index `(i, j)` in a `(yres, xres)` spectrum.
///
/// Frequencies wrap around, so index `k` and `n - k` share the same magnitude. Each axis is
/// scaled to `[0, 1]` with 1 at the Nyquist frequency, so the spectrum corner lies at √2.
pub fn radial_frequency(i: usize, j: usize, xres: usize, yres: usize) -> f64 {
    let fx = 2.0 * j.min(xres - j) as f64 / xres as f64;
    let fy = 2.0 * i.min(yres - i) as f64 / yres as f64;
    (fx * fx + fy * fy).sqrt()
}

/// High-pass weight of radial frequency `f`.
///
/// With `width == 0` this is a step at `cutoff` that passes `f >= cutoff`, otherwise an error
/// function edge centred at `cutoff`.
pub fn pass_weight(f: f64, cutoff: f64, width: f64) -> f64 {
    if width > 0.0 {
        0.5 * (erf((f - cutoff) / width) + 1.0)
    } else if f >= cutoff {
        1.0
    } else {
        0.0
    }
}

/// Multiplies every coefficient of `spectrum` by its high-pass weight.
pub fn filter_frequencies(spectrum: &mut Array2<Complex64>, cutoff: f64, width: f64) {
    let (yres, xres) = spectrum.dim();
    Zip::indexed(spectrum).par_for_each(|(i, j), c| {
        let q = pass_weight(radial_frequency(i, j, xres, yres), cutoff, width);
        *c *= q;
    });
}
