//! Two-dimensional Fourier transforms of data fields.
//!
//! The frequency split only needs a forward transform of a real field and an inverse transform
//! of a complex spectrum. Both are behind the [`Transform2d`] trait, [`FftTransform`] implements
//! them with `realfft` and `rustfft`.

use crate::error::SplitError;
use ndarray::{Array2, ArrayView2, Axis};
use num_complex::Complex64;
use num_traits::Zero;
use rayon::prelude::*;
use realfft::RealFftPlanner;
use rustfft::{Fft, FftPlanner};
use std::sync::{Arc, Mutex};

/// A unitary two-dimensional discrete Fourier transform.
///
/// Both directions are scaled by `1/sqrt(xres * yres)`, so `inverse(forward(x))` reproduces `x`
/// up to rounding. Spectra are not shifted: index `(0, 0)` holds the zero frequency.
pub trait Transform2d: Send + Sync {
    /// Transforms a real `(yres, xres)` array into its full complex spectrum of the same shape.
    fn forward(&self, data: ArrayView2<f64>) -> Result<Array2<Complex64>, SplitError>;

    /// Transforms a complex spectrum back to the spatial domain.
    fn inverse(&self, spectrum: ArrayView2<Complex64>) -> Result<Array2<Complex64>, SplitError>;
}

/// FFT based implementation of [`Transform2d`].
///
/// Plans are cached by the planners, so repeated transforms of the same size only pay for the
/// planning once.
pub struct FftTransform {
    planner: Mutex<FftPlanner<f64>>,
    real_planner: Mutex<RealFftPlanner<f64>>,
}

impl Default for FftTransform {
    fn default() -> Self {
        FftTransform::new()
    }
}

impl FftTransform {
    pub fn new() -> Self {
        FftTransform {
            planner: Mutex::new(FftPlanner::new()),
            real_planner: Mutex::new(RealFftPlanner::new()),
        }
    }

    fn plan(&self, len: usize, forward: bool) -> Result<Arc<dyn Fft<f64>>, SplitError> {
        let mut planner = self
            .planner
            .lock()
            .map_err(|_| SplitError::PlannerPoisoned)?;
        Ok(if forward {
            planner.plan_fft_forward(len)
        } else {
            planner.plan_fft_inverse(len)
        })
    }
}

/// Transforms every lane of `data` that runs perpendicular to `iter_axis` in place.
fn transform_lanes(data: &mut Array2<Complex64>, iter_axis: Axis, fft: &Arc<dyn Fft<f64>>) {
    let scratch_len = fft.get_inplace_scratch_len();
    data.axis_iter_mut(iter_axis).into_par_iter().for_each_init(
        || (Vec::<Complex64>::new(), vec![Complex64::zero(); scratch_len]),
        |(buffer, scratch), mut lane| {
            buffer.clear();
            buffer.extend(lane.iter().copied());
            fft.process_with_scratch(buffer, scratch);
            for (v, &b) in lane.iter_mut().zip(buffer.iter()) {
                *v = b;
            }
        },
    );
}

fn normalize(data: &mut Array2<Complex64>) {
    let scale = 1.0 / (data.len() as f64).sqrt();
    data.par_mapv_inplace(|v| v * scale);
}

impl Transform2d for FftTransform {
    fn forward(&self, data: ArrayView2<f64>) -> Result<Array2<Complex64>, SplitError> {
        let (yres, xres) = data.dim();
        let r2c = self
            .real_planner
            .lock()
            .map_err(|_| SplitError::PlannerPoisoned)?
            .plan_fft_forward(xres);
        let fft_col = self.plan(yres, true)?;

        let mut spectrum = Array2::<Complex64>::zeros((yres, xres));
        spectrum
            .axis_iter_mut(Axis(0))
            .into_par_iter()
            .zip(data.axis_iter(Axis(0)).into_par_iter())
            .try_for_each(|(mut out, row)| -> Result<(), SplitError> {
                let mut input = row.to_vec();
                let mut half = r2c.make_output_vec();
                r2c.process(&mut input, &mut half)?;
                // the upper half of a real signal's spectrum is the conjugate mirror of the lower
                let n_half = half.len();
                for (j, v) in out.iter_mut().enumerate() {
                    *v = if j < n_half {
                        half[j]
                    } else {
                        half[xres - j].conj()
                    };
                }
                Ok(())
            })?;

        transform_lanes(&mut spectrum, Axis(1), &fft_col);
        normalize(&mut spectrum);
        Ok(spectrum)
    }

    fn inverse(&self, spectrum: ArrayView2<Complex64>) -> Result<Array2<Complex64>, SplitError> {
        let (yres, xres) = spectrum.dim();
        let ifft_row = self.plan(xres, false)?;
        let ifft_col = self.plan(yres, false)?;

        let mut data = spectrum.to_owned();
        transform_lanes(&mut data, Axis(0), &ifft_row);
        transform_lanes(&mut data, Axis(1), &ifft_col);
        normalize(&mut data);
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn test_data(yres: usize, xres: usize) -> Array2<f64> {
        Array2::from_shape_fn((yres, xres), |(i, j)| {
            (0.7 * i as f64).sin() + 0.3 * (j as f64) - ((i * j) % 5) as f64 * 0.25
        })
    }

    #[test]
    fn test_round_trip() {
        let fft = FftTransform::new();
        for (yres, xres) in [(8, 8), (5, 12), (9, 7), (1, 6), (4, 1)] {
            let data = test_data(yres, xres);
            let spectrum = fft.forward(data.view()).unwrap();
            assert_eq!(spectrum.dim(), (yres, xres));
            let back = fft.inverse(spectrum.view()).unwrap();
            for (a, b) in data.iter().zip(back.iter()) {
                assert_abs_diff_eq!(*a, b.re, epsilon = 1e-12);
                assert_abs_diff_eq!(b.im, 0.0, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_parseval() {
        let fft = FftTransform::new();
        let data = test_data(6, 10);
        let spectrum = fft.forward(data.view()).unwrap();
        let energy: f64 = data.iter().map(|v| v * v).sum();
        let spectral_energy: f64 = spectrum.iter().map(|c| c.norm_sqr()).sum();
        assert_abs_diff_eq!(energy, spectral_energy, epsilon = 1e-9);
    }

    #[test]
    fn test_zero_frequency_and_hermitian_symmetry() {
        let fft = FftTransform::new();
        let (yres, xres) = (6, 9);
        let data = test_data(yres, xres);
        let spectrum = fft.forward(data.view()).unwrap();

        let expected_dc = data.sum() / ((xres * yres) as f64).sqrt();
        assert_abs_diff_eq!(spectrum[(0, 0)].re, expected_dc, epsilon = 1e-12);
        assert_abs_diff_eq!(spectrum[(0, 0)].im, 0.0, epsilon = 1e-12);

        for i in 0..yres {
            for j in 0..xres {
                let mirrored = spectrum[((yres - i) % yres, (xres - j) % xres)].conj();
                assert_abs_diff_eq!(spectrum[(i, j)].re, mirrored.re, epsilon = 1e-12);
                assert_abs_diff_eq!(spectrum[(i, j)].im, mirrored.im, epsilon = 1e-12);
            }
        }
    }
}
