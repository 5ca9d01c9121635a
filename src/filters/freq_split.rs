//! This module implements the frequency split, which separates a data field into a low-pass and
//! a high-pass component in the frequency domain.
//!
//! The field is extended according to the boundary treatment, transformed once and the spectrum
//! is kept, so that changing only the cut-off or the edge width does not repeat the forward
//! transform. The high-pass component is the inverse transform of the weighted spectrum cropped
//! back to the original area, the low-pass component is the remainder `source - high_pass`.

use crate::config::{BoundaryTreatment, ExtensionSettings, OutputType, SplitParams};
use crate::data_container::DataField;
use crate::error::SplitError;
use crate::fft::{FftTransform, Transform2d};
use crate::filters::boundary::extend_for_fft;
use crate::filters::radial::filter_frequencies;
use ndarray::{s, Array2, Zip};
use num_complex::Complex64;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Instant;

/// The two components of a frequency split.
///
/// Both fields have the dimensions, offsets and units of the source and add up to it.
#[derive(Debug, Clone, PartialEq)]
pub struct SplitResult {
    pub low_pass: DataField,
    pub high_pass: DataField,
}

impl SplitResult {
    /// Returns the components selected by `output` together with their titles.
    pub fn outputs(&self, output: OutputType) -> Vec<(&'static str, &DataField)> {
        let mut outputs = Vec::with_capacity(2);
        if output.low_pass() {
            outputs.push(("Low-pass", &self.low_pass));
        }
        if output.high_pass() {
            outputs.push(("High-pass", &self.high_pass));
        }
        outputs
    }
}

/// Spectrum of the extended field and the position of the source inside it.
#[derive(Debug)]
struct CachedTransform {
    boundary: BoundaryTreatment,
    extension: ExtensionSettings,
    spectrum: Array2<Complex64>,
    left: usize,
    top: usize,
}

impl CachedTransform {
    /// Whether the spectrum is valid for `params`. Only the extension settings the cached
    /// boundary treatment actually reads are compared.
    fn matches(&self, params: &SplitParams) -> bool {
        if self.boundary != params.boundary {
            return false;
        }
        match self.boundary {
            BoundaryTreatment::None | BoundaryTreatment::Mirror => true,
            BoundaryTreatment::Laplace => self.extension.laplace == params.extension.laplace,
            BoundaryTreatment::SmoothConnect => self.extension.smear == params.extension.smear,
        }
    }
}

fn set_progress(progress_lock: &Arc<RwLock<Option<f32>>>, value: Option<f32>) {
    if let Ok(mut progress) = progress_lock.write() {
        *progress = value;
    }
}

fn check_abort(abort_flag: &AtomicBool) -> Result<(), SplitError> {
    if abort_flag.load(Ordering::Relaxed) {
        return Err(SplitError::Aborted);
    }
    Ok(())
}

fn check_shape(expected: (usize, usize), got: (usize, usize)) -> Result<(), SplitError> {
    if expected != got {
        return Err(SplitError::ShapeMismatch { expected, got });
    }
    Ok(())
}

/// Frequency split of one data field.
///
/// The spectrum of the extended field is computed on the first call of [`compute`] and reused
/// as long as the boundary treatment and the extension settings stay the same. Replacing the
/// field discards it.
///
/// [`compute`]: FrequencySplit::compute
pub struct FrequencySplit<T: Transform2d = FftTransform> {
    field: DataField,
    transform: T,
    cache: Option<CachedTransform>,
}

impl FrequencySplit<FftTransform> {
    pub fn new(field: DataField) -> Self {
        FrequencySplit::with_transform(field, FftTransform::new())
    }
}

impl<T: Transform2d> FrequencySplit<T> {
    /// Creates a frequency split using the given Fourier transform.
    pub fn with_transform(field: DataField, transform: T) -> Self {
        FrequencySplit {
            field,
            transform,
            cache: None,
        }
    }

    pub fn field(&self) -> &DataField {
        &self.field
    }

    pub fn transform(&self) -> &T {
        &self.transform
    }

    /// Replaces the source field and discards the cached spectrum.
    pub fn set_field(&mut self, field: DataField) {
        self.field = field;
        self.invalidate();
    }

    pub fn invalidate(&mut self) {
        if self.cache.take().is_some() {
            log::debug!("discarding cached spectrum");
        }
    }

    pub fn is_cached(&self) -> bool {
        self.cache.is_some()
    }

    /// Splits the field into low-pass and high-pass components.
    ///
    /// The parameters are expected to be validated with [`SplitParams::validate`].
    pub fn compute(&mut self, params: &SplitParams) -> Result<SplitResult, SplitError> {
        let progress_lock = Arc::new(RwLock::new(None));
        let abort_flag = Arc::new(AtomicBool::new(false));
        self.compute_cancellable(params, &progress_lock, &abort_flag)
    }

    /// Splits the field, reporting progress and honouring an abort flag.
    ///
    /// # Arguments
    /// - `params`: Validated split parameters.
    /// - `progress_lock`: Receives the progress in `[0, 1]` while running and `None` when done.
    /// - `abort_flag`: Checked between the steps and inside the boundary extension.
    ///
    /// # Returns
    /// The split, or an error. On error the cached spectrum is left as it was before the call.
    pub fn compute_cancellable(
        &mut self,
        params: &SplitParams,
        progress_lock: &Arc<RwLock<Option<f32>>>,
        abort_flag: &Arc<AtomicBool>,
    ) -> Result<SplitResult, SplitError> {
        set_progress(progress_lock, Some(0.0));
        let result = self.run(params, progress_lock, abort_flag);
        set_progress(progress_lock, None);
        result
    }

    fn run(
        &mut self,
        params: &SplitParams,
        progress_lock: &Arc<RwLock<Option<f32>>>,
        abort_flag: &AtomicBool,
    ) -> Result<SplitResult, SplitError> {
        if let Some(cached) = self.cache.as_ref().filter(|cached| cached.matches(params)) {
            log::debug!("reusing cached spectrum ({})", cached.boundary);
            return self.split(cached, params, progress_lock, abort_flag);
        }

        let cached = self.extend_and_transform(params, progress_lock, abort_flag)?;
        let result = self.split(&cached, params, progress_lock, abort_flag)?;
        self.cache = Some(cached);
        Ok(result)
    }

    fn extend_and_transform(
        &self,
        params: &SplitParams,
        progress_lock: &Arc<RwLock<Option<f32>>>,
        abort_flag: &AtomicBool,
    ) -> Result<CachedTransform, SplitError> {
        let start = Instant::now();
        let extension = extend_for_fft(&self.field, params.boundary, &params.extension, abort_flag)?;
        log::debug!(
            "boundary treatment {} took {:?}",
            params.boundary,
            start.elapsed()
        );
        check_abort(abort_flag)?;
        set_progress(progress_lock, Some(0.3));

        let start = Instant::now();
        let extended = &extension.field;
        let spectrum = self.transform.forward(extended.data.view())?;
        check_shape(extended.data.dim(), spectrum.dim())?;
        log::info!(
            "computed spectrum of the {}x{} extended field ({})",
            extended.xres(),
            extended.yres(),
            params.boundary
        );
        log::debug!("forward transform took {:?}", start.elapsed());
        set_progress(progress_lock, Some(0.5));

        Ok(CachedTransform {
            boundary: params.boundary,
            extension: params.extension,
            spectrum,
            left: extension.left,
            top: extension.top,
        })
    }

    fn split(
        &self,
        cached: &CachedTransform,
        params: &SplitParams,
        progress_lock: &Arc<RwLock<Option<f32>>>,
        abort_flag: &AtomicBool,
    ) -> Result<SplitResult, SplitError> {
        check_abort(abort_flag)?;
        let start = Instant::now();
        let mut filtered = cached.spectrum.clone();
        filter_frequencies(&mut filtered, params.cutoff, params.width);
        set_progress(progress_lock, Some(0.6));

        check_abort(abort_flag)?;
        let back = self.transform.inverse(filtered.view())?;
        check_shape(cached.spectrum.dim(), back.dim())?;
        set_progress(progress_lock, Some(0.9));

        let (xres, yres) = (self.field.xres(), self.field.yres());
        let (left, top) = (cached.left, cached.top);
        let mut high_pass = self.field.new_alike();
        Zip::from(&mut high_pass.data)
            .and(&back.slice(s![top..top + yres, left..left + xres]))
            .par_for_each(|h, c| *h = c.re);
        let low_pass = DataField::subtract_fields(&self.field, &high_pass)?;
        log::debug!(
            "split at cut-off {} width {} took {:?}",
            params.cutoff,
            params.width,
            start.elapsed()
        );
        set_progress(progress_lock, Some(1.0));

        Ok(SplitResult {
            low_pass,
            high_pass,
        })
    }
}
