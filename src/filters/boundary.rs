//! Boundary treatments applied before the periodic Fourier transform.
//!
//! A discrete Fourier transform treats the field as one period of an infinite periodic signal,
//! so any mismatch between opposite edges shows up as spurious high frequencies. The treatments
//! here embed the field in a larger one whose edges connect smoothly. The original data always
//! end up unchanged in the rectangle starting at `(left, top)` of the extended field.

use crate::config::{BoundaryTreatment, ExtensionSettings};
use crate::data_container::DataField;
use crate::error::SplitError;
use crate::extend::{extend, Borders, Exterior};
use crate::math_tools::find_nice_size;
use cancellable_loops::par_for_each_cancellable;
use ndarray::parallel::prelude::*;
use ndarray::{s, Array1, ArrayView1, ArrayViewMut1, Axis};
use std::borrow::Cow;
use std::sync::atomic::AtomicBool;

/// A field prepared for the Fourier transform together with the position of the original data.
#[derive(Debug, Clone)]
pub struct Extension<'a> {
    pub field: Cow<'a, DataField>,
    pub left: usize,
    pub top: usize,
}

/// Extends `field` according to `boundary`.
///
/// `BoundaryTreatment::None` borrows the field without copying. The abort flag is only checked by
/// the treatments that do a noticeable amount of work.
///
/// # Returns
/// The extended field, or `SplitError::Aborted` when the abort flag was set.
pub fn extend_for_fft<'a>(
    field: &'a DataField,
    boundary: BoundaryTreatment,
    settings: &ExtensionSettings,
    abort_flag: &AtomicBool,
) -> Result<Extension<'a>, SplitError> {
    let (xres, yres) = (field.xres(), field.yres());
    match boundary {
        BoundaryTreatment::None => Ok(Extension {
            field: Cow::Borrowed(field),
            left: 0,
            top: 0,
        }),
        BoundaryTreatment::Laplace => {
            let extxres = find_nice_size((5 * xres).div_ceil(3));
            let extyres = find_nice_size((5 * yres).div_ceil(3));
            let left = (extxres - xres) / 2;
            let top = (extyres - yres) / 2;
            let borders = Borders {
                left,
                right: extxres - xres - left,
                top,
                bottom: extyres - yres - top,
            };
            let extended = extend(field, borders, &Exterior::Laplace(settings.laplace), abort_flag)?;
            Ok(Extension {
                field: Cow::Owned(extended),
                left,
                top,
            })
        }
        BoundaryTreatment::SmoothConnect => Ok(Extension {
            field: Cow::Owned(extend_smooth_connect(field, settings.smear, abort_flag)?),
            left: 0,
            top: 0,
        }),
        BoundaryTreatment::Mirror => {
            let borders = Borders {
                right: xres,
                bottom: yres,
                ..Default::default()
            };
            Ok(Extension {
                field: Cow::Owned(extend(field, borders, &Exterior::MirrorExtend, abort_flag)?),
                left: 0,
                top: 0,
            })
        }
    }
}

/// Extends a row of length `n` to the length of `extrow` so that the result is close to periodic.
///
/// The continuation blends a linear extrapolation of both ends over the `smear` window with the
/// row read backwards from each end, weighted by quadratic tapers. Requires `n >= 3` and
/// `extrow.len() < 3n`.
fn extend_one_row(row: ArrayView1<f64>, mut extrow: ArrayViewMut1<f64>, smear: usize) {
    let n = row.len();
    let k = extrow.len() - n;
    let smear_len = smear as f64;
    let span = (k.max(2) - 1) as f64;

    extrow.slice_mut(s![..n]).assign(&row);
    let der0 = (2.0 * row[n - 1] - row[n - 2] - row[n - 3]) / 3.0;
    let der1 = (2.0 * row[0] - row[1] - row[2]) / 3.0;

    for i in 0..k {
        let back = k - 1 - i;
        let mut y = 0.0;
        let mut w = 0.0;
        if i < smear {
            let ww = 2.0 * (smear - 1 - i) as f64 / smear_len;
            y += ww * (row[n - 1] + der0 * (i + 1) as f64);
            w += ww;
        }
        if back < smear {
            let ww = 2.0 * (smear - 1 - back) as f64 / smear_len;
            y += ww * (row[0] + der1 * (k - i) as f64);
            w += ww;
        }
        if i < n {
            let x = 1.0 - i as f64 / span;
            y += x * x * row[n - 1 - i];
            w += x * x;
        }
        if back < n {
            let x = 1.0 - back as f64 / span;
            y += x * x * row[back];
            w += x * x;
        }
        extrow[n + i] = y / w;
    }
}

/// Extends the field to the right and bottom so that it connects smoothly to itself.
///
/// Rows are extended first, then all columns of the result including the new ones. The corner
/// area is reached by both passes and takes the average of the column-wise value and a second
/// row-wise extension.
fn extend_smooth_connect(
    field: &DataField,
    smear: usize,
    abort_flag: &AtomicBool,
) -> Result<DataField, SplitError> {
    let (xres, yres) = (field.xres(), field.yres());
    let extxres = find_nice_size((4 * xres).div_ceil(3));
    let extyres = find_nice_size((4 * yres).div_ceil(3));

    if xres < 3 || yres < 3 || extxres >= 3 * xres || extyres >= 3 * yres {
        log::warn!(
            "smooth connection of a {}x{} field to {}x{} is not possible, extending by the mean value",
            xres,
            yres,
            extxres,
            extyres
        );
        let borders = Borders {
            right: extxres - xres,
            bottom: extyres - yres,
            ..Default::default()
        };
        return extend(field, borders, &Exterior::FixedValue(field.avg()), abort_flag);
    }

    let mut extended = field.new_resized_alike(extxres, extyres);

    par_for_each_cancellable(
        extended
            .data
            .slice_mut(s![..yres, ..])
            .axis_iter_mut(Axis(0))
            .into_par_iter()
            .zip(field.data.axis_iter(Axis(0)).into_par_iter()),
        abort_flag,
        |(extrow, row)| extend_one_row(row, extrow, smear),
    )?;

    par_for_each_cancellable(
        extended.data.axis_iter_mut(Axis(1)),
        abort_flag,
        |mut column| {
            let known = column.slice(s![..yres]).to_owned();
            extend_one_row(known.view(), column.view_mut(), smear);
        },
    )?;

    par_for_each_cancellable(
        extended.data.slice_mut(s![yres.., ..]).axis_iter_mut(Axis(0)),
        abort_flag,
        |mut extrow| {
            let mut rowwise = Array1::zeros(extxres);
            extend_one_row(extrow.slice(s![..xres]), rowwise.view_mut(), smear);
            for j in xres..extxres {
                extrow[j] = 0.5 * (extrow[j] + rowwise[j]);
            }
        },
    )?;

    Ok(extended)
}
