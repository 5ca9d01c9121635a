//! Extension of data fields by borders of a chosen exterior type.

use crate::config::LaplaceSettings;
use crate::data_container::DataField;
use crate::error::SplitError;
use crate::laplace::laplace_fill;
use ndarray::{s, Array2, Zip};
use std::sync::atomic::AtomicBool;

/// Number of pixels added on each side of a field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Borders {
    pub left: usize,
    pub right: usize,
    pub top: usize,
    pub bottom: usize,
}

/// How the values outside the original field are obtained.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Exterior {
    /// Constant value.
    FixedValue(f64),
    /// Value of the nearest edge pixel.
    BorderExtend,
    /// Reflection at the edges, the edge pixels are repeated.
    MirrorExtend,
    /// Periodic repetition of the field.
    Periodic,
    /// Harmonic interpolation from the edges.
    Laplace(LaplaceSettings),
}

/// Maps an index along one axis of the extended field to an index of the source.
///
/// `k` is relative to the start of the source, so negative values lie in the leading border.
/// Returns `None` where the exterior type does not take values from the source.
fn source_index(k: isize, n: usize, exterior: &Exterior) -> Option<usize> {
    let n = n as isize;
    if (0..n).contains(&k) {
        return Some(k as usize);
    }
    let mapped = match exterior {
        Exterior::FixedValue(_) => return None,
        Exterior::BorderExtend | Exterior::Laplace(_) => k.clamp(0, n - 1),
        Exterior::MirrorExtend => {
            let m = k.rem_euclid(2 * n);
            if m < n {
                m
            } else {
                2 * n - 1 - m
            }
        }
        Exterior::Periodic => k.rem_euclid(n),
    };
    Some(mapped as usize)
}

/// Extends a field by the given borders.
///
/// The original data are copied unchanged to the position `(borders.left, borders.top)` of the
/// result. The extended field keeps the pixel size and units; its offsets are shifted so that
/// the original area stays at the same physical position.
///
/// # Arguments
/// - `field`: The field to extend.
/// - `borders`: Number of pixels to add on each side.
/// - `exterior`: How the new pixels are filled.
/// - `abort_flag`: Checked by the Laplace solver between iterations.
pub fn extend(
    field: &DataField,
    borders: Borders,
    exterior: &Exterior,
    abort_flag: &AtomicBool,
) -> Result<DataField, SplitError> {
    let (xres, yres) = (field.xres(), field.yres());
    let extxres = xres + borders.left + borders.right;
    let extyres = yres + borders.top + borders.bottom;

    let mut extended = field.new_resized_alike(extxres, extyres);
    extended.xoff = field.xoff - borders.left as f64 * field.dx();
    extended.yoff = field.yoff - borders.top as f64 * field.dy();

    let fill = match exterior {
        Exterior::FixedValue(v) => *v,
        _ => 0.0,
    };
    let source = &field.data;
    Zip::indexed(&mut extended.data).par_for_each(|(i, j), v| {
        let row = source_index(i as isize - borders.top as isize, yres, exterior);
        let col = source_index(j as isize - borders.left as isize, xres, exterior);
        *v = match (row, col) {
            (Some(row), Some(col)) => source[(row, col)],
            _ => fill,
        };
    });

    if let Exterior::Laplace(settings) = exterior {
        let mut fixed = Array2::from_elem((extyres, extxres), false);
        fixed
            .slice_mut(s![
                borders.top..borders.top + yres,
                borders.left..borders.left + xres
            ])
            .fill(true);
        let report = laplace_fill(&mut extended.data, &fixed.view(), settings, abort_flag)?;
        log::debug!(
            "Laplace extension to {}x{} took {} cycles",
            extxres,
            extyres,
            report.iterations
        );
    }

    Ok(extended)
}
