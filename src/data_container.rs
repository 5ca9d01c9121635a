//! This module defines the data field, a dense two-dimensional grid of samples with physical
//! dimensions, together with the field arithmetic the frequency split needs.

use crate::error::SplitError;
use ndarray::{par_azip, s, Array2};
use serde::{Deserialize, Serialize};

/// Represents a two-dimensional data field, e.g. a topography image.
///
/// Samples are stored row-major with shape `(yres, xres)`, so `data[(row, col)]` is the sample in
/// row `row` and column `col`.
///
/// # Fields
/// - `xreal`, `yreal`: Physical dimensions of the whole field.
/// - `xoff`, `yoff`: Physical position of the top left corner.
/// - `si_unit_xy`: Unit of the lateral dimensions.
/// - `si_unit_z`: Unit of the values.
/// - `data`: The samples.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DataField {
    pub xreal: f64,
    pub yreal: f64,
    pub xoff: f64,
    pub yoff: f64,
    pub si_unit_xy: String,
    pub si_unit_z: String,
    pub data: Array2<f64>,
}

fn check_real_size(xreal: f64, yreal: f64) -> Result<(), SplitError> {
    if !(xreal.is_finite() && xreal > 0.0 && yreal.is_finite() && yreal > 0.0) {
        return Err(SplitError::InvalidField(format!(
            "physical dimensions must be positive, got {xreal} x {yreal}"
        )));
    }
    Ok(())
}

impl DataField {
    /// Creates a zero-filled field.
    ///
    /// # Arguments
    /// - `xres`, `yres`: Resolution in pixels, both at least one.
    /// - `xreal`, `yreal`: Physical dimensions, both positive.
    pub fn new(xres: usize, yres: usize, xreal: f64, yreal: f64) -> Result<DataField, SplitError> {
        DataField::from_data(Array2::zeros((yres, xres)), xreal, yreal)
    }

    /// Wraps an existing `(yres, xres)` array into a field.
    pub fn from_data(data: Array2<f64>, xreal: f64, yreal: f64) -> Result<DataField, SplitError> {
        let (yres, xres) = data.dim();
        if xres == 0 || yres == 0 {
            return Err(SplitError::InvalidField(format!(
                "resolution must be at least 1 x 1, got {xres} x {yres}"
            )));
        }
        check_real_size(xreal, yreal)?;
        Ok(DataField {
            xreal,
            yreal,
            xoff: 0.0,
            yoff: 0.0,
            si_unit_xy: String::new(),
            si_unit_z: String::new(),
            data,
        })
    }

    pub fn with_offsets(mut self, xoff: f64, yoff: f64) -> DataField {
        self.xoff = xoff;
        self.yoff = yoff;
        self
    }

    pub fn with_units(mut self, si_unit_xy: &str, si_unit_z: &str) -> DataField {
        self.si_unit_xy = si_unit_xy.to_string();
        self.si_unit_z = si_unit_z.to_string();
        self
    }

    pub fn xres(&self) -> usize {
        self.data.ncols()
    }

    pub fn yres(&self) -> usize {
        self.data.nrows()
    }

    /// Pixel width.
    pub fn dx(&self) -> f64 {
        self.xreal / self.xres() as f64
    }

    /// Pixel height.
    pub fn dy(&self) -> f64 {
        self.yreal / self.yres() as f64
    }

    pub fn get_val(&self, col: usize, row: usize) -> f64 {
        self.data[(row, col)]
    }

    pub fn set_val(&mut self, col: usize, row: usize, value: f64) {
        self.data[(row, col)] = value;
    }

    /// Creates a zero-filled field with the same dimensions, offsets and units.
    pub fn new_alike(&self) -> DataField {
        DataField {
            xreal: self.xreal,
            yreal: self.yreal,
            xoff: self.xoff,
            yoff: self.yoff,
            si_unit_xy: self.si_unit_xy.clone(),
            si_unit_z: self.si_unit_z.clone(),
            data: Array2::zeros(self.data.dim()),
        }
    }

    /// Creates a zero-filled field with a different resolution but the same pixel size, offsets
    /// and units.
    pub fn new_resized_alike(&self, xres: usize, yres: usize) -> DataField {
        let xres = xres.max(1);
        let yres = yres.max(1);
        DataField {
            xreal: self.dx() * xres as f64,
            yreal: self.dy() * yres as f64,
            xoff: self.xoff,
            yoff: self.yoff,
            si_unit_xy: self.si_unit_xy.clone(),
            si_unit_z: self.si_unit_z.clone(),
            data: Array2::zeros((yres, xres)),
        }
    }

    /// Copies a rectangular area of this field into `dest`.
    ///
    /// # Arguments
    /// - `dest`: Destination field.
    /// - `col`, `row`: Top left corner of the area in this field.
    /// - `width`, `height`: Size of the area.
    /// - `destcol`, `destrow`: Top left corner of the target position in `dest`.
    #[allow(clippy::too_many_arguments)]
    pub fn area_copy(
        &self,
        dest: &mut DataField,
        col: usize,
        row: usize,
        width: usize,
        height: usize,
        destcol: usize,
        destrow: usize,
    ) -> Result<(), SplitError> {
        if col + width > self.xres()
            || row + height > self.yres()
            || destcol + width > dest.xres()
            || destrow + height > dest.yres()
        {
            return Err(SplitError::InvalidField(format!(
                "area {width} x {height} at ({col}, {row}) -> ({destcol}, {destrow}) does not fit"
            )));
        }
        dest.data
            .slice_mut(s![destrow..destrow + height, destcol..destcol + width])
            .assign(&self.data.slice(s![row..row + height, col..col + width]));
        Ok(())
    }

    /// Computes `a - b` elementwise. The result takes its metadata from `a`.
    pub fn subtract_fields(a: &DataField, b: &DataField) -> Result<DataField, SplitError> {
        check_same_shape(a, b)?;
        let mut result = a.new_alike();
        par_azip!((r in &mut result.data, &x in &a.data, &y in &b.data) *r = x - y);
        Ok(result)
    }

    /// Computes `a + b` elementwise. The result takes its metadata from `a`.
    pub fn add_fields(a: &DataField, b: &DataField) -> Result<DataField, SplitError> {
        check_same_shape(a, b)?;
        let mut result = a.new_alike();
        par_azip!((r in &mut result.data, &x in &a.data, &y in &b.data) *r = x + y);
        Ok(result)
    }

    /// Mean value of the field.
    pub fn avg(&self) -> f64 {
        self.data.sum() / self.data.len() as f64
    }

    /// Minimum and maximum value of the field.
    pub fn min_max(&self) -> (f64, f64) {
        self.data
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(min, max), &v| {
                (min.min(v), max.max(v))
            })
    }
}

fn check_same_shape(a: &DataField, b: &DataField) -> Result<(), SplitError> {
    if a.data.dim() != b.data.dim() {
        return Err(SplitError::ShapeMismatch {
            expected: a.data.dim(),
            got: b.data.dim(),
        });
    }
    Ok(())
}
