//! # freq_split
//!
//! Splits two-dimensional data fields, such as scanning probe microscopy images, into a
//! low-pass and a high-pass component using a radially symmetric filter in the frequency domain.
//!
//! Before the transform the field can be extended at its boundaries to suppress the artefacts a
//! periodic transform produces at the edges of non-periodic data. The spectrum of the extended
//! field is cached, so exploring different cut-off frequencies only costs one filter pass and
//! one inverse transform each.
//!
//! ## Example
//!
//! ```
//! use freq_split::{BoundaryTreatment, DataField, FrequencySplit, SplitParams};
//! use ndarray::Array2;
//!
//! let data = Array2::from_shape_fn((32, 48), |(i, j)| (i as f64 * 0.3).sin() + j as f64 * 0.1);
//! let field = DataField::from_data(data, 4.8e-6, 3.2e-6).unwrap();
//!
//! let params = SplitParams {
//!     cutoff: 0.2,
//!     boundary: BoundaryTreatment::Mirror,
//!     ..Default::default()
//! };
//! params.validate().unwrap();
//!
//! let mut split = FrequencySplit::new(field);
//! let result = split.compute(&params).unwrap();
//! assert_eq!(result.low_pass.data.dim(), (32, 48));
//! assert!(split.is_cached());
//! ```

pub mod config;
pub mod data_container;
pub mod error;
pub mod extend;
pub mod fft;
pub mod filters;
pub mod laplace;
pub mod math_tools;

pub use config::{BoundaryTreatment, ExtensionSettings, LaplaceSettings, OutputType, SplitParams};
pub use data_container::DataField;
pub use error::SplitError;
pub use extend::{extend, Borders, Exterior};
pub use fft::{FftTransform, Transform2d};
pub use filters::boundary::{extend_for_fft, Extension};
pub use filters::freq_split::{FrequencySplit, SplitResult};
pub use laplace::{laplace_fill, LaplaceReport};
pub use math_tools::find_nice_size;
