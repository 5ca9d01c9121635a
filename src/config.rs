//! Configuration records of the frequency split.
//!
//! All records derive `Serialize`/`Deserialize` with `#[serde(default)]`, so a partial settings
//! document yields the default for every missing field.

use crate::error::SplitError;
use serde::{Deserialize, Serialize};
use std::f64::consts::SQRT_2;
use std::fmt::{Display, Formatter};

/// Boundary treatment applied before the periodic Fourier transform.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BoundaryTreatment {
    /// Transform the data as they are.
    #[default]
    None,
    /// Centre the data in a larger field and fill the border by harmonic interpolation.
    Laplace,
    /// Extend to the right and bottom with a blend connecting the opposite edges.
    SmoothConnect,
    /// Mirror the data to a field of twice the size in both directions.
    Mirror,
}

impl Display for BoundaryTreatment {
    /// Provides a user-friendly string representation of each boundary treatment.
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            BoundaryTreatment::None => {
                write!(f, "None")
            }
            BoundaryTreatment::Laplace => {
                write!(f, "Laplace")
            }
            BoundaryTreatment::SmoothConnect => {
                write!(f, "Smooth connect")
            }
            BoundaryTreatment::Mirror => {
                write!(f, "Mirror")
            }
        }
    }
}

/// Which of the two components the caller wants to keep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputType {
    LowPass,
    HighPass,
    #[default]
    Both,
}

impl OutputType {
    pub fn low_pass(&self) -> bool {
        matches!(self, OutputType::LowPass | OutputType::Both)
    }

    pub fn high_pass(&self) -> bool {
        matches!(self, OutputType::HighPass | OutputType::Both)
    }
}

/// Settings of the harmonic fill used by the Laplace boundary treatment.
///
/// # Fields
/// - `max_iterations`: Upper bound on the number of multigrid cycles.
/// - `tolerance`: Convergence threshold relative to the value range of the known data.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LaplaceSettings {
    pub max_iterations: usize,
    pub tolerance: f64,
}

impl Default for LaplaceSettings {
    fn default() -> Self {
        LaplaceSettings {
            max_iterations: 100,
            tolerance: 1e-9,
        }
    }
}

/// Tuning constants of the boundary extensions.
///
/// # Fields
/// - `smear`: Length of the window over which the smooth connection continues the local
///   derivative at each edge.
/// - `laplace`: Settings of the harmonic fill.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtensionSettings {
    pub smear: usize,
    pub laplace: LaplaceSettings,
}

impl Default for ExtensionSettings {
    fn default() -> Self {
        ExtensionSettings {
            smear: 6,
            laplace: LaplaceSettings::default(),
        }
    }
}

/// Parameters of a frequency split.
///
/// # Fields
/// - `cutoff`: Cut-off as a fraction of the Nyquist frequency. The radial frequency is normalised
///   so that the corner of the spectrum lies at √2.
/// - `width`: Width of the error-function edge, zero gives a hard step.
/// - `boundary`: Boundary treatment.
/// - `output`: Which components the caller wants.
/// - `extension`: Tuning of the boundary extensions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitParams {
    pub cutoff: f64,
    pub width: f64,
    pub boundary: BoundaryTreatment,
    pub output: OutputType,
    pub extension: ExtensionSettings,
}

impl Default for SplitParams {
    fn default() -> Self {
        SplitParams {
            cutoff: 0.3,
            width: 0.03,
            boundary: BoundaryTreatment::None,
            output: OutputType::Both,
            extension: ExtensionSettings::default(),
        }
    }
}

impl SplitParams {
    /// Largest meaningful cut-off, the radial frequency of the spectrum corner.
    pub const MAX_CUTOFF: f64 = SQRT_2;
    /// Largest accepted edge width.
    pub const MAX_WIDTH: f64 = 0.2;

    /// Checks the parameters against their documented ranges.
    ///
    /// The numerical core assumes validated parameters and does not repeat these checks.
    pub fn validate(&self) -> Result<(), SplitError> {
        if !self.cutoff.is_finite() || !(0.0..=Self::MAX_CUTOFF).contains(&self.cutoff) {
            return Err(SplitError::InvalidParameter(format!(
                "cut-off {} outside [0, {}]",
                self.cutoff,
                Self::MAX_CUTOFF
            )));
        }
        if !self.width.is_finite() || !(0.0..=Self::MAX_WIDTH).contains(&self.width) {
            return Err(SplitError::InvalidParameter(format!(
                "edge width {} outside [0, {}]",
                self.width,
                Self::MAX_WIDTH
            )));
        }
        if self.extension.smear == 0 {
            return Err(SplitError::InvalidParameter(
                "smear window must be at least one sample".to_string(),
            ));
        }
        let laplace = &self.extension.laplace;
        if laplace.max_iterations == 0 {
            return Err(SplitError::InvalidParameter(
                "Laplace fill needs at least one iteration".to_string(),
            ));
        }
        if !(laplace.tolerance > 0.0) {
            return Err(SplitError::InvalidParameter(format!(
                "Laplace tolerance {} must be positive",
                laplace.tolerance
            )));
        }
        Ok(())
    }

    /// Real-space wavelength corresponding to the cut-off for pixel size `dx`.
    ///
    /// Returns `None` for a zero cut-off, whose wavelength is infinite.
    pub fn cutoff_wavelength(&self, dx: f64) -> Option<f64> {
        if self.cutoff == 0.0 {
            None
        } else {
            Some(2.0 * dx / self.cutoff)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_defaults_validate() {
        let params = SplitParams::default();
        assert!(params.validate().is_ok());
        assert_eq!(params.boundary, BoundaryTreatment::None);
        assert_eq!(params.extension.smear, 6);
    }

    #[test]
    fn test_validate_rejects_out_of_range_values() {
        let mut params = SplitParams::default();
        params.cutoff = -0.1;
        assert!(matches!(params.validate(), Err(SplitError::InvalidParameter(_))));

        params.cutoff = 1.5;
        assert!(params.validate().is_err());

        params.cutoff = f64::NAN;
        assert!(params.validate().is_err());

        params.cutoff = SplitParams::MAX_CUTOFF;
        assert!(params.validate().is_ok());

        params.width = 0.25;
        assert!(params.validate().is_err());

        params.width = 0.0;
        params.extension.smear = 0;
        assert!(params.validate().is_err());

        params.extension.smear = 6;
        params.extension.laplace.tolerance = 0.0;
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_partial_settings_fall_back_to_defaults() {
        let params: SplitParams =
            serde_json::from_str(r#"{"cutoff": 0.1, "boundary": "SmoothConnect"}"#).unwrap();
        assert_relative_eq!(params.cutoff, 0.1);
        assert_relative_eq!(params.width, 0.03);
        assert_eq!(params.boundary, BoundaryTreatment::SmoothConnect);
        assert_eq!(params.output, OutputType::Both);
        assert_eq!(params.extension, ExtensionSettings::default());

        let params: SplitParams =
            serde_json::from_str(r#"{"extension": {"laplace": {"max_iterations": 50}}}"#).unwrap();
        assert_eq!(params.extension.smear, 6);
        assert_eq!(params.extension.laplace.max_iterations, 50);
        assert_relative_eq!(params.extension.laplace.tolerance, 1e-9);
    }

    #[test]
    fn test_cutoff_wavelength() {
        let mut params = SplitParams::default();
        params.cutoff = 0.0;
        assert_eq!(params.cutoff_wavelength(1e-9), None);

        params.cutoff = 0.25;
        assert_relative_eq!(params.cutoff_wavelength(1e-9).unwrap(), 8e-9);
    }

    #[test]
    fn test_output_type_selection() {
        assert!(OutputType::Both.low_pass() && OutputType::Both.high_pass());
        assert!(OutputType::LowPass.low_pass() && !OutputType::LowPass.high_pass());
        assert!(!OutputType::HighPass.low_pass() && OutputType::HighPass.high_pass());
    }

    #[test]
    fn test_boundary_display_names() {
        assert_eq!(BoundaryTreatment::SmoothConnect.to_string(), "Smooth connect");
        assert_eq!(BoundaryTreatment::default().to_string(), "None");
    }
}
