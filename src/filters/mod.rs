//! Frequency-domain processing of data fields.
//!
//! The frequency split runs in three stages, each in its own module:
//!
//! * **Boundary treatment**: the field is embedded in a larger one whose opposite edges connect
//!   smoothly, so the periodic transform does not see a jump at the field border.
//!
//! * **Radial filter**: the spectrum is weighted by a radially symmetric high-pass window.
//!
//! * **Recombination**: the weighted spectrum is transformed back, cropped to the original area
//!   and subtracted from the source.

/// Extension of fields before the Fourier transform.
/// Implements the `None`, `Laplace`, `SmoothConnect` and `Mirror` treatments.
pub mod boundary;

/// Frequency split with a cached spectrum.
pub mod freq_split;

/// Radial high-pass weighting of spectra.
pub mod radial;
