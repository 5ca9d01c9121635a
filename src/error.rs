//! Error type shared by all operations of the crate.

use cancellable_loops::Aborted;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SplitError {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Invalid data field: {0}")]
    InvalidField(String),

    #[error("Shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        expected: (usize, usize),
        got: (usize, usize),
    },

    #[error("FFT error: {0}")]
    Fft(#[from] realfft::FftError),

    #[error("FFT planner lock poisoned")]
    PlannerPoisoned,

    #[error("Calculation aborted")]
    Aborted,
}

impl From<Aborted> for SplitError {
    fn from(_: Aborted) -> Self {
        SplitError::Aborted
    }
}
