//! This module provides small numerical helpers used throughout the crate: the search for
//! FFT-friendly transform sizes and the error function used for smooth filter edges.

/// Prime factors an FFT-friendly size may consist of.
const NICE_FACTORS: [usize; 4] = [2, 3, 5, 7];

/// Checks whether `n` factors into small primes only.
fn is_nice_size(mut n: usize) -> bool {
    for p in NICE_FACTORS {
        while n % p == 0 {
            n /= p;
        }
    }
    n == 1
}

/// Finds the smallest FFT-friendly size that is at least `size`.
///
/// A size is FFT-friendly when all its prime factors are 2, 3, 5 or 7. Sizes of zero are treated
/// as one.
///
/// # Arguments
/// - `size`: The minimum acceptable size.
///
/// # Returns
/// The smallest integer `n >= max(size, 1)` consisting of the factors 2, 3, 5 and 7 only.
pub fn find_nice_size(size: usize) -> usize {
    let mut n = size.max(1);
    while !is_nice_size(n) {
        n += 1;
    }
    n
}

/// Computes the error function in double precision.
///
/// The result is odd in `x` and exactly zero at the origin, so smooth filter edges built from
/// it are symmetric about their centre.
pub fn erf(x: f64) -> f64 {
    libm::erf(x)
}
