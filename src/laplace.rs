//! Harmonic interpolation of unknown grid cells.
//!
//! Cells that are not marked as fixed are replaced by the solution of the discrete Laplace
//! equation with the fixed cells as Dirichlet data. Neighbours outside the grid are left out of
//! the average, which makes the outer grid boundary reflecting.
//!
//! The equation is solved with multigrid W-cycles. Coarse grids aggregate 2×2 blocks of cells,
//! a coarse cell is fixed as soon as one of its children is, and the coarse operators are the
//! Galerkin products of the finer ones. The number of cycles needed for a given tolerance does
//! not grow with the grid size.

use crate::config::LaplaceSettings;
use cancellable_loops::{for_each_cancellable, Aborted, Completion};
use ndarray::parallel::prelude::*;
use ndarray::{Array2, ArrayView2, Axis, Zip};
use std::f64::consts::PI;
use std::ops::ControlFlow;
use std::sync::atomic::AtomicBool;

/// Grids with a side shorter than this are not coarsened any further.
const MIN_COARSEN_SIZE: usize = 4;
/// Red-black smoothing sweeps before and after the coarse grid correction.
const SMOOTHING_SWEEPS: usize = 2;
/// Coarse grid visits per level, two makes a W-cycle.
const COARSE_VISITS: usize = 2;
/// Scaling of the coarse grid correction, piecewise constant prolongation undershoots.
const OVER_CORRECTION: f64 = 1.8;

/// Outcome of a harmonic fill.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LaplaceReport {
    /// Number of multigrid cycles performed.
    pub iterations: usize,
    /// Whether the largest update fell below the tolerance.
    pub converged: bool,
    /// Largest change of a cell in the last cycle.
    pub max_update: f64,
}

/// Five-point operator `diagonal * u - sum(coupling * neighbour)` of one grid level.
struct Level {
    fixed: Array2<bool>,
    diagonal: Array2<f64>,
    /// Coupling of each cell to its right neighbour.
    east: Array2<f64>,
    /// Coupling of each cell to the cell below.
    south: Array2<f64>,
}

impl Level {
    /// The plain Laplacian: unit couplings to every in-grid neighbour.
    fn finest(fixed: &ArrayView2<bool>) -> Level {
        let (yres, xres) = fixed.dim();
        let east = Array2::from_shape_fn((yres, xres), |(_, j)| (j + 1 < xres) as u8 as f64);
        let south = Array2::from_shape_fn((yres, xres), |(i, _)| (i + 1 < yres) as u8 as f64);
        let diagonal = Array2::from_shape_fn((yres, xres), |(i, j)| {
            ((i > 0) as u8 + (i + 1 < yres) as u8 + (j > 0) as u8 + (j + 1 < xres) as u8) as f64
        });
        Level {
            fixed: fixed.to_owned(),
            diagonal,
            east,
            south,
        }
    }

    /// Aggregates 2×2 blocks, or returns `None` when the grid is too small to coarsen.
    fn coarsen(&self) -> Option<Level> {
        let (yres, xres) = self.fixed.dim();
        if yres.min(xres) < MIN_COARSEN_SIZE {
            return None;
        }
        let dim = (yres.div_ceil(2), xres.div_ceil(2));
        let rows = |ci: usize| 2 * ci..(2 * ci + 2).min(yres);
        let cols = |cj: usize| 2 * cj..(2 * cj + 2).min(xres);

        let fixed = Array2::from_shape_fn(dim, |(ci, cj)| {
            rows(ci).any(|i| cols(cj).any(|j| self.fixed[(i, j)]))
        });
        let diagonal = Array2::from_shape_fn(dim, |(ci, cj)| {
            let mut d = 0.0;
            for i in rows(ci) {
                for j in cols(cj) {
                    d += self.diagonal[(i, j)];
                    // couplings inside the block cancel against the diagonal on both sides
                    if j % 2 == 0 && j + 1 < xres {
                        d -= 2.0 * self.east[(i, j)];
                    }
                    if i % 2 == 0 && i + 1 < yres {
                        d -= 2.0 * self.south[(i, j)];
                    }
                }
            }
            d
        });
        let east = Array2::from_shape_fn(dim, |(ci, cj)| {
            let j = 2 * cj + 1;
            if j + 1 < xres {
                rows(ci).map(|i| self.east[(i, j)]).sum()
            } else {
                0.0
            }
        });
        let south = Array2::from_shape_fn(dim, |(ci, cj)| {
            let i = 2 * ci + 1;
            if i + 1 < yres {
                cols(cj).map(|j| self.south[(i, j)]).sum()
            } else {
                0.0
            }
        });
        Some(Level {
            fixed,
            diagonal,
            east,
            south,
        })
    }

    /// Weighted sum of the in-grid neighbours of `(i, j)`.
    fn neighbour_sum(&self, u: &Array2<f64>, i: usize, j: usize) -> f64 {
        let (yres, xres) = u.dim();
        let mut sum = 0.0;
        if i > 0 {
            sum += self.south[(i - 1, j)] * u[(i - 1, j)];
        }
        if i + 1 < yres {
            sum += self.south[(i, j)] * u[(i + 1, j)];
        }
        if j > 0 {
            sum += self.east[(i, j - 1)] * u[(i, j - 1)];
        }
        if j + 1 < xres {
            sum += self.east[(i, j)] * u[(i, j + 1)];
        }
        sum
    }
}

/// Performs one half of a red-black sweep of the level equation with right hand side `rhs`.
///
/// Cells of colour `color` that are not fixed are relaxed using the values of `src`, all other
/// cells are copied. Returns the largest absolute update.
fn half_sweep(
    level: &Level,
    src: &Array2<f64>,
    dst: &mut Array2<f64>,
    rhs: &Array2<f64>,
    color: usize,
    omega: f64,
) -> f64 {
    let xres = src.ncols();
    dst.axis_iter_mut(Axis(0))
        .into_par_iter()
        .enumerate()
        .map(|(i, mut row)| {
            let mut max_update = 0.0_f64;
            for j in 0..xres {
                let old = src[(i, j)];
                row[j] = old;
                let diagonal = level.diagonal[(i, j)];
                if level.fixed[(i, j)] || (i + j) % 2 != color || diagonal <= 0.0 {
                    continue;
                }
                let target = (rhs[(i, j)] + level.neighbour_sum(src, i, j)) / diagonal;
                let new = old + omega * (target - old);
                max_update = max_update.max((new - old).abs());
                row[j] = new;
            }
            max_update
        })
        .reduce(|| 0.0, f64::max)
}

/// Runs up to `sweeps` red-black sweeps and stops early once nothing changes any more.
fn relax(level: &Level, u: &mut Array2<f64>, rhs: &Array2<f64>, sweeps: usize, omega: f64) {
    let mut next = Array2::zeros(u.dim());
    for _ in 0..sweeps {
        let red = half_sweep(level, u, &mut next, rhs, 0, omega);
        std::mem::swap(u, &mut next);
        let black = half_sweep(level, u, &mut next, rhs, 1, omega);
        std::mem::swap(u, &mut next);
        if red.max(black) == 0.0 {
            break;
        }
    }
}

/// Residual of the level equation on the free cells, zero on fixed cells.
fn residual(level: &Level, u: &Array2<f64>, rhs: &Array2<f64>) -> Array2<f64> {
    let mut r = Array2::<f64>::zeros(u.dim());
    Zip::indexed(&mut r)
        .and(rhs)
        .and(&level.fixed)
        .par_for_each(|(i, j), r, &b, &is_fixed| {
            if !is_fixed {
                *r = b + level.neighbour_sum(u, i, j) - level.diagonal[(i, j)] * u[(i, j)];
            }
        });
    r
}

/// One multigrid cycle on `levels[0]`, visiting the coarser levels recursively.
///
/// The coarsest level is relaxed with over-relaxation until it settles.
fn multigrid_cycle(levels: &[Level], u: &mut Array2<f64>, rhs: &Array2<f64>) {
    let level = &levels[0];
    let Some(coarse) = levels.get(1) else {
        let (yres, xres) = u.dim();
        let size = yres.max(xres).max(2);
        let omega = 2.0 / (1.0 + (PI / size as f64).sin());
        relax(level, u, rhs, 4 * size + 16, omega);
        return;
    };

    relax(level, u, rhs, SMOOTHING_SWEEPS, 1.0);

    let (yres, xres) = u.dim();
    let r = residual(level, u, rhs);
    let mut coarse_rhs = Array2::<f64>::zeros(coarse.fixed.dim());
    Zip::indexed(&mut coarse_rhs)
        .and(&coarse.fixed)
        .par_for_each(|(ci, cj), v, &is_fixed| {
            if is_fixed {
                return;
            }
            for i in 2 * ci..(2 * ci + 2).min(yres) {
                for j in 2 * cj..(2 * cj + 2).min(xres) {
                    *v += r[(i, j)];
                }
            }
        });

    let mut correction = Array2::<f64>::zeros(coarse.fixed.dim());
    for _ in 0..COARSE_VISITS {
        multigrid_cycle(&levels[1..], &mut correction, &coarse_rhs);
    }
    Zip::indexed(&mut *u)
        .and(&level.fixed)
        .par_for_each(|(i, j), v, &is_fixed| {
            if !is_fixed {
                *v += OVER_CORRECTION * correction[(i / 2, j / 2)];
            }
        });

    relax(level, u, rhs, SMOOTHING_SWEEPS, 1.0);
}

/// Fills all cells of `data` that are not `fixed` by harmonic interpolation.
///
/// The current values of the free cells are used as the initial guess. Each iteration is one
/// multigrid W-cycle with red-black Gauss-Seidel smoothing. The solver stops once the largest
/// change of a cell during a cycle is below `settings.tolerance` times the value range of the
/// fixed cells, or after `settings.max_iterations` cycles.
///
/// # Arguments
/// - `data`: The grid, modified in place. Fixed cells are never changed.
/// - `fixed`: Mask of cells with known values, same shape as `data`.
/// - `settings`: Cycle limit and tolerance.
/// - `abort_flag`: Checked between cycles.
///
/// # Returns
/// A `LaplaceReport` or `Err(Aborted)`, in which case `data` is left untouched.
pub fn laplace_fill(
    data: &mut Array2<f64>,
    fixed: &ArrayView2<bool>,
    settings: &LaplaceSettings,
    abort_flag: &AtomicBool,
) -> Result<LaplaceReport, Aborted> {
    debug_assert_eq!(data.dim(), fixed.dim());

    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    let mut free_cells = 0usize;
    for (&v, &is_fixed) in data.iter().zip(fixed.iter()) {
        if is_fixed {
            min = min.min(v);
            max = max.max(v);
        } else {
            free_cells += 1;
        }
    }
    if free_cells == 0 {
        return Ok(LaplaceReport {
            iterations: 0,
            converged: true,
            max_update: 0.0,
        });
    }

    let range = if max > min { max - min } else { 1.0 };
    let threshold = settings.tolerance * range;

    let mut levels = vec![Level::finest(fixed)];
    while let Some(coarse) = levels.last().and_then(Level::coarsen) {
        levels.push(coarse);
    }
    log::trace!("Laplace fill uses {} grid levels", levels.len());

    let rhs = Array2::<f64>::zeros(data.dim());
    let mut current = data.clone();
    let mut report = LaplaceReport {
        iterations: 0,
        converged: false,
        max_update: f64::INFINITY,
    };

    let completion = for_each_cancellable(0..settings.max_iterations, abort_flag, |_| {
        let previous = current.clone();
        multigrid_cycle(&levels, &mut current, &rhs);

        report.iterations += 1;
        report.max_update = current
            .iter()
            .zip(previous.iter())
            .fold(0.0, |m, (a, b)| f64::max(m, (a - b).abs()));
        if report.max_update <= threshold {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    })?;

    report.converged = completion == Completion::Stopped;
    if !report.converged {
        log::warn!(
            "Laplace fill did not converge in {} cycles, last update {:e}",
            report.iterations,
            report.max_update
        );
    }
    *data = current;
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::s;

    fn settings() -> LaplaceSettings {
        LaplaceSettings {
            max_iterations: 500,
            tolerance: 1e-12,
        }
    }

    /// A `size`×`size` field centred in a 5/3 times larger grid, outside cells start at zero.
    fn extension_problem(size: usize) -> (Array2<f64>, Array2<bool>) {
        let ext = (5 * size).div_ceil(3);
        let offset = (ext - size) / 2;
        let mut data = Array2::<f64>::zeros((ext, ext));
        let mut fixed = Array2::from_elem((ext, ext), false);
        let inner = offset..offset + size;
        for ((i, j), v) in data
            .slice_mut(s![inner.clone(), inner.clone()])
            .indexed_iter_mut()
        {
            *v = (j as f64 / 13.0).sin() * (i as f64 / 7.0).cos()
                + 0.01 * j as f64
                + 0.1 * ((i * 31 + j * 17) % 7) as f64;
        }
        fixed.slice_mut(s![inner.clone(), inner]).fill(true);
        (data, fixed)
    }

    fn max_residual(data: &Array2<f64>, fixed: &Array2<bool>) -> f64 {
        let rhs = Array2::<f64>::zeros(data.dim());
        residual(&Level::finest(&fixed.view()), data, &rhs)
            .iter()
            .fold(0.0, |m, r| f64::max(m, r.abs()))
    }

    #[test]
    fn test_fill_between_two_fixed_columns_is_linear() {
        // fixed left and right columns, reflecting top and bottom: the solution is linear in x
        let (yres, xres) = (5, 9);
        let mut data = Array2::<f64>::zeros((yres, xres));
        let mut fixed = Array2::from_elem((yres, xres), false);
        for i in 0..yres {
            data[(i, 0)] = 0.0;
            data[(i, xres - 1)] = 8.0;
            fixed[(i, 0)] = true;
            fixed[(i, xres - 1)] = true;
        }

        let report = laplace_fill(&mut data, &fixed.view(), &settings(), &AtomicBool::new(false))
            .unwrap();
        assert!(report.converged);
        for i in 0..yres {
            for j in 0..xres {
                assert_abs_diff_eq!(data[(i, j)], j as f64, epsilon = 1e-8);
            }
        }
    }

    #[test]
    fn test_fixed_cells_are_not_modified() {
        let mut data = Array2::from_shape_fn((6, 6), |(i, j)| ((i * 7 + j * 3) % 5) as f64);
        let original = data.clone();
        let mut fixed = Array2::from_elem((6, 6), false);
        fixed.slice_mut(s![1..4, 2..5]).fill(true);

        laplace_fill(&mut data, &fixed.view(), &settings(), &AtomicBool::new(false)).unwrap();
        for ((i, j), &is_fixed) in fixed.indexed_iter() {
            if is_fixed {
                assert_eq!(data[(i, j)], original[(i, j)]);
            }
        }
    }

    #[test]
    fn test_no_new_extrema() {
        let mut data = Array2::<f64>::zeros((12, 12));
        let mut fixed = Array2::from_elem((12, 12), false);
        for ((i, j), v) in data.slice_mut(s![4..8, 4..8]).indexed_iter_mut() {
            *v = (i as f64 - 1.5).powi(2) - (j as f64) * 0.5;
        }
        fixed.slice_mut(s![4..8, 4..8]).fill(true);
        let (min, max) = data
            .slice(s![4..8, 4..8])
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(a, b), &v| (a.min(v), b.max(v)));

        laplace_fill(&mut data, &fixed.view(), &settings(), &AtomicBool::new(false)).unwrap();
        let slack = 1e-6 * (max - min);
        assert!(data.iter().all(|&v| v >= min - slack && v <= max + slack));
    }

    #[test]
    fn test_aborted_fill_leaves_data_untouched() {
        let mut data = Array2::<f64>::zeros((4, 4));
        data[(0, 0)] = 1.0;
        let original = data.clone();
        let mut fixed = Array2::from_elem((4, 4), false);
        fixed[(0, 0)] = true;

        let result = laplace_fill(&mut data, &fixed.view(), &settings(), &AtomicBool::new(true));
        assert_eq!(result, Err(Aborted));
        assert_eq!(data, original);
    }

    #[test]
    fn test_fully_fixed_grid_needs_no_iterations() {
        let mut data = Array2::<f64>::ones((3, 3));
        let fixed = Array2::from_elem((3, 3), true);
        let report = laplace_fill(&mut data, &fixed.view(), &settings(), &AtomicBool::new(false))
            .unwrap();
        assert_eq!(report.iterations, 0);
        assert!(report.converged);
    }

    #[test]
    fn test_coarse_levels_keep_every_fixed_cell() {
        let mut fixed = Array2::from_elem((9, 6), false);
        fixed[(8, 0)] = true;
        fixed[(3, 4)] = true;
        let coarse = Level::finest(&fixed.view()).coarsen().unwrap();
        assert_eq!(coarse.fixed.dim(), (5, 3));
        assert_eq!(coarse.fixed.iter().filter(|&&f| f).count(), 2);
        assert!(coarse.fixed[(4, 0)]);
        assert!(coarse.fixed[(1, 2)]);
        assert!(coarse.coarsen().is_none());
    }

    #[test]
    fn test_coarse_operator_of_the_laplacian_is_twice_the_laplacian() {
        let fixed = Array2::from_elem((8, 8), false);
        let coarse = Level::finest(&fixed.view()).coarsen().unwrap();
        let plain = Level::finest(&coarse.fixed.view());
        for (a, b) in coarse.diagonal.iter().zip(plain.diagonal.iter()) {
            assert_abs_diff_eq!(*a, 2.0 * b);
        }
        for (a, b) in coarse.east.iter().zip(plain.east.iter()) {
            assert_abs_diff_eq!(*a, 2.0 * b);
        }
        for (a, b) in coarse.south.iter().zip(plain.south.iter()) {
            assert_abs_diff_eq!(*a, 2.0 * b);
        }
    }

    #[test]
    fn test_cycle_count_does_not_grow_with_the_grid() {
        let mut cycles = Vec::new();
        for size in [24, 96] {
            let (mut data, fixed) = extension_problem(size);
            let report = laplace_fill(
                &mut data,
                &fixed.view(),
                &LaplaceSettings::default(),
                &AtomicBool::new(false),
            )
            .unwrap();
            assert!(report.converged);
            assert!(report.iterations <= 40, "{} cycles", report.iterations);
            assert!(max_residual(&data, &fixed) < 1e-8);
            cycles.push(report.iterations);
        }
        // plain relaxation would need about four times as many sweeps on the larger grid
        assert!(cycles[1] <= cycles[0] + 10, "{:?}", cycles);
    }

    #[test]
    fn test_cycle_limit_is_reported() {
        let (mut data, fixed) = extension_problem(16);
        let limited = LaplaceSettings {
            max_iterations: 2,
            tolerance: 1e-14,
        };
        let report =
            laplace_fill(&mut data, &fixed.view(), &limited, &AtomicBool::new(false)).unwrap();
        assert_eq!(report.iterations, 2);
        assert!(!report.converged);
        assert!(report.max_update > 0.0);
    }
}
