//! Implicit vertical solve for one ice column.
//!
//! Both variants solve `dx/dt = d/dz(D dx/dz) - w dx/dz + rhs` on the levels
//! `z[0..=ks]` below the ice surface, where `x` is enthalpy or temperature and
//! `rhs` already holds the explicit horizontal advection and source terms.
//! Backward Euler in time gives a tridiagonal system per column.

use crate::field::Field3;
use glam::DVec3;

/// Condition imposed at the ice base
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum BasalBoundary {
    /// Influx into the ice, already divided by the volumetric heat capacity
    Flux(f64),
    /// Prescribed basal value
    Value(f64),
}

/// Tridiagonal system assembled for one column
#[derive(Debug, Clone)]
pub(crate) struct ColumnSystem {
    lower: Vec<f64>,
    diagonal: Vec<f64>,
    upper: Vec<f64>,
    rhs: Vec<f64>,
}

impl ColumnSystem {
    /// Assemble the system on levels `z` (at least two) for a step of `dt` s.
    ///
    /// `explicit` is the value after the explicit part of the step,
    /// `diffusivity` is per level (m²/s) and `w` the vertical velocity (m/s).
    pub fn assemble(
        z: &[f64],
        dt: f64,
        explicit: &[f64],
        diffusivity: &[f64],
        w: &[f64],
        surface_value: f64,
        basal: BasalBoundary,
    ) -> Self {
        let n = z.len();
        let mut lower = vec![0.0; n];
        let mut diagonal = vec![1.0; n];
        let mut upper = vec![0.0; n];
        let mut rhs = explicit.to_vec();

        match basal {
            BasalBoundary::Value(value) => rhs[0] = value,
            BasalBoundary::Flux(flux) => {
                // ghost level mirrored about the base carries the flux
                let dz = z[1] - z[0];
                let r = 2.0 * dt * 0.5 * (diffusivity[0] + diffusivity[1]) / (dz * dz);
                diagonal[0] = 1.0 + r;
                upper[0] = -r;
                rhs[0] = explicit[0] + 2.0 * dt * flux / dz;
            }
        }

        for k in 1..n - 1 {
            let dz_below = z[k] - z[k - 1];
            let dz_above = z[k + 1] - z[k];
            let dz_mean = 0.5 * (dz_below + dz_above);
            let d_below = 0.5 * (diffusivity[k - 1] + diffusivity[k]);
            let d_above = 0.5 * (diffusivity[k] + diffusivity[k + 1]);
            let r_below = dt * d_below / (dz_below * dz_mean);
            let r_above = dt * d_above / (dz_above * dz_mean);

            let mut a = -r_below;
            let mut b = 1.0 + r_below + r_above;
            let mut c = -r_above;
            // first-order upwind vertical advection
            if w[k] > 0.0 {
                let q = dt * w[k] / dz_below;
                a -= q;
                b += q;
            } else if w[k] < 0.0 {
                let q = -dt * w[k] / dz_above;
                c -= q;
                b += q;
            }
            lower[k] = a;
            diagonal[k] = b;
            upper[k] = c;
        }

        rhs[n - 1] = surface_value;

        Self {
            lower,
            diagonal,
            upper,
            rhs,
        }
    }

    /// Thomas algorithm; `None` on a vanishing or non-finite pivot
    pub fn solve(&self) -> Option<Vec<f64>> {
        let n = self.diagonal.len();
        let mut gamma = vec![0.0; n];
        let mut x = vec![0.0; n];

        let mut beta = self.diagonal[0];
        if !pivot_ok(beta) {
            return None;
        }
        x[0] = self.rhs[0] / beta;
        for k in 1..n {
            gamma[k] = self.upper[k - 1] / beta;
            beta = self.diagonal[k] - self.lower[k] * gamma[k];
            if !pivot_ok(beta) {
                return None;
            }
            x[k] = (self.rhs[k] - self.lower[k] * x[k - 1]) / beta;
        }
        for k in (0..n - 1).rev() {
            x[k] -= gamma[k + 1] * x[k + 1];
        }
        x.iter().all(|v| v.is_finite()).then_some(x)
    }
}

fn pivot_ok(pivot: f64) -> bool {
    pivot.is_finite() && pivot.abs() > 1e-300
}

/// Velocity at level `k` of column (i, j)
pub(crate) fn velocity(u3: &Field3, v3: &Field3, w3: &Field3, i: usize, j: usize, k: usize) -> DVec3 {
    DVec3::new(u3.get(i, j, k), v3.get(i, j, k), w3.get(i, j, k))
}

/// Horizontal Courant number of one step
pub(crate) fn horizontal_cfl(velocity: DVec3, dt: f64, dx: f64, dy: f64) -> f64 {
    dt * (velocity.x.abs() / dx + velocity.y.abs() / dy)
}

/// `u dx/dx + v dx/dy` at level `k` of column (i, j), first-order upwind.
/// Neighbours beyond the domain edge repeat the edge column.
pub(crate) fn horizontal_advection(field: &Field3, i: usize, j: usize, k: usize, velocity: DVec3, dx: f64, dy: f64) -> f64 {
    let (ii, jj) = (i as isize, j as isize);
    let center = field.get(i, j, k);

    let dfdx = if velocity.x > 0.0 {
        (center - field.column_clamped(ii - 1, jj)[k]) / dx
    } else {
        (field.column_clamped(ii + 1, jj)[k] - center) / dx
    };
    let dfdy = if velocity.y > 0.0 {
        (center - field.column_clamped(ii, jj - 1)[k]) / dy
    } else {
        (field.column_clamped(ii, jj + 1)[k] - center) / dy
    };
    velocity.x * dfdx + velocity.y * dfdy
}

/// Thickness of the layer represented by level `k` of the `n` levels `z`
pub(crate) fn layer_thickness(z: &[f64], k: usize) -> f64 {
    let n = z.len();
    if n < 2 {
        return 0.0;
    }
    if k == 0 {
        0.5 * (z[1] - z[0])
    } else if k == n - 1 {
        0.5 * (z[n - 1] - z[n - 2])
    } else {
        0.5 * (z[k + 1] - z[k - 1])
    }
}
