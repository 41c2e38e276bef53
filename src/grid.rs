//! Structured grid: a regular horizontal mesh with a column of vertical levels
//! at each point. The grid owns only shape and coordinates; fields refer to it
//! through a shared `Arc<Grid>`.

use crate::config::{EnergyConfig, GridParameters, VerticalSpacing};
use crate::error::{EnergyError, EnergyResult};
use std::sync::Arc;

/// Heights within this distance above `lz` still count as inside the box
const HEIGHT_TOLERANCE_M: f64 = 1.0e-6;

#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    params: GridParameters,
    x: Vec<f64>,
    y: Vec<f64>,
    z: Vec<f64>,
    dx: f64,
    dy: f64,
}

impl Grid {
    /// Build a grid; the result is shared by every field created on it
    pub fn new(params: GridParameters) -> EnergyResult<Arc<Grid>> {
        params.validate()?;

        let dx = 2.0 * params.lx / (params.mx - 1) as f64;
        let dy = 2.0 * params.ly / (params.my - 1) as f64;
        let x = (0..params.mx).map(|i| -params.lx + i as f64 * dx).collect();
        let y = (0..params.my).map(|j| -params.ly + j as f64 * dy).collect();
        let z = vertical_levels(params.mz, params.lz, params.vertical_spacing);

        Ok(Arc::new(Grid { params, x, y, z, dx, dy }))
    }

    pub fn from_config(config: &EnergyConfig) -> EnergyResult<Arc<Grid>> {
        Self::new(config.grid)
    }

    pub fn params(&self) -> &GridParameters {
        &self.params
    }

    pub fn mx(&self) -> usize {
        self.params.mx
    }

    pub fn my(&self) -> usize {
        self.params.my
    }

    pub fn mz(&self) -> usize {
        self.params.mz
    }

    pub fn lz(&self) -> f64 {
        self.params.lz
    }

    pub fn dx(&self) -> f64 {
        self.dx
    }

    pub fn dy(&self) -> f64 {
        self.dy
    }

    pub fn x(&self) -> &[f64] {
        &self.x
    }

    pub fn y(&self) -> &[f64] {
        &self.y
    }

    /// Heights of the vertical levels above the base, `z[0] == 0`, `z[mz-1] == lz`
    pub fn z(&self) -> &[f64] {
        &self.z
    }

    /// Horizontal area of one grid cell (m²)
    pub fn cell_area(&self) -> f64 {
        self.dx * self.dy
    }

    pub fn point_count(&self) -> usize {
        self.params.mx * self.params.my
    }

    /// Offset of (i, j) in a row-major 2D array
    pub fn index(&self, i: usize, j: usize) -> usize {
        j * self.params.mx + i
    }

    /// All horizontal grid points in storage order
    pub fn points(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        let mx = self.params.mx;
        (0..self.params.my).flat_map(move |j| (0..mx).map(move |i| (i, j)))
    }

    /// Index of the highest level at or below `height`
    pub fn k_below_height(&self, height: f64) -> EnergyResult<usize> {
        if height < 0.0 || height.is_nan() {
            return Err(EnergyError::validation(format!("height {} m is below the base of the grid", height)));
        }
        if height > self.params.lz + HEIGHT_TOLERANCE_M {
            return Err(EnergyError::validation(format!(
                "height {} m exceeds the top of the computational box (Lz = {} m)",
                height, self.params.lz
            )));
        }
        let k = self.z.partition_point(|&level| level <= height + HEIGHT_TOLERANCE_M);
        Ok(k.saturating_sub(1))
    }

    /// Fields on `self` can be combined with fields on `other`
    pub fn is_compatible(&self, other: &Grid) -> bool {
        std::ptr::eq(self, other) || self == other
    }
}

fn vertical_levels(mz: usize, lz: f64, spacing: VerticalSpacing) -> Vec<f64> {
    let mut z: Vec<f64> = (0..mz)
        .map(|k| {
            let zeta = k as f64 / (mz - 1) as f64;
            match spacing {
                VerticalSpacing::Equal => lz * zeta,
                VerticalSpacing::Quadratic { lambda } => lz * (zeta / lambda) * (1.0 + (lambda - 1.0) * zeta),
            }
        })
        .collect();
    z[mz - 1] = lz;
    z
}
