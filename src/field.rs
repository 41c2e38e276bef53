//! Named arrays on a grid: 2D scalar fields, the cell classification mask, and
//! layered 3D fields with one value per vertical level.
//!
//! Storage covers the whole domain. Neighbour lookups clamp at the domain
//! edge, which is what a halo of width `Ghosts::WithGhosts { width }` would
//! provide on a partitioned grid.

use crate::error::{EnergyError, EnergyResult};
use crate::grid::Grid;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Halo mode, fixed when a field is created
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Ghosts {
    WithoutGhosts,
    WithGhosts { width: usize },
}

impl Ghosts {
    pub fn stencil_width(&self) -> usize {
        match self {
            Ghosts::WithoutGhosts => 0,
            Ghosts::WithGhosts { width } => *width,
        }
    }
}

/// Whether a field is 2D or carries a column of vertical levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Layering {
    Planar,
    Layered,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMetadata {
    pub name: String,
    pub long_name: String,
    pub units: String,
}

impl FieldMetadata {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            long_name: String::new(),
            units: String::new(),
        }
    }
}

/// Common view of every field kind
pub trait GridField {
    fn grid(&self) -> &Arc<Grid>;

    fn metadata(&self) -> &FieldMetadata;

    fn ghosts(&self) -> Ghosts;

    fn layering(&self) -> Layering;

    fn name(&self) -> &str {
        &self.metadata().name
    }

    /// Array shape as stored: `[my, mx]` or `[my, mx, mz]`
    fn shape(&self) -> Vec<usize> {
        let grid = self.grid();
        match self.layering() {
            Layering::Planar => vec![grid.my(), grid.mx()],
            Layering::Layered => vec![grid.my(), grid.mx(), grid.mz()],
        }
    }

    /// Fail unless the field lives on a grid compatible with `grid`
    fn check_grid(&self, grid: &Grid) -> EnergyResult<()> {
        if self.grid().is_compatible(grid) {
            Ok(())
        } else {
            Err(EnergyError::validation(format!(
                "field '{}' is defined on a different grid ({}x{}x{}, expected {}x{}x{})",
                self.name(),
                self.grid().mx(),
                self.grid().my(),
                self.grid().mz(),
                grid.mx(),
                grid.my(),
                grid.mz()
            )))
        }
    }
}

fn clamp_index(index: isize, len: usize) -> usize {
    index.clamp(0, len as isize - 1) as usize
}

/// 2D scalar field
#[derive(Debug, Clone, PartialEq)]
pub struct Field2 {
    grid: Arc<Grid>,
    metadata: FieldMetadata,
    ghosts: Ghosts,
    data: Vec<f64>,
}

impl Field2 {
    pub fn new(grid: &Arc<Grid>, name: &str, ghosts: Ghosts) -> Self {
        Self {
            grid: Arc::clone(grid),
            metadata: FieldMetadata::new(name),
            ghosts,
            data: vec![0.0; grid.point_count()],
        }
    }

    pub fn with_attrs(mut self, long_name: &str, units: &str) -> Self {
        self.metadata.long_name = long_name.to_string();
        self.metadata.units = units.to_string();
        self
    }

    pub fn set(&mut self, value: f64) {
        self.data.fill(value);
    }

    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.data[self.grid.index(i, j)]
    }

    pub fn set_at(&mut self, i: usize, j: usize, value: f64) {
        let idx = self.grid.index(i, j);
        self.data[idx] = value;
    }

    /// Value at (i, j) with indices clamped to the domain
    pub fn get_clamped(&self, i: isize, j: isize) -> f64 {
        self.get(clamp_index(i, self.grid.mx()), clamp_index(j, self.grid.my()))
    }

    pub fn values(&self) -> &[f64] {
        &self.data
    }

    pub fn values_mut(&mut self) -> &mut [f64] {
        &mut self.data
    }

    /// Replace all values; `values` must match the grid size
    pub fn set_values(&mut self, values: &[f64]) -> EnergyResult<()> {
        if values.len() != self.data.len() {
            return Err(EnergyError::validation(format!(
                "field '{}' expects {} values, got {}",
                self.metadata.name,
                self.data.len(),
                values.len()
            )));
        }
        self.data.copy_from_slice(values);
        Ok(())
    }

    pub fn copy_from(&mut self, other: &Field2) -> EnergyResult<()> {
        other.check_grid(&self.grid)?;
        self.data.copy_from_slice(&other.data);
        Ok(())
    }

    pub fn min(&self) -> f64 {
        self.data.iter().copied().fold(f64::INFINITY, f64::min)
    }

    pub fn max(&self) -> f64 {
        self.data.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }

    pub fn sum(&self) -> f64 {
        self.data.iter().sum()
    }
}

impl GridField for Field2 {
    fn grid(&self) -> &Arc<Grid> {
        &self.grid
    }

    fn metadata(&self) -> &FieldMetadata {
        &self.metadata
    }

    fn ghosts(&self) -> Ghosts {
        self.ghosts
    }

    fn layering(&self) -> Layering {
        Layering::Planar
    }
}

/// Cell classification codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum CellType {
    IceFreeBedrock = 0,
    Grounded = 2,
    Floating = 3,
    IceFreeOcean = 4,
}

impl CellType {
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(CellType::IceFreeBedrock),
            2 => Some(CellType::Grounded),
            3 => Some(CellType::Floating),
            4 => Some(CellType::IceFreeOcean),
            _ => None,
        }
    }

    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn icy(self) -> bool {
        matches!(self, CellType::Grounded | CellType::Floating)
    }

    pub fn grounded_ice(self) -> bool {
        self == CellType::Grounded
    }

    pub fn floating_ice(self) -> bool {
        self == CellType::Floating
    }

    pub fn ice_free(self) -> bool {
        !self.icy()
    }
}

/// Cell classification mask
#[derive(Debug, Clone, PartialEq)]
pub struct CellTypeField {
    grid: Arc<Grid>,
    metadata: FieldMetadata,
    ghosts: Ghosts,
    data: Vec<CellType>,
}

impl CellTypeField {
    pub fn new(grid: &Arc<Grid>, name: &str, ghosts: Ghosts) -> Self {
        Self {
            grid: Arc::clone(grid),
            metadata: FieldMetadata::new(name),
            ghosts,
            data: vec![CellType::IceFreeBedrock; grid.point_count()],
        }
    }

    pub fn set(&mut self, cell_type: CellType) {
        self.data.fill(cell_type);
    }

    pub fn get(&self, i: usize, j: usize) -> CellType {
        self.data[self.grid.index(i, j)]
    }

    pub fn set_at(&mut self, i: usize, j: usize, cell_type: CellType) {
        let idx = self.grid.index(i, j);
        self.data[idx] = cell_type;
    }
}

impl GridField for CellTypeField {
    fn grid(&self) -> &Arc<Grid> {
        &self.grid
    }

    fn metadata(&self) -> &FieldMetadata {
        &self.metadata
    }

    fn ghosts(&self) -> Ghosts {
        self.ghosts
    }

    fn layering(&self) -> Layering {
        Layering::Planar
    }
}

/// Layered 3D field, stored column by column
#[derive(Debug, Clone, PartialEq)]
pub struct Field3 {
    grid: Arc<Grid>,
    metadata: FieldMetadata,
    ghosts: Ghosts,
    data: Vec<f64>,
}

impl Field3 {
    pub fn new(grid: &Arc<Grid>, name: &str, ghosts: Ghosts) -> Self {
        Self {
            grid: Arc::clone(grid),
            metadata: FieldMetadata::new(name),
            ghosts,
            data: vec![0.0; grid.point_count() * grid.mz()],
        }
    }

    pub fn with_attrs(mut self, long_name: &str, units: &str) -> Self {
        self.metadata.long_name = long_name.to_string();
        self.metadata.units = units.to_string();
        self
    }

    fn column_range(&self, i: usize, j: usize) -> std::ops::Range<usize> {
        let mz = self.grid.mz();
        let start = self.grid.index(i, j) * mz;
        start..start + mz
    }

    pub fn set(&mut self, value: f64) {
        self.data.fill(value);
    }

    pub fn get(&self, i: usize, j: usize, k: usize) -> f64 {
        self.column(i, j)[k]
    }

    pub fn column(&self, i: usize, j: usize) -> &[f64] {
        &self.data[self.column_range(i, j)]
    }

    pub fn column_mut(&mut self, i: usize, j: usize) -> &mut [f64] {
        let range = self.column_range(i, j);
        &mut self.data[range]
    }

    /// Column at (i, j) with indices clamped to the domain
    pub fn column_clamped(&self, i: isize, j: isize) -> &[f64] {
        self.column(clamp_index(i, self.grid.mx()), clamp_index(j, self.grid.my()))
    }

    pub fn values(&self) -> &[f64] {
        &self.data
    }

    pub fn set_values(&mut self, values: &[f64]) -> EnergyResult<()> {
        if values.len() != self.data.len() {
            return Err(EnergyError::validation(format!(
                "field '{}' expects {} values, got {}",
                self.metadata.name,
                self.data.len(),
                values.len()
            )));
        }
        self.data.copy_from_slice(values);
        Ok(())
    }

    pub fn copy_from(&mut self, other: &Field3) -> EnergyResult<()> {
        other.check_grid(&self.grid)?;
        self.data.copy_from_slice(&other.data);
        Ok(())
    }

    pub fn min(&self) -> f64 {
        self.data.iter().copied().fold(f64::INFINITY, f64::min)
    }

    pub fn max(&self) -> f64 {
        self.data.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }
}

impl GridField for Field3 {
    fn grid(&self) -> &Arc<Grid> {
        &self.grid
    }

    fn metadata(&self) -> &FieldMetadata {
        &self.metadata
    }

    fn ghosts(&self) -> Ghosts {
        self.ghosts
    }

    fn layering(&self) -> Layering {
        Layering::Layered
    }
}
