//! Grid-scoped registry of named fields, owned by the driver. The energy
//! model never holds on to it; drivers borrow fields out of it to build an
//! `EnergyModelInputs` bundle for each step.

use crate::error::{EnergyError, EnergyResult};
use crate::field::{Field2, Field3, Ghosts, GridField, Layering};
use crate::grid::Grid;
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub enum StoredField {
    Planar(Field2),
    Layered(Field3),
}

impl StoredField {
    pub fn layering(&self) -> Layering {
        match self {
            StoredField::Planar(_) => Layering::Planar,
            StoredField::Layered(_) => Layering::Layered,
        }
    }
}

pub struct FieldStore {
    grid: Arc<Grid>,
    fields: BTreeMap<String, StoredField>,
}

impl FieldStore {
    pub fn new(grid: &Arc<Grid>) -> Self {
        Self {
            grid: Arc::clone(grid),
            fields: BTreeMap::new(),
        }
    }

    pub fn grid(&self) -> &Arc<Grid> {
        &self.grid
    }

    /// Create a zero-filled field; names are unique within the store
    pub fn create(&mut self, name: &str, layering: Layering, ghosts: Ghosts) -> EnergyResult<()> {
        if self.fields.contains_key(name) {
            return Err(EnergyError::validation(format!("field '{}' already exists", name)));
        }
        let field = match layering {
            Layering::Planar => StoredField::Planar(Field2::new(&self.grid, name, ghosts)),
            Layering::Layered => StoredField::Layered(Field3::new(&self.grid, name, ghosts)),
        };
        self.fields.insert(name.to_string(), field);
        Ok(())
    }

    /// Register a field created elsewhere, keyed by its own name
    pub fn add2(&mut self, field: Field2) -> EnergyResult<()> {
        field.check_grid(&self.grid)?;
        self.insert_unique(field.name().to_string(), StoredField::Planar(field))
    }

    pub fn add3(&mut self, field: Field3) -> EnergyResult<()> {
        field.check_grid(&self.grid)?;
        self.insert_unique(field.name().to_string(), StoredField::Layered(field))
    }

    fn insert_unique(&mut self, name: String, field: StoredField) -> EnergyResult<()> {
        if self.fields.contains_key(&name) {
            return Err(EnergyError::validation(format!("field '{}' already exists", name)));
        }
        self.fields.insert(name, field);
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn get(&self, name: &str) -> EnergyResult<&StoredField> {
        self.fields
            .get(name)
            .ok_or_else(|| EnergyError::validation(format!("field '{}' is not registered", name)))
    }

    pub fn get2(&self, name: &str) -> EnergyResult<&Field2> {
        match self.get(name)? {
            StoredField::Planar(field) => Ok(field),
            StoredField::Layered(_) => Err(EnergyError::validation(format!("field '{}' is layered, not 2D", name))),
        }
    }

    pub fn get3(&self, name: &str) -> EnergyResult<&Field3> {
        match self.get(name)? {
            StoredField::Layered(field) => Ok(field),
            StoredField::Planar(_) => Err(EnergyError::validation(format!("field '{}' is 2D, not layered", name))),
        }
    }

    pub fn get2_mut(&mut self, name: &str) -> EnergyResult<&mut Field2> {
        match self.fields.get_mut(name) {
            Some(StoredField::Planar(field)) => Ok(field),
            Some(StoredField::Layered(_)) => Err(EnergyError::validation(format!("field '{}' is layered, not 2D", name))),
            None => Err(EnergyError::validation(format!("field '{}' is not registered", name))),
        }
    }

    pub fn get3_mut(&mut self, name: &str) -> EnergyResult<&mut Field3> {
        match self.fields.get_mut(name) {
            Some(StoredField::Layered(field)) => Ok(field),
            Some(StoredField::Planar(_)) => Err(EnergyError::validation(format!("field '{}' is 2D, not layered", name))),
            None => Err(EnergyError::validation(format!("field '{}' is not registered", name))),
        }
    }

    /// Fill a field with a constant
    pub fn set(&mut self, name: &str, value: f64) -> EnergyResult<()> {
        match self.fields.get_mut(name) {
            Some(StoredField::Planar(field)) => field.set(value),
            Some(StoredField::Layered(field)) => field.set(value),
            None => return Err(EnergyError::validation(format!("field '{}' is not registered", name))),
        }
        Ok(())
    }
}
