//! Data point registry
//!
//! The registry maps names to [`DataPoint`]s so HTTP handlers can read and
//! write device variables by name, as text.
//!
//! ## Usage
//!
//! ```rust
//! use portal_core::registry::{DataPoint, DataPointRegistry, Value, ValueSlot};
//!
//! let mut registry = DataPointRegistry::new();
//!
//! // The driver keeps `level` and updates it directly
//! let level = ValueSlot::new(Value::U8(3));
//! registry.add(DataPoint::settable("level", level.clone())).unwrap();
//!
//! registry.set_from_str("level", "7").unwrap();
//! assert_eq!(level.get(), Value::U8(7));
//! assert_eq!(registry.get("level").render(false), "7");
//! ```
//!
//! ## Registration
//!
//! Drivers register one point per exposed variable during startup. The
//! registry is then shared read-only (`Arc<DataPointRegistry>`); values
//! still change through each point's slot.
//!
//! Capacity is fixed at [`MAX_POINTS`] and lookup by name is a linear scan.

pub mod filter;
pub mod point;
pub mod text;
pub mod value;

pub use filter::{Filter, FilterKind, MAX_FILTERS};
pub use point::{DataPoint, PointView, SetHook, ValueSlot, NULL_POINT_NAME};
pub use value::{DataType, Value};

use crate::error::{Error, Result};

/// Maximum number of registered points
pub const MAX_POINTS: usize = 16;

/// Fixed-capacity, name-unique collection of data points
#[derive(Debug)]
pub struct DataPointRegistry {
    points: Vec<DataPoint>,
    null: DataPoint,
}

impl Default for DataPointRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl DataPointRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            points: Vec::with_capacity(MAX_POINTS),
            null: DataPoint::null(),
        }
    }

    /// Register a point
    ///
    /// # Returns
    ///
    /// - `Err(Error::Capacity)`: the registry already holds [`MAX_POINTS`]
    /// - `Err(Error::Duplicate)`: the name is taken or is the sentinel name
    pub fn add(&mut self, point: DataPoint) -> Result<()> {
        if self.points.len() >= MAX_POINTS {
            return Err(Error::capacity(format!(
                "registry holds at most {} data points",
                MAX_POINTS
            )));
        }
        if point.name() == NULL_POINT_NAME || self.exists(point.name()) {
            return Err(Error::duplicate(format!("data point {}", point.name())));
        }
        self.points.push(point);
        Ok(())
    }

    /// Check if a point with this name is registered
    pub fn exists(&self, name: &str) -> bool {
        self.index_of(name).is_some()
    }

    /// Look up a point by name; misses return the null sentinel
    pub fn get(&self, name: &str) -> &DataPoint {
        self.index_of(name)
            .map_or(&self.null, |idx| &self.points[idx])
    }

    /// Look up a point by registration order; misses return the null sentinel
    pub fn get_index(&self, idx: usize) -> &DataPoint {
        self.points.get(idx).unwrap_or(&self.null)
    }

    /// Set a point from text
    ///
    /// # Returns
    ///
    /// - `Ok(())`: value written
    /// - `Err(e)` with `e.is_rejection()`: no such point, or not settable
    /// - `Err(Error::InvalidValue)`: bad text, or the point's hook vetoed it
    pub fn set_from_str(&self, name: &str, text: &str) -> Result<()> {
        self.lookup(name)?.set_from_str(text)
    }

    /// Set a point from an already-typed value
    pub fn set_value(&self, name: &str, value: Value) -> Result<()> {
        self.lookup(name)?.set_value(value)
    }

    /// Number of registered points
    pub fn count(&self) -> usize {
        self.points.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DataPoint> {
        self.points.iter()
    }

    /// Points passing every filter; an empty slice selects everything
    pub fn filtered<'a>(&'a self, filters: &'a [Filter]) -> impl Iterator<Item = &'a DataPoint> {
        self.points
            .iter()
            .filter(move |p| Filter::matches_all(filters, p))
    }

    fn lookup(&self, name: &str) -> Result<&DataPoint> {
        self.index_of(name)
            .map(|idx| &self.points[idx])
            .ok_or_else(|| Error::not_found(format!("data point {}", name)))
    }

    fn index_of(&self, name: &str) -> Option<usize> {
        self.points.iter().position(|p| p.name() == name)
    }
}
