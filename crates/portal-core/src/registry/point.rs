// # Data Points
//
// A data point is a named, typed view onto one device variable. The
// variable itself lives in a `ValueSlot`, a shared handle the owning driver
// keeps a clone of, so the driver and the HTTP handlers see the same value.
// The slot's mutex is the exclusive-access guard: reads and writes from
// either side are serialized per slot.

use serde::Serialize;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::value::{DataType, Value};
use crate::error::{Error, Result};

/// Name reserved for the lookup-failure sentinel
pub const NULL_POINT_NAME: &str = "NULL";

/// Hook consulted before every write; returning `false` vetoes it
pub type SetHook = Box<dyn Fn(&Value) -> bool + Send + Sync>;

/// Shared, lock-guarded storage for one device variable
///
/// The slot's type is fixed by its initial value; writes of another type
/// are refused.
#[derive(Debug, Clone)]
pub struct ValueSlot {
    ty: DataType,
    inner: Arc<Mutex<Value>>,
}

impl ValueSlot {
    pub fn new(initial: Value) -> Self {
        Self {
            ty: initial.data_type(),
            inner: Arc::new(Mutex::new(initial)),
        }
    }

    pub fn data_type(&self) -> DataType {
        self.ty
    }

    /// Snapshot of the current value
    pub fn get(&self) -> Value {
        self.lock().clone()
    }

    /// Replace the value, refusing a change of type
    pub fn set(&self, value: Value) -> Result<()> {
        if value.data_type() != self.ty {
            return Err(Error::invalid_value(format!(
                "expected type {}, got {}",
                self.ty,
                value.data_type()
            )));
        }
        *self.lock() = value;
        Ok(())
    }

    /// Run `f` with exclusive access to the value
    ///
    /// `f` must not change the variant.
    pub fn with<R>(&self, f: impl FnOnce(&mut Value) -> R) -> R {
        f(&mut self.lock())
    }

    fn lock(&self) -> MutexGuard<'_, Value> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Listing form of a point: `{"val": "..", "m": 0|1, "t": <tag>}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PointView {
    /// Rendered value
    pub val: String,
    /// 1 if settable
    pub m: u8,
    /// Type tag
    pub t: u8,
}

/// A named, typed, optionally settable device variable
pub struct DataPoint {
    name: String,
    slot: Option<ValueSlot>,
    ty: DataType,
    settable: bool,
    hook: Option<SetHook>,
}

impl DataPoint {
    /// A point that accepts writes
    pub fn settable(name: impl Into<String>, slot: ValueSlot) -> Self {
        Self::build(name.into(), Some(slot), true)
    }

    /// A point that can only be read
    pub fn read_only(name: impl Into<String>, slot: ValueSlot) -> Self {
        Self::build(name.into(), Some(slot), false)
    }

    /// The sentinel returned when a lookup fails
    pub fn null() -> Self {
        Self {
            name: NULL_POINT_NAME.to_string(),
            slot: None,
            ty: DataType::Void,
            settable: false,
            hook: None,
        }
    }

    fn build(name: String, slot: Option<ValueSlot>, settable: bool) -> Self {
        let ty = slot.as_ref().map_or(DataType::Void, ValueSlot::data_type);
        Self {
            name,
            slot,
            ty,
            settable,
            hook: None,
        }
    }

    /// Attach a setter hook that may veto writes
    pub fn with_hook(mut self, hook: impl Fn(&Value) -> bool + Send + Sync + 'static) -> Self {
        self.hook = Some(Box::new(hook));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data_type(&self) -> DataType {
        self.ty
    }

    pub fn is_settable(&self) -> bool {
        self.settable
    }

    /// Whether this is the lookup-failure sentinel
    pub fn is_null(&self) -> bool {
        self.slot.is_none()
    }

    /// Current value; the null sentinel reads as [`Value::Void`]
    pub fn value(&self) -> Value {
        self.slot.as_ref().map_or(Value::Void, ValueSlot::get)
    }

    /// Validate `text`, consult the hook, then write
    pub fn set_from_str(&self, text: &str) -> Result<()> {
        let slot = self.writable_slot()?;
        let value = Value::parse(self.ty, text).ok_or_else(|| {
            Error::invalid_value(format!("'{}' is not a valid {:?} for {}", text, self.ty, self.name))
        })?;
        self.apply(slot, value)
    }

    /// Write an already-typed value, consulting the hook
    pub fn set_value(&self, value: Value) -> Result<()> {
        let slot = self.writable_slot()?;
        if value.data_type() != self.ty {
            return Err(Error::invalid_value(format!(
                "{} holds type {}, got {}",
                self.name,
                self.ty,
                value.data_type()
            )));
        }
        self.apply(slot, value)
    }

    /// Render the current value as text
    pub fn render(&self, human_time: bool) -> String {
        match &self.slot {
            Some(slot) => slot.with(|v| v.render(human_time)),
            None => "null".to_string(),
        }
    }

    /// Listing form of the point
    pub fn view(&self, human_time: bool) -> PointView {
        PointView {
            val: self.render(human_time),
            m: u8::from(self.settable),
            t: self.ty.tag(),
        }
    }

    fn writable_slot(&self) -> Result<&ValueSlot> {
        if !self.settable {
            return Err(Error::rejected(format!("{} is not settable", self.name)));
        }
        self.slot
            .as_ref()
            .ok_or_else(|| Error::rejected(format!("{} has no value slot", self.name)))
    }

    fn apply(&self, slot: &ValueSlot, value: Value) -> Result<()> {
        if let Some(hook) = &self.hook {
            if !hook(&value) {
                return Err(Error::invalid_value(format!("{} refused the value", self.name)));
            }
        }
        slot.set(value)
    }
}

impl fmt::Debug for DataPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataPoint")
            .field("name", &self.name)
            .field("type", &self.ty)
            .field("settable", &self.settable)
            .field("value", &self.value())
            .field("hooked", &self.hook.is_some())
            .finish()
    }
}

/// Points compare by name only
impl PartialEq for DataPoint {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}
