//! Reactive Objects
//!
//! A [`ReactiveObject`] wraps a record whose field set is fixed when it is
//! wrapped. Reads go through [`ReactiveObject::get`], which attributes the
//! read to the running computation; writes go through
//! [`ReactiveObject::set`], which updates the record and then fires the
//! field's dependents if the value changed.
//!
//! Records plug in through the [`Fields`] capability trait rather than any
//! kind of dynamic interception. Implementations are provided for JSON
//! objects and for `IndexMap<String, V>`.
//!
//! Wrapping is shallow: a nested record stored in a field is an ordinary
//! value, so writes inside it are invisible. Replace the whole field value
//! (or wrap the nested record separately) to make the change observable.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use serde_json::{Map, Value};

use super::runtime::{Runtime, WeakRuntime};
use super::store::ObjectId;
use crate::config::ChangePolicy;
use crate::error::ReactiveError;

/// A value that can live in a reactive record field.
///
/// Truthiness only matters under [`ChangePolicy::LegacyTruthy`], where a
/// write fires only if the previous value was truthy.
pub trait FieldValue: Clone + PartialEq + 'static {
    fn is_truthy(&self) -> bool {
        true
    }
}

impl FieldValue for Value {
    fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
            Value::String(s) => !s.is_empty(),
            Value::Array(_) | Value::Object(_) => true,
        }
    }
}

impl FieldValue for bool {
    fn is_truthy(&self) -> bool {
        *self
    }
}

macro_rules! integer_field_value {
    ($($ty:ty),*) => {
        $(
            impl FieldValue for $ty {
                fn is_truthy(&self) -> bool {
                    *self != 0
                }
            }
        )*
    };
}

integer_field_value!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

impl FieldValue for f32 {
    fn is_truthy(&self) -> bool {
        *self != 0.0 && !self.is_nan()
    }
}

impl FieldValue for f64 {
    fn is_truthy(&self) -> bool {
        *self != 0.0 && !self.is_nan()
    }
}

impl FieldValue for String {
    fn is_truthy(&self) -> bool {
        !self.is_empty()
    }
}

impl FieldValue for &'static str {
    fn is_truthy(&self) -> bool {
        !self.is_empty()
    }
}

impl<T: FieldValue> FieldValue for Option<T> {
    fn is_truthy(&self) -> bool {
        self.as_ref().is_some_and(FieldValue::is_truthy)
    }
}

impl<T: Clone + PartialEq + 'static> FieldValue for Vec<T> {}

/// Read/write access to a record's named fields.
pub trait Fields: 'static {
    type Value: FieldValue;

    /// Current value of `field`, or `None` if the record has no such field.
    fn read(&self, field: &str) -> Option<Self::Value>;

    /// Store `value` into an existing field and return the old value.
    ///
    /// Returns `None` without touching the record if the field is unknown.
    fn replace(&mut self, field: &str, value: Self::Value) -> Option<Self::Value>;

    /// Whether the record has `field`.
    fn contains(&self, field: &str) -> bool;

    /// Field names in record order.
    fn field_names(&self) -> Vec<String>;
}

impl Fields for Map<String, Value> {
    type Value = Value;

    fn read(&self, field: &str) -> Option<Value> {
        self.get(field).cloned()
    }

    fn replace(&mut self, field: &str, value: Value) -> Option<Value> {
        self.get_mut(field)
            .map(|slot| std::mem::replace(slot, value))
    }

    fn contains(&self, field: &str) -> bool {
        self.contains_key(field)
    }

    fn field_names(&self) -> Vec<String> {
        self.keys().cloned().collect()
    }
}

impl<V: FieldValue> Fields for IndexMap<String, V> {
    type Value = V;

    fn read(&self, field: &str) -> Option<V> {
        self.get(field).cloned()
    }

    fn replace(&mut self, field: &str, value: V) -> Option<V> {
        self.get_mut(field)
            .map(|slot| std::mem::replace(slot, value))
    }

    fn contains(&self, field: &str) -> bool {
        self.contains_key(field)
    }

    fn field_names(&self) -> Vec<String> {
        self.keys().cloned().collect()
    }
}

/// Decide whether a write from `old` to `new` should fire dependents.
pub(crate) fn should_fire<V: FieldValue>(policy: ChangePolicy, old: &V, new: &V) -> bool {
    match policy {
        ChangePolicy::Inequality => old != new,
        ChangePolicy::LegacyTruthy => old.is_truthy() && old != new,
    }
}

/// A record whose field reads are tracked and whose writes notify dependents.
///
/// Clones share the same record and identity.
pub struct ReactiveObject<F: Fields> {
    id: ObjectId,
    data: Rc<RefCell<F>>,
    runtime: WeakRuntime,
}

impl<F: Fields> ReactiveObject<F> {
    pub(crate) fn new(runtime: &Runtime, record: F) -> Self {
        Self {
            id: ObjectId::new(),
            data: Rc::new(RefCell::new(record)),
            runtime: runtime.downgrade(),
        }
    }

    /// The object's identity in dependency keys.
    pub fn id(&self) -> ObjectId {
        self.id
    }

    /// Read `field`, registering the running computation as a dependent.
    ///
    /// Unknown fields return `None` and are not tracked.
    pub fn get(&self, field: &str) -> Option<F::Value> {
        let value = self.data.borrow().read(field)?;
        if let Some(runtime) = self.runtime.upgrade() {
            runtime.record(self.id, field);
        }
        Some(value)
    }

    /// Read `field` without tracking.
    pub fn peek(&self, field: &str) -> Option<F::Value> {
        self.data.borrow().read(field)
    }

    /// Write `field` and fire its dependents if the value changed.
    ///
    /// Writing a field that did not exist when the record was wrapped fails
    /// with [`ReactiveError::UnknownField`] and leaves the record untouched.
    pub fn set(&self, field: &str, value: F::Value) -> Result<(), ReactiveError> {
        let old = self
            .data
            .borrow_mut()
            .replace(field, value.clone())
            .ok_or_else(|| ReactiveError::UnknownField {
                object: self.id,
                field: field.to_string(),
            })?;

        let Some(runtime) = self.runtime.upgrade() else {
            return Ok(());
        };

        if should_fire(runtime.config().change_policy, &old, &value) {
            runtime.fire(self.id, field)
        } else {
            Ok(())
        }
    }

    /// Write `field` with a value computed from its current one.
    ///
    /// The current value is read untracked.
    pub fn update<U>(&self, field: &str, f: U) -> Result<(), ReactiveError>
    where
        U: FnOnce(&F::Value) -> F::Value,
    {
        let current = self.peek(field).ok_or_else(|| ReactiveError::UnknownField {
            object: self.id,
            field: field.to_string(),
        })?;
        self.set(field, f(&current))
    }

    /// Whether the record has `field`.
    pub fn contains(&self, field: &str) -> bool {
        self.data.borrow().contains(field)
    }

    /// Field names in record order.
    pub fn field_names(&self) -> Vec<String> {
        self.data.borrow().field_names()
    }

    /// Borrow the underlying record without tracking.
    ///
    /// The borrow must not write to this object.
    pub fn with<R>(&self, f: impl FnOnce(&F) -> R) -> R {
        f(&self.data.borrow())
    }
}

impl<F: Fields> Clone for ReactiveObject<F> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            data: Rc::clone(&self.data),
            runtime: self.runtime.clone(),
        }
    }
}

impl<F: Fields + fmt::Debug> fmt::Debug for ReactiveObject<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReactiveObject")
            .field("id", &self.id)
            .field("record", &self.data.borrow())
            .finish()
    }
}

impl Runtime {
    /// Wrap a record so its reads are tracked and its writes fire dependents.
    pub fn reactive<F: Fields>(&self, record: F) -> ReactiveObject<F> {
        ReactiveObject::new(self, record)
    }

    /// Wrap a JSON object.
    ///
    /// Non-object values are rejected with `None`.
    pub fn reactive_json(&self, value: Value) -> Option<ReactiveObject<Map<String, Value>>> {
        match value {
            Value::Object(map) => Some(self.reactive(map)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RuntimeConfig;
    use serde_json::json;
    use std::cell::Cell;

    fn product(rt: &Runtime) -> ReactiveObject<Map<String, Value>> {
        rt.reactive_json(json!({ "price": 5, "quantity": 2 })).unwrap()
    }

    #[test]
    fn get_and_set_round_trip() {
        let rt = Runtime::new();
        let obj = product(&rt);

        assert_eq!(obj.get("price"), Some(json!(5)));
        obj.set("price", json!(10)).unwrap();
        assert_eq!(obj.peek("price"), Some(json!(10)));
        assert_eq!(obj.field_names(), vec!["price", "quantity"]);
    }

    #[test]
    fn unknown_field_write_is_rejected() {
        let rt = Runtime::new();
        let obj = product(&rt);

        let err = obj.set("discount", json!(1)).unwrap_err();
        assert_eq!(
            err,
            ReactiveError::UnknownField {
                object: obj.id(),
                field: "discount".into()
            }
        );
        assert!(!obj.contains("discount"));
        assert_eq!(obj.get("discount"), None);
    }

    #[test]
    fn unknown_field_read_is_not_tracked() {
        let rt = Runtime::new();
        let obj = product(&rt);

        let o = obj.clone();
        rt.run(move || {
            o.get("missing");
        })
        .unwrap();

        assert_eq!(rt.tracked_keys(), 0);
    }

    #[test]
    fn write_fires_only_on_change() {
        let rt = Runtime::new();
        let obj = product(&rt);
        let runs = Rc::new(Cell::new(0));

        let o = obj.clone();
        let r = runs.clone();
        rt.run(move || {
            o.get("price");
            r.set(r.get() + 1);
        })
        .unwrap();

        obj.set("price", json!(5)).unwrap();
        assert_eq!(runs.get(), 1);

        obj.set("price", json!(6)).unwrap();
        assert_eq!(runs.get(), 2);

        // Unread field does not fire.
        obj.set("quantity", json!(9)).unwrap();
        assert_eq!(runs.get(), 2);
    }

    #[test]
    fn peek_does_not_track() {
        let rt = Runtime::new();
        let obj = product(&rt);

        let o = obj.clone();
        rt.run(move || {
            o.peek("price");
        })
        .unwrap();

        assert_eq!(rt.dependents(obj.id(), "price"), 0);
    }

    #[test]
    fn legacy_truthy_skips_falsy_old_values() {
        let config = RuntimeConfig::default().with_change_policy(ChangePolicy::LegacyTruthy);
        let rt = Runtime::with_config(config).unwrap();
        let obj = rt.reactive_json(json!({ "count": 0 })).unwrap();
        let seen = Rc::new(Cell::new(-1));

        let o = obj.clone();
        let s = seen.clone();
        rt.run(move || s.set(o.get("count").and_then(|v| v.as_i64()).unwrap_or(-1)))
            .unwrap();
        assert_eq!(seen.get(), 0);

        // Old value 0 is falsy: no fire.
        obj.set("count", json!(1)).unwrap();
        assert_eq!(seen.get(), 0);

        obj.set("count", json!(2)).unwrap();
        assert_eq!(seen.get(), 2);
    }

    #[test]
    fn indexmap_records_are_supported() {
        let rt = Runtime::new();
        let mut record = IndexMap::new();
        record.insert("width".to_string(), 3_i64);
        record.insert("height".to_string(), 4_i64);
        let rect = rt.reactive(record);
        let area = rt.cell(0_i64);

        let r = rect.clone();
        let a = area.clone();
        rt.try_run(move || {
            let w = r.get("width").unwrap_or_default();
            let h = r.get("height").unwrap_or_default();
            a.set(w * h)
        })
        .unwrap();
        assert_eq!(area.peek(), 12);

        rect.update("height", |h| h * 2).unwrap();
        assert_eq!(area.peek(), 24);
    }

    #[test]
    fn nested_records_are_not_deeply_tracked() {
        let rt = Runtime::new();
        let obj = rt
            .reactive_json(json!({ "user": { "name": "Wei" } }))
            .unwrap();
        let runs = Rc::new(Cell::new(0));

        let o = obj.clone();
        let r = runs.clone();
        rt.run(move || {
            o.get("user");
            r.set(r.get() + 1);
        })
        .unwrap();

        // Replacing the nested value is a change of "user".
        obj.set("user", json!({ "name": "Yanan" })).unwrap();
        assert_eq!(runs.get(), 2);
    }

    #[test]
    fn reactive_json_rejects_non_objects() {
        let rt = Runtime::new();
        assert!(rt.reactive_json(json!([1, 2, 3])).is_none());
    }

    #[test]
    fn json_truthiness_follows_loose_rules() {
        assert!(!json!(null).is_truthy());
        assert!(!json!(0).is_truthy());
        assert!(!json!("").is_truthy());
        assert!(!json!(false).is_truthy());
        assert!(json!(0.5).is_truthy());
        assert!(json!([]).is_truthy());
        assert!(json!({}).is_truthy());
    }

    #[test]
    fn identical_records_have_distinct_identity() {
        let rt = Runtime::new();
        let a = product(&rt);
        let b = product(&rt);
        assert_ne!(a.id(), b.id());
        assert_eq!(a.clone().id(), a.id());
    }
}
