//! Attribute bags: JSON objects turned into key-addressable structures.
//!
//! Whatever the controller returns for a resource, [`materialize`] makes every member reachable
//! by name, with nested objects converted into bags of their own. Arrays are stored as-is: objects
//! inside an array stay raw [`Value`]s.

use std::collections::BTreeMap;
use std::fmt;
use std::ops::Index;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Number, Value};

use crate::Error;

static NULL: Attr = Attr::Null;

/// A single materialized value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Attr {
	Null,
	Bool(bool),
	Number(Number),
	String(String),
	/// Kept exactly as decoded. Elements are never converted, even when they are objects.
	Array(Vec<Value>),
	Bag(AttrBag),
}

impl Attr {
	fn from_json(value: &Value) -> Attr {
		match value {
			Value::Null => Attr::Null,
			Value::Bool(b) => Attr::Bool(*b),
			Value::Number(n) => Attr::Number(n.clone()),
			Value::String(s) => Attr::String(s.clone()),
			Value::Array(a) => Attr::Array(a.clone()),
			Value::Object(m) => Attr::Bag(materialize(m)),
		}
	}

	pub fn is_null(&self) -> bool {
		matches!(self, Attr::Null)
	}
	pub fn as_str(&self) -> Option<&str> {
		match self {
			Attr::String(s) => Some(s),
			_ => None,
		}
	}
	pub fn as_i64(&self) -> Option<i64> {
		match self {
			Attr::Number(n) => n.as_i64(),
			_ => None,
		}
	}
	pub fn as_u64(&self) -> Option<u64> {
		match self {
			Attr::Number(n) => n.as_u64(),
			_ => None,
		}
	}
	pub fn as_f64(&self) -> Option<f64> {
		match self {
			Attr::Number(n) => n.as_f64(),
			_ => None,
		}
	}
	pub fn as_bool(&self) -> Option<bool> {
		match self {
			Attr::Bool(b) => Some(*b),
			_ => None,
		}
	}
	pub fn as_array(&self) -> Option<&[Value]> {
		match self {
			Attr::Array(a) => Some(a),
			_ => None,
		}
	}
	pub fn as_bag(&self) -> Option<&AttrBag> {
		match self {
			Attr::Bag(b) => Some(b),
			_ => None,
		}
	}

	/// Projects the value back into plain JSON.
	pub fn to_value(&self) -> Value {
		match self {
			Attr::Null => Value::Null,
			Attr::Bool(b) => Value::Bool(*b),
			Attr::Number(n) => Value::Number(n.clone()),
			Attr::String(s) => Value::String(s.clone()),
			Attr::Array(a) => Value::Array(a.clone()),
			Attr::Bag(b) => b.to_value(),
		}
	}
}

impl fmt::Display for Attr {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Attr::String(s) => f.write_str(s),
			other => write!(f, "{}", other.to_value()),
		}
	}
}

impl PartialEq<str> for Attr {
	fn eq(&self, other: &str) -> bool {
		self.as_str() == Some(other)
	}
}
impl PartialEq<&str> for Attr {
	fn eq(&self, other: &&str) -> bool {
		self.as_str() == Some(*other)
	}
}
macro_rules! partial_eq_int {
	($($signed:ty),* ; $($unsigned:ty),*) => {
		$(impl PartialEq<$signed> for Attr {
			fn eq(&self, other: &$signed) -> bool {
				self.as_i64() == Some(*other as i64)
			}
		})*
		$(impl PartialEq<$unsigned> for Attr {
			fn eq(&self, other: &$unsigned) -> bool {
				self.as_u64() == Some(*other as u64)
			}
		})*
	};
}
partial_eq_int!(i32, i64; u32, u64, usize);
impl PartialEq<bool> for Attr {
	fn eq(&self, other: &bool) -> bool {
		self.as_bool() == Some(*other)
	}
}

impl<'a> Index<&'a str> for Attr {
	type Output = Attr;
	/// Indexes into a nested bag. Anything that isn't a bag, or a missing key, yields `Attr::Null`.
	fn index(&self, key: &'a str) -> &Attr {
		match self {
			Attr::Bag(b) => &b[key],
			_ => &NULL,
		}
	}
}

/// The materialized form of a JSON object.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct AttrBag {
	entries: BTreeMap<String, Attr>,
}

/// Converts an object into an [`AttrBag`].
///
/// Every key is kept. Values that are themselves objects are materialized recursively; all other
/// values, arrays included, are copied unchanged.
pub fn materialize(map: &Map<String, Value>) -> AttrBag {
	AttrBag {
		entries: map.iter()
			.map(|(k, v)| (k.clone(), Attr::from_json(v)))
			.collect(),
	}
}

impl AttrBag {
	pub fn new() -> AttrBag {
		AttrBag::default()
	}

	/// Materializes any decoded JSON document. Only objects are accepted.
	pub fn from_value(value: Value) -> Result<AttrBag, Error> {
		match value {
			Value::Object(m) => Ok(materialize(&m)),
			other => Err(Error::InvalidArgument(format!("expected a JSON object, found `{}`", other))),
		}
	}

	pub fn get(&self, key: &str) -> Option<&Attr> {
		self.entries.get(key)
	}
	pub fn contains_key(&self, key: &str) -> bool {
		self.entries.contains_key(key)
	}
	pub fn keys(&self) -> impl Iterator<Item = &str> {
		self.entries.keys().map(|k| k.as_str())
	}
	pub fn iter(&self) -> impl Iterator<Item = (&str, &Attr)> {
		self.entries.iter().map(|(k, v)| (k.as_str(), v))
	}
	pub fn len(&self) -> usize {
		self.entries.len()
	}
	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	pub fn str(&self, key: &str) -> Option<&str> {
		self.get(key).and_then(Attr::as_str)
	}
	pub fn i64(&self, key: &str) -> Option<i64> {
		self.get(key).and_then(Attr::as_i64)
	}
	pub fn u64(&self, key: &str) -> Option<u64> {
		self.get(key).and_then(Attr::as_u64)
	}
	pub fn f64(&self, key: &str) -> Option<f64> {
		self.get(key).and_then(Attr::as_f64)
	}
	pub fn bool(&self, key: &str) -> Option<bool> {
		self.get(key).and_then(Attr::as_bool)
	}
	pub fn array(&self, key: &str) -> Option<&[Value]> {
		self.get(key).and_then(Attr::as_array)
	}
	pub fn bag(&self, key: &str) -> Option<&AttrBag> {
		self.get(key).and_then(Attr::as_bag)
	}

	/// Follows a chain of keys through nested bags, `&["a", "b", "c"]` being `.a.b.c`.
	pub fn path(&self, keys: &[&str]) -> Option<&Attr> {
		let (last, parents) = keys.split_last()?;
		let mut bag = self;
		for k in parents {
			bag = bag.bag(k)?;
		}
		bag.get(last)
	}

	/// Projects the bag back into a plain JSON object.
	pub fn to_value(&self) -> Value {
		Value::Object(self.to_map())
	}
	pub fn to_map(&self) -> Map<String, Value> {
		self.entries.iter()
			.map(|(k, v)| (k.clone(), v.to_value()))
			.collect()
	}
}

impl<'a> Index<&'a str> for AttrBag {
	type Output = Attr;
	fn index(&self, key: &'a str) -> &Attr {
		self.entries.get(key).unwrap_or(&NULL)
	}
}

impl From<&Map<String, Value>> for AttrBag {
	fn from(m: &Map<String, Value>) -> AttrBag {
		materialize(m)
	}
}

impl<'de> Deserialize<'de> for AttrBag {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<AttrBag, D::Error> {
		let map = Map::<String, Value>::deserialize(deserializer)?;
		Ok(materialize(&map))
	}
}
