use serde_json::{Map, Value};

use crate::attr::AttrBag;
use crate::rest::{Error, RResult};

/// Fetches a string member every resource of `kind` must carry, such as its id.
pub(crate) fn required_str(bag: &AttrBag, key: &str, kind: &str) -> RResult<String> {
	bag.str(key)
		.map(str::to_string)
		.ok_or_else(|| Error::InvalidArgument(format!("{} is missing `{}`", kind, key)))
}

pub(crate) fn into_object(value: Value, kind: &str) -> RResult<Map<String, Value>> {
	match value {
		Value::Object(m) => Ok(m),
		other => Err(Error::InvalidArgument(format!("expected a JSON object for {}, found `{}`", kind, other))),
	}
}

pub(crate) fn opt_string(bag: &AttrBag, key: &str) -> Option<String> {
	bag.str(key).map(str::to_string)
}
