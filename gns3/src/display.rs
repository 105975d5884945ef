use std::fmt::{self, Display};

use crate::attr::AttrBag;

/// Writes `title` followed by one indented line per entry, values aligned one column past the
/// longest key.
pub fn write_settings<K, V, I>(f: &mut fmt::Formatter<'_>, title: &str, entries: I) -> fmt::Result
	where K: AsRef<str>, V: Display, I: IntoIterator<Item = (K, V)>
{
	let entries: Vec<(K, V)> = entries.into_iter().collect();
	let width = entries.iter()
		.map(|(k, _)| k.as_ref().len())
		.max()
		.unwrap_or(0) + 1;

	writeln!(f, "{}", title)?;
	for (k, v) in &entries {
		writeln!(f, "    {:width$} {}", k.as_ref(), v, width = width)?;
	}
	Ok(())
}

/// Shorthand for a bag printed as-is.
pub fn write_bag(f: &mut fmt::Formatter<'_>, title: &str, bag: &AttrBag) -> fmt::Result {
	write_settings(f, title, bag.iter())
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	struct Block(AttrBag);
	impl Display for Block {
		fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
			write_bag(f, "Thing settings:", &self.0)
		}
	}

	#[test]
	fn aligns_values_past_longest_key() {
		let bag = AttrBag::from_value(json!({ "name": "R1", "console_type": "telnet", "x": -10 })).unwrap();
		let out = Block(bag).to_string();
		assert_eq!(out, concat!(
			"Thing settings:\n",
			"    console_type  telnet\n",
			"    name          R1\n",
			"    x             -10\n",
		));
	}

	#[test]
	fn empty_bag_prints_only_the_title() {
		assert_eq!(Block(AttrBag::new()).to_string(), "Thing settings:\n");
	}
}
