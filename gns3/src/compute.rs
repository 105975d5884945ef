
use std::fmt;

use log::debug;
use serde_json::{Map, Value};

use crate::attr::{materialize, AttrBag};
use crate::display::write_bag;
use crate::rest::{Gns3Api, RResult};
use crate::utils::into_object;

/// Compute endpoint which handles the actual simulation.
#[derive(Debug, Clone, PartialEq)]
pub struct Compute {
	pub id: String,
	pub connected: bool,
	/// The compute's settings, with its `capabilities` pulled up to the top level
	pub settings: AttrBag,
}

impl Compute {
	/// Builds a compute from its controller response.
	///
	/// When the compute is connected, the members of `capabilities` are merged into the top level.
	/// The `capabilities` member itself is always dropped.
	pub fn from_json(id: &str, value: Value) -> RResult<Compute> {
		let mut map = into_object(value, "compute")?;
		let connected = map.get("connected").and_then(Value::as_bool).unwrap_or(false);

		if let Some(capabilities) = map.remove("capabilities") {
			if let (true, Value::Object(caps)) = (connected, capabilities) {
				map.extend(caps);
			}
		}

		Ok(Compute {
			id: id.to_string(),
			connected,
			settings: materialize(&map),
		})
	}

	pub async fn fetch(api: &Gns3Api, id: &str) -> RResult<Compute> {
		let value = api.get_json::<Value>(&format!("/computes/{}", id)).await?;
		Compute::from_json(id, value)
	}

	/// Lists the image files available for `emulator` (e.g. `qemu`, `dynamips`). A disconnected
	/// compute has none.
	pub async fn images(&self, api: &Gns3Api, emulator: &str) -> RResult<Vec<Image>> {
		if !self.connected {
			debug!("compute {} is not connected, not listing {} images", self.id, emulator);
			return Ok(Vec::new());
		}

		let images = api.get_list(&format!("/computes/{}/{}/images", self.id, emulator)).await?;
		Ok(images.iter().map(Image::from_json).collect())
	}
}

impl fmt::Display for Compute {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write_bag(f, "GNS3Compute settings:", &self.settings)
	}
}

/// An image available on a compute for a given emulator
#[derive(Debug, Clone, PartialEq)]
pub struct Image {
	pub filename: Option<String>,
	pub settings: AttrBag,
}

impl Image {
	pub fn from_json(image: &Map<String, Value>) -> Image {
		let settings = materialize(image);
		Image {
			filename: settings.str("filename").map(str::to_string),
			settings,
		}
	}
}

impl fmt::Display for Image {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write_bag(f, "GNS3Image settings:", &self.settings)
	}
}
