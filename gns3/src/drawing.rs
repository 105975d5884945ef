
use std::fmt;

use serde_json::{json, Map, Value};

use crate::attr::{materialize, AttrBag};
use crate::display::write_bag;
use crate::rest::{Gns3Api, RResult, RawApiResponse};
use crate::utils::{into_object, required_str};

/// An SVG object inside a project
#[derive(Debug, Clone, PartialEq)]
pub struct Drawing {
	pub project_id: String,
	pub drawing_id: String,
	pub settings: AttrBag,
}

impl Drawing {
	pub fn from_json(drawing: &Map<String, Value>) -> RResult<Drawing> {
		let settings = materialize(drawing);
		Ok(Drawing {
			project_id: required_str(&settings, "project_id", "drawing")?,
			drawing_id: required_str(&settings, "drawing_id", "drawing")?,
			settings,
		})
	}

	/// Places `svg` on the project's scene at `(x, y)`.
	pub async fn create(api: &Gns3Api, project_id: &str, svg: &str, x: i64, y: i64) -> RResult<Drawing> {
		let path = format!("/projects/{}/drawings", project_id);
		let rresp = api.post_expect(&path, &json!({ "svg": svg, "x": x, "y": y }), &[201]).await?;
		let value = match rresp {
			RawApiResponse::Json(v) => v,
			_ => Value::Null,
		};
		Drawing::from_json(&into_object(value, "drawing")?)
	}

	pub async fn delete(&self, api: &Gns3Api) -> RResult<()> {
		api.delete_expect(&format!("/projects/{}/drawings/{}", self.project_id, self.drawing_id)).await
	}
}

impl fmt::Display for Drawing {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write_bag(f, "GNS3Drawing:", &self.settings)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::mock::MockController;

	const SVG: &str = "<svg height=\"50\" width=\"100\"><rect height=\"50\" width=\"100\"/></svg>";

	#[tokio::test]
	async fn create_and_delete() {
		let created = json!({ "project_id": "p1", "drawing_id": "d1", "svg": SVG, "x": 10, "y": -20, "z": 1, "rotation": 0 });
		let mock = MockController::start(vec![
			("POST", "/v2/projects/p1/drawings", 201, created),
			("DELETE", "/v2/projects/p1/drawings/d1", 204, Value::Null),
		]).await;
		let api = mock.api();

		let drawing = Drawing::create(&api, "p1", SVG, 10, -20).await.unwrap();
		assert_eq!(drawing.drawing_id, "d1");
		assert_eq!(drawing.settings["y"], -20);
		assert_eq!(mock.requests()[0].body["svg"], SVG);

		drawing.delete(&api).await.unwrap();
	}

	#[test]
	fn requires_ids() {
		let m = json!({ "project_id": "p1" }).as_object().cloned().unwrap();
		assert!(Drawing::from_json(&m).is_err());
	}
}
