
use std::fmt;

use futures::future::try_join_all;
use log::{info, warn};
use serde_json::{json, Value};

use crate::compute::Compute;
use crate::project::Project;
use crate::rest::{Error, Gns3Api, RResult};

/// The controller: the central object holding (collections of) almost everything else.
#[derive(Debug, Clone, PartialEq)]
pub struct Controller {
	/// Base URL of the API this was loaded from
	pub host: String,
	pub version: String,
	pub computes: Vec<Compute>,
	pub projects: Vec<Project>,
}

fn ids(list: &[serde_json::Map<String, Value>], key: &str) -> RResult<Vec<String>> {
	list.iter()
		.map(|m| m.get(key)
			.and_then(Value::as_str)
			.map(str::to_string)
			.ok_or_else(|| Error::InvalidArgument(format!("list entry is missing `{}`", key))))
		.collect()
}

impl Controller {
	/// Loads the controller version, every compute and every project.
	pub async fn load(api: &Gns3Api) -> RResult<Controller> {
		let version = Controller::version(api).await?;

		let computes = Controller::compute_ids(api).await?;
		let computes = try_join_all(computes.iter().map(|id| Compute::fetch(api, id))).await?;

		let projects = ids(&api.get_list("/projects").await?, "project_id")?;
		let projects = try_join_all(projects.iter().map(|id| Project::fetch(api, id))).await?;

		Ok(Controller {
			host: api.base().to_string(),
			version,
			computes,
			projects,
		})
	}

	/// Ids of every compute the controller knows about.
	pub async fn compute_ids(api: &Gns3Api) -> RResult<Vec<String>> {
		ids(&api.get_list("/computes").await?, "compute_id")
	}

	/// The version string of the controller.
	pub async fn version(api: &Gns3Api) -> RResult<String> {
		let bag = api.get_bag("/version").await?;
		bag.str("version")
			.map(str::to_string)
			.ok_or_else(|| Error::InvalidArgument("version response is missing `version`".into()))
	}

	/// Checks if the server is running version `version`.
	pub async fn assert_version(api: &Gns3Api, version: &str) -> RResult<bool> {
		let (status, _) = api.post("/version", &json!({ "version": version })).await?;
		Ok((200..300).contains(&status))
	}

	/// Dumps debug information into the `debug` directory of the controller's configuration directory.
	pub async fn debug(api: &Gns3Api) -> RResult<()> {
		api.post_expect("/debug", &json!({}), &[201]).await
			.map(|_| info!("debug information written to the configuration directory"))
			.map_err(|e| {
				warn!("failed to write debug information: {}", e);
				e
			})
	}

	/// Shuts the local server down.
	pub async fn shutdown(api: &Gns3Api) -> RResult<()> {
		api.post_expect("/shutdown", &json!({}), &[201]).await?;
		info!("controller accepted the shutdown command");
		Ok(())
	}

	pub fn project_by_name(&self, name: &str) -> Option<&Project> {
		self.projects.iter().find(|p| p.name() == Some(name))
	}
}

impl fmt::Display for Controller {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		writeln!(f, "GNS3 Controller API endpoint")?;
		writeln!(f, "    Host    {}", self.host)?;
		writeln!(f, "    Version {}", self.version)?;
		writeln!(f, "    Found   {} Projects", self.projects.len())?;
		writeln!(f, "    Running {} Computes", self.computes.len())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::compute::tests::local_compute_json;
	use crate::mock::MockController;
	use crate::project::tests::project_routes;

	#[tokio::test]
	async fn loads_everything() {
		let mut routes = project_routes("opened");
		routes.push(("GET", "/v2/version", 200, json!({ "version": "2.0.3", "local": true })));
		routes.push(("GET", "/v2/computes", 200, json!([{ "compute_id": "local" }])));
		routes.push(("GET", "/v2/computes/local", 200, local_compute_json(true)));
		// a second project that only has settings and empty collections
		routes.push(("GET", "/v2/projects/5daa48ff", 200, json!({ "project_id": "5daa48ff", "name": "Other" })));
		routes.push(("GET", "/v2/projects/5daa48ff/drawings", 200, json!([])));
		routes.push(("GET", "/v2/projects/5daa48ff/links", 200, json!([])));
		routes.push(("GET", "/v2/projects/5daa48ff/nodes", 200, json!([])));
		routes.push(("GET", "/v2/projects/5daa48ff/snapshots", 200, json!([])));
		let mock = MockController::start(routes).await;
		let api = mock.api();

		let controller = Controller::load(&api).await.unwrap();
		assert_eq!(controller.version, "2.0.3");
		assert_eq!(controller.computes.len(), 1);
		assert!(controller.computes[0].connected);
		assert_eq!(controller.projects.len(), 2);
		assert_eq!(controller.project_by_name("Basic 4 Routers").map(|p| p.nodes.len()), Some(2));

		let out = controller.to_string();
		assert!(out.contains(&format!("    Host    {}\n", api.base())));
		assert!(out.contains("    Found   2 Projects\n"));
		assert!(out.contains("    Running 1 Computes\n"));
	}

	#[tokio::test]
	async fn version_checks_and_admin_calls() {
		let mock = MockController::start(vec![
			("POST", "/v2/version", 200, json!({ "version": "2.0.3" })),
			("POST", "/v2/debug", 201, Value::Null),
			("POST", "/v2/shutdown", 403, json!({ "message": "You can only stop a local server", "status": 403 })),
		]).await;
		let api = mock.api();

		assert!(Controller::assert_version(&api, "2.0.3").await.unwrap());
		Controller::debug(&api).await.unwrap();

		let err = Controller::shutdown(&api).await.unwrap_err();
		match err {
			Error::Response(api_err) => assert_eq!(api_err.status(), Some(403)),
			other => panic!("unexpected error {:?}", other),
		}
	}

	#[tokio::test]
	async fn compute_without_id_is_an_error() {
		let mock = MockController::start(vec![
			("GET", "/v2/computes", 200, json!([{ "compute_id": "local" }, { "name": "vm" }])),
		]).await;
		let err = Controller::compute_ids(&mock.api()).await.unwrap_err();
		assert!(matches!(err, Error::InvalidArgument(ref m) if m.contains("compute_id")));
	}

	#[tokio::test]
	async fn mismatched_version_is_false() {
		let mock = MockController::start(vec![
			("POST", "/v2/version", 409, json!({ "message": "Client version 1.5 is not the same as server version 2.0.3", "status": 409 })),
		]).await;
		assert!(!Controller::assert_version(&mock.api(), "1.5").await.unwrap());
	}
}
