
use std::fmt;

use futures::future::try_join_all;
use log::{debug, info};
use serde_json::{json, Map, Value};

use crate::attr::{materialize, AttrBag};
use crate::display::{write_bag, write_settings};
use crate::drawing::Drawing;
use crate::link::Link;
use crate::node::Node;
use crate::rest::{json_str, Error, Gns3Api, RResult, RawApiResponse};
use crate::utils::required_str;

/// A project is a collection of nodes, links, drawings and snapshots.
#[derive(Debug, Clone, PartialEq)]
pub struct Project {
	pub project_id: String,
	pub settings: AttrBag,
	pub drawings: Vec<Drawing>,
	pub links: Vec<Link>,
	pub nodes: Vec<Node>,
	pub snapshots: Vec<Snapshot>,
}

impl Project {
	fn path(&self) -> String {
		format!("/projects/{}", self.project_id)
	}

	/// Loads a project and everything in it.
	pub async fn fetch(api: &Gns3Api, project_id: &str) -> RResult<Project> {
		let base = format!("/projects/{}", project_id);
		let settings = api.get_bag(&base).await?;

		let drawings_path = format!("{}/drawings", base);
		let links_path = format!("{}/links", base);
		let nodes_path = format!("{}/nodes", base);
		let snapshots_path = format!("{}/snapshots", base);
		let (drawings, links, nodes, snapshots) = futures::future::try_join4(
			api.get_list(&drawings_path),
			api.get_list(&links_path),
			api.get_list(&nodes_path),
			api.get_list(&snapshots_path),
		).await?;

		let links = try_join_all(links.iter().map(|l| Link::fetch_endpoints(api, l))).await?;

		let project = Project {
			project_id: project_id.to_string(),
			settings,
			drawings: drawings.iter().map(Drawing::from_json).collect::<RResult<_>>()?,
			links,
			nodes: nodes.into_iter().map(|n| Node::from_json(Value::Object(n))).collect::<RResult<_>>()?,
			snapshots: snapshots.iter().map(Snapshot::from_json).collect::<RResult<_>>()?,
		};
		debug!("loaded project {} ({} nodes, {} links)", project.project_id, project.nodes.len(), project.links.len());
		Ok(project)
	}

	/// Returns the first project called `name`.
	pub async fn from_name(api: &Gns3Api, name: &str) -> RResult<Project> {
		let projects = api.get_list("/projects").await?;
		let found = projects.iter()
			.find(|p| p.get("name").and_then(Value::as_str) == Some(name))
			.and_then(|p| p.get("project_id"))
			.and_then(Value::as_str);

		match found {
			Some(id) => Project::fetch(api, id).await,
			None => Err(Error::NotFound(format!("No project found with name {}", name))),
		}
	}

	/// Creates a new project called `name`. `extra` may carry any other project property, e.g.
	/// `scene_width`.
	pub async fn create(api: &Gns3Api, name: &str, extra: Map<String, Value>) -> RResult<Project> {
		let mut body = extra;
		body.insert("name".into(), Value::String(name.to_string()));

		let rresp = api.post_expect("/projects", &Value::Object(body), &[201]).await?;
		let project_id = json_str("/projects", &rresp, "project_id")?;
		info!("created project {} with id {}", name, project_id);
		Project::fetch(api, &project_id).await
	}

	/// Deletes the project from the controller.
	pub async fn delete(&self, api: &Gns3Api) -> RResult<()> {
		api.delete_expect(&self.path()).await
	}

	/// Re-reads the project's settings.
	pub async fn reload(&mut self, api: &Gns3Api) -> RResult<()> {
		self.settings = api.get_bag(&self.path()).await?;
		Ok(())
	}

	async fn post_and_reload(&mut self, api: &Gns3Api, action: &str) -> RResult<()> {
		api.post_expect(&format!("{}/{}", self.path(), action), &json!({}), &[200, 201, 204]).await?;
		self.reload(api).await
	}

	pub async fn open(&mut self, api: &Gns3Api) -> RResult<()> {
		self.post_and_reload(api, "open").await
	}
	pub async fn close(&mut self, api: &Gns3Api) -> RResult<()> {
		self.post_and_reload(api, "close").await
	}

	/// Loads a project file into the controller. Only works against a local controller.
	pub async fn load(api: &Gns3Api, path: &str) -> RResult<AttrBag> {
		let rresp = api.post_expect("/projects/load", &json!({ "path": path }), &[200, 201]).await?;
		match rresp {
			RawApiResponse::Json(v @ Value::Object(_)) => AttrBag::from_value(v),
			_ => Ok(AttrBag::new()),
		}
	}

	pub async fn start_all_nodes(&mut self, api: &Gns3Api) -> RResult<()> {
		self.post_and_reload(api, "nodes/start").await?;
		debug!("all nodes of {} have been started", self.project_id);
		Ok(())
	}
	pub async fn stop_all_nodes(&mut self, api: &Gns3Api) -> RResult<()> {
		self.post_and_reload(api, "nodes/stop").await?;
		debug!("all nodes of {} have been stopped", self.project_id);
		Ok(())
	}
	pub async fn suspend_all_nodes(&mut self, api: &Gns3Api) -> RResult<()> {
		self.post_and_reload(api, "nodes/suspend").await?;
		debug!("all nodes of {} have been suspended", self.project_id);
		Ok(())
	}

	/// Takes a snapshot of the project.
	pub async fn add_snapshot(&mut self, api: &Gns3Api, name: &str) -> RResult<&Snapshot> {
		let path = format!("{}/snapshots", self.path());
		let rresp = api.post_expect(&path, &json!({ "name": name }), &[201]).await?;
		let snapshot = match rresp {
			RawApiResponse::Json(Value::Object(m)) => Snapshot::from_json(&m)?,
			other => return Err(Error::InvalidArgument(format!("snapshot response was not an object: {:?}", other))),
		};
		self.snapshots.push(snapshot);
		self.snapshots.last()
			.ok_or_else(|| Error::NotFound(format!("snapshot {} was not recorded", name)))
	}

	/// The project's name, if it has one.
	pub fn name(&self) -> Option<&str> {
		self.settings.str("name")
	}

	pub fn node_by_name(&self, name: &str) -> Option<&Node> {
		self.nodes.iter().find(|n| n.name.as_deref() == Some(name))
	}
}

impl fmt::Display for Project {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let counts = [
			("drawings", self.drawings.len()),
			("links", self.links.len()),
			("nodes", self.nodes.len()),
			("snapshots", self.snapshots.len()),
		];
		let items = self.settings.iter()
			.map(|(k, v)| (k, v.to_string()))
			.chain(counts.iter().map(|(k, n)| (*k, n.to_string())));
		write_settings(f, "GNS3Project settings:", items)
	}
}

/// Project snapshot
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
	pub project_id: String,
	pub snapshot_id: String,
	pub settings: AttrBag,
}

impl Snapshot {
	pub fn from_json(snapshot: &Map<String, Value>) -> RResult<Snapshot> {
		let settings = materialize(snapshot);
		Ok(Snapshot {
			project_id: required_str(&settings, "project_id", "snapshot")?,
			snapshot_id: required_str(&settings, "snapshot_id", "snapshot")?,
			settings,
		})
	}

	/// Rolls the project back to this snapshot.
	pub async fn restore(&self, api: &Gns3Api) -> RResult<()> {
		let path = format!("/projects/{}/snapshots/{}/restore", self.project_id, self.snapshot_id);
		api.post_expect(&path, &json!({}), &[200, 201]).await?;
		Ok(())
	}
}

impl fmt::Display for Snapshot {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write_bag(f, "GNS3Snapshot settings:", &self.settings)
	}
}

#[cfg(test)]
pub(crate) mod tests {
	use super::*;
	use crate::mock::{MockController, Route};
	use crate::node::tests::router_json;

	pub(crate) const PROJECT_ID: &str = "a1ea2a19";

	pub(crate) fn project_json(status: &str) -> Value {
		json!({
			"project_id": PROJECT_ID,
			"name": "Basic 4 Routers",
			"status": status,
			"path": "/opt/gns3/projects/a1ea2a19",
			"auto_open": false,
			"scene_width": 2000,
			"scene_height": 1000,
			"supplier": null,
			"variables": [{ "name": "lab", "value": "1" }],
		})
	}

	/// Routes for a project with two linked routers, a drawing and a snapshot.
	pub(crate) fn project_routes(status: &str) -> Vec<Route> {
		vec![
			("GET", "/v2/projects", 200, json!([
				{ "project_id": "5daa48ff", "name": "Other" },
				{ "project_id": PROJECT_ID, "name": "Basic 4 Routers" },
			])),
			("GET", "/v2/projects/a1ea2a19", 200, project_json(status)),
			("GET", "/v2/projects/a1ea2a19/drawings", 200, json!([
				{ "project_id": PROJECT_ID, "drawing_id": "d1", "svg": "<svg/>", "x": 0, "y": 0, "z": 1 },
			])),
			("GET", "/v2/projects/a1ea2a19/links", 200, json!([{
				"project_id": PROJECT_ID,
				"link_id": "l1",
				"nodes": [
					{ "node_id": "n1", "adapter_number": 0, "port_number": 0 },
					{ "node_id": "n2", "adapter_number": 1, "port_number": 0 },
				],
			}])),
			("GET", "/v2/projects/a1ea2a19/nodes", 200, json!([
				router_json("n1", "R1", "started"),
				router_json("n2", "R2", "started"),
			])),
			("GET", "/v2/projects/a1ea2a19/nodes/n1", 200, router_json("n1", "R1", "started")),
			("GET", "/v2/projects/a1ea2a19/nodes/n2", 200, router_json("n2", "R2", "started")),
			("GET", "/v2/projects/a1ea2a19/snapshots", 200, json!([
				{ "project_id": PROJECT_ID, "snapshot_id": "s1", "name": "baseline", "created_at": 1500000000 },
			])),
		]
	}

	#[tokio::test]
	async fn loads_project_by_name() {
		let mock = MockController::start(project_routes("opened")).await;
		let project = Project::from_name(&mock.api(), "Basic 4 Routers").await.unwrap();

		assert_eq!(project.name(), Some("Basic 4 Routers"));
		assert_eq!(project.drawings.len(), 1);
		assert_eq!(project.links.len(), 1);
		assert_eq!(project.nodes.len(), 2);
		assert_eq!(project.snapshots.len(), 1);
		assert_eq!(project.links[0].to_port_name, "f1/0");
		assert_eq!(project.node_by_name("R2").map(|n| n.node_id.as_str()), Some("n2"));

		let out = project.to_string();
		assert!(out.starts_with("GNS3Project settings:\n"));
		assert!(out.contains("    nodes         2\n"));
	}

	#[tokio::test]
	async fn unknown_name_is_not_found() {
		let mock = MockController::start(project_routes("opened")).await;
		let err = Project::from_name(&mock.api(), "Nope").await.unwrap_err();
		assert!(err.is_not_found());
	}

	#[tokio::test]
	async fn create_reports_server_message() {
		let mut routes = project_routes("opened");
		routes.push(("POST", "/v2/projects", 409, json!({ "message": "Project 'Basic 4 Routers' already exists", "status": 409 })));
		let mock = MockController::start(routes).await;

		let err = Project::create(&mock.api(), "Basic 4 Routers", Map::new()).await.unwrap_err();
		assert!(err.to_string().contains("already exists"));
	}

	#[tokio::test]
	async fn create_then_delete() {
		let mut routes = project_routes("opened");
		routes.push(("POST", "/v2/projects", 201, project_json("opened")));
		routes.push(("DELETE", "/v2/projects/a1ea2a19", 204, Value::Null));
		let mock = MockController::start(routes).await;
		let api = mock.api();

		let mut extra = Map::new();
		extra.insert("scene_width".into(), json!(600));
		let project = Project::create(&api, "Basic 4 Routers", extra).await.unwrap();
		assert_eq!(project.project_id, PROJECT_ID);
		assert_eq!(mock.requests()[0].body, json!({ "name": "Basic 4 Routers", "scene_width": 600 }));

		project.delete(&api).await.unwrap();
		let lines = mock.request_lines();
		assert_eq!(lines.last().map(String::as_str), Some("DELETE /v2/projects/a1ea2a19"));
	}

	#[tokio::test]
	async fn node_group_actions_reload_settings() {
		let mut routes = project_routes("opened");
		routes.push(("POST", "/v2/projects/a1ea2a19/nodes/stop", 204, Value::Null));
		routes.push(("POST", "/v2/projects/a1ea2a19/close", 204, Value::Null));
		let mock = MockController::start(routes).await;
		let api = mock.api();

		let mut project = Project::fetch(&api, PROJECT_ID).await.unwrap();
		let before = mock.requests().len();

		project.stop_all_nodes(&api).await.unwrap();
		project.close(&api).await.unwrap();

		let lines = mock.request_lines();
		assert_eq!(&lines[before..], &[
			"POST /v2/projects/a1ea2a19/nodes/stop".to_string(),
			"GET /v2/projects/a1ea2a19".to_string(),
			"POST /v2/projects/a1ea2a19/close".to_string(),
			"GET /v2/projects/a1ea2a19".to_string(),
		][..]);
	}

	#[tokio::test]
	async fn open_start_and_suspend_all_nodes() {
		let mut routes = project_routes("closed");
		routes.push(("POST", "/v2/projects/a1ea2a19/open", 201, project_json("opened")));
		routes.push(("POST", "/v2/projects/a1ea2a19/nodes/start", 204, Value::Null));
		routes.push(("POST", "/v2/projects/a1ea2a19/nodes/suspend", 204, Value::Null));
		let mock = MockController::start(routes).await;
		let api = mock.api();

		let mut project = Project::fetch(&api, PROJECT_ID).await.unwrap();
		assert_eq!(project.settings["status"], "closed");
		let before = mock.requests().len();

		project.open(&api).await.unwrap();
		project.start_all_nodes(&api).await.unwrap();
		project.suspend_all_nodes(&api).await.unwrap();

		let lines = mock.request_lines();
		assert_eq!(&lines[before..], &[
			"POST /v2/projects/a1ea2a19/open".to_string(),
			"GET /v2/projects/a1ea2a19".to_string(),
			"POST /v2/projects/a1ea2a19/nodes/start".to_string(),
			"GET /v2/projects/a1ea2a19".to_string(),
			"POST /v2/projects/a1ea2a19/nodes/suspend".to_string(),
			"GET /v2/projects/a1ea2a19".to_string(),
		][..]);
	}

	#[tokio::test]
	async fn load_sends_the_project_file_path() {
		let mock = MockController::start(vec![
			("POST", "/v2/projects/load", 201, project_json("opened")),
		]).await;

		let settings = Project::load(&mock.api(), "/opt/gns3/projects/a1ea2a19/lab.gns3").await.unwrap();
		assert_eq!(settings["project_id"], PROJECT_ID);
		assert_eq!(settings["scene_width"], 2000);
		assert_eq!(mock.requests()[0].body, json!({ "path": "/opt/gns3/projects/a1ea2a19/lab.gns3" }));
	}

	#[tokio::test]
	async fn load_of_missing_file_fails() {
		let mock = MockController::start(vec![
			("POST", "/v2/projects/load", 403, json!({ "message": "Cannot load project from a remote controller", "status": 403 })),
		]).await;
		let err = Project::load(&mock.api(), "lab.gns3").await.unwrap_err();
		assert!(err.to_string().contains("remote controller"));
	}

	#[tokio::test]
	async fn snapshots_can_be_taken_and_restored() {
		let mut routes = project_routes("opened");
		routes.push(("POST", "/v2/projects/a1ea2a19/snapshots", 201, json!({ "project_id": PROJECT_ID, "snapshot_id": "s2", "name": "after" })));
		routes.push(("POST", "/v2/projects/a1ea2a19/snapshots/s2/restore", 201, project_json("opened")));
		let mock = MockController::start(routes).await;
		let api = mock.api();

		let mut project = Project::fetch(&api, PROJECT_ID).await.unwrap();
		let snapshot = project.add_snapshot(&api, "after").await.unwrap().clone();
		assert_eq!(snapshot.snapshot_id, "s2");
		assert_eq!(project.snapshots.len(), 2);

		snapshot.restore(&api).await.unwrap();
	}

	#[test]
	fn snapshot_requires_ids() {
		let m = json!({ "name": "baseline" }).as_object().cloned().unwrap();
		assert!(matches!(Snapshot::from_json(&m), Err(Error::InvalidArgument(_))));
	}
}
