
use std::fmt;

use log::debug;
use serde_json::{json, Map, Value};

use crate::attr::{materialize, AttrBag};
use crate::display::{write_bag, write_settings};
use crate::rest::{Error, Gns3Api, RResult, RawApiResponse};
use crate::utils::{into_object, opt_string, required_str};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum NodeStatus {
	Started,
	Stopped,
	Suspended,
	/// Anything else the controller reports
	Unknown,
}
impl NodeStatus {
	pub fn from_api(s: &str) -> NodeStatus {
		match s {
			"started" => NodeStatus::Started,
			"stopped" => NodeStatus::Stopped,
			"suspended" => NodeStatus::Suspended,
			_ => NodeStatus::Unknown,
		}
	}
	pub fn as_api(&self) -> &'static str {
		match self {
			NodeStatus::Started => "started",
			NodeStatus::Stopped => "stopped",
			NodeStatus::Suspended => "suspended",
			NodeStatus::Unknown => "unknown",
		}
	}
}
impl fmt::Display for NodeStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.pad(match self {
			NodeStatus::Started => "Started",
			NodeStatus::Stopped => "Stopped",
			NodeStatus::Suspended => "Suspended",
			NodeStatus::Unknown => "Unknown",
		})
	}
}

/// A port on a [`Node`].
#[derive(Debug, Clone, PartialEq)]
pub struct NodePort {
	pub adapter_number: Option<i64>,
	pub port_number: Option<i64>,
	/// Short name, e.g. `f0/0`
	pub short_name: Option<String>,
	pub name: Option<String>,
	pub settings: AttrBag,
}
impl NodePort {
	pub fn from_json(port: &Map<String, Value>) -> NodePort {
		let settings = materialize(port);
		NodePort {
			adapter_number: settings.i64("adapter_number"),
			port_number: settings.i64("port_number"),
			short_name: opt_string(&settings, "short_name"),
			name: opt_string(&settings, "name"),
			settings,
		}
	}
}
impl fmt::Display for NodePort {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write_bag(f, "GNS3NodePort:", &self.settings)
	}
}

/// Represents a node in a project
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
	pub project_id: String,
	pub node_id: String,
	pub name: Option<String>,
	pub status: NodeStatus,
	pub node_type: Option<String>,
	pub compute_id: Option<String>,
	pub console: Option<u64>,
	pub console_type: Option<String>,
	pub console_host: Option<String>,
	/// The emulator specific `properties` section
	pub properties: AttrBag,
	pub ports: Vec<NodePort>,
	pub settings: AttrBag,
}

impl Node {
	pub fn from_json(value: Value) -> RResult<Node> {
		let map = into_object(value, "node")?;
		let settings = materialize(&map);

		let ports = map.get("ports")
			.and_then(Value::as_array)
			.map(|ports| ports.iter()
				.filter_map(Value::as_object)
				.map(NodePort::from_json)
				.collect())
			.unwrap_or_default();

		Ok(Node {
			project_id: required_str(&settings, "project_id", "node")?,
			node_id: required_str(&settings, "node_id", "node")?,
			name: opt_string(&settings, "name"),
			status: settings.str("status").map(NodeStatus::from_api).unwrap_or(NodeStatus::Unknown),
			node_type: opt_string(&settings, "node_type"),
			compute_id: opt_string(&settings, "compute_id"),
			console: settings.u64("console"),
			console_type: opt_string(&settings, "console_type"),
			console_host: opt_string(&settings, "console_host"),
			properties: settings.bag("properties").cloned().unwrap_or_default(),
			ports,
			settings,
		})
	}

	/// Loads a node from its project and node id.
	pub async fn from_id(api: &Gns3Api, project_id: &str, node_id: &str) -> RResult<Node> {
		let value = api.get_json::<Value>(&format!("/projects/{}/nodes/{}", project_id, node_id)).await?;
		Node::from_json(value)
	}

	fn path(&self) -> String {
		format!("/projects/{}/nodes/{}", self.project_id, self.node_id)
	}

	/// Returns a port's name (e.g. `f0/0`) given its adapter and port number, or `"Unknown"`.
	pub fn port_name(&self, adapter_number: i64, port_number: i64) -> &str {
		self.ports.iter()
			.find(|p| p.adapter_number == Some(adapter_number) && p.port_number == Some(port_number))
			.and_then(|p| p.short_name.as_deref())
			.unwrap_or("Unknown")
	}

	/// Re-reads the node from the controller.
	pub async fn refresh(&mut self, api: &Gns3Api) -> RResult<()> {
		*self = Node::from_id(api, &self.project_id, &self.node_id).await?;
		Ok(())
	}

	async fn action(&mut self, api: &Gns3Api, action: &str, status: NodeStatus) -> RResult<()> {
		let rresp = api.post_expect(&format!("{}/{}", self.path(), action), &json!({}), &[200, 201, 204]).await?;
		debug!("node {} {}: {}", self.node_id, action, status);

		// the controller usually answers with the updated node
		match rresp {
			RawApiResponse::Json(v @ Value::Object(_)) => {
				*self = Node::from_json(v)?;
			},
			_ => self.status = status,
		}
		Ok(())
	}

	pub async fn start(&mut self, api: &Gns3Api) -> RResult<()> {
		self.action(api, "start", NodeStatus::Started).await
	}
	pub async fn stop(&mut self, api: &Gns3Api) -> RResult<()> {
		self.action(api, "stop", NodeStatus::Stopped).await
	}
	pub async fn suspend(&mut self, api: &Gns3Api) -> RResult<()> {
		self.action(api, "suspend", NodeStatus::Suspended).await
	}
	/// Reloads (restarts) the node.
	pub async fn reload(&mut self, api: &Gns3Api) -> RResult<()> {
		self.action(api, "reload", NodeStatus::Started).await
	}

	/// Starts a stopped node, stops a started one.
	pub async fn toggle(&mut self, api: &Gns3Api) -> RResult<()> {
		match self.status {
			NodeStatus::Stopped => self.start(api).await,
			NodeStatus::Started => self.stop(api).await,
			other => Err(Error::UnsupportedStatus(format!("cannot toggle node {} while it is {}", self.node_id, other.as_api()))),
		}
	}
}

impl fmt::Display for Node {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let ports = self.ports.len().to_string();
		let items = self.settings.iter()
			.filter(|(k, _)| *k != "properties")
			.map(|(k, v)| match k {
				"ports" => (k, ports.clone()),
				"status" => (k, self.status.as_api().to_string()),
				_ => (k, v.to_string()),
			});
		write_settings(f, "GNS3Node settings:", items)
	}
}
