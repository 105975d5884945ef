
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::attr::{materialize, AttrBag};
use crate::display::write_settings;
use crate::node::Node;
use crate::rest::{json_str, Error, Gns3Api, RResult};
use crate::utils::required_str;

/// One side of a link: a port on a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkEndpoint {
	pub node_id: String,
	pub adapter_number: i64,
	pub port_number: i64,
}

/// A link between two nodes
#[derive(Debug, Clone, PartialEq)]
pub struct Link {
	pub project_id: String,
	pub link_id: String,
	pub from: LinkEndpoint,
	pub to: LinkEndpoint,
	pub from_node: Node,
	pub to_node: Node,
	pub from_port_name: String,
	pub to_port_name: String,
	pub settings: AttrBag,
}

/// Reads the two endpoints out of a link's `nodes` member.
pub fn endpoints(link: &Map<String, Value>) -> RResult<(LinkEndpoint, LinkEndpoint)> {
	let nodes = link.get("nodes")
		.and_then(Value::as_array)
		.ok_or_else(|| Error::InvalidArgument("link is missing `nodes`".into()))?;
	match nodes.as_slice() {
		[a, b, ..] => Ok((
			serde_json::from_value::<LinkEndpoint>(a.clone())?,
			serde_json::from_value::<LinkEndpoint>(b.clone())?,
		)),
		_ => Err(Error::InvalidArgument(format!("link needs two endpoints, found {}", nodes.len()))),
	}
}

impl Link {
	/// Builds a link from its JSON and both endpoint nodes, which are used to name the ports.
	pub fn from_parts(link: &Map<String, Value>, from_node: Node, to_node: Node) -> RResult<Link> {
		let settings = materialize(link);
		let (from, to) = endpoints(link)?;

		Ok(Link {
			project_id: required_str(&settings, "project_id", "link")?,
			link_id: required_str(&settings, "link_id", "link")?,
			from_port_name: from_node.port_name(from.adapter_number, from.port_number).to_string(),
			to_port_name: to_node.port_name(to.adapter_number, to.port_number).to_string(),
			from,
			to,
			from_node,
			to_node,
			settings,
		})
	}

	/// Builds a link, looking up both endpoint nodes on the controller.
	pub async fn fetch_endpoints(api: &Gns3Api, link: &Map<String, Value>) -> RResult<Link> {
		let project_id = link.get("project_id")
			.and_then(Value::as_str)
			.ok_or_else(|| Error::InvalidArgument("link is missing `project_id`".into()))?;
		let (from, to) = endpoints(link)?;

		let (from_node, to_node) = futures::future::try_join(
			Node::from_id(api, project_id, &from.node_id),
			Node::from_id(api, project_id, &to.node_id),
		).await?;

		Link::from_parts(link, from_node, to_node)
	}

	/// Connects two ports.
	pub async fn create(api: &Gns3Api, project_id: &str, a: &LinkEndpoint, b: &LinkEndpoint) -> RResult<Link> {
		let path = format!("/projects/{}/links", project_id);
		let rresp = api.post_expect(&path, &json!({ "nodes": [a, b] }), &[201]).await?;
		let link_id = json_str(&path, &rresp, "link_id")?;

		let link = api.get_json::<Map<String, Value>>(&format!("{}/{}", path, link_id)).await?;
		Link::fetch_endpoints(api, &link).await
	}

	pub async fn delete(&self, api: &Gns3Api) -> RResult<()> {
		api.delete_expect(&format!("/projects/{}/links/{}", self.project_id, self.link_id)).await
	}
}

impl fmt::Display for Link {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		fn side(node: &Node, port: &str) -> String {
			format!("{} ({})", node.name.as_deref().unwrap_or(&node.node_id), port)
		}

		let items = self.settings.iter()
			.filter(|(k, _)| *k != "nodes")
			.map(|(k, v)| (k, v.to_string()))
			.chain([
				("from", side(&self.from_node, &self.from_port_name)),
				("to", side(&self.to_node, &self.to_port_name)),
			]);
		write_settings(f, "GNS3Link settings:", items)
	}
}
