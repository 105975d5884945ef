//! Client library for the REST API (v2) of a GNS3 controller.
//!
//! Responses are kept as [`AttrBag`]s, so anything the controller sends back stays reachable by
//! key, with nested objects turned into bags of their own:
//!
//! ```no_run
//! # async fn run() -> Result<(), gns3::Error> {
//! let config = gns3::get_config(None)?;
//! let api = gns3::Gns3Api::new(config)?;
//!
//! let project = gns3::Project::from_name(&api, "Basic 4 Routers").await?;
//! for node in &project.nodes {
//! 	println!("{} ram={}", node.node_id, node.properties["ram"]);
//! }
//! # Ok(())
//! # }
//! ```

pub mod attr;
pub mod config;
pub mod rest;
pub mod display;

pub mod compute;
pub mod controller;
pub mod drawing;
pub mod link;
pub mod node;
pub mod project;
pub mod vm;

mod utils;

#[cfg(test)]
mod mock;

pub use attr::{materialize, Attr, AttrBag};
pub use config::{get_config, Config, ConfigError};
pub use rest::{Error, Gns3Api, RResult};

pub use compute::{Compute, Image};
pub use controller::Controller;
pub use drawing::Drawing;
pub use link::{Link, LinkEndpoint};
pub use node::{Node, NodePort, NodeStatus};
pub use project::{Project, Snapshot};
pub use vm::{Engine, Gns3Vm};
