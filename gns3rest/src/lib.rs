
use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use log::debug;
use serde_json::Value;

use gns3::{Compute, Controller, Error as RestError, Gns3Api, Gns3Vm, Node, Project};

#[derive(Parser)]
#[command(version, about = "Query and drive a GNS3 controller")]
pub struct Args {
	/// Emit the raw JSON settings instead of formatted output
	#[arg(short, long)]
	pub json: bool,

	/// Read the controller settings from this gns3_server.conf
	#[arg(long, value_name = "FILE")]
	pub config: Option<PathBuf>,

	#[command(subcommand)]
	rootsubcmd: SubCmdRoot,
}
impl Args {
	pub async fn handle(&self, client: &Gns3Api) -> Result<(), RestError> {
		self.rootsubcmd.handle(self, client).await
	}
}

#[derive(Subcommand)]
pub enum SubCmdRoot {
	/// Controller version
	Version,
	/// Computes known to the controller
	Computes,
	/// Images a compute has for an emulator
	Images { compute: String, emulator: String },
	/// All projects
	Projects,
	/// A project's settings
	Project(ProjectID),
	/// The nodes of a project
	Nodes(ProjectID),
	/// The links of a project
	Links(ProjectID),
	/// Start every node of a project
	Start(ProjectID),
	/// Stop every node of a project
	Stop(ProjectID),
	/// Suspend every node of a project
	Suspend(ProjectID),
	/// Act on a single node
	Node {
		project: String,
		/// Node name or id
		node: String,
		#[arg(value_enum)]
		action: NodeAction,
	},
	/// Create an empty project
	Create { name: String },
	/// Delete a project
	Delete(ProjectID),
	/// The GNS3 VM and its engines
	Vm,
	/// Dump controller debug information to disk
	Debug,
	/// Shut the (local) controller down
	Shutdown,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum NodeAction {
	Show,
	Start,
	Stop,
	Suspend,
	Reload,
	Toggle,
}

#[derive(clap::Args)]
pub struct ProjectID {
	/// Project name or id
	arg: String,
}

/// Finds a project by name, falling back to treating `query` as its id.
async fn find_project(client: &Gns3Api, query: &str) -> Result<Project, RestError> {
	let query = query.trim();
	match Project::from_name(client, query).await {
		Err(e) if e.is_not_found() => {
			debug!("no project named {}, trying it as an id", query);
			Project::fetch(client, query).await
		},
		other => other,
	}
}

fn print_json(value: &Value) -> Result<(), RestError> {
	println!("{}", serde_json::to_string_pretty(value)?);
	Ok(())
}

impl SubCmdRoot {
	async fn handle(&self, args: &Args, client: &Gns3Api) -> Result<(), RestError> {
		match self {
			SubCmdRoot::Version => {
				let version = Controller::version(client).await?;
				if args.json {
					print_json(&Value::String(version))?;
				} else {
					println!("GNS3 controller at {} runs version {}", client.base(), version);
				}
			},
			SubCmdRoot::Computes => {
				for id in Controller::compute_ids(client).await? {
					let compute = Compute::fetch(client, &id).await?;
					if args.json {
						print_json(&compute.settings.to_value())?;
					} else {
						println!("{}", compute);
					}
				}
			},
			SubCmdRoot::Images { compute, emulator } => {
				let compute = Compute::fetch(client, compute).await?;
				let images = compute.images(client, emulator).await?;
				if args.json {
					print_json(&Value::Array(images.iter().map(|i| i.settings.to_value()).collect()))?;
				} else if images.is_empty() {
					println!("No {} images on {} (connected: {})", emulator, compute.id, compute.connected);
				} else {
					images.iter().for_each(|i| println!("{}", i));
				}
			},
			SubCmdRoot::Projects => {
				let projects = client.get_list("/projects").await?;
				if args.json {
					print_json(&Value::Array(projects.into_iter().map(Value::Object).collect()))?;
				} else {
					for p in &projects {
						let field = |k: &str| p.get(k).and_then(Value::as_str).unwrap_or("-").to_string();
						println!("{}  {:<8} {}", field("project_id"), field("status"), field("name"));
					}
				}
			},
			SubCmdRoot::Project(ProjectID { arg }) => {
				let project = find_project(client, arg).await?;
				if args.json {
					print_json(&project.settings.to_value())?;
				} else {
					println!("{}", project);
				}
			},
			SubCmdRoot::Nodes(ProjectID { arg }) => {
				let project = find_project(client, arg).await?;
				if args.json {
					print_json(&Value::Array(project.nodes.iter().map(|n| n.settings.to_value()).collect()))?;
				} else {
					for n in &project.nodes {
						println!("{}  {:<9} {:<14} {}", n.node_id, n.status, n.node_type.as_deref().unwrap_or("-"), n.name.as_deref().unwrap_or("-"));
					}
				}
			},
			SubCmdRoot::Links(ProjectID { arg }) => {
				let project = find_project(client, arg).await?;
				if args.json {
					print_json(&Value::Array(project.links.iter().map(|l| l.settings.to_value()).collect()))?;
				} else {
					project.links.iter().for_each(|l| println!("{}", l));
				}
			},
			SubCmdRoot::Start(ProjectID { arg }) => find_project(client, arg).await?.start_all_nodes(client).await?,
			SubCmdRoot::Stop(ProjectID { arg }) => find_project(client, arg).await?.stop_all_nodes(client).await?,
			SubCmdRoot::Suspend(ProjectID { arg }) => find_project(client, arg).await?.suspend_all_nodes(client).await?,
			SubCmdRoot::Node { project, node, action } => {
				let project = find_project(client, project).await?;
				let mut node: Node = project.node_by_name(node)
					.or_else(|| project.nodes.iter().find(|n| &n.node_id == node))
					.cloned()
					.ok_or_else(|| RestError::NotFound(format!("No node {} in project {}", node, project.project_id)))?;

				match action {
					NodeAction::Show => {},
					NodeAction::Start => node.start(client).await?,
					NodeAction::Stop => node.stop(client).await?,
					NodeAction::Suspend => node.suspend(client).await?,
					NodeAction::Reload => node.reload(client).await?,
					NodeAction::Toggle => node.toggle(client).await?,
				}
				if args.json {
					print_json(&node.settings.to_value())?;
				} else {
					println!("{}", node);
				}
			},
			SubCmdRoot::Create { name } => {
				let project = Project::create(client, name, Default::default()).await?;
				if args.json {
					print_json(&project.settings.to_value())?;
				} else {
					println!("created project {} with id: {}", name, project.project_id);
				}
			},
			SubCmdRoot::Delete(ProjectID { arg }) => {
				let project = find_project(client, arg).await?;
				project.delete(client).await?;
				if args.json {
					print_json(&project.settings.to_value())?;
				} else {
					println!("deleted project {}", project.project_id);
				}
			},
			SubCmdRoot::Vm => {
				let vm = Gns3Vm::fetch(client).await?;
				if args.json {
					print_json(&vm.settings.to_value())?;
				} else {
					println!("{}", vm);
					vm.engines.iter().for_each(|e| println!("{}", e));
				}
			},
			SubCmdRoot::Debug => {
				Controller::debug(client).await?;
				println!("Debug information written to configuration directory");
			},
			SubCmdRoot::Shutdown => {
				Controller::shutdown(client).await?;
				println!("Controller accepted the shutdown command");
			},
		}

		Ok(())
	}
}
