
use std::fmt;

use futures::future::try_join_all;
use serde_json::{Map, Value};

use crate::attr::{materialize, AttrBag};
use crate::display::{write_bag, write_settings};
use crate::rest::{Gns3Api, RResult};
use crate::utils::required_str;

/// Holds information on the GNS3 VM
#[derive(Debug, Clone, PartialEq)]
pub struct Gns3Vm {
	pub settings: AttrBag,
	pub engines: Vec<Engine>,
}

impl Gns3Vm {
	pub async fn fetch(api: &Gns3Api) -> RResult<Gns3Vm> {
		let settings = api.get_bag("/gns3vm").await?;
		let engines = api.get_list("/gns3vm/engines").await?;
		let engines = try_join_all(engines.iter().map(|e| Engine::fetch(api, e))).await?;

		Ok(Gns3Vm { settings, engines })
	}

	/// Whether the VM is switched on in the controller's settings.
	pub fn enabled(&self) -> bool {
		self.settings.bool("enable").unwrap_or(false)
	}
}

impl fmt::Display for Gns3Vm {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write_bag(f, "GNS3VM settings:", &self.settings)
	}
}

/// A virtualization engine able to host the GNS3 VM (VMware, VirtualBox, ...)
#[derive(Debug, Clone, PartialEq)]
pub struct Engine {
	pub engine_id: String,
	/// Names of the VMs this engine can see
	pub vms: Vec<String>,
	pub settings: AttrBag,
}

impl Engine {
	pub fn from_json(engine: &Map<String, Value>, vms: Vec<String>) -> RResult<Engine> {
		let settings = materialize(engine);
		Ok(Engine {
			engine_id: required_str(&settings, "engine_id", "engine")?,
			vms,
			settings,
		})
	}

	/// Reads the engine, then asks the controller which VMs it hosts.
	pub async fn fetch(api: &Gns3Api, engine: &Map<String, Value>) -> RResult<Engine> {
		let mut engine = Engine::from_json(engine, Vec::new())?;
		let vms = api.get_list(&format!("/gns3vm/engines/{}/vms", engine.engine_id)).await?;
		engine.vms = vms.iter()
			.filter_map(|vm| vm.get("vmname").and_then(Value::as_str))
			.map(str::to_string)
			.collect();
		Ok(engine)
	}
}

impl fmt::Display for Engine {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let vms = format!("{:?}", self.vms);
		let items = self.settings.iter()
			.map(|(k, v)| (k, v.to_string()))
			.chain(std::iter::once(("vms", vms)));
		write_settings(f, "GNS3VMEngine settings:", items)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::mock::MockController;
	use serde_json::json;

	#[tokio::test]
	async fn loads_vm_and_engine_vms() {
		let mock = MockController::start(vec![
			("GET", "/v2/gns3vm", 200, json!({ "enable": true, "engine": "vmware", "vmname": "GNS3 VM", "ram": 2048, "vcpus": 2 })),
			("GET", "/v2/gns3vm/engines", 200, json!([
				{ "engine_id": "vmware", "name": "VMware Workstation / Player (recommended)", "support_ram": true },
				{ "engine_id": "remote", "name": "Remote", "support_ram": false },
			])),
			("GET", "/v2/gns3vm/engines/vmware/vms", 200, json!([{ "vmname": "GNS3 VM" }, { "vmname": "Ubuntu" }])),
			("GET", "/v2/gns3vm/engines/remote/vms", 200, json!([])),
		]).await;

		let vm = Gns3Vm::fetch(&mock.api()).await.unwrap();
		assert!(vm.enabled());
		assert_eq!(vm.settings["ram"], 2048);
		assert_eq!(vm.engines.len(), 2);
		assert_eq!(vm.engines[0].vms, vec!["GNS3 VM".to_string(), "Ubuntu".to_string()]);
		assert!(vm.engines[1].vms.is_empty());

		let out = vm.engines[0].to_string();
		assert!(out.starts_with("GNS3VMEngine settings:\n"));
		assert!(out.contains(r#"["GNS3 VM", "Ubuntu"]"#));
	}

	#[test]
	fn engine_requires_an_id() {
		let m = json!({ "name": "VirtualBox" }).as_object().cloned().unwrap();
		assert!(Engine::from_json(&m, Vec::new()).is_err());
	}
}
