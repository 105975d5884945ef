
use clap::Parser;
use log::trace;
use gns3::{Error as RestError, Gns3Api};

use gns3rest::Args;

#[tokio::main]
async fn main() -> Result<(), RestError> {
	env_logger::init();

	trace!("parsing args");
	let args: Args = Args::parse();

	let config = gns3::get_config(args.config.as_deref())?;
	let client = Gns3Api::new(config)?;

	args.handle(&client).await
}
