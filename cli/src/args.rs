use caniscan_core::SortMode;
use clap::Parser;

#[derive(Debug, Parser)]
#[clap(name = "caniscan", about = "Browse and manage a CaniScan desktop server gallery")]
pub struct Args {
	/// Server base URL. Overrides the config file and CANISCAN_SERVER_URL.
	#[clap(long, value_name = "URL")]
	pub server: Option<String>,
	/// Health poll interval in milliseconds.
	#[clap(long, value_name = "MS")]
	pub poll_ms: Option<u64>,
	#[clap(long, default_value = "info")]
	pub log_level: log::LevelFilter,
	#[clap(subcommand)]
	pub command: Option<Command>,
}

#[derive(Debug, Parser)]
pub enum Command {
	/// Probe the server once.
	Health,
	/// Log reachability transitions until interrupted.
	Watch,
	/// List a gallery folder.
	Ls {
		path: Option<String>,
		#[clap(long, default_value = "newest")]
		sort: SortMode,
	},
	Mkdir {
		name: String,
		#[clap(long, value_name = "PATH")]
		parent: Option<String>,
	},
	Rename {
		path: String,
		new_name: String,
	},
	Mv {
		path: String,
		/// Destination folder; an empty string is the gallery root.
		dest: String,
	},
	Rm {
		path: String,
		/// Skip the confirmation prompt.
		#[clap(long)]
		yes: bool,
	},
	/// Download an image.
	Get {
		path: String,
		#[clap(long, value_name = "FILE")]
		out: String,
	},
	/// Classify a folder the server can read.
	Process {
		folder: String,
	},
	/// Upload the images in a local folder for classification.
	Upload {
		dir: String,
	},
	/// Interactive terminal browser.
	Browse,
}
