use args::Command;
use caniscan_core::{ClientConfig, Session};
use clap::Parser;

mod args;
mod commands;
mod tui;

#[tokio::main]
async fn main() {
	let args = args::Args::parse();
	let interactive = matches!(args.command, None | Some(Command::Browse));
	// The browser owns the terminal; log lines would corrupt it.
	let level = if interactive {
		log::LevelFilter::Off
	} else {
		args.log_level
	};
	simple_logger::SimpleLogger::new()
		.with_level(level)
		.init()
		.unwrap();

	let config = match build_config(&args) {
		Ok(config) => config,
		Err(err) => {
			log::error!("invalid configuration: {err:?}");
			eprintln!("invalid configuration: {err:#}");
			std::process::exit(1);
		}
	};
	log::info!("caniscan {} using {}", env!("CARGO_PKG_VERSION"), config.server_url);

	let session = match Session::new(config) {
		Ok(session) => session,
		Err(err) => {
			log::error!("failed to create session: {err:?}");
			std::process::exit(1);
		}
	};

	let result = match args.command.unwrap_or(Command::Browse) {
		Command::Browse => tui::run(session).await,
		command => commands::run(session, command).await,
	};
	if let Err(err) = result {
		log::error!("{err:#}");
		if interactive {
			eprintln!("{err:#}");
		}
		std::process::exit(1);
	}
}

fn build_config(args: &args::Args) -> anyhow::Result<ClientConfig> {
	let mut config = ClientConfig::load()?;
	if let Some(server) = &args.server {
		config = config.with_server_url(server)?;
	}
	if let Some(ms) = args.poll_ms {
		config = config.with_poll_ms(ms)?;
	}
	Ok(config)
}
