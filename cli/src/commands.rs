use crate::args::Command;
use anyhow::{Result, anyhow, bail};
use caniscan_core::{ConnectionEvent, GalleryError, GalleryView, Operation, Session, Tile};
use std::io::{BufRead, Write};
use std::path::Path;
use tokio::sync::broadcast::error::RecvError;

pub async fn run(mut session: Session, command: Command) -> Result<()> {
	match command {
		Command::Health => {
			let reachable = session.monitor().probe().await;
			println!(
				"{} is {}",
				session.config().server_url,
				if reachable { "healthy" } else { "unreachable" }
			);
			if !reachable {
				bail!("server is not reachable");
			}
			Ok(())
		}
		Command::Watch => watch(&session).await,
		Command::Ls { path, sort } => {
			connect(&mut session).await?;
			session.gallery_mut().set_sort(sort).await;
			open(&mut session, path.as_deref().unwrap_or(""), Operation::Browse).await?;
			print_view(session.gallery().view());
			Ok(())
		}
		Command::Mkdir { name, parent } => {
			connect(&mut session).await?;
			open(&mut session, parent.as_deref().unwrap_or(""), Operation::CreateFolder).await?;
			session
				.gallery_mut()
				.create_folder(&name)
				.await
				.map_err(|err| user_error(err, Operation::CreateFolder))?;
			announce(Operation::CreateFolder);
			print_view(session.gallery().view());
			Ok(())
		}
		Command::Rename { path, new_name } => {
			connect(&mut session).await?;
			open(&mut session, parent_of(&path), Operation::Rename).await?;
			let renamed = session
				.gallery_mut()
				.rename_image(&path, &new_name)
				.await
				.map_err(|err| user_error(err, Operation::Rename))?;
			if renamed {
				announce(Operation::Rename);
			} else {
				println!("{path} already has that name");
			}
			print_view(session.gallery().view());
			Ok(())
		}
		Command::Mv { path, dest } => {
			connect(&mut session).await?;
			let targets = session
				.gallery()
				.move_targets()
				.await
				.map_err(|err| user_error(err, Operation::Move))?;
			let dest = dest.trim_matches('/');
			if !targets.iter().any(|target| target.path == dest) {
				let known: Vec<_> = targets.iter().map(|t| t.label.as_str()).collect();
				bail!("unknown destination {dest:?}; choose one of: {}", known.join(", "));
			}
			open(&mut session, parent_of(&path), Operation::Move).await?;
			session
				.gallery_mut()
				.move_image(&path, dest)
				.await
				.map_err(|err| user_error(err, Operation::Move))?;
			announce(Operation::Move);
			print_view(session.gallery().view());
			Ok(())
		}
		Command::Rm { path, yes } => {
			connect(&mut session).await?;
			open(&mut session, parent_of(&path), Operation::Delete).await?;
			let pending = session.gallery().request_delete(&path);
			if !yes && !confirm(pending.prompt())? {
				println!("cancelled");
				return Ok(());
			}
			session
				.gallery_mut()
				.delete_image(pending)
				.await
				.map_err(|err| user_error(err, Operation::Delete))?;
			announce(Operation::Delete);
			print_view(session.gallery().view());
			Ok(())
		}
		Command::Get { path, out } => {
			connect(&mut session).await?;
			let bytes = session
				.gallery()
				.view_image(&path)
				.await
				.map_err(|err| user_error(err, Operation::ViewImage))?;
			tokio::fs::write(&out, &bytes).await?;
			println!("saved {} ({}) to {out}", path, format_size(bytes.len() as u64));
			Ok(())
		}
		Command::Process { folder } => {
			connect(&mut session).await?;
			let report = session
				.gallery_mut()
				.process_folder(&folder)
				.await
				.map_err(|err| user_error(err, Operation::ProcessFolder))?;
			println!("{}", report.summary());
			Ok(())
		}
		Command::Upload { dir } => {
			connect(&mut session).await?;
			let report = session
				.gallery_mut()
				.process_images(Path::new(&dir))
				.await
				.map_err(|err| user_error(err, Operation::ProcessImages))?;
			println!("{}", report.summary());
			Ok(())
		}
		Command::Browse => bail!("browse runs the terminal UI, not a one-shot command"),
	}
}

async fn watch(session: &Session) -> Result<()> {
	let mut events = session.subscribe();
	session.start_monitoring();
	log::info!("watching {}; press ctrl-c to stop", session.config().server_url);
	loop {
		tokio::select! {
			_ = tokio::signal::ctrl_c() => {
				log::info!("stopping");
				break;
			}
			event = events.recv() => match event {
				Ok(ConnectionEvent::ReachabilityChanged(true)) => log::info!("server is healthy"),
				Ok(ConnectionEvent::ReachabilityChanged(false)) => log::warn!("server is unreachable"),
				Ok(other) => log::info!("{other:?}"),
				Err(RecvError::Lagged(skipped)) => log::warn!("missed {skipped} events"),
				Err(RecvError::Closed) => break,
			}
		}
	}
	session.stop_monitoring();
	Ok(())
}

/// Probe once, then connect. One-shot commands need a live session.
async fn connect(session: &mut Session) -> Result<()> {
	session.tick().await;
	session
		.connect()
		.await
		.map_err(|err| user_error(err, Operation::Connect))?;
	Ok(())
}

async fn open(session: &mut Session, path: &str, op: Operation) -> Result<()> {
	let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
	session
		.gallery_mut()
		.open_path(&segments)
		.await
		.map_err(|err| user_error(err, op))?;
	Ok(())
}

fn parent_of(path: &str) -> &str {
	path.rsplit_once('/').map(|(parent, _)| parent).unwrap_or("")
}

fn user_error(err: GalleryError, op: Operation) -> anyhow::Error {
	log::debug!("{op:?} failed: {err}");
	anyhow!(err.user_message(op))
}

fn announce(op: Operation) {
	if let Some(message) = op.success_message() {
		println!("{message}");
	}
}

fn confirm(prompt: &str) -> Result<bool> {
	print!("{prompt} [y/N] ");
	std::io::stdout().flush()?;
	let mut line = String::new();
	std::io::stdin().lock().read_line(&mut line)?;
	Ok(matches!(line.trim(), "y" | "Y" | "yes"))
}

fn print_view(view: &GalleryView) {
	let browse = match view {
		GalleryView::Placeholder(text) => {
			println!("{text}");
			return;
		}
		GalleryView::Browse(browse) => browse,
	};
	let trail: Vec<_> = browse.breadcrumb.iter().map(|c| c.label.as_str()).collect();
	println!("{}  (sorted by {})", trail.join(" > "), browse.sort.label());
	for tile in &browse.tiles {
		match tile {
			Tile::Folder(folder) => {
				println!("  [dir] {:<40} {:>4} items", folder.name, folder.item_count)
			}
			Tile::Image(image) => println!(
				"        {:<40} {:>12}  {}",
				image.filename,
				format_size(image.size_bytes),
				image.uploaded_at.as_deref().unwrap_or("-")
			),
			Tile::SelectImageFolder | Tile::CreateFolder => {}
		}
	}
	if browse.folders().next().is_none() && browse.images().next().is_none() {
		println!("  (empty)");
	}
}

pub fn format_size(bytes: u64) -> String {
	const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
	let mut value = bytes as f64;
	let mut unit = 0usize;
	while value >= 1024.0 && unit + 1 < UNITS.len() {
		value /= 1024.0;
		unit += 1;
	}
	if unit == 0 {
		format!("{} {}", bytes, UNITS[unit])
	} else {
		format!("{:.2} {}", value, UNITS[unit])
	}
}
