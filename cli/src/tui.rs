//! Terminal front end: a home page gating access to the gallery, and a gallery
//! page that is redrawn from the controller's view after every action.

use crate::commands::format_size;
use anyhow::Result;
use caniscan_core::{
	ConnectionEvent, GalleryView, ImageEntry, MoveTarget, Operation, PendingDelete, Session,
	Tile, TileAction,
};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{
	EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Frame;
use ratatui::Terminal;
use ratatui::backend::{Backend, CrosstermBackend};
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap};
use std::path::{Path, PathBuf};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::mpsc;

const GATED_MESSAGE: &str = "You must connect to the server first!";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Page {
	Home,
	Gallery,
}

#[derive(Debug, Clone)]
enum Prompt {
	CreateFolder(String),
	Rename { path: String, input: String },
	ProcessFolder(String),
	Upload(String),
	ConfirmDelete(PendingDelete),
	Move {
		path: String,
		targets: Vec<MoveTarget>,
		selected: usize,
	},
}

impl Prompt {
	fn title(&self) -> &'static str {
		match self {
			Prompt::CreateFolder(_) => "Create New Folder",
			Prompt::Rename { .. } => "Enter new filename",
			Prompt::ProcessFolder(_) => "Folder to process",
			Prompt::Upload(_) => "Local folder to upload",
			Prompt::ConfirmDelete(_) => "Delete Image",
			Prompt::Move { .. } => "Move Image",
		}
	}

	fn input_mut(&mut self) -> Option<&mut String> {
		match self {
			Prompt::CreateFolder(input)
			| Prompt::ProcessFolder(input)
			| Prompt::Upload(input)
			| Prompt::Rename { input, .. } => Some(input),
			Prompt::ConfirmDelete(_) | Prompt::Move { .. } => None,
		}
	}
}

enum Message {
	Key(KeyEvent),
	Connection(ConnectionEvent),
	Resync,
}

struct BrowserApp {
	session: Session,
	page: Page,
	cursor: usize,
	prompt: Option<Prompt>,
	status: String,
	analysis: Option<ImageEntry>,
	quit: bool,
}

impl BrowserApp {
	fn new(session: Session) -> Self {
		Self {
			session,
			page: Page::Home,
			cursor: 0,
			prompt: None,
			status: String::from("Press c to connect to the server"),
			analysis: None,
			quit: false,
		}
	}

	fn tiles(&self) -> &[Tile] {
		match self.session.gallery().view() {
			GalleryView::Browse(view) => &view.tiles,
			GalleryView::Placeholder(_) => &[],
		}
	}

	fn current_tile(&self) -> Option<&Tile> {
		self.tiles().get(self.cursor)
	}

	fn current_image(&self) -> Option<ImageEntry> {
		match self.current_tile() {
			Some(Tile::Image(image)) => Some(image.clone()),
			_ => None,
		}
	}

	fn clamp_cursor(&mut self) {
		let len = self.tiles().len();
		self.cursor = if len == 0 { 0 } else { self.cursor.min(len - 1) };
	}

	async fn update(&mut self, message: Message) {
		match message {
			Message::Key(key) => {
				if key.kind != KeyEventKind::Press {
					return;
				}
				if self.prompt.is_some() {
					self.update_prompt(key).await;
				} else {
					self.update_key(key).await;
				}
			}
			Message::Connection(event) => {
				let mut events = self.session.pump_events();
				events.push(event);
				if events.contains(&ConnectionEvent::ForcedDisconnect) {
					self.connection_lost();
				}
			}
			Message::Resync => {
				self.session.pump_events();
				if self.page == Page::Gallery && !self.session.connection().user_connected {
					self.connection_lost();
				}
			}
		}
		self.clamp_cursor();
	}

	fn connection_lost(&mut self) {
		self.prompt = None;
		self.page = Page::Home;
		self.status = String::from("Server connection lost. Disconnected.");
	}

	async fn update_key(&mut self, key: KeyEvent) {
		match key.code {
			KeyCode::Char('q') => self.quit = true,
			KeyCode::Char('h') => self.page = Page::Home,
			KeyCode::Char('g') | KeyCode::Tab => self.show_gallery().await,
			KeyCode::Char('c') => self.toggle_connection().await,
			_ if self.page == Page::Gallery => self.update_gallery_key(key).await,
			_ => {}
		}
	}

	async fn show_gallery(&mut self) {
		if !self.session.connection().user_connected {
			self.status = String::from(GATED_MESSAGE);
			return;
		}
		self.page = Page::Gallery;
		self.session.gallery_mut().render().await;
	}

	async fn toggle_connection(&mut self) {
		if self.session.connection().user_connected {
			self.session.disconnect();
			self.page = Page::Home;
			self.status = String::from("Disconnected");
			return;
		}
		match self.session.connect().await {
			Ok(_) => {
				self.page = Page::Gallery;
				self.cursor = 0;
				self.status = String::from("Server Connected");
			}
			Err(err) => self.status = err.user_message(Operation::Connect),
		}
	}

	async fn update_gallery_key(&mut self, key: KeyEvent) {
		match key.code {
			KeyCode::Up | KeyCode::Char('k') => self.cursor = self.cursor.saturating_sub(1),
			KeyCode::Down | KeyCode::Char('j') => self.cursor += 1,
			KeyCode::Enter => self.activate().await,
			KeyCode::Backspace | KeyCode::Left => {
				self.session.gallery_mut().navigate_back().await;
				self.cursor = 0;
			}
			KeyCode::Char(digit @ '0'..='9') => {
				let index = digit.to_digit(10).unwrap_or(0) as usize;
				if index <= self.session.gallery().path().depth() {
					self.session.gallery_mut().navigate_to_crumb(index).await;
					self.cursor = 0;
				}
			}
			KeyCode::Char('s') => {
				let next = self.session.gallery().sort().cycle();
				self.session.gallery_mut().set_sort(next).await;
				self.status = format!("Sorted by {}", next.label());
			}
			KeyCode::Char('v') => {
				if self.session.gallery().selection().active {
					self.session.gallery_mut().exit_selection_mode().await;
					self.status = String::from("Selection mode off");
				} else {
					self.session.gallery_mut().enter_selection_mode().await;
					self.status = String::from("Select Photo: press Enter on an image");
				}
			}
			KeyCode::Char('a') => match self.session.gallery_mut().take_selection().await {
				Some(image) => {
					self.status = format!("{} is ready for analysis", image.filename);
					self.analysis = Some(image);
				}
				None => self.status = String::from("No image selected"),
			},
			KeyCode::Char('n') => self.prompt = Some(Prompt::CreateFolder(String::new())),
			KeyCode::Char('p') => self.prompt = Some(Prompt::ProcessFolder(String::new())),
			KeyCode::Char('u') => self.prompt = Some(Prompt::Upload(String::new())),
			KeyCode::Char('r') => {
				if let Some(image) = self.current_image() {
					self.prompt = Some(Prompt::Rename {
						path: image.path,
						input: image.filename,
					});
				}
			}
			KeyCode::Char('d') => {
				if let Some(image) = self.current_image() {
					let pending = self.session.gallery().request_delete(&image.path);
					self.prompt = Some(Prompt::ConfirmDelete(pending));
				}
			}
			KeyCode::Char('m') => {
				if let Some(image) = self.current_image() {
					match self.session.gallery().move_targets().await {
						Ok(targets) => {
							self.prompt = Some(Prompt::Move {
								path: image.path,
								targets,
								selected: 0,
							})
						}
						Err(err) => self.status = err.user_message(Operation::Move),
					}
				}
			}
			KeyCode::F(5) => {
				self.session.gallery_mut().render().await;
			}
			_ => {}
		}
	}

	async fn activate(&mut self) {
		let selection_mode = self.session.gallery().selection().active;
		let Some(action) = self.current_tile().map(|tile| tile.action(selection_mode)) else {
			return;
		};
		match action {
			TileAction::PickFolder => self.prompt = Some(Prompt::ProcessFolder(String::new())),
			TileAction::CreateFolder => self.prompt = Some(Prompt::CreateFolder(String::new())),
			TileAction::Open(name) => {
				self.session.gallery_mut().navigate_to_folder(&name).await;
				self.cursor = 0;
			}
			TileAction::Select(image) => {
				self.session.gallery_mut().select_image(image.clone());
				self.status = format!("Selected {}; press a to analyze", image.filename);
			}
			TileAction::View(image) => self.view_image(&image).await,
		}
	}

	async fn view_image(&mut self, image: &ImageEntry) {
		let bytes = match self.session.gallery().view_image(&image.path).await {
			Ok(bytes) => bytes,
			Err(err) => {
				self.status = err.user_message(Operation::ViewImage);
				return;
			}
		};
		let target = preview_path(&image.filename);
		let saved = match target.parent() {
			Some(dir) => tokio::fs::create_dir_all(dir).await,
			None => Ok(()),
		};
		self.status = match saved {
			Ok(()) => match tokio::fs::write(&target, &bytes).await {
				Ok(()) => format!("Saved {} to {}", image.filename, target.display()),
				Err(err) => format!("Failed to save preview: {err}"),
			},
			Err(err) => format!("Failed to save preview: {err}"),
		};
	}

	async fn update_prompt(&mut self, key: KeyEvent) {
		let Some(mut prompt) = self.prompt.take() else {
			return;
		};
		let confirming = matches!(prompt, Prompt::ConfirmDelete(_));
		match key.code {
			KeyCode::Esc => {
				self.status = String::from("Cancelled");
				return;
			}
			KeyCode::Char('n') if confirming => {
				self.status = String::from("Cancelled");
				return;
			}
			KeyCode::Enter => {
				self.submit(prompt).await;
				return;
			}
			KeyCode::Char('y') if confirming => {
				self.submit(prompt).await;
				return;
			}
			_ => {}
		}
		match &mut prompt {
			Prompt::ConfirmDelete(_) => {}
			Prompt::Move {
				targets, selected, ..
			} => match key.code {
				KeyCode::Up | KeyCode::Char('k') => *selected = selected.saturating_sub(1),
				KeyCode::Down | KeyCode::Char('j') => {
					*selected = (*selected + 1).min(targets.len().saturating_sub(1))
				}
				_ => {}
			},
			other => {
				if let Some(input) = other.input_mut() {
					edit_input(input, key.code);
				}
			}
		}
		self.prompt = Some(prompt);
	}

	async fn submit(&mut self, prompt: Prompt) {
		let gallery = self.session.gallery_mut();
		self.status = match prompt {
			Prompt::CreateFolder(name) => report(gallery.create_folder(&name).await, Operation::CreateFolder),
			Prompt::Rename { path, input } => match gallery.rename_image(&path, &input).await {
				Ok(false) => String::from("Name unchanged"),
				other => report(other.map(|_| ()), Operation::Rename),
			},
			Prompt::ProcessFolder(folder) => match gallery.process_folder(&folder).await {
				Ok(summary) => summary.summary(),
				Err(err) => err.user_message(Operation::ProcessFolder),
			},
			Prompt::Upload(dir) => match gallery.process_images(Path::new(dir.trim())).await {
				Ok(summary) => summary.summary(),
				Err(err) => err.user_message(Operation::ProcessImages),
			},
			Prompt::ConfirmDelete(pending) => report(gallery.delete_image(pending).await, Operation::Delete),
			Prompt::Move {
				path,
				targets,
				selected,
			} => match targets.get(selected) {
				Some(target) => report(gallery.move_image(&path, &target.path).await, Operation::Move),
				None => String::from("No destination selected"),
			},
		};
	}

	fn view(&self, frame: &mut Frame) {
		let chunks = Layout::default()
			.direction(Direction::Vertical)
			.constraints([
				Constraint::Length(3),
				Constraint::Min(5),
				Constraint::Length(3),
			])
			.split(frame.size());
		self.view_header(frame, chunks[0]);
		match self.page {
			Page::Home => self.view_home(frame, chunks[1]),
			Page::Gallery => self.view_gallery(frame, chunks[1]),
		}
		let status = Paragraph::new(vec![Line::from(self.status.as_str()), help_line(self.page)])
			.wrap(Wrap { trim: true });
		frame.render_widget(status, chunks[2]);
		if let Some(prompt) = &self.prompt {
			view_prompt(frame, prompt);
		}
	}

	fn view_header(&self, frame: &mut Frame, area: Rect) {
		let state = self.session.connection();
		let (indicator, color) = if state.user_connected {
			("Server Connected", Color::Green)
		} else {
			("Server Disconnected", Color::Red)
		};
		let tab = |page: Page, label: &'static str| {
			if self.page == page {
				Span::styled(label, Style::default().add_modifier(Modifier::BOLD | Modifier::REVERSED))
			} else {
				Span::raw(label)
			}
		};
		let line = Line::from(vec![
			Span::styled(" CaniScan ", Style::default().add_modifier(Modifier::BOLD)),
			tab(Page::Home, " Home "),
			Span::raw(" "),
			tab(Page::Gallery, " Gallery "),
			Span::raw("   "),
			Span::styled(indicator, Style::default().fg(color)),
		]);
		frame.render_widget(
			Paragraph::new(line).block(Block::default().borders(Borders::ALL)),
			area,
		);
	}

	fn view_home(&self, frame: &mut Frame, area: Rect) {
		let state = self.session.connection();
		let mut lines = vec![
			Line::from(format!("Server: {}", self.session.config().server_url)),
			Line::from(format!(
				"Health: {}",
				if state.reachable { "healthy" } else { "not responding" }
			)),
			Line::from(format!(
				"Session: {}",
				if state.user_connected { "connected" } else { "disconnected" }
			)),
			Line::from(""),
		];
		if let Some(image) = &self.analysis {
			lines.push(Line::from(format!("Selected for analysis: {}", image.path)));
		}
		let block = Block::default().title(" Home ").borders(Borders::ALL);
		frame.render_widget(Paragraph::new(lines).block(block), area);
	}

	fn view_gallery(&self, frame: &mut Frame, area: Rect) {
		let view = match self.session.gallery().view() {
			GalleryView::Placeholder(text) => {
				let block = Block::default().title(" Gallery ").borders(Borders::ALL);
				frame.render_widget(
					Paragraph::new(text.as_str()).block(block).wrap(Wrap { trim: true }),
					area,
				);
				return;
			}
			GalleryView::Browse(view) => view,
		};
		let columns = Layout::default()
			.direction(Direction::Horizontal)
			.constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
			.split(area);

		let trail: Vec<String> = view
			.breadcrumb
			.iter()
			.enumerate()
			.map(|(index, crumb)| format!("{index}:{}", crumb.label))
			.collect();
		let mut title = format!(" {} | sort: {} ", trail.join(" > "), view.sort.label());
		if view.selection_mode {
			title.push_str("| SELECT ");
		}
		let items: Vec<ListItem> = view.tiles.iter().map(tile_item).collect();
		let list = List::new(items)
			.block(Block::default().title(title).borders(Borders::ALL))
			.highlight_style(Style::default().add_modifier(Modifier::REVERSED))
			.highlight_symbol("> ");
		let mut state = ListState::default().with_selected(Some(self.cursor));
		frame.render_stateful_widget(list, columns[0], &mut state);

		let details = match self.current_tile() {
			Some(Tile::Image(image)) => {
				let mut lines = vec![
					Line::from(image.filename.clone()),
					Line::from(format!("Path: {}", image.path)),
					Line::from(format!("Size: {}", format_size(image.size_bytes))),
					Line::from(format!(
						"Uploaded: {}",
						image.uploaded_at.as_deref().unwrap_or("unknown")
					)),
				];
				let selected = self.session.gallery().selection().selected.as_ref();
				if selected.is_some_and(|s| s.path == image.path) {
					lines.push(Line::from(Span::styled(
						"Selected",
						Style::default().fg(Color::Yellow),
					)));
				}
				lines
			}
			Some(Tile::Folder(folder)) => vec![
				Line::from(folder.name.clone()),
				Line::from(format!("{} items", folder.item_count)),
			],
			Some(tile) => vec![Line::from(tile.label())],
			None => vec![Line::from("No images or folders found.")],
		};
		frame.render_widget(
			Paragraph::new(details)
				.block(Block::default().title(" Details ").borders(Borders::ALL))
				.wrap(Wrap { trim: true }),
			columns[1],
		);
	}
}

fn report(result: Result<(), caniscan_core::GalleryError>, op: Operation) -> String {
	match result {
		Ok(()) => op.success_message().unwrap_or("Done").to_string(),
		Err(err) => err.user_message(op),
	}
}

fn edit_input(input: &mut String, code: KeyCode) {
	match code {
		KeyCode::Char(c) => input.push(c),
		KeyCode::Backspace => {
			input.pop();
		}
		_ => {}
	}
}

fn preview_path(filename: &str) -> PathBuf {
	std::env::temp_dir().join("caniscan").join(filename)
}

fn tile_item(tile: &Tile) -> ListItem<'static> {
	let line = match tile {
		Tile::SelectImageFolder | Tile::CreateFolder => Line::from(Span::styled(
			format!("+ {}", tile.label()),
			Style::default().fg(Color::Cyan),
		)),
		Tile::Folder(folder) => Line::from(format!(
			"[{}] ({} items)",
			folder.name, folder.item_count
		)),
		Tile::Image(image) => Line::from(format!(
			"{}  {}",
			image.filename,
			format_size(image.size_bytes)
		)),
	};
	ListItem::new(line)
}

fn help_line(page: Page) -> Line<'static> {
	let text = match page {
		Page::Home => "c connect/disconnect  g gallery  q quit",
		Page::Gallery => {
			"enter open  bksp back  0-9 crumb  n new  r rename  m move  d delete  s sort  v select  a analyze  p process  u upload  h home  q quit"
		}
	};
	Line::from(Span::styled(text, Style::default().fg(Color::DarkGray)))
}

fn view_prompt(frame: &mut Frame, prompt: &Prompt) {
	let area = centered_rect(60, 30, frame.size());
	frame.render_widget(Clear, area);
	let block = Block::default()
		.title(format!(" {} ", prompt.title()))
		.borders(Borders::ALL);
	match prompt {
		Prompt::Move {
			targets, selected, ..
		} => {
			let items: Vec<ListItem> = targets
				.iter()
				.map(|target| ListItem::new(target.label.clone()))
				.collect();
			let list = List::new(items)
				.block(block)
				.highlight_style(Style::default().add_modifier(Modifier::REVERSED))
				.highlight_symbol("> ");
			let mut state = ListState::default().with_selected(Some(*selected));
			frame.render_stateful_widget(list, area, &mut state);
		}
		Prompt::ConfirmDelete(pending) => {
			let lines = vec![
				Line::from(pending.prompt()),
				Line::from(pending.path().to_string()),
				Line::from(""),
				Line::from("y confirm  n/esc cancel"),
			];
			frame.render_widget(Paragraph::new(lines).block(block), area);
		}
		Prompt::CreateFolder(input)
		| Prompt::ProcessFolder(input)
		| Prompt::Upload(input)
		| Prompt::Rename { input, .. } => {
			let lines = vec![
				Line::from(format!("{input}_")),
				Line::from(""),
				Line::from("enter submit  esc cancel"),
			];
			frame.render_widget(
				Paragraph::new(lines).block(block).wrap(Wrap { trim: false }),
				area,
			);
		}
	}
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
	let vertical = Layout::default()
		.direction(Direction::Vertical)
		.constraints([
			Constraint::Percentage((100 - percent_y) / 2),
			Constraint::Percentage(percent_y),
			Constraint::Percentage((100 - percent_y) / 2),
		])
		.split(area);
	Layout::default()
		.direction(Direction::Horizontal)
		.constraints([
			Constraint::Percentage((100 - percent_x) / 2),
			Constraint::Percentage(percent_x),
			Constraint::Percentage((100 - percent_x) / 2),
		])
		.split(vertical[1])[1]
}

/// Blocking crossterm reads, forwarded to the async loop.
fn spawn_input_thread(tx: mpsc::UnboundedSender<KeyEvent>) {
	std::thread::spawn(move || {
		loop {
			match event::read() {
				Ok(Event::Key(key)) => {
					if tx.send(key).is_err() {
						break;
					}
				}
				Ok(_) => {}
				Err(err) => {
					log::error!("terminal input error: {err}");
					break;
				}
			}
		}
	});
}

async fn event_loop<B: Backend>(terminal: &mut Terminal<B>, session: Session) -> Result<()> {
	let (key_tx, mut key_rx) = mpsc::unbounded_channel();
	spawn_input_thread(key_tx);
	let mut events = session.subscribe();
	session.start_monitoring();
	let mut app = BrowserApp::new(session);

	while !app.quit {
		terminal.draw(|frame| app.view(frame))?;
		let message = tokio::select! {
			Some(key) = key_rx.recv() => Message::Key(key),
			event = events.recv() => match event {
				Ok(event) => Message::Connection(event),
				Err(RecvError::Lagged(_)) => Message::Resync,
				Err(RecvError::Closed) => break,
			},
			else => break,
		};
		app.update(message).await;
	}
	app.session.stop_monitoring();
	Ok(())
}

pub async fn run(session: Session) -> Result<()> {
	enable_raw_mode()?;
	let mut stdout = std::io::stdout();
	execute!(stdout, EnterAlternateScreen)?;
	let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;

	let result = event_loop(&mut terminal, session).await;

	disable_raw_mode()?;
	execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
	terminal.show_cursor()?;
	result
}

#[cfg(test)]
mod tests {
	use super::*;
	use caniscan_core::ClientConfig;
	use caniscan_core::error::SERVER_NOT_RUNNING;
	use crossterm::event::KeyModifiers;
	use wiremock::matchers::{method, path};
	use wiremock::{Mock, MockServer, ResponseTemplate};

	fn key(code: KeyCode) -> Message {
		Message::Key(KeyEvent::new(code, KeyModifiers::NONE))
	}

	fn offline_app() -> BrowserApp {
		let config = ClientConfig::default()
			.with_server_url("http://127.0.0.1:9")
			.unwrap();
		BrowserApp::new(Session::new(config).unwrap())
	}

	#[tokio::test]
	async fn gallery_is_gated_until_connected() {
		let mut app = offline_app();
		app.update(key(KeyCode::Char('g'))).await;
		assert_eq!(app.page, Page::Home);
		assert_eq!(app.status, GATED_MESSAGE);
	}

	#[tokio::test]
	async fn connecting_to_a_stopped_server_reports_it() {
		let mut app = offline_app();
		app.session.tick().await;
		app.update(key(KeyCode::Char('c'))).await;
		assert_eq!(app.status, SERVER_NOT_RUNNING);
		assert!(!app.session.connection().user_connected);
		assert_eq!(app.page, Page::Home);
	}

	#[tokio::test]
	async fn quit_key_stops_the_loop() {
		let mut app = offline_app();
		app.update(key(KeyCode::Char('q'))).await;
		assert!(app.quit);
	}

	#[tokio::test]
	async fn escape_cancels_prompt() {
		let mut app = offline_app();
		app.prompt = Some(Prompt::CreateFolder(String::from("Bea")));
		app.update(key(KeyCode::Char('g'))).await;
		match &app.prompt {
			Some(Prompt::CreateFolder(input)) => assert_eq!(input, "Beag"),
			other => panic!("unexpected prompt {other:?}"),
		}
		app.update(key(KeyCode::Esc)).await;
		assert!(app.prompt.is_none());
		assert_eq!(app.status, "Cancelled");
	}

	async fn mount_healthy(server: &MockServer) {
		Mock::given(method("GET"))
			.and(path("/health"))
			.respond_with(
				ResponseTemplate::new(200).set_body_raw(r#"{"status": "healthy"}"#, "application/json"),
			)
			.mount(server)
			.await;
		Mock::given(method("GET"))
			.and(path("/images"))
			.respond_with(ResponseTemplate::new(200).set_body_raw(
				r#"{"success": true, "images": [], "folders": [{"name": "Beagle", "item_count": 0}]}"#,
				"application/json",
			))
			.mount(server)
			.await;
	}

	#[tokio::test]
	async fn lost_server_returns_home_and_closes_prompt() {
		let server = MockServer::start().await;
		mount_healthy(&server).await;
		let config = ClientConfig::default().with_server_url(&server.uri()).unwrap();
		let mut app = BrowserApp::new(Session::new(config).unwrap());

		app.session.tick().await;
		app.update(key(KeyCode::Char('c'))).await;
		assert_eq!(app.page, Page::Gallery);
		assert!(matches!(app.current_tile(), Some(Tile::SelectImageFolder)));
		app.update(key(KeyCode::Char('n'))).await;
		assert!(matches!(app.prompt, Some(Prompt::CreateFolder(_))));

		server.reset().await;
		Mock::given(method("GET"))
			.and(path("/health"))
			.respond_with(ResponseTemplate::new(503))
			.mount(&server)
			.await;
		let events = app.session.tick().await;
		assert!(events.contains(&ConnectionEvent::ForcedDisconnect));
		app.update(Message::Connection(ConnectionEvent::ForcedDisconnect)).await;

		assert_eq!(app.page, Page::Home);
		assert!(app.prompt.is_none());
		assert_eq!(app.status, "Server connection lost. Disconnected.");
		assert_eq!(app.session.gallery().view(), &GalleryView::disconnected());
	}

	#[tokio::test]
	async fn resync_after_missed_events_leaves_gallery_when_disconnected() {
		let mut app = offline_app();
		app.page = Page::Gallery;
		app.prompt = Some(Prompt::Upload(String::new()));
		app.update(Message::Resync).await;
		assert_eq!(app.page, Page::Home);
		assert!(app.prompt.is_none());
	}

	#[test]
	fn input_editing() {
		let mut input = String::from("dog");
		edit_input(&mut input, KeyCode::Char('s'));
		assert_eq!(input, "dogs");
		edit_input(&mut input, KeyCode::Backspace);
		edit_input(&mut input, KeyCode::Backspace);
		assert_eq!(input, "do");
		edit_input(&mut input, KeyCode::Left);
		assert_eq!(input, "do");
	}

	#[test]
	fn centered_rect_stays_inside_area() {
		let area = Rect::new(0, 0, 100, 40);
		let inner = centered_rect(60, 30, area);
		assert!(inner.x >= area.x && inner.right() <= area.right());
		assert!(inner.y >= area.y && inner.bottom() <= area.bottom());
		assert_eq!(inner.width, 60);
	}

	#[test]
	fn report_uses_operation_messages() {
		assert_eq!(report(Ok(()), Operation::Move), "File moved successfully!");
		let err = caniscan_core::GalleryError::Transport(String::from("refused"));
		assert_eq!(report(Err(err), Operation::Move), "An error occurred. Please try again.");
	}
}
