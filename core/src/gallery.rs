use crate::api::{GalleryBackend, ProcessReport};
use crate::connection::ConnectionMonitor;
use crate::error::GalleryError;
use crate::ingest;
use crate::listing::{DirectoryListing, FolderEntry, ImageEntry, SortMode};
use std::path::Path;
use std::sync::Arc;

pub const ROOT_LABEL: &str = "Gallery";
pub const ROOT_MOVE_LABEL: &str = "(Root Gallery)";
pub const DISCONNECTED_PLACEHOLDER: &str =
	"Please connect to the server on the Home page to view the gallery.";
pub const DELETE_PROMPT: &str = "Are you sure you want to delete this image?";

/// Current directory, relative to the image root. Empty means root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct GalleryPath {
	segments: Vec<String>,
}

impl GalleryPath {
	pub fn root() -> Self {
		Self::default()
	}

	pub fn segments(&self) -> &[String] {
		&self.segments
	}

	pub fn is_root(&self) -> bool {
		self.segments.is_empty()
	}

	pub fn depth(&self) -> usize {
		self.segments.len()
	}

	pub fn last(&self) -> Option<&str> {
		self.segments.last().map(String::as_str)
	}

	pub fn joined(&self) -> String {
		self.segments.join("/")
	}

	fn push(&mut self, segment: impl Into<String>) {
		self.segments.push(segment.into());
	}

	fn pop(&mut self) -> Option<String> {
		self.segments.pop()
	}

	/// Prefix made of the first `index + 1` segments.
	pub fn truncated(&self, index: usize) -> GalleryPath {
		let keep = index.saturating_add(1).min(self.segments.len());
		GalleryPath {
			segments: self.segments[..keep].to_vec(),
		}
	}

	/// Root crumb followed by one crumb per segment.
	pub fn breadcrumb(&self) -> Vec<Crumb> {
		let mut crumbs = Vec::with_capacity(self.segments.len() + 1);
		crumbs.push(Crumb {
			label: String::from(ROOT_LABEL),
			path: GalleryPath::root(),
		});
		for (index, segment) in self.segments.iter().enumerate() {
			crumbs.push(Crumb {
				label: segment.clone(),
				path: self.truncated(index),
			});
		}
		crumbs
	}

	pub fn is_prefix_of(&self, other: &GalleryPath) -> bool {
		other.segments.starts_with(&self.segments)
	}
}

impl std::fmt::Display for GalleryPath {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		if self.is_root() {
			f.write_str("/")
		} else {
			write!(f, "/{}", self.joined())
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Crumb {
	pub label: String,
	pub path: GalleryPath,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionState {
	pub active: bool,
	pub selected: Option<ImageEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tile {
	SelectImageFolder,
	CreateFolder,
	Folder(FolderEntry),
	Image(ImageEntry),
}

/// What clicking a tile should do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TileAction {
	PickFolder,
	CreateFolder,
	Open(String),
	View(ImageEntry),
	Select(ImageEntry),
}

impl Tile {
	pub fn label(&self) -> String {
		match self {
			Tile::SelectImageFolder => String::from("Select Image Folder"),
			Tile::CreateFolder => String::from("Create New Folder"),
			Tile::Folder(folder) => folder.name.clone(),
			Tile::Image(image) => image.filename.clone(),
		}
	}

	pub fn action(&self, selection_mode: bool) -> TileAction {
		match self {
			Tile::SelectImageFolder => TileAction::PickFolder,
			Tile::CreateFolder => TileAction::CreateFolder,
			Tile::Folder(folder) => TileAction::Open(folder.name.clone()),
			Tile::Image(image) if selection_mode => TileAction::Select(image.clone()),
			Tile::Image(image) => TileAction::View(image.clone()),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowseView {
	pub title: String,
	pub show_back: bool,
	pub breadcrumb: Vec<Crumb>,
	pub tiles: Vec<Tile>,
	pub selection_mode: bool,
	pub sort: SortMode,
}

impl BrowseView {
	pub fn folders(&self) -> impl Iterator<Item = &FolderEntry> {
		self.tiles.iter().filter_map(|tile| match tile {
			Tile::Folder(folder) => Some(folder),
			_ => None,
		})
	}

	pub fn images(&self) -> impl Iterator<Item = &ImageEntry> {
		self.tiles.iter().filter_map(|tile| match tile {
			Tile::Image(image) => Some(image),
			_ => None,
		})
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GalleryView {
	Placeholder(String),
	Browse(BrowseView),
}

impl GalleryView {
	pub fn disconnected() -> Self {
		GalleryView::Placeholder(String::from(DISCONNECTED_PLACEHOLDER))
	}
}

/// Issued by [`GalleryController::begin_render`]. Results from a ticket that a
/// newer render has superseded are dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderTicket {
	generation: u64,
	path: GalleryPath,
}

impl RenderTicket {
	pub fn path(&self) -> &GalleryPath {
		&self.path
	}

	pub fn generation(&self) -> u64 {
		self.generation
	}
}

/// Proof that the user was asked to confirm a delete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingDelete {
	path: String,
}

impl PendingDelete {
	pub fn path(&self) -> &str {
		&self.path
	}

	pub fn prompt(&self) -> &'static str {
		DELETE_PROMPT
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveTarget {
	pub label: String,
	pub path: String,
}

/// Client-side view of the remote image store.
///
/// The backend is the only source of truth: every successful mutation is
/// followed by a fresh listing, and nothing is patched locally.
pub struct GalleryController {
	backend: Arc<dyn GalleryBackend>,
	connection: Arc<ConnectionMonitor>,
	path: GalleryPath,
	selection: SelectionState,
	sort: SortMode,
	listing: DirectoryListing,
	view: GalleryView,
	generation: u64,
}

impl GalleryController {
	pub fn new(backend: Arc<dyn GalleryBackend>, connection: Arc<ConnectionMonitor>) -> Self {
		Self {
			backend,
			connection,
			path: GalleryPath::root(),
			selection: SelectionState::default(),
			sort: SortMode::default(),
			listing: DirectoryListing::default(),
			view: GalleryView::disconnected(),
			generation: 0,
		}
	}

	pub fn path(&self) -> &GalleryPath {
		&self.path
	}

	pub fn view(&self) -> &GalleryView {
		&self.view
	}

	pub fn listing(&self) -> &DirectoryListing {
		&self.listing
	}

	pub fn selection(&self) -> &SelectionState {
		&self.selection
	}

	pub fn sort(&self) -> SortMode {
		self.sort
	}

	pub fn is_connected(&self) -> bool {
		self.connection.is_connected()
	}

	fn ensure_connected(&self) -> Result<(), GalleryError> {
		if self.is_connected() {
			Ok(())
		} else {
			Err(GalleryError::NotConnected)
		}
	}

	/// Start a render of the current path. Returns `None` when disconnected,
	/// in which case the placeholder is already shown.
	pub fn begin_render(&mut self) -> Option<RenderTicket> {
		self.generation += 1;
		if !self.is_connected() {
			self.show_disconnected();
			return None;
		}
		Some(RenderTicket {
			generation: self.generation,
			path: self.path.clone(),
		})
	}

	/// Apply a fetched listing. Returns false if the ticket was stale.
	pub fn finish_render(
		&mut self,
		ticket: RenderTicket,
		fetched: Result<DirectoryListing, GalleryError>,
	) -> bool {
		if ticket.generation != self.generation || ticket.path != self.path {
			log::debug!(
				"dropping stale listing for {} (generation {} < {})",
				ticket.path,
				ticket.generation,
				self.generation
			);
			return false;
		}
		if !self.is_connected() {
			self.show_disconnected();
			return true;
		}
		let mut listing = match fetched {
			Ok(listing) => {
				self.prune_selection(&listing);
				listing
			}
			Err(err) => {
				log::error!("failed to load images for {}: {err}", self.path);
				DirectoryListing::empty(self.path.joined())
			}
		};
		self.sort.apply(&mut listing.images);
		self.view = GalleryView::Browse(self.build_view(&listing));
		self.listing = listing;
		true
	}

	/// Fetch the current directory and rebuild the view. At most one request.
	pub async fn render(&mut self) -> &GalleryView {
		let Some(ticket) = self.begin_render() else {
			return &self.view;
		};
		let fetched = self.backend.list(&ticket.path.joined()).await;
		self.finish_render(ticket, fetched);
		&self.view
	}

	fn build_view(&self, listing: &DirectoryListing) -> BrowseView {
		let mut tiles = Vec::with_capacity(listing.folders.len() + listing.images.len() + 2);
		tiles.push(Tile::SelectImageFolder);
		tiles.push(Tile::CreateFolder);
		tiles.extend(listing.folders.iter().cloned().map(Tile::Folder));
		tiles.extend(listing.images.iter().cloned().map(Tile::Image));
		BrowseView {
			title: self.path.last().unwrap_or(ROOT_LABEL).to_string(),
			show_back: !self.path.is_root(),
			breadcrumb: self.path.breadcrumb(),
			tiles,
			selection_mode: self.selection.active,
			sort: self.sort,
		}
	}

	/// Forget a selected image that the server no longer lists in its folder.
	fn prune_selection(&mut self, listing: &DirectoryListing) {
		let Some(selected) = &self.selection.selected else {
			return;
		};
		let folder = selected
			.path
			.rsplit_once('/')
			.map(|(parent, _)| parent)
			.unwrap_or("");
		if folder == self.path.joined() && listing.image(&selected.path).is_none() {
			log::debug!("dropping selection of {}, no longer listed", selected.path);
			self.selection.selected = None;
		}
	}

	fn show_disconnected(&mut self) {
		self.listing = DirectoryListing::default();
		self.view = GalleryView::disconnected();
	}

	/// Reset after the session drops, whether by the user or by lost health.
	pub fn on_disconnected(&mut self) {
		self.generation += 1;
		self.selection = SelectionState::default();
		self.show_disconnected();
	}

	pub async fn navigate_to_folder(&mut self, name: &str) -> &GalleryView {
		self.path.push(name);
		self.render().await
	}

	/// Pop one level. No-op at the root.
	pub async fn navigate_back(&mut self) -> &GalleryView {
		if self.path.pop().is_none() {
			return &self.view;
		}
		self.render().await
	}

	/// Jump to the crumb at `index` of the rendered breadcrumb (0 is the root).
	pub async fn navigate_to_crumb(&mut self, index: usize) -> &GalleryView {
		self.path = if index == 0 {
			GalleryPath::root()
		} else {
			self.path.truncated(index - 1)
		};
		self.render().await
	}

	/// Navigate to a path taken from a rendered crumb. Only prefixes of the
	/// current path are accepted.
	pub async fn open_crumb(&mut self, crumb: &Crumb) -> Result<&GalleryView, GalleryError> {
		if !crumb.path.is_prefix_of(&self.path) {
			return Err(GalleryError::invalid("Breadcrumb is not part of the current path"));
		}
		self.path = crumb.path.clone();
		Ok(self.render().await)
	}

	/// Walk down `segments` one folder at a time, checking each exists in the
	/// listing just fetched.
	pub async fn open_path(&mut self, segments: &[&str]) -> Result<&GalleryView, GalleryError> {
		self.ensure_connected()?;
		self.path = GalleryPath::root();
		self.render().await;
		for segment in segments {
			if self.listing.folder(segment).is_none() {
				return Err(GalleryError::invalid(format!("Folder not found: {segment}")));
			}
			self.navigate_to_folder(segment).await;
		}
		Ok(&self.view)
	}

	pub async fn set_sort(&mut self, sort: SortMode) -> &GalleryView {
		self.sort = sort;
		self.render().await
	}

	/// Selection mode only exists while connected.
	pub async fn enter_selection_mode(&mut self) -> &GalleryView {
		if !self.is_connected() {
			return &self.view;
		}
		self.selection = SelectionState {
			active: true,
			selected: None,
		};
		self.render().await
	}

	pub async fn exit_selection_mode(&mut self) -> &GalleryView {
		self.selection = SelectionState::default();
		self.render().await
	}

	/// Record `image` as the selection. Ignored outside selection mode.
	pub fn select_image(&mut self, image: ImageEntry) -> bool {
		if !self.selection.active {
			return false;
		}
		self.selection.selected = Some(image);
		true
	}

	/// Hand the selected image to downstream analysis and leave selection mode.
	pub async fn take_selection(&mut self) -> Option<ImageEntry> {
		let selected = self.selection.selected.take()?;
		self.exit_selection_mode().await;
		Some(selected)
	}

	pub async fn create_folder(&mut self, name: &str) -> Result<(), GalleryError> {
		let name = name.trim();
		if name.is_empty() {
			return Err(GalleryError::invalid("Folder name cannot be empty."));
		}
		self.ensure_connected()?;
		self.backend.create_folder(name, &self.path.joined()).await?;
		log::info!("created folder {name} in {}", self.path);
		self.render().await;
		Ok(())
	}

	/// Returns false if the new name equals the current one; nothing is sent.
	pub async fn rename_image(&mut self, path: &str, new_name: &str) -> Result<bool, GalleryError> {
		let new_name = validate_filename(new_name)?;
		let current = path.rsplit(['/', '\\']).next().unwrap_or(path);
		if current == new_name {
			return Ok(false);
		}
		self.ensure_connected()?;
		self.backend.rename_image(path, new_name).await?;
		log::info!("renamed {path} to {new_name}");
		self.render().await;
		Ok(true)
	}

	/// Destinations for a move, from a fresh root listing.
	pub async fn move_targets(&self) -> Result<Vec<MoveTarget>, GalleryError> {
		self.ensure_connected()?;
		let root = self.backend.list("").await?;
		let mut targets = vec![MoveTarget {
			label: String::from(ROOT_MOVE_LABEL),
			path: String::new(),
		}];
		targets.extend(root.folders.iter().map(|folder| MoveTarget {
			label: folder.name.clone(),
			path: folder.target_path().to_string(),
		}));
		Ok(targets)
	}

	pub async fn move_image(&mut self, path: &str, dest_folder: &str) -> Result<(), GalleryError> {
		self.ensure_connected()?;
		self.backend.move_image(path, dest_folder).await?;
		log::info!("moved {path} to /{dest_folder}");
		self.render().await;
		Ok(())
	}

	pub fn request_delete(&self, path: &str) -> PendingDelete {
		PendingDelete {
			path: path.to_string(),
		}
	}

	/// Delete a confirmed image. There is no undo.
	pub async fn delete_image(&mut self, confirmed: PendingDelete) -> Result<(), GalleryError> {
		self.ensure_connected()?;
		self.backend.delete_image(&confirmed.path).await?;
		log::info!("deleted {}", confirmed.path);
		if self
			.selection
			.selected
			.as_ref()
			.is_some_and(|image| image.path == confirmed.path)
		{
			self.selection.selected = None;
		}
		self.render().await;
		Ok(())
	}

	pub async fn view_image(&self, path: &str) -> Result<Vec<u8>, GalleryError> {
		self.ensure_connected()?;
		self.backend.fetch_image(path).await
	}

	/// Ask the server to classify every image in a folder it can read.
	pub async fn process_folder(&mut self, folder: &str) -> Result<ProcessReport, GalleryError> {
		let folder = folder.trim();
		if folder.is_empty() {
			return Err(GalleryError::invalid("No folder selected."));
		}
		self.ensure_connected()?;
		let report = self.backend.process_folder(folder).await?;
		log::info!("processed {} images from {folder}", report.processed_count);
		self.render().await;
		Ok(report)
	}

	/// Upload the images found in a local directory for classification.
	pub async fn process_images(&mut self, dir: &Path) -> Result<ProcessReport, GalleryError> {
		self.ensure_connected()?;
		let files = ingest::collect_images(dir)?;
		let report = self.backend.process_images(&files).await?;
		log::info!("uploaded {} images from {}", files.len(), dir.display());
		self.render().await;
		Ok(report)
	}
}

/// Checks applied to a new filename before any request. Returns it trimmed.
pub fn validate_filename(name: &str) -> Result<&str, GalleryError> {
	let name = name.trim();
	if name.is_empty() {
		return Err(GalleryError::invalid("Filename cannot be empty."));
	}
	if !name.contains('.') {
		return Err(GalleryError::invalid(
			"Invalid filename. Please include a file extension.",
		));
	}
	if name.contains(['/', '\\']) {
		return Err(GalleryError::invalid(
			"Invalid filename. Cannot include slashes.",
		));
	}
	Ok(name)
}
