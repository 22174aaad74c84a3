//! In-memory stand-in for the desktop server.

use crate::api::{GalleryBackend, ProcessReport};
use crate::error::GalleryError;
use crate::listing::{DirectoryListing, FolderEntry, ImageEntry};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
	Health,
	List(String),
	CreateFolder { name: String, parent: String },
	Delete(String),
	Rename { path: String, new_filename: String },
	Move { path: String, dest: String },
	Fetch(String),
	ProcessFolder(String),
	ProcessImages(usize),
}

struct Inner {
	healthy: bool,
	/// Folder path ("" is the root) to the images it holds.
	folders: BTreeMap<String, Vec<ImageEntry>>,
	calls: Vec<Call>,
	fail_next: Option<GalleryError>,
}

pub struct FakeBackend {
	inner: Mutex<Inner>,
}

fn join(parent: &str, name: &str) -> String {
	if parent.is_empty() {
		name.to_string()
	} else {
		format!("{parent}/{name}")
	}
}

fn split(path: &str) -> (String, String) {
	match path.rsplit_once('/') {
		Some((parent, name)) => (parent.to_string(), name.to_string()),
		None => (String::new(), path.to_string()),
	}
}

fn rejected(message: &str) -> GalleryError {
	GalleryError::Rejected {
		status: Some(400),
		message: Some(message.to_string()),
	}
}

impl FakeBackend {
	pub fn new() -> Self {
		let mut folders = BTreeMap::new();
		folders.insert(String::new(), Vec::new());
		Self {
			inner: Mutex::new(Inner {
				healthy: true,
				folders,
				calls: Vec::new(),
				fail_next: None,
			}),
		}
	}

	pub fn set_healthy(&self, healthy: bool) {
		self.inner.lock().unwrap().healthy = healthy;
	}

	pub fn add_folder(&self, path: &str) {
		let mut inner = self.inner.lock().unwrap();
		let mut prefix = String::new();
		for segment in path.split('/').filter(|s| !s.is_empty()) {
			prefix = join(&prefix, segment);
			inner.folders.entry(prefix.clone()).or_default();
		}
	}

	pub fn add_image(&self, folder: &str, filename: &str, size: u64, uploaded_at: &str) {
		self.add_folder(folder);
		let mut inner = self.inner.lock().unwrap();
		let image = ImageEntry::new(filename, join(folder, filename), size).with_uploaded_at(uploaded_at);
		inner.folders.entry(folder.to_string()).or_default().push(image);
	}

	/// Make the next non-health call fail with `err`.
	pub fn fail_next(&self, err: GalleryError) {
		self.inner.lock().unwrap().fail_next = Some(err);
	}

	pub fn calls(&self) -> Vec<Call> {
		self.inner.lock().unwrap().calls.clone()
	}

	pub fn list_calls(&self) -> usize {
		self.calls()
			.iter()
			.filter(|call| matches!(call, Call::List(_)))
			.count()
	}

	pub fn clear_calls(&self) {
		self.inner.lock().unwrap().calls.clear();
	}

	fn record(&self, call: Call) -> Result<std::sync::MutexGuard<'_, Inner>, GalleryError> {
		let mut inner = self.inner.lock().unwrap();
		inner.calls.push(call);
		if !inner.healthy {
			return Err(GalleryError::Transport(String::from("connection refused")));
		}
		if let Some(err) = inner.fail_next.take() {
			return Err(err);
		}
		Ok(inner)
	}
}

#[async_trait]
impl GalleryBackend for FakeBackend {
	async fn health(&self) -> bool {
		let mut inner = self.inner.lock().unwrap();
		inner.calls.push(Call::Health);
		inner.healthy
	}

	async fn list(&self, path: &str) -> Result<DirectoryListing, GalleryError> {
		let inner = self.record(Call::List(path.to_string()))?;
		let Some(images) = inner.folders.get(path) else {
			return Err(GalleryError::Rejected {
				status: Some(404),
				message: Some(String::from("Path not found")),
			});
		};
		let folders = inner
			.folders
			.iter()
			.filter(|(candidate, _)| !candidate.is_empty() && split(candidate).0 == path)
			.map(|(candidate, contents)| FolderEntry {
				name: split(candidate).1,
				item_count: contents.len() as u64,
				path: Some(candidate.clone()),
			})
			.collect();
		Ok(DirectoryListing {
			folders,
			images: images.clone(),
			current_path: path.to_string(),
		})
	}

	async fn create_folder(&self, name: &str, parent: &str) -> Result<(), GalleryError> {
		let mut inner = self.record(Call::CreateFolder {
			name: name.to_string(),
			parent: parent.to_string(),
		})?;
		let path = join(parent, name);
		if inner.folders.contains_key(&path) {
			return Err(rejected("Folder already exists"));
		}
		inner.folders.insert(path, Vec::new());
		Ok(())
	}

	async fn delete_image(&self, path: &str) -> Result<(), GalleryError> {
		let mut inner = self.record(Call::Delete(path.to_string()))?;
		let (folder, _) = split(path);
		let images = inner.folders.get_mut(&folder).ok_or_else(|| rejected("Image not found"))?;
		let before = images.len();
		images.retain(|image| image.path != path);
		if images.len() == before {
			return Err(GalleryError::Rejected {
				status: Some(404),
				message: None,
			});
		}
		Ok(())
	}

	async fn rename_image(&self, path: &str, new_filename: &str) -> Result<(), GalleryError> {
		let mut inner = self.record(Call::Rename {
			path: path.to_string(),
			new_filename: new_filename.to_string(),
		})?;
		let (folder, _) = split(path);
		let images = inner.folders.get_mut(&folder).ok_or_else(|| rejected("Image not found"))?;
		if images.iter().any(|image| image.filename == new_filename) {
			return Err(rejected("A file with that name already exists"));
		}
		let image = images
			.iter_mut()
			.find(|image| image.path == path)
			.ok_or_else(|| rejected("Image not found"))?;
		image.filename = new_filename.to_string();
		image.path = join(&folder, new_filename);
		Ok(())
	}

	async fn move_image(&self, path: &str, dest: &str) -> Result<(), GalleryError> {
		let mut inner = self.record(Call::Move {
			path: path.to_string(),
			dest: dest.to_string(),
		})?;
		if !inner.folders.contains_key(dest) {
			return Err(rejected("Destination folder not found"));
		}
		let (folder, _) = split(path);
		let images = inner.folders.get_mut(&folder).ok_or_else(|| rejected("Image not found"))?;
		let index = images
			.iter()
			.position(|image| image.path == path)
			.ok_or_else(|| rejected("Image not found"))?;
		let mut image = images.remove(index);
		image.path = join(dest, &image.filename);
		inner.folders.entry(dest.to_string()).or_default().push(image);
		Ok(())
	}

	async fn fetch_image(&self, path: &str) -> Result<Vec<u8>, GalleryError> {
		let inner = self.record(Call::Fetch(path.to_string()))?;
		let (folder, _) = split(path);
		let found = inner
			.folders
			.get(&folder)
			.is_some_and(|images| images.iter().any(|image| image.path == path));
		if found {
			Ok(path.as_bytes().to_vec())
		} else {
			Err(rejected("Image not found"))
		}
	}

	async fn process_folder(&self, folder: &str) -> Result<ProcessReport, GalleryError> {
		let _inner = self.record(Call::ProcessFolder(folder.to_string()))?;
		Ok(ProcessReport {
			processed_count: 3,
			output_path: format!("{folder}/results"),
		})
	}

	async fn process_images(&self, files: &[PathBuf]) -> Result<ProcessReport, GalleryError> {
		let _inner = self.record(Call::ProcessImages(files.len()))?;
		Ok(ProcessReport {
			processed_count: files.len() as u64,
			output_path: String::from("results"),
		})
	}
}
