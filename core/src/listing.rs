use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderEntry {
	pub name: String,
	#[serde(default)]
	pub item_count: u64,
	/// Path relative to the image root, when the server reports it.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub path: Option<String>,
}

impl FolderEntry {
	pub fn new(name: impl Into<String>, item_count: u64) -> Self {
		Self {
			name: name.into(),
			item_count,
			path: None,
		}
	}

	/// Path used when addressing this folder in move requests.
	pub fn target_path(&self) -> &str {
		self.path.as_deref().unwrap_or(&self.name)
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageEntry {
	pub filename: String,
	pub path: String,
	#[serde(rename = "size", default)]
	pub size_bytes: u64,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub uploaded_at: Option<String>,
}

impl ImageEntry {
	pub fn new(filename: impl Into<String>, path: impl Into<String>, size_bytes: u64) -> Self {
		Self {
			filename: filename.into(),
			path: path.into(),
			size_bytes,
			uploaded_at: None,
		}
	}

	pub fn with_uploaded_at(mut self, uploaded_at: impl Into<String>) -> Self {
		self.uploaded_at = Some(uploaded_at.into());
		self
	}

	/// Upload time as reported by the server. Accepts RFC 3339 as well as the
	/// offset-less ISO form the desktop server emits.
	pub fn uploaded(&self) -> Option<NaiveDateTime> {
		let raw = self.uploaded_at.as_deref()?.trim();
		if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
			return Some(dt.naive_utc());
		}
		NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
			.or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
			.ok()
	}
}

/// One level of the remote image store. Always fetched fresh.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryListing {
	pub folders: Vec<FolderEntry>,
	pub images: Vec<ImageEntry>,
	pub current_path: String,
}

impl DirectoryListing {
	pub fn empty(current_path: impl Into<String>) -> Self {
		Self {
			folders: Vec::new(),
			images: Vec::new(),
			current_path: current_path.into(),
		}
	}

	pub fn is_empty(&self) -> bool {
		self.folders.is_empty() && self.images.is_empty()
	}

	pub fn folder(&self, name: &str) -> Option<&FolderEntry> {
		self.folders.iter().find(|folder| folder.name == name)
	}

	pub fn image(&self, path: &str) -> Option<&ImageEntry> {
		self.images.iter().find(|image| image.path == path)
	}
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortMode {
	Name,
	#[default]
	Newest,
	Size,
}

impl SortMode {
	pub const ALL: [SortMode; 3] = [SortMode::Name, SortMode::Newest, SortMode::Size];

	pub fn label(self) -> &'static str {
		match self {
			SortMode::Name => "Name",
			SortMode::Newest => "Newest",
			SortMode::Size => "Size",
		}
	}

	pub fn cycle(self) -> Self {
		match self {
			SortMode::Name => SortMode::Newest,
			SortMode::Newest => SortMode::Size,
			SortMode::Size => SortMode::Name,
		}
	}

	/// Stable sort, so reapplying the same mode leaves the order untouched.
	pub fn apply(self, images: &mut [ImageEntry]) {
		match self {
			SortMode::Name => images.sort_by(|a, b| a.filename.cmp(&b.filename)),
			SortMode::Newest => images.sort_by(newest_first),
			SortMode::Size => images.sort_by_key(|image| image.size_bytes),
		}
	}
}

fn newest_first(a: &ImageEntry, b: &ImageEntry) -> Ordering {
	match (a.uploaded(), b.uploaded()) {
		(Some(a), Some(b)) => b.cmp(&a),
		(Some(_), None) => Ordering::Less,
		(None, Some(_)) => Ordering::Greater,
		(None, None) => Ordering::Equal,
	}
}

impl std::str::FromStr for SortMode {
	type Err = String;

	fn from_str(value: &str) -> Result<Self, Self::Err> {
		match value.trim().to_ascii_lowercase().as_str() {
			"name" => Ok(SortMode::Name),
			"newest" | "date" => Ok(SortMode::Newest),
			"size" => Ok(SortMode::Size),
			other => Err(format!("unknown sort mode: {other}")),
		}
	}
}
