use crate::error::GalleryError;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const IMAGE_EXTENSIONS: [&str; 6] = ["jpg", "jpeg", "png", "gif", "bmp", "webp"];
const IMAGE_MIME_TYPES: [&str; 6] = [
	"image/jpeg",
	"image/jpg",
	"image/png",
	"image/gif",
	"image/bmp",
	"image/webp",
];

pub fn is_supported_image(path: &Path) -> bool {
	let by_extension = path
		.extension()
		.and_then(|ext| ext.to_str())
		.is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()));
	if by_extension {
		return true;
	}
	mime_guess::from_path(path)
		.iter()
		.any(|mime| IMAGE_MIME_TYPES.contains(&mime.essence_str()))
}

/// Image files under `dir`, recursively, in a stable order.
pub fn collect_images(dir: &Path) -> Result<Vec<PathBuf>, GalleryError> {
	if !dir.is_dir() {
		return Err(GalleryError::invalid(format!(
			"Not a folder: {}",
			dir.display()
		)));
	}
	let mut files: Vec<PathBuf> = WalkDir::new(dir)
		.follow_links(true)
		.into_iter()
		.filter_map(|entry| match entry {
			Ok(entry) => Some(entry),
			Err(err) => {
				log::warn!("skipping unreadable entry: {err}");
				None
			}
		})
		.filter(|entry| entry.file_type().is_file() && is_supported_image(entry.path()))
		.map(|entry| entry.into_path())
		.collect();
	if files.is_empty() {
		return Err(GalleryError::invalid(
			"No valid image files found in the selected folder.",
		));
	}
	files.sort();
	Ok(files)
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::time::{SystemTime, UNIX_EPOCH};

	fn temporary_dir(test: &str) -> PathBuf {
		let unique = SystemTime::now()
			.duration_since(UNIX_EPOCH)
			.unwrap_or_default()
			.as_nanos();
		let dir = std::env::temp_dir().join(format!(
			"caniscan-ingest-{}-{}-{}",
			test,
			std::process::id(),
			unique
		));
		std::fs::create_dir_all(&dir).expect("create temp dir");
		dir
	}

	#[test]
	fn keeps_only_images() {
		let dir = temporary_dir("filter");
		std::fs::create_dir_all(dir.join("nested")).unwrap();
		for name in ["a.JPG", "b.png", "notes.txt", "nested/c.webp", "nested/d.pdf"] {
			std::fs::write(dir.join(name), b"x").unwrap();
		}
		let files = collect_images(&dir).unwrap();
		let names: Vec<_> = files
			.iter()
			.map(|path| path.strip_prefix(&dir).unwrap().to_string_lossy().replace('\\', "/"))
			.collect();
		assert_eq!(names, ["a.JPG", "b.png", "nested/c.webp"]);
		let _ = std::fs::remove_dir_all(&dir);
	}

	#[test]
	fn empty_folder_is_a_validation_error() {
		let dir = temporary_dir("empty");
		std::fs::write(dir.join("readme.md"), b"x").unwrap();
		let err = collect_images(&dir).unwrap_err();
		assert_eq!(
			err.to_string(),
			"No valid image files found in the selected folder."
		);
		let _ = std::fs::remove_dir_all(&dir);
	}

	#[test]
	fn missing_folder_is_rejected() {
		let err = collect_images(Path::new("/definitely/not/here")).unwrap_err();
		assert!(err.is_validation());
	}
}
