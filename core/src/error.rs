use thiserror::Error;

pub const SERVER_NOT_RUNNING: &str =
	"Cannot connect. The desktop server is not running. Please start the server first.";

/// Failure of a gallery or connection operation.
///
/// Every variant maps to a user-facing message through [`GalleryError::user_message`],
/// so callers never have to surface raw transport errors.
#[derive(Debug, Error)]
pub enum GalleryError {
	/// Rejected locally before any request was issued.
	#[error("{0}")]
	Invalid(String),
	#[error("not connected to the server")]
	NotConnected,
	#[error("the desktop server is not running")]
	ServerUnavailable,
	/// Network failure, timeout or an unparseable response body.
	#[error("transport error: {0}")]
	Transport(String),
	/// The backend answered but reported failure.
	#[error("backend rejected request (status {status:?}): {}", message.as_deref().unwrap_or("no message"))]
	Rejected {
		status: Option<u16>,
		message: Option<String>,
	},
}

impl GalleryError {
	pub fn invalid(message: impl Into<String>) -> Self {
		GalleryError::Invalid(message.into())
	}

	pub fn is_validation(&self) -> bool {
		matches!(self, GalleryError::Invalid(_))
	}

	/// Text to show the user when `op` fails with this error.
	pub fn user_message(&self, op: Operation) -> String {
		match self {
			GalleryError::Invalid(message) => message.clone(),
			GalleryError::NotConnected => {
				String::from("Please connect to the server on the Home page to view the gallery.")
			}
			GalleryError::ServerUnavailable => String::from(SERVER_NOT_RUNNING),
			GalleryError::Rejected {
				message: Some(message),
				..
			} if !message.trim().is_empty() => message.clone(),
			GalleryError::Rejected { .. } => String::from(op.rejected_fallback()),
			GalleryError::Transport(_) => String::from(op.transport_fallback()),
		}
	}
}

impl From<reqwest::Error> for GalleryError {
	fn from(err: reqwest::Error) -> Self {
		GalleryError::Transport(err.to_string())
	}
}

/// User-initiated operations that can produce a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
	Connect,
	Browse,
	CreateFolder,
	Rename,
	Move,
	Delete,
	ViewImage,
	ProcessFolder,
	ProcessImages,
}

impl Operation {
	pub fn rejected_fallback(self) -> &'static str {
		match self {
			Operation::Connect => SERVER_NOT_RUNNING,
			Operation::Browse => "Failed to load images",
			Operation::CreateFolder => "Failed to create folder",
			Operation::Rename => "Failed to rename file.",
			Operation::Move => "Failed to move file.",
			Operation::Delete => "Failed to delete image. Please try again.",
			Operation::ViewImage => "Image not found",
			Operation::ProcessFolder => "Failed to process folder. Please try again.",
			Operation::ProcessImages => "Failed to process images. Please try again.",
		}
	}

	pub fn transport_fallback(self) -> &'static str {
		match self {
			Operation::Connect => SERVER_NOT_RUNNING,
			Operation::Browse => "Failed to load images. Please try again.",
			Operation::CreateFolder => "Failed to create folder. Please try again.",
			Operation::Rename | Operation::Move => "An error occurred. Please try again.",
			Operation::Delete => "Error deleting image. Please try again.",
			Operation::ViewImage => "Error loading image. Please try again.",
			Operation::ProcessFolder => "Error processing folder. Please try again.",
			Operation::ProcessImages => "Error processing files. Please try again.",
		}
	}

	/// Message shown after the operation succeeds, if the UI announces it.
	pub fn success_message(self) -> Option<&'static str> {
		match self {
			Operation::CreateFolder => Some("Folder created successfully"),
			Operation::Rename => Some("File renamed successfully!"),
			Operation::Move => Some("File moved successfully!"),
			Operation::Delete => Some("Image deleted successfully!"),
			_ => None,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn backend_message_is_used_verbatim() {
		let err = GalleryError::Rejected {
			status: Some(400),
			message: Some(String::from("Folder already exists")),
		};
		assert_eq!(err.user_message(Operation::CreateFolder), "Folder already exists");
	}

	#[test]
	fn missing_or_blank_message_falls_back() {
		let err = GalleryError::Rejected {
			status: Some(500),
			message: Some(String::from("  ")),
		};
		assert_eq!(err.user_message(Operation::Rename), "Failed to rename file.");
		let err = GalleryError::Rejected {
			status: None,
			message: None,
		};
		assert_eq!(err.user_message(Operation::Move), "Failed to move file.");
	}

	#[test]
	fn transport_failure_uses_try_again_text() {
		let err = GalleryError::Transport(String::from("connection refused"));
		assert_eq!(
			err.user_message(Operation::CreateFolder),
			"Failed to create folder. Please try again."
		);
		assert_eq!(
			err.user_message(Operation::Delete),
			"Error deleting image. Please try again."
		);
	}

	#[test]
	fn validation_text_passes_through() {
		let err = GalleryError::invalid("Invalid filename. Cannot include slashes.");
		assert!(err.is_validation());
		assert_eq!(
			err.user_message(Operation::Rename),
			"Invalid filename. Cannot include slashes."
		);
	}
}
