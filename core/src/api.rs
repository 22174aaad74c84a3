use crate::config::ClientConfig;
use crate::error::GalleryError;
use crate::listing::{DirectoryListing, FolderEntry, ImageEntry};
use anyhow::Result;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

/// Outcome of asking the server to classify a batch of images.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessReport {
	pub processed_count: u64,
	pub output_path: String,
}

impl ProcessReport {
	pub fn summary(&self) -> String {
		format!(
			"Successfully processed {} images! Results saved to: {}",
			self.processed_count, self.output_path
		)
	}
}

/// Narrow view of the desktop server's REST surface.
#[async_trait]
pub trait GalleryBackend: Send + Sync {
	/// Liveness probe. Any failure reads as unhealthy.
	async fn health(&self) -> bool;
	async fn list(&self, path: &str) -> Result<DirectoryListing, GalleryError>;
	async fn create_folder(&self, name: &str, parent: &str) -> Result<(), GalleryError>;
	async fn delete_image(&self, path: &str) -> Result<(), GalleryError>;
	async fn rename_image(&self, path: &str, new_filename: &str) -> Result<(), GalleryError>;
	async fn move_image(&self, path: &str, dest_folder: &str) -> Result<(), GalleryError>;
	async fn fetch_image(&self, path: &str) -> Result<Vec<u8>, GalleryError>;
	async fn process_folder(&self, folder: &str) -> Result<ProcessReport, GalleryError>;
	async fn process_images(&self, files: &[PathBuf]) -> Result<ProcessReport, GalleryError>;
}

#[derive(Deserialize)]
struct HealthResponse {
	status: Option<String>,
}

#[derive(Deserialize)]
struct ListingResponse {
	success: bool,
	#[serde(default)]
	images: Vec<ImageEntry>,
	#[serde(default)]
	folders: Vec<FolderEntry>,
	current_path: Option<String>,
	message: Option<String>,
}

#[derive(Deserialize)]
struct MutationResponse {
	success: bool,
	message: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProcessResponse {
	success: bool,
	processed_count: Option<u64>,
	output_path: Option<String>,
	message: Option<String>,
}

pub struct HttpBackend {
	client: Client,
	base: Url,
	probe_timeout: Duration,
}

impl HttpBackend {
	pub fn new(config: &ClientConfig) -> Result<Self> {
		let client = Client::builder()
			.timeout(config.request_timeout)
			.user_agent(concat!("caniscan/", env!("CARGO_PKG_VERSION")))
			.build()?;
		Ok(Self {
			client,
			base: config.server_url.clone(),
			probe_timeout: config.probe_timeout,
		})
	}

	pub fn base_url(&self) -> &Url {
		&self.base
	}

	fn endpoint(&self, segments: &[&str]) -> Result<Url, GalleryError> {
		let mut url = self.base.clone();
		url.path_segments_mut()
			.map_err(|_| GalleryError::Transport(format!("invalid server url: {}", self.base)))?
			.pop_if_empty()
			.extend(segments);
		Ok(url)
	}

	async fn post_mutation(
		&self,
		segment: &str,
		body: serde_json::Value,
	) -> Result<(), GalleryError> {
		let url = self.endpoint(&[segment])?;
		log::debug!("POST {url}");
		let res = self.client.post(url).json(&body).send().await?;
		let status = res.status();
		let parsed: MutationResponse = res.json().await?;
		if parsed.success {
			Ok(())
		} else {
			Err(GalleryError::Rejected {
				status: Some(status.as_u16()),
				message: parsed.message,
			})
		}
	}

	async fn read_process_response(res: reqwest::Response) -> Result<ProcessReport, GalleryError> {
		let status = res.status();
		let parsed: ProcessResponse = res.json().await?;
		if !parsed.success {
			return Err(GalleryError::Rejected {
				status: Some(status.as_u16()),
				message: parsed.message,
			});
		}
		Ok(ProcessReport {
			processed_count: parsed.processed_count.unwrap_or(0),
			output_path: parsed.output_path.unwrap_or_default(),
		})
	}
}

#[async_trait]
impl GalleryBackend for HttpBackend {
	async fn health(&self) -> bool {
		let Ok(url) = self.endpoint(&["health"]) else {
			return false;
		};
		let res = match self.client.get(url).timeout(self.probe_timeout).send().await {
			Ok(res) => res,
			Err(err) => {
				log::debug!("health probe failed: {err}");
				return false;
			}
		};
		if res.status() != StatusCode::OK {
			return false;
		}
		match res.json::<HealthResponse>().await {
			Ok(body) => body.status.as_deref() == Some("healthy"),
			Err(_) => false,
		}
	}

	async fn list(&self, path: &str) -> Result<DirectoryListing, GalleryError> {
		let mut url = self.endpoint(&["images"])?;
		if !path.is_empty() {
			url.query_pairs_mut().append_pair("path", path);
		}
		log::debug!("GET {url}");
		let res = self.client.get(url).send().await?;
		let status = res.status();
		let parsed: ListingResponse = res.json().await?;
		if !parsed.success {
			return Err(GalleryError::Rejected {
				status: Some(status.as_u16()),
				message: parsed.message,
			});
		}
		Ok(DirectoryListing {
			folders: parsed.folders,
			images: parsed.images,
			current_path: parsed.current_path.unwrap_or_else(|| path.to_string()),
		})
	}

	async fn create_folder(&self, name: &str, parent: &str) -> Result<(), GalleryError> {
		self.post_mutation("folders", json!({ "name": name, "path": parent }))
			.await
	}

	async fn delete_image(&self, path: &str) -> Result<(), GalleryError> {
		let url = self.endpoint(&["images", path])?;
		log::debug!("DELETE {url}");
		let res = self.client.delete(url).send().await?;
		if res.status().is_success() {
			Ok(())
		} else {
			Err(GalleryError::Rejected {
				status: Some(res.status().as_u16()),
				message: None,
			})
		}
	}

	async fn rename_image(&self, path: &str, new_filename: &str) -> Result<(), GalleryError> {
		self.post_mutation(
			"rename-image",
			json!({ "currentPath": path, "newFilename": new_filename }),
		)
		.await
	}

	async fn move_image(&self, path: &str, dest_folder: &str) -> Result<(), GalleryError> {
		self.post_mutation(
			"move-image",
			json!({ "currentPath": path, "newFolderPath": dest_folder }),
		)
		.await
	}

	async fn fetch_image(&self, path: &str) -> Result<Vec<u8>, GalleryError> {
		let url = self.endpoint(&["images", path])?;
		log::debug!("GET {url}");
		let res = self.client.get(url).send().await?;
		let status = res.status();
		if !status.is_success() {
			let message = res
				.json::<MutationResponse>()
				.await
				.ok()
				.and_then(|body| body.message);
			return Err(GalleryError::Rejected {
				status: Some(status.as_u16()),
				message,
			});
		}
		Ok(res.bytes().await?.to_vec())
	}

	async fn process_folder(&self, folder: &str) -> Result<ProcessReport, GalleryError> {
		let url = self.endpoint(&["process-folder"])?;
		log::debug!("POST {url}");
		let res = self
			.client
			.post(url)
			.json(&json!({ "folderPath": folder }))
			.send()
			.await?;
		Self::read_process_response(res).await
	}

	async fn process_images(&self, files: &[PathBuf]) -> Result<ProcessReport, GalleryError> {
		let mut form = Form::new();
		for file in files {
			let data = tokio::fs::read(file)
				.await
				.map_err(|err| GalleryError::invalid(format!("{}: {err}", file.display())))?;
			let name = file
				.file_name()
				.map(|name| name.to_string_lossy().to_string())
				.unwrap_or_else(|| String::from("image"));
			let mime = mime_guess::from_path(file).first_or_octet_stream();
			let part = Part::bytes(data)
				.file_name(name)
				.mime_str(mime.essence_str())?;
			form = form.part("images", part);
		}
		let url = self.endpoint(&["process-images"])?;
		log::debug!("POST {url} ({} files)", files.len());
		let res = self.client.post(url).multipart(form).send().await?;
		Self::read_process_response(res).await
	}
}
