pub mod api;
pub mod config;
pub mod connection;
pub mod error;
pub mod gallery;
pub mod ingest;
pub mod listing;
pub mod session;

#[cfg(test)]
mod test_support;

pub use api::{GalleryBackend, HttpBackend, ProcessReport};
pub use config::ClientConfig;
pub use connection::{ConnectionEvent, ConnectionMonitor, ConnectionState};
pub use error::{GalleryError, Operation};
pub use gallery::{
	BrowseView, Crumb, GalleryController, GalleryPath, GalleryView, MoveTarget, PendingDelete,
	Tile, TileAction,
};
pub use listing::{DirectoryListing, FolderEntry, ImageEntry, SortMode};
pub use session::Session;
