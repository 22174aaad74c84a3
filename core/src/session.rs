use crate::api::{GalleryBackend, HttpBackend};
use crate::config::ClientConfig;
use crate::connection::{ConnectionEvent, ConnectionMonitor, ConnectionState};
use crate::error::GalleryError;
use crate::gallery::{GalleryController, GalleryView};
use anyhow::Result;
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::TryRecvError};

/// Everything one application window needs: the backend handle, the
/// connection monitor and the gallery built on top of it.
pub struct Session {
	config: ClientConfig,
	monitor: Arc<ConnectionMonitor>,
	gallery: GalleryController,
	events: broadcast::Receiver<ConnectionEvent>,
}

impl Session {
	pub fn new(config: ClientConfig) -> Result<Self> {
		let backend: Arc<dyn GalleryBackend> = Arc::new(HttpBackend::new(&config)?);
		Ok(Self::with_backend(config, backend))
	}

	pub fn with_backend(config: ClientConfig, backend: Arc<dyn GalleryBackend>) -> Self {
		let monitor = Arc::new(ConnectionMonitor::new(Arc::clone(&backend)));
		let events = monitor.subscribe();
		let gallery = GalleryController::new(backend, Arc::clone(&monitor));
		Self {
			config,
			monitor,
			gallery,
			events,
		}
	}

	pub fn config(&self) -> &ClientConfig {
		&self.config
	}

	pub fn monitor(&self) -> &Arc<ConnectionMonitor> {
		&self.monitor
	}

	pub fn connection(&self) -> ConnectionState {
		self.monitor.state()
	}

	pub fn gallery(&self) -> &GalleryController {
		&self.gallery
	}

	pub fn gallery_mut(&mut self) -> &mut GalleryController {
		&mut self.gallery
	}

	/// Another receiver for connection transitions, e.g. for a UI loop.
	pub fn subscribe(&self) -> broadcast::Receiver<ConnectionEvent> {
		self.monitor.subscribe()
	}

	pub fn start_monitoring(&self) {
		self.monitor.start_monitoring(self.config.poll_interval);
	}

	pub fn stop_monitoring(&self) {
		self.monitor.stop_monitoring();
	}

	/// Connect and show the gallery. Nothing is fetched if the server is down.
	pub async fn connect(&mut self) -> Result<&GalleryView, GalleryError> {
		self.monitor.connect()?;
		self.pump_events();
		Ok(self.gallery.render().await)
	}

	pub fn disconnect(&mut self) {
		self.monitor.disconnect();
		self.pump_events();
		self.gallery.on_disconnected();
	}

	/// Run one probe now and apply whatever it changed.
	pub async fn tick(&mut self) -> Vec<ConnectionEvent> {
		self.monitor.tick().await;
		self.pump_events()
	}

	/// Drain pending monitor events, resetting the gallery on a forced
	/// disconnect.
	pub fn pump_events(&mut self) -> Vec<ConnectionEvent> {
		let mut drained = Vec::new();
		loop {
			match self.events.try_recv() {
				Ok(event) => {
					self.handle_event(event);
					drained.push(event);
				}
				Err(TryRecvError::Lagged(skipped)) => {
					log::warn!("missed {skipped} connection events");
					self.resync();
				}
				Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
			}
		}
		drained
	}

	pub fn handle_event(&mut self, event: ConnectionEvent) {
		match event {
			ConnectionEvent::ForcedDisconnect | ConnectionEvent::Disconnected => {
				self.gallery.on_disconnected();
			}
			ConnectionEvent::ReachabilityChanged(reachable) => {
				log::info!(
					"server {}",
					if reachable { "reachable" } else { "unreachable" }
				);
			}
			ConnectionEvent::Connected => {}
		}
	}

	fn resync(&mut self) {
		if !self.monitor.is_connected() {
			self.gallery.on_disconnected();
		}
	}
}
