use crate::api::GalleryBackend;
use crate::error::GalleryError;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

const EVENT_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConnectionState {
	/// Result of the most recent health probe.
	pub reachable: bool,
	/// Whether the user has connected. Only ever true while reachable.
	pub user_connected: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionEvent {
	ReachabilityChanged(bool),
	Connected,
	Disconnected,
	/// Health was lost while the user was connected.
	ForcedDisconnect,
}

struct Shared {
	backend: Arc<dyn GalleryBackend>,
	state: Mutex<ConnectionState>,
	events: broadcast::Sender<ConnectionEvent>,
}

impl Shared {
	fn emit(&self, event: ConnectionEvent) {
		// No subscribers is fine.
		let _ = self.events.send(event);
	}

	fn apply_probe(&self, reachable: bool) -> Vec<ConnectionEvent> {
		let mut events = Vec::new();
		{
			let mut state = self.state.lock().unwrap();
			if state.reachable != reachable {
				events.push(ConnectionEvent::ReachabilityChanged(reachable));
			}
			state.reachable = reachable;
			if state.user_connected && !reachable {
				state.user_connected = false;
				events.push(ConnectionEvent::ForcedDisconnect);
			}
		}
		for event in &events {
			if *event == ConnectionEvent::ForcedDisconnect {
				log::warn!("server connection lost; forcing disconnect");
			}
			self.emit(*event);
		}
		events
	}

	async fn tick(&self) -> Vec<ConnectionEvent> {
		let reachable = self.backend.health().await;
		self.apply_probe(reachable)
	}
}

/// Tracks backend reachability and the user-facing "connected" flag.
pub struct ConnectionMonitor {
	shared: Arc<Shared>,
	poller: Mutex<Option<JoinHandle<()>>>,
}

impl ConnectionMonitor {
	pub fn new(backend: Arc<dyn GalleryBackend>) -> Self {
		let (events, _) = broadcast::channel(EVENT_CAPACITY);
		Self {
			shared: Arc::new(Shared {
				backend,
				state: Mutex::new(ConnectionState::default()),
				events,
			}),
			poller: Mutex::new(None),
		}
	}

	pub fn state(&self) -> ConnectionState {
		*self.shared.state.lock().unwrap()
	}

	pub fn is_reachable(&self) -> bool {
		self.state().reachable
	}

	pub fn is_connected(&self) -> bool {
		self.state().user_connected
	}

	pub fn subscribe(&self) -> broadcast::Receiver<ConnectionEvent> {
		self.shared.events.subscribe()
	}

	/// One health probe. Never fails; an error is just `false`.
	pub async fn probe(&self) -> bool {
		self.shared.backend.health().await
	}

	/// Probe once and apply the result, returning the transitions it caused.
	pub async fn tick(&self) -> Vec<ConnectionEvent> {
		self.shared.tick().await
	}

	/// Apply an externally obtained probe result.
	pub fn apply_probe(&self, reachable: bool) -> Vec<ConnectionEvent> {
		self.shared.apply_probe(reachable)
	}

	/// Start fixed-period polling. The first probe runs immediately.
	/// Replaces any poller that is already running.
	pub fn start_monitoring(&self, interval: Duration) {
		let shared = Arc::clone(&self.shared);
		let handle = tokio::spawn(async move {
			let mut ticker = tokio::time::interval(interval);
			ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
			loop {
				ticker.tick().await;
				shared.tick().await;
			}
		});
		log::info!("health monitoring every {}ms", interval.as_millis());
		if let Some(previous) = self.poller.lock().unwrap().replace(handle) {
			previous.abort();
		}
	}

	pub fn stop_monitoring(&self) {
		if let Some(handle) = self.poller.lock().unwrap().take() {
			handle.abort();
		}
	}

	pub fn is_monitoring(&self) -> bool {
		self.poller
			.lock()
			.unwrap()
			.as_ref()
			.is_some_and(|handle| !handle.is_finished())
	}

	/// User-initiated connect. Refused while the backend is unreachable.
	pub fn connect(&self) -> Result<(), GalleryError> {
		{
			let mut state = self.shared.state.lock().unwrap();
			if !state.reachable {
				return Err(GalleryError::ServerUnavailable);
			}
			if state.user_connected {
				return Ok(());
			}
			state.user_connected = true;
		}
		log::info!("connected to server");
		self.shared.emit(ConnectionEvent::Connected);
		Ok(())
	}

	/// User-initiated disconnect. Always succeeds.
	pub fn disconnect(&self) {
		let was_connected = {
			let mut state = self.shared.state.lock().unwrap();
			std::mem::replace(&mut state.user_connected, false)
		};
		if was_connected {
			log::info!("disconnected from server");
			self.shared.emit(ConnectionEvent::Disconnected);
		}
	}
}

impl Drop for ConnectionMonitor {
	fn drop(&mut self) {
		self.stop_monitoring();
	}
}
