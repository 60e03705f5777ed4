use std::sync::{Arc, RwLock};

use super::actor::Actor;
use super::error::BackendError;
use super::transport::Transport;

/// Lifecycle of the backend connection
#[derive(Clone, Default)]
pub enum ConnectionState {
  #[default]
  Disconnected,
  Connecting,
  Connected(Actor),
}

impl ConnectionState {
  pub fn label(&self) -> &'static str {
    match self {
      ConnectionState::Disconnected => "disconnected",
      ConnectionState::Connecting => "connecting",
      ConnectionState::Connected(_) => "connected",
    }
  }
}

/// Shared handle to the backend connection.
///
/// Cloning is cheap; every clone observes the same state.
#[derive(Clone, Default)]
pub struct Connection {
  state: Arc<RwLock<ConnectionState>>,
}

impl Connection {
  pub fn new() -> Self {
    Self::default()
  }

  /// Establish the connection over `transport`.
  ///
  /// Access control is initialized before the actor is handed out, so reads
  /// issued after this returns see an identity the backend knows about.
  pub async fn connect(&self, transport: Arc<dyn Transport>) -> Result<(), BackendError> {
    self.set(ConnectionState::Connecting);

    let actor = Actor::new(transport);
    match actor.initialize_access_control().await {
      Ok(()) => {
        self.set(ConnectionState::Connected(actor));
        Ok(())
      }
      Err(e) => {
        self.set(ConnectionState::Disconnected);
        Err(e)
      }
    }
  }

  pub fn disconnect(&self) {
    self.set(ConnectionState::Disconnected);
  }

  /// Actor for write operations; fails fast when not connected
  pub fn actor(&self) -> Result<Actor, BackendError> {
    self.ready_actor().ok_or(BackendError::ConnectionUnavailable)
  }

  /// Actor for read operations, `None` while disconnected or connecting
  pub fn ready_actor(&self) -> Option<Actor> {
    match &*self.read() {
      ConnectionState::Connected(actor) => Some(actor.clone()),
      _ => None,
    }
  }

  pub fn is_ready(&self) -> bool {
    matches!(&*self.read(), ConnectionState::Connected(_))
  }

  pub fn state_label(&self) -> &'static str {
    self.read().label()
  }

  fn read(&self) -> std::sync::RwLockReadGuard<'_, ConnectionState> {
    // A poisoned lock still holds a valid state value
    self.state.read().unwrap_or_else(|e| e.into_inner())
  }

  fn set(&self, state: ConnectionState) {
    let mut guard = self.state.write().unwrap_or_else(|e| e.into_inner());
    *guard = state;
  }
}
