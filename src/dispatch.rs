//! Observer registration and event routing
//!
//! Each event kind has a single slot. Registering an observer replaces
//! whatever was there before. Observers run on the connection's reader
//! task, so they should hand off any slow work.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::events::{
    AdminCameraEvent, ChatMessage, Kick, Listing, Player, PushEvent, Squad, SquadCreated, Warn,
};
use crate::network::CloseError;

type Slot<T> = RwLock<Option<Arc<dyn Fn(T) + Send + Sync>>>;

/// Registered observers for one connection
#[derive(Default)]
pub struct Observers {
    close: Slot<Option<CloseError>>,
    data: Slot<String>,
    warn: Slot<Warn>,
    kick: Slot<Kick>,
    message: Slot<ChatMessage>,
    possess_admin_camera: Slot<AdminCameraEvent>,
    unpossess_admin_camera: Slot<AdminCameraEvent>,
    squad_created: Slot<SquadCreated>,
    list_players: Slot<Vec<Player>>,
    list_squads: Slot<Vec<Squad>>,
}

fn set<T>(slot: &Slot<T>, observer: impl Fn(T) + Send + Sync + 'static) {
    let observer: Arc<dyn Fn(T) + Send + Sync> = Arc::new(observer);
    *slot.write() = Some(observer);
}

/// Call the observer in `slot`, returning `false` if none is registered
fn notify<T>(slot: &Slot<T>, value: T) -> bool {
    // Clone out of the lock so observers may re-register
    let observer = slot.read().clone();
    match observer {
        Some(observer) => {
            observer(value);
            true
        }
        None => false,
    }
}

impl Observers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Connection closed: `Some` for read errors, `None` after [`close`](crate::Rcon::close)
    pub fn on_close(&self, observer: impl Fn(Option<CloseError>) + Send + Sync + 'static) {
        set(&self.close, observer);
    }

    /// Every push line, classified or not
    pub fn on_data(&self, observer: impl Fn(String) + Send + Sync + 'static) {
        set(&self.data, observer);
    }

    pub fn on_warn(&self, observer: impl Fn(Warn) + Send + Sync + 'static) {
        set(&self.warn, observer);
    }

    pub fn on_kick(&self, observer: impl Fn(Kick) + Send + Sync + 'static) {
        set(&self.kick, observer);
    }

    pub fn on_message(&self, observer: impl Fn(ChatMessage) + Send + Sync + 'static) {
        set(&self.message, observer);
    }

    pub fn on_possess_admin_camera(
        &self,
        observer: impl Fn(AdminCameraEvent) + Send + Sync + 'static,
    ) {
        set(&self.possess_admin_camera, observer);
    }

    pub fn on_unpossess_admin_camera(
        &self,
        observer: impl Fn(AdminCameraEvent) + Send + Sync + 'static,
    ) {
        set(&self.unpossess_admin_camera, observer);
    }

    pub fn on_squad_created(&self, observer: impl Fn(SquadCreated) + Send + Sync + 'static) {
        set(&self.squad_created, observer);
    }

    pub fn on_list_players(&self, observer: impl Fn(Vec<Player>) + Send + Sync + 'static) {
        set(&self.list_players, observer);
    }

    pub fn on_list_squads(&self, observer: impl Fn(Vec<Squad>) + Send + Sync + 'static) {
        set(&self.list_squads, observer);
    }

    /// Whether a close observer is registered
    pub fn has_close_observer(&self) -> bool {
        self.close.read().is_some()
    }

    /// Deliver a close notification. Returns `false` if nobody was listening.
    pub(crate) fn dispatch_close(&self, error: Option<CloseError>) -> bool {
        notify(&self.close, error)
    }

    pub(crate) fn dispatch_data(&self, line: String) {
        notify(&self.data, line);
    }

    pub(crate) fn dispatch_push(&self, event: PushEvent) {
        let delivered = match event {
            PushEvent::Warn(warn) => notify(&self.warn, warn),
            PushEvent::Kick(kick) => notify(&self.kick, kick),
            PushEvent::Chat(message) => notify(&self.message, message),
            PushEvent::PossessedAdminCamera(camera) => notify(&self.possess_admin_camera, camera),
            PushEvent::UnpossessedAdminCamera(camera) => {
                notify(&self.unpossess_admin_camera, camera)
            }
            PushEvent::SquadCreated(created) => notify(&self.squad_created, created),
        };

        if !delivered {
            tracing::trace!("No observer for push event");
        }
    }

    pub(crate) fn dispatch_listing(&self, listing: Listing) {
        match listing {
            Listing::Players(players) => notify(&self.list_players, players),
            Listing::Squads(squads) => notify(&self.list_squads, squads),
        };
    }
}

impl std::fmt::Debug for Observers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Observers")
            .field("close", &self.close.read().is_some())
            .field("data", &self.data.read().is_some())
            .finish_non_exhaustive()
    }
}
