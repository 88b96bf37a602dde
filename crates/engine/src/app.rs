//! Application composition root.

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use salon_domain::RoomId;

use crate::infrastructure::app_config::EngineConfig;
use crate::infrastructure::ports::{ClockPort, LlmPort, RoomStore};
use crate::use_cases::{ProcessMessage, SetupRoom};

pub struct App {
    pub store: Arc<dyn RoomStore>,
    pub setup_room: SetupRoom,
    pub process_message: ProcessMessage,
    /// One async mutex per room so concurrent turns for the same room run
    /// one at a time. Turns for different rooms do not contend.
    turn_locks: DashMap<RoomId, Arc<Mutex<()>>>,
}

impl App {
    pub fn new(
        llm: Arc<dyn LlmPort>,
        store: Arc<dyn RoomStore>,
        clock: Arc<dyn ClockPort>,
        config: EngineConfig,
    ) -> Self {
        Self {
            setup_room: SetupRoom::new(llm.clone(), store.clone(), clock.clone()),
            process_message: ProcessMessage::new(llm, store.clone(), clock, config),
            store,
            turn_locks: DashMap::new(),
        }
    }

    pub fn turn_lock(&self, room_id: RoomId) -> Arc<Mutex<()>> {
        self.turn_locks
            .entry(room_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Drop a room's lock entry once no turn holds or awaits it, so the map
    /// does not grow with every room ever touched.
    pub fn release_turn_lock(&self, room_id: RoomId) {
        self.turn_locks
            .remove_if(&room_id, |_, lock| Arc::strong_count(lock) == 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::clock::SystemClock;
    use crate::infrastructure::persistence::InMemoryRoomStore;
    use crate::infrastructure::ports::{GenerateRequest, LlmError};
    use async_trait::async_trait;

    struct UnreachableLlm;

    #[async_trait]
    impl LlmPort for UnreachableLlm {
        async fn generate(&self, _request: GenerateRequest) -> Result<serde_json::Value, LlmError> {
            Err(LlmError::Connection("down".into()))
        }
    }

    fn app() -> App {
        App::new(
            Arc::new(UnreachableLlm),
            Arc::new(InMemoryRoomStore::new()),
            Arc::new(SystemClock),
            crate::infrastructure::app_config::EngineConfig::default(),
        )
    }

    #[tokio::test]
    async fn turn_lock_entry_is_evicted_once_unused() {
        let app = app();
        let room_id = RoomId::new();

        let lock = app.turn_lock(room_id);
        assert_eq!(app.turn_locks.len(), 1);

        drop(lock);
        app.release_turn_lock(room_id);
        assert!(app.turn_locks.is_empty());
    }

    #[tokio::test]
    async fn held_turn_lock_survives_release() {
        let app = app();
        let room_id = RoomId::new();

        let lock = app.turn_lock(room_id);
        let _guard = lock.lock().await;

        app.release_turn_lock(room_id);
        assert_eq!(app.turn_locks.len(), 1);
        // The retained entry is still the same mutex, not a replacement.
        assert!(Arc::ptr_eq(&lock, &app.turn_lock(room_id)));
    }
}
