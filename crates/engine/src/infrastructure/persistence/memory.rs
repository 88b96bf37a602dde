//! In-memory room store, used by tests and small deployments.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;

use salon_domain::{Message, Room, RoomId};

use crate::infrastructure::ports::{CachedAssessment, RepoError, RoomStore};

#[derive(Default)]
pub struct InMemoryRoomStore {
    rooms: RwLock<HashMap<RoomId, Room>>,
    assessments: RwLock<HashMap<RoomId, CachedAssessment>>,
}

impl InMemoryRoomStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RoomStore for InMemoryRoomStore {
    async fn create_room(&self, room: &Room) -> Result<(), RepoError> {
        self.rooms.write().await.insert(room.id, room.clone());
        Ok(())
    }

    async fn get_room(&self, id: RoomId) -> Result<Room, RepoError> {
        self.rooms
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(RepoError::NotFound(id))
    }

    async fn list_rooms(&self, limit: u32) -> Result<Vec<Room>, RepoError> {
        let rooms = self.rooms.read().await;
        let mut all: Vec<Room> = rooms.values().cloned().collect();
        all.sort_by(|a, b| b.state.last_activity.cmp(&a.state.last_activity));
        all.truncate(limit as usize);
        Ok(all)
    }

    async fn append_message(&self, room_id: RoomId, message: &Message) -> Result<(), RepoError> {
        let mut rooms = self.rooms.write().await;
        let room = rooms.get_mut(&room_id).ok_or(RepoError::NotFound(room_id))?;
        room.append_message(message.clone());
        Ok(())
    }

    async fn list_messages(&self, room_id: RoomId) -> Result<Vec<Message>, RepoError> {
        Ok(self.get_room(room_id).await?.messages)
    }

    async fn update_participant_state(
        &self,
        room_id: RoomId,
        participant_name: &str,
        current_state: &str,
        last_spoke: DateTime<Utc>,
    ) -> Result<(), RepoError> {
        let mut rooms = self.rooms.write().await;
        let room = rooms.get_mut(&room_id).ok_or(RepoError::NotFound(room_id))?;
        for p in &mut room.participants {
            if p.name.eq_ignore_ascii_case(participant_name) {
                p.current_state = current_state.to_string();
                p.last_spoke = Some(last_spoke);
            }
        }
        Ok(())
    }

    async fn update_atmosphere(&self, room_id: RoomId, atmosphere: &str) -> Result<(), RepoError> {
        let mut rooms = self.rooms.write().await;
        let room = rooms.get_mut(&room_id).ok_or(RepoError::NotFound(room_id))?;
        room.atmosphere = atmosphere.to_string();
        Ok(())
    }

    async fn update_context_summary(
        &self,
        room_id: RoomId,
        summary: &str,
    ) -> Result<(), RepoError> {
        let mut rooms = self.rooms.write().await;
        let room = rooms.get_mut(&room_id).ok_or(RepoError::NotFound(room_id))?;
        room.state.context_summary = summary.to_string();
        Ok(())
    }

    async fn cache_assessment(
        &self,
        room_id: RoomId,
        assessment: &CachedAssessment,
    ) -> Result<(), RepoError> {
        self.assessments
            .write()
            .await
            .insert(room_id, assessment.clone());
        Ok(())
    }

    async fn get_cached_assessment(
        &self,
        room_id: RoomId,
    ) -> Result<Option<CachedAssessment>, RepoError> {
        Ok(self.assessments.read().await.get(&room_id).cloned())
    }
}
