//! SQLite-backed room storage.
//!
//! Participants are stored as a JSON column on the room row; messages live in
//! their own table ordered by insertion; the assessment cache is a single
//! upserted row per room.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use salon_domain::{
    AuthorType, Message, MessageId, Room, RoomId, RoomState, RoomStatus,
};

use crate::infrastructure::ports::{CachedAssessment, RepoError, RoomStore};

pub struct SqliteRoomStore {
    pool: SqlitePool,
}

impl SqliteRoomStore {
    pub async fn new(db_path: &str) -> Result<Self, RepoError> {
        let pool = SqlitePool::connect(&format!("sqlite:{db_path}?mode=rwc")).await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS rooms (
                id TEXT PRIMARY KEY,
                participants_json TEXT NOT NULL,
                focus TEXT,
                status TEXT NOT NULL,
                atmosphere TEXT NOT NULL,
                context_summary TEXT NOT NULL DEFAULT '',
                current_dynamic TEXT NOT NULL DEFAULT '',
                turn_count INTEGER NOT NULL DEFAULT 0,
                last_activity TEXT NOT NULL,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS messages (
                id TEXT PRIMARY KEY,
                room_id TEXT NOT NULL,
                seq INTEGER,
                author_name TEXT NOT NULL,
                author_type TEXT NOT NULL,
                content TEXT NOT NULL,
                metadata_json TEXT,
                timestamp TEXT NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_messages_room ON messages (room_id, seq)",
        )
        .execute(&pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS assessments (
                room_id TEXT PRIMARY KEY,
                stage_json TEXT,
                modulation_json TEXT,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await?;

        Ok(Self { pool })
    }

    async fn load_room_row(&self, id: RoomId) -> Result<SqliteRow, RepoError> {
        sqlx::query("SELECT * FROM rooms WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?
            .ok_or(RepoError::NotFound(id))
    }

    async fn room_from_row(&self, row: SqliteRow) -> Result<Room, RepoError> {
        let id_text: String = row.get("id");
        let id = id_text
            .parse::<RoomId>()
            .map_err(|e| RepoError::Serialization(e.to_string()))?;

        let participants = serde_json::from_str(&row.get::<String, _>("participants_json"))?;
        let status = row
            .get::<String, _>("status")
            .parse::<RoomStatus>()
            .map_err(RepoError::Serialization)?;
        let last_activity = parse_timestamp(&row.get::<String, _>("last_activity"))?;

        let messages = self.list_messages(id).await?;

        Ok(Room {
            id,
            participants,
            topic: row.get::<Option<String>, _>("focus"),
            messages,
            state: RoomState {
                status,
                context_summary: row.get("context_summary"),
                turn_count: row.get::<i64, _>("turn_count") as u32,
                last_activity,
                current_dynamic: row.get("current_dynamic"),
            },
            atmosphere: row.get("atmosphere"),
        })
    }
}

fn parse_timestamp(text: &str) -> Result<DateTime<Utc>, RepoError> {
    DateTime::parse_from_rfc3339(text)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| RepoError::Serialization(format!("bad timestamp '{text}': {e}")))
}

fn message_from_row(row: &SqliteRow) -> Result<Message, RepoError> {
    let id: String = row.get("id");
    let metadata = match row.get::<Option<String>, _>("metadata_json") {
        Some(json) => Some(serde_json::from_str(&json)?),
        None => None,
    };
    Ok(Message {
        id: id
            .parse::<MessageId>()
            .map_err(|e| RepoError::Serialization(e.to_string()))?,
        author_name: row.get("author_name"),
        author_type: row
            .get::<String, _>("author_type")
            .parse::<AuthorType>()
            .map_err(RepoError::Serialization)?,
        content: row.get("content"),
        timestamp: parse_timestamp(&row.get::<String, _>("timestamp"))?,
        metadata,
    })
}

#[async_trait]
impl RoomStore for SqliteRoomStore {
    async fn create_room(&self, room: &Room) -> Result<(), RepoError> {
        let participants_json = serde_json::to_string(&room.participants)?;

        sqlx::query(
            r#"
            INSERT INTO rooms (id, participants_json, focus, status, atmosphere,
                               context_summary, current_dynamic, turn_count,
                               last_activity, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(room.id.to_string())
        .bind(participants_json)
        .bind(&room.topic)
        .bind(room.state.status.as_str())
        .bind(&room.atmosphere)
        .bind(&room.state.context_summary)
        .bind(&room.state.current_dynamic)
        .bind(room.state.turn_count as i64)
        .bind(room.state.last_activity.to_rfc3339())
        .bind(room.state.last_activity.to_rfc3339())
        .execute(&self.pool)
        .await?;

        for message in &room.messages {
            self.append_message(room.id, message).await?;
        }
        Ok(())
    }

    async fn get_room(&self, id: RoomId) -> Result<Room, RepoError> {
        let row = self.load_room_row(id).await?;
        self.room_from_row(row).await
    }

    async fn list_rooms(&self, limit: u32) -> Result<Vec<Room>, RepoError> {
        let rows = sqlx::query("SELECT * FROM rooms ORDER BY last_activity DESC LIMIT ?")
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await?;

        let mut rooms = Vec::with_capacity(rows.len());
        for row in rows {
            rooms.push(self.room_from_row(row).await?);
        }
        Ok(rooms)
    }

    async fn append_message(&self, room_id: RoomId, message: &Message) -> Result<(), RepoError> {
        let metadata_json = match &message.metadata {
            Some(meta) => Some(serde_json::to_string(meta)?),
            None => None,
        };

        sqlx::query(
            r#"
            INSERT INTO messages (id, room_id, seq, author_name, author_type,
                                  content, metadata_json, timestamp)
            VALUES (?, ?,
                    (SELECT COALESCE(MAX(seq), 0) + 1 FROM messages WHERE room_id = ?),
                    ?, ?, ?, ?, ?)
            "#,
        )
        .bind(message.id.to_string())
        .bind(room_id.to_string())
        .bind(room_id.to_string())
        .bind(&message.author_name)
        .bind(message.author_type.as_str())
        .bind(&message.content)
        .bind(metadata_json)
        .bind(message.timestamp.to_rfc3339())
        .execute(&self.pool)
        .await?;

        sqlx::query("UPDATE rooms SET last_activity = ? WHERE id = ?")
            .bind(message.timestamp.to_rfc3339())
            .bind(room_id.to_string())
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn list_messages(&self, room_id: RoomId) -> Result<Vec<Message>, RepoError> {
        let rows = sqlx::query("SELECT * FROM messages WHERE room_id = ? ORDER BY seq ASC")
            .bind(room_id.to_string())
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(message_from_row).collect()
    }

    async fn update_participant_state(
        &self,
        room_id: RoomId,
        participant_name: &str,
        current_state: &str,
        last_spoke: DateTime<Utc>,
    ) -> Result<(), RepoError> {
        let row = self.load_room_row(room_id).await?;
        let mut participants: Vec<salon_domain::Participant> =
            serde_json::from_str(&row.get::<String, _>("participants_json"))?;

        for p in &mut participants {
            if p.name.eq_ignore_ascii_case(participant_name) {
                p.current_state = current_state.to_string();
                p.last_spoke = Some(last_spoke);
            }
        }

        sqlx::query("UPDATE rooms SET participants_json = ? WHERE id = ?")
            .bind(serde_json::to_string(&participants)?)
            .bind(room_id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn update_atmosphere(&self, room_id: RoomId, atmosphere: &str) -> Result<(), RepoError> {
        let result = sqlx::query("UPDATE rooms SET atmosphere = ? WHERE id = ?")
            .bind(atmosphere)
            .bind(room_id.to_string())
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound(room_id));
        }
        Ok(())
    }

    async fn update_context_summary(
        &self,
        room_id: RoomId,
        summary: &str,
    ) -> Result<(), RepoError> {
        let result = sqlx::query("UPDATE rooms SET context_summary = ? WHERE id = ?")
            .bind(summary)
            .bind(room_id.to_string())
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound(room_id));
        }
        Ok(())
    }

    async fn cache_assessment(
        &self,
        room_id: RoomId,
        assessment: &CachedAssessment,
    ) -> Result<(), RepoError> {
        let stage_json = match &assessment.stage {
            Some(stage) => Some(serde_json::to_string(stage)?),
            None => None,
        };
        let modulation_json = match &assessment.modulation {
            Some(m) => Some(serde_json::to_string(m)?),
            None => None,
        };
        let updated_at = assessment
            .updated_at
            .unwrap_or_else(Utc::now)
            .to_rfc3339();

        sqlx::query(
            r#"
            INSERT INTO assessments (room_id, stage_json, modulation_json, updated_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(room_id) DO UPDATE SET
                stage_json = excluded.stage_json,
                modulation_json = excluded.modulation_json,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(room_id.to_string())
        .bind(stage_json)
        .bind(modulation_json)
        .bind(updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_cached_assessment(
        &self,
        room_id: RoomId,
    ) -> Result<Option<CachedAssessment>, RepoError> {
        let row = sqlx::query("SELECT * FROM assessments WHERE room_id = ?")
            .bind(room_id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let stage = match row.get::<Option<String>, _>("stage_json") {
            Some(json) => Some(serde_json::from_str(&json)?),
            None => None,
        };
        let modulation = match row.get::<Option<String>, _>("modulation_json") {
            Some(json) => Some(serde_json::from_str(&json)?),
            None => None,
        };
        let updated_at = parse_timestamp(&row.get::<String, _>("updated_at")).ok();

        Ok(Some(CachedAssessment {
            stage,
            modulation,
            updated_at,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use salon_domain::{
        MessageMetadata, Momentum, Participant, Priority, ResponseDepth, ResponseModulation,
        SuggestedDepth, TargetLength, UserState,
    };

    async fn store_in(dir: &tempfile::TempDir) -> SqliteRoomStore {
        let path = dir.path().join("salon.db");
        SqliteRoomStore::new(path.to_str().unwrap()).await.unwrap()
    }

    fn sample_room() -> Room {
        Room::new(
            vec![
                Participant::new("Einstein", "physicist", "playful", "curious"),
                Participant::new("Curie", "chemist", "precise", "focused"),
            ],
            Some("relativity".into()),
            "quiet anticipation",
            Utc::now(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn room_round_trips_with_messages() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir).await;

        let mut room = sample_room();
        room.append_message(
            Message::new("Einstein", AuthorType::Participant, "Guten Tag.", Utc::now())
                .with_metadata(MessageMetadata {
                    emotion: Some("warm".into()),
                    ..Default::default()
                }),
        );
        store.create_room(&room).await.unwrap();

        let loaded = store.get_room(room.id).await.unwrap();
        assert_eq!(loaded.participants.len(), 2);
        assert_eq!(loaded.topic.as_deref(), Some("relativity"));
        assert_eq!(loaded.messages.len(), 1);
        assert_eq!(
            loaded.messages[0].metadata.as_ref().unwrap().emotion.as_deref(),
            Some("warm")
        );
    }

    #[tokio::test]
    async fn messages_list_in_append_order() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir).await;

        let room = sample_room();
        store.create_room(&room).await.unwrap();

        let now = Utc::now();
        for i in 0..5 {
            // Same timestamp on purpose: order must come from insertion, not time.
            let msg = Message::new("you", AuthorType::User, format!("m{i}"), now);
            store.append_message(room.id, &msg).await.unwrap();
        }

        let messages = store.list_messages(room.id).await.unwrap();
        let contents: Vec<_> = messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["m0", "m1", "m2", "m3", "m4"]);
    }

    #[tokio::test]
    async fn missing_room_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir).await;

        let err = store.get_room(RoomId::new()).await.unwrap_err();
        assert!(matches!(err, RepoError::NotFound(_)));
    }

    #[tokio::test]
    async fn participant_state_update_persists() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir).await;

        let room = sample_room();
        store.create_room(&room).await.unwrap();

        let spoke_at = Utc::now();
        store
            .update_participant_state(room.id, "einstein", "animated", spoke_at)
            .await
            .unwrap();

        let loaded = store.get_room(room.id).await.unwrap();
        let einstein = loaded.participant_by_name("Einstein").unwrap();
        assert_eq!(einstein.current_state, "animated");
        assert!(einstein.last_spoke.is_some());
        assert_eq!(loaded.participant_by_name("Curie").unwrap().current_state, "focused");
    }

    #[tokio::test]
    async fn assessment_cache_is_last_write_wins() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir).await;

        let room = sample_room();
        store.create_room(&room).await.unwrap();

        let first = CachedAssessment {
            stage: Some(salon_domain::ConversationStageAssessment {
                user_state: UserState::Casual,
                momentum: Momentum::Building,
                suggested_depth: SuggestedDepth::Surface,
            }),
            modulation: None,
            updated_at: Some(Utc::now()),
        };
        store.cache_assessment(room.id, &first).await.unwrap();

        let second = CachedAssessment {
            stage: Some(salon_domain::ConversationStageAssessment {
                user_state: UserState::Engaged,
                momentum: Momentum::Sustained,
                suggested_depth: SuggestedDepth::Full,
            }),
            modulation: Some(ResponseModulation {
                target_length: TargetLength::Full,
                depth: ResponseDepth::Philosophical,
                max_characters: 2,
                priority: Priority::Engagement,
            }),
            updated_at: Some(Utc::now()),
        };
        store.cache_assessment(room.id, &second).await.unwrap();

        let cached = store.get_cached_assessment(room.id).await.unwrap().unwrap();
        assert_eq!(cached.stage.unwrap().user_state, UserState::Engaged);
        assert_eq!(cached.modulation.unwrap().max_characters, 2);
    }

    #[tokio::test]
    async fn atmosphere_update_requires_existing_room() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir).await;

        let err = store
            .update_atmosphere(RoomId::new(), "tense")
            .await
            .unwrap_err();
        assert!(matches!(err, RepoError::NotFound(_)));
    }
}
