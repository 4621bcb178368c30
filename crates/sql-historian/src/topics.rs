//! Topic Registry

use crate::driver::SqlHistorian;
use crate::error::Result;
use sqlx::Connection;
use std::collections::HashMap;
use tracing::{debug, error, info, Instrument};

/// Surrogate key of a registered topic
pub type TopicId = i64;

/// Topic name to id mapping
pub type TopicMap = HashMap<String, TopicId>;

/// Rows fetched per round-trip when loading the topic map
pub const TOPIC_BATCH_SIZE: usize = 1000;

impl SqlHistorian {
    /// Register a new topic and return its id.
    ///
    /// The name must not be registered yet; a duplicate surfaces the
    /// database's unique-constraint error. Check [`get_topic_map`] first or
    /// use [`ensure_topic`].
    ///
    /// [`get_topic_map`]: SqlHistorian::get_topic_map
    /// [`ensure_topic`]: SqlHistorian::ensure_topic
    pub async fn insert_topic(&self, name: &str) -> Result<TopicId> {
        async move {
            let mut conn = self.provider.connect().await?;
            let mut tx = conn.begin().await?;
            let topic_id = sqlx::query("INSERT INTO topics (topic_name) VALUES (?)")
                .bind(name)
                .execute(&mut *tx)
                .await
                .map_err(|e| {
                    error!("Failed to insert topic {}: {}", name, e);
                    e
                })?
                .last_insert_rowid();
            tx.commit().await?;
            conn.close().await?;

            info!("Registered topic {} as {}", name, topic_id);
            Ok(topic_id)
        }
        .instrument(self.span.clone())
        .await
    }

    /// Return the id of `name`, registering it first when it is absent.
    ///
    /// Lookup and insert share one transaction.
    pub async fn ensure_topic(&self, name: &str) -> Result<TopicId> {
        async move {
            let mut conn = self.provider.connect().await?;
            let mut tx = conn.begin().await?;

            let existing: Option<(TopicId,)> =
                sqlx::query_as("SELECT topic_id FROM topics WHERE topic_name = ?")
                    .bind(name)
                    .fetch_optional(&mut *tx)
                    .await?;

            let topic_id = match existing {
                Some((topic_id,)) => {
                    debug!("Topic {} already registered as {}", name, topic_id);
                    topic_id
                }
                None => {
                    let topic_id = sqlx::query("INSERT INTO topics (topic_name) VALUES (?)")
                        .bind(name)
                        .execute(&mut *tx)
                        .await?
                        .last_insert_rowid();
                    info!("Registered topic {} as {}", name, topic_id);
                    topic_id
                }
            };

            tx.commit().await?;
            conn.close().await?;
            Ok(topic_id)
        }
        .instrument(self.span.clone())
        .await
    }

    /// Load every registered topic.
    ///
    /// Rows are read in batches of [`TOPIC_BATCH_SIZE`] ordered by id.
    pub async fn get_topic_map(&self) -> Result<TopicMap> {
        async move {
            let mut conn = self.provider.connect().await?;
            let mut topics = TopicMap::new();
            let mut last_id = TopicId::MIN;

            loop {
                let batch: Vec<(TopicId, String)> = sqlx::query_as(
                    "SELECT topic_id, topic_name FROM topics \
                     WHERE topic_id > ? ORDER BY topic_id LIMIT ?",
                )
                .bind(last_id)
                .bind(TOPIC_BATCH_SIZE as i64)
                .fetch_all(&mut conn)
                .await?;

                let fetched = batch.len();
                if let Some((topic_id, _)) = batch.last() {
                    last_id = *topic_id;
                }
                topics.extend(batch.into_iter().map(|(topic_id, name)| (name, topic_id)));

                if fetched < TOPIC_BATCH_SIZE {
                    break;
                }
            }

            conn.close().await?;
            debug!("Loaded {} topics", topics.len());
            Ok(topics)
        }
        .instrument(self.span.clone())
        .await
    }
}
