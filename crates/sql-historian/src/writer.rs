//! Ingestion Writer

use crate::driver::SqlHistorian;
use crate::error::Result;
use crate::timestamp;
use crate::topics::TopicId;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::Connection;
use tracing::{debug, error, Instrument};

impl SqlHistorian {
    /// Store one reading, replacing any value already held for
    /// `(ts, topic_id)`.
    ///
    /// The value is stored as compact JSON. `ts` is stored with microsecond
    /// precision; finer timestamps fail with
    /// [`HistorianError::InvalidTimestamp`](crate::HistorianError::InvalidTimestamp).
    /// The write is committed before this returns; on error nothing is
    /// committed.
    pub async fn insert_reading<V>(
        &self,
        ts: &DateTime<Utc>,
        topic_id: TopicId,
        value: &V,
    ) -> Result<()>
    where
        V: Serialize + ?Sized,
    {
        let encoded = serde_json::to_string(value)?;
        let ts_text = timestamp::encode(ts)?;

        async move {
            let mut conn = self.provider.connect().await?;
            let mut tx = conn.begin().await?;
            sqlx::query("REPLACE INTO data (ts, topic_id, value_string) VALUES (?, ?, ?)")
                .bind(&ts_text)
                .bind(topic_id)
                .bind(&encoded)
                .execute(&mut *tx)
                .await
                .map_err(|e| {
                    error!("Failed to store reading for topic {} at {}: {}", topic_id, ts_text, e);
                    e
                })?;
            tx.commit().await?;
            conn.close().await?;

            debug!("Stored reading for topic {} at {}", topic_id, ts_text);
            Ok(())
        }
        .instrument(self.span.clone())
        .await
    }
}
