//! Redis-backed job store.
//!
//! Each job lives in a hash under `textsum:job:{document_id}`. Creation
//! and status transitions run as Lua scripts so that concurrent
//! submissions and concurrent workers cannot interleave a check with a
//! write: create is create-if-absent, and a transition only commits when
//! the current status is a legal predecessor of the requested one.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::Script;
use tracing::debug;

use textsum_models::{Job, JobStatus};

use crate::error::{StoreError, StoreResult};
use crate::store::JobStore;

const JOB_KEY_PREFIX: &str = "textsum:job:";

// Creates the job hash only when the key is absent.
const CREATE_SCRIPT: &str = r#"
if redis.call('EXISTS', KEYS[1]) == 1 then
  return 0
end
redis.call('HSET', KEYS[1],
  'document_id', ARGV[1],
  'original_text', ARGV[2],
  'status', ARGV[3],
  'created_at', ARGV[4],
  'updated_at', ARGV[5])
return 1
"#;

// Commits a transition only when the current status is one of the
// allowed predecessors (ARGV[5..]). Returns the prior status on refusal.
const TRANSITION_SCRIPT: &str = r#"
local cur = redis.call('HGET', KEYS[1], 'status')
if not cur then
  return 'missing'
end
local legal = false
for i = 5, #ARGV do
  if ARGV[i] == cur then
    legal = true
  end
end
if not legal then
  return 'illegal:' .. cur
end
redis.call('HSET', KEYS[1], 'status', ARGV[1], 'updated_at', ARGV[4])
if ARGV[1] == 'completed' then
  redis.call('HSET', KEYS[1], 'summary', ARGV[2])
  redis.call('HDEL', KEYS[1], 'error_message')
elseif ARGV[1] == 'error' then
  redis.call('HSET', KEYS[1], 'error_message', ARGV[3])
  redis.call('HDEL', KEYS[1], 'summary')
else
  redis.call('HDEL', KEYS[1], 'summary', 'error_message')
end
return 'ok'
"#;

/// Job store backed by Redis hashes.
pub struct RedisJobStore {
    client: redis::Client,
    create_script: Script,
    transition_script: Script,
}

impl RedisJobStore {
    /// Create a new store for the given Redis URL.
    pub fn new(redis_url: &str) -> StoreResult<Self> {
        let client = redis::Client::open(redis_url)?;
        Ok(Self {
            client,
            create_script: Script::new(CREATE_SCRIPT),
            transition_script: Script::new(TRANSITION_SCRIPT),
        })
    }

    /// Create from the `REDIS_URL` environment variable.
    pub fn from_env() -> StoreResult<Self> {
        let url = std::env::var("REDIS_URL")
            .unwrap_or_else(|_| "redis://localhost:6379".to_string());
        Self::new(&url)
    }

    fn job_key(document_id: &str) -> String {
        format!("{JOB_KEY_PREFIX}{document_id}")
    }

    fn job_from_hash(
        document_id: &str,
        fields: std::collections::HashMap<String, String>,
    ) -> StoreResult<Job> {
        if fields.is_empty() {
            return Err(StoreError::not_found(document_id));
        }
        let get = |name: &str| -> StoreResult<&String> {
            fields
                .get(name)
                .ok_or_else(|| StoreError::Corrupt(document_id.to_string()))
        };
        let status = JobStatus::parse(get("status")?)
            .ok_or_else(|| StoreError::Corrupt(document_id.to_string()))?;
        let parse_ts = |raw: &str| -> StoreResult<DateTime<Utc>> {
            DateTime::parse_from_rfc3339(raw)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|_| StoreError::Corrupt(document_id.to_string()))
        };
        Ok(Job {
            document_id: get("document_id")?.clone(),
            original_text: get("original_text")?.clone(),
            status,
            summary: fields.get("summary").cloned(),
            error_message: fields.get("error_message").cloned(),
            created_at: parse_ts(get("created_at")?)?,
            updated_at: parse_ts(get("updated_at")?)?,
        })
    }
}

#[async_trait]
impl JobStore for RedisJobStore {
    async fn put(&self, job: Job) -> StoreResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let created: i64 = self
            .create_script
            .key(Self::job_key(&job.document_id))
            .arg(&job.document_id)
            .arg(&job.original_text)
            .arg(job.status.as_str())
            .arg(job.created_at.to_rfc3339())
            .arg(job.updated_at.to_rfc3339())
            .invoke_async(&mut conn)
            .await?;

        if created == 0 {
            return Err(StoreError::already_exists(&job.document_id));
        }
        debug!("Created job record: {}", job.document_id);
        Ok(())
    }

    async fn get(&self, document_id: &str) -> StoreResult<Job> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let fields: std::collections::HashMap<String, String> = redis::cmd("HGETALL")
            .arg(Self::job_key(document_id))
            .query_async(&mut conn)
            .await?;

        Self::job_from_hash(document_id, fields)
    }

    async fn update_status(
        &self,
        document_id: &str,
        status: JobStatus,
        summary: Option<String>,
        error_message: Option<String>,
    ) -> StoreResult<Job> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let mut invocation = self.transition_script.prepare_invoke();
        invocation
            .key(Self::job_key(document_id))
            .arg(status.as_str())
            .arg(summary.as_deref().unwrap_or(""))
            .arg(error_message.as_deref().unwrap_or(""))
            .arg(Utc::now().to_rfc3339());
        for from in [
            JobStatus::Queued,
            JobStatus::Processing,
            JobStatus::Completed,
            JobStatus::Error,
        ] {
            if from.can_transition(status) {
                invocation.arg(from.as_str());
            }
        }

        let outcome: String = invocation.invoke_async(&mut conn).await?;
        match outcome.as_str() {
            "ok" => self.get(document_id).await,
            "missing" => Err(StoreError::not_found(document_id)),
            other => {
                let from = other
                    .strip_prefix("illegal:")
                    .and_then(JobStatus::parse)
                    .ok_or_else(|| StoreError::Corrupt(document_id.to_string()))?;
                Err(StoreError::IllegalTransition {
                    document_id: document_id.to_string(),
                    from,
                    to: status,
                })
            }
        }
    }
}
