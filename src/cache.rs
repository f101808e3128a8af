use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use serde::Deserialize;

use crate::error::{Backend, StoreError};
use crate::models::StudentProfile;
use crate::stores::{ProfileCache, StoreResult};

/// Shape of the `student:<id>` documents written by the profile loader.
#[derive(Debug, Deserialize)]
struct CachedStudent {
    name: String,
    group: String,
    course: i32,
    #[serde(rename = "department-name")]
    department: String,
    email: String,
    birth: String,
}

pub fn cache_key(student_id: &str) -> String {
    format!("student:{student_id}")
}

pub fn decode_profile(student_id: &str, raw: &str) -> StoreResult<StudentProfile> {
    let doc: CachedStudent = serde_json::from_str(raw).map_err(|e| {
        StoreError::decode(Backend::Cache, format!("{}: {e}", cache_key(student_id)))
    })?;

    Ok(StudentProfile {
        student_id: student_id.to_string(),
        name: doc.name,
        group: doc.group,
        course: doc.course,
        department: doc.department,
        email: doc.email,
        birth: doc.birth,
    })
}

/// Profile cache backed by Redis. The connection manager reconnects on its
/// own and is cheap to clone per call.
#[derive(Clone)]
pub struct RedisProfileCache {
    connection: ConnectionManager,
}

impl RedisProfileCache {
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let client = redis::Client::open(url)?;
        let mut connection = ConnectionManager::new(client).await?;
        let _: String = redis::cmd("PING").query_async(&mut connection).await?;
        Ok(Self { connection })
    }
}

#[async_trait]
impl ProfileCache for RedisProfileCache {
    async fn profile(&self, student_id: &str) -> StoreResult<StudentProfile> {
        let key = cache_key(student_id);
        let mut connection = self.connection.clone();
        let raw: Option<String> = connection.get(&key).await?;

        match raw {
            Some(raw) => decode_profile(student_id, &raw),
            None => Err(StoreError::NotFound(key)),
        }
    }
}
