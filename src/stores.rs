//! Adapter seams for the four external stores.
//!
//! Each trait exposes only the reads the report pipelines need. Production
//! implementations live in `search`, `graph`, `db` and `cache`; they are
//! bundled into [`Stores`] once at startup and shared by reference.

use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use chrono::NaiveDate;

use crate::cache::RedisProfileCache;
use crate::config::StoreConfig;
use crate::db::PgRelationalStore;
use crate::error::StoreError;
use crate::graph::Neo4jGraphStore;
use crate::models::{
    AttendanceAggregate, GroupRoster, LectureRow, SearchHit, SessionCounts, StudentProfile,
};
use crate::search::ElasticSearchIndex;

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait SearchIndex: Send + Sync {
    /// Ranked hits whose `field` contains `phrase`.
    async fn match_phrase(&self, index: &str, field: &str, phrase: &str)
        -> StoreResult<Vec<SearchHit>>;

    /// Hits whose `field` equals any of `terms`.
    async fn match_terms(&self, index: &str, field: &str, terms: &[i64])
        -> StoreResult<Vec<SearchHit>>;
}

#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Lessons linked from any of the materials. Empty when nothing matches.
    async fn lessons_for_materials(&self, material_ids: &[i64]) -> StoreResult<Vec<i64>>;
}

#[async_trait]
pub trait RelationalStore: Send + Sync {
    async fn attendance_by_lessons(
        &self,
        lesson_ids: &[i64],
        start: NaiveDate,
        end: NaiveDate,
    ) -> StoreResult<Vec<AttendanceAggregate>>;

    async fn disciplines_in_window(&self, start: NaiveDate, end: NaiveDate)
        -> StoreResult<Vec<i64>>;

    async fn lectures_for_discipline(
        &self,
        discipline_id: i64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> StoreResult<Vec<LectureRow>>;

    async fn special_disciplines(&self, group_id: i64) -> StoreResult<Vec<i64>>;

    /// Fails with `NotFound` when no group carries that name.
    async fn group_roster(&self, group_name: &str) -> StoreResult<GroupRoster>;

    async fn session_counts(
        &self,
        discipline_id: i64,
        group_id: i64,
        card_id: &str,
    ) -> StoreResult<SessionCounts>;

    async fn group_names(&self) -> StoreResult<Vec<String>>;
}

#[async_trait]
pub trait ProfileCache: Send + Sync {
    async fn profile(&self, student_id: &str) -> StoreResult<StudentProfile>;
}

/// Store handles built once per process and handed to the composer.
#[derive(Clone)]
pub struct Stores {
    pub search: Arc<dyn SearchIndex>,
    pub graph: Arc<dyn GraphStore>,
    pub relational: Arc<dyn RelationalStore>,
    pub profiles: Arc<dyn ProfileCache>,
}

impl Stores {
    pub async fn connect(config: &StoreConfig) -> anyhow::Result<Self> {
        let relational = PgRelationalStore::connect(&config.database_url, config.max_connections)
            .await
            .context("failed to connect to Postgres")?;
        tracing::info!("Connected to PostgreSQL");

        let profiles = RedisProfileCache::connect(&config.redis_url)
            .await
            .context("failed to connect to Redis")?;
        tracing::info!("Connected to Redis");

        let search = ElasticSearchIndex::new(
            &config.elasticsearch_url,
            config.search_size,
            config.request_timeout(),
        )
        .context("failed to build Elasticsearch client")?;
        search.ping().await.context("failed to reach Elasticsearch")?;
        tracing::info!("Connected to Elasticsearch");

        let graph = Neo4jGraphStore::new(
            &config.neo4j_url,
            &config.neo4j_database,
            &config.neo4j_user,
            &config.neo4j_password,
            config.request_timeout(),
        )
        .context("failed to build Neo4j client")?;
        graph.ping().await.context("failed to reach Neo4j")?;
        tracing::info!("Connected to Neo4j");

        Ok(Self {
            search: Arc::new(search),
            graph: Arc::new(graph),
            relational: Arc::new(relational),
            profiles: Arc::new(profiles),
        })
    }
}
