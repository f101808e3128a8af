use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};

use crate::error::StoreError;
use crate::models::{AttendanceAggregate, GroupRoster, LectureRow, SessionCounts};
use crate::stores::{RelationalStore, StoreResult};

/// Attendance, schedule and roster facts held in Postgres.
#[derive(Clone)]
pub struct PgRelationalStore {
    pool: PgPool,
}

impl PgRelationalStore {
    pub async fn connect(database_url: &str, max_connections: u32) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }
}

#[async_trait]
impl RelationalStore for PgRelationalStore {
    async fn attendance_by_lessons(
        &self,
        lesson_ids: &[i64],
        start: NaiveDate,
        end: NaiveDate,
    ) -> StoreResult<Vec<AttendanceAggregate>> {
        let rows = sqlx::query(
            r#"
            SELECT s.card_id::text AS card_id,
                   COUNT(*) FILTER (WHERE a.status) AS present,
                   COUNT(*) AS scheduled
            FROM attendance a
            JOIN student s ON a.student_id = s.student_id
            JOIN schedule sch ON a.schedule_id = sch.schedule_id
            WHERE sch.lesson_id = ANY($1)
              AND sch.date BETWEEN $2 AND $3
              AND s.group_id = sch.group_id
            GROUP BY s.card_id
            ORDER BY COUNT(*) FILTER (WHERE a.status)::float8 / NULLIF(COUNT(*), 0) ASC
            "#,
        )
        .bind(lesson_ids)
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        let mut aggregates = Vec::with_capacity(rows.len());
        for row in rows {
            aggregates.push(AttendanceAggregate {
                student_id: row.try_get("card_id")?,
                present: row.try_get("present")?,
                scheduled: row.try_get("scheduled")?,
            });
        }

        Ok(aggregates)
    }

    async fn disciplines_in_window(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> StoreResult<Vec<i64>> {
        let ids: Vec<i64> = sqlx::query_scalar(
            r#"
            SELECT DISTINCT l.discipline_id::bigint
            FROM lesson l
            JOIN schedule sch ON l.lesson_id = sch.lesson_id
            WHERE sch.date BETWEEN $1 AND $2
            ORDER BY 1
            "#,
        )
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }

    async fn lectures_for_discipline(
        &self,
        discipline_id: i64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> StoreResult<Vec<LectureRow>> {
        let rows = sqlx::query(
            r#"
            SELECT l.topic::text AS topic,
                   l.type::int4 AS type_code,
                   sch.date::date AS date,
                   COUNT(DISTINCT a.student_id) AS student_count,
                   array_agg(e.name::text) AS equipment
            FROM lesson l
            JOIN schedule sch ON l.lesson_id = sch.lesson_id
            LEFT JOIN attendance a ON sch.schedule_id = a.schedule_id
            LEFT JOIN equipment_requirements er ON l.lesson_id = er.lesson_id
            LEFT JOIN equipment e ON er.equipment = e.id
            WHERE l.discipline_id = $1 AND sch.date BETWEEN $2 AND $3
            GROUP BY l.lesson_id, l.topic, l.type, sch.date
            ORDER BY sch.date
            "#,
        )
        .bind(discipline_id)
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        let mut lectures = Vec::with_capacity(rows.len());
        for row in rows {
            lectures.push(LectureRow {
                topic: row.try_get("topic")?,
                type_code: row.try_get("type_code")?,
                date: row.try_get("date")?,
                student_count: row.try_get("student_count")?,
                equipment: row.try_get("equipment")?,
            });
        }

        Ok(lectures)
    }

    async fn special_disciplines(&self, group_id: i64) -> StoreResult<Vec<i64>> {
        let ids: Vec<i64> = sqlx::query_scalar(
            r#"
            SELECT DISTINCT c.discipline_id::bigint
            FROM course c
            JOIN lesson l ON c.discipline_id = l.discipline_id
            JOIN schedule sch ON l.lesson_id = sch.lesson_id
            WHERE c.is_special = true AND sch.group_id = $1
            ORDER BY 1
            "#,
        )
        .bind(group_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }

    async fn group_roster(&self, group_name: &str) -> StoreResult<GroupRoster> {
        let rows = sqlx::query(
            r#"
            SELECT g.group_id::bigint AS group_id, s.card_id::text AS card_id
            FROM "group" g
            LEFT JOIN student s ON g.group_id = s.group_id
            WHERE g.name = $1
            ORDER BY g.group_id, s.card_id
            "#,
        )
        .bind(group_name)
        .fetch_all(&self.pool)
        .await?;

        let Some(first) = rows.first() else {
            return Err(StoreError::NotFound(format!("group '{group_name}'")));
        };
        let group_id: i64 = first.try_get("group_id")?;

        let mut card_ids = Vec::new();
        for row in &rows {
            let row_group: i64 = row.try_get("group_id")?;
            if row_group != group_id {
                continue;
            }
            let card_id: Option<String> = row.try_get("card_id")?;
            card_ids.extend(card_id);
        }

        Ok(GroupRoster { group_id, card_ids })
    }

    async fn session_counts(
        &self,
        discipline_id: i64,
        group_id: i64,
        card_id: &str,
    ) -> StoreResult<SessionCounts> {
        let scheduled: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM schedule sch
            JOIN lesson l ON sch.lesson_id = l.lesson_id
            WHERE l.discipline_id = $1 AND sch.group_id = $2
            "#,
        )
        .bind(discipline_id)
        .bind(group_id)
        .fetch_one(&self.pool)
        .await?;

        let attended: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM attendance a
            JOIN schedule sch ON a.schedule_id = sch.schedule_id
            JOIN lesson l ON sch.lesson_id = l.lesson_id
            WHERE l.discipline_id = $1 AND sch.group_id = $2
              AND a.status = true
              AND a.student_id = (SELECT student_id FROM student WHERE card_id::text = $3)
            "#,
        )
        .bind(discipline_id)
        .bind(group_id)
        .bind(card_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(SessionCounts {
            scheduled,
            attended,
        })
    }

    async fn group_names(&self) -> StoreResult<Vec<String>> {
        let names: Vec<String> =
            sqlx::query_scalar(r#"SELECT name::text FROM "group" ORDER BY name"#)
                .fetch_all(&self.pool)
                .await?;
        Ok(names)
    }
}
