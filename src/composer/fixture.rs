//! In-memory stand-in for all four stores.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::{json, Value};

use super::ReportComposer;
use crate::cache::decode_profile;
use crate::error::{Backend, StoreError};
use crate::models::{
    AttendanceAggregate, GroupRoster, LectureRow, SearchHit, SessionCounts, StudentProfile,
};
use crate::search::{DISCIPLINES_INDEX, MATERIALS_INDEX};
use crate::stores::{
    GraphStore, ProfileCache, RelationalStore, SearchIndex, StoreResult, Stores,
};

#[derive(Default)]
pub struct Fixture {
    pub search_docs: HashMap<String, Vec<SearchHit>>,
    pub material_lessons: HashMap<i64, Vec<i64>>,
    pub attendance: Vec<AttendanceAggregate>,
    pub lectures: BTreeMap<i64, Vec<LectureRow>>,
    pub groups: BTreeMap<String, GroupRoster>,
    pub special: HashMap<i64, Vec<i64>>,
    pub sessions: HashMap<(i64, i64, String), SessionCounts>,
    pub profiles: HashMap<String, String>,
    pub down: Option<Backend>,
    pub failing_discipline: Option<i64>,
    pub seen_lessons: Mutex<Vec<i64>>,
    pub seen_window: Mutex<Option<(NaiveDate, NaiveDate)>>,
}

impl Fixture {
    pub fn composer(self) -> ReportComposer {
        self.with_handle().0
    }

    pub fn with_handle(self) -> (ReportComposer, Arc<Fixture>) {
        let shared = Arc::new(self);
        let stores = Stores {
            search: shared.clone(),
            graph: shared.clone(),
            relational: shared.clone(),
            profiles: shared.clone(),
        };
        (ReportComposer::new(stores), shared)
    }

    pub fn add_material(&mut self, doc_id: &str, material_id: Value, content: &str) {
        self.search_docs
            .entry(MATERIALS_INDEX.to_string())
            .or_default()
            .push(SearchHit {
                document_id: doc_id.to_string(),
                source: json!({"material_id": material_id, "content": content})
                    .as_object()
                    .cloned()
                    .unwrap_or_default(),
            });
    }

    pub fn add_discipline(&mut self, id: i64, name: &str, description: &str) {
        self.search_docs
            .entry(DISCIPLINES_INDEX.to_string())
            .or_default()
            .push(SearchHit {
                document_id: format!("d-{id}"),
                source: json!({"discipline_id": id, "name": name, "description": description})
                    .as_object()
                    .cloned()
                    .unwrap_or_default(),
            });
    }

    pub fn add_profile(&mut self, card_id: &str, name: &str, group: &str) {
        let doc = json!({
            "name": name,
            "group": group,
            "course": 2,
            "department-name": "Mathematics",
            "email": format!("{card_id}@uni.example"),
            "birth": "2004-01-01",
        });
        self.profiles.insert(card_id.to_string(), doc.to_string());
    }

    pub fn add_group(&mut self, name: &str, group_id: i64, card_ids: &[&str]) {
        self.groups.insert(
            name.to_string(),
            GroupRoster {
                group_id,
                card_ids: card_ids.iter().map(|c| c.to_string()).collect(),
            },
        );
    }

    pub fn add_attendance(&mut self, card_id: &str, present: i64, scheduled: i64) {
        self.attendance.push(AttendanceAggregate {
            student_id: card_id.to_string(),
            present,
            scheduled,
        });
    }

    fn check(&self, backend: Backend) -> StoreResult<()> {
        match self.down {
            Some(down) if down == backend => {
                Err(StoreError::unavailable(backend, "fixture backend is down"))
            }
            _ => Ok(()),
        }
    }
}

fn field_as_i64(value: Option<&Value>) -> Option<i64> {
    match value? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

#[async_trait]
impl SearchIndex for Fixture {
    async fn match_phrase(
        &self,
        index: &str,
        field: &str,
        phrase: &str,
    ) -> StoreResult<Vec<SearchHit>> {
        self.check(Backend::Search)?;
        let phrase = phrase.to_lowercase();
        Ok(self
            .search_docs
            .get(index)
            .into_iter()
            .flatten()
            .filter(|hit| {
                hit.source
                    .get(field)
                    .and_then(Value::as_str)
                    .is_some_and(|text| text.to_lowercase().contains(&phrase))
            })
            .cloned()
            .collect())
    }

    async fn match_terms(
        &self,
        index: &str,
        field: &str,
        terms: &[i64],
    ) -> StoreResult<Vec<SearchHit>> {
        self.check(Backend::Search)?;
        Ok(self
            .search_docs
            .get(index)
            .into_iter()
            .flatten()
            .filter(|hit| field_as_i64(hit.source.get(field)).is_some_and(|id| terms.contains(&id)))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl GraphStore for Fixture {
    async fn lessons_for_materials(&self, material_ids: &[i64]) -> StoreResult<Vec<i64>> {
        self.check(Backend::Graph)?;
        Ok(material_ids
            .iter()
            .filter_map(|id| self.material_lessons.get(id))
            .flatten()
            .copied()
            .collect())
    }
}

#[async_trait]
impl RelationalStore for Fixture {
    async fn attendance_by_lessons(
        &self,
        lesson_ids: &[i64],
        start: NaiveDate,
        end: NaiveDate,
    ) -> StoreResult<Vec<AttendanceAggregate>> {
        self.check(Backend::Relational)?;
        if let Ok(mut seen) = self.seen_lessons.lock() {
            *seen = lesson_ids.to_vec();
        }
        if let Ok(mut window) = self.seen_window.lock() {
            *window = Some((start, end));
        }
        if lesson_ids.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self.attendance.clone())
    }

    async fn disciplines_in_window(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> StoreResult<Vec<i64>> {
        self.check(Backend::Relational)?;
        if let Ok(mut window) = self.seen_window.lock() {
            *window = Some((start, end));
        }
        Ok(self
            .lectures
            .iter()
            .filter(|(_, rows)| rows.iter().any(|row| row.date >= start && row.date <= end))
            .map(|(id, _)| *id)
            .collect())
    }

    async fn lectures_for_discipline(
        &self,
        discipline_id: i64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> StoreResult<Vec<LectureRow>> {
        self.check(Backend::Relational)?;
        if self.failing_discipline == Some(discipline_id) {
            return Err(StoreError::unavailable(
                Backend::Relational,
                format!("lecture query for discipline {discipline_id} failed"),
            ));
        }
        let mut rows: Vec<LectureRow> = self
            .lectures
            .get(&discipline_id)
            .into_iter()
            .flatten()
            .filter(|row| row.date >= start && row.date <= end)
            .cloned()
            .collect();
        rows.sort_by_key(|row| row.date);
        Ok(rows)
    }

    async fn special_disciplines(&self, group_id: i64) -> StoreResult<Vec<i64>> {
        self.check(Backend::Relational)?;
        Ok(self.special.get(&group_id).cloned().unwrap_or_default())
    }

    async fn group_roster(&self, group_name: &str) -> StoreResult<GroupRoster> {
        self.check(Backend::Relational)?;
        self.groups
            .get(group_name)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("group '{group_name}'")))
    }

    async fn session_counts(
        &self,
        discipline_id: i64,
        group_id: i64,
        card_id: &str,
    ) -> StoreResult<SessionCounts> {
        self.check(Backend::Relational)?;
        Ok(self
            .sessions
            .get(&(discipline_id, group_id, card_id.to_string()))
            .copied()
            .unwrap_or_default())
    }

    async fn group_names(&self) -> StoreResult<Vec<String>> {
        self.check(Backend::Relational)?;
        Ok(self.groups.keys().cloned().collect())
    }
}

#[async_trait]
impl ProfileCache for Fixture {
    async fn profile(&self, student_id: &str) -> StoreResult<StudentProfile> {
        self.check(Backend::Cache)?;
        let raw = self
            .profiles
            .get(student_id)
            .ok_or_else(|| StoreError::NotFound(format!("student:{student_id}")))?;
        decode_profile(student_id, raw)
    }
}
