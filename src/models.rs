use chrono::NaiveDate;
use serde::Serialize;
use serde_json::{Map, Value};

/// One document returned by the search index.
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub document_id: String,
    pub source: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisciplineDescriptor {
    pub discipline_id: i64,
    pub name: String,
    pub description: String,
}

/// Denormalized student document held in the profile cache.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudentProfile {
    pub student_id: String,
    pub name: String,
    pub group: String,
    pub course: i32,
    pub department: String,
    pub email: String,
    pub birth: String,
}

/// Present and scheduled attendance rows for one student.
#[derive(Debug, Clone, PartialEq)]
pub struct AttendanceAggregate {
    pub student_id: String,
    pub present: i64,
    pub scheduled: i64,
}

impl AttendanceAggregate {
    /// `None` when the student had nothing scheduled in the window.
    pub fn rate(&self) -> Option<f64> {
        if self.scheduled <= 0 {
            return None;
        }
        let rate = self.present as f64 / self.scheduled as f64;
        Some(rate.clamp(0.0, 1.0))
    }
}

/// Raw per-lesson row from the relational store, before labelling.
#[derive(Debug, Clone)]
pub struct LectureRow {
    pub topic: String,
    pub type_code: i32,
    pub date: NaiveDate,
    pub student_count: i64,
    pub equipment: Vec<Option<String>>,
}

#[derive(Debug, Clone)]
pub struct GroupRoster {
    pub group_id: i64,
    pub card_ids: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SessionCounts {
    pub scheduled: i64,
    pub attended: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct StudentReport {
    #[serde(flatten)]
    pub profile: StudentProfile,
    pub attendance_rate: f64,
    pub reporting_period: String,
    pub matched_term: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LectureSummary {
    pub topic: String,
    #[serde(rename = "type")]
    pub lesson_type: String,
    pub date: NaiveDate,
    pub student_count: i64,
    pub equipment: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CourseReport {
    #[serde(flatten)]
    pub discipline: DisciplineDescriptor,
    pub lectures: Vec<LectureSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisciplineReport {
    #[serde(flatten)]
    pub discipline: DisciplineDescriptor,
    pub planned_hours: i64,
    pub attended_hours: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct StudentHours {
    #[serde(flatten)]
    pub profile: StudentProfile,
    pub disciplines: Vec<DisciplineReport>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GroupReport {
    pub group_id: i64,
    pub group_name: String,
    pub students: Vec<StudentHours>,
}
