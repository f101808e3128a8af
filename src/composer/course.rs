use std::collections::{BTreeMap, BTreeSet};

use super::{AtStage, ReportComposer, ReportError, Stage};
use crate::calendar::{lesson_type_label, DateWindow};
use crate::error::StoreError;
use crate::models::{CourseReport, DisciplineDescriptor, LectureRow, LectureSummary};
use crate::search::{discipline_descriptor, DISCIPLINES_INDEX};

const DISCIPLINE_ID_FIELD: &str = "discipline_id";

fn summarize(row: LectureRow) -> LectureSummary {
    let equipment: BTreeSet<String> = row.equipment.into_iter().flatten().collect();
    LectureSummary {
        topic: row.topic,
        lesson_type: lesson_type_label(row.type_code).to_string(),
        date: row.date,
        student_count: row.student_count,
        equipment: equipment.into_iter().collect(),
    }
}

fn undescribed(scheduled: &[i64], described: &BTreeMap<i64, DisciplineDescriptor>) -> Vec<i64> {
    scheduled
        .iter()
        .copied()
        .filter(|id| !described.contains_key(id))
        .collect()
}

impl ReportComposer {
    /// Per-discipline lecture summaries for every discipline taught in the window.
    pub async fn course_report(&self, window: DateWindow) -> Result<Vec<CourseReport>, ReportError> {
        let discipline_ids = self
            .stores
            .relational
            .disciplines_in_window(window.start, window.end)
            .await
            .at(Stage::DisciplineWindow)?;

        if discipline_ids.is_empty() {
            tracing::info!(window = %window, "no disciplines scheduled in window");
            return Ok(Vec::new());
        }

        let hits = self
            .stores
            .search
            .match_terms(DISCIPLINES_INDEX, DISCIPLINE_ID_FIELD, &discipline_ids)
            .await
            .at(Stage::DisciplineLookup)?;
        if hits.is_empty() {
            return Err(ReportError {
                stage: Stage::DisciplineLookup,
                source: StoreError::NotFound(format!(
                    "no discipline documents for ids {discipline_ids:?}"
                )),
            });
        }

        let mut descriptors: BTreeMap<i64, DisciplineDescriptor> = BTreeMap::new();
        for hit in &hits {
            let descriptor = discipline_descriptor(hit).at(Stage::DisciplineLookup)?;
            descriptors
                .entry(descriptor.discipline_id)
                .or_insert(descriptor);
        }
        let undescribed = undescribed(&discipline_ids, &descriptors);
        if !undescribed.is_empty() {
            tracing::warn!(
                discipline_ids = ?undescribed,
                "scheduled disciplines have no search document, excluding them"
            );
        }
        tracing::debug!(
            scheduled = discipline_ids.len(),
            described = descriptors.len(),
            "disciplines resolved"
        );

        let mut reports = Vec::with_capacity(descriptors.len());
        for (discipline_id, discipline) in descriptors {
            let rows = self
                .stores
                .relational
                .lectures_for_discipline(discipline_id, window.start, window.end)
                .await
                .at(Stage::LectureDetails)?;

            reports.push(CourseReport {
                discipline,
                lectures: rows.into_iter().map(summarize).collect(),
            });
        }

        tracing::info!(window = %window, disciplines = reports.len(), "course report generated");
        Ok(reports)
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::calendar::{semester_window, Semester};
    use crate::composer::fixture::Fixture;
    use crate::error::Backend;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn row(topic: &str, type_code: i32, date: NaiveDate, equipment: &[Option<&str>]) -> LectureRow {
        LectureRow {
            topic: topic.to_string(),
            type_code,
            date,
            student_count: 12,
            equipment: equipment.iter().map(|e| e.map(str::to_string)).collect(),
        }
    }

    #[test]
    fn summary_deduplicates_equipment_and_labels_type() {
        let summary = summarize(row(
            "Limits",
            2,
            date(2024, 9, 3),
            &[Some("Projector"), None, Some("Projector"), Some("Board")],
        ));
        assert_eq!(summary.lesson_type, "Practice");
        assert_eq!(summary.equipment, vec!["Board", "Projector"]);

        let unknown = summarize(row("Seminar", 9, date(2024, 9, 3), &[]));
        assert_eq!(unknown.lesson_type, "");
        assert!(unknown.equipment.is_empty());
    }

    #[tokio::test]
    async fn empty_window_is_an_empty_report_for_both_semesters() {
        for semester in [Semester::Fall, Semester::Spring] {
            let mut fixture = Fixture::default();
            fixture.add_discipline(1, "Calculus I", "Limits and derivatives");
            fixture
                .lectures
                .insert(1, vec![row("Limits", 1, date(2020, 10, 1), &[])]);

            let window = semester_window(2024, semester).unwrap();
            let reports = fixture.composer().course_report(window).await.unwrap();
            assert!(reports.is_empty());
        }
    }

    #[tokio::test]
    async fn fall_report_uses_exact_window() {
        let mut fixture = Fixture::default();
        fixture.add_discipline(1, "Calculus I", "Limits and derivatives");
        fixture.add_discipline(2, "Algebra", "Groups and rings");
        fixture.lectures.insert(
            1,
            vec![
                row("Derivatives", 1, date(2024, 10, 8), &[Some("Projector")]),
                row("Limits", 3, date(2024, 9, 1), &[Some("Board"), Some("Board")]),
                row("Outside", 1, date(2025, 1, 10), &[]),
            ],
        );
        fixture
            .lectures
            .insert(2, vec![row("Groups", 2, date(2024, 12, 31), &[])]);
        let (composer, handle) = fixture.with_handle();

        let window = semester_window(2024, Semester::Fall).unwrap();
        let reports = composer.course_report(window).await.unwrap();

        assert_eq!(
            *handle.seen_window.lock().unwrap(),
            Some((date(2024, 9, 1), date(2024, 12, 31)))
        );
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].discipline.name, "Calculus I");
        let topics: Vec<&str> = reports[0].lectures.iter().map(|l| l.topic.as_str()).collect();
        assert_eq!(topics, vec!["Limits", "Derivatives"]);
        assert_eq!(reports[0].lectures[0].lesson_type, "Lab");
        assert_eq!(reports[0].lectures[0].equipment, vec!["Board"]);
        assert_eq!(reports[1].lectures[0].lesson_type, "Practice");
    }

    #[tokio::test]
    async fn missing_descriptors_fail_the_report() {
        let mut fixture = Fixture::default();
        fixture
            .lectures
            .insert(7, vec![row("Limits", 1, date(2025, 3, 4), &[])]);

        let window = semester_window(2024, Semester::Spring).unwrap();
        let err = fixture.composer().course_report(window).await.unwrap_err();
        assert_eq!(err.stage, Stage::DisciplineLookup);
        assert!(matches!(err.source, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn failing_discipline_aborts_without_partial_output() {
        let mut fixture = Fixture::default();
        fixture.add_discipline(1, "Calculus I", "Limits and derivatives");
        fixture.add_discipline(2, "Algebra", "Groups and rings");
        fixture
            .lectures
            .insert(1, vec![row("Limits", 1, date(2024, 9, 3), &[])]);
        fixture
            .lectures
            .insert(2, vec![row("Groups", 2, date(2024, 9, 4), &[])]);
        fixture.failing_discipline = Some(2);

        let window = semester_window(2024, Semester::Fall).unwrap();
        let err = fixture.composer().course_report(window).await.unwrap_err();
        assert_eq!(err.stage, Stage::LectureDetails);
        assert!(err.to_string().contains("discipline 2"));
    }

    #[tokio::test]
    async fn undescribed_disciplines_are_left_out() {
        let mut fixture = Fixture::default();
        fixture.add_discipline(1, "Calculus I", "Limits and derivatives");
        fixture
            .lectures
            .insert(1, vec![row("Limits", 1, date(2024, 9, 3), &[])]);
        fixture
            .lectures
            .insert(3, vec![row("Orphan", 1, date(2024, 9, 5), &[])]);

        let window = semester_window(2024, Semester::Fall).unwrap();
        let reports = fixture.composer().course_report(window).await.unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].discipline.discipline_id, 1);
    }

    #[test]
    fn undescribed_lists_scheduled_ids_without_documents() {
        let mut described = BTreeMap::new();
        described.insert(
            1,
            DisciplineDescriptor {
                discipline_id: 1,
                name: "Calculus I".to_string(),
                description: String::new(),
            },
        );
        assert_eq!(undescribed(&[1, 3, 5], &described), vec![3, 5]);
        assert!(undescribed(&[1], &described).is_empty());
    }

    #[tokio::test]
    async fn relational_failure_is_fail_fast() {
        let fixture = Fixture {
            down: Some(Backend::Relational),
            ..Fixture::default()
        };
        let window = semester_window(2024, Semester::Fall).unwrap();
        let err = fixture.composer().course_report(window).await.unwrap_err();
        assert_eq!(err.stage, Stage::DisciplineWindow);
    }
}
