use std::collections::BTreeSet;

use super::{AtStage, ReportComposer, ReportError, Stage};
use crate::calendar::DateWindow;
use crate::models::StudentReport;
use crate::search::{material_id, MATERIALS_INDEX};

pub const ATTENDANCE_REPORT_LIMIT: usize = 10;

const MATERIAL_CONTENT_FIELD: &str = "content";

impl ReportComposer {
    /// Students with the lowest attendance over lessons whose materials
    /// mention `term`, lowest rate first.
    pub async fn attendance_report(
        &self,
        term: &str,
        window: DateWindow,
    ) -> Result<Vec<StudentReport>, ReportError> {
        let hits = self
            .stores
            .search
            .match_phrase(MATERIALS_INDEX, MATERIAL_CONTENT_FIELD, term)
            .await
            .at(Stage::MaterialSearch)?;
        let material_ids: Vec<i64> = hits.iter().filter_map(material_id).collect();
        tracing::debug!(term, hits = hits.len(), materials = material_ids.len(), "materials matched");

        let lessons = self
            .stores
            .graph
            .lessons_for_materials(&material_ids)
            .await
            .at(Stage::LessonTraversal)?;
        let lesson_ids: Vec<i64> = lessons
            .into_iter()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        tracing::debug!(lessons = lesson_ids.len(), "lessons reachable from materials");

        let aggregates = self
            .stores
            .relational
            .attendance_by_lessons(&lesson_ids, window.start, window.end)
            .await
            .at(Stage::AttendanceAggregation)?;

        let reporting_period = window.to_string();
        let mut reports = Vec::with_capacity(aggregates.len());
        for aggregate in aggregates {
            let Some(attendance_rate) = aggregate.rate() else {
                tracing::warn!(
                    student_id = %aggregate.student_id,
                    "no scheduled sessions in window, excluding student"
                );
                continue;
            };

            let profile = match self.stores.profiles.profile(&aggregate.student_id).await {
                Ok(profile) => profile,
                Err(err) => {
                    tracing::warn!(
                        student_id = %aggregate.student_id,
                        error = %err,
                        "failed to get student details, excluding student"
                    );
                    continue;
                }
            };

            reports.push(StudentReport {
                profile,
                attendance_rate,
                reporting_period: reporting_period.clone(),
                matched_term: term.to_string(),
            });
        }

        reports.sort_by(|a, b| a.attendance_rate.total_cmp(&b.attendance_rate));
        reports.truncate(ATTENDANCE_REPORT_LIMIT);

        tracing::info!(term, students = reports.len(), "attendance report generated");
        Ok(reports)
    }
}
