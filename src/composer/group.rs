use super::{AtStage, ReportComposer, ReportError, Stage};
use crate::calendar::hours_for_sessions;
use crate::error::StoreError;
use crate::models::{DisciplineDescriptor, DisciplineReport, GroupReport, StudentHours};
use crate::search::{discipline_descriptor, DISCIPLINES_INDEX};

const DISCIPLINE_ID_FIELD: &str = "discipline_id";

impl ReportComposer {
    /// Planned and attended hours for every student of `group_name` across
    /// the group's special disciplines.
    ///
    /// Any missing profile or descriptor aborts the whole report.
    pub async fn group_report(&self, group_name: &str) -> Result<GroupReport, ReportError> {
        let roster = self
            .stores
            .relational
            .group_roster(group_name)
            .await
            .at(Stage::GroupRoster)?;

        let mut profiles = Vec::with_capacity(roster.card_ids.len());
        for card_id in &roster.card_ids {
            let profile = self
                .stores
                .profiles
                .profile(card_id)
                .await
                .at(Stage::ProfileFetch)?;
            profiles.push(profile);
        }

        let disciplines = self
            .stores
            .relational
            .special_disciplines(roster.group_id)
            .await
            .at(Stage::SpecialDisciplines)?;
        tracing::debug!(
            group = group_name,
            students = profiles.len(),
            disciplines = disciplines.len(),
            "group roster resolved"
        );

        let mut students = Vec::with_capacity(profiles.len());
        for profile in profiles {
            let mut reports = Vec::with_capacity(disciplines.len());
            for &discipline_id in &disciplines {
                let discipline = self.discipline_by_id(discipline_id).await?;
                let counts = self
                    .stores
                    .relational
                    .session_counts(discipline_id, roster.group_id, &profile.student_id)
                    .await
                    .at(Stage::HourCount)?;

                reports.push(DisciplineReport {
                    discipline,
                    planned_hours: hours_for_sessions(counts.scheduled),
                    attended_hours: hours_for_sessions(counts.attended),
                });
            }
            students.push(StudentHours {
                profile,
                disciplines: reports,
            });
        }

        tracing::info!(group = group_name, students = students.len(), "group report generated");
        Ok(GroupReport {
            group_id: roster.group_id,
            group_name: group_name.to_string(),
            students,
        })
    }

    async fn discipline_by_id(&self, discipline_id: i64) -> Result<DisciplineDescriptor, ReportError> {
        let hits = self
            .stores
            .search
            .match_terms(DISCIPLINES_INDEX, DISCIPLINE_ID_FIELD, &[discipline_id])
            .await
            .at(Stage::DisciplineLookup)?;

        let hit = hits
            .first()
            .ok_or_else(|| StoreError::NotFound(format!("discipline {discipline_id}")))
            .at(Stage::DisciplineLookup)?;
        discipline_descriptor(hit).at(Stage::DisciplineLookup)
    }
}
