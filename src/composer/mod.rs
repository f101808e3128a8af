//! Report composition across the four stores.
//!
//! Every report is a strictly sequential chain of adapter calls. Store
//! failures are wrapped with the [`Stage`] that issued the call; the only
//! recoverable failure is a profile miss inside the attendance report.

use std::fmt;

use thiserror::Error;

use crate::error::StoreError;
use crate::stores::Stores;

mod attendance;
mod course;
mod group;

#[cfg(test)]
pub(crate) mod fixture;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    MaterialSearch,
    LessonTraversal,
    AttendanceAggregation,
    DisciplineWindow,
    DisciplineLookup,
    LectureDetails,
    GroupRoster,
    ProfileFetch,
    SpecialDisciplines,
    HourCount,
    GroupListing,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::MaterialSearch => "material search",
            Stage::LessonTraversal => "lesson traversal",
            Stage::AttendanceAggregation => "attendance aggregation",
            Stage::DisciplineWindow => "discipline window",
            Stage::DisciplineLookup => "discipline lookup",
            Stage::LectureDetails => "lecture details",
            Stage::GroupRoster => "group roster",
            Stage::ProfileFetch => "profile fetch",
            Stage::SpecialDisciplines => "special disciplines",
            Stage::HourCount => "hour count",
            Stage::GroupListing => "group listing",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
#[error("{stage}: {source}")]
pub struct ReportError {
    pub stage: Stage,
    #[source]
    pub source: StoreError,
}

trait AtStage<T> {
    fn at(self, stage: Stage) -> Result<T, ReportError>;
}

impl<T> AtStage<T> for Result<T, StoreError> {
    fn at(self, stage: Stage) -> Result<T, ReportError> {
        self.map_err(|source| ReportError { stage, source })
    }
}

/// Entry point for the three reports and the group listing.
#[derive(Clone)]
pub struct ReportComposer {
    stores: Stores,
}

impl ReportComposer {
    pub fn new(stores: Stores) -> Self {
        Self { stores }
    }

    pub async fn group_names(&self) -> Result<Vec<String>, ReportError> {
        self.stores
            .relational
            .group_names()
            .await
            .at(Stage::GroupListing)
    }
}
