use std::fmt;

use chrono::NaiveDate;

/// Hours credited per scheduled session.
pub const HOURS_PER_SESSION: i64 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Semester {
    Fall,
    Spring,
}

impl TryFrom<u32> for Semester {
    type Error = String;

    fn try_from(index: u32) -> Result<Self, Self::Error> {
        match index {
            1 => Ok(Semester::Fall),
            2 => Ok(Semester::Spring),
            other => Err(format!("'sem' must be 1 or 2, got {other}")),
        }
    }
}

/// Inclusive date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, String> {
        if start > end {
            return Err(format!("'startDate' {start} is after 'endDate' {end}"));
        }
        Ok(Self { start, end })
    }
}

impl fmt::Display for DateWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} to {}", self.start, self.end)
    }
}

/// Academic-year convention: fall runs Sep 1 to Dec 31 of `year`, spring
/// runs Mar 1 to Aug 31 of the following calendar year.
pub fn semester_window(year: i32, semester: Semester) -> Option<DateWindow> {
    let (start, end) = match semester {
        Semester::Fall => (
            NaiveDate::from_ymd_opt(year, 9, 1)?,
            NaiveDate::from_ymd_opt(year, 12, 31)?,
        ),
        Semester::Spring => (
            NaiveDate::from_ymd_opt(year.checked_add(1)?, 3, 1)?,
            NaiveDate::from_ymd_opt(year.checked_add(1)?, 8, 31)?,
        ),
    };
    Some(DateWindow { start, end })
}

pub fn lesson_type_label(code: i32) -> &'static str {
    match code {
        1 => "Lecture",
        2 => "Practice",
        3 => "Lab",
        _ => "",
    }
}

pub fn hours_for_sessions(sessions: i64) -> i64 {
    sessions.max(0) * HOURS_PER_SESSION
}
