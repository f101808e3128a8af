use std::fmt::Write;

use crate::models::{CourseReport, GroupReport, StudentReport};

pub fn attendance_markdown(term: &str, period: &str, reports: &[StudentReport]) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Attendance Report");
    let _ = writeln!(output, "Materials matching \"{}\", {}", term, period);
    let _ = writeln!(output);
    let _ = writeln!(output, "## Lowest Attendance");

    if reports.is_empty() {
        let _ = writeln!(output, "No students attended matching lessons in this window.");
    } else {
        for report in reports {
            let _ = writeln!(
                output,
                "- {} ({}, {}, course {}) attendance {:.0}%",
                report.profile.name,
                report.profile.group,
                report.profile.email,
                report.profile.course,
                report.attendance_rate * 100.0
            );
        }
    }

    output
}

pub fn course_markdown(period: &str, reports: &[CourseReport]) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Course Report");
    let _ = writeln!(output, "Lectures scheduled {}", period);

    if reports.is_empty() {
        let _ = writeln!(output);
        let _ = writeln!(output, "No disciplines scheduled in this window.");
        return output;
    }

    for report in reports {
        let _ = writeln!(output);
        let _ = writeln!(output, "## {}", report.discipline.name);
        if !report.discipline.description.is_empty() {
            let _ = writeln!(output, "{}", report.discipline.description);
        }
        for lecture in &report.lectures {
            let label = if lecture.lesson_type.is_empty() {
                "Session"
            } else {
                lecture.lesson_type.as_str()
            };
            let _ = write!(
                output,
                "- {} {}: {} ({} students)",
                lecture.date, label, lecture.topic, lecture.student_count
            );
            if !lecture.equipment.is_empty() {
                let _ = write!(output, ", needs {}", lecture.equipment.join(", "));
            }
            let _ = writeln!(output);
        }
    }

    output
}

pub fn group_markdown(report: &GroupReport) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Group Report: {}", report.group_name);

    if report.students.is_empty() {
        let _ = writeln!(output);
        let _ = writeln!(output, "No students enrolled in this group.");
        return output;
    }

    for student in &report.students {
        let _ = writeln!(output);
        let _ = writeln!(
            output,
            "## {} ({})",
            student.profile.name, student.profile.student_id
        );
        if student.disciplines.is_empty() {
            let _ = writeln!(output, "No special disciplines.");
        }
        for discipline in &student.disciplines {
            let _ = writeln!(
                output,
                "- {}: attended {} of {} hours",
                discipline.discipline.name, discipline.attended_hours, discipline.planned_hours
            );
        }
    }

    output
}
