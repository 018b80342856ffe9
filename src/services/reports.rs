use std::collections::BTreeMap;

use crate::core::config::RiskSettings;
use crate::db::models::{Exam, ExamSession, PlagiarismCheck, User, Violation};
use crate::db::types::ViolationSeverity;
use crate::schemas::report::ReportSummary;
use crate::services::risk::{self, RiskLevel};

pub(crate) struct ReportInputs<'a> {
    pub(crate) session: &'a ExamSession,
    pub(crate) exam: &'a Exam,
    pub(crate) student: &'a User,
    pub(crate) violations: &'a [Violation],
    pub(crate) plagiarism: Option<&'a PlagiarismCheck>,
}

/// Assemble the point-in-time summary for a session. The score is
/// recomputed from the violation log so the snapshot agrees with the
/// scorer regardless of when the report is generated.
pub(crate) fn build_summary(settings: &RiskSettings, inputs: ReportInputs<'_>) -> ReportSummary {
    let severities: Vec<ViolationSeverity> =
        inputs.violations.iter().map(|violation| violation.severity).collect();
    let plagiarism_score = inputs.plagiarism.map(|check| check.plagiarism_score);

    let cheating_score = risk::compute_score(settings, &severities, plagiarism_score);
    let risk_level = risk::assessment(settings, cheating_score);

    let mut violations_by_type: BTreeMap<String, i64> = BTreeMap::new();
    for violation in inputs.violations {
        *violations_by_type.entry(violation.violation_type.as_str().to_string()).or_default() += 1;
    }

    let flagged_incidents: Vec<String> = inputs
        .violations
        .iter()
        .filter(|violation| violation.severity != ViolationSeverity::Low)
        .map(|violation| violation.description.clone())
        .collect();

    let elapsed_minutes = inputs
        .session
        .ended_at
        .map(|ended| (ended - inputs.session.started_at).whole_minutes());

    ReportSummary {
        session_id: inputs.session.id.clone(),
        exam_id: inputs.exam.id.clone(),
        exam_title: inputs.exam.title.clone(),
        student_id: inputs.student.id.clone(),
        student_name: inputs.student.full_name.clone(),
        exam_duration_minutes: inputs.exam.duration_minutes,
        elapsed_minutes,
        status: inputs.session.status,
        cheating_score,
        risk_level: risk_level.as_str().to_string(),
        violations_count: inputs.violations.len() as i64,
        violations_by_type,
        tab_switches: inputs.session.tab_switches,
        plagiarism_score,
        recommendations: recommendations(risk_level, plagiarism_score),
        flagged_incidents,
    }
}

fn recommendations(level: RiskLevel, plagiarism_score: Option<i32>) -> Vec<String> {
    let mut output = match level {
        RiskLevel::High => vec![
            "Escalate this attempt for manual review before releasing any result.".to_string(),
            "Cross-check the flagged incidents against the webcam snapshots.".to_string(),
        ],
        RiskLevel::Moderate => {
            vec!["Review the flagged incidents before accepting this attempt.".to_string()]
        }
        RiskLevel::Low => vec!["No action required.".to_string()],
    };

    if plagiarism_score.unwrap_or(0) >= 50 {
        output.push("Compare the submitted text against the matched sources.".to_string());
    }

    output
}
