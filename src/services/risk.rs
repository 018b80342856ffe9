use sqlx::PgConnection;

use crate::core::config::RiskSettings;
use crate::core::time::primitive_now_utc;
use crate::db::models::ExamSession;
use crate::db::types::{SessionStatus, ViolationSeverity};
use crate::repositories;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RiskLevel {
    Low,
    Moderate,
    High,
}

impl RiskLevel {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Moderate => "moderate",
            Self::High => "high",
        }
    }
}

pub(crate) fn severity_weight(settings: &RiskSettings, severity: ViolationSeverity) -> u32 {
    match severity {
        ViolationSeverity::Low => settings.weight_low,
        ViolationSeverity::Medium => settings.weight_medium,
        ViolationSeverity::High => settings.weight_high,
    }
}

/// Deterministic aggregate of a session's violation multiset plus the
/// optional plagiarism estimate. Severity points are scaled onto the
/// 0-100 range and saturate at 100; the plagiarism score contributes at
/// half weight. No violations and no plagiarism input scores exactly 0.
pub(crate) fn compute_score(
    settings: &RiskSettings,
    severities: &[ViolationSeverity],
    plagiarism_score: Option<i32>,
) -> i32 {
    let points: u32 =
        severities.iter().map(|severity| severity_weight(settings, *severity)).sum();
    let violation_component = points.saturating_mul(settings.points_scale).min(100) as i32;
    let plagiarism_component = plagiarism_score.unwrap_or(0) / 2;

    (violation_component + plagiarism_component).min(100)
}

pub(crate) fn should_flag(settings: &RiskSettings, score: i32) -> bool {
    score >= settings.flag_threshold
}

pub(crate) fn assessment(settings: &RiskSettings, score: i32) -> RiskLevel {
    if score >= settings.flag_threshold {
        RiskLevel::High
    } else if score >= 40 {
        RiskLevel::Moderate
    } else {
        RiskLevel::Low
    }
}

/// Severity of the nth tab switch in a session. Early switches are
/// treated leniently, repeated switching escalates.
pub(crate) fn tab_switch_severity(nth: i64) -> ViolationSeverity {
    match nth {
        ..=3 => ViolationSeverity::Low,
        4..=6 => ViolationSeverity::Medium,
        _ => ViolationSeverity::High,
    }
}

pub(crate) struct Rescore {
    pub(crate) score: i32,
    pub(crate) flagged: bool,
}

/// Recompute the session's score from its violation log and latest
/// plagiarism check, persist it, and flag the session when the score
/// crosses the configured threshold. Runs inside the caller's
/// transaction so the violation append and the score update land
/// together. Terminal sessions keep their recorded score untouched.
pub(crate) async fn rescore_session(
    conn: &mut PgConnection,
    settings: &RiskSettings,
    session: &ExamSession,
) -> Result<Rescore, sqlx::Error> {
    let severities =
        repositories::violations::list_severities_for_session(&mut *conn, &session.id).await?;
    let plagiarism =
        repositories::plagiarism_checks::latest_score_for_session(&mut *conn, &session.id).await?;

    let score = compute_score(settings, &severities, plagiarism);

    if session.status != SessionStatus::Active {
        return Ok(Rescore { score, flagged: false });
    }

    let flagged = should_flag(settings, score);
    if flagged {
        repositories::sessions::finish(
            &mut *conn,
            &session.id,
            SessionStatus::Flagged,
            score,
            primitive_now_utc(),
        )
        .await?;
        metrics::counter!("sessions_flagged_total").increment(1);
    } else {
        repositories::sessions::update_score(&mut *conn, &session.id, score).await?;
    }

    Ok(Rescore { score, flagged })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_settings() -> RiskSettings {
        RiskSettings {
            flag_threshold: 70,
            weight_low: 1,
            weight_medium: 3,
            weight_high: 7,
            points_scale: 5,
        }
    }

    #[test]
    fn empty_inputs_score_zero() {
        assert_eq!(compute_score(&test_settings(), &[], None), 0);
    }

    #[test]
    fn score_is_deterministic() {
        let severities = vec![
            ViolationSeverity::Low,
            ViolationSeverity::Medium,
            ViolationSeverity::High,
            ViolationSeverity::Low,
        ];
        let first = compute_score(&test_settings(), &severities, Some(40));
        let second = compute_score(&test_settings(), &severities, Some(40));
        assert_eq!(first, second);
    }

    #[test]
    fn score_never_exceeds_bounds() {
        let settings = test_settings();
        let severities = vec![ViolationSeverity::High; 1000];
        let score = compute_score(&settings, &severities, Some(100));
        assert_eq!(score, 100);

        let score = compute_score(&settings, &[], Some(100));
        assert!((0..=100).contains(&score));
    }

    #[test]
    fn score_grows_monotonically_with_violations() {
        let settings = test_settings();
        let mut severities = Vec::new();
        let mut previous = 0;
        for _ in 0..5 {
            severities.push(ViolationSeverity::Low);
            let score = compute_score(&settings, &severities, None);
            assert!(score >= previous, "score must not decrease as violations accumulate");
            previous = score;
        }
        assert_eq!(previous, 25);
    }

    #[test]
    fn threshold_decides_flagging() {
        let settings = test_settings();
        assert!(!should_flag(&settings, 69));
        assert!(should_flag(&settings, 70));
        assert!(should_flag(&settings, 100));
    }

    #[test]
    fn assessment_levels() {
        let settings = test_settings();
        assert_eq!(assessment(&settings, 0), RiskLevel::Low);
        assert_eq!(assessment(&settings, 39), RiskLevel::Low);
        assert_eq!(assessment(&settings, 40), RiskLevel::Moderate);
        assert_eq!(assessment(&settings, 69), RiskLevel::Moderate);
        assert_eq!(assessment(&settings, 70), RiskLevel::High);
    }

    #[test]
    fn tab_switch_severity_escalates() {
        assert_eq!(tab_switch_severity(1), ViolationSeverity::Low);
        assert_eq!(tab_switch_severity(3), ViolationSeverity::Low);
        assert_eq!(tab_switch_severity(4), ViolationSeverity::Medium);
        assert_eq!(tab_switch_severity(6), ViolationSeverity::Medium);
        assert_eq!(tab_switch_severity(7), ViolationSeverity::High);
        assert_eq!(tab_switch_severity(40), ViolationSeverity::High);
    }
}
