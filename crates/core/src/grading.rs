//! Grading Results
//!
//! Parses the free-text answer of the grading model into a strict
//! [`GradeReport`] and derives the final [`Grade`] from it. The pass/fail
//! status of a grade is always computed from the score; the label the model
//! wrote is only kept for diagnostics.

use std::fmt;
use std::str::FromStr;

pub const MAX_SCORE: u8 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GradeStatus {
    Pass,
    Fail,
}

impl GradeStatus {
    /// `Pass` iff `score >= threshold`.
    pub fn for_score(score: u8, threshold: u8) -> Self {
        if score >= threshold {
            GradeStatus::Pass
        } else {
            GradeStatus::Fail
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            GradeStatus::Pass => "Pass",
            GradeStatus::Fail => "Fail",
        }
    }
}

impl fmt::Display for GradeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown grade status '{0}'")]
pub struct UnknownStatus(pub String);

impl FromStr for GradeStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            s if s.eq_ignore_ascii_case("pass") => Ok(GradeStatus::Pass),
            s if s.eq_ignore_ascii_case("fail") => Ok(GradeStatus::Fail),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// What the grading model returned, validated but not yet trusted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GradeReport {
    /// The score exactly as written by the model; may be out of range.
    pub raw_score: i64,
    /// The status label the model wrote, if any.
    pub claimed_status: Option<String>,
    pub feedback: String,
}

/// The grading response had no usable `Score:` line.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("grading response has no numeric score")]
pub struct MissingScore;

impl GradeReport {
    /// Parses a response in the `Score: / Status: / Feedback:` layout.
    ///
    /// Markdown emphasis and headings around the field names are tolerated and
    /// the field names are matched case-insensitively. A fractional score is
    /// scaled to the 100-point scale: `Score: 72/100` reads as 72 and
    /// `Score: 8/10` as 80, while a zero denominator is no score at all. Feedback may span several lines; without a `Feedback:` field the
    /// whole response is used.
    pub fn parse(response: &str) -> Result<Self, MissingScore> {
        let mut raw_score = None;
        let mut claimed_status = None;
        let mut feedback: Option<Vec<&str>> = None;

        for line in response.lines() {
            match field(line) {
                Some(("score", value)) if raw_score.is_none() => {
                    raw_score = score_value(value);
                }
                Some(("status", value)) if claimed_status.is_none() => {
                    let value = strip_emphasis(value);
                    if !value.is_empty() {
                        claimed_status = Some(value.to_string());
                    }
                }
                Some(("feedback", value)) if feedback.is_none() => {
                    feedback = Some(vec![strip_emphasis(value)]);
                }
                _ => {
                    if let Some(lines) = feedback.as_mut() {
                        lines.push(line.trim());
                    }
                }
            }
        }

        let raw_score = raw_score.ok_or(MissingScore)?;
        let feedback = match feedback {
            Some(lines) => lines.join("\n").trim().to_string(),
            None => response.trim().to_string(),
        };

        Ok(Self {
            raw_score,
            claimed_status,
            feedback,
        })
    }
}

/// Splits `**Score:** 72` into `("score", "72")`.
fn field(line: &str) -> Option<(&'static str, &str)> {
    let line = line.trim_start_matches(|c: char| c.is_whitespace() || matches!(c, '*' | '#' | '_' | '-'));
    let (name, rest) = line.split_once(':')?;
    let name = name.trim_end_matches(['*', '_', ' ']);
    let key = ["score", "status", "feedback"]
        .into_iter()
        .find(|key| name.eq_ignore_ascii_case(key))?;
    Some((key, rest))
}

fn strip_emphasis(value: &str) -> &str {
    value.trim_matches(|c: char| c.is_whitespace() || matches!(c, '*' | '_'))
}

/// The score in `value`, scaled to 100 points when written as `N/D`.
fn score_value(value: &str) -> Option<i64> {
    let (numerator, rest) = leading_integer(value)?;
    let Some(denominator) = rest.trim_start().strip_prefix('/') else {
        return Some(numerator);
    };
    let denominator = denominator.trim_start();
    if !denominator.starts_with(|c: char| c.is_ascii_digit()) {
        return Some(numerator);
    }
    match leading_integer(denominator)?.0 {
        0 => None,
        100 => Some(numerator),
        d => Some((numerator as f64 * f64::from(MAX_SCORE) / d as f64).round() as i64),
    }
}

/// The first integer in `value` and the text after it, honouring a directly
/// preceding minus sign. Values too large for `i64` saturate.
fn leading_integer(value: &str) -> Option<(i64, &str)> {
    let start = value.find(|c: char| c.is_ascii_digit())?;
    let len = value[start..]
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(value.len() - start);
    let end = start + len;
    let magnitude = value[start..end].parse::<i64>().unwrap_or(i64::MAX);
    let negative = value[..start].ends_with('-');
    Some((if negative { -magnitude } else { magnitude }, &value[end..]))
}

/// The final grade of a session as it will be persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grade {
    pub score: u8,
    pub status: GradeStatus,
    pub feedback: String,
}

impl Grade {
    /// Clamps the score into `0..=100` and derives the status from it.
    pub fn from_report(report: GradeReport, pass_threshold: u8) -> Self {
        let score = report.raw_score.clamp(0, MAX_SCORE as i64) as u8;
        let status = GradeStatus::for_score(score, pass_threshold);

        if let Some(claimed) = report.claimed_status.as_deref() {
            match claimed.parse::<GradeStatus>() {
                Ok(claimed) if claimed == status => {}
                _ => tracing::warn!(
                    score,
                    claimed,
                    derived = %status,
                    "Grading model status disagrees with its score; using the score"
                ),
            }
        }

        Self {
            score,
            status,
            feedback: report.feedback,
        }
    }
}
