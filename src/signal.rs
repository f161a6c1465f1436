use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Risk level derived from an additive risk score. Never stored on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub fn from_score(score: f64) -> Self {
        if score >= 80.0 {
            RiskLevel::Critical
        } else if score >= 60.0 {
            RiskLevel::High
        } else if score >= 30.0 {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::Critical => "critical",
        }
    }
}

/// Scored finding shared by every sub-analysis and by the aggregate verdict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub risk_score: f64,
    pub confidence: f64,
    pub indicators: BTreeSet<String>,
}

/// Verdict produced by every sub-analysis and by aggregation.
///
/// `Scored` is a completed analysis (including the all-zero one), `Degraded`
/// is the fixed low-information verdict used when required collaborators are
/// missing, and `Error` means the input could not be processed at all.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum SignalResult {
    Scored(Signal),
    Degraded(Signal),
    Error {
        message: String,
        indicators: BTreeSet<String>,
    },
}

impl SignalResult {
    /// Zero result for empty or missing input.
    pub fn zero() -> Self {
        SignalResult::Scored(Signal {
            risk_score: 0.0,
            confidence: 0.0,
            indicators: BTreeSet::new(),
        })
    }

    pub fn scored(risk_score: f64, confidence: f64, indicators: BTreeSet<String>) -> Self {
        SignalResult::Scored(Signal {
            risk_score,
            confidence,
            indicators,
        })
    }

    pub fn degraded(risk_score: f64, confidence: f64, indicators: BTreeSet<String>) -> Self {
        SignalResult::Degraded(Signal {
            risk_score,
            confidence,
            indicators,
        })
    }

    pub fn error(message: impl Into<String>) -> Self {
        let mut indicators = BTreeSet::new();
        indicators.insert("analysis_error".to_string());
        SignalResult::Error {
            message: message.into(),
            indicators,
        }
    }

    /// The score-carrying part, if any. Error results carry none.
    pub fn signal(&self) -> Option<&Signal> {
        match self {
            SignalResult::Scored(signal) | SignalResult::Degraded(signal) => Some(signal),
            SignalResult::Error { .. } => None,
        }
    }

    pub fn risk_score(&self) -> f64 {
        self.signal().map(|s| s.risk_score).unwrap_or(0.0)
    }

    pub fn confidence(&self) -> f64 {
        self.signal().map(|s| s.confidence).unwrap_or(0.0)
    }

    pub fn indicators(&self) -> &BTreeSet<String> {
        match self {
            SignalResult::Scored(signal) | SignalResult::Degraded(signal) => &signal.indicators,
            SignalResult::Error { indicators, .. } => indicators,
        }
    }

    /// Derived risk level. Error results have none.
    pub fn risk_level(&self) -> Option<RiskLevel> {
        self.signal().map(|s| RiskLevel::from_score(s.risk_score))
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            SignalResult::Error { message, .. } => Some(message),
            _ => None,
        }
    }
}

/// Fold a batch of sub-analysis results into one verdict.
///
/// Scores add up and indicator sets union, so the outcome is insensitive to
/// the order results arrive in. Confidence is the arithmetic mean over the
/// score-carrying entries; error entries are skipped. With no valid entries
/// the combined confidence is 0.
pub fn combine(results: &[SignalResult]) -> SignalResult {
    let mut total_risk = 0.0;
    let mut total_confidence = 0.0;
    let mut valid = 0usize;
    let mut indicators = BTreeSet::new();

    for result in results {
        if let Some(signal) = result.signal() {
            total_risk += signal.risk_score;
            total_confidence += signal.confidence;
            indicators.extend(signal.indicators.iter().cloned());
            valid += 1;
        }
    }

    let confidence = if valid > 0 {
        total_confidence / valid as f64
    } else {
        0.0
    };

    SignalResult::scored(total_risk, confidence, indicators)
}

/// Merge two verdicts by taking the stronger score rather than the sum.
///
/// Used for whole-email analysis where the body verdict and the sender verdict
/// describe the same message: the higher risk wins, indicators union, and the
/// confidences average. An error input yields the other result unchanged.
pub fn merge_strongest(a: &SignalResult, b: &SignalResult) -> SignalResult {
    match (a.signal(), b.signal()) {
        (Some(sa), Some(sb)) => {
            let mut indicators = sa.indicators.clone();
            indicators.extend(sb.indicators.iter().cloned());
            SignalResult::scored(
                sa.risk_score.max(sb.risk_score),
                (sa.confidence + sb.confidence) / 2.0,
                indicators,
            )
        }
        (Some(_), None) => a.clone(),
        (None, _) => b.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tagged(score: f64, confidence: f64, tags: &[&str]) -> SignalResult {
        SignalResult::scored(
            score,
            confidence,
            tags.iter().map(|t| t.to_string()).collect(),
        )
    }

    #[test]
    fn test_risk_level_boundaries() {
        assert_eq!(RiskLevel::from_score(0.0), RiskLevel::Low);
        assert_eq!(RiskLevel::from_score(29.0), RiskLevel::Low);
        assert_eq!(RiskLevel::from_score(30.0), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_score(59.0), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_score(60.0), RiskLevel::High);
        assert_eq!(RiskLevel::from_score(79.0), RiskLevel::High);
        assert_eq!(RiskLevel::from_score(80.0), RiskLevel::Critical);
        assert_eq!(RiskLevel::from_score(150.0), RiskLevel::Critical);
    }

    #[test]
    fn test_combine_sums_scores_and_unions_indicators() {
        let results = vec![
            tagged(10.0, 0.6, &["excessive_caps"]),
            tagged(40.0, 0.8, &["bad_url_reputation", "excessive_caps"]),
        ];

        let combined = combine(&results);
        assert_eq!(combined.risk_score(), 50.0);
        assert_eq!(combined.indicators().len(), 2);
        assert!((combined.confidence() - 0.7).abs() < 1e-9);
        assert_eq!(combined.risk_level(), Some(RiskLevel::Medium));
    }

    #[test]
    fn test_combine_is_order_independent() {
        let results = vec![
            tagged(25.0, 0.6, &["suspicious_url_in_text"]),
            tagged(15.0, 0.7, &["urgency_keywords_found"]),
            tagged(0.0, 0.0, &[]),
        ];
        let mut reversed = results.clone();
        reversed.reverse();

        let a = combine(&results);
        let b = combine(&reversed);
        assert_eq!(a.risk_score(), b.risk_score());
        assert_eq!(a.indicators(), b.indicators());
    }

    #[test]
    fn test_combine_skips_error_entries() {
        let results = vec![
            tagged(20.0, 0.5, &["impersonal_greeting"]),
            SignalResult::error("ocr backend offline"),
        ];

        let combined = combine(&results);
        assert_eq!(combined.risk_score(), 20.0);
        assert_eq!(combined.confidence(), 0.5);
        assert!(!combined.indicators().contains("analysis_error"));
    }

    #[test]
    fn test_combine_empty_input_yields_zero_confidence() {
        let combined = combine(&[]);
        assert_eq!(combined.risk_score(), 0.0);
        assert_eq!(combined.confidence(), 0.0);
        assert!(combined.indicators().is_empty());
        assert_eq!(combined.risk_level(), Some(RiskLevel::Low));
    }

    #[test]
    fn test_error_result_shape() {
        let result = SignalResult::error("failed to load image");
        assert_eq!(result.risk_score(), 0.0);
        assert_eq!(result.confidence(), 0.0);
        assert_eq!(result.risk_level(), None);
        assert!(result.indicators().contains("analysis_error"));
        assert_eq!(result.error_message(), Some("failed to load image"));
    }

    #[test]
    fn test_merge_strongest_takes_max_and_averages_confidence() {
        let body = tagged(45.0, 0.6, &["urgency_keywords_found"]);
        let sender = tagged(70.0, 0.8, &["typosquatting"]);

        let merged = merge_strongest(&body, &sender);
        assert_eq!(merged.risk_score(), 70.0);
        assert!((merged.confidence() - 0.7).abs() < 1e-9);
        assert!(merged.indicators().contains("urgency_keywords_found"));
        assert!(merged.indicators().contains("typosquatting"));
        assert_eq!(merged.risk_level(), Some(RiskLevel::High));
    }

    #[test]
    fn test_merge_strongest_with_error_side() {
        let body = tagged(45.0, 0.6, &["urgency_keywords_found"]);
        let failed = SignalResult::error("no input");

        assert_eq!(merge_strongest(&body, &failed), body);
        assert_eq!(merge_strongest(&failed, &body), body);
    }
}
