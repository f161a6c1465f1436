use crate::config::SenderConfig;
use crate::domain_utils::levenshtein;
use crate::signal::SignalResult;
use regex::Regex;
use std::collections::BTreeSet;

/// Scores sender addresses for spoofing tells: risky TLDs, typosquatted or
/// subdomain-spoofed trusted domains, and brand names in the display part.
pub struct SenderIdentityAnalyzer {
    config: SenderConfig,
    domain_regex: Regex,
}

impl SenderIdentityAnalyzer {
    pub fn new(config: SenderConfig) -> Self {
        Self {
            domain_regex: Regex::new(r"@([^>\s]+)").unwrap(),
            config,
        }
    }

    pub fn analyze_sender(&self, sender: &str) -> SignalResult {
        if sender.is_empty() {
            return SignalResult::zero();
        }

        let normalized = sender.to_lowercase();
        let normalized = normalized.trim();

        let mut indicators = BTreeSet::new();
        let mut risk_score = 0.0;

        if let Some(capture) = self.domain_regex.captures(normalized) {
            let domain = &capture[1];

            if self
                .config
                .suspicious_tlds
                .iter()
                .any(|tld| domain.ends_with(tld.as_str()))
            {
                indicators.insert("suspicious_tld".to_string());
                risk_score += 30.0;
            }

            if self.is_typosquatted(domain) {
                indicators.insert("typosquatting".to_string());
                risk_score += 40.0;
            }

            if self.is_subdomain_spoof(domain) {
                indicators.insert("subdomain_spoof".to_string());
                risk_score += 35.0;
            }
        }

        if normalized.contains('<') && normalized.contains('>') {
            let display_name = normalized.split('<').next().unwrap_or("").trim();
            if self.is_spoofed_display_name(display_name) {
                indicators.insert("display_name_spoof".to_string());
                risk_score += 25.0;
            }
        }

        SignalResult::scored(risk_score, 0.8, indicators)
    }

    /// Close to a trusted domain but not equal to it.
    fn is_typosquatted(&self, domain: &str) -> bool {
        self.config.trusted_domains.iter().any(|trusted| {
            let distance = levenshtein(domain, trusted);
            distance > 0 && distance <= 2
        })
    }

    /// Trusted domain embedded somewhere other than the registrable suffix.
    fn is_subdomain_spoof(&self, domain: &str) -> bool {
        self.config
            .trusted_domains
            .iter()
            .any(|trusted| domain.contains(trusted.as_str()) && !domain.ends_with(trusted.as_str()))
    }

    fn is_spoofed_display_name(&self, display_name: &str) -> bool {
        self.config
            .trusted_display_names
            .iter()
            .any(|name| display_name.contains(name.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::RiskLevel;

    fn analyzer() -> SenderIdentityAnalyzer {
        SenderIdentityAnalyzer::new(SenderConfig::default())
    }

    #[test]
    fn test_empty_sender_zero_result() {
        let result = analyzer().analyze_sender("");
        assert_eq!(result.risk_score(), 0.0);
        assert_eq!(result.confidence(), 0.0);
        assert!(result.indicators().is_empty());
    }

    #[test]
    fn test_trusted_domain_is_clean() {
        let result = analyzer().analyze_sender("support@paypal.com");
        assert_eq!(result.risk_score(), 0.0);
        assert!(result.indicators().is_empty());
        assert_eq!(result.confidence(), 0.8);
    }

    #[test]
    fn test_exact_trusted_domain_not_typosquatting() {
        let result = analyzer().analyze_sender("notifications@google.com");
        assert!(!result.indicators().contains("typosquatting"));
        assert_eq!(result.risk_score(), 0.0);
    }

    #[test]
    fn test_typosquatted_domain_flagged() {
        let result = analyzer().analyze_sender("Security Team <support@gooogle.com>");
        assert!(result.indicators().contains("typosquatting"));
        assert_eq!(result.risk_score(), 40.0);
        assert_eq!(result.risk_level(), Some(RiskLevel::Medium));
    }

    #[test]
    fn test_suspicious_tld_flagged() {
        let result = analyzer().analyze_sender("winner@prizes.tk");
        assert!(result.indicators().contains("suspicious_tld"));
        assert_eq!(result.risk_score(), 30.0);
    }

    #[test]
    fn test_subdomain_spoof_flagged() {
        let result = analyzer().analyze_sender("security@paypal.com.evil-domain.net");
        assert!(result.indicators().contains("subdomain_spoof"));
        assert_eq!(result.risk_score(), 35.0);
    }

    #[test]
    fn test_display_name_spoof_flagged() {
        let result = analyzer().analyze_sender("PayPal Support <noreply@random-mail.example>");
        assert!(result.indicators().contains("display_name_spoof"));
        assert_eq!(result.risk_score(), 25.0);
    }

    #[test]
    fn test_stacked_spoofing_signals() {
        let result = analyzer().analyze_sender("PayPal <support@paypal.com.attacker.tk>");
        assert!(result.indicators().contains("suspicious_tld"));
        assert!(result.indicators().contains("subdomain_spoof"));
        assert!(result.indicators().contains("display_name_spoof"));
        assert_eq!(result.risk_score(), 90.0);
        assert_eq!(result.risk_level(), Some(RiskLevel::Critical));
    }

    #[test]
    fn test_sender_without_address_part() {
        let result = analyzer().analyze_sender("just a name");
        assert_eq!(result.risk_score(), 0.0);
        assert_eq!(result.confidence(), 0.8);
    }
}
