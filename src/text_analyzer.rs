use crate::collaborators::TextClassifier;
use crate::config::TextConfig;
use crate::domain_utils::{has_suspicious_structure, UrlInspector};
use crate::signal::{combine, SignalResult};
use regex::Regex;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Scores message bodies by folding five independent sub-analyses:
/// keywords, structural patterns, link checks, composition tells and an
/// optional external classifier.
pub struct TextSignalEngine {
    config: TextConfig,
    url_inspector: UrlInspector,
    markdown_regex: Regex,
    grammar_regexes: Vec<Regex>,
    classifier: Option<Arc<dyn TextClassifier>>,
}

impl TextSignalEngine {
    pub fn new(config: TextConfig) -> Self {
        Self::with_classifier(config, None)
    }

    pub fn with_classifier(
        config: TextConfig,
        classifier: Option<Arc<dyn TextClassifier>>,
    ) -> Self {
        let url_inspector = UrlInspector::new(config.suspicious_tlds.clone());
        let grammar_patterns = [
            r"\b(dear customer|dear user)\b",
            r"\bkindly\b",
            r"\bdo the needful\b",
            r"\batm machine\b",
            r"\bpin number\b",
        ];

        Self {
            url_inspector,
            markdown_regex: Regex::new(r"\[([^\]]+)\]\(([^)]+)\)").unwrap(),
            grammar_regexes: grammar_patterns
                .iter()
                .map(|p| Regex::new(p).unwrap())
                .collect(),
            classifier,
            config,
        }
    }

    pub fn analyze(&self, text: &str) -> SignalResult {
        if text.is_empty() {
            return SignalResult::zero();
        }

        let normalized = text.to_lowercase();
        let normalized = normalized.trim();

        let analyses = [
            self.keyword_analysis(normalized),
            self.pattern_analysis(normalized),
            self.link_analysis(normalized),
            self.composition_analysis(normalized),
            self.classifier_analysis(normalized),
        ];
        combine(&analyses)
    }

    /// Body analysis plus structural checks that only make sense for a bare
    /// URL: excessive length, hyphens or dots.
    pub fn analyze_url(&self, url: &str) -> SignalResult {
        let result = self.analyze(url);
        if !has_suspicious_structure(url) {
            return result;
        }

        match result {
            SignalResult::Scored(mut signal) => {
                signal.risk_score += 10.0;
                signal
                    .indicators
                    .insert("suspicious_url_structure".to_string());
                SignalResult::Scored(signal)
            }
            other => other,
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.analyze("This is a test message").signal().is_some()
    }

    fn keyword_analysis(&self, text: &str) -> SignalResult {
        let categories: [(&str, &Vec<String>, f64); 5] = [
            ("urgency_keywords", &self.config.urgency_keywords, 10.0),
            ("threat_keywords", &self.config.threat_keywords, 10.0),
            ("financial_keywords", &self.config.financial_keywords, 15.0),
            ("credential_keywords", &self.config.credential_keywords, 15.0),
            ("suspicious_greetings", &self.config.suspicious_greetings, 10.0),
        ];

        let mut indicators = BTreeSet::new();
        let mut risk_score = 0.0;
        for (category, keywords, weight) in categories {
            let hits = keywords
                .iter()
                .filter(|keyword| text.contains(keyword.as_str()))
                .count();
            if hits > 0 {
                indicators.insert(format!("{}_found", category));
                risk_score += hits as f64 * weight;
            }
        }

        SignalResult::scored(risk_score, 0.7, indicators)
    }

    fn pattern_analysis(&self, text: &str) -> SignalResult {
        let mut indicators = BTreeSet::new();
        let mut risk_score = 0.0;

        // Check for excessive capitalization
        let caps_ratio = if text.is_empty() {
            0.0
        } else {
            text.chars().filter(|c| c.is_uppercase()).count() as f64
                / text.chars().count() as f64
        };
        if caps_ratio > 0.3 {
            indicators.insert("excessive_caps".to_string());
            risk_score += 10.0;
        }

        // Check for excessive exclamation marks
        if text.matches('!').count() > 3 {
            indicators.insert("excessive_exclamations".to_string());
            risk_score += 10.0;
        }

        for url in self.url_inspector.extract_urls(text) {
            if self.url_inspector.is_suspicious(url) {
                indicators.insert("suspicious_url_in_text".to_string());
                risk_score += 25.0;
                break;
            }
        }

        if self.has_mismatched_urls(text) {
            indicators.insert("mismatched_urls".to_string());
            risk_score += 30.0;
        }

        SignalResult::scored(risk_score, 0.6, indicators)
    }

    fn link_analysis(&self, text: &str) -> SignalResult {
        let mut indicators = BTreeSet::new();
        let mut risk_score = 0.0;

        for url in self.url_inspector.extract_urls(text) {
            if self
                .config
                .reputation_keywords
                .iter()
                .any(|keyword| url.contains(keyword.as_str()))
            {
                indicators.insert("bad_url_reputation".to_string());
                risk_score += 40.0;
            }

            if self
                .config
                .url_shorteners
                .iter()
                .any(|service| url.contains(service.as_str()))
            {
                indicators.insert("url_shortened".to_string());
                risk_score += 20.0;
            }
        }

        SignalResult::scored(risk_score, 0.8, indicators)
    }

    fn composition_analysis(&self, text: &str) -> SignalResult {
        let mut indicators = BTreeSet::new();
        let mut risk_score = 0.0;

        for greeting in &self.config.suspicious_greetings {
            if text.contains(greeting.as_str()) {
                indicators.insert("impersonal_greeting".to_string());
                risk_score += 15.0;
                break;
            }
        }

        if self
            .grammar_regexes
            .iter()
            .any(|pattern| pattern.is_match(text))
        {
            indicators.insert("poor_grammar".to_string());
            risk_score += 10.0;
        }

        SignalResult::scored(risk_score, 0.5, indicators)
    }

    fn classifier_analysis(&self, text: &str) -> SignalResult {
        let classifier = match &self.classifier {
            Some(classifier) => classifier,
            None => return SignalResult::scored(0.0, 0.0, BTreeSet::new()),
        };

        let snippet: String = text.chars().take(512).collect();
        match classifier.classify(&snippet) {
            Ok(classification) => {
                if classification.label.eq_ignore_ascii_case("spam") {
                    let mut indicators = BTreeSet::new();
                    indicators.insert("ml_detected_spam".to_string());
                    SignalResult::scored(
                        classification.confidence * 50.0,
                        classification.confidence,
                        indicators,
                    )
                } else {
                    SignalResult::scored(0.0, classification.confidence, BTreeSet::new())
                }
            }
            Err(e) => {
                log::error!("Text classification failed: {}", e);
                SignalResult::scored(0.0, 0.0, BTreeSet::new())
            }
        }
    }

    fn has_mismatched_urls(&self, text: &str) -> bool {
        for capture in self.markdown_regex.captures_iter(text) {
            let display = &capture[1];
            let actual = &capture[2];
            if display != actual && !display.starts_with("http") {
                return true;
            }
        }
        false
    }
}
