use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Root configuration: one section per analysis engine.
///
/// Every field has a default, so a config file only needs to spell out the
/// tables it wants to override.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    pub text: TextConfig,
    pub sender: SenderConfig,
    pub image: ImageConfig,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            text: TextConfig::default(),
            sender: SenderConfig::default(),
            image: ImageConfig::default(),
        }
    }
}

impl DetectionConfig {
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: DetectionConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    pub fn to_file(&self, path: &str) -> anyhow::Result<()> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

/// Keyword and URL tables for message body analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TextConfig {
    pub urgency_keywords: Vec<String>,
    pub threat_keywords: Vec<String>,
    pub financial_keywords: Vec<String>,
    pub credential_keywords: Vec<String>,
    pub suspicious_greetings: Vec<String>,
    pub suspicious_tlds: Vec<String>,
    pub url_shorteners: Vec<String>,
    pub reputation_keywords: Vec<String>,
}

impl Default for TextConfig {
    fn default() -> Self {
        Self {
            urgency_keywords: vec![
                "urgent".to_string(),
                "immediate".to_string(),
                "asap".to_string(),
                "hurry".to_string(),
                "limited time".to_string(),
                "expires soon".to_string(),
                "act now".to_string(),
                "don't delay".to_string(),
                "last chance".to_string(),
                "final notice".to_string(),
                "deadline".to_string(),
            ],
            threat_keywords: vec![
                "suspend".to_string(),
                "terminate".to_string(),
                "close".to_string(),
                "block".to_string(),
                "disable".to_string(),
                "restricted".to_string(),
                "violation".to_string(),
                "security breach".to_string(),
                "unauthorized access".to_string(),
                "locked".to_string(),
            ],
            financial_keywords: vec![
                "payment".to_string(),
                "invoice".to_string(),
                "refund".to_string(),
                "transaction".to_string(),
                "account".to_string(),
                "balance".to_string(),
                "credit card".to_string(),
                "bank".to_string(),
                "wire transfer".to_string(),
                "cryptocurrency".to_string(),
                "bitcoin".to_string(),
            ],
            credential_keywords: vec![
                "password".to_string(),
                "login".to_string(),
                "verify".to_string(),
                "authenticate".to_string(),
                "confirm identity".to_string(),
                "security question".to_string(),
                "two-factor".to_string(),
                "2fa".to_string(),
                "otp".to_string(),
            ],
            suspicious_greetings: vec![
                "dear customer".to_string(),
                "dear user".to_string(),
                "dear valued customer".to_string(),
                "attention user".to_string(),
            ],
            suspicious_tlds: vec![
                ".tk".to_string(),
                ".ml".to_string(),
                ".ga".to_string(),
                ".cf".to_string(),
                ".top".to_string(),
                ".work".to_string(),
                ".date".to_string(),
                ".wang".to_string(),
                ".bid".to_string(),
                ".download".to_string(),
                ".stream".to_string(),
                ".cricket".to_string(),
                ".science".to_string(),
            ],
            url_shorteners: vec![
                "bit.ly".to_string(),
                "tinyurl.com".to_string(),
                "t.co".to_string(),
                "goo.gl".to_string(),
                "ow.ly".to_string(),
                "short.link".to_string(),
                "tiny.cc".to_string(),
                "is.gd".to_string(),
                "buff.ly".to_string(),
            ],
            reputation_keywords: vec![
                "phishing".to_string(),
                "scam".to_string(),
                "fake".to_string(),
                "login-verify".to_string(),
                "account-confirm".to_string(),
                "security-check".to_string(),
                "update-account".to_string(),
            ],
        }
    }
}

/// Domain tables for sender address analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SenderConfig {
    pub suspicious_tlds: Vec<String>,
    pub trusted_domains: Vec<String>,
    pub trusted_display_names: Vec<String>,
}

impl Default for SenderConfig {
    fn default() -> Self {
        Self {
            suspicious_tlds: TextConfig::default().suspicious_tlds,
            trusted_domains: vec![
                "google.com".to_string(),
                "microsoft.com".to_string(),
                "apple.com".to_string(),
                "amazon.com".to_string(),
                "paypal.com".to_string(),
                "ebay.com".to_string(),
                "linkedin.com".to_string(),
                "facebook.com".to_string(),
                "twitter.com".to_string(),
                "instagram.com".to_string(),
                "github.com".to_string(),
                "stackoverflow.com".to_string(),
            ],
            trusted_display_names: vec![
                "paypal".to_string(),
                "amazon".to_string(),
                "microsoft".to_string(),
                "google".to_string(),
                "apple".to_string(),
            ],
        }
    }
}

/// Keyword, brand and color tables for screenshot analysis.
///
/// The TLD list here is intentionally shorter than the text one: OCR output
/// is noisy, so only the highest-signal TLDs are matched against it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageConfig {
    pub login_form_keywords: Vec<String>,
    pub urgency_keywords: Vec<String>,
    pub financial_keywords: Vec<String>,
    pub credential_keywords: Vec<String>,
    pub suspicious_tlds: Vec<String>,
    pub known_brands: Vec<String>,
    pub brand_colors: BTreeMap<String, Vec<[u8; 3]>>,
    pub warning_palettes: BTreeMap<String, Vec<[u8; 3]>>,
}

impl Default for ImageConfig {
    fn default() -> Self {
        let mut brand_colors = BTreeMap::new();
        brand_colors.insert("paypal".to_string(), vec![[0, 112, 186], [255, 255, 255]]);
        brand_colors.insert("facebook".to_string(), vec![[24, 119, 242], [255, 255, 255]]);
        brand_colors.insert(
            "google".to_string(),
            vec![[66, 133, 244], [52, 168, 83], [251, 188, 5], [234, 67, 53]],
        );
        brand_colors.insert("microsoft".to_string(), vec![[245, 128, 0], [255, 255, 255]]);

        let mut warning_palettes = BTreeMap::new();
        warning_palettes.insert(
            "phishing_red_flags".to_string(),
            vec![[255, 0, 0], [220, 20, 60], [178, 34, 34]],
        );
        warning_palettes.insert(
            "warning_orange".to_string(),
            vec![[255, 165, 0], [255, 140, 0], [255, 127, 80]],
        );
        warning_palettes.insert(
            "danger_yellow".to_string(),
            vec![[255, 255, 0], [255, 215, 0], [218, 165, 32]],
        );

        Self {
            login_form_keywords: vec![
                "password".to_string(),
                "login".to_string(),
                "sign in".to_string(),
                "username".to_string(),
                "email".to_string(),
                "account".to_string(),
                "authenticate".to_string(),
                "verify".to_string(),
                "security check".to_string(),
            ],
            urgency_keywords: vec![
                "urgent".to_string(),
                "immediate".to_string(),
                "asap".to_string(),
                "hurry".to_string(),
                "limited time".to_string(),
                "expires".to_string(),
                "act now".to_string(),
                "don't delay".to_string(),
                "last chance".to_string(),
                "final notice".to_string(),
            ],
            financial_keywords: vec![
                "payment".to_string(),
                "invoice".to_string(),
                "refund".to_string(),
                "transaction".to_string(),
                "account".to_string(),
                "balance".to_string(),
                "credit card".to_string(),
                "bank".to_string(),
                "wire transfer".to_string(),
                "cryptocurrency".to_string(),
            ],
            credential_keywords: vec![
                "password".to_string(),
                "login".to_string(),
                "verify".to_string(),
                "authenticate".to_string(),
                "confirm identity".to_string(),
                "security question".to_string(),
                "two-factor".to_string(),
                "2fa".to_string(),
            ],
            suspicious_tlds: vec![
                ".tk".to_string(),
                ".ml".to_string(),
                ".ga".to_string(),
                ".cf".to_string(),
                ".top".to_string(),
                ".work".to_string(),
            ],
            known_brands: vec![
                "paypal".to_string(),
                "amazon".to_string(),
                "microsoft".to_string(),
                "google".to_string(),
                "apple".to_string(),
                "facebook".to_string(),
                "linkedin".to_string(),
                "twitter".to_string(),
                "instagram".to_string(),
                "netflix".to_string(),
                "spotify".to_string(),
                "ebay".to_string(),
            ],
            brand_colors,
            warning_palettes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_tables_are_populated() {
        let config = DetectionConfig::default();
        assert_eq!(config.text.urgency_keywords.len(), 11);
        assert_eq!(config.text.suspicious_tlds.len(), 13);
        assert_eq!(config.sender.trusted_domains.len(), 12);
        assert_eq!(config.image.suspicious_tlds.len(), 6);
        assert_eq!(config.image.known_brands.len(), 12);
        assert_eq!(config.image.brand_colors.len(), 4);
        assert_eq!(config.image.warning_palettes.len(), 3);
    }

    #[test]
    fn test_sender_and_text_share_tld_defaults() {
        let config = DetectionConfig::default();
        assert_eq!(config.text.suspicious_tlds, config.sender.suspicious_tlds);
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let yaml = r#"
sender:
  trusted_domains:
    - "example.com"
"#;
        let config: DetectionConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.sender.trusted_domains, vec!["example.com".to_string()]);
        assert_eq!(config.sender.trusted_display_names.len(), 5);
        assert_eq!(config.text.urgency_keywords.len(), 11);
    }

    #[test]
    fn test_config_round_trip() {
        let config = DetectionConfig::default();
        let yaml = serde_yaml::to_string(&config).unwrap();
        let parsed: DetectionConfig = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed.text.reputation_keywords, config.text.reputation_keywords);
        assert_eq!(parsed.image.brand_colors, config.image.brand_colors);
    }

    #[test]
    fn test_brand_color_tables() {
        let config = ImageConfig::default();
        let google = config.brand_colors.get("google").unwrap();
        assert_eq!(google.len(), 4);
        assert!(config.brand_colors.contains_key("paypal"));
        assert!(config
            .warning_palettes
            .get("phishing_red_flags")
            .unwrap()
            .contains(&[255, 0, 0]));
    }
}
