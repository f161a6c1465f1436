use regex::Regex;

/// Levenshtein edit distance, iterative with two reused rows.
///
/// The shorter string sits on the reused row, keeping space at O(min(n,m)).
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let (outer, inner) = if a.len() >= b.len() { (a, b) } else { (b, a) };

    if inner.is_empty() {
        return outer.len();
    }

    let mut prev: Vec<usize> = (0..=inner.len()).collect();
    let mut curr = vec![0usize; inner.len() + 1];

    for (i, oc) in outer.iter().enumerate() {
        curr[0] = i + 1;
        for (j, ic) in inner.iter().enumerate() {
            let cost = usize::from(oc != ic);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[inner.len()]
}

/// Structural red flags for a standalone URL: over-long, or unusually heavy
/// on hyphens or dots.
pub fn has_suspicious_structure(url: &str) -> bool {
    url.len() > 100 || url.matches('-').count() > 5 || url.matches('.').count() > 4
}

/// URL extraction and suspicion checks against a TLD list fixed at build time.
///
/// Each engine owns one of these with its own configured TLD table.
pub struct UrlInspector {
    url_regex: Regex,
    ip_regex: Regex,
    suspicious_tlds: Vec<String>,
}

impl UrlInspector {
    pub fn new(suspicious_tlds: Vec<String>) -> Self {
        Self {
            url_regex: Regex::new(r"https?://[a-zA-Z0-9$-_@.&+!*(),%]+").unwrap(),
            ip_regex: Regex::new(r"^https?://\d+\.\d+\.\d+\.\d+").unwrap(),
            suspicious_tlds,
        }
    }

    /// All http/https URLs appearing in the text, in order.
    pub fn extract_urls<'a>(&self, text: &'a str) -> Vec<&'a str> {
        self.url_regex.find_iter(text).map(|m| m.as_str()).collect()
    }

    /// IP-literal host, or a host under one of the configured suspicious TLDs.
    pub fn is_suspicious(&self, url: &str) -> bool {
        if self.ip_regex.is_match(url) {
            return true;
        }

        let host = Self::host_part(url);
        self.suspicious_tlds
            .iter()
            .any(|tld| host.ends_with(tld.as_str()))
    }

    fn host_part(url: &str) -> &str {
        let rest = url
            .strip_prefix("https://")
            .or_else(|| url.strip_prefix("http://"))
            .unwrap_or(url);
        rest.split('/').next().unwrap_or(rest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inspector() -> UrlInspector {
        UrlInspector::new(vec![".tk".to_string(), ".ml".to_string(), ".top".to_string()])
    }

    #[test]
    fn test_levenshtein_known_distances() {
        assert_eq!(levenshtein("google.com", "google.com"), 0);
        assert_eq!(levenshtein("gooogle.com", "google.com"), 1);
        assert_eq!(levenshtein("paypa1.com", "paypal.com"), 1);
        assert_eq!(levenshtein("kitten", "sitting"), 3);
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("abc", ""), 3);
    }

    #[test]
    fn test_levenshtein_is_symmetric() {
        assert_eq!(
            levenshtein("microsoft.com", "micros0ft.co"),
            levenshtein("micros0ft.co", "microsoft.com")
        );
    }

    #[test]
    fn test_extract_urls() {
        let inspector = inspector();
        let urls =
            inspector.extract_urls("visit http://example.com/a and https://other.org today");
        assert_eq!(urls, vec!["http://example.com/a", "https://other.org"]);
        assert!(inspector.extract_urls("no links here").is_empty());
    }

    #[test]
    fn test_ip_literal_is_suspicious() {
        let inspector = inspector();
        assert!(inspector.is_suspicious("http://192.168.10.5/login"));
        assert!(!inspector.is_suspicious("https://example.com/192.168.10.5"));
    }

    #[test]
    fn test_suspicious_tld_matching() {
        let inspector = inspector();
        assert!(inspector.is_suspicious("http://free-prizes.tk"));
        assert!(inspector.is_suspicious("https://login.verify.top/session"));
        assert!(!inspector.is_suspicious("https://example.com/path.tk"));
    }

    #[test]
    fn test_suspicious_structure() {
        assert!(has_suspicious_structure(&format!(
            "http://example.com/{}",
            "a".repeat(100)
        )));
        assert!(has_suspicious_structure(
            "http://secure-login-verify-account-update-check.com"
        ));
        assert!(has_suspicious_structure("http://a.b.c.d.e.example.com"));
        assert!(!has_suspicious_structure("https://example.com/path"));
    }
}
