use regex::Regex;
use std::collections::HashMap;
use url::Url;

/// Words that phishing URLs lean on to look like account workflows.
pub const SENSITIVE_WORDS: [&str; 8] = [
    "secure", "account", "login", "update", "verify", "banking", "confirm", "password",
];

/// Brand names frequently embedded in typosquat and lookalike URLs.
pub const BRAND_NAMES: [&str; 7] = [
    "google", "facebook", "paypal", "apple", "amazon", "icici", "bank",
];

/// Common two-label public suffixes, so `example.co.uk` resolves to `example`
/// rather than `co`. Exotic suffixes fall back to the last-two-labels rule.
const TWO_LABEL_SUFFIXES: [&str; 10] = [
    "co.uk", "org.uk", "gov.uk", "ac.uk", "co.in", "com.au", "com.br", "co.jp", "com.mx",
    "co.nz",
];

/// Extracts the lexical/structural feature set from a raw URL string.
///
/// Pure transformation: no model, scaler, or schema access. Malformed URLs
/// never fail; hostname, path, and query just degrade to empty strings and
/// the host-derived features go to zero.
#[derive(Debug)]
pub struct UrlFeatureExtractor {
    random_string_regex: Regex,
    ip_regex: Regex,
}

impl UrlFeatureExtractor {
    pub fn new() -> Self {
        Self {
            random_string_regex: Regex::new(r"[A-Za-z0-9]{10,}").unwrap(),
            ip_regex: Regex::new(r"^\d+\.\d+\.\d+\.\d+").unwrap(),
        }
    }

    /// Compute the named feature map for a URL.
    ///
    /// Keys are the training-time column names; alignment against the
    /// persisted schema happens downstream in `FeatureSchema::align`.
    pub fn extract(&self, url: &str) -> HashMap<String, f64> {
        let url_lower = url.to_lowercase();

        let (hostname, path, query) = match Url::parse(url) {
            Ok(parsed) => (
                parsed.host_str().unwrap_or("").to_string(),
                parsed.path().to_string(),
                parsed.query().unwrap_or("").to_string(),
            ),
            Err(_) => (String::new(), String::new(), String::new()),
        };

        let (subdomain, domain) = split_registrable_domain(&hostname);

        let mut features = HashMap::new();

        features.insert("NumDots".to_string(), count_char(url, '.'));
        features.insert(
            "SubdomainLevel".to_string(),
            if hostname.contains('.') {
                count_char(&hostname, '.') - 1.0
            } else {
                0.0
            },
        );
        features.insert("PathLevel".to_string(), count_char(&path, '/'));
        features.insert("UrlLength".to_string(), url.len() as f64);
        features.insert("NumDash".to_string(), count_char(url, '-'));
        features.insert("NumDashInHostname".to_string(), count_char(&hostname, '-'));
        features.insert("AtSymbol".to_string(), flag(url.contains('@')));
        features.insert("TildeSymbol".to_string(), flag(url.contains('~')));
        features.insert("NumUnderscore".to_string(), count_char(url, '_'));
        features.insert("NumPercent".to_string(), count_char(url, '%'));
        features.insert(
            "NumQueryComponents".to_string(),
            if query.is_empty() {
                0.0
            } else {
                query.split('&').count() as f64
            },
        );
        features.insert("NumAmpersand".to_string(), count_char(url, '&'));
        features.insert("NumHash".to_string(), count_char(url, '#'));
        features.insert(
            "NumNumericChars".to_string(),
            url.chars().filter(|c| c.is_ascii_digit()).count() as f64,
        );
        features.insert("NoHttps".to_string(), flag(!url_lower.starts_with("https")));
        features.insert(
            "RandomString".to_string(),
            flag(self.random_string_regex.is_match(url)),
        );
        features.insert(
            "IpAddress".to_string(),
            flag(self.ip_regex.is_match(&hostname)),
        );
        features.insert(
            "DomainInSubdomains".to_string(),
            flag(!domain.is_empty() && subdomain.contains(&domain)),
        );
        features.insert(
            "DomainInPaths".to_string(),
            flag(!domain.is_empty() && path.contains(&domain)),
        );
        features.insert(
            "HttpsInHostname".to_string(),
            flag(hostname.contains("https")),
        );
        features.insert("HostnameLength".to_string(), hostname.len() as f64);
        features.insert("PathLength".to_string(), path.len() as f64);
        features.insert("QueryLength".to_string(), query.len() as f64);
        features.insert("DoubleSlashInPath".to_string(), flag(path.contains("//")));
        features.insert(
            "NumSensitiveWords".to_string(),
            SENSITIVE_WORDS
                .iter()
                .filter(|w| url_lower.contains(*w))
                .count() as f64,
        );
        features.insert(
            "EmbeddedBrandName".to_string(),
            BRAND_NAMES
                .iter()
                .filter(|b| url_lower.contains(*b))
                .count() as f64,
        );

        features
    }
}

impl Default for UrlFeatureExtractor {
    fn default() -> Self {
        Self::new()
    }
}

fn count_char(haystack: &str, needle: char) -> f64 {
    haystack.chars().filter(|c| *c == needle).count() as f64
}

fn flag(condition: bool) -> f64 {
    if condition {
        1.0
    } else {
        0.0
    }
}

/// Split a hostname into (subdomain, registrable-domain-label).
///
/// `mail.login.example.co.uk` yields `("mail.login", "example")`. Literal IP
/// hostnames and empty hostnames yield empty parts.
fn split_registrable_domain(hostname: &str) -> (String, String) {
    if hostname.is_empty() || hostname.chars().all(|c| c.is_ascii_digit() || c == '.') {
        return (String::new(), String::new());
    }

    let labels: Vec<&str> = hostname.split('.').collect();
    if labels.len() < 2 {
        return (String::new(), hostname.to_string());
    }

    let tail2 = labels[labels.len() - 2..].join(".");
    let suffix_labels = if TWO_LABEL_SUFFIXES.contains(&tail2.as_str()) {
        2
    } else {
        1
    };

    if labels.len() <= suffix_labels {
        return (String::new(), String::new());
    }

    let domain_idx = labels.len() - suffix_labels - 1;
    let domain = labels[domain_idx].to_string();
    let subdomain = labels[..domain_idx].join(".");
    (subdomain, domain)
}
