use base64::{engine::general_purpose, Engine as _};
use lazy_static::lazy_static;
use regex::Regex;
use sha2::{Digest, Sha256};
use std::net::Ipv6Addr;

use crate::config::LoggerConfig;

lazy_static! {
    #[allow(clippy::expect_used)]
    static ref EMAIL_REGEX: Regex =
        Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b").expect("email pattern");
    #[allow(clippy::expect_used)]
    static ref PHONE_REGEX: Regex =
        Regex::new(r"(?:\+\d{1,3}[-.\s]?)?\(?\b\d{2,3}\)?[-.\s]?\d{3,5}[-.\s]?\d{4}\b").expect("phone pattern");
    #[allow(clippy::expect_used)]
    static ref IPV4_REGEX: Regex =
        Regex::new(r"\b(?:[0-9]{1,3}\.){3}[0-9]{1,3}\b").expect("ipv4 pattern");
    /// Candidates only; a match is redacted when it parses as an IPv6 address
    #[allow(clippy::expect_used)]
    static ref IPV6_REGEX: Regex =
        Regex::new(r"(?:[0-9A-Fa-f]{1,4})?(?::[0-9A-Fa-f]{0,4}){2,7}(?:(?:\.[0-9]{1,3}){3})?")
            .expect("ipv6 pattern");
}

/// PII redaction configuration
#[derive(Debug, Clone)]
pub struct RedactionConfig {
    pub redact_emails: bool,
    pub redact_phones: bool,
    pub redact_ip_addresses: bool,
    pub hash_for_correlation: bool,
    pub custom_patterns: Vec<(Regex, String)>,
}

impl Default for RedactionConfig {
    fn default() -> Self {
        Self {
            redact_emails: true,
            redact_phones: true,
            redact_ip_addresses: true,
            hash_for_correlation: true,
            custom_patterns: Vec::new(),
        }
    }
}

impl RedactionConfig {
    /// Redaction settings matching a logger configuration. With `redact_pii`
    /// off every category is disabled and text passes through unchanged.
    pub fn from_logger_config(config: &LoggerConfig) -> Self {
        Self {
            redact_emails: config.redact_pii,
            redact_phones: config.redact_pii,
            redact_ip_addresses: config.redact_pii,
            hash_for_correlation: config.hash_for_correlation,
            custom_patterns: Vec::new(),
        }
    }

    pub fn with_custom_pattern(mut self, pattern: Regex, replacement: impl Into<String>) -> Self {
        self.custom_patterns.push((pattern, replacement.into()));
        self
    }
}

/// PII redactor for log messages and log fields
///
/// Audit records keep the raw actor IP; only what goes to the log stream is
/// redacted.
#[derive(Debug, Clone, Default)]
pub struct PiiRedactor {
    config: RedactionConfig,
}

impl PiiRedactor {
    pub fn new(config: RedactionConfig) -> Self {
        Self { config }
    }

    pub fn redact(&self, text: &str) -> String {
        let mut result = text.to_string();

        if self.config.redact_emails {
            result = self.redact_emails(&result);
        }

        if self.config.redact_ip_addresses {
            result = self.redact_ip_addresses(&result);
        }

        if self.config.redact_phones {
            result = self.redact_phones(&result);
        }

        for (pattern, replacement) in &self.config.custom_patterns {
            result = pattern.replace_all(&result, replacement.as_str()).to_string();
        }

        result
    }

    /// Redact an optional client address for a log field
    pub fn redact_ip(&self, ip: Option<&str>) -> String {
        match ip {
            Some(ip) if self.config.redact_ip_addresses => self.redact_ip_addresses(ip),
            Some(ip) => ip.to_string(),
            None => "-".to_string(),
        }
    }

    fn redact_emails(&self, text: &str) -> String {
        EMAIL_REGEX
            .replace_all(text, |caps: &regex::Captures| {
                let email = &caps[0];
                if self.config.hash_for_correlation {
                    format!("EMAIL[{}]", hash_value(email))
                } else {
                    match email.split_once('@') {
                        Some((local, domain)) => format!(
                            "{}***@{}***",
                            local.chars().next().unwrap_or('*'),
                            domain.chars().next().unwrap_or('*')
                        ),
                        None => "***@***".to_string(),
                    }
                }
            })
            .to_string()
    }

    fn redact_phones(&self, text: &str) -> String {
        PHONE_REGEX
            .replace_all(text, |caps: &regex::Captures| {
                if self.config.hash_for_correlation {
                    format!("PHONE[{}]", hash_value(&caps[0]))
                } else {
                    "(***) ***-****".to_string()
                }
            })
            .to_string()
    }

    fn redact_ip_addresses(&self, text: &str) -> String {
        let text = IPV6_REGEX.replace_all(text, |caps: &regex::Captures| {
            let candidate = &caps[0];
            let embedded = caps.get(0).is_some_and(|m| {
                let word = |c: char| c.is_alphanumeric() || c == '_';
                text.get(..m.start()).and_then(|head| head.chars().next_back()).is_some_and(word)
                    || text.get(m.end()..).and_then(|tail| tail.chars().next()).is_some_and(word)
            });
            if embedded || candidate.parse::<Ipv6Addr>().is_err() {
                candidate.to_string()
            } else if self.config.hash_for_correlation {
                format!("IP[{}]", hash_value(candidate))
            } else {
                match candidate.split(':').next() {
                    Some(first) if !first.is_empty() => format!("{first}:***"),
                    _ => "***:***".to_string(),
                }
            }
        });

        IPV4_REGEX
            .replace_all(&text, |caps: &regex::Captures| {
                let ip = &caps[0];
                if self.config.hash_for_correlation {
                    format!("IP[{}]", hash_value(ip))
                } else {
                    let octets: Vec<&str> = ip.split('.').collect();
                    match (octets.first(), octets.last()) {
                        (Some(first), Some(last)) if octets.len() == 4 => {
                            format!("{first}.***.***.{last}")
                        }
                        _ => "***.***.***.***".to_string(),
                    }
                }
            })
            .to_string()
    }
}

/// Mask an access token for logging: the first four characters stay visible.
pub fn mask_token(token: &str) -> String {
    let visible: String = token.chars().take(4).collect();
    format!("{visible}****")
}

fn hash_value(value: &str) -> String {
    let digest = Sha256::digest(value.as_bytes());
    // First 8 bytes are enough to correlate occurrences
    general_purpose::STANDARD_NO_PAD.encode(digest.get(..8).unwrap_or_default())
}
