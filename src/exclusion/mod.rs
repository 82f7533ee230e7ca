//! Disallowed-domain matching.
//!
//! The exclusion list is a JSON array of objects; only the `domain` field of
//! each object matters. The set is loaded once and never mutated afterwards.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde_json::Value;
use tracing::{info, warn};
use url::{Host, Url};

use crate::config::ConfigError;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExclusionSet {
    domains: HashSet<String>,
}

impl ExclusionSet {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load the exclusion list, degrading to an empty set on any problem.
    pub fn load(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::empty();
        };

        match Self::try_load(path) {
            Ok(set) => {
                info!(path = %path.display(), domains = set.len(), "Loaded exclusion list");
                set
            }
            Err(e) => {
                warn!(error = %e, "Ignoring exclusion list");
                Self::empty()
            }
        }
    }

    pub fn try_load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Unreadable {
            path: path.to_path_buf(),
            source,
        })?;

        let value: Value = serde_json::from_str(&raw).map_err(|e| ConfigError::Malformed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        if !value.is_array() {
            return Err(ConfigError::Malformed {
                path: path.to_path_buf(),
                reason: "expected a JSON array of objects".to_string(),
            });
        }

        Ok(Self::from_entries(&value))
    }

    /// Collect the `domain` field of every object in a JSON array. Entries
    /// without a usable domain are skipped.
    pub fn from_entries(entries: &Value) -> Self {
        let domains = entries
            .as_array()
            .into_iter()
            .flatten()
            .filter_map(|entry| entry.get("domain")?.as_str())
            .filter_map(normalize_entry)
            .collect();

        Self { domains }
    }

    pub fn len(&self) -> usize {
        self.domains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }

    /// True when `domain` equals an entry or is a subdomain of one.
    ///
    /// `sub.badsite.com` matches `badsite.com`; `notbadsite.com` does not.
    pub fn is_excluded(&self, domain: &str) -> bool {
        let Some(domain) = canonical_host(domain) else {
            return false;
        };

        if self.domains.contains(&domain) {
            return true;
        }

        // Walk the parent domains: a.b.c -> b.c -> c
        let mut rest = domain.as_str();
        while let Some(pos) = rest.find('.') {
            rest = &rest[pos + 1..];
            if self.domains.contains(rest) {
                return true;
            }
        }

        false
    }

    /// Convenience wrapper: derive the domain of a URL-ish input and test it.
    pub fn is_url_excluded(&self, input: &str) -> bool {
        domain_of(input).is_some_and(|domain| self.is_excluded(&domain))
    }
}

impl<S: AsRef<str>> FromIterator<S> for ExclusionSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            domains: iter
                .into_iter()
                .filter_map(|d| normalize_entry(d.as_ref()))
                .collect(),
        }
    }
}

fn normalize_entry(domain: &str) -> Option<String> {
    canonical_host(domain)
}

/// Lowercased ASCII form of a host; internationalized names become punycode
/// so `bücher.de` and `xn--bcher-kva.de` compare equal. Text the host parser
/// rejects is kept lowercased as typed.
fn canonical_host(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    let host = match Host::parse(raw) {
        Ok(host) => host.to_string(),
        Err(_) => raw.to_lowercase(),
    };
    Some(host)
}

/// Derive the canonical host of a URL-ish input.
///
/// Absolute URLs yield their host without port or credentials. Inputs without
/// a scheme (`example.com/page`) yield the text before the first path, query
/// or fragment separator, minus any port. Either way the result is lowercased
/// ASCII, with internationalized names in punycode.
pub fn domain_of(input: &str) -> Option<String> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }

    if input.contains("://")
        && let Ok(url) = Url::parse(input)
        && let Some(host) = url.host_str()
    {
        return canonical_host(host);
    }

    let without_scheme = input
        .split_once("://")
        .map(|(_, rest)| rest)
        .unwrap_or(input)
        .trim_start_matches('/');

    let authority = without_scheme
        .split(['/', '?', '#'])
        .next()
        .unwrap_or_default();
    let host = authority.rsplit('@').next().unwrap_or(authority);
    let host = match host.rsplit_once(':') {
        Some((h, port)) if port.chars().all(|c| c.is_ascii_digit()) => h,
        _ => host,
    };

    canonical_host(host)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;
    use std::io::Write;

    fn set(domains: &[&str]) -> ExclusionSet {
        domains.iter().collect()
    }

    #[test]
    fn test_exact_and_subdomain_match() {
        let exclusions = set(&["badsite.com"]);
        assert!(exclusions.is_excluded("badsite.com"));
        assert!(exclusions.is_excluded("sub.badsite.com"));
        assert!(exclusions.is_excluded("deep.sub.badsite.com"));
        assert!(!exclusions.is_excluded("notbadsite.com"));
        assert!(!exclusions.is_excluded("badsite.com.evil.org"));
        assert!(!exclusions.is_excluded("com"));
    }

    #[test]
    fn test_match_is_case_insensitive() {
        let exclusions = set(&["  BadSite.COM "]);
        assert!(exclusions.is_excluded("WWW.BADSITE.com"));
        assert!(exclusions.is_excluded(" badsite.com "));
    }

    #[test]
    fn test_empty_domain_is_never_excluded() {
        assert!(!set(&["badsite.com"]).is_excluded(""));
        assert!(!ExclusionSet::empty().is_excluded("badsite.com"));
    }

    #[test]
    fn test_from_entries_skips_entries_without_domain() {
        let entries = json!([
            {"domain": "BadSite.com", "reason": "spam"},
            {"reason": "no domain here"},
            {"domain": 42},
            {"domain": "   "},
            {"domain": "tracker.net"}
        ]);
        let exclusions = ExclusionSet::from_entries(&entries);
        assert_eq!(exclusions.len(), 2);
        assert!(exclusions.is_excluded("badsite.com"));
        assert!(exclusions.is_excluded("cdn.tracker.net"));
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let exclusions = ExclusionSet::load(Some(Path::new("/definitely/not/here.json")));
        assert!(exclusions.is_empty());
        assert!(ExclusionSet::load(None).is_empty());
    }

    #[test]
    fn test_try_load_reports_malformed_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{not json").unwrap();

        let err = ExclusionSet::try_load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Malformed { .. }));
        assert!(ExclusionSet::load(Some(file.path())).is_empty());
    }

    #[test]
    fn test_try_load_rejects_non_array() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"domain": "badsite.com"}}"#).unwrap();

        let err = ExclusionSet::try_load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Malformed { .. }));
    }

    #[test]
    fn test_load_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"domain": "badsite.com", "added": "2024-01-01"}}, {{"note": "x"}}]"#
        )
        .unwrap();

        let exclusions = ExclusionSet::load(Some(file.path()));
        assert_eq!(exclusions.len(), 1);
        assert!(exclusions.is_url_excluded("https://news.badsite.com/a"));
    }

    #[test]
    fn test_domain_of() {
        assert_eq!(
            domain_of("https://Sub.Example.com:8443/path?q=1").as_deref(),
            Some("sub.example.com")
        );
        assert_eq!(
            domain_of("http://user:pw@example.com/").as_deref(),
            Some("example.com")
        );
        assert_eq!(domain_of("Example.com/page").as_deref(), Some("example.com"));
        assert_eq!(domain_of("example.com:8080").as_deref(), Some("example.com"));
        assert_eq!(domain_of("//cdn.example.com/x.js").as_deref(), Some("cdn.example.com"));
        assert_eq!(domain_of("http://127.0.0.1:3000/").as_deref(), Some("127.0.0.1"));
        assert_eq!(domain_of("   "), None);
    }

    #[test]
    fn test_is_url_excluded() {
        let exclusions = set(&["badsite.com"]);
        assert!(exclusions.is_url_excluded("https://sub.badsite.com/article"));
        assert!(exclusions.is_url_excluded("BADSITE.com/page"));
        assert!(!exclusions.is_url_excluded("https://notbadsite.com/"));
        assert!(!exclusions.is_url_excluded(""));
    }

    #[test]
    fn test_internationalized_domains_match_with_or_without_scheme() {
        let exclusions = set(&["bücher.de"]);
        assert_eq!(
            domain_of("https://shop.bücher.de/x").as_deref(),
            Some("shop.xn--bcher-kva.de")
        );
        assert_eq!(
            domain_of("shop.BÜCHER.de/x").as_deref(),
            Some("shop.xn--bcher-kva.de")
        );
        assert!(exclusions.is_url_excluded("https://shop.bücher.de/x"));
        assert!(exclusions.is_url_excluded("shop.bücher.de/x"));
        assert!(exclusions.is_url_excluded("https://xn--bcher-kva.de/"));
        assert!(exclusions.is_excluded("bücher.de"));
        assert!(!exclusions.is_url_excluded("https://bucher.de/"));

        let punycode_entry = set(&["xn--bcher-kva.de"]);
        assert!(punycode_entry.is_url_excluded("bücher.de"));
    }

    proptest! {
        #[test]
        fn excluded_iff_equal_or_dot_suffix(
            entry in "[a-z]{1,8}\\.[a-z]{2,3}",
            domain in "([a-z]{1,6}\\.){0,2}[a-z]{1,8}\\.[a-z]{2,3}",
        ) {
            let exclusions = set(&[entry.as_str()]);
            let expected = domain == entry || domain.ends_with(&format!(".{entry}"));
            prop_assert_eq!(exclusions.is_excluded(&domain), expected);
            prop_assert_eq!(exclusions.is_excluded(&domain.to_uppercase()), expected);
        }
    }
}
