//! Classification of strings as fetchable http(s) URLs.
//!
//! [`is_fetchable`] is the pure check; [`UrlValidator`] memoises verdicts in
//! a bounded [`moka`] cache since the same links recur across calls.

use moka::sync::Cache;
use url::Url;

/// Returns `true` when `raw` is an absolute `http`/`https` URL with a host.
///
/// Leading or trailing whitespace and embedded whitespace are rejected
/// rather than trimmed: a link that needs cleaning came from a bad parse.
pub fn is_fetchable(raw: &str) -> bool {
    if raw.is_empty() || raw.chars().any(char::is_whitespace) {
        return false;
    }
    let Ok(parsed) = Url::parse(raw) else {
        return false;
    };
    matches!(parsed.scheme(), "http" | "https")
        && parsed.host_str().is_some_and(|host| !host.is_empty())
}

/// Memoising wrapper around [`is_fetchable`].
#[derive(Clone)]
pub struct UrlValidator {
    verdicts: Cache<String, bool>,
}

impl UrlValidator {
    /// Create a validator remembering at most `capacity` verdicts.
    pub fn new(capacity: u64) -> Self {
        Self {
            verdicts: Cache::new(capacity),
        }
    }

    /// Classify `url`, consulting the verdict cache first.
    pub fn is_valid(&self, url: &str) -> bool {
        if let Some(verdict) = self.verdicts.get(url) {
            return verdict;
        }
        let verdict = is_fetchable(url);
        self.verdicts.insert(url.to_owned(), verdict);
        verdict
    }

    /// Forget all memoised verdicts.
    pub fn clear(&self) {
        self.verdicts.invalidate_all();
    }

    /// Approximate number of memoised verdicts.
    pub fn len(&self) -> u64 {
        self.verdicts.run_pending_tasks();
        self.verdicts.entry_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_http_and_https() {
        assert!(is_fetchable("https://example.com"));
        assert!(is_fetchable("http://example.com/path?q=1"));
        assert!(is_fetchable("http://127.0.0.1:8080/page"));
    }

    #[test]
    fn rejects_other_schemes() {
        assert!(!is_fetchable("ftp://example.com/file"));
        assert!(!is_fetchable("javascript:alert(1)"));
        assert!(!is_fetchable("mailto:someone@example.com"));
        assert!(!is_fetchable("file:///etc/passwd"));
    }

    #[test]
    fn rejects_malformed() {
        assert!(!is_fetchable(""));
        assert!(!is_fetchable("not-a-url"));
        assert!(!is_fetchable("//example.com/protocol-relative"));
        assert!(!is_fetchable("https://"));
        assert!(!is_fetchable("https://exa mple.com"));
        assert!(!is_fetchable(" https://example.com"));
    }

    #[test]
    fn validator_memoises_verdicts() {
        let validator = UrlValidator::new(16);
        assert!(validator.is_valid("https://example.com"));
        assert!(!validator.is_valid("nope"));
        assert_eq!(validator.len(), 2);
        // Second lookup hits the cache and agrees.
        assert!(validator.is_valid("https://example.com"));
        assert_eq!(validator.len(), 2);
    }

    #[test]
    fn clear_forgets_verdicts() {
        let validator = UrlValidator::new(16);
        validator.is_valid("https://example.com");
        validator.clear();
        assert!(validator.verdicts.get("https://example.com").is_none());
    }
}
