//! Python version parsing.
//!
//! Python versions (PEP 440) are a superset of what `semver` accepts. Ordering
//! for requirement checks only needs the release segment plus pre-release
//! markers, so those versions are mapped leniently onto `semver::Version`.
//! Identity checks (tag vs descriptor, artifact vs descriptor) compare the full
//! normalized form instead.

use regex::Regex;
use semver::{Prerelease, Version};
use std::sync::OnceLock;

fn version_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"(?i)^v?(\d+(?:\.\d+)*)(?:[-_.]?(a|alpha|b|beta|c|rc|pre|preview|dev)[-_.]?(\d*))?(?:[-_.]?(?:post|rev|r)[-_.]?\d*)?(?:\+[a-z0-9.]+)?$",
        )
        .unwrap_or_else(|e| panic!("version pattern is a valid regex: {e}"))
    })
}

/// Parse a Python version string into a comparable `semver::Version`
///
/// Release segments beyond the third are dropped, missing segments are zero.
/// Pre-release markers become semver pre-release identifiers (`rc1` → `rc.1`).
pub fn parse_lenient(raw: &str) -> Option<Version> {
    let captures = version_pattern().captures(raw.trim())?;

    let mut release = captures[1].split('.').map(|s| s.parse::<u64>());
    let mut next = || release.next().unwrap_or(Ok(0)).ok();
    let (major, minor, patch) = (next()?, next()?, next()?);

    let mut version = Version::new(major, minor, patch);
    if let Some(marker) = captures.get(2) {
        let label = match marker.as_str().to_ascii_lowercase().as_str() {
            "a" | "alpha" => "a",
            "b" | "beta" => "b",
            "c" | "rc" | "pre" | "preview" => "rc",
            // dev releases sort before alpha
            _ => "0dev",
        };
        let number = captures.get(3).map(|m| m.as_str()).unwrap_or("");
        let number = if number.is_empty() { "0" } else { number };
        version.pre = Prerelease::new(&format!("{label}.{number}")).ok()?;
    }
    Some(version)
}

fn pep440_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"(?i)^v?(?:(\d+)!)?(\d+(?:\.\d+)*)(?:[-_.]?(a|alpha|b|beta|c|rc|pre|preview)[-_.]?(\d*))?(?:-(\d+)|[-_.]?(?:post|rev|r)[-_.]?(\d*))?(?:[-_.]?dev[-_.]?(\d*))?(?:\+([a-z0-9]+(?:[-_.][a-z0-9]+)*))?$",
        )
        .unwrap_or_else(|e| panic!("PEP 440 pattern is a valid regex: {e}"))
    })
}

/// A parsed PEP 440 version, every part kept
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pep440Version {
    /// Epoch (`N!`), zero when absent
    pub epoch: u64,
    /// Release segments as written
    pub release: Vec<u64>,
    /// Pre-release label (`a`, `b`, `rc`) and number
    pub pre: Option<(String, u64)>,
    /// Post-release number
    pub post: Option<u64>,
    /// Development release number
    pub dev: Option<u64>,
    /// Local version label, lowercased with `.` separators
    pub local: Option<String>,
}

fn number(m: Option<regex::Match<'_>>) -> Option<u64> {
    match m.map(|m| m.as_str()) {
        None | Some("") => Some(0),
        Some(digits) => digits.parse().ok(),
    }
}

impl Pep440Version {
    /// Parse any PEP 440 version; `None` when the string is not one
    pub fn parse(raw: &str) -> Option<Self> {
        let captures = pep440_pattern().captures(raw.trim())?;

        let release = captures[2]
            .split('.')
            .map(|s| s.parse::<u64>().ok())
            .collect::<Option<Vec<_>>>()?;
        let pre = match captures.get(3) {
            Some(label) => {
                let label = match label.as_str().to_ascii_lowercase().as_str() {
                    "a" | "alpha" => "a",
                    "b" | "beta" => "b",
                    _ => "rc",
                };
                Some((label.to_string(), number(captures.get(4))?))
            }
            None => None,
        };
        let post = match (captures.get(5), captures.get(6)) {
            (Some(implicit), _) => Some(implicit.as_str().parse().ok()?),
            (None, Some(explicit)) => Some(number(Some(explicit))?),
            (None, None) => None,
        };
        let dev = match captures.get(7) {
            Some(m) => Some(number(Some(m))?),
            None => None,
        };
        let local = captures
            .get(8)
            .map(|m| m.as_str().to_ascii_lowercase().replace(['-', '_'], "."));

        Some(Self {
            epoch: captures.get(1).map_or(Some(0), |m| m.as_str().parse().ok())?,
            release,
            pre,
            post,
            dev,
            local,
        })
    }

    /// Normalized string form; trailing zero release segments are dropped
    pub fn canonical(&self) -> String {
        let mut release = self.release.clone();
        while release.len() > 1 && release.last() == Some(&0) {
            release.pop();
        }

        let mut out = String::new();
        if self.epoch != 0 {
            out.push_str(&format!("{}!", self.epoch));
        }
        out.push_str(
            &release
                .iter()
                .map(u64::to_string)
                .collect::<Vec<_>>()
                .join("."),
        );
        if let Some((label, n)) = &self.pre {
            out.push_str(&format!("{label}{n}"));
        }
        if let Some(n) = self.post {
            out.push_str(&format!(".post{n}"));
        }
        if let Some(n) = self.dev {
            out.push_str(&format!(".dev{n}"));
        }
        if let Some(local) = &self.local {
            out.push_str(&format!("+{local}"));
        }
        out
    }

    /// `major.minor.patch` when this is a plain final release of at most three segments
    pub fn final_release(&self) -> Option<Version> {
        let plain = self.epoch == 0
            && self.release.len() <= 3
            && self.pre.is_none()
            && self.post.is_none()
            && self.dev.is_none()
            && self.local.is_none();
        if !plain {
            return None;
        }
        let segment = |i: usize| self.release.get(i).copied().unwrap_or(0);
        Some(Version::new(segment(0), segment(1), segment(2)))
    }
}

/// Compare two Python version strings for equality of meaning (`1.2` == `1.2.0`)
///
/// Every part counts: `1.2.7.post1`, `1.2.7.1` and `1.2.7+local` all differ from `1.2.7`.
pub fn same_version(a: &str, b: &str) -> bool {
    match (Pep440Version::parse(a), Pep440Version::parse(b)) {
        (Some(a), Some(b)) => a.canonical() == b.canonical(),
        _ => a.trim() == b.trim(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pads_missing_segments() {
        assert_eq!(parse_lenient("1.2"), Some(Version::new(1, 2, 0)));
        assert_eq!(parse_lenient("3"), Some(Version::new(3, 0, 0)));
    }

    #[test]
    fn test_drops_extra_segments_and_post_releases() {
        assert_eq!(parse_lenient("0.29.36.1"), Some(Version::new(0, 29, 36)));
        assert_eq!(parse_lenient("1.2.7.post1"), Some(Version::new(1, 2, 7)));
    }

    #[test]
    fn test_pre_release_orders_before_release() {
        let rc = parse_lenient("3.0.0rc1").unwrap();
        let beta = parse_lenient("3.0.0b2").unwrap();
        let dev = parse_lenient("3.0.0.dev4").unwrap();
        let release = parse_lenient("3.0.0").unwrap();
        assert!(dev < beta);
        assert!(beta < rc);
        assert!(rc < release);
    }

    #[test]
    fn test_rejects_garbage() {
        assert_eq!(parse_lenient("latest"), None);
        assert_eq!(parse_lenient(""), None);
    }

    #[test]
    fn test_same_version() {
        assert!(same_version("1.2", "1.2.0"));
        assert!(same_version("1.2.7rc1", "1.2.7-RC.1"));
        assert!(!same_version("1.2.7", "1.2.1"));
    }

    #[test]
    fn test_same_version_keeps_every_part() {
        assert!(!same_version("1.2.7.post1", "1.2.7"));
        assert!(!same_version("1.2.7.1", "1.2.7"));
        assert!(!same_version("1.2.7+local", "1.2.7"));
        assert!(!same_version("1.2.7.dev0", "1.2.7"));
    }

    #[test]
    fn test_canonical_form() {
        let v = Pep440Version::parse("1.02.7-post2").unwrap();
        assert_eq!(v.canonical(), "1.2.7.post2");
        let v = Pep440Version::parse("1.2.7+Ubuntu_1").unwrap();
        assert_eq!(v.local.as_deref(), Some("ubuntu.1"));
        assert_eq!(Pep440Version::parse("1.0-3").unwrap().post, Some(3));
    }

    #[test]
    fn test_final_release() {
        let final_release = |raw: &str| Pep440Version::parse(raw).and_then(|v| v.final_release());
        assert_eq!(final_release("1.2.7"), Some(Version::new(1, 2, 7)));
        assert_eq!(final_release("1.2"), Some(Version::new(1, 2, 0)));
        assert_eq!(final_release("1.2.7.post1"), None);
        assert_eq!(final_release("1.2.7.1"), None);
        assert_eq!(final_release("1.2.7+local"), None);
        assert_eq!(final_release("1.2.7rc1"), None);
    }
}
