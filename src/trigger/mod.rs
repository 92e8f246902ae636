//! Release trigger evaluation.
//!
//! A push event carries a reference string. Only references naming a tag of the
//! exact form `v<major>.<minor>.<patch>` start a release; everything else is
//! ignored without error.

use regex::Regex;
use semver::Version;
use std::fmt;
use std::sync::OnceLock;

const TAG_REF_PREFIX: &str = "refs/tags/";

fn release_tag_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^v(0|[1-9]\d*)\.(0|[1-9]\d*)\.(0|[1-9]\d*)$")
            .unwrap_or_else(|e| panic!("release tag pattern is a valid regex: {e}"))
    })
}

/// A release tag that matched the release pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseTag {
    /// Tag name, e.g. `v1.2.7`
    pub name: String,
    /// Version encoded in the tag
    pub version: Version,
}

impl fmt::Display for ReleaseTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Outcome of evaluating a trigger
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerDecision {
    /// The reference is a release tag
    Matched(ReleaseTag),
    /// The reference does not start a release
    Ignored {
        /// Reference as received
        reference: String,
        /// Why it was ignored
        reason: String,
    },
}

impl TriggerDecision {
    /// Matched tag, if any
    pub fn tag(&self) -> Option<&ReleaseTag> {
        match self {
            TriggerDecision::Matched(tag) => Some(tag),
            TriggerDecision::Ignored { .. } => None,
        }
    }
}

/// Push event reference that may start a release
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseTrigger {
    reference: String,
}

impl ReleaseTrigger {
    /// Wrap a reference; accepts a bare tag (`v1.2.7`) or a full ref (`refs/tags/v1.2.7`)
    pub fn parse(reference: impl Into<String>) -> Self {
        Self {
            reference: reference.into().trim().to_string(),
        }
    }

    /// Reference as received
    pub fn reference(&self) -> &str {
        &self.reference
    }

    /// Tag name carried by the reference, if it names a tag at all
    pub fn tag_name(&self) -> Option<&str> {
        if let Some(tag) = self.reference.strip_prefix(TAG_REF_PREFIX) {
            return Some(tag);
        }
        if self.reference.starts_with("refs/") {
            return None;
        }
        Some(self.reference.as_str())
    }

    /// Evaluate the reference against the release tag pattern
    pub fn evaluate(&self) -> TriggerDecision {
        let Some(tag) = self.tag_name() else {
            return TriggerDecision::Ignored {
                reference: self.reference.clone(),
                reason: "reference is not a tag".to_string(),
            };
        };

        let Some(captures) = release_tag_pattern().captures(tag) else {
            return TriggerDecision::Ignored {
                reference: self.reference.clone(),
                reason: format!("tag '{tag}' does not match v<major>.<minor>.<patch>"),
            };
        };

        let component = |i: usize| captures[i].parse::<u64>();
        match (component(1), component(2), component(3)) {
            (Ok(major), Ok(minor), Ok(patch)) => TriggerDecision::Matched(ReleaseTag {
                name: tag.to_string(),
                version: Version::new(major, minor, patch),
            }),
            _ => TriggerDecision::Ignored {
                reference: self.reference.clone(),
                reason: format!("tag '{tag}' has a version component out of range"),
            },
        }
    }

    /// Whether this reference starts a release
    pub fn matches(&self) -> bool {
        matches!(self.evaluate(), TriggerDecision::Matched(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_tag_matches() {
        let decision = ReleaseTrigger::parse("v1.2.7").evaluate();
        let tag = decision.tag().expect("tag should match");
        assert_eq!(tag.name, "v1.2.7");
        assert_eq!(tag.version, Version::new(1, 2, 7));
    }

    #[test]
    fn test_full_tag_ref_matches() {
        let trigger = ReleaseTrigger::parse("refs/tags/v0.10.0");
        assert!(trigger.matches());
        assert_eq!(trigger.tag_name(), Some("v0.10.0"));
    }

    #[test]
    fn test_branch_ref_is_ignored() {
        assert!(!ReleaseTrigger::parse("refs/heads/v1.2.7").matches());
        assert!(!ReleaseTrigger::parse("refs/heads/main").matches());
    }

    #[test]
    fn test_non_release_tags_are_ignored() {
        for reference in [
            "release-1",
            "v1.2",
            "v1.2.7-rc1",
            "v1.2.7+build",
            "1.2.7",
            "V1.2.7",
            "v01.2.7",
            "",
        ] {
            assert!(
                !ReleaseTrigger::parse(reference).matches(),
                "{reference:?} must not match"
            );
        }
    }

    #[test]
    fn test_ignored_decision_explains_why() {
        match ReleaseTrigger::parse("release-1").evaluate() {
            TriggerDecision::Ignored { reference, reason } => {
                assert_eq!(reference, "release-1");
                assert!(reason.contains("release-1"));
            }
            other => panic!("unexpected decision: {other:?}"),
        }
    }

    #[test]
    fn test_surrounding_whitespace_is_trimmed() {
        assert!(ReleaseTrigger::parse(" v2.0.0\n").matches());
    }
}
