//! PEP 508 requirement strings, reduced to name plus version specifiers.

use crate::error::{ProvisionError, Result};
use crate::metadata::{normalize_name, version::parse_lenient};
use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

fn requirement_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^\s*([A-Za-z0-9](?:[A-Za-z0-9._-]*[A-Za-z0-9])?)\s*(?:\[[^\]]*\])?\s*\(?([^)]*)\)?\s*$")
            .unwrap_or_else(|e| panic!("requirement pattern is a valid regex: {e}"))
    })
}

/// Version comparison operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparator {
    /// `>=`
    Ge,
    /// `>`
    Gt,
    /// `<=`
    Le,
    /// `<`
    Lt,
    /// `==` (supports `.*` suffix)
    Eq,
    /// `!=` (supports `.*` suffix)
    Ne,
    /// `~=`
    Compatible,
    /// `===`
    Identical,
}

impl Comparator {
    const ALL: [(&'static str, Comparator); 8] = [
        ("===", Comparator::Identical),
        ("~=", Comparator::Compatible),
        (">=", Comparator::Ge),
        ("<=", Comparator::Le),
        ("==", Comparator::Eq),
        ("!=", Comparator::Ne),
        (">", Comparator::Gt),
        ("<", Comparator::Lt),
    ];

    fn symbol(self) -> &'static str {
        Self::ALL
            .iter()
            .find(|(_, c)| *c == self)
            .map(|(s, _)| *s)
            .unwrap_or("==")
    }
}

/// A build-time dependency with optional version constraints
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
    /// Distribution name as written
    pub name: String,
    /// Version constraints, all of which must hold
    pub specifiers: Vec<(Comparator, String)>,
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        let specs = self
            .specifiers
            .iter()
            .map(|(c, v)| format!("{}{}", c.symbol(), v))
            .collect::<Vec<_>>();
        if !specs.is_empty() {
            f.write_str(&specs.join(","))?;
        }
        Ok(())
    }
}

impl Requirement {
    /// Parse a requirement string; environment markers after `;` are ignored
    pub fn parse(raw: &str) -> Result<Self> {
        let invalid = |reason: &str| ProvisionError::InvalidRequirement {
            requirement: raw.to_string(),
            reason: reason.to_string(),
        };

        let without_marker = raw.split(';').next().unwrap_or_default();
        if without_marker.contains('@') {
            return Err(invalid("direct URL references are not supported").into());
        }

        let captures = requirement_pattern()
            .captures(without_marker)
            .ok_or_else(|| invalid("expected <name>[<specifiers>]"))?;

        let mut specifiers = Vec::new();
        for spec in captures[2].split(',').map(str::trim).filter(|s| !s.is_empty()) {
            let (comparator, version) = Comparator::ALL
                .iter()
                .find_map(|(symbol, comparator)| {
                    spec.strip_prefix(symbol).map(|rest| (*comparator, rest.trim()))
                })
                .ok_or_else(|| invalid(&format!("unknown specifier '{spec}'")))?;
            if version.is_empty() {
                return Err(invalid(&format!("specifier '{spec}' has no version")).into());
            }
            specifiers.push((comparator, version.to_string()));
        }

        Ok(Self {
            name: captures[1].to_string(),
            specifiers,
        })
    }

    /// Normalized distribution name
    pub fn normalized_name(&self) -> String {
        normalize_name(&self.name)
    }

    /// Whether an installed version satisfies every specifier
    pub fn is_satisfied_by(&self, installed: &str) -> bool {
        self.specifiers
            .iter()
            .all(|(comparator, wanted)| satisfies(installed, *comparator, wanted))
    }
}

fn satisfies(installed: &str, comparator: Comparator, wanted: &str) -> bool {
    if comparator == Comparator::Identical {
        return installed.trim() == wanted;
    }

    if let Some(prefix) = wanted.strip_suffix(".*") {
        let matched = release_prefix_matches(installed, prefix);
        return match comparator {
            Comparator::Eq => matched,
            Comparator::Ne => !matched,
            _ => false,
        };
    }

    let (Some(have), Some(want)) = (parse_lenient(installed), parse_lenient(wanted)) else {
        return false;
    };

    match comparator {
        Comparator::Ge => have >= want,
        Comparator::Gt => have > want,
        Comparator::Le => have <= want,
        Comparator::Lt => have < want,
        Comparator::Eq => have == want,
        Comparator::Ne => have != want,
        Comparator::Compatible => {
            // ~=X.Y.Z means >=X.Y.Z and ==X.Y.*
            let segments: Vec<&str> = wanted.split('.').collect();
            let prefix = segments[..segments.len().saturating_sub(1).max(1)].join(".");
            have >= want && release_prefix_matches(installed, &prefix)
        }
        Comparator::Identical => false,
    }
}

fn release_prefix_matches(installed: &str, prefix: &str) -> bool {
    let have: Vec<&str> = installed.split('.').collect();
    prefix
        .split('.')
        .enumerate()
        .all(|(i, segment)| {
            let have = have.get(i).copied().unwrap_or("0");
            match (have.parse::<u64>(), segment.parse::<u64>()) {
                (Ok(a), Ok(b)) => a == b,
                _ => have == segment,
            }
        })
}
