//! `setup.py` metadata extraction.
//!
//! Only string-literal keyword arguments passed directly to the `setup(...)`
//! call are read; the script is never executed.

use super::{DescriptorKind, PackageDescriptor, Person};
use crate::error::Result;
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

fn kwarg_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?s)^(?:\s*#[^\n]*)*\s*([a-z_]+)\s*=\s*(.*?)\s*$")
            .unwrap_or_else(|e| panic!("kwarg pattern is a valid regex: {e}"))
    })
}

fn string_value_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"^(?:"([^"\\]*)"|'([^'\\]*)')$"#)
            .unwrap_or_else(|e| panic!("string value pattern is a valid regex: {e}"))
    })
}

fn string_literal_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#""([^"\\]*)"|'([^'\\]*)'"#)
            .unwrap_or_else(|e| panic!("string literal pattern is a valid regex: {e}"))
    })
}

/// Parse setup.py; `None` when the script declares no project name
pub fn parse(path: &Path) -> Result<Option<PackageDescriptor>> {
    let content = std::fs::read_to_string(path)?;
    Ok(parse_source(&content, path))
}

pub(super) fn parse_source(content: &str, path: &Path) -> Option<PackageDescriptor> {
    let arguments = setup_arguments(content)?;

    let mut descriptor = PackageDescriptor {
        kind: Some(DescriptorKind::SetupPy),
        path: path.to_path_buf(),
        ..Default::default()
    };

    let mut author = None;
    let mut author_email = None;
    let mut maintainer = None;
    let mut maintainer_email = None;

    for argument in arguments {
        let Some(captures) = kwarg_pattern().captures(argument) else {
            continue;
        };
        let value = &captures[2];

        if value.starts_with('[') {
            let values = string_literal_pattern()
                .captures_iter(value)
                .filter_map(|c| c.get(1).or_else(|| c.get(2)))
                .map(|m| m.as_str().to_string())
                .collect::<Vec<_>>();
            match &captures[1] {
                "keywords" => descriptor.keywords = values,
                "classifiers" => descriptor.classifiers = values,
                _ => {}
            }
            continue;
        }

        let Some(literal) = string_value_pattern().captures(value) else {
            continue;
        };
        let value = literal
            .get(1)
            .or_else(|| literal.get(2))
            .map(|m| m.as_str().to_string());
        let slot = match &captures[1] {
            "name" => &mut descriptor.name,
            "version" => &mut descriptor.version,
            "description" => &mut descriptor.description,
            "license" => &mut descriptor.license,
            "python_requires" => &mut descriptor.requires_python,
            "url" => &mut descriptor.source_url,
            "author" => &mut author,
            "author_email" => &mut author_email,
            "maintainer" => &mut maintainer,
            "maintainer_email" => &mut maintainer_email,
            _ => continue,
        };
        *slot = value;
    }

    descriptor.authors.extend(Person::from_parts(author, author_email));
    descriptor
        .maintainers
        .extend(Person::from_parts(maintainer, maintainer_email));

    descriptor.name.is_some().then_some(descriptor)
}

/// Top-level arguments of the outermost `setup(` call
///
/// Arguments are split on commas outside string literals, comments and
/// nested brackets, so keywords of nested calls such as `Extension(name=...)`
/// never surface here.
fn setup_arguments(content: &str) -> Option<Vec<&str>> {
    let start = content
        .match_indices("setup(")
        .map(|(i, _)| i)
        .find(|&i| {
            // Skip `def setup(` and identifiers that merely end in "setup"
            let before = &content[..i];
            let prev = before.chars().next_back();
            !before.trim_end().ends_with("def")
                && !prev.is_some_and(|c| c.is_alphanumeric() || c == '_' || c == '.')
        })?
        + "setup(".len();

    let text = &content[start..];
    let bytes = text.as_bytes();
    let mut arguments = Vec::new();
    let mut depth = 0usize;
    let mut segment = 0;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            quote @ (b'"' | b'\'') => {
                i = skip_string(bytes, i, quote);
                continue;
            }
            b'#' => {
                i = bytes[i..]
                    .iter()
                    .position(|&b| b == b'\n')
                    .map_or(bytes.len(), |n| i + n);
                continue;
            }
            b'(' | b'[' | b'{' => depth += 1,
            b')' | b']' | b'}' if depth > 0 => depth -= 1,
            b')' => {
                arguments.push(&text[segment..i]);
                return Some(arguments);
            }
            b',' if depth == 0 => {
                arguments.push(&text[segment..i]);
                segment = i + 1;
            }
            _ => {}
        }
        i += 1;
    }
    arguments.push(&text[segment..]);
    Some(arguments)
}

/// Index just past the string literal that opens at `start`
fn skip_string(bytes: &[u8], start: usize, quote: u8) -> usize {
    let delimiter = [quote; 3];
    let triple = bytes[start..].starts_with(&delimiter);
    let width = if triple { 3 } else { 1 };
    let mut i = start + width;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b if b == quote && (!triple || bytes[i..].starts_with(&delimiter)) => return i + width,
            // unterminated single-line literal
            b'\n' if !triple => return i + 1,
            _ => i += 1,
        }
    }
    bytes.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    const GBINDER_SETUP_PY: &str = r#"
from setuptools import setup, Extension

ext_modules = [Extension("gbinder", sources=sources)]

setup(
    name="gbinder",
    version="1.2.1",
    description="Cython extension module for C++ gbinder functions",
    author="Erfan Abdi",
    author_email="erfangplus@gmail.com",
    maintainer="Meshack Bahati",
    maintainer_email='bahatikylemeshack@gmail.com',
    url="https://github.com/Kyle6012/gbinder",
    license="GPLv3",
    python_requires=">=3.6",
    ext_modules=ext_modules,
    cmdclass={"build_ext": build_ext},
    classifiers=[
        "Programming Language :: Python :: 3",
        "Programming Language :: Cython",
    ],
    keywords=["Cython", "C++", "gbinder", "extension module"],
)
"#;

    #[test]
    fn test_parse_setup_call() {
        let descriptor = parse_source(GBINDER_SETUP_PY, Path::new("setup.py")).unwrap();
        assert_eq!(descriptor.kind, Some(DescriptorKind::SetupPy));
        assert_eq!(descriptor.name.as_deref(), Some("gbinder"));
        assert_eq!(descriptor.version.as_deref(), Some("1.2.1"));
        assert_eq!(descriptor.requires_python.as_deref(), Some(">=3.6"));
        assert_eq!(descriptor.authors[0].name.as_deref(), Some("Erfan Abdi"));
        assert_eq!(
            descriptor.maintainers[0].email.as_deref(),
            Some("bahatikylemeshack@gmail.com")
        );
        assert_eq!(descriptor.classifiers.len(), 2);
        assert_eq!(descriptor.keywords[3], "extension module");
    }

    #[test]
    fn test_build_only_setup_is_not_a_descriptor() {
        let source = "from setuptools import setup\nsetup(ext_modules=ext_modules)\n";
        assert!(parse_source(source, Path::new("setup.py")).is_none());
    }

    #[test]
    fn test_ignores_def_setup() {
        let source = "def setup(app):\n    pass\n\nsetuptools.setup(name='x')\nsetup(name='real', version='2.0')\n";
        let descriptor = parse_source(source, Path::new("setup.py")).unwrap();
        assert_eq!(descriptor.name.as_deref(), Some("real"));
        assert_eq!(descriptor.version.as_deref(), Some("2.0"));
    }

    #[test]
    fn test_nested_call_keywords_are_ignored() {
        let source = r#"
from setuptools import setup, Extension

setup(
    ext_modules=[Extension(name="_gbinder", sources=["gbinder.pyx"], language="c++")],
    cmdclass=dict(version="0.0.0"),
    name="gbinder",
    version="1.2.7",
)
"#;
        let descriptor = parse_source(source, Path::new("setup.py")).unwrap();
        assert_eq!(descriptor.name.as_deref(), Some("gbinder"));
        assert_eq!(descriptor.version.as_deref(), Some("1.2.7"));
    }

    #[test]
    fn test_parentheses_inside_strings_do_not_end_the_call() {
        let source = r#"
setup(
    description="Bindings (for libgbinder) :)",
    # closing paren in a comment )
    long_description="""Triple quoted ) text, with 'quotes' and version="9.9"
""",
    name='gbinder',
    version='1.2.7',
)
"#;
        let descriptor = parse_source(source, Path::new("setup.py")).unwrap();
        assert_eq!(descriptor.description.as_deref(), Some("Bindings (for libgbinder) :)"));
        assert_eq!(descriptor.name.as_deref(), Some("gbinder"));
        assert_eq!(descriptor.version.as_deref(), Some("1.2.7"));
    }
}
