//! `setup.cfg` `[metadata]` section parsing.

use super::{DescriptorKind, PackageDescriptor, Person};
use crate::error::Result;
use std::collections::BTreeMap;
use std::path::Path;

/// Parse setup.cfg; `None` when there is no `[metadata]` name
pub fn parse(path: &Path) -> Result<Option<PackageDescriptor>> {
    let content = std::fs::read_to_string(path)?;
    Ok(parse_source(&content, path))
}

pub(super) fn parse_source(content: &str, path: &Path) -> Option<PackageDescriptor> {
    let metadata = section(content, "metadata");

    let text = |key: &str| {
        metadata
            .get(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };
    let list = |key: &str| -> Vec<String> {
        metadata
            .get(key)
            .map(|v| {
                v.split(['\n', ','])
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    };

    let name = text("name")?;
    let mut urls = metadata
        .get("project_urls")
        .map(|v| parse_url_map(v))
        .unwrap_or_default();

    Some(PackageDescriptor {
        kind: Some(DescriptorKind::SetupCfg),
        path: path.to_path_buf(),
        name: Some(name),
        version: text("version"),
        description: text("description"),
        readme: text("long_description").map(|v| v.trim_start_matches("file:").trim().to_string()),
        requires_python: section(content, "options")
            .get("python_requires")
            .map(|v| v.trim().to_string()),
        license: text("license"),
        authors: Person::from_parts(text("author"), text("author_email"))
            .into_iter()
            .collect(),
        maintainers: Person::from_parts(text("maintainer"), text("maintainer_email"))
            .into_iter()
            .collect(),
        keywords: list("keywords"),
        classifiers: list("classifiers"),
        source_url: urls.remove("source").or_else(|| text("url")),
        build_system: None,
    })
}

/// Key/value pairs of one INI section, joining indented continuation lines
fn section(content: &str, wanted: &str) -> BTreeMap<String, String> {
    let mut values = BTreeMap::new();
    let mut in_section = false;
    let mut current: Option<String> = None;

    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with('#') || trimmed.starts_with(';') {
            continue;
        }
        if trimmed.starts_with('[') && trimmed.ends_with(']') {
            in_section = trimmed[1..trimmed.len() - 1].trim() == wanted;
            current = None;
            continue;
        }
        if !in_section || trimmed.is_empty() {
            continue;
        }

        let continuation = line.starts_with(' ') || line.starts_with('\t');
        if continuation {
            if let Some(key) = &current {
                let entry: &mut String = values.entry(key.clone()).or_default();
                entry.push('\n');
                entry.push_str(trimmed);
            }
        } else if let Some((key, value)) = trimmed.split_once(['=', ':']) {
            let key = key.trim().to_ascii_lowercase().replace('-', "_");
            values.insert(key.clone(), value.trim().to_string());
            current = Some(key);
        }
    }
    values
}

fn parse_url_map(raw: &str) -> BTreeMap<String, String> {
    raw.lines()
        .filter_map(|line| line.split_once('='))
        .map(|(k, v)| (k.trim().to_ascii_lowercase(), v.trim().to_string()))
        .collect()
}
