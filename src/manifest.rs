// src/manifest.rs
//! Declared third-party dependencies, read from the project's manifests.
//!
//! Supports `requirements.txt` and the `[project]` table of
//! `pyproject.toml`. Distribution names are normalized to importable form
//! (lowercased, separators collapsed to underscores).

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use toml::Value;

/// The project's declared external packages. `pins` preserves the raw
/// declaration strings in sorted order so the computation cache can
/// fingerprint exact versions.
#[derive(Debug, Default, Clone)]
pub struct DeclaredDependencies {
    pub packages: BTreeSet<String>,
    pub pins: Vec<String>,
}

impl DeclaredDependencies {
    #[must_use]
    pub fn contains(&self, normalized_name: &str) -> bool {
        self.packages.contains(normalized_name)
    }
}

/// Reads every manifest present at the project root. Missing manifests are
/// not an error; an empty set simply declares nothing.
#[must_use]
pub fn load(project_root: &Path) -> DeclaredDependencies {
    let mut declared = DeclaredDependencies::default();

    let requirements = project_root.join("requirements.txt");
    if let Ok(content) = fs::read_to_string(&requirements) {
        parse_requirements(&content, &mut declared);
    }

    let pyproject = project_root.join("pyproject.toml");
    if let Ok(content) = fs::read_to_string(&pyproject) {
        parse_pyproject(&content, &mut declared);
    }

    declared.pins.sort();
    declared.pins.dedup();
    declared
}

fn parse_requirements(content: &str, declared: &mut DeclaredDependencies) {
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with('-') {
            continue;
        }
        declared.pins.push(line.to_string());
        declared.packages.insert(normalize_name(requirement_name(line)));
    }
}

fn parse_pyproject(content: &str, declared: &mut DeclaredDependencies) {
    let Ok(value) = toml::from_str::<Value>(content) else {
        return;
    };
    let Some(deps) = value
        .get("project")
        .and_then(|p| p.get("dependencies"))
        .and_then(Value::as_array)
    else {
        return;
    };

    for dep in deps.iter().filter_map(Value::as_str) {
        declared.pins.push(dep.to_string());
        declared.packages.insert(normalize_name(requirement_name(dep)));
    }
}

/// Takes the distribution name off the front of a requirement specifier
/// (`requests[socks] >=2.31 ; python_version > "3.8"` -> `requests`).
fn requirement_name(spec: &str) -> &str {
    spec.split([' ', '=', '<', '>', '!', '~', ';', '[', '@'])
        .next()
        .unwrap_or(spec)
}

/// Normalizes a distribution name to the form used for import matching.
#[must_use]
pub fn normalize_name(name: &str) -> String {
    name.trim()
        .to_lowercase()
        .split(|c: char| c.is_whitespace() || c == '-' || c == '_' || c == '.')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_requirement_name_extraction() {
        assert_eq!(requirement_name("requests>=2.31"), "requests");
        assert_eq!(requirement_name("uvicorn[standard] ==0.29.0"), "uvicorn");
        assert_eq!(requirement_name("pip @ https://example.com/pip.whl"), "pip");
    }

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("Flask-SQLAlchemy"), "flask_sqlalchemy");
        assert_eq!(normalize_name("zope.interface"), "zope_interface");
        assert_eq!(normalize_name("requests"), "requests");
    }

    #[test]
    fn test_load_requirements_txt() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("requirements.txt"),
            "# pinned\nrequests==2.31.0\n-r other.txt\nFlask-Login>=0.6\n",
        )
        .unwrap();

        let declared = load(dir.path());
        assert!(declared.contains("requests"));
        assert!(declared.contains("flask_login"));
        assert!(!declared.contains("other"));
        assert_eq!(declared.pins.len(), 2);
    }

    #[test]
    fn test_load_pyproject() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("pyproject.toml"),
            "[project]\nname = \"demo\"\ndependencies = [\"numpy>=1.26\", \"pyyaml\"]\n",
        )
        .unwrap();

        let declared = load(dir.path());
        assert!(declared.contains("numpy"));
        assert!(declared.contains("pyyaml"));
    }

    #[test]
    fn test_missing_manifests_declare_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let declared = load(dir.path());
        assert!(declared.packages.is_empty());
        assert!(declared.pins.is_empty());
    }
}
