//! Reading uploaded `.dap` archives.
//!
//! A dap is a gzip-compressed tarball named `<name>-<version>.dap` whose
//! members all live in `<name>-<version>/`, with the package metadata in
//! `<name>-<version>/meta.yaml`.

use std::io::Read;
use std::path::{Component, Path};

use flate2::read::GzDecoder;
use serde::Deserialize;
use tar::Archive;

use super::names::is_valid_package_name;
use super::version::Version;

/// Largest accepted `meta.yaml`
pub const META_LIMIT: u64 = 64 * 1024;

/// Largest accepted sum of member sizes
pub const UNPACKED_LIMIT: u64 = 256 * 1024 * 1024;

/// Validated metadata of an uploaded dap
#[derive(Debug, Clone, PartialEq)]
pub struct DapMeta {
    pub package_name: String,
    pub version: String,
    pub license: String,
    pub authors: Vec<String>,
    pub summary: String,
    pub description: String,
    pub homepage: String,
    pub bugreports: String,
}

#[derive(Debug, Default, Deserialize)]
struct RawMeta {
    package_name: Option<serde_yaml::Value>,
    version: Option<serde_yaml::Value>,
    license: Option<String>,
    authors: Option<Vec<String>>,
    summary: Option<String>,
    description: Option<String>,
    homepage: Option<String>,
    bugreports: Option<String>,
}

/// Reads and validates a dap archive, collecting every problem found
pub fn read_dap(filename: &str, bytes: &[u8]) -> Result<DapMeta, Vec<String>> {
    read_dap_within(filename, bytes, UNPACKED_LIMIT)
}

fn read_dap_within(filename: &str, bytes: &[u8], unpacked_limit: u64) -> Result<DapMeta, Vec<String>> {
    let Some(top) = filename.strip_suffix(".dap") else {
        return Err(vec![format!("{} is not a .dap file.", filename)]);
    };
    if top.is_empty() || top.contains('/') {
        return Err(vec![format!("{} is not a valid dap file name.", filename)]);
    }

    let meta_path = format!("{}/meta.yaml", top);
    let mut errors = Vec::new();
    let mut meta_source = None;
    let mut unpacked: u64 = 0;

    let mut archive = Archive::new(GzDecoder::new(bytes));
    let entries = archive
        .entries()
        .map_err(|_| vec!["Not a valid gzip-compressed tar archive.".to_string()])?;

    for entry in entries {
        let mut entry =
            entry.map_err(|_| vec!["Not a valid gzip-compressed tar archive.".to_string()])?;
        let path = entry
            .path()
            .map_err(|_| vec!["Archive contains an unreadable file name.".to_string()])?
            .into_owned();
        let display = path.to_string_lossy().trim_end_matches('/').to_string();

        unpacked = unpacked.saturating_add(entry.size());
        if unpacked > unpacked_limit {
            errors.push("Archive is too large when unpacked.".to_string());
            return Err(errors);
        }

        if !is_safe(&path) {
            errors.push(format!("{} is not a safe path.", display));
            continue;
        }
        if display != top && !display.starts_with(&format!("{}/", top)) {
            errors.push(format!("{} is not in the {} directory.", display, top));
            continue;
        }
        if display == meta_path {
            if entry.size() > META_LIMIT {
                errors.push(format!("meta.yaml is larger than {} KiB.", META_LIMIT / 1024));
                return Err(errors);
            }
            let mut raw = Vec::new();
            if (&mut entry)
                .take(META_LIMIT + 1)
                .read_to_end(&mut raw)
                .is_err()
            {
                errors.push("Not a valid gzip-compressed tar archive.".to_string());
                return Err(errors);
            }
            match String::from_utf8(raw) {
                Ok(source) => meta_source = Some(source),
                Err(_) => errors.push("meta.yaml is not valid UTF-8.".to_string()),
            }
        }
    }

    let Some(source) = meta_source else {
        errors.push(format!("Missing {}.", meta_path));
        return Err(errors);
    };

    let raw: RawMeta = match serde_yaml::from_str::<Option<RawMeta>>(&source) {
        Ok(raw) => raw.unwrap_or_default(),
        Err(e) => {
            errors.push(format!("meta.yaml is not valid: {}", e));
            return Err(errors);
        }
    };

    let meta = validate_meta(raw, &mut errors);
    if let Some(meta) = &meta {
        let expected = format!("{}-{}", meta.package_name, meta.version);
        if expected != top {
            errors.push(format!(
                "The top-level directory {} does not match the package_name and version ({}).",
                top, expected
            ));
        }
    }

    match meta {
        Some(meta) if errors.is_empty() => Ok(meta),
        _ => Err(errors),
    }
}

fn is_safe(path: &Path) -> bool {
    path.components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

fn scalar_to_string(value: Option<serde_yaml::Value>) -> Option<String> {
    match value? {
        serde_yaml::Value::String(s) => Some(s),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn validate_url(field: &str, value: Option<String>, errors: &mut Vec<String>) -> String {
    let Some(value) = non_empty(value) else {
        return String::new();
    };
    match url::Url::parse(&value) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => value,
        _ => {
            errors.push(format!("{} is not a valid URL.", field));
            String::new()
        }
    }
}

fn validate_meta(raw: RawMeta, errors: &mut Vec<String>) -> Option<DapMeta> {
    let package_name = match non_empty(scalar_to_string(raw.package_name)) {
        Some(name) if is_valid_package_name(&name) => Some(name),
        Some(name) => {
            errors.push(format!("{} is not a valid package_name.", name));
            None
        }
        None => {
            errors.push("package_name is missing in meta.yaml.".to_string());
            None
        }
    };

    let version = match non_empty(scalar_to_string(raw.version)) {
        Some(version) => match Version::parse(&version) {
            Ok(_) => Some(version),
            Err(e) => {
                errors.push(format!("{}.", e));
                None
            }
        },
        None => {
            errors.push("version is missing in meta.yaml.".to_string());
            None
        }
    };

    let license = non_empty(raw.license);
    if license.is_none() {
        errors.push("license is missing in meta.yaml.".to_string());
    }

    let authors: Vec<String> = raw
        .authors
        .unwrap_or_default()
        .into_iter()
        .map(|a| a.trim().to_string())
        .filter(|a| !a.is_empty())
        .collect();
    if authors.is_empty() {
        errors.push("authors are missing in meta.yaml.".to_string());
    }

    let summary = non_empty(raw.summary);
    if summary.is_none() {
        errors.push("summary is missing in meta.yaml.".to_string());
    }

    let homepage = validate_url("homepage", raw.homepage, errors);
    let bugreports = validate_url("bugreports", raw.bugreports, errors);

    Some(DapMeta {
        package_name: package_name?,
        version: version?,
        license: license?,
        authors,
        summary: summary?,
        description: raw.description.unwrap_or_default().trim().to_string(),
        homepage,
        bugreports,
    })
}
