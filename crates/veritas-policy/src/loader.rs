//! Policy loader: walks a rooted directory of policy bundles and indexes
//! them by category/subcategory/version, extracting each folder's declared
//! `required_metrics`.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use veritas_contracts::error::{VeritasError, VeritasResult};

/// Extensions the loader recognizes as policy files. The `policy.meta.toml`
/// sidecar itself is metadata, not a policy file, and is excluded.
const POLICY_EXTENSIONS: &[&str] = &["rego", "policy"];
const SIDECAR_FILE_NAME: &str = "policy.meta.toml";

#[derive(Debug, Clone)]
pub struct PolicyFile {
    pub path: PathBuf,
    /// Slash-separated directory path from the loader root, e.g.
    /// `international/eu_ai_act/v1/fairness`.
    pub category_path: String,
    pub version: Option<String>,
}

#[derive(Debug, Default)]
struct FolderEntry {
    files: Vec<PolicyFile>,
    required_metrics: BTreeSet<String>,
}

/// Immutable (post-load) index of a policy root directory: the snapshot
/// is immutable after `load`, so concurrent readers need no
/// synchronization.
#[derive(Debug, Default)]
pub struct PolicyLoader {
    folders: Vec<(String, FolderEntry)>,
}

fn is_version_segment(segment: &str) -> bool {
    segment.starts_with('v') && segment[1..].chars().all(|c| c.is_ascii_digit()) && segment.len() > 1
}

fn to_slash_path(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Parses a `required_metrics = ["a", "b"]` sidecar array from a parsed
/// `policy.meta.toml` document.
fn sidecar_required_metrics(contents: &str) -> VeritasResult<BTreeSet<String>> {
    let parsed: toml::Value = toml::from_str(contents).map_err(|e| VeritasError::Config {
        reason: format!("failed to parse policy sidecar TOML: {e}"),
    })?;
    let metrics = parsed
        .get("required_metrics")
        .and_then(toml::Value::as_array)
        .map(|arr| arr.iter().filter_map(|v| v.as_str()).map(str::to_string).collect())
        .unwrap_or_default();
    Ok(metrics)
}

/// Falls back to scanning a policy file's leading comment block for lines
/// of the form `# required_metrics: a, b, c` when no sidecar is present,
/// tolerating both forms rather than enforcing one exclusively.
fn comment_convention_required_metrics(contents: &str) -> BTreeSet<String> {
    const PREFIX: &str = "required_metrics:";
    let mut metrics = BTreeSet::new();
    for line in contents.lines() {
        let trimmed = line.trim_start();
        let Some(rest) = trimmed.strip_prefix('#') else {
            continue;
        };
        let rest = rest.trim_start();
        if let Some(list) = rest.strip_prefix(PREFIX) {
            for entry in list.split(',') {
                let entry = entry.trim();
                if !entry.is_empty() {
                    metrics.insert(entry.to_string());
                }
            }
        }
    }
    metrics
}

impl PolicyLoader {
    /// Walks `root` recursively, indexing every recognized policy file and
    /// extracting each folder's `required_metrics`.
    pub fn load(root: impl AsRef<Path>) -> VeritasResult<Self> {
        let root = root.as_ref();
        let mut loader = PolicyLoader::default();
        loader.walk(root, root)?;
        Ok(loader)
    }

    fn entry_mut(&mut self, category_path: &str) -> &mut FolderEntry {
        if let Some(index) = self.folders.iter().position(|(path, _)| path == category_path) {
            &mut self.folders[index].1
        } else {
            self.folders.push((category_path.to_string(), FolderEntry::default()));
            &mut self.folders.last_mut().unwrap().1
        }
    }

    fn walk(&mut self, root: &Path, dir: &Path) -> VeritasResult<()> {
        let entries = fs::read_dir(dir).map_err(|e| VeritasError::Config {
            reason: format!("failed to read policy directory {}: {e}", dir.display()),
        })?;

        let category_path = to_slash_path(dir.strip_prefix(root).unwrap_or(Path::new("")));
        let sidecar_path = dir.join(SIDECAR_FILE_NAME);
        let sidecar_metrics = if sidecar_path.is_file() {
            let contents = fs::read_to_string(&sidecar_path).map_err(|e| VeritasError::Config {
                reason: format!("failed to read {}: {e}", sidecar_path.display()),
            })?;
            Some(sidecar_required_metrics(&contents)?)
        } else {
            None
        };

        for entry in entries {
            let entry = entry.map_err(|e| VeritasError::Config {
                reason: format!("failed to iterate policy directory {}: {e}", dir.display()),
            })?;
            let path = entry.path();
            if path.is_dir() {
                self.walk(root, &path)?;
                continue;
            }
            let is_sidecar = path.file_name().and_then(|n| n.to_str()) == Some(SIDECAR_FILE_NAME);
            if is_sidecar {
                continue;
            }
            let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");
            if !POLICY_EXTENSIONS.contains(&extension) {
                continue;
            }

            let version = dir
                .file_name()
                .and_then(|n| n.to_str())
                .filter(|segment| is_version_segment(segment))
                .map(str::to_string);

            let metrics = if let Some(sidecar_metrics) = &sidecar_metrics {
                sidecar_metrics.clone()
            } else {
                let contents = fs::read_to_string(&path).map_err(|e| VeritasError::Config {
                    reason: format!("failed to read policy file {}: {e}", path.display()),
                })?;
                comment_convention_required_metrics(&contents)
            };

            debug!(path = %path.display(), metrics = ?metrics, "indexed policy file");

            let policy_file = PolicyFile {
                path: path.clone(),
                category_path: category_path.clone(),
                version: version.clone(),
            };
            let entry = self.entry_mut(&category_path);
            entry.files.push(policy_file);
            entry.required_metrics.extend(metrics);
        }
        Ok(())
    }

    /// Case-insensitive substring match of `selector` against indexed
    /// category paths, returning best matches in lexicographic order.
    /// `selector` may be a short alias (`eu_ai_act`) or an explicit path
    /// (`international/eu_ai_act`).
    pub fn find_matching_folders(&self, selector: &str) -> Vec<String> {
        let needle = selector.to_lowercase();
        let mut matches: Vec<String> = self
            .folders
            .iter()
            .map(|(path, _)| path.clone())
            .filter(|path| path.to_lowercase().contains(&needle))
            .collect();
        matches.sort();
        if matches.is_empty() {
            warn!(selector, "no policy folder matched selector");
        }
        matches
    }

    pub fn get_policies_by_folder(&self, folder: &str) -> Vec<PolicyFile> {
        self.folders
            .iter()
            .find(|(path, _)| path == folder)
            .map(|(_, entry)| entry.files.clone())
            .unwrap_or_default()
    }

    pub fn get_required_metrics_for_folder(&self, folder: &str) -> BTreeSet<String> {
        self.folders
            .iter()
            .find(|(path, _)| path == folder)
            .map(|(_, entry)| entry.required_metrics.clone())
            .unwrap_or_default()
    }

    /// Derived dotted query name for the policy engine, e.g.
    /// `data.international.eu_ai_act.v1.fairness`.
    pub fn get_policy_package_path(&self, folder: &str) -> String {
        format!("data.{}", folder.replace('/', "."))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(path: &Path, contents: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    #[test]
    fn loads_sidecar_metrics_and_indexes_files_by_category() {
        let dir = tempdir();
        let folder = dir.path().join("international/eu_ai_act/v1/fairness");
        write(&folder.join("policy.meta.toml"), "required_metrics = [\"fairness.score\"]\n");
        write(&folder.join("rules.rego"), "package fairness\n");

        let loader = PolicyLoader::load(dir.path()).unwrap();
        let matches = loader.find_matching_folders("eu_ai_act");
        assert_eq!(matches.len(), 1);
        let folder_path = &matches[0];
        assert_eq!(loader.get_policies_by_folder(folder_path).len(), 1);
        assert!(loader.get_required_metrics_for_folder(folder_path).contains("fairness.score"));
        assert_eq!(
            loader.get_policy_package_path(folder_path),
            "data.international.eu_ai_act.v1.fairness"
        );
    }

    #[test]
    fn falls_back_to_comment_convention_when_no_sidecar() {
        let dir = tempdir();
        let folder = dir.path().join("healthcare/hipaa");
        write(
            &folder.join("rules.policy"),
            "# required_metrics: risk_management.score, content_safety.score\npackage hipaa\n",
        );

        let loader = PolicyLoader::load(dir.path()).unwrap();
        let metrics = loader.get_required_metrics_for_folder("healthcare/hipaa");
        assert!(metrics.contains("risk_management.score"));
        assert!(metrics.contains("content_safety.score"));
    }

    #[test]
    fn selector_matching_is_case_insensitive_substring() {
        let dir = tempdir();
        write(&dir.path().join("International/EU_AI_Act/v1/rules.rego"), "package x\n");
        let loader = PolicyLoader::load(dir.path()).unwrap();
        assert_eq!(loader.find_matching_folders("eu_ai_act").len(), 1);
    }

    #[test]
    fn unmatched_selector_returns_empty() {
        let dir = tempdir();
        write(&dir.path().join("healthcare/rules.rego"), "package x\n");
        let loader = PolicyLoader::load(dir.path()).unwrap();
        assert!(loader.find_matching_folders("nonexistent").is_empty());
    }

    /// Minimal self-cleaning temp directory helper (no external crate).
    struct TempDir(PathBuf);
    impl TempDir {
        fn path(&self) -> &Path {
            &self.0
        }
    }
    impl Drop for TempDir {
        fn drop(&mut self) {
            let _ = fs::remove_dir_all(&self.0);
        }
    }
    fn tempdir() -> TempDir {
        let mut path = std::env::temp_dir();
        path.push(format!("veritas-policy-test-{}", std::process::id()));
        path.push(uuid_like());
        fs::create_dir_all(&path).unwrap();
        TempDir(path)
    }
    fn uuid_like() -> String {
        use std::time::{SystemTime, UNIX_EPOCH};
        let nanos = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_nanos();
        format!("{nanos:x}")
    }
}
