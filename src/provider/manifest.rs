//! Manifest directory provider
//!
//! Reads metadata from JSON manifests laid out by package path:
//! `Demo::Foo` lives at `ROOT/Demo/Foo.json`. A manifest is the package
//! metadata object; its optional `functions` object maps each function name
//! to that function's metadata.
//!
//! Every manifest on disk counts as registered, so `+Name` selectors work
//! without a load step and describe reads manifests lazily.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use serde_json::Value;
use tracing::{debug, warn};

use super::{Locator, MetadataProvider, ModuleLoader};
use crate::entity::SEP;
use crate::response::{Response, SERVER_ERROR};
use crate::selector::is_valid_name;
use crate::{Error, Result};

pub const FUNCTIONS_KEY: &str = "functions";
const EXTENSION: &str = "json";

pub struct ManifestProvider {
    root: PathBuf,
    cache: RefCell<BTreeMap<String, Value>>,
}

impl ManifestProvider {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            cache: RefCell::new(BTreeMap::new()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `Demo::Foo` -> `ROOT/Demo/Foo.json`
    pub fn manifest_path(&self, name: &str) -> PathBuf {
        let mut path = self.root.clone();
        for segment in name.split(SEP) {
            path.push(segment);
        }
        path.set_extension(EXTENSION);
        path
    }

    /// `ROOT/Demo/Foo.json` -> `Demo::Foo`
    fn name_for(&self, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(&self.root).ok()?.with_extension("");
        let segments: Vec<&str> = relative
            .components()
            .map(|c| c.as_os_str().to_str())
            .collect::<Option<Vec<_>>>()?;
        if segments.is_empty() {
            return None;
        }
        Some(segments.join(SEP))
    }

    fn read_manifest(&self, name: &str) -> Result<Value> {
        let path = self.manifest_path(name);
        let contents = std::fs::read_to_string(&path).map_err(|e| Error::Load {
            name: name.to_string(),
            reason: format!("{}: {}", path.display(), e),
        })?;
        let manifest: Value = serde_json::from_str(&contents).map_err(|e| Error::Load {
            name: name.to_string(),
            reason: format!("{}: {}", path.display(), e),
        })?;
        if !manifest.is_object() {
            return Err(Error::Load {
                name: name.to_string(),
                reason: format!("{}: manifest is not a JSON object", path.display()),
            });
        }
        Ok(manifest)
    }

    /// Cached manifest, reading it on first use
    fn manifest(&self, name: &str) -> Result<Value> {
        if let Some(manifest) = self.cache.borrow().get(name) {
            return Ok(manifest.clone());
        }
        let manifest = self.read_manifest(name)?;
        self.cache.borrow_mut().insert(name.to_string(), manifest.clone());
        Ok(manifest)
    }

    fn discover(&self, prefix: &str) -> Result<Vec<String>> {
        let mut dir = self.root.clone();
        for segment in prefix.split(SEP) {
            dir.push(segment);
        }
        if !dir.is_dir() {
            debug!(prefix, dir = %dir.display(), "nothing under prefix");
            return Ok(Vec::new());
        }

        let pattern = format!(
            "{}/**/*.{}",
            glob::Pattern::escape(&dir.display().to_string()),
            EXTENSION
        );
        let entries = glob::glob(&pattern).map_err(|e| Error::Load {
            name: prefix.to_string(),
            reason: e.to_string(),
        })?;

        let mut names = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| Error::Load {
                name: prefix.to_string(),
                reason: e.to_string(),
            })?;
            match self.name_for(&path) {
                Some(name) if is_valid_name(&name) => names.push(name),
                _ => debug!(path = %path.display(), "skipping manifest with invalid name"),
            }
        }
        names.sort();
        Ok(names)
    }
}

impl MetadataProvider for ManifestProvider {
    fn describe(&self, locator: &Locator) -> Response<Value> {
        let package = locator.package_name();
        if !self.manifest_path(package).is_file() {
            return Response::not_found(locator);
        }
        let mut manifest = match self.manifest(package) {
            Ok(m) => m,
            Err(e) => return Response::error(SERVER_ERROR, e.to_string()),
        };

        match locator {
            Locator::Package(_) => {
                if let Some(obj) = manifest.as_object_mut() {
                    obj.remove(FUNCTIONS_KEY);
                }
                Response::ok(manifest)
            }
            Locator::Function { name, .. } => manifest
                .get(FUNCTIONS_KEY)
                .and_then(|f| f.get(name))
                .cloned()
                .map(Response::ok)
                .unwrap_or_else(|| Response::not_found(locator)),
        }
    }

    fn enumerate(&self, package: &str) -> Response<Vec<String>> {
        if !self.manifest_path(package).is_file() {
            return Response::not_found(package);
        }
        match self.manifest(package) {
            Ok(manifest) => {
                let mut names: Vec<String> = manifest
                    .get(FUNCTIONS_KEY)
                    .and_then(Value::as_object)
                    .map(|f| f.keys().cloned().collect())
                    .unwrap_or_default();
                names.sort();
                Response::ok(names)
            }
            Err(e) => Response::error(SERVER_ERROR, e.to_string()),
        }
    }
}

impl ModuleLoader for ManifestProvider {
    fn load(&self, name: &str) -> Result<()> {
        // Always re-read so a load observes the current file
        let manifest = self.read_manifest(name)?;
        self.cache.borrow_mut().insert(name.to_string(), manifest);
        debug!(name, "manifest loaded");
        Ok(())
    }

    fn modules_under(&self, prefix: &str) -> Result<Vec<String>> {
        self.discover(prefix)
    }

    fn loaded_under(&self, prefix: &str) -> Vec<String> {
        match self.discover(prefix) {
            Ok(names) => names,
            Err(e) => {
                warn!(prefix, error = %e, "cannot list manifests");
                Vec::new()
            }
        }
    }

    fn source_mtime(&self, name: &str) -> Option<i64> {
        let modified = std::fs::metadata(self.manifest_path(name)).ok()?.modified().ok()?;
        let secs = modified.duration_since(UNIX_EPOCH).ok()?.as_secs();
        i64::try_from(secs).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn write(root: &Path, rel: &str, value: &Value) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, serde_json::to_string_pretty(value).unwrap()).unwrap();
    }

    fn fixture() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "Demo/Foo.json",
            &json!({
                "summary": "Does foo",
                "functions": {
                    "run": { "summary": "Runs", "args": { "n": { "schema": "int" } } },
                    "halt": { "summary": "Stops" },
                }
            }),
        );
        write(dir.path(), "Demo/Bar.json", &json!({ "summary": "Does bar" }));
        write(dir.path(), "Demo/Deep/Baz.json", &json!({}));
        write(dir.path(), "Other.json", &json!({}));
        dir
    }

    #[test]
    fn test_paths_and_names() {
        let provider = ManifestProvider::new("/srv/meta");
        let path = provider.manifest_path("Demo::Foo");
        assert_eq!(path, PathBuf::from("/srv/meta/Demo/Foo.json"));
        assert_eq!(provider.name_for(&path).as_deref(), Some("Demo::Foo"));
    }

    #[test]
    fn test_discovery_is_recursive_and_sorted() {
        let dir = fixture();
        let provider = ManifestProvider::new(dir.path());
        assert_eq!(
            provider.modules_under("Demo").unwrap(),
            vec!["Demo::Bar", "Demo::Deep::Baz", "Demo::Foo"]
        );
        assert_eq!(provider.loaded_under("Demo::Deep"), vec!["Demo::Deep::Baz"]);
        assert!(provider.modules_under("Missing").unwrap().is_empty());
    }

    #[test]
    fn test_discovery_skips_invalid_names() {
        let dir = fixture();
        write(dir.path(), "Demo/v1.2.json", &json!({}));
        write(dir.path(), "Demo/has-dash.json", &json!({}));
        let provider = ManifestProvider::new(dir.path());
        assert_eq!(
            provider.modules_under("Demo").unwrap(),
            vec!["Demo::Bar", "Demo::Deep::Baz", "Demo::Foo"]
        );
    }

    #[test]
    fn test_describe_strips_functions() {
        let dir = fixture();
        let provider = ManifestProvider::new(dir.path());
        provider.load("Demo::Foo").unwrap();

        let pkg = provider.describe(&Locator::package("Demo::Foo")).payload.unwrap();
        assert_eq!(pkg["summary"], "Does foo");
        assert!(pkg.get(FUNCTIONS_KEY).is_none());

        let run = provider.describe(&Locator::function("Demo::Foo", "run")).payload.unwrap();
        assert_eq!(run["summary"], "Runs");

        assert_eq!(provider.enumerate("Demo::Foo").payload.unwrap(), vec!["halt", "run"]);
        assert_eq!(provider.enumerate("Demo::Bar").payload.unwrap(), Vec::<String>::new());
    }

    #[test]
    fn test_missing_and_invalid_manifests() {
        let dir = fixture();
        std::fs::write(dir.path().join("Demo/Broken.json"), "{ not json").unwrap();
        let provider = ManifestProvider::new(dir.path());

        assert!(matches!(provider.load("Demo::Nope"), Err(Error::Load { .. })));
        assert!(matches!(provider.load("Demo::Broken"), Err(Error::Load { .. })));
        assert_eq!(provider.describe(&Locator::package("Demo::Nope")).status, 404);
        assert_eq!(provider.describe(&Locator::package("Demo::Broken")).status, SERVER_ERROR);
        assert_eq!(provider.describe(&Locator::function("Demo::Foo", "nope")).status, 404);
    }

    #[test]
    fn test_source_mtime() {
        let dir = fixture();
        let provider = ManifestProvider::new(dir.path());
        assert!(provider.source_mtime("Demo::Foo").unwrap() > 0);
        assert_eq!(provider.source_mtime("Demo::Nope"), None);
    }
}
