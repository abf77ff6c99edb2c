use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::capabilities::DocumentStore;
use crate::model::{ContextRecord, ContextRegistry, Project};
use crate::{CoreError, Store};

pub const DEFAULT_PROJECTS_FILE: &str = "Active_Projects.yaml";
pub const DEFAULT_CONTEXTS_FILE: &str = "Contexts.yaml";

// On-disk shapes tolerate `null` at every level: a bare project or context
// key with no body is written by hand often enough.
type ProjectsDocument = BTreeMap<String, Option<Project>>;
type ContextsDocument = BTreeMap<String, Option<BTreeMap<String, Option<ContextRecord>>>>;

/// The two YAML documents inside a data directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct YamlDocumentStore {
    projects_path: PathBuf,
    contexts_path: PathBuf,
}

impl YamlDocumentStore {
    pub fn new(projects_path: impl Into<PathBuf>, contexts_path: impl Into<PathBuf>) -> Self {
        Self {
            projects_path: projects_path.into(),
            contexts_path: contexts_path.into(),
        }
    }

    pub fn in_directory(data_dir: impl AsRef<Path>) -> Self {
        let data_dir = data_dir.as_ref();
        Self::new(
            data_dir.join(DEFAULT_PROJECTS_FILE),
            data_dir.join(DEFAULT_CONTEXTS_FILE),
        )
    }

    pub fn projects_path(&self) -> &Path {
        &self.projects_path
    }

    pub fn contexts_path(&self) -> &Path {
        &self.contexts_path
    }
}

impl DocumentStore for YamlDocumentStore {
    fn load(&self) -> Result<Store, CoreError> {
        let projects = read_document::<ProjectsDocument>(&self.projects_path)?
            .into_iter()
            .map(|(name, project)| (name, project.unwrap_or_default()))
            .collect::<BTreeMap<_, _>>();
        let registry = read_document::<ContextsDocument>(&self.contexts_path)?
            .into_iter()
            .map(|(category, contexts)| {
                let contexts = contexts
                    .unwrap_or_default()
                    .into_iter()
                    .map(|(context, record)| (context, record.unwrap_or_default()))
                    .collect::<BTreeMap<_, _>>();
                (category, contexts)
            })
            .collect::<ContextRegistry>();

        tracing::info!(
            projects = projects.len(),
            categories = registry.len(),
            path = %self.projects_path.display(),
            "loaded data documents"
        );
        Ok(Store::from_parts(projects, registry))
    }

    /// Writes both documents to temporary siblings first and renames them into
    /// place only when both serialized and wrote cleanly. No temporary file
    /// outlives the call.
    fn dump(&self, store: &Store) -> Result<(), CoreError> {
        let projects = render_document(&self.projects_path, &store.projects)?;
        let contexts = render_document(&self.contexts_path, &store.registry)?;

        let projects_tmp = write_temp(&self.projects_path, &projects)?;
        let contexts_tmp = match write_temp(&self.contexts_path, &contexts) {
            Ok(path) => path,
            Err(error) => {
                let _ = fs::remove_file(&projects_tmp);
                return Err(error);
            }
        };

        // A failed second rename puts the previous projects document back.
        let previous_projects = fs::read(&self.projects_path).ok();
        if let Err(error) = replace(&projects_tmp, &self.projects_path) {
            let _ = fs::remove_file(&projects_tmp);
            let _ = fs::remove_file(&contexts_tmp);
            return Err(error);
        }
        if let Err(error) = replace(&contexts_tmp, &self.contexts_path) {
            let _ = fs::remove_file(&contexts_tmp);
            restore(&self.projects_path, previous_projects);
            return Err(error);
        }
        tracing::info!(
            projects = store.projects.len(),
            categories = store.registry.len(),
            path = %self.projects_path.display(),
            "dumped data documents"
        );
        Ok(())
    }
}

fn read_document<T>(path: &Path) -> Result<T, CoreError>
where
    T: DeserializeOwned + Default,
{
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(error) if error.kind() == io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "data document missing; starting empty");
            return Ok(T::default());
        }
        Err(error) => {
            return Err(CoreError::Persistence(format!(
                "failed to read {}: {error}",
                path.display()
            )));
        }
    };
    if raw.trim().is_empty() {
        return Ok(T::default());
    }

    let parsed: Option<T> = serde_yaml::from_str(&raw).map_err(|error| {
        CoreError::Persistence(format!("failed to parse {}: {error}", path.display()))
    })?;
    Ok(parsed.unwrap_or_default())
}

fn render_document<T: Serialize>(path: &Path, value: &T) -> Result<String, CoreError> {
    serde_yaml::to_string(value).map_err(|error| {
        CoreError::Persistence(format!(
            "failed to serialize {}: {error}",
            path.display()
        ))
    })
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

fn write_temp(path: &Path, rendered: &str) -> Result<PathBuf, CoreError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|error| {
                CoreError::Persistence(format!(
                    "failed to create data directory {}: {error}",
                    parent.display()
                ))
            })?;
        }
    }

    let tmp = temp_path(path);
    fs::write(&tmp, rendered.as_bytes()).map_err(|error| {
        CoreError::Persistence(format!("failed to write {}: {error}", tmp.display()))
    })?;
    Ok(tmp)
}

fn restore(path: &Path, previous: Option<Vec<u8>>) {
    let restored = match previous {
        Some(bytes) => fs::write(path, bytes),
        None => fs::remove_file(path),
    };
    if let Err(error) = restored {
        tracing::warn!(path = %path.display(), %error, "failed to restore data document");
    }
}

fn replace(tmp: &Path, path: &Path) -> Result<(), CoreError> {
    fs::rename(tmp, path).map_err(|error| {
        CoreError::Persistence(format!(
            "failed to move {} into place: {error}",
            path.display()
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Resource, ResourceKind};
    use std::time::{SystemTime, UNIX_EPOCH};

    struct TempDir {
        path: PathBuf,
    }

    impl TempDir {
        fn new(label: &str) -> Self {
            let stamp = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .expect("time")
                .as_nanos();
            let path = std::env::temp_dir().join(format!(
                "pm-persistence-{label}-{}-{stamp}",
                std::process::id()
            ));
            fs::create_dir_all(&path).expect("create temp dir");
            Self { path }
        }
    }

    impl Drop for TempDir {
        fn drop(&mut self) {
            let _ = fs::remove_dir_all(&self.path);
        }
    }

    #[test]
    fn missing_documents_load_as_empty_store() {
        let dir = TempDir::new("missing");
        let store = YamlDocumentStore::in_directory(dir.path.join("absent"))
            .load()
            .expect("load");
        assert_eq!(store, Store::new());
    }

    #[test]
    fn empty_and_null_documents_load_as_empty_store() {
        let dir = TempDir::new("empty");
        fs::write(dir.path.join(DEFAULT_PROJECTS_FILE), "").expect("write projects");
        fs::write(dir.path.join(DEFAULT_CONTEXTS_FILE), "~\n").expect("write contexts");

        let store = YamlDocumentStore::in_directory(&dir.path)
            .load()
            .expect("load");
        assert_eq!(store, Store::new());
    }

    #[test]
    fn null_records_load_with_defaults() {
        let dir = TempDir::new("nulls");
        fs::write(
            dir.path.join(DEFAULT_PROJECTS_FILE),
            "alpha:\nbeta:\n  links:\n    lang: [rust, rust]\n  quick_note: soon\n",
        )
        .expect("write projects");
        fs::write(
            dir.path.join(DEFAULT_CONTEXTS_FILE),
            "editor:\nlang:\n  rust:\n  go:\n    quick_note: old\n",
        )
        .expect("write contexts");

        let store = YamlDocumentStore::in_directory(&dir.path)
            .load()
            .expect("load");
        assert_eq!(store.project("alpha"), Some(&Project::default()));
        assert_eq!(store.project("beta").expect("beta").links["lang"], vec!["rust", "rust"]);
        assert_eq!(store.project("beta").expect("beta").note(), Some("soon"));
        assert!(store.registry()["editor"].is_empty());
        assert!(store.is_registered("lang", "rust"));
        assert_eq!(store.context_note("lang", "go"), Some("old"));
    }

    #[test]
    fn corrupt_document_is_a_persistence_error() {
        let dir = TempDir::new("corrupt");
        fs::write(dir.path.join(DEFAULT_PROJECTS_FILE), "alpha: [unclosed").expect("write");

        let err = YamlDocumentStore::in_directory(&dir.path)
            .load()
            .expect_err("corrupt yaml");
        assert!(matches!(err, CoreError::Persistence(_)));
    }

    #[test]
    fn dump_then_load_reproduces_the_store() {
        let dir = TempDir::new("round-trip");
        let documents = YamlDocumentStore::in_directory(dir.path.join("data"));

        let mut store = Store::new();
        store.add_project("alpha").expect("alpha");
        store.add_project("beta").expect("beta");
        store.link("alpha", "lang", "rust").expect("link");
        store.link("alpha", "lang", "rust").expect("duplicate link");
        store
            .add_resource("alpha", "code", Resource::new(ResourceKind::Svn, "svn://host/alpha"))
            .expect("resource");
        store.set_project_note("beta", "on hold").expect("note");
        store.add_category("editor");
        store.add_context("lang", "go");
        store.set_context_note("lang", "go", "retired").expect("note");

        documents.dump(&store).expect("dump");
        assert!(!temp_path(documents.projects_path()).exists());
        assert!(!temp_path(documents.contexts_path()).exists());

        let reloaded = documents.load().expect("reload");
        assert_eq!(reloaded, store);
    }

    #[test]
    fn failed_second_rename_restores_projects_and_leaves_no_temp_files() {
        let dir = TempDir::new("half-dump");
        let projects_path = dir.path.join(DEFAULT_PROJECTS_FILE);
        let contexts_path = dir.path.join(DEFAULT_CONTEXTS_FILE);
        fs::write(&projects_path, "old: {}\n").expect("seed projects");
        // A non-empty directory where the contexts file belongs cannot be
        // replaced by a rename.
        fs::create_dir_all(contexts_path.join("occupied")).expect("block contexts");
        let documents = YamlDocumentStore::new(&projects_path, &contexts_path);

        let mut store = Store::new();
        store.add_project("alpha").expect("alpha");
        store.add_context("lang", "rust");

        let err = documents.dump(&store).expect_err("contexts rename fails");
        assert!(matches!(err, CoreError::Persistence(_)));
        assert_eq!(
            fs::read_to_string(&projects_path).expect("projects"),
            "old: {}\n"
        );
        assert!(!temp_path(&projects_path).exists());
        assert!(!temp_path(&contexts_path).exists());
    }
}
