use std::collections::BTreeMap;

use crate::model::{normalize_note, ContextRecord, ContextRegistry, Project, Resource};
use crate::CoreError;

/// Canonical in-memory collections. Every mutation validates before it
/// touches state, so a failed call leaves the store unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Store {
    pub(crate) projects: BTreeMap<String, Project>,
    pub(crate) registry: ContextRegistry,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_parts(projects: BTreeMap<String, Project>, registry: ContextRegistry) -> Self {
        Self { projects, registry }
    }

    pub fn add_project(&mut self, name: &str) -> Result<(), CoreError> {
        if self.projects.contains_key(name) {
            return Err(CoreError::duplicate("project", name));
        }
        self.projects.insert(name.to_owned(), Project::default());
        Ok(())
    }

    pub fn remove_project(&mut self, name: &str) -> Result<(), CoreError> {
        self.projects
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| CoreError::not_found("project", name))
    }

    pub fn add_category(&mut self, category: &str) {
        self.registry.entry(category.to_owned()).or_default();
    }

    /// Drops the registered contexts of `category`. Project links into the
    /// category survive and render as unresolved.
    pub fn remove_category(&mut self, category: &str) {
        self.registry.remove(category);
    }

    pub fn add_context(&mut self, category: &str, context: &str) {
        self.registry
            .entry(category.to_owned())
            .or_default()
            .entry(context.to_owned())
            .or_default();
    }

    pub fn remove_context(&mut self, category: &str, context: &str) -> Result<(), CoreError> {
        let contexts = self
            .registry
            .get_mut(category)
            .ok_or_else(|| CoreError::not_found("category", category))?;
        contexts
            .remove(context)
            .map(|_| ())
            .ok_or_else(|| CoreError::not_found("context", format!("{category}/{context}")))
    }

    /// Appends `context` under `category` without deduplicating.
    pub fn link(&mut self, project: &str, category: &str, context: &str) -> Result<(), CoreError> {
        let record = self.project_mut(project)?;
        record
            .links
            .entry(category.to_owned())
            .or_default()
            .push(context.to_owned());
        Ok(())
    }

    /// Removes one occurrence of `context`; an emptied bucket is dropped so
    /// `has_no_context_in` stays accurate.
    pub fn unlink(&mut self, project: &str, category: &str, context: &str) -> Result<(), CoreError> {
        let record = self.project_mut(project)?;
        let bucket = record
            .links
            .get_mut(category)
            .ok_or_else(|| CoreError::not_found("link category", format!("{project}/{category}")))?;
        let position = bucket
            .iter()
            .position(|linked| linked == context)
            .ok_or_else(|| {
                CoreError::not_found("link", format!("{project}/{category}/{context}"))
            })?;
        bucket.remove(position);
        if bucket.is_empty() {
            record.links.remove(category);
        }
        Ok(())
    }

    pub fn add_resource(
        &mut self,
        project: &str,
        name: &str,
        resource: Resource,
    ) -> Result<(), CoreError> {
        let record = self.project_mut(project)?;
        if record.resources.contains_key(name) {
            return Err(CoreError::duplicate("resource", format!("{project}/{name}")));
        }
        record.resources.insert(name.to_owned(), resource);
        Ok(())
    }

    pub fn remove_resource(&mut self, project: &str, name: &str) -> Result<(), CoreError> {
        let record = self.project_mut(project)?;
        record
            .resources
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| CoreError::not_found("resource", format!("{project}/{name}")))
    }

    /// Overwrites the quick note; empty text clears it.
    pub fn set_project_note(&mut self, project: &str, text: &str) -> Result<(), CoreError> {
        let record = self.project_mut(project)?;
        record.quick_note = normalize_note(text);
        Ok(())
    }

    /// Overwrites the quick note of a registered context; empty text clears it.
    pub fn set_context_note(
        &mut self,
        category: &str,
        context: &str,
        text: &str,
    ) -> Result<(), CoreError> {
        let record = self.context_record_mut(category, context)?;
        record.quick_note = normalize_note(text);
        Ok(())
    }

    fn project_mut(&mut self, name: &str) -> Result<&mut Project, CoreError> {
        self.projects
            .get_mut(name)
            .ok_or_else(|| CoreError::not_found("project", name))
    }

    fn context_record_mut(
        &mut self,
        category: &str,
        context: &str,
    ) -> Result<&mut ContextRecord, CoreError> {
        self.registry
            .get_mut(category)
            .ok_or_else(|| CoreError::not_found("category", category))?
            .get_mut(context)
            .ok_or_else(|| CoreError::not_found("context", format!("{category}/{context}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ResourceKind;

    fn store_with_project(name: &str) -> Store {
        let mut store = Store::new();
        store.add_project(name).expect("add project");
        store
    }

    #[test]
    fn add_project_rejects_duplicates_without_touching_existing_record() {
        let mut store = store_with_project("alpha");
        store.set_project_note("alpha", "keep me").expect("note");

        let err = store.add_project("alpha").expect_err("duplicate");
        assert!(matches!(err, CoreError::DuplicateKey { kind: "project", .. }));
        assert_eq!(store.projects["alpha"].note(), Some("keep me"));
    }

    #[test]
    fn remove_project_leaves_registry_untouched() {
        let mut store = store_with_project("alpha");
        store.add_context("lang", "rust");
        store.link("alpha", "lang", "rust").expect("link");

        store.remove_project("alpha").expect("remove");
        assert!(store.projects.is_empty());
        assert!(store.registry["lang"].contains_key("rust"));

        let err = store.remove_project("alpha").expect_err("already removed");
        assert!(matches!(err, CoreError::NotFound { .. }));
    }

    #[test]
    fn category_create_and_delete_are_idempotent() {
        let mut store = Store::new();
        store.add_category("lang");
        store.add_category("lang");
        assert_eq!(store.registry.len(), 1);
        assert!(store.registry["lang"].is_empty());

        store.remove_category("lang");
        store.remove_category("lang");
        assert!(store.registry.is_empty());
    }

    #[test]
    fn add_context_creates_category_and_keeps_existing_note() {
        let mut store = Store::new();
        store.add_context("lang", "rust");
        store
            .set_context_note("lang", "rust", "systems")
            .expect("note");
        store.add_context("lang", "rust");

        assert_eq!(store.registry["lang"]["rust"].note(), Some("systems"));
    }

    #[test]
    fn remove_context_reports_missing_category_and_context() {
        let mut store = Store::new();
        let err = store.remove_context("lang", "rust").expect_err("no category");
        assert!(matches!(err, CoreError::NotFound { kind: "category", .. }));

        store.add_category("lang");
        let err = store.remove_context("lang", "rust").expect_err("no context");
        assert!(matches!(err, CoreError::NotFound { kind: "context", .. }));
    }

    #[test]
    fn link_appends_duplicates_and_unlink_removes_one_occurrence() {
        let mut store = store_with_project("alpha");
        store.link("alpha", "lang", "rust").expect("link");
        store.link("alpha", "lang", "rust").expect("link again");
        assert_eq!(store.projects["alpha"].links["lang"], vec!["rust", "rust"]);

        store.unlink("alpha", "lang", "rust").expect("unlink");
        assert_eq!(store.projects["alpha"].links["lang"], vec!["rust"]);
        assert!(store.projects["alpha"].has_context("lang", "rust"));
    }

    #[test]
    fn unlink_of_sole_occupant_drops_bucket() {
        let mut store = store_with_project("alpha");
        store.link("alpha", "lang", "rust").expect("link");
        store.unlink("alpha", "lang", "rust").expect("unlink");

        assert!(!store.projects["alpha"].links.contains_key("lang"));
        assert!(store.projects["alpha"].has_no_context_in("lang"));
    }

    #[test]
    fn unlink_validates_every_level() {
        let mut store = store_with_project("alpha");
        assert!(store.unlink("beta", "lang", "rust").is_err());
        assert!(store.unlink("alpha", "lang", "rust").is_err());
        store.link("alpha", "lang", "go").expect("link");
        let err = store.unlink("alpha", "lang", "rust").expect_err("missing context");
        assert!(matches!(err, CoreError::NotFound { kind: "link", .. }));
        assert_eq!(store.projects["alpha"].links["lang"], vec!["go"]);
    }

    #[test]
    fn resources_are_unique_per_project() {
        let mut store = store_with_project("alpha");
        store
            .add_resource("alpha", "origin", Resource::new(ResourceKind::Git, "git@host:a.git"))
            .expect("add resource");
        let err = store
            .add_resource("alpha", "origin", Resource::new(ResourceKind::Link, "https://a"))
            .expect_err("duplicate resource");
        assert!(matches!(err, CoreError::DuplicateKey { kind: "resource", .. }));
        assert_eq!(store.projects["alpha"].resources["origin"].kind, ResourceKind::Git);

        store.remove_resource("alpha", "origin").expect("remove");
        let err = store.remove_resource("alpha", "origin").expect_err("gone");
        assert!(matches!(err, CoreError::NotFound { kind: "resource", .. }));
    }

    #[test]
    fn empty_note_text_clears_notes() {
        let mut store = store_with_project("alpha");
        store.set_project_note("alpha", "draft").expect("note");
        store.set_project_note("alpha", "").expect("clear");
        assert_eq!(store.projects["alpha"].quick_note, None);

        let err = store
            .set_context_note("lang", "rust", "x")
            .expect_err("unregistered context");
        assert!(matches!(err, CoreError::NotFound { .. }));
    }
}
