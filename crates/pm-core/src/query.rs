use std::collections::BTreeSet;

use crate::model::{ContextRegistry, Project};
use crate::{CoreError, Store};

impl Store {
    pub fn project(&self, name: &str) -> Option<&Project> {
        self.projects.get(name)
    }

    pub fn contains_project(&self, name: &str) -> bool {
        self.projects.contains_key(name)
    }

    /// Projects in store iteration order (ascending by name).
    pub fn projects(&self) -> impl Iterator<Item = (&str, &Project)> {
        self.projects
            .iter()
            .map(|(name, project)| (name.as_str(), project))
    }

    pub fn registry(&self) -> &ContextRegistry {
        &self.registry
    }

    /// Sorted union of registered categories and every category a project
    /// links into.
    pub fn categories(&self) -> Vec<String> {
        let mut categories = self.registry.keys().cloned().collect::<BTreeSet<_>>();
        for project in self.projects.values() {
            categories.extend(project.links.keys().cloned());
        }
        categories.into_iter().collect()
    }

    pub fn has_category(&self, category: &str) -> bool {
        self.registry.contains_key(category)
            || self
                .projects
                .values()
                .any(|project| project.links.contains_key(category))
    }

    /// Sorted union of contexts registered under `category` and contexts
    /// linked by any project.
    pub fn contexts(&self, category: &str) -> Vec<String> {
        let mut contexts = self
            .registry
            .get(category)
            .map(|registered| registered.keys().cloned().collect::<BTreeSet<_>>())
            .unwrap_or_default();
        for project in self.projects.values() {
            if let Some(linked) = project.links.get(category) {
                contexts.extend(linked.iter().cloned());
            }
        }
        contexts.into_iter().collect()
    }

    pub fn has_context(&self, project: &str, category: &str, context: &str) -> bool {
        self.projects
            .get(project)
            .is_some_and(|record| record.has_context(category, context))
    }

    pub fn has_no_context_in(&self, project: &str, category: &str) -> bool {
        self.projects
            .get(project)
            .map_or(true, |record| record.has_no_context_in(category))
    }

    pub fn is_registered(&self, category: &str, context: &str) -> bool {
        self.registry
            .get(category)
            .is_some_and(|contexts| contexts.contains_key(context))
    }

    pub fn context_note(&self, category: &str, context: &str) -> Option<&str> {
        self.registry
            .get(category)
            .and_then(|contexts| contexts.get(context))
            .and_then(|record| record.note())
    }

    pub fn resources_of(&self, project: &str) -> Result<Vec<String>, CoreError> {
        self.projects
            .get(project)
            .map(|record| record.resources.keys().cloned().collect())
            .ok_or_else(|| CoreError::not_found("project", project))
    }
}
