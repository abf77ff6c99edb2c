//! Seams to the outside world. The session calls these instead of spawning
//! processes or touching the filesystem itself.

use crate::{CoreError, Resource, Store};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceAction {
    Clone,
    Update,
    Open,
}

impl ResourceAction {
    pub fn parse(raw: &str) -> Result<Self, CoreError> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "clone" | "checkout" => Ok(Self::Clone),
            "update" | "pull" => Ok(Self::Update),
            "open" => Ok(Self::Open),
            other => Err(CoreError::invalid_command(
                "resource",
                format!("unknown action '{other}'; expected clone, update or open"),
            )),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Clone => "clone",
            Self::Update => "update",
            Self::Open => "open",
        }
    }
}

pub trait NoteEditor {
    fn edit_project_note(&self, project: &str) -> Result<(), CoreError>;
    fn edit_context_note(&self, category: &str, context: &str) -> Result<(), CoreError>;
    fn has_note_file(&self, project: &str) -> bool;
}

pub trait ResourceFetcher {
    fn fetch(
        &self,
        project: &str,
        name: &str,
        resource: &Resource,
        action: ResourceAction,
    ) -> Result<(), CoreError>;
    fn is_cloned(&self, project: &str, name: &str) -> bool;
}

pub trait WorkspaceLauncher {
    fn open_code(&self, project: &str) -> Result<(), CoreError>;
    fn backup(&self) -> Result<(), CoreError>;
}

/// Wholesale load/dump of the two data documents.
pub trait DocumentStore {
    fn load(&self) -> Result<Store, CoreError>;
    fn dump(&self, store: &Store) -> Result<(), CoreError>;
}

/// Local facts the projector shows but does not own.
pub trait LocalStateLookup {
    fn has_note_file(&self, project: &str) -> bool;
    fn is_cloned(&self, project: &str, resource: &str) -> bool;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoLocalState;

impl LocalStateLookup for NoLocalState {
    fn has_note_file(&self, _project: &str) -> bool {
        false
    }

    fn is_cloned(&self, _project: &str, _resource: &str) -> bool {
        false
    }
}

/// Collaborators injected into a session.
pub struct Capabilities {
    pub notes: Box<dyn NoteEditor>,
    pub resources: Box<dyn ResourceFetcher>,
    pub workspace: Box<dyn WorkspaceLauncher>,
}

impl Capabilities {
    /// Collaborators that do nothing; useful when no external tools are wanted.
    pub fn inert() -> Self {
        Self {
            notes: Box::new(Inert),
            resources: Box::new(Inert),
            workspace: Box::new(Inert),
        }
    }
}

impl LocalStateLookup for Capabilities {
    fn has_note_file(&self, project: &str) -> bool {
        self.notes.has_note_file(project)
    }

    fn is_cloned(&self, project: &str, resource: &str) -> bool {
        self.resources.is_cloned(project, resource)
    }
}

struct Inert;

impl NoteEditor for Inert {
    fn edit_project_note(&self, _project: &str) -> Result<(), CoreError> {
        Ok(())
    }

    fn edit_context_note(&self, _category: &str, _context: &str) -> Result<(), CoreError> {
        Ok(())
    }

    fn has_note_file(&self, _project: &str) -> bool {
        false
    }
}

impl ResourceFetcher for Inert {
    fn fetch(
        &self,
        _project: &str,
        _name: &str,
        _resource: &Resource,
        _action: ResourceAction,
    ) -> Result<(), CoreError> {
        Ok(())
    }

    fn is_cloned(&self, _project: &str, _name: &str) -> bool {
        false
    }
}

impl WorkspaceLauncher for Inert {
    fn open_code(&self, _project: &str) -> Result<(), CoreError> {
        Ok(())
    }

    fn backup(&self) -> Result<(), CoreError> {
        Ok(())
    }
}
