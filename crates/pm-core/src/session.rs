use crate::capabilities::{Capabilities, DocumentStore};
use crate::commands::{Command, CommandRegistry};
use crate::projection::{render_body, render_head};
use crate::view::{GroupingTarget, Overlay, ViewMode, ViewState};
use crate::{CoreError, FilterSet, Resource, Store};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutcome {
    pub status: String,
    pub exit_requested: bool,
}

impl CommandOutcome {
    fn status(message: impl Into<String>) -> Self {
        Self {
            status: message.into(),
            exit_requested: false,
        }
    }

    fn exit() -> Self {
        Self {
            status: "bye".to_owned(),
            exit_requested: true,
        }
    }
}

/// One interactive session: the store, the filter, the view state and the
/// collaborators. Commands either apply completely or leave all of it as it
/// was.
pub struct Session {
    store: Store,
    filter: FilterSet,
    view: ViewState,
    dirty: bool,
    registry: CommandRegistry,
    help: Vec<String>,
    documents: Box<dyn DocumentStore>,
    capabilities: Capabilities,
}

impl Session {
    pub fn new(
        store: Store,
        documents: Box<dyn DocumentStore>,
        capabilities: Capabilities,
        view: ViewState,
    ) -> Self {
        let registry = CommandRegistry::default();
        let help = registry.help_lines();
        Self {
            store,
            filter: FilterSet::new(),
            view,
            dirty: false,
            registry,
            help,
            documents,
            capabilities,
        }
    }

    /// Loads the store through `documents` and starts a session on it.
    pub fn load(
        documents: Box<dyn DocumentStore>,
        capabilities: Capabilities,
        view: ViewState,
    ) -> Result<Self, CoreError> {
        let store = documents.load()?;
        Ok(Self::new(store, documents, capabilities, view))
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn filter(&self) -> &FilterSet {
        &self.filter
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.dirty
    }

    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    pub fn parse(&self, line: &str) -> Result<Command, CoreError> {
        self.registry.parse_line(line)
    }

    /// Decodes and applies one prompt submission.
    pub fn execute(&mut self, line: &str) -> Result<CommandOutcome, CoreError> {
        let command = self.parse(line)?;
        self.apply(command)
    }

    pub fn apply(&mut self, command: Command) -> Result<CommandOutcome, CoreError> {
        let name = command.name();
        let result = self.dispatch(command);
        match &result {
            Ok(outcome) => {
                tracing::info!(command = name, status = %outcome.status, "command applied");
            }
            Err(error) => {
                tracing::warn!(command = name, error = %error, "command rejected");
            }
        }
        result
    }

    pub fn scroll(&mut self, delta: isize) {
        self.view.scroll_active(delta);
    }

    pub fn scroll_to_top(&mut self) {
        self.view.scroll.reset(self.view.overlay);
    }

    pub fn toggle_overlay(&mut self, overlay: Overlay) {
        self.view.toggle_overlay(overlay);
    }

    pub fn head_text(&self) -> String {
        render_head(&self.view, &self.filter, self.dirty)
    }

    pub fn body_text(&self) -> String {
        render_body(
            &self.store,
            &self.filter,
            &self.view,
            &self.capabilities,
            &self.help,
        )
    }

    fn dispatch(&mut self, command: Command) -> Result<CommandOutcome, CoreError> {
        match command {
            Command::Open { project } => {
                if !self.store.contains_project(&project) {
                    return Err(CoreError::PreconditionViolation(format!(
                        "cannot open unknown project '{project}'"
                    )));
                }
                let status = format!("opened {project}");
                self.view.set_mode(ViewMode::Open(project));
                Ok(CommandOutcome::status(status))
            }
            Command::Group { target } => {
                if let GroupingTarget::Category(category) = &target {
                    if !self.store.has_category(category) {
                        return Err(CoreError::PreconditionViolation(format!(
                            "cannot group by unknown category '{category}'"
                        )));
                    }
                }
                let status = format!("grouped by {}", target.label());
                self.view.set_mode(ViewMode::Grouped(target));
                Ok(CommandOutcome::status(status))
            }
            Command::Filter { category, context } => {
                let active = self.filter.toggle(&category, &context);
                self.view.scroll.reset(Overlay::Main);
                let verb = if active { "added" } else { "removed" };
                Ok(CommandOutcome::status(format!(
                    "filter {category}:{context} {verb}"
                )))
            }
            Command::FilterRemove => {
                self.filter.clear();
                self.view.scroll.reset(Overlay::Main);
                Ok(CommandOutcome::status("filters cleared"))
            }
            Command::Create { project } => {
                self.store.add_project(&project)?;
                self.mutated(format!("created {project}"))
            }
            Command::Delete { project } => {
                self.store.remove_project(&project)?;
                if self.view.mode.open_project() == Some(project.as_str()) {
                    self.view.set_mode(ViewMode::default());
                }
                self.fall_back_from_vanished_grouping();
                self.mutated(format!("deleted {project}"))
            }
            Command::Link {
                project,
                category,
                context,
            } => {
                self.store.link(&project, &category, &context)?;
                self.mutated(format!("linked {project} to {category}:{context}"))
            }
            Command::Unlink {
                project,
                category,
                context,
            } => {
                self.store.unlink(&project, &category, &context)?;
                self.fall_back_from_vanished_grouping();
                self.mutated(format!("unlinked {project} from {category}:{context}"))
            }
            Command::ContextCreate { category, context } => {
                self.store.add_context(&category, &context);
                self.mutated(format!("registered {category}:{context}"))
            }
            Command::ContextDelete { category, context } => {
                self.store.remove_context(&category, &context)?;
                self.mutated(format!("unregistered {category}:{context}"))
            }
            Command::CategoryCreate { category } => {
                self.store.add_category(&category);
                self.mutated(format!("registered category {category}"))
            }
            Command::CategoryDelete { category } => {
                self.store.remove_category(&category);
                self.fall_back_from_vanished_grouping();
                self.mutated(format!("unregistered category {category}"))
            }
            Command::QuickNote { project, text } => {
                self.store.set_project_note(&project, &text)?;
                self.mutated(format!("quick note set on {project}"))
            }
            Command::QuickNoteDelete { project } => {
                self.store.set_project_note(&project, "")?;
                self.mutated(format!("quick note cleared on {project}"))
            }
            Command::ContextQuickNote {
                category,
                context,
                text,
            } => {
                self.store.set_context_note(&category, &context, &text)?;
                self.mutated(format!("quick note set on {category}:{context}"))
            }
            Command::ContextQuickNoteDelete { category, context } => {
                self.store.set_context_note(&category, &context, "")?;
                self.mutated(format!("quick note cleared on {category}:{context}"))
            }
            Command::ResourceCreate {
                project,
                resource,
                kind,
                source,
            } => {
                let project = self.resolve_project(project)?;
                self.store
                    .add_resource(&project, &resource, Resource::new(kind, source))?;
                self.mutated(format!("added {kind} resource {resource} to {project}"))
            }
            Command::ResourceDelete { project, resource } => {
                let project = self.resolve_project(project)?;
                self.store.remove_resource(&project, &resource)?;
                self.mutated(format!("removed resource {resource} from {project}"))
            }
            Command::Resource {
                project,
                resource,
                action,
            } => {
                let project = self.resolve_project(project)?;
                let record = self
                    .store
                    .project(&project)
                    .and_then(|record| record.resources.get(&resource))
                    .ok_or_else(|| {
                        CoreError::not_found("resource", format!("{project}/{resource}"))
                    })?;
                self.capabilities
                    .resources
                    .fetch(&project, &resource, record, action)?;
                Ok(CommandOutcome::status(format!(
                    "{} started for {project}/{resource}",
                    action.label()
                )))
            }
            Command::ShowResources => {
                self.view.show_resources = !self.view.show_resources;
                let state = if self.view.show_resources { "shown" } else { "hidden" };
                Ok(CommandOutcome::status(format!("resources {state}")))
            }
            Command::Reload => {
                self.store = self.documents.load()?;
                self.dirty = false;
                self.fall_back_from_vanished_open_project();
                self.fall_back_from_vanished_grouping();
                Ok(CommandOutcome::status("reloaded data files"))
            }
            Command::Dump => {
                self.dump()?;
                Ok(CommandOutcome::status("saved"))
            }
            Command::Note { project } => {
                let project = self.resolve_project(project)?;
                self.ensure_project(&project)?;
                self.capabilities.notes.edit_project_note(&project)?;
                Ok(CommandOutcome::status(format!("edited note for {project}")))
            }
            Command::ContextNote { category, context } => {
                if !self.store.contexts(&category).contains(&context) {
                    return Err(CoreError::not_found(
                        "context",
                        format!("{category}/{context}"),
                    ));
                }
                self.capabilities
                    .notes
                    .edit_context_note(&category, &context)?;
                Ok(CommandOutcome::status(format!(
                    "edited note for {category}:{context}"
                )))
            }
            Command::Code { project } => {
                let project = self.resolve_project(project)?;
                self.ensure_project(&project)?;
                self.capabilities.workspace.open_code(&project)?;
                Ok(CommandOutcome::status(format!("launched code for {project}")))
            }
            // The dump stands even when the commit fails.
            Command::Backup => {
                self.dump()?;
                match self.capabilities.workspace.backup() {
                    Ok(()) => Ok(CommandOutcome::status("saved and backed up")),
                    Err(error) => {
                        tracing::warn!(error = %error, "backup failed after dump");
                        Ok(CommandOutcome::status(format!("saved; backup failed: {error}")))
                    }
                }
            }
            Command::Help => {
                self.view.toggle_overlay(Overlay::Help);
                Ok(CommandOutcome::status(format!("view: {}", self.view.overlay.label())))
            }
            Command::Catalog => {
                self.view.toggle_overlay(Overlay::Catalog);
                Ok(CommandOutcome::status(format!("view: {}", self.view.overlay.label())))
            }
            Command::Quit => Ok(CommandOutcome::exit()),
        }
    }

    fn mutated(&mut self, status: String) -> Result<CommandOutcome, CoreError> {
        self.dirty = true;
        Ok(CommandOutcome::status(status))
    }

    fn dump(&mut self) -> Result<(), CoreError> {
        self.documents.dump(&self.store)?;
        self.dirty = false;
        Ok(())
    }

    /// An omitted project argument means the opened project.
    fn resolve_project(&self, project: Option<String>) -> Result<String, CoreError> {
        match project {
            Some(project) => Ok(project),
            None => self
                .view
                .mode
                .open_project()
                .map(ToOwned::to_owned)
                .ok_or_else(|| {
                    CoreError::PreconditionViolation(
                        "no project given and no project is open".to_owned(),
                    )
                }),
        }
    }

    fn ensure_project(&self, project: &str) -> Result<(), CoreError> {
        if self.store.contains_project(project) {
            Ok(())
        } else {
            Err(CoreError::not_found("project", project))
        }
    }

    fn fall_back_from_vanished_open_project(&mut self) {
        if let Some(project) = self.view.mode.open_project() {
            if !self.store.contains_project(project) {
                self.view.set_mode(ViewMode::default());
            }
        }
    }

    fn fall_back_from_vanished_grouping(&mut self) {
        if let ViewMode::Grouped(GroupingTarget::Category(category)) = &self.view.mode {
            if !self.store.has_category(category) {
                self.view.set_mode(ViewMode::default());
            }
        }
    }
}
