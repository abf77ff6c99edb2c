pub mod capabilities;
pub mod commands;
pub mod error;
pub mod filter;
pub mod model;
pub mod persistence;
pub mod projection;
mod query;
pub mod session;
pub mod store;
pub mod view;

pub use capabilities::{
    Capabilities, DocumentStore, LocalStateLookup, NoLocalState, NoteEditor, ResourceAction,
    ResourceFetcher, WorkspaceLauncher,
};
pub use commands::{names, Arity, Command, CommandMetadata, CommandRegistry};
pub use error::CoreError;
pub use filter::{FilterConstraint, FilterSet};
pub use model::{ContextRecord, ContextRegistry, Project, Resource, ResourceKind};
pub use persistence::{YamlDocumentStore, DEFAULT_CONTEXTS_FILE, DEFAULT_PROJECTS_FILE};
pub use session::{CommandOutcome, Session};
pub use store::Store;
pub use view::{GroupingTarget, Overlay, ScrollCursors, ViewMode, ViewState};
