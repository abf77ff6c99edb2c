//! Capability implementations that shell out to the tools named in the pm
//! config.

mod notes;
mod resources;
mod runner;
mod workspace;

pub use notes::EditorNoteEditor;
pub use resources::VcsResourceFetcher;
pub use runner::{CommandRunner, ProcessCommandRunner};
pub use workspace::ShellWorkspaceLauncher;
