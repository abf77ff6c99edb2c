use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use pm_core::{CoreError, NoteEditor};

use crate::runner::{CommandRunner, Tool};

const NOTE_EXTENSION: &str = "md";
const CONTEXT_NOTES_DIR: &str = "contexts";

/// Long-form notes kept as markdown files and edited with the configured
/// editor: `<notes>/<project>.md` and `<notes>/contexts/<category>/<context>.md`.
pub struct EditorNoteEditor<R: CommandRunner> {
    runner: R,
    editor: Tool,
    notes_dir: PathBuf,
}

impl<R: CommandRunner> EditorNoteEditor<R> {
    pub fn new(runner: R, editor: &str, notes_dir: impl Into<PathBuf>) -> Result<Self, CoreError> {
        Ok(Self {
            runner,
            editor: Tool::parse("editor", editor)?,
            notes_dir: notes_dir.into(),
        })
    }

    pub fn project_note_path(&self, project: &str) -> Result<PathBuf, CoreError> {
        Ok(self
            .notes_dir
            .join(format!("{}.{NOTE_EXTENSION}", path_component(project)?)))
    }

    pub fn context_note_path(&self, category: &str, context: &str) -> Result<PathBuf, CoreError> {
        Ok(self
            .notes_dir
            .join(CONTEXT_NOTES_DIR)
            .join(path_component(category)?)
            .join(format!("{}.{NOTE_EXTENSION}", path_component(context)?)))
    }

    fn edit(&self, path: &Path) -> Result<(), CoreError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|error| {
                CoreError::Persistence(format!(
                    "failed to create notes directory {}: {error}",
                    parent.display()
                ))
            })?;
        }
        self.editor
            .run_interactive(&self.runner, vec![OsString::from(path)])
    }
}

impl<R: CommandRunner> NoteEditor for EditorNoteEditor<R> {
    fn edit_project_note(&self, project: &str) -> Result<(), CoreError> {
        let path = self.project_note_path(project)?;
        self.edit(&path)
    }

    fn edit_context_note(&self, category: &str, context: &str) -> Result<(), CoreError> {
        let path = self.context_note_path(category, context)?;
        self.edit(&path)
    }

    fn has_note_file(&self, project: &str) -> bool {
        self.project_note_path(project)
            .map(|path| path.is_file())
            .unwrap_or(false)
    }
}

/// Store keys become file names, so they must not walk out of the directory.
pub(crate) fn path_component(name: &str) -> Result<&str, CoreError> {
    if name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\'])
    {
        return Err(CoreError::PreconditionViolation(format!(
            "'{name}' cannot be used as a file name"
        )));
    }
    Ok(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::test_support::*;

    #[test]
    fn project_note_opens_markdown_file_in_editor() {
        let dir = TempDir::new("project-note");
        let notes = EditorNoteEditor::new(
            StubRunner::with_results(vec![Ok(success_output())]),
            "nvim -n",
            dir.path.join("notes"),
        )
        .expect("editor");

        notes.edit_project_note("alpha").expect("edit");

        let expected = dir.path.join("notes").join("alpha.md");
        assert_eq!(
            notes.runner.recorded(),
            vec![(
                CallKind::Interactive,
                "nvim".to_owned(),
                vec!["-n".to_owned(), expected.to_string_lossy().to_string()],
            )]
        );
        assert!(dir.path.join("notes").is_dir());
    }

    #[test]
    fn context_note_lives_under_category_directory() {
        let dir = TempDir::new("context-note");
        let notes = EditorNoteEditor::new(
            StubRunner::with_results(vec![Ok(success_output())]),
            "vi",
            &dir.path,
        )
        .expect("editor");

        notes.edit_context_note("lang", "rust").expect("edit");

        assert!(dir.path.join("contexts").join("lang").is_dir());
        let calls = notes.runner.recorded();
        assert!(calls[0].2[0].ends_with("rust.md"));
    }

    #[test]
    fn has_note_file_reflects_disk() {
        let dir = TempDir::new("note-file");
        let notes =
            EditorNoteEditor::new(StubRunner::with_results(Vec::new()), "vi", &dir.path)
                .expect("editor");
        assert!(!notes.has_note_file("alpha"));

        fs::write(dir.path.join("alpha.md"), "# alpha\n").expect("write note");
        assert!(notes.has_note_file("alpha"));
        assert!(!notes.has_note_file("../alpha"));
    }

    #[test]
    fn names_that_escape_the_notes_directory_are_rejected() {
        let notes = EditorNoteEditor::new(StubRunner::with_results(Vec::new()), "vi", "/tmp")
            .expect("editor");
        assert!(matches!(
            notes.edit_project_note(".."),
            Err(CoreError::PreconditionViolation(_))
        ));
        assert!(notes.runner.recorded().is_empty());
    }
}
