//! Pure derivations from session state to display text.

use crate::capabilities::LocalStateLookup;
use crate::view::{GroupingTarget, Overlay, ViewMode, ViewState};
use crate::{FilterSet, Project, Store};

pub const UNRESOLVED_MARKER: &str = " (?)";
pub const NOTE_MARKER: &str = " *";
pub const NOTE_FILE_MARKER: &str = " [+]";
pub const CLONED_MARKER: &str = " (local)";
pub const UNGROUPED_HEADER: &str = "(Ungrouped)";
pub const NO_RESOURCES_PLACEHOLDER: &str = "  (no resources)";

const GROUPED_INDENT: &str = "  ";

/// Drops the lines before `offset`. Offsets past the end yield nothing.
pub fn scroll_lines(lines: Vec<String>, offset: usize) -> Vec<String> {
    lines.into_iter().skip(offset).collect()
}

pub fn project_display_line(name: &str, project: &Project, local: &dyn LocalStateLookup) -> String {
    let mut line = name.to_owned();
    if local.has_note_file(name) {
        line.push_str(NOTE_FILE_MARKER);
    }
    if let Some(note) = project.note() {
        line.push_str(" - ");
        line.push_str(note);
    }
    line
}

/// A context label carrying the unresolved and note markers plus the note.
pub fn context_label(store: &Store, category: &str, context: &str) -> String {
    let mut line = context.to_owned();
    if !store.is_registered(category, context) {
        line.push_str(UNRESOLVED_MARKER);
    }
    if let Some(note) = store.context_note(category, context) {
        line.push_str(NOTE_MARKER);
        line.push_str("  ");
        line.push_str(note);
    }
    line
}

pub fn catalog_lines(store: &Store) -> Vec<String> {
    let mut lines = Vec::new();
    for category in store.categories() {
        lines.push(format!("[{category}]"));
        for context in store.contexts(&category) {
            lines.push(format!("  {}", context_label(store, &category, &context)));
        }
        lines.push(String::new());
    }
    lines
}

pub fn open_project_lines(store: &Store, name: &str, local: &dyn LocalStateLookup) -> Vec<String> {
    let Some(project) = store.project(name) else {
        return vec![format!("project '{name}' no longer exists")];
    };

    let mut lines = vec![project_display_line(name, project, local)];
    if project.resources.is_empty() {
        lines.push(NO_RESOURCES_PLACEHOLDER.to_owned());
        return lines;
    }
    for (resource_name, resource) in &project.resources {
        let cloned = if local.is_cloned(name, resource_name) {
            CLONED_MARKER
        } else {
            ""
        };
        lines.push(format!(
            "  [{}] {resource_name}{cloned} {}",
            resource.kind, resource.source
        ));
    }
    lines
}

fn push_project_block(
    lines: &mut Vec<String>,
    indent: &str,
    name: &str,
    project: &Project,
    show_resources: bool,
    local: &dyn LocalStateLookup,
) {
    lines.push(format!(
        "{indent}{}",
        project_display_line(name, project, local)
    ));
    if !show_resources {
        return;
    }
    for (resource_name, resource) in &project.resources {
        lines.push(format!(
            "{indent}  - [{}] {resource_name}: {}",
            resource.kind, resource.source
        ));
    }
}

pub fn flat_lines(
    store: &Store,
    filter: &FilterSet,
    show_resources: bool,
    local: &dyn LocalStateLookup,
) -> Vec<String> {
    let mut lines = Vec::new();
    for (name, project) in store.projects().filter(|(_, project)| filter.is_visible(project)) {
        push_project_block(&mut lines, "", name, project, show_resources, local);
    }
    lines
}

/// Groups visible projects under each context of `category`, followed by the
/// projects that carry no context in it. `category` must be known.
pub fn grouped_lines(
    store: &Store,
    filter: &FilterSet,
    category: &str,
    show_resources: bool,
    local: &dyn LocalStateLookup,
) -> Vec<String> {
    let visible = store
        .projects()
        .filter(|(_, project)| filter.is_visible(project))
        .collect::<Vec<_>>();

    let mut lines = Vec::new();
    for context in store.contexts(category) {
        lines.push(context_label(store, category, &context));
        for (name, project) in visible
            .iter()
            .filter(|(_, project)| project.has_context(category, &context))
        {
            push_project_block(&mut lines, GROUPED_INDENT, name, project, show_resources, local);
        }
    }

    lines.push(UNGROUPED_HEADER.to_owned());
    for (name, project) in visible
        .iter()
        .filter(|(_, project)| project.has_no_context_in(category))
    {
        push_project_block(&mut lines, GROUPED_INDENT, name, project, show_resources, local);
    }
    lines
}

/// Main view lines with the main scroll cursor applied. The open-project view
/// ignores scrolling.
pub fn main_lines(
    store: &Store,
    filter: &FilterSet,
    view: &ViewState,
    local: &dyn LocalStateLookup,
) -> Vec<String> {
    let offset = view.scroll.offset(Overlay::Main);
    match &view.mode {
        ViewMode::Open(name) => open_project_lines(store, name, local),
        ViewMode::Grouped(GroupingTarget::All) => scroll_lines(
            flat_lines(store, filter, view.show_resources, local),
            offset,
        ),
        ViewMode::Grouped(GroupingTarget::Category(category)) => scroll_lines(
            grouped_lines(store, filter, category, view.show_resources, local),
            offset,
        ),
    }
}

pub fn body_lines(
    store: &Store,
    filter: &FilterSet,
    view: &ViewState,
    local: &dyn LocalStateLookup,
    help: &[String],
) -> Vec<String> {
    match view.overlay {
        Overlay::Main => main_lines(store, filter, view, local),
        Overlay::Catalog => scroll_lines(catalog_lines(store), view.scroll.offset(Overlay::Catalog)),
        Overlay::Help => scroll_lines(help.to_vec(), view.scroll.offset(Overlay::Help)),
    }
}

pub fn render_body(
    store: &Store,
    filter: &FilterSet,
    view: &ViewState,
    local: &dyn LocalStateLookup,
    help: &[String],
) -> String {
    let lines = body_lines(store, filter, view, local, help);
    tracing::debug!(overlay = view.overlay.label(), lines = lines.len(), "projected body");
    lines.join("\n")
}

pub fn render_head(view: &ViewState, filter: &FilterSet, dirty: bool) -> String {
    let save_status = if dirty { "unsaved changes" } else { "saved" };
    let resources = if view.show_resources { "on" } else { "off" };
    format!(
        "mode: {} | filter: {} | resources: {resources} | {save_status} | view: {}",
        view.mode.label(),
        filter.label(),
        view.overlay.label()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::NoLocalState;
    use crate::{Resource, ResourceKind};

    struct LocalStub;

    impl LocalStateLookup for LocalStub {
        fn has_note_file(&self, project: &str) -> bool {
            project == "alpha"
        }

        fn is_cloned(&self, _project: &str, resource: &str) -> bool {
            resource == "code"
        }
    }

    fn sample_store() -> Store {
        let mut store = Store::new();
        for name in ["alpha", "beta", "gamma"] {
            store.add_project(name).expect("project");
        }
        store.add_context("lang", "rust");
        store.add_context("lang", "go");
        store
            .set_context_note("lang", "go", "legacy services")
            .expect("context note");
        store.link("alpha", "lang", "rust").expect("link");
        store.link("beta", "lang", "zig").expect("link");
        store.set_project_note("beta", "paused").expect("note");
        store
            .add_resource("alpha", "code", Resource::new(ResourceKind::Git, "git@host:alpha.git"))
            .expect("resource");
        store
            .add_resource("alpha", "docs", Resource::new(ResourceKind::Link, "https://alpha.dev"))
            .expect("resource");
        store
    }

    #[test]
    fn catalog_lists_categories_with_markers_and_separators() {
        let store = sample_store();
        assert_eq!(
            catalog_lines(&store),
            vec![
                "[lang]",
                "  go *  legacy services",
                "  rust",
                "  zig (?)",
                "",
            ]
        );
    }

    #[test]
    fn flat_projection_respects_filter_and_resource_toggle() {
        let store = sample_store();
        let mut filter = FilterSet::new();
        assert_eq!(
            flat_lines(&store, &filter, false, &NoLocalState),
            vec!["alpha", "beta - paused", "gamma"]
        );

        filter.toggle("lang", "rust");
        assert_eq!(
            flat_lines(&store, &filter, true, &LocalStub),
            vec![
                "alpha [+]",
                "  - [GIT] code: git@host:alpha.git",
                "  - [LINK] docs: https://alpha.dev",
            ]
        );
    }

    #[test]
    fn grouped_projection_emits_every_context_then_ungrouped() {
        let store = sample_store();
        let filter = FilterSet::new();
        assert_eq!(
            grouped_lines(&store, &filter, "lang", false, &NoLocalState),
            vec![
                "go *  legacy services",
                "rust",
                "  alpha",
                "zig (?)",
                "  beta - paused",
                "(Ungrouped)",
                "  gamma",
            ]
        );
    }

    #[test]
    fn open_projection_lists_resources_or_placeholder() {
        let store = sample_store();
        assert_eq!(
            open_project_lines(&store, "alpha", &LocalStub),
            vec![
                "alpha [+]",
                "  [GIT] code (local) git@host:alpha.git",
                "  [LINK] docs https://alpha.dev",
            ]
        );
        assert_eq!(
            open_project_lines(&store, "gamma", &NoLocalState),
            vec!["gamma", "  (no resources)"]
        );
    }

    #[test]
    fn open_projection_ignores_scroll_offset() {
        let store = sample_store();
        let mut view = ViewState::default();
        view.set_mode(ViewMode::Open("gamma".to_owned()));
        view.scroll_active(5);

        let lines = main_lines(&store, &FilterSet::new(), &view, &NoLocalState);
        assert_eq!(lines, vec!["gamma", "  (no resources)"]);
    }

    #[test]
    fn body_follows_active_overlay() {
        let store = sample_store();
        let filter = FilterSet::new();
        let help = vec!["open <project>".to_owned(), "quit".to_owned()];
        let mut view = ViewState::default();

        view.toggle_overlay(Overlay::Help);
        view.scroll_active(1);
        assert_eq!(
            render_body(&store, &filter, &view, &NoLocalState, &help),
            "quit"
        );

        view.toggle_overlay(Overlay::Catalog);
        assert!(render_body(&store, &filter, &view, &NoLocalState, &help).starts_with("[lang]"));
    }

    #[test]
    fn head_line_reports_mode_filter_and_save_status() {
        let mut view = ViewState::default();
        let mut filter = FilterSet::new();
        filter.toggle("lang", "rust");
        assert_eq!(
            render_head(&view, &filter, true),
            "mode: group * | filter: lang:rust | resources: off | unsaved changes | view: main"
        );

        view.show_resources = true;
        view.toggle_overlay(Overlay::Catalog);
        assert_eq!(
            render_head(&view, &FilterSet::new(), false),
            "mode: group * | filter: none | resources: on | saved | view: catalog"
        );
    }
}
