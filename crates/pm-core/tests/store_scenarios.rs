use pm_core::projection::{main_lines, render_body};
use pm_core::{
    Capabilities, DocumentStore, FilterSet, NoLocalState, Resource, ResourceKind, Session, Store,
    ViewState, YamlDocumentStore,
};
use std::fs;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

fn unique_temp_dir(label: &str) -> PathBuf {
    let stamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("time")
        .as_nanos();
    std::env::temp_dir().join(format!(
        "pm-core-{label}-{}-{stamp}",
        std::process::id()
    ))
}

fn store_with_alpha_linked() -> Store {
    let mut store = Store::new();
    store.add_project("alpha").expect("create alpha");
    store.link("alpha", "lang", "rust").expect("link alpha");
    store
}

#[test]
fn linking_creates_implicit_category_and_context() {
    let store = store_with_alpha_linked();
    assert_eq!(store.categories(), vec!["lang"]);
    assert_eq!(store.contexts("lang"), vec!["rust"]);
    assert!(store.has_context("alpha", "lang", "rust"));
    assert!(!store.is_registered("lang", "rust"));
}

#[test]
fn removed_category_stays_visible_while_projects_link_it() {
    let mut store = store_with_alpha_linked();
    store.add_context("lang", "rust");
    assert!(store.is_registered("lang", "rust"));

    store.remove_category("lang");
    assert_eq!(store.categories(), vec!["lang"]);
    assert!(!store.is_registered("lang", "rust"));
}

#[test]
fn filter_toggle_hides_then_restores_projects() {
    let mut store = store_with_alpha_linked();
    store.add_project("beta").expect("create beta");
    let alpha = store.project("alpha").expect("alpha").clone();
    let beta = store.project("beta").expect("beta").clone();

    let mut filter = FilterSet::new();
    assert!(filter.toggle("lang", "rust"));
    assert!(filter.is_visible(&alpha));
    assert!(!filter.is_visible(&beta));

    assert!(!filter.toggle("lang", "rust"));
    assert!(filter.is_empty());
    assert!(filter.is_visible(&alpha));
    assert!(filter.is_visible(&beta));
}

#[test]
fn unlinking_the_last_context_drops_the_category_bucket() {
    let mut store = store_with_alpha_linked();
    store.unlink("alpha", "lang", "rust").expect("unlink");

    assert!(store.has_no_context_in("alpha", "lang"));
    assert!(!store.project("alpha").expect("alpha").links.contains_key("lang"));
    assert!(store.categories().is_empty());
}

#[test]
fn flat_view_scroll_offset_skips_leading_projects() {
    let mut store = Store::new();
    for name in ["alpha", "beta", "gamma"] {
        store.add_project(name).expect("create");
    }
    let filter = FilterSet::new();
    let mut view = ViewState::default();

    view.scroll_active(2);
    assert_eq!(main_lines(&store, &filter, &view, &NoLocalState), vec!["gamma"]);

    view.scroll_active(8);
    assert_eq!(render_body(&store, &filter, &view, &NoLocalState, &[]), "");
}

#[test]
fn has_no_context_in_tracks_empty_or_missing_buckets() {
    let mut store = Store::new();
    store.add_project("alpha").expect("create");
    store.add_project("beta").expect("create");
    store.link("alpha", "lang", "rust").expect("link");

    for category in ["lang", "editor"] {
        for project in ["alpha", "beta"] {
            let bucket_empty = store
                .project(project)
                .expect("project")
                .links
                .get(category)
                .map_or(true, Vec::is_empty);
            assert_eq!(store.has_no_context_in(project, category), bucket_empty);
        }
    }
}

#[test]
fn relinking_restores_membership_but_not_order() {
    let mut store = Store::new();
    store.add_project("alpha").expect("create");
    store.link("alpha", "lang", "rust").expect("link");
    store.link("alpha", "lang", "rust").expect("duplicate link");
    store.link("alpha", "lang", "go").expect("link");

    store.unlink("alpha", "lang", "rust").expect("unlink");
    store.link("alpha", "lang", "rust").expect("relink");

    assert!(store.has_context("alpha", "lang", "rust"));
    assert_eq!(
        store.project("alpha").expect("alpha").links["lang"],
        vec!["rust", "go", "rust"]
    );
}

#[test]
fn categories_are_sorted_and_unique_across_links_and_registry() {
    let mut store = Store::new();
    store.add_project("alpha").expect("create");
    store.link("alpha", "zone", "eu").expect("link");
    store.link("alpha", "lang", "rust").expect("link");
    store.add_context("lang", "go");
    store.add_category("editor");

    assert_eq!(store.categories(), vec!["editor", "lang", "zone"]);
}

#[test]
fn dump_and_reload_through_a_session_reproduces_the_store() {
    let dir = unique_temp_dir("session-round-trip");
    let documents = YamlDocumentStore::in_directory(&dir);
    let mut session = Session::load(
        Box::new(documents.clone()),
        Capabilities::inert(),
        ViewState::default(),
    )
    .expect("session");

    for line in [
        "create alpha",
        "create beta",
        "link alpha lang rust",
        "context-create lang go",
        "context-qnote lang go retired in 2024",
        "qnote beta waiting on design",
        "resource-create alpha code git git@host:alpha.git",
        "resource-create alpha docs link https://alpha.dev",
        "category-create editor",
        "dump",
    ] {
        session
            .execute(line)
            .unwrap_or_else(|error| panic!("`{line}` failed: {error}"));
    }
    let expected = session.store().clone();

    session.execute("delete alpha").expect("delete");
    session.execute("reload").expect("reload");
    assert_eq!(session.store(), &expected);
    assert!(!session.has_unsaved_changes());

    let reloaded = documents.load().expect("load");
    assert_eq!(reloaded, expected);
    assert_eq!(
        reloaded.project("alpha").expect("alpha").resources["code"],
        Resource::new(ResourceKind::Git, "git@host:alpha.git")
    );
    assert_eq!(reloaded.context_note("lang", "go"), Some("retired in 2024"));

    let _ = fs::remove_dir_all(&dir);
}
