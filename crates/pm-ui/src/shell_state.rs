use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use pm_core::{Command, CoreError, GroupingTarget, Overlay, Session, ViewMode};

use crate::keymap::{KeyStroke, Keymap, KeymapLookupResult};
use crate::{default_keymap, mode_help, UiAction, UiMode};

const DEFAULT_SCROLL_STEP: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyOutcome {
    Continue,
    Quit,
    /// The command needs the terminal; the runtime releases it, then calls
    /// [`UiShellState::run_interactive`].
    Interactive(Command),
}

/// Key routing and prompt editing on top of a [`Session`]. Holds nothing
/// that needs a terminal, so it is driven directly in tests.
pub struct UiShellState {
    session: Session,
    mode: UiMode,
    prompt: String,
    status: String,
    keymap: &'static Keymap,
    pending_keys: Vec<KeyStroke>,
    scroll_step: usize,
    quit_armed: bool,
}

impl UiShellState {
    pub fn new(session: Session) -> Self {
        Self {
            session,
            mode: UiMode::Normal,
            prompt: String::new(),
            status: "ready".to_owned(),
            keymap: default_keymap(),
            pending_keys: Vec::new(),
            scroll_step: DEFAULT_SCROLL_STEP,
            quit_armed: false,
        }
    }

    pub fn with_scroll_step(mut self, step: usize) -> Self {
        self.scroll_step = step.max(1);
        self
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn mode(&self) -> UiMode {
        self.mode
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn head_text(&self) -> String {
        self.session.head_text()
    }

    pub fn body_text(&self) -> String {
        self.session.body_text()
    }

    pub fn body_offset(&self) -> usize {
        self.session.view().active_offset()
    }

    /// The footer: the prompt while typing a command, otherwise the last
    /// status and the key hints (or the pending prefix label).
    pub fn footer_text(&self) -> String {
        match self.mode {
            UiMode::Command => format!(":{}", self.prompt),
            UiMode::Normal => {
                let hint = self
                    .keymap
                    .lookup_prefix_label(&self.pending_keys)
                    .filter(|_| !self.pending_keys.is_empty())
                    .unwrap_or_else(|| mode_help(UiMode::Normal));
                format!("{}\n{hint}", self.status)
            }
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> KeyOutcome {
        match self.mode {
            UiMode::Normal => self.handle_normal_key(key),
            UiMode::Command => self.handle_prompt_key(key),
        }
    }

    /// Applies an interactive command once the terminal has been released.
    pub fn run_interactive(&mut self, command: Command) -> KeyOutcome {
        self.apply(command)
    }

    fn handle_normal_key(&mut self, key: KeyEvent) -> KeyOutcome {
        match self.keymap.route_key_event(&mut self.pending_keys, key) {
            KeymapLookupResult::Action(action) => {
                if !matches!(action, UiAction::Quit | UiAction::OpenPrompt) {
                    self.quit_armed = false;
                }
                self.handle_action(action)
            }
            KeymapLookupResult::Prefix { .. } | KeymapLookupResult::NoMatch => {
                KeyOutcome::Continue
            }
            KeymapLookupResult::InvalidPrefix => {
                self.status = "unknown key sequence".to_owned();
                KeyOutcome::Continue
            }
        }
    }

    fn handle_action(&mut self, action: UiAction) -> KeyOutcome {
        match action {
            UiAction::ScrollDown => self.session.scroll(1),
            UiAction::ScrollUp => self.session.scroll(-1),
            UiAction::PageDown => self.session.scroll(self.page()),
            UiAction::PageUp => self.session.scroll(-self.page()),
            UiAction::ScrollTop => self.session.scroll_to_top(),
            UiAction::OpenPrompt => {
                self.mode = UiMode::Command;
                self.prompt.clear();
            }
            UiAction::ToggleHelp => return self.apply(Command::Help),
            UiAction::ToggleCatalog => return self.apply(Command::Catalog),
            UiAction::ToggleResources => return self.apply(Command::ShowResources),
            UiAction::Save => return self.apply(Command::Dump),
            UiAction::Back => self.back(),
            UiAction::Quit => return self.quit(),
        }
        KeyOutcome::Continue
    }

    fn page(&self) -> isize {
        isize::try_from(self.scroll_step).unwrap_or(isize::MAX)
    }

    /// Closes the overlay, or leaves an opened project for the flat list.
    fn back(&mut self) {
        if self.session.view().overlay != Overlay::Main {
            self.session.toggle_overlay(self.session.view().overlay);
            return;
        }
        if matches!(self.session.view().mode, ViewMode::Open(_)) {
            let _ = self.apply(Command::Group {
                target: GroupingTarget::All,
            });
        }
    }

    /// With unsaved changes the first quit only warns.
    fn quit(&mut self) -> KeyOutcome {
        if self.session.has_unsaved_changes() && !self.quit_armed {
            self.quit_armed = true;
            self.status = "unsaved changes; press q again to quit or ctrl+s to save".to_owned();
            return KeyOutcome::Continue;
        }
        KeyOutcome::Quit
    }

    fn handle_prompt_key(&mut self, key: KeyEvent) -> KeyOutcome {
        match key.code {
            KeyCode::Esc => {
                self.mode = UiMode::Normal;
                self.prompt.clear();
            }
            KeyCode::Backspace => {
                if self.prompt.pop().is_none() {
                    self.mode = UiMode::Normal;
                }
            }
            KeyCode::Enter => {
                let line = std::mem::take(&mut self.prompt);
                self.mode = UiMode::Normal;
                return self.submit(&line);
            }
            KeyCode::Char(ch) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.prompt.push(ch);
            }
            _ => {}
        }
        KeyOutcome::Continue
    }

    fn submit(&mut self, line: &str) -> KeyOutcome {
        if line.trim().is_empty() {
            return KeyOutcome::Continue;
        }
        match self.session.parse(line) {
            Ok(command) if command.is_interactive() => KeyOutcome::Interactive(command),
            Ok(Command::Quit) => self.quit(),
            Ok(command) => {
                self.quit_armed = false;
                self.apply(command)
            }
            Err(error) => self.reject(error),
        }
    }

    fn apply(&mut self, command: Command) -> KeyOutcome {
        match self.session.apply(command) {
            Ok(outcome) => {
                self.status = outcome.status;
                if outcome.exit_requested {
                    KeyOutcome::Quit
                } else {
                    KeyOutcome::Continue
                }
            }
            Err(error) => self.reject(error),
        }
    }

    fn reject(&mut self, error: CoreError) -> KeyOutcome {
        self.status = format!("error: {error}");
        KeyOutcome::Continue
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pm_core::{Capabilities, DocumentStore, Store, ViewState};

    struct NullDocuments;

    impl DocumentStore for NullDocuments {
        fn load(&self) -> Result<Store, CoreError> {
            Ok(Store::default())
        }

        fn dump(&self, _store: &Store) -> Result<(), CoreError> {
            Ok(())
        }
    }

    fn shell() -> UiShellState {
        let session = Session::load(
            Box::new(NullDocuments),
            Capabilities::inert(),
            ViewState::default(),
        )
        .expect("session");
        UiShellState::new(session).with_scroll_step(5)
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ctrl(ch: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(ch), KeyModifiers::CONTROL)
    }

    fn type_command(shell: &mut UiShellState, line: &str) -> KeyOutcome {
        assert_eq!(shell.handle_key(key(KeyCode::Char(':'))), KeyOutcome::Continue);
        for ch in line.chars() {
            shell.handle_key(key(KeyCode::Char(ch)));
        }
        shell.handle_key(key(KeyCode::Enter))
    }

    #[test]
    fn prompt_submits_commands_to_the_session() {
        let mut shell = shell();
        type_command(&mut shell, "create alpha");

        assert_eq!(shell.mode(), UiMode::Normal);
        assert_eq!(shell.status(), "created alpha");
        assert!(shell.session().store().contains_project("alpha"));
        assert_eq!(shell.body_text(), "alpha");
    }

    #[test]
    fn rejected_commands_show_the_error_in_the_status() {
        let mut shell = shell();
        type_command(&mut shell, "open ghost");

        assert!(shell.status().starts_with("error:"));
        assert!(shell.status().contains("ghost"));
    }

    #[test]
    fn escape_and_empty_backspace_leave_the_prompt() {
        let mut shell = shell();
        shell.handle_key(key(KeyCode::Char(':')));
        shell.handle_key(key(KeyCode::Char('x')));
        assert_eq!(shell.footer_text(), ":x");
        shell.handle_key(key(KeyCode::Esc));
        assert_eq!(shell.mode(), UiMode::Normal);
        assert_eq!(shell.prompt(), "");

        shell.handle_key(key(KeyCode::Char(':')));
        shell.handle_key(key(KeyCode::Backspace));
        assert_eq!(shell.mode(), UiMode::Normal);
    }

    #[test]
    fn scroll_keys_move_the_active_cursor() {
        let mut shell = shell();
        shell.handle_key(key(KeyCode::Char('j')));
        shell.handle_key(key(KeyCode::Char('j')));
        shell.handle_key(key(KeyCode::Char('k')));
        assert_eq!(shell.body_offset(), 1);

        shell.handle_key(ctrl('d'));
        assert_eq!(shell.body_offset(), 6);
        shell.handle_key(key(KeyCode::PageUp));
        assert_eq!(shell.body_offset(), 1);

        shell.handle_key(key(KeyCode::Char('g')));
        assert!(shell.footer_text().ends_with("go"));
        shell.handle_key(key(KeyCode::Char('g')));
        assert_eq!(shell.body_offset(), 0);
    }

    #[test]
    fn overlay_keys_toggle_and_back_closes_them() {
        let mut shell = shell();
        shell.handle_key(key(KeyCode::Char('?')));
        assert_eq!(shell.session().view().overlay, Overlay::Help);
        shell.handle_key(key(KeyCode::Char('c')));
        assert_eq!(shell.session().view().overlay, Overlay::Catalog);
        shell.handle_key(key(KeyCode::Esc));
        assert_eq!(shell.session().view().overlay, Overlay::Main);
    }

    #[test]
    fn back_leaves_an_opened_project() {
        let mut shell = shell();
        type_command(&mut shell, "create alpha");
        type_command(&mut shell, "open alpha");
        assert_eq!(shell.session().view().mode.open_project(), Some("alpha"));

        shell.handle_key(key(KeyCode::Esc));
        assert_eq!(shell.session().view().mode, ViewMode::default());
    }

    #[test]
    fn quit_with_unsaved_changes_needs_confirmation() {
        let mut shell = shell();
        assert_eq!(shell.handle_key(key(KeyCode::Char('q'))), KeyOutcome::Quit);

        type_command(&mut shell, "create alpha");
        assert_eq!(shell.handle_key(key(KeyCode::Char('q'))), KeyOutcome::Continue);
        assert!(shell.status().contains("unsaved changes"));
        assert_eq!(shell.handle_key(key(KeyCode::Char('q'))), KeyOutcome::Quit);
    }

    #[test]
    fn typed_quit_is_confirmed_the_same_way() {
        let mut shell = shell();
        type_command(&mut shell, "create alpha");
        assert_eq!(type_command(&mut shell, "quit"), KeyOutcome::Continue);
        assert_eq!(type_command(&mut shell, "quit"), KeyOutcome::Quit);
    }

    #[test]
    fn save_key_clears_unsaved_changes_before_quitting() {
        let mut shell = shell();
        type_command(&mut shell, "create alpha");
        shell.handle_key(ctrl('s'));
        assert!(!shell.session().has_unsaved_changes());
        assert_eq!(type_command(&mut shell, "quit"), KeyOutcome::Quit);
    }

    #[test]
    fn interactive_commands_are_handed_to_the_runtime() {
        let mut shell = shell();
        type_command(&mut shell, "create alpha");

        let outcome = type_command(&mut shell, "note alpha");
        let KeyOutcome::Interactive(command) = outcome else {
            panic!("expected interactive command, got {outcome:?}");
        };
        assert_eq!(command.name(), "note");
        assert_eq!(shell.run_interactive(command), KeyOutcome::Continue);
    }
}
