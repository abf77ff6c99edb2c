use std::sync::OnceLock;

mod keymap;
mod runtime;
mod shell_state;

pub use keymap::{
    key_stroke_from_event, parse_key_token, KeyBindingConfig, KeyPrefixConfig, KeyStroke, Keymap,
    KeymapCompileError, KeymapConfig, KeymapLookupResult,
};
pub use runtime::{Ui, UiOptions};
pub use shell_state::{KeyOutcome, UiShellState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum UiMode {
    #[default]
    Normal,
    Command,
}

impl UiMode {
    pub fn label(self) -> &'static str {
        match self {
            Self::Normal => "Normal",
            Self::Command => "Command",
        }
    }
}

/// Everything a normal-mode key can do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum UiAction {
    ScrollDown,
    ScrollUp,
    PageDown,
    PageUp,
    ScrollTop,
    OpenPrompt,
    ToggleHelp,
    ToggleCatalog,
    ToggleResources,
    Save,
    Back,
    Quit,
}

impl UiAction {
    const ALL: [Self; 12] = [
        Self::ScrollDown,
        Self::ScrollUp,
        Self::PageDown,
        Self::PageUp,
        Self::ScrollTop,
        Self::OpenPrompt,
        Self::ToggleHelp,
        Self::ToggleCatalog,
        Self::ToggleResources,
        Self::Save,
        Self::Back,
        Self::Quit,
    ];

    pub fn id(self) -> &'static str {
        match self {
            Self::ScrollDown => "ui.scroll_down",
            Self::ScrollUp => "ui.scroll_up",
            Self::PageDown => "ui.page_down",
            Self::PageUp => "ui.page_up",
            Self::ScrollTop => "ui.scroll_top",
            Self::OpenPrompt => "ui.open_prompt",
            Self::ToggleHelp => "ui.toggle_help",
            Self::ToggleCatalog => "ui.toggle_catalog",
            Self::ToggleResources => "ui.toggle_resources",
            Self::Save => "ui.save",
            Self::Back => "ui.back",
            Self::Quit => "ui.quit",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|action| action.id() == id)
    }
}

pub fn default_keymap_config() -> KeymapConfig {
    let binding = |keys: &[&str], action: UiAction| KeyBindingConfig {
        keys: keys.iter().map(|key| (*key).to_owned()).collect(),
        action_id: action.id().to_owned(),
    };

    KeymapConfig {
        bindings: vec![
            binding(&["j"], UiAction::ScrollDown),
            binding(&["down"], UiAction::ScrollDown),
            binding(&["k"], UiAction::ScrollUp),
            binding(&["up"], UiAction::ScrollUp),
            binding(&["ctrl+d"], UiAction::PageDown),
            binding(&["pagedown"], UiAction::PageDown),
            binding(&["ctrl+u"], UiAction::PageUp),
            binding(&["pageup"], UiAction::PageUp),
            binding(&["home"], UiAction::ScrollTop),
            binding(&["g", "g"], UiAction::ScrollTop),
            binding(&[":"], UiAction::OpenPrompt),
            binding(&["?"], UiAction::ToggleHelp),
            binding(&["c"], UiAction::ToggleCatalog),
            binding(&["r"], UiAction::ToggleResources),
            binding(&["ctrl+s"], UiAction::Save),
            binding(&["esc"], UiAction::Back),
            binding(&["backspace"], UiAction::Back),
            binding(&["q"], UiAction::Quit),
        ],
        prefixes: vec![KeyPrefixConfig {
            keys: vec!["g".to_owned()],
            label: "go".to_owned(),
        }],
    }
}

pub fn default_keymap() -> &'static Keymap {
    static KEYMAP: OnceLock<Keymap> = OnceLock::new();
    KEYMAP.get_or_init(|| {
        Keymap::compile(&default_keymap_config())
            .expect("default UI keymap must compile without conflicts")
    })
}

pub(crate) fn mode_help(mode: UiMode) -> &'static str {
    match mode {
        UiMode::Normal => {
            "j/k: scroll | ^d/^u: page | gg: top | : command | ?: help | c: catalog | r: resources | ^s: save | esc: back | q: quit"
        }
        UiMode::Command => "enter: run | esc: cancel",
    }
}
