use std::collections::BTreeMap;
use std::fmt;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::UiAction;

const MOD_SHIFT: u8 = 0b001;
const MOD_CONTROL: u8 = 0b010;
const MOD_ALT: u8 = 0b100;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct KeymapConfig {
    pub bindings: Vec<KeyBindingConfig>,
    pub prefixes: Vec<KeyPrefixConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyBindingConfig {
    pub keys: Vec<String>,
    pub action_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPrefixConfig {
    pub keys: Vec<String>,
    pub label: String,
}

/// Normal-mode key sequences compiled into a trie. Prefix nodes wait for
/// another key; leaves carry an action.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Keymap {
    root: TrieNode,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
struct TrieNode {
    action: Option<UiAction>,
    prefix_label: Option<String>,
    children: BTreeMap<KeyStroke, TrieNode>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeymapCompileError {
    UnknownAction { action_id: String },
    EmptyKeySequence { context: &'static str },
    InvalidKeyToken { token: String, message: String },
    DuplicateBinding { sequence: String },
    BindingExtendsExistingAction { sequence: String },
    BindingShadowsExistingPrefix { sequence: String },
    DuplicatePrefixLabel { sequence: String },
    PrefixConflictsWithAction { sequence: String },
    PrefixHasNoChildren { sequence: String },
}

impl fmt::Display for KeymapCompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownAction { action_id } => {
                write!(f, "unknown action id '{action_id}' in keymap")
            }
            Self::EmptyKeySequence { context } => {
                write!(f, "empty key sequence in keymap {context} entry")
            }
            Self::InvalidKeyToken { token, message } => {
                write!(f, "invalid key token '{token}': {message}")
            }
            Self::DuplicateBinding { sequence } => {
                write!(f, "duplicate binding for '{sequence}'")
            }
            Self::BindingExtendsExistingAction { sequence } => {
                write!(f, "binding '{sequence}' extends an existing action sequence")
            }
            Self::BindingShadowsExistingPrefix { sequence } => {
                write!(f, "binding '{sequence}' shadows an existing prefix")
            }
            Self::DuplicatePrefixLabel { sequence } => {
                write!(f, "duplicate prefix label for '{sequence}'")
            }
            Self::PrefixConflictsWithAction { sequence } => {
                write!(f, "prefix '{sequence}' conflicts with an existing action sequence")
            }
            Self::PrefixHasNoChildren { sequence } => {
                write!(f, "prefix '{sequence}' has no child bindings")
            }
        }
    }
}

impl std::error::Error for KeymapCompileError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeymapLookupResult {
    Action(UiAction),
    Prefix { label: Option<String> },
    InvalidPrefix,
    NoMatch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct KeyStroke {
    key: KeyCodeToken,
    modifiers: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
enum KeyCodeToken {
    Char(char),
    Up,
    Down,
    PageUp,
    PageDown,
    Home,
    End,
    Enter,
    Backspace,
    Esc,
}

impl fmt::Display for KeyStroke {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if self.modifiers & MOD_CONTROL != 0 {
            parts.push("ctrl".to_owned());
        }
        if self.modifiers & MOD_ALT != 0 {
            parts.push("alt".to_owned());
        }
        if self.modifiers & MOD_SHIFT != 0 {
            parts.push("shift".to_owned());
        }
        let key = match self.key {
            KeyCodeToken::Char(ch) => ch.to_string(),
            KeyCodeToken::Up => "up".to_owned(),
            KeyCodeToken::Down => "down".to_owned(),
            KeyCodeToken::PageUp => "pageup".to_owned(),
            KeyCodeToken::PageDown => "pagedown".to_owned(),
            KeyCodeToken::Home => "home".to_owned(),
            KeyCodeToken::End => "end".to_owned(),
            KeyCodeToken::Enter => "enter".to_owned(),
            KeyCodeToken::Backspace => "backspace".to_owned(),
            KeyCodeToken::Esc => "esc".to_owned(),
        };
        parts.push(key);
        write!(f, "{}", parts.join("+"))
    }
}

impl Keymap {
    pub fn compile(config: &KeymapConfig) -> Result<Self, KeymapCompileError> {
        let mut keymap = Self::default();

        for binding in &config.bindings {
            let action = UiAction::from_id(&binding.action_id).ok_or_else(|| {
                KeymapCompileError::UnknownAction {
                    action_id: binding.action_id.clone(),
                }
            })?;
            let sequence = parse_key_sequence("binding", &binding.keys)?;
            keymap.insert_binding(sequence, action)?;
        }

        for prefix in &config.prefixes {
            let sequence = parse_key_sequence("prefix", &prefix.keys)?;
            keymap.insert_prefix(sequence, prefix.label.clone())?;
        }

        let mut path = Vec::new();
        validate_prefix_node(&keymap.root, &mut path)?;
        Ok(keymap)
    }

    /// Resolves `key` against the keys already pending. A key that breaks a
    /// pending prefix is retried on its own.
    pub fn route_key_event(&self, pending: &mut Vec<KeyStroke>, key: KeyEvent) -> KeymapLookupResult {
        let had_pending = !pending.is_empty();
        let Some(stroke) = key_stroke_from_event(key) else {
            pending.clear();
            return if had_pending {
                KeymapLookupResult::InvalidPrefix
            } else {
                KeymapLookupResult::NoMatch
            };
        };

        let mut sequence = pending.clone();
        sequence.push(stroke);
        if let Some(result) = self.resolve_sequence(pending, sequence) {
            return result;
        }

        if had_pending {
            if let Some(result) = self.resolve_sequence(pending, vec![stroke]) {
                return result;
            }
            pending.clear();
            return KeymapLookupResult::InvalidPrefix;
        }

        pending.clear();
        KeymapLookupResult::NoMatch
    }

    pub fn lookup_prefix_label(&self, sequence: &[KeyStroke]) -> Option<&str> {
        self.lookup(sequence)
            .and_then(|node| node.prefix_label.as_deref())
    }

    fn lookup(&self, sequence: &[KeyStroke]) -> Option<&TrieNode> {
        let mut node = &self.root;
        for stroke in sequence {
            node = node.children.get(stroke)?;
        }
        Some(node)
    }

    fn resolve_sequence(
        &self,
        pending: &mut Vec<KeyStroke>,
        sequence: Vec<KeyStroke>,
    ) -> Option<KeymapLookupResult> {
        let node = self.lookup(&sequence)?;

        if let Some(action) = node.action {
            pending.clear();
            return Some(KeymapLookupResult::Action(action));
        }

        if !node.children.is_empty() {
            *pending = sequence;
            return Some(KeymapLookupResult::Prefix {
                label: node.prefix_label.clone(),
            });
        }

        pending.clear();
        Some(KeymapLookupResult::NoMatch)
    }

    fn insert_binding(
        &mut self,
        sequence: Vec<KeyStroke>,
        action: UiAction,
    ) -> Result<(), KeymapCompileError> {
        let rendered = format_key_sequence(&sequence);
        let Some((last, leading)) = sequence.split_last() else {
            return Err(KeymapCompileError::EmptyKeySequence { context: "binding" });
        };

        let mut node = &mut self.root;
        for stroke in leading {
            node = node.children.entry(*stroke).or_default();
            if node.action.is_some() {
                return Err(KeymapCompileError::BindingExtendsExistingAction { sequence: rendered });
            }
        }

        let leaf = node.children.entry(*last).or_default();
        if leaf.action.is_some() {
            return Err(KeymapCompileError::DuplicateBinding { sequence: rendered });
        }
        if !leaf.children.is_empty() || leaf.prefix_label.is_some() {
            return Err(KeymapCompileError::BindingShadowsExistingPrefix { sequence: rendered });
        }

        leaf.action = Some(action);
        Ok(())
    }

    fn insert_prefix(
        &mut self,
        sequence: Vec<KeyStroke>,
        label: String,
    ) -> Result<(), KeymapCompileError> {
        let rendered = format_key_sequence(&sequence);
        let mut node = &mut self.root;
        for stroke in sequence {
            node = node.children.entry(stroke).or_default();
            if node.action.is_some() {
                return Err(KeymapCompileError::PrefixConflictsWithAction { sequence: rendered });
            }
        }

        if node.prefix_label.is_some() {
            return Err(KeymapCompileError::DuplicatePrefixLabel { sequence: rendered });
        }

        node.prefix_label = Some(label);
        Ok(())
    }
}

fn validate_prefix_node(
    node: &TrieNode,
    path: &mut Vec<KeyStroke>,
) -> Result<(), KeymapCompileError> {
    if node.prefix_label.is_some() && node.children.is_empty() {
        return Err(KeymapCompileError::PrefixHasNoChildren {
            sequence: format_key_sequence(path),
        });
    }

    for (stroke, child) in &node.children {
        path.push(*stroke);
        validate_prefix_node(child, path)?;
        path.pop();
    }

    Ok(())
}

fn parse_key_sequence(
    context: &'static str,
    raw_keys: &[String],
) -> Result<Vec<KeyStroke>, KeymapCompileError> {
    if raw_keys.is_empty() {
        return Err(KeymapCompileError::EmptyKeySequence { context });
    }

    raw_keys
        .iter()
        .map(|token| {
            parse_key_token(token).map_err(|message| KeymapCompileError::InvalidKeyToken {
                token: token.clone(),
                message,
            })
        })
        .collect()
}

/// Parses tokens such as `j`, `G`, `ctrl+d` or `pagedown`. An uppercase
/// letter implies shift.
pub fn parse_key_token(raw: &str) -> Result<KeyStroke, String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err("token is empty".to_owned());
    }
    // A lone "+" is a key, not a separator.
    if trimmed == "+" {
        return Ok(KeyStroke {
            key: KeyCodeToken::Char('+'),
            modifiers: 0,
        });
    }

    let parts = trimmed.split('+').collect::<Vec<_>>();
    let Some((key_part, modifier_parts)) = parts.split_last() else {
        return Err("token is empty".to_owned());
    };
    let mut modifiers = 0u8;
    for modifier in modifier_parts {
        match modifier.trim().to_ascii_lowercase().as_str() {
            "shift" => modifiers |= MOD_SHIFT,
            "ctrl" | "control" => modifiers |= MOD_CONTROL,
            "alt" => modifiers |= MOD_ALT,
            _ => return Err(format!("unknown modifier '{modifier}'")),
        }
    }

    let key_part = key_part.trim();
    if key_part.is_empty() {
        return Err("missing key after modifier".to_owned());
    }

    let key = match key_part.to_ascii_lowercase().as_str() {
        "up" => KeyCodeToken::Up,
        "down" => KeyCodeToken::Down,
        "pageup" => KeyCodeToken::PageUp,
        "pagedown" => KeyCodeToken::PageDown,
        "home" => KeyCodeToken::Home,
        "end" => KeyCodeToken::End,
        "enter" => KeyCodeToken::Enter,
        "backspace" => KeyCodeToken::Backspace,
        "esc" | "escape" => KeyCodeToken::Esc,
        _ => {
            let mut chars = key_part.chars();
            let Some(mut ch) = chars.next() else {
                return Err("missing key token".to_owned());
            };
            if chars.next().is_some() {
                return Err("keys must be single chars or named keys (up/pagedown/esc/etc.)".to_owned());
            }
            if ch.is_ascii_uppercase() {
                ch = ch.to_ascii_lowercase();
                modifiers |= MOD_SHIFT;
            }
            KeyCodeToken::Char(ch)
        }
    };

    Ok(KeyStroke { key, modifiers })
}

pub fn key_stroke_from_event(event: KeyEvent) -> Option<KeyStroke> {
    let mut modifiers = normalize_modifiers(event.modifiers);
    let key = match event.code {
        KeyCode::Char(mut ch) => {
            if ch.is_ascii_uppercase() {
                ch = ch.to_ascii_lowercase();
                modifiers |= MOD_SHIFT;
            } else if !ch.is_ascii_alphabetic() {
                // Punctuation arrives already shifted.
                modifiers &= !MOD_SHIFT;
            }
            KeyCodeToken::Char(ch)
        }
        KeyCode::Up => KeyCodeToken::Up,
        KeyCode::Down => KeyCodeToken::Down,
        KeyCode::PageUp => KeyCodeToken::PageUp,
        KeyCode::PageDown => KeyCodeToken::PageDown,
        KeyCode::Home => KeyCodeToken::Home,
        KeyCode::End => KeyCodeToken::End,
        KeyCode::Enter => KeyCodeToken::Enter,
        KeyCode::Backspace => KeyCodeToken::Backspace,
        KeyCode::Esc => KeyCodeToken::Esc,
        _ => return None,
    };

    Some(KeyStroke { key, modifiers })
}

fn normalize_modifiers(modifiers: KeyModifiers) -> u8 {
    let mut normalized = 0u8;
    if modifiers.contains(KeyModifiers::SHIFT) {
        normalized |= MOD_SHIFT;
    }
    if modifiers.contains(KeyModifiers::CONTROL) {
        normalized |= MOD_CONTROL;
    }
    if modifiers.contains(KeyModifiers::ALT) {
        normalized |= MOD_ALT;
    }
    normalized
}

fn format_key_sequence(sequence: &[KeyStroke]) -> String {
    sequence
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}
