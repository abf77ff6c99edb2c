#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum GroupingTarget {
    #[default]
    All,
    Category(String),
}

impl GroupingTarget {
    pub const WILDCARD: &'static str = "*";

    pub fn label(&self) -> &str {
        match self {
            Self::All => Self::WILDCARD,
            Self::Category(category) => category.as_str(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewMode {
    Grouped(GroupingTarget),
    Open(String),
}

impl Default for ViewMode {
    fn default() -> Self {
        Self::Grouped(GroupingTarget::All)
    }
}

impl ViewMode {
    pub fn label(&self) -> String {
        match self {
            Self::Grouped(target) => format!("group {}", target.label()),
            Self::Open(project) => format!("open {project}"),
        }
    }

    pub fn open_project(&self) -> Option<&str> {
        match self {
            Self::Open(project) => Some(project.as_str()),
            Self::Grouped(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Overlay {
    #[default]
    Main,
    Help,
    Catalog,
}

impl Overlay {
    pub fn label(self) -> &'static str {
        match self {
            Self::Main => "main",
            Self::Help => "help",
            Self::Catalog => "catalog",
        }
    }
}

/// One scroll cursor per overlay. Offsets clamp at zero and are not bounded
/// above; scrolling past the end yields an empty body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScrollCursors {
    main: usize,
    help: usize,
    catalog: usize,
}

impl ScrollCursors {
    pub fn offset(&self, overlay: Overlay) -> usize {
        match overlay {
            Overlay::Main => self.main,
            Overlay::Help => self.help,
            Overlay::Catalog => self.catalog,
        }
    }

    pub fn scroll_by(&mut self, overlay: Overlay, delta: isize) {
        let cursor = self.cursor_mut(overlay);
        *cursor = if delta.is_negative() {
            cursor.saturating_sub(delta.unsigned_abs())
        } else {
            cursor.saturating_add(delta.unsigned_abs())
        };
    }

    pub fn reset(&mut self, overlay: Overlay) {
        *self.cursor_mut(overlay) = 0;
    }

    fn cursor_mut(&mut self, overlay: Overlay) -> &mut usize {
        match overlay {
            Overlay::Main => &mut self.main,
            Overlay::Help => &mut self.help,
            Overlay::Catalog => &mut self.catalog,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ViewState {
    pub mode: ViewMode,
    pub overlay: Overlay,
    pub scroll: ScrollCursors,
    pub show_resources: bool,
}

impl ViewState {
    pub fn with_show_resources(show_resources: bool) -> Self {
        Self {
            show_resources,
            ..Self::default()
        }
    }

    /// Switches the main view mode and rewinds the main cursor.
    pub fn set_mode(&mut self, mode: ViewMode) {
        self.mode = mode;
        self.overlay = Overlay::Main;
        self.scroll.reset(Overlay::Main);
    }

    /// Shows `overlay`, or returns to the main view when it is already shown.
    pub fn toggle_overlay(&mut self, overlay: Overlay) {
        self.overlay = if self.overlay == overlay {
            Overlay::Main
        } else {
            overlay
        };
    }

    pub fn scroll_active(&mut self, delta: isize) {
        self.scroll.scroll_by(self.overlay, delta);
    }

    pub fn active_offset(&self) -> usize {
        self.scroll.offset(self.overlay)
    }
}
