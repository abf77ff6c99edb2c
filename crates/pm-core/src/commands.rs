use std::collections::BTreeMap;

use crate::capabilities::ResourceAction;
use crate::view::GroupingTarget;
use crate::{CoreError, ResourceKind};

/// Command names accepted at the prompt. These are user-facing vocabulary and
/// must not be renamed silently.
pub mod names {
    pub const OPEN: &str = "open";
    pub const GROUP: &str = "group";
    pub const FILTER: &str = "filter";
    pub const FILTER_REMOVE: &str = "filter-remove";
    pub const CREATE: &str = "create";
    pub const DELETE: &str = "delete";
    pub const LINK: &str = "link";
    pub const UNLINK: &str = "unlink";
    pub const CONTEXT_CREATE: &str = "context-create";
    pub const CONTEXT_DELETE: &str = "context-delete";
    pub const CATEGORY_CREATE: &str = "category-create";
    pub const CATEGORY_DELETE: &str = "category-delete";
    pub const QNOTE: &str = "qnote";
    pub const QNOTE_DELETE: &str = "qnote-delete";
    pub const CONTEXT_QNOTE: &str = "context-qnote";
    pub const CONTEXT_QNOTE_DELETE: &str = "context-qnote-delete";
    pub const RESOURCE_CREATE: &str = "resource-create";
    pub const RESOURCE_DELETE: &str = "resource-delete";
    pub const RESOURCE: &str = "resource";
    pub const SHOW_RESOURCES: &str = "show-resources";
    pub const RELOAD: &str = "reload";
    pub const DUMP: &str = "dump";
    pub const NOTE: &str = "note";
    pub const CONTEXT_NOTE: &str = "context-note";
    pub const CODE: &str = "code";
    pub const BACKUP: &str = "backup";
    pub const HELP: &str = "help";
    pub const CATALOG: &str = "catalog";
    pub const QUIT: &str = "quit";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exact(usize),
    Between(usize, usize),
    AtLeast(usize),
}

impl Arity {
    fn accepts(self, count: usize) -> bool {
        match self {
            Self::Exact(expected) => count == expected,
            Self::Between(min, max) => (min..=max).contains(&count),
            Self::AtLeast(min) => count >= min,
        }
    }

    fn describe(self) -> String {
        match self {
            Self::Exact(0) => "no arguments".to_owned(),
            Self::Exact(1) => "exactly 1 argument".to_owned(),
            Self::Exact(expected) => format!("exactly {expected} arguments"),
            Self::Between(min, max) => format!("{min} to {max} arguments"),
            Self::AtLeast(min) => format!("at least {min} arguments"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandMetadata {
    pub name: &'static str,
    pub usage: &'static str,
    pub description: &'static str,
    pub arity: Arity,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Open {
        project: String,
    },
    Group {
        target: GroupingTarget,
    },
    Filter {
        category: String,
        context: String,
    },
    FilterRemove,
    Create {
        project: String,
    },
    Delete {
        project: String,
    },
    Link {
        project: String,
        category: String,
        context: String,
    },
    Unlink {
        project: String,
        category: String,
        context: String,
    },
    ContextCreate {
        category: String,
        context: String,
    },
    ContextDelete {
        category: String,
        context: String,
    },
    CategoryCreate {
        category: String,
    },
    CategoryDelete {
        category: String,
    },
    QuickNote {
        project: String,
        text: String,
    },
    QuickNoteDelete {
        project: String,
    },
    ContextQuickNote {
        category: String,
        context: String,
        text: String,
    },
    ContextQuickNoteDelete {
        category: String,
        context: String,
    },
    ResourceCreate {
        project: Option<String>,
        resource: String,
        kind: ResourceKind,
        source: String,
    },
    ResourceDelete {
        project: Option<String>,
        resource: String,
    },
    Resource {
        project: Option<String>,
        resource: String,
        action: ResourceAction,
    },
    ShowResources,
    Reload,
    Dump,
    Note {
        project: Option<String>,
    },
    ContextNote {
        category: String,
        context: String,
    },
    Code {
        project: Option<String>,
    },
    Backup,
    Help,
    Catalog,
    Quit,
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Open { .. } => names::OPEN,
            Self::Group { .. } => names::GROUP,
            Self::Filter { .. } => names::FILTER,
            Self::FilterRemove => names::FILTER_REMOVE,
            Self::Create { .. } => names::CREATE,
            Self::Delete { .. } => names::DELETE,
            Self::Link { .. } => names::LINK,
            Self::Unlink { .. } => names::UNLINK,
            Self::ContextCreate { .. } => names::CONTEXT_CREATE,
            Self::ContextDelete { .. } => names::CONTEXT_DELETE,
            Self::CategoryCreate { .. } => names::CATEGORY_CREATE,
            Self::CategoryDelete { .. } => names::CATEGORY_DELETE,
            Self::QuickNote { .. } => names::QNOTE,
            Self::QuickNoteDelete { .. } => names::QNOTE_DELETE,
            Self::ContextQuickNote { .. } => names::CONTEXT_QNOTE,
            Self::ContextQuickNoteDelete { .. } => names::CONTEXT_QNOTE_DELETE,
            Self::ResourceCreate { .. } => names::RESOURCE_CREATE,
            Self::ResourceDelete { .. } => names::RESOURCE_DELETE,
            Self::Resource { .. } => names::RESOURCE,
            Self::ShowResources => names::SHOW_RESOURCES,
            Self::Reload => names::RELOAD,
            Self::Dump => names::DUMP,
            Self::Note { .. } => names::NOTE,
            Self::ContextNote { .. } => names::CONTEXT_NOTE,
            Self::Code { .. } => names::CODE,
            Self::Backup => names::BACKUP,
            Self::Help => names::HELP,
            Self::Catalog => names::CATALOG,
            Self::Quit => names::QUIT,
        }
    }

    /// Commands that hand the terminal to another program while they run.
    pub fn is_interactive(&self) -> bool {
        matches!(self, Self::Note { .. } | Self::ContextNote { .. })
    }
}

type ParseFn = fn(&[&str]) -> Result<Command, CoreError>;

#[derive(Clone, Debug)]
pub struct CommandDefinition {
    metadata: CommandMetadata,
    parse: ParseFn,
}

impl CommandDefinition {
    fn new(
        name: &'static str,
        usage: &'static str,
        description: &'static str,
        arity: Arity,
        parse: ParseFn,
    ) -> Self {
        Self {
            metadata: CommandMetadata {
                name,
                usage,
                description,
                arity,
            },
            parse,
        }
    }

    pub fn metadata(&self) -> &CommandMetadata {
        &self.metadata
    }
}

#[derive(Debug)]
pub struct CommandRegistry {
    definitions: BTreeMap<&'static str, CommandDefinition>,
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new().expect("canonical command registry should not contain duplicates")
    }
}

impl CommandRegistry {
    pub fn new() -> Result<Self, CoreError> {
        Self::from_definitions(canonical_definitions())
    }

    pub(crate) fn from_definitions(definitions: Vec<CommandDefinition>) -> Result<Self, CoreError> {
        let mut mapped = BTreeMap::new();
        for definition in definitions {
            let name = definition.metadata.name;
            if mapped.insert(name, definition).is_some() {
                return Err(CoreError::duplicate("command", name));
            }
        }

        Ok(Self {
            definitions: mapped,
        })
    }

    pub fn lookup(&self, name: &str) -> Result<&CommandMetadata, CoreError> {
        self.definitions
            .get(name)
            .map(CommandDefinition::metadata)
            .ok_or_else(|| CoreError::invalid_command(name, "unknown command"))
    }

    pub fn list(&self) -> Vec<&CommandMetadata> {
        self.definitions
            .values()
            .map(CommandDefinition::metadata)
            .collect()
    }

    /// Decodes one prompt submission. Arity is checked before the typed
    /// fields are built, so a malformed line never reaches the store.
    pub fn parse_line(&self, line: &str) -> Result<Command, CoreError> {
        let mut tokens = line.split_whitespace();
        let Some(name) = tokens.next() else {
            return Err(CoreError::invalid_command("", "empty command"));
        };
        let args = tokens.collect::<Vec<_>>();

        let definition = self
            .definitions
            .get(name)
            .ok_or_else(|| CoreError::invalid_command(name, "unknown command"))?;
        let arity = definition.metadata.arity;
        if !arity.accepts(args.len()) {
            return Err(CoreError::invalid_command(
                name,
                format!(
                    "expected {} but got {}; usage: {}",
                    arity.describe(),
                    args.len(),
                    definition.metadata.usage
                ),
            ));
        }

        (definition.parse)(&args)
    }

    pub fn help_lines(&self) -> Vec<String> {
        let width = self
            .definitions
            .values()
            .map(|definition| definition.metadata.usage.len())
            .max()
            .unwrap_or(0);
        self.definitions
            .values()
            .map(|definition| {
                format!(
                    "{:<width$}  {}",
                    definition.metadata.usage, definition.metadata.description
                )
            })
            .collect()
    }
}

fn canonical_definitions() -> Vec<CommandDefinition> {
    vec![
        CommandDefinition::new(
            names::OPEN,
            "open <project>",
            "Show a single project with its resources.",
            Arity::Exact(1),
            |args| {
                Ok(Command::Open {
                    project: owned(args[0]),
                })
            },
        ),
        CommandDefinition::new(
            names::GROUP,
            "group <category|*>",
            "Group the project list by a category, or list flat with '*'.",
            Arity::Exact(1),
            |args| {
                let target = if args[0] == GroupingTarget::WILDCARD {
                    GroupingTarget::All
                } else {
                    GroupingTarget::Category(owned(args[0]))
                };
                Ok(Command::Group { target })
            },
        ),
        CommandDefinition::new(
            names::FILTER,
            "filter <category> <context>",
            "Toggle a required category/context filter.",
            Arity::Exact(2),
            |args| {
                Ok(Command::Filter {
                    category: owned(args[0]),
                    context: owned(args[1]),
                })
            },
        ),
        CommandDefinition::new(
            names::FILTER_REMOVE,
            "filter-remove",
            "Clear every active filter.",
            Arity::Exact(0),
            |_| Ok(Command::FilterRemove),
        ),
        CommandDefinition::new(
            names::CREATE,
            "create <project>",
            "Create an empty project.",
            Arity::Exact(1),
            |args| {
                Ok(Command::Create {
                    project: owned(args[0]),
                })
            },
        ),
        CommandDefinition::new(
            names::DELETE,
            "delete <project>",
            "Delete a project with its links and resources.",
            Arity::Exact(1),
            |args| {
                Ok(Command::Delete {
                    project: owned(args[0]),
                })
            },
        ),
        CommandDefinition::new(
            names::LINK,
            "link <project> <category> <context>",
            "Tag a project with a category/context pair.",
            Arity::Exact(3),
            |args| {
                Ok(Command::Link {
                    project: owned(args[0]),
                    category: owned(args[1]),
                    context: owned(args[2]),
                })
            },
        ),
        CommandDefinition::new(
            names::UNLINK,
            "unlink <project> <category> <context>",
            "Remove one category/context tag from a project.",
            Arity::Exact(3),
            |args| {
                Ok(Command::Unlink {
                    project: owned(args[0]),
                    category: owned(args[1]),
                    context: owned(args[2]),
                })
            },
        ),
        CommandDefinition::new(
            names::CONTEXT_CREATE,
            "context-create <category> <context>",
            "Register a context, creating its category when needed.",
            Arity::Exact(2),
            |args| {
                Ok(Command::ContextCreate {
                    category: owned(args[0]),
                    context: owned(args[1]),
                })
            },
        ),
        CommandDefinition::new(
            names::CONTEXT_DELETE,
            "context-delete <category> <context>",
            "Unregister a context.",
            Arity::Exact(2),
            |args| {
                Ok(Command::ContextDelete {
                    category: owned(args[0]),
                    context: owned(args[1]),
                })
            },
        ),
        CommandDefinition::new(
            names::CATEGORY_CREATE,
            "category-create <category>",
            "Register an empty category.",
            Arity::Exact(1),
            |args| {
                Ok(Command::CategoryCreate {
                    category: owned(args[0]),
                })
            },
        ),
        CommandDefinition::new(
            names::CATEGORY_DELETE,
            "category-delete <category>",
            "Unregister a category and its contexts; project links remain.",
            Arity::Exact(1),
            |args| {
                Ok(Command::CategoryDelete {
                    category: owned(args[0]),
                })
            },
        ),
        CommandDefinition::new(
            names::QNOTE,
            "qnote <project> [text...]",
            "Set the quick note of a project.",
            Arity::AtLeast(1),
            |args| {
                Ok(Command::QuickNote {
                    project: owned(args[0]),
                    text: args[1..].join(" "),
                })
            },
        ),
        CommandDefinition::new(
            names::QNOTE_DELETE,
            "qnote-delete <project>",
            "Clear the quick note of a project.",
            Arity::Exact(1),
            |args| {
                Ok(Command::QuickNoteDelete {
                    project: owned(args[0]),
                })
            },
        ),
        CommandDefinition::new(
            names::CONTEXT_QNOTE,
            "context-qnote <category> <context> [text...]",
            "Set the quick note of a registered context.",
            Arity::AtLeast(2),
            |args| {
                Ok(Command::ContextQuickNote {
                    category: owned(args[0]),
                    context: owned(args[1]),
                    text: args[2..].join(" "),
                })
            },
        ),
        CommandDefinition::new(
            names::CONTEXT_QNOTE_DELETE,
            "context-qnote-delete <category> <context>",
            "Clear the quick note of a registered context.",
            Arity::Exact(2),
            |args| {
                Ok(Command::ContextQuickNoteDelete {
                    category: owned(args[0]),
                    context: owned(args[1]),
                })
            },
        ),
        CommandDefinition::new(
            names::RESOURCE_CREATE,
            "resource-create [project] <resource> <git|svn|link> <source>",
            "Attach a resource; the project defaults to the opened one.",
            Arity::Between(3, 4),
            |args| {
                let (project, rest) = split_optional_project(args, 3);
                Ok(Command::ResourceCreate {
                    project,
                    resource: owned(rest[0]),
                    kind: ResourceKind::parse(rest[1])?,
                    source: owned(rest[2]),
                })
            },
        ),
        CommandDefinition::new(
            names::RESOURCE_DELETE,
            "resource-delete [project] <resource>",
            "Detach a resource; the project defaults to the opened one.",
            Arity::Between(1, 2),
            |args| {
                let (project, rest) = split_optional_project(args, 1);
                Ok(Command::ResourceDelete {
                    project,
                    resource: owned(rest[0]),
                })
            },
        ),
        CommandDefinition::new(
            names::RESOURCE,
            "resource [project] <resource> <clone|update|open>",
            "Run an action on a resource; the project defaults to the opened one.",
            Arity::Between(2, 3),
            |args| {
                let (project, rest) = split_optional_project(args, 2);
                Ok(Command::Resource {
                    project,
                    resource: owned(rest[0]),
                    action: ResourceAction::parse(rest[1])?,
                })
            },
        ),
        CommandDefinition::new(
            names::SHOW_RESOURCES,
            "show-resources",
            "Toggle resource lines in the project list.",
            Arity::Exact(0),
            |_| Ok(Command::ShowResources),
        ),
        CommandDefinition::new(
            names::RELOAD,
            "reload",
            "Discard in-memory changes and reload the data files.",
            Arity::Exact(0),
            |_| Ok(Command::Reload),
        ),
        CommandDefinition::new(
            names::DUMP,
            "dump",
            "Write projects and contexts to the data files.",
            Arity::Exact(0),
            |_| Ok(Command::Dump),
        ),
        CommandDefinition::new(
            names::NOTE,
            "note [project]",
            "Edit the long-form note of a project in the editor.",
            Arity::Between(0, 1),
            |args| {
                Ok(Command::Note {
                    project: args.first().map(|value| owned(value)),
                })
            },
        ),
        CommandDefinition::new(
            names::CONTEXT_NOTE,
            "context-note <category> <context>",
            "Edit the long-form note of a context in the editor.",
            Arity::Exact(2),
            |args| {
                Ok(Command::ContextNote {
                    category: owned(args[0]),
                    context: owned(args[1]),
                })
            },
        ),
        CommandDefinition::new(
            names::CODE,
            "code [project]",
            "Open the project's checkout directory in the code launcher.",
            Arity::Between(0, 1),
            |args| {
                Ok(Command::Code {
                    project: args.first().map(|value| owned(value)),
                })
            },
        ),
        CommandDefinition::new(
            names::BACKUP,
            "backup",
            "Dump, then commit the data directory with version control.",
            Arity::Exact(0),
            |_| Ok(Command::Backup),
        ),
        CommandDefinition::new(
            names::HELP,
            "help",
            "Toggle this help overlay.",
            Arity::Exact(0),
            |_| Ok(Command::Help),
        ),
        CommandDefinition::new(
            names::CATALOG,
            "catalog",
            "Toggle the category/context catalog overlay.",
            Arity::Exact(0),
            |_| Ok(Command::Catalog),
        ),
        CommandDefinition::new(
            names::QUIT,
            "quit",
            "Leave pm.",
            Arity::Exact(0),
            |_| Ok(Command::Quit),
        ),
    ]
}

fn owned(value: &str) -> String {
    value.to_owned()
}

/// Splits off the leading project token when the caller supplied more than
/// the `required` trailing arguments.
fn split_optional_project<'a, 'b>(
    args: &'b [&'a str],
    required: usize,
) -> (Option<String>, &'b [&'a str]) {
    if args.len() > required {
        (Some(owned(args[0])), &args[1..])
    } else {
        (None, args)
    }
}
