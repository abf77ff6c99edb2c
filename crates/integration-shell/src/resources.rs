use std::ffi::OsString;
use std::fs;
use std::path::PathBuf;

use pm_core::{CoreError, Resource, ResourceAction, ResourceFetcher, ResourceKind};

use crate::notes::path_component;
use crate::runner::{CommandRunner, Tool};

/// Checks repositories out to `<repos>/<project>/<resource>` with git or svn
/// and hands links to the system opener. Checkouts and updates are launched
/// detached and not awaited.
pub struct VcsResourceFetcher<R: CommandRunner> {
    runner: R,
    git: Tool,
    svn: Tool,
    opener: Tool,
    repos_dir: PathBuf,
}

impl<R: CommandRunner> VcsResourceFetcher<R> {
    pub fn new(
        runner: R,
        git: &str,
        svn: &str,
        opener: &str,
        repos_dir: impl Into<PathBuf>,
    ) -> Result<Self, CoreError> {
        Ok(Self {
            runner,
            git: Tool::parse("git", git)?,
            svn: Tool::parse("svn", svn)?,
            opener: Tool::parse("opener", opener)?,
            repos_dir: repos_dir.into(),
        })
    }

    pub fn checkout_path(&self, project: &str, name: &str) -> Result<PathBuf, CoreError> {
        Ok(self
            .repos_dir
            .join(path_component(project)?)
            .join(path_component(name)?))
    }

    fn clone_into(&self, resource: &Resource, target: PathBuf) -> Result<(), CoreError> {
        if target.exists() {
            return Err(CoreError::PreconditionViolation(format!(
                "{} already exists; use update instead",
                target.display()
            )));
        }
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|error| {
                CoreError::Persistence(format!(
                    "failed to create checkout directory {}: {error}",
                    parent.display()
                ))
            })?;
        }

        let source = OsString::from(&resource.source);
        let target = OsString::from(target);
        match resource.kind {
            ResourceKind::Git => self
                .git
                .spawn_detached(&self.runner, vec!["clone".into(), source, target]),
            ResourceKind::Svn => self
                .svn
                .spawn_detached(&self.runner, vec!["checkout".into(), source, target]),
            ResourceKind::Link => link_not_fetchable(),
        }
    }

    fn update(&self, resource: &Resource, target: PathBuf) -> Result<(), CoreError> {
        if !target.is_dir() {
            return Err(CoreError::PreconditionViolation(format!(
                "{} is not checked out; clone it first",
                target.display()
            )));
        }

        let target = OsString::from(target);
        match resource.kind {
            ResourceKind::Git => self.git.spawn_detached(
                &self.runner,
                vec!["-C".into(), target, "pull".into(), "--ff-only".into()],
            ),
            ResourceKind::Svn => self
                .svn
                .spawn_detached(&self.runner, vec!["update".into(), target]),
            ResourceKind::Link => link_not_fetchable(),
        }
    }
}

fn link_not_fetchable() -> Result<(), CoreError> {
    Err(CoreError::PreconditionViolation(
        "link resources can only be opened".to_owned(),
    ))
}

impl<R: CommandRunner> ResourceFetcher for VcsResourceFetcher<R> {
    fn fetch(
        &self,
        project: &str,
        name: &str,
        resource: &Resource,
        action: ResourceAction,
    ) -> Result<(), CoreError> {
        if !resource.kind.is_repository() && action != ResourceAction::Open {
            return link_not_fetchable();
        }

        let target = self.checkout_path(project, name)?;
        match action {
            ResourceAction::Clone => self.clone_into(resource, target),
            ResourceAction::Update => self.update(resource, target),
            ResourceAction::Open => {
                // Prefer the local checkout when there is one.
                let location = if resource.kind.is_repository() && target.is_dir() {
                    OsString::from(target)
                } else {
                    OsString::from(&resource.source)
                };
                self.opener.spawn_detached(&self.runner, vec![location])
            }
        }
    }

    fn is_cloned(&self, project: &str, name: &str) -> bool {
        self.checkout_path(project, name)
            .map(|path| path.is_dir())
            .unwrap_or(false)
    }
}
