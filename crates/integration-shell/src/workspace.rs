use std::ffi::OsString;
use std::fs;
use std::path::PathBuf;

use pm_core::{CoreError, WorkspaceLauncher};

use crate::notes::path_component;
use crate::runner::{CommandRunner, Tool};

const BACKUP_COMMIT_MESSAGE: &str = "pm backup";

pub struct ShellWorkspaceLauncher<R: CommandRunner> {
    runner: R,
    code: Tool,
    git: Tool,
    repos_dir: PathBuf,
    data_dir: PathBuf,
}

impl<R: CommandRunner> ShellWorkspaceLauncher<R> {
    pub fn new(
        runner: R,
        code: &str,
        git: &str,
        repos_dir: impl Into<PathBuf>,
        data_dir: impl Into<PathBuf>,
    ) -> Result<Self, CoreError> {
        Ok(Self {
            runner,
            code: Tool::parse("code launcher", code)?,
            git: Tool::parse("git", git)?,
            repos_dir: repos_dir.into(),
            data_dir: data_dir.into(),
        })
    }

    fn git_in_data_dir(&self, args: &[&str]) -> Vec<OsString> {
        let mut rendered = vec![OsString::from("-C"), OsString::from(&self.data_dir)];
        rendered.extend(args.iter().map(OsString::from));
        rendered
    }
}

impl<R: CommandRunner> WorkspaceLauncher for ShellWorkspaceLauncher<R> {
    fn open_code(&self, project: &str) -> Result<(), CoreError> {
        let directory = self.repos_dir.join(path_component(project)?);
        fs::create_dir_all(&directory).map_err(|error| {
            CoreError::Persistence(format!(
                "failed to create project directory {}: {error}",
                directory.display()
            ))
        })?;
        self.code
            .spawn_detached(&self.runner, vec![OsString::from(directory)])
    }

    /// Commits everything in the data directory, initializing a repository
    /// there on first use. A clean tree is not an error.
    fn backup(&self) -> Result<(), CoreError> {
        if !self.data_dir.join(".git").exists() {
            self.git.run(&self.runner, self.git_in_data_dir(&["init"]))?;
        }
        self.git
            .run(&self.runner, self.git_in_data_dir(&["add", "-A"]))?;

        let commit = self.git_in_data_dir(&["commit", "-m", BACKUP_COMMIT_MESSAGE]);
        let output = self.git.run_unchecked(&self.runner, commit.clone())?;
        if output.status.success() {
            tracing::info!(data_dir = %self.data_dir.display(), "backup committed");
            return Ok(());
        }
        if String::from_utf8_lossy(&output.stdout).contains("nothing to commit") {
            tracing::info!(data_dir = %self.data_dir.display(), "backup skipped; nothing changed");
            return Ok(());
        }
        Err(self.git.failure(commit, &output))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::test_support::*;

    fn launcher(
        dir: &TempDir,
        results: Vec<std::io::Result<std::process::Output>>,
    ) -> ShellWorkspaceLauncher<StubRunner> {
        ShellWorkspaceLauncher::new(
            StubRunner::with_results(results),
            "code",
            "git",
            dir.path.join("repos"),
            dir.path.join("data"),
        )
        .expect("launcher")
    }

    #[test]
    fn open_code_launches_project_directory() {
        let dir = TempDir::new("open-code");
        let launcher = launcher(&dir, vec![Ok(success_output())]);

        launcher.open_code("alpha").expect("open code");

        let directory = dir.path.join("repos").join("alpha");
        assert!(directory.is_dir());
        assert_eq!(
            launcher.runner.recorded(),
            vec![(
                CallKind::Detached,
                "code".to_owned(),
                vec![directory.to_string_lossy().to_string()],
            )]
        );
    }

    #[test]
    fn backup_initializes_then_commits_data_directory() {
        let dir = TempDir::new("backup-init");
        let launcher = launcher(
            &dir,
            vec![Ok(success_output()), Ok(success_output()), Ok(success_output())],
        );

        launcher.backup().expect("backup");

        let data = dir.path.join("data").to_string_lossy().to_string();
        let subcommands = launcher
            .runner
            .recorded()
            .into_iter()
            .map(|(_, program, args)| {
                assert_eq!(program, "git");
                assert_eq!(args[..2], ["-C".to_owned(), data.clone()]);
                args[2].clone()
            })
            .collect::<Vec<_>>();
        assert_eq!(subcommands, vec!["init", "add", "commit"]);
    }

    #[test]
    fn backup_with_clean_tree_succeeds() {
        let dir = TempDir::new("backup-clean");
        fs::create_dir_all(dir.path.join("data").join(".git")).expect("fake repository");
        let launcher = launcher(
            &dir,
            vec![
                Ok(success_output()),
                Ok(output_with_status(1, b"nothing to commit, working tree clean\n", b"")),
            ],
        );

        launcher.backup().expect("clean backup");
        assert_eq!(launcher.runner.recorded().len(), 2);
    }

    #[test]
    fn failed_commit_is_reported() {
        let dir = TempDir::new("backup-fail");
        fs::create_dir_all(dir.path.join("data").join(".git")).expect("fake repository");
        let launcher = launcher(
            &dir,
            vec![
                Ok(success_output()),
                Ok(output_with_status(128, b"", b"fatal: unable to auto-detect email\n")),
            ],
        );

        let err = launcher.backup().expect_err("commit fails");
        assert!(matches!(err, CoreError::DependencyUnavailable(_)));
        assert!(err.to_string().contains("unable to auto-detect email"));
    }
}
