use std::ffi::OsString;
use std::io;
use std::process::{Command, ExitStatus, Output, Stdio};

use pm_core::CoreError;

pub trait CommandRunner: Send + Sync {
    /// Runs to completion with captured output.
    fn run(&self, program: &str, args: &[OsString]) -> io::Result<Output>;
    /// Runs to completion attached to the current terminal.
    fn run_interactive(&self, program: &str, args: &[OsString]) -> io::Result<ExitStatus>;
    /// Starts a process without waiting for it.
    fn spawn_detached(&self, program: &str, args: &[OsString]) -> io::Result<()>;
}

#[derive(Debug, Default)]
pub struct ProcessCommandRunner;

impl CommandRunner for ProcessCommandRunner {
    fn run(&self, program: &str, args: &[OsString]) -> io::Result<Output> {
        Command::new(program).args(args).output()
    }

    fn run_interactive(&self, program: &str, args: &[OsString]) -> io::Result<ExitStatus> {
        Command::new(program).args(args).status()
    }

    fn spawn_detached(&self, program: &str, args: &[OsString]) -> io::Result<()> {
        Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map(|_| ())
    }
}

/// A configured external program. The configured value may carry leading
/// arguments, as in `code --wait`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Tool {
    label: &'static str,
    program: String,
    base_args: Vec<OsString>,
}

impl Tool {
    pub(crate) fn parse(label: &'static str, raw: &str) -> Result<Self, CoreError> {
        let mut parts = raw.split_whitespace();
        let program = parts.next().ok_or_else(|| {
            CoreError::Configuration(format!("{label} command is empty; set it in the pm config"))
        })?;
        Ok(Self {
            label,
            program: program.to_owned(),
            base_args: parts.map(OsString::from).collect(),
        })
    }

    pub(crate) fn args(&self, extra: Vec<OsString>) -> Vec<OsString> {
        let mut args = self.base_args.clone();
        args.extend(extra);
        args
    }

    pub(crate) fn run<R: CommandRunner>(
        &self,
        runner: &R,
        extra: Vec<OsString>,
    ) -> Result<Output, CoreError> {
        let args = self.args(extra);
        let output = self.output(runner, &args)?;
        if output.status.success() {
            return Ok(output);
        }
        Err(self.command_failed(&args, &output))
    }

    /// Like `run`, but leaves the exit status to the caller.
    pub(crate) fn run_unchecked<R: CommandRunner>(
        &self,
        runner: &R,
        extra: Vec<OsString>,
    ) -> Result<Output, CoreError> {
        let args = self.args(extra);
        self.output(runner, &args)
    }

    fn output<R: CommandRunner>(&self, runner: &R, args: &[OsString]) -> Result<Output, CoreError> {
        tracing::info!(tool = self.label, program = %self.program, args = %render_args(args), "running tool");
        runner
            .run(&self.program, args)
            .map_err(|error| self.launch_failed(error))
    }

    pub(crate) fn failure(&self, extra: Vec<OsString>, output: &Output) -> CoreError {
        let args = self.args(extra);
        self.command_failed(&args, output)
    }

    pub(crate) fn run_interactive<R: CommandRunner>(
        &self,
        runner: &R,
        extra: Vec<OsString>,
    ) -> Result<(), CoreError> {
        let args = self.args(extra);
        tracing::info!(tool = self.label, program = %self.program, args = %render_args(&args), "running interactive tool");
        let status = runner
            .run_interactive(&self.program, &args)
            .map_err(|error| self.launch_failed(error))?;
        if status.success() {
            return Ok(());
        }
        tracing::warn!(tool = self.label, %status, "interactive tool exited unsuccessfully");
        Err(CoreError::DependencyUnavailable(format!(
            "{} `{} {}` exited with {status}",
            self.label,
            self.program,
            render_args(&args)
        )))
    }

    pub(crate) fn spawn_detached<R: CommandRunner>(
        &self,
        runner: &R,
        extra: Vec<OsString>,
    ) -> Result<(), CoreError> {
        let args = self.args(extra);
        tracing::info!(tool = self.label, program = %self.program, args = %render_args(&args), "launching tool");
        runner
            .spawn_detached(&self.program, &args)
            .map_err(|error| self.launch_failed(error))
    }

    fn launch_failed(&self, error: io::Error) -> CoreError {
        tracing::warn!(tool = self.label, program = %self.program, %error, "failed to launch tool");
        match error.kind() {
            io::ErrorKind::NotFound => CoreError::DependencyUnavailable(format!(
                "{} `{}` was not found. Install it or point the pm config at a valid binary.",
                self.label, self.program
            )),
            _ => CoreError::DependencyUnavailable(format!(
                "Failed to execute {} `{}`: {error}",
                self.label, self.program
            )),
        }
    }

    fn command_failed(&self, args: &[OsString], output: &Output) -> CoreError {
        let detail = output_detail(output);
        tracing::warn!(tool = self.label, program = %self.program, %detail, "tool failed");
        CoreError::DependencyUnavailable(format!(
            "{} command failed (`{} {}`): {detail}",
            self.label,
            self.program,
            render_args(args)
        ))
    }
}

fn output_detail(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_owned();
    let stdout = String::from_utf8_lossy(&output.stdout).trim().to_owned();
    if !stderr.is_empty() {
        stderr
    } else if !stdout.is_empty() {
        stdout
    } else {
        format!("exit status {}", output.status)
    }
}

fn render_args(args: &[OsString]) -> String {
    args.iter()
        .map(|arg| arg.to_string_lossy().to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use std::collections::VecDeque;
    use std::path::PathBuf;
    use std::sync::Mutex;
    use std::time::{SystemTime, UNIX_EPOCH};

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub(crate) enum CallKind {
        Run,
        Interactive,
        Detached,
    }

    pub(crate) struct StubRunner {
        pub(crate) calls: Mutex<Vec<(CallKind, String, Vec<OsString>)>>,
        results: Mutex<VecDeque<io::Result<Output>>>,
    }

    impl StubRunner {
        pub(crate) fn with_results(results: Vec<io::Result<Output>>) -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                results: Mutex::new(VecDeque::from(results)),
            }
        }

        pub(crate) fn recorded(&self) -> Vec<(CallKind, String, Vec<String>)> {
            self.calls
                .lock()
                .expect("lock")
                .iter()
                .map(|(kind, program, args)| {
                    (
                        *kind,
                        program.clone(),
                        args.iter()
                            .map(|arg| arg.to_string_lossy().to_string())
                            .collect(),
                    )
                })
                .collect()
        }

        fn next(&self, kind: CallKind, program: &str, args: &[OsString]) -> io::Result<Output> {
            self.calls
                .lock()
                .expect("lock")
                .push((kind, program.to_owned(), args.to_vec()));

            self.results
                .lock()
                .expect("lock")
                .pop_front()
                .unwrap_or_else(|| {
                    Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "missing stubbed command output",
                    ))
                })
        }
    }

    impl CommandRunner for StubRunner {
        fn run(&self, program: &str, args: &[OsString]) -> io::Result<Output> {
            self.next(CallKind::Run, program, args)
        }

        fn run_interactive(&self, program: &str, args: &[OsString]) -> io::Result<ExitStatus> {
            self.next(CallKind::Interactive, program, args)
                .map(|output| output.status)
        }

        fn spawn_detached(&self, program: &str, args: &[OsString]) -> io::Result<()> {
            self.next(CallKind::Detached, program, args).map(|_| ())
        }
    }

    pub(crate) fn output_with_status(code: i32, stdout: &[u8], stderr: &[u8]) -> Output {
        #[cfg(unix)]
        {
            use std::os::unix::process::ExitStatusExt;
            Output {
                status: ExitStatus::from_raw(code << 8),
                stdout: stdout.to_vec(),
                stderr: stderr.to_vec(),
            }
        }
        #[cfg(windows)]
        {
            use std::os::windows::process::ExitStatusExt;
            Output {
                status: ExitStatus::from_raw(code as u32),
                stdout: stdout.to_vec(),
                stderr: stderr.to_vec(),
            }
        }
    }

    pub(crate) fn success_output() -> Output {
        output_with_status(0, &[], &[])
    }

    pub(crate) struct TempDir {
        pub(crate) path: PathBuf,
    }

    impl TempDir {
        pub(crate) fn new(label: &str) -> Self {
            let stamp = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .expect("time")
                .as_nanos();
            let path = std::env::temp_dir().join(format!(
                "pm-shell-{label}-{}-{stamp}",
                std::process::id()
            ));
            std::fs::create_dir_all(&path).expect("create temp dir");
            Self { path }
        }
    }

    impl Drop for TempDir {
        fn drop(&mut self) {
            let _ = std::fs::remove_dir_all(&self.path);
        }
    }
}
