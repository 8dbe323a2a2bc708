//! # Process specification for supervised execution.
//!
//! Defines [`ProcessSpec`], an immutable description of what to launch, and
//! [`ProcessOptions`], the configuration bag of spawn parameters that is
//! passed through to the OS untouched by the supervisor.
//!
//! A spec is either:
//! - **Program**: an executable path plus an ordered argument list, executed
//!   directly (no shell parsing, no PATH games beyond the OS loader's), or
//! - **Shell**: a single command line handed to a shell (`<shell> -c <line>`),
//!   which performs its own parsing, quoting and PATH resolution. The shell
//!   reports exit code 127 when the requested command cannot be found.

use std::path::PathBuf;
use std::process::Stdio;

use tokio::process::Command;

/// Immutable description of what to launch.
///
/// ## Example
/// ```rust
/// use procvisor::ProcessSpec;
///
/// let direct = ProcessSpec::program("/bin/echo", ["hello", "world"]);
/// assert_eq!(direct.display_name(), "/bin/echo");
///
/// let via_shell = ProcessSpec::shell("echo hello | tr a-z A-Z");
/// assert_eq!(via_shell.display_name(), "echo hello | tr a-z A-Z");
/// ```
#[derive(Clone, Debug)]
pub struct ProcessSpec {
    kind: SpecKind,
}

#[derive(Clone, Debug)]
enum SpecKind {
    Program { program: String, args: Vec<String> },
    Shell { command_line: String },
}

impl ProcessSpec {
    /// Creates a spec that executes `program` directly with `args`.
    pub fn program(
        program: impl Into<String>,
        args: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            kind: SpecKind::Program {
                program: program.into(),
                args: args.into_iter().map(Into::into).collect(),
            },
        }
    }

    /// Creates a spec that hands `command_line` to a shell (`sh -c`).
    pub fn shell(command_line: impl Into<String>) -> Self {
        Self {
            kind: SpecKind::Shell {
                command_line: command_line.into(),
            },
        }
    }

    /// Returns the program path or shell command line, for logs and errors.
    pub fn display_name(&self) -> &str {
        match &self.kind {
            SpecKind::Program { program, .. } => program,
            SpecKind::Shell { command_line } => command_line,
        }
    }

    /// Builds the spawnable command for this spec under the given options.
    ///
    /// The returned command has stdio, cwd, environment and session settings
    /// already applied.
    pub(crate) fn command(&self, options: &ProcessOptions) -> Command {
        let mut cmd = match &self.kind {
            SpecKind::Program { program, args } => {
                let mut cmd = Command::new(program);
                cmd.args(args);
                cmd
            }
            SpecKind::Shell { command_line } => {
                let mut cmd = Command::new(&options.shell);
                cmd.arg("-c").arg(command_line);
                cmd
            }
        };

        if let Some(cwd) = &options.cwd {
            cmd.current_dir(cwd);
        }
        if options.clear_env {
            cmd.env_clear();
        }
        cmd.envs(options.env.iter().map(|(k, v)| (k.as_str(), v.as_str())));

        cmd.stdin(if options.pipe_stdin {
            Stdio::piped()
        } else {
            Stdio::null()
        });
        if options.capture_output {
            cmd.stdout(Stdio::piped());
            cmd.stderr(Stdio::piped());
        } else {
            cmd.stdout(Stdio::null());
            cmd.stderr(Stdio::null());
        }

        if options.detached {
            // Detach into a fresh session so the child (and anything it
            // spawns) forms its own process group with no controlling
            // terminal. Safety: setsid(2) is async-signal-safe and runs in
            // the forked child before exec.
            unsafe {
                cmd.pre_exec(|| {
                    if libc::setsid() == -1 {
                        return Err(std::io::Error::last_os_error());
                    }
                    Ok(())
                });
            }
        }

        cmd
    }
}

/// Spawn parameters for one child process.
///
/// The supervisor treats this as an opaque bag: every field is forwarded to
/// the spawn call unchanged.
///
/// ## Field semantics
/// - `cwd`: working directory override (`None` = inherit)
/// - `env`: environment variable overrides, applied on top of the inherited
///   (or cleared) environment
/// - `clear_env`: start from an empty environment before applying `env`
/// - `detached`: run the child in its own session/process group (`setsid`)
/// - `capture_output`: pipe stdout/stderr into the output callbacks;
///   when `false` both streams are discarded and no output callback fires
/// - `pipe_stdin`: keep a writable stdin pipe for
///   [`write_stdin`](crate::ChildProcess::write_stdin)
/// - `shell`: interpreter used for [`ProcessSpec::shell`] specs
#[derive(Clone, Debug)]
pub struct ProcessOptions {
    /// Working directory override.
    pub cwd: Option<PathBuf>,
    /// Environment variable overrides.
    pub env: Vec<(String, String)>,
    /// Start from an empty environment before applying `env`.
    pub clear_env: bool,
    /// Run the child in its own session (`setsid`).
    pub detached: bool,
    /// Pipe stdout/stderr into the output callbacks.
    pub capture_output: bool,
    /// Keep a writable stdin pipe.
    pub pipe_stdin: bool,
    /// Shell used for command-line specs.
    pub shell: PathBuf,
}

impl Default for ProcessOptions {
    /// Provides defaults that capture output, pipe stdin, inherit the
    /// environment and working directory, stay attached, and use `/bin/sh`.
    fn default() -> Self {
        Self {
            cwd: None,
            env: Vec::new(),
            clear_env: false,
            detached: false,
            capture_output: true,
            pipe_stdin: true,
            shell: PathBuf::from("/bin/sh"),
        }
    }
}

impl ProcessOptions {
    /// Returns new options with the working directory overridden.
    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    /// Returns new options with one more environment override.
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Returns new options with the detached flag set.
    pub fn detached(mut self) -> Self {
        self.detached = true;
        self
    }

    /// Returns new options with output capture toggled.
    pub fn with_capture_output(mut self, capture: bool) -> Self {
        self.capture_output = capture;
        self
    }

    /// Returns new options with stdin piping toggled.
    pub fn with_pipe_stdin(mut self, pipe: bool) -> Self {
        self.pipe_stdin = pipe;
        self
    }
}
