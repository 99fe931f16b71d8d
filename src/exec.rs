use std::{
    ffi::OsString,
    fmt,
    path::Path,
    process::{Command, Stdio},
};

/// An external program invocation as an argument vector. No shell is involved.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ToolCommand {
    /// Program looked up on `PATH`.
    pub program: String,
    /// Arguments, passed verbatim.
    pub args: Vec<OsString>,
}

impl ToolCommand {
    /// Start a command for `program`.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Append one argument.
    pub fn arg(&mut self, arg: impl Into<OsString>) -> &mut Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments.
    pub fn args<I, S>(&mut self, args: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Arguments as lossy UTF-8, handy for assertions and logs.
    pub fn args_lossy(&self) -> Vec<String> {
        self.args
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }
}

/// Shell-like rendering for logs; arguments with special characters are single-quoted.
impl fmt::Display for ToolCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in self.args_lossy() {
            let plain = !arg.is_empty()
                && arg
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || "-_./:=+,".contains(c));
            if plain {
                write!(f, " {arg}")?;
            } else {
                write!(f, " '{}'", arg.replace('\'', r"'\''"))?;
            }
        }
        Ok(())
    }
}

/// Outcome of a finished child process.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ToolOutput {
    /// Exit code, `None` when killed by a signal.
    pub code: Option<i32>,
    /// Captured standard error.
    pub stderr: String,
}

impl ToolOutput {
    /// A zero exit.
    pub fn ok() -> Self {
        Self {
            code: Some(0),
            stderr: String::new(),
        }
    }

    /// A non-zero exit with diagnostic text.
    pub fn failed(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            stderr: stderr.into(),
        }
    }

    /// Whether the process exited with status 0.
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Runs external tools (`unzip`, `ffmpeg`). Tests substitute recording doubles.
pub trait ToolRunner {
    /// Run `cmd` to completion. `Err` means the process could not be started.
    fn run(&mut self, cmd: &ToolCommand) -> std::io::Result<ToolOutput>;
}

/// Spawns real processes with stdin/stdout detached and stderr captured.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemRunner;

impl ToolRunner for SystemRunner {
    fn run(&mut self, cmd: &ToolCommand) -> std::io::Result<ToolOutput> {
        tracing::debug!(command = %cmd, "running");
        let out = Command::new(&cmd.program)
            .args(&cmd.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()?;
        Ok(ToolOutput {
            code: out.status.code(),
            stderr: String::from_utf8_lossy(&out.stderr).trim().to_string(),
        })
    }
}

/// `unzip -q <zip> -d <dest>`.
pub fn unzip_command(zip: &Path, dest: &Path) -> ToolCommand {
    let mut cmd = ToolCommand::new("unzip");
    cmd.arg("-q").arg(zip).arg("-d").arg(dest);
    cmd
}

/// Whether `program -version`-style probing succeeds, i.e. the tool is on `PATH`.
pub fn is_tool_on_path(program: &str, version_flag: &str) -> bool {
    Command::new(program)
        .arg(version_flag)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}
