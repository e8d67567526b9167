use crate::error::LaunchError;
use crate::platform::Platform;
use std::ffi::OsStr;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

pub const DEFAULT_LINUX_TERMINAL: &str = "gnome-terminal";

/// Runs `"$0"`, removes it, then stays at an interactive prompt.
const LINUX_SESSION: &str = r#""$0"; rm -f -- "$0"; exec bash"#;

/// Starts a materialized script somewhere the user can watch it.
pub trait Launcher {
    /// Platform whose script flavour (`.sh` / `.ps1`) this launcher runs.
    fn platform(&self) -> &Platform;

    /// Start `script_body` and return the path of the file it runs from.
    /// Does not wait for the script.
    fn launch(&self, script_body: &str) -> Result<PathBuf, LaunchError>;
}

/// How a new terminal window is opened on each platform family.
#[derive(Debug, Clone, PartialEq, Eq)]
enum TerminalKind {
    PowerShellWindow,
    MacTerminal,
    Linux { program: String },
    Unsupported,
}

/// Opens a new interactive terminal that runs the script and deletes it.
#[derive(Debug, Clone)]
pub struct TerminalLauncher {
    platform: Platform,
    kind: TerminalKind,
    /// Where materialized scripts are written.
    temp_dir: PathBuf,
}

impl TerminalLauncher {
    /// `terminal` overrides the emulator used on Linux.
    pub fn with_terminal(platform: Platform, terminal: Option<String>) -> Self {
        let kind = match &platform {
            Platform::Windows => TerminalKind::PowerShellWindow,
            Platform::MacOs => TerminalKind::MacTerminal,
            Platform::Linux => TerminalKind::Linux {
                program: terminal.unwrap_or_else(|| DEFAULT_LINUX_TERMINAL.to_string()),
            },
            Platform::Other(_) => TerminalKind::Unsupported,
        };
        Self {
            platform,
            kind,
            temp_dir: std::env::temp_dir(),
        }
    }

    /// Process that opens the terminal for `script`. `None` when unsupported.
    fn command(&self, script: &Path) -> Option<Command> {
        let script_str = script.to_string_lossy();
        let cmd = match &self.kind {
            TerminalKind::PowerShellWindow => {
                let quoted = powershell_quote(&script_str);
                let mut cmd = Command::new("powershell");
                cmd.args(["-NoExit", "-ExecutionPolicy", "Bypass", "-Command"])
                    .arg(format!("& {quoted}; Remove-Item -LiteralPath {quoted}"));
                cmd
            }
            TerminalKind::MacTerminal => {
                let quoted = shell_quote(&script_str);
                let session = format!("sh {quoted}; rm -f {quoted}");
                let mut cmd = Command::new("osascript");
                cmd.arg("-e").arg(format!(
                    "tell application \"Terminal\" to do script {}",
                    applescript_string(&session)
                ));
                cmd
            }
            TerminalKind::Linux { program } => {
                let separator = if is_gnome_terminal(program) { "--" } else { "-e" };
                let mut cmd = Command::new(program);
                cmd.args([separator, "bash", "-c", LINUX_SESSION]).arg(script);
                cmd
            }
            TerminalKind::Unsupported => return None,
        };
        Some(cmd)
    }
}

impl Launcher for TerminalLauncher {
    fn platform(&self) -> &Platform {
        &self.platform
    }

    fn launch(&self, script_body: &str) -> Result<PathBuf, LaunchError> {
        if self.kind == TerminalKind::Unsupported {
            return Err(LaunchError::UnsupportedPlatform {
                os: self.platform.to_string(),
            });
        }

        let script = write_temp_script(
            script_body,
            self.platform.script_extension(),
            &self.temp_dir,
        )?;
        let Some(mut cmd) = self.command(&script) else {
            discard(&script);
            return Err(LaunchError::UnsupportedPlatform {
                os: self.platform.to_string(),
            });
        };
        let program = cmd.get_program().to_string_lossy().into_owned();

        cmd.stdin(Stdio::null());
        new_console(&mut cmd);

        match cmd.spawn() {
            Ok(child) => {
                tracing::info!(
                    program = %program,
                    pid = child.id(),
                    script = %script.display(),
                    "terminal launched"
                );
                Ok(script)
            }
            Err(source) => {
                discard(&script);
                Err(LaunchError::SpawnFailed { program, source })
            }
        }
    }
}

/// Write `body` to a fresh `script_*.<extension>` file in `dir` that outlives
/// this process.
pub fn write_temp_script(body: &str, extension: &str, dir: &Path) -> Result<PathBuf, LaunchError> {
    let temp = |source| LaunchError::TempFile { source };

    let suffix = format!(".{extension}");
    let mut file = tempfile::Builder::new()
        .prefix("script_")
        .suffix(&suffix)
        .tempfile_in(dir)
        .map_err(temp)?;
    file.write_all(body.as_bytes()).map_err(temp)?;
    file.flush().map_err(temp)?;
    make_executable(file.path()).map_err(temp)?;

    let path = file
        .into_temp_path()
        .keep()
        .map_err(|err| LaunchError::TempFile { source: err.error })?;
    tracing::debug!(script = %path.display(), "temporary script written");
    Ok(path)
}

#[cfg(unix)]
fn make_executable(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o755))
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

#[cfg(windows)]
fn new_console(cmd: &mut Command) {
    use std::os::windows::process::CommandExt;
    const CREATE_NEW_CONSOLE: u32 = 0x0000_0010;
    cmd.creation_flags(CREATE_NEW_CONSOLE);
}

#[cfg(not(windows))]
fn new_console(_cmd: &mut Command) {}

fn discard(script: &Path) {
    if let Err(err) = fs::remove_file(script) {
        tracing::warn!(script = %script.display(), error = %err, "failed to remove temporary script");
    }
}

fn is_gnome_terminal(program: &str) -> bool {
    Path::new(program).file_name() == Some(OsStr::new("gnome-terminal"))
}

fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}

fn powershell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

fn applescript_string(s: &str) -> String {
    format!("\"{}\"", s.replace('\\', r"\\").replace('"', "\\\""))
}
