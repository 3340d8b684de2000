// ─── Launch Task ───
// Builds the Java command line and spawns the game process.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

use crate::core::auth::LaunchAccountProfile;
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::events::EventSink;

use super::classpath::{join_classpath, safe_path_str};

/// Fixed window size passed on every launch.
pub const WINDOW_WIDTH: u32 = 854;
pub const WINDOW_HEIGHT: u32 = 480;

const OUTPUT_CHUNK: usize = 8 * 1024;

/// Values substituted into the descriptor's argument template.
pub struct ArgumentContext<'a> {
    pub profile: &'a LaunchAccountProfile,
    pub version_name: &'a str,
    pub game_dir: &'a Path,
    pub assets_index_name: &'a str,
}

/// Replace the known `${...}` tokens literally, split on whitespace and
/// append the window size.
pub fn build_game_args(template: &str, ctx: &ArgumentContext<'_>) -> Vec<String> {
    let game_dir = ctx.game_dir.to_string_lossy().to_string();
    let assets_root = ctx.game_dir.join("assets").to_string_lossy().to_string();

    let replacements: [(&str, &str); 9] = [
        ("${auth_player_name}", &ctx.profile.username),
        ("${version_name}", ctx.version_name),
        ("${game_directory}", &game_dir),
        ("${assets_root}", &assets_root),
        ("${assets_index_name}", ctx.assets_index_name),
        ("${auth_uuid}", &ctx.profile.uuid),
        ("${auth_access_token}", &ctx.profile.access_token),
        ("${user_properties}", &ctx.profile.user_properties),
        ("${user_type}", &ctx.profile.user_type),
    ];

    let mut resolved = template.to_string();
    for (token, value) in replacements {
        resolved = resolved.replace(token, value);
    }

    let mut args: Vec<String> = resolved.split_whitespace().map(str::to_string).collect();
    args.extend([
        "--width".to_string(),
        WINDOW_WIDTH.to_string(),
        "--height".to_string(),
        WINDOW_HEIGHT.to_string(),
    ]);
    args
}

/// Everything needed to start the game process.
#[derive(Debug, Clone)]
pub struct LaunchPlan {
    pub java: PathBuf,
    pub main_class: String,
    pub classpath: Vec<PathBuf>,
    pub natives_dir: PathBuf,
    pub game_dir: PathBuf,
    pub ram_mb: u64,
    pub game_args: Vec<String>,
}

impl LaunchPlan {
    pub fn jvm_args(&self) -> Vec<String> {
        let mut args = vec![
            format!("-Xmx{}M", self.ram_mb),
            format!("-Djava.library.path={}", safe_path_str(&self.natives_dir)),
        ];
        // LWJGL 2 needs the AppKit main thread.
        if cfg!(target_os = "macos") {
            args.push("-XstartOnFirstThread".into());
        }
        args
    }

    /// JVM args, `-cp <classpath>`, main class, then game args.
    pub fn command_args(&self) -> Vec<String> {
        let mut args = self.jvm_args();
        args.push("-cp".into());
        args.push(join_classpath(&self.classpath));
        args.push(self.main_class.clone());
        args.extend(self.game_args.iter().cloned());
        args
    }

    pub fn command(&self) -> Command {
        let mut cmd = Command::new(&self.java);
        cmd.args(self.command_args())
            .current_dir(&self.game_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        configure_platform_spawn(&mut cmd);
        cmd
    }
}

/// Start the game. Returns as soon as the process exists.
pub fn spawn(plan: &LaunchPlan, events: &dyn EventSink) -> LauncherResult<Child> {
    if plan.classpath.is_empty() {
        return Err(LauncherError::ProcessStart("empty classpath".into()));
    }

    let mut cmd = plan.command();
    let printable = format_command_for_logs(&plan.java, &plan.command_args());
    info!("Launching Minecraft with Java: {:?}", plan.java);
    debug!("Command (copy/paste): {}", printable);
    events.log(&format!("Executing: {}\n", printable));

    cmd.spawn()
        .map_err(|e| LauncherError::ProcessStart(format!("{}: {}", plan.java.display(), e)))
}

/// Copy a process stream to the host stdout and to the log channel,
/// one event per chunk read. A multi-byte character split across reads is
/// held back until it is complete. Returns the number of bytes forwarded.
pub async fn pump_output<R>(mut reader: R, events: &dyn EventSink) -> u64
where
    R: AsyncRead + Unpin,
{
    let mut stdout = tokio::io::stdout();
    let mut buf = vec![0u8; OUTPUT_CHUNK];
    let mut pending: Vec<u8> = Vec::new();
    let mut total = 0u64;

    loop {
        let n = match reader.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) => {
                warn!("Game output stream closed with error: {}", e);
                break;
            }
        };
        let chunk = &buf[..n];
        if stdout.write_all(chunk).await.is_ok() {
            let _ = stdout.flush().await;
        }
        total += n as u64;

        pending.extend_from_slice(chunk);
        let cut = complete_utf8_len(&pending);
        if cut > 0 {
            events.log(&String::from_utf8_lossy(&pending[..cut]));
            pending.drain(..cut);
        }
    }

    if !pending.is_empty() {
        events.log(&String::from_utf8_lossy(&pending));
    }
    total
}

/// Length of `bytes` without a trailing incomplete UTF-8 sequence.
/// Invalid bytes in the middle count as complete.
fn complete_utf8_len(bytes: &[u8]) -> usize {
    let mut start = 0;
    loop {
        match std::str::from_utf8(&bytes[start..]) {
            Ok(_) => return bytes.len(),
            Err(e) => match e.error_len() {
                Some(len) => start += e.valid_up_to() + len,
                None => return start + e.valid_up_to(),
            },
        }
    }
}

#[cfg(target_os = "windows")]
fn configure_platform_spawn(cmd: &mut Command) {
    const CREATE_NO_WINDOW: u32 = 0x0800_0000;
    cmd.creation_flags(CREATE_NO_WINDOW);
}

#[cfg(not(target_os = "windows"))]
fn configure_platform_spawn(_cmd: &mut Command) {}

fn format_command_for_logs(program: &Path, args: &[String]) -> String {
    let program = shell_escape(&program.to_string_lossy());
    let args = args
        .iter()
        .map(|arg| shell_escape(arg))
        .collect::<Vec<_>>()
        .join(" ");

    if args.is_empty() {
        program
    } else {
        format!("{} {}", program, args)
    }
}

fn shell_escape(raw: &str) -> String {
    if raw.is_empty() {
        return "\"\"".to_string();
    }

    if raw.chars().all(|ch| {
        ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.' | '/' | ':' | '\\' | '=' | ';')
    }) {
        return raw.to_string();
    }

    format!("\"{}\"", raw.replace('"', "\\\""))
}
