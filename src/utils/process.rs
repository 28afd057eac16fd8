use crate::utils::error::{AppError, AppResult};
use std::collections::VecDeque;
use std::fs::File;
use std::path::Path;
use std::process::{Command, Stdio};

/// Split a command template into program + arguments.
///
/// Command templates come from the config file and are whitespace-split, the
/// same contract as the configured selector/editor commands.
pub fn split_command(command: &str) -> AppResult<(String, Vec<String>)> {
    let mut parts = command.split_whitespace().map(|s| s.to_string());
    let program = parts
        .next()
        .ok_or_else(|| AppError::System("Empty command".to_string()))?;
    Ok((program, parts.collect()))
}

/// Run an external tool, capturing combined output. Non-zero exit is an error
/// carrying the tool name and the captured output.
pub fn run_tool(command: &str, cwd: Option<&Path>) -> AppResult<String> {
    let (program, args) = split_command(command)?;

    let mut cmd = Command::new(&program);
    cmd.args(&args);
    if let Some(dir) = cwd {
        cmd.current_dir(dir);
    }

    let output = cmd.output().map_err(|e| {
        AppError::System(format!("Failed to run '{}': {}", program, e))
    })?;

    let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
    combined.push_str(&String::from_utf8_lossy(&output.stderr));

    if !output.status.success() {
        return Err(AppError::System(format!(
            "'{}' exited with {}:\n{}",
            program,
            output.status,
            combined.trim_end()
        )));
    }

    Ok(combined)
}

/// Run an external tool with stdout and stderr redirected to a log file.
/// Returns the exit status; the caller decides how much of the log to surface.
pub fn run_tool_logged(command: &str, cwd: &Path, log_path: &Path) -> AppResult<bool> {
    let (program, args) = split_command(command)?;

    let log = File::create(log_path)
        .map_err(|e| AppError::Io(format!("Failed to create {}: {}", log_path.display(), e)))?;
    let log_err = log
        .try_clone()
        .map_err(|e| AppError::Io(e.to_string()))?;

    let status = Command::new(&program)
        .args(&args)
        .current_dir(cwd)
        .stdout(Stdio::from(log))
        .stderr(Stdio::from(log_err))
        .status()
        .map_err(|e| AppError::System(format!("Failed to run '{}': {}", program, e)))?;

    Ok(status.success())
}

/// Last `n` lines of a file, for surfacing solver failures without dumping
/// the full log.
pub fn tail_lines(path: &Path, n: usize) -> AppResult<Vec<String>> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| AppError::Io(format!("Failed to read {}: {}", path.display(), e)))?;

    let mut dq: VecDeque<String> = VecDeque::with_capacity(n);
    for line in content.lines() {
        if dq.len() == n {
            dq.pop_front();
        }
        dq.push_back(line.to_string());
    }
    Ok(dq.into_iter().collect())
}
