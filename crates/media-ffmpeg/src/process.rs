use std::process::{Command, Output};

use crate::error::{MediaFfmpegError, Result};

/// Runs `command` to completion and maps spawn failures and non-zero exits.
///
/// stderr is captured in full; the caller decides whether it is diagnostic
/// payload (black detection) or just error context.
pub(crate) fn run_to_completion(command: &mut Command, context: &'static str) -> Result<Output> {
    let output = command
        .output()
        .map_err(|source| MediaFfmpegError::Io { context, source })?;

    if !output.status.success() {
        return Err(MediaFfmpegError::CommandFailed {
            command: command_for_display(command),
            status: output.status,
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        });
    }

    Ok(output)
}

/// Renders a command line for error messages.
pub(crate) fn command_for_display(command: &Command) -> String {
    let mut rendered = command.get_program().to_string_lossy().into_owned();
    for arg in command.get_args() {
        rendered.push(' ');
        rendered.push_str(&arg.to_string_lossy());
    }
    rendered
}

#[cfg(test)]
mod tests {
    use std::process::Command;

    use super::command_for_display;

    #[test]
    fn command_for_display_joins_program_and_args() {
        let mut command = Command::new("ffmpeg");
        command.args(["-y", "-i", "in.mp4"]);

        assert_eq!(command_for_display(&command), "ffmpeg -y -i in.mp4");
    }
}
