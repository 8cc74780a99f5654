use std::path::Path;
use std::process::{Command, Stdio};

/// Opens each file with the platform viewer. Failures are logged and ignored.
pub fn open_previews(files: &[impl AsRef<Path>]) {
    for file in files {
        let path = file.as_ref();
        match viewer_command(path).stdout(Stdio::null()).stderr(Stdio::null()).status() {
            Ok(status) if status.success() => {
                tracing::debug!(path = %path.display(), "opened preview");
            }
            Ok(status) => {
                tracing::debug!(path = %path.display(), %status, "preview viewer exited unsuccessfully");
            }
            Err(err) => {
                tracing::debug!(path = %path.display(), error = %err, "failed to open preview");
            }
        }
    }
}

fn viewer_command(path: &Path) -> Command {
    if cfg!(target_os = "macos") {
        let mut command = Command::new("open");
        command.arg(path);
        command
    } else if cfg!(target_os = "windows") {
        let mut command = Command::new("cmd");
        command.args(["/C", "start", ""]).arg(path);
        command
    } else {
        let mut command = Command::new("xdg-open");
        command.arg(path);
        command
    }
}
