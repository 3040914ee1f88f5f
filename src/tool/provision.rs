//! Copies the build tool distribution into the workspace

use crate::core::Workspace;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

/// Copy `home` into the workspace tool dir and make the launcher executable
///
/// Existing files in the tool dir are overwritten. `launcher` is relative
/// to the tool dir.
pub async fn provision_tool(
    home: &Path,
    workspace: &Workspace,
    launcher: Option<&Path>,
) -> io::Result<PathBuf> {
    let target = workspace.tool_dir();
    info!("Provisioning build tool from {} into {}", home.display(), target.display());

    copy_tree(home, &target).await?;

    if let Some(launcher) = launcher {
        let path = target.join(launcher);
        if fs::try_exists(&path).await? {
            make_executable(&path).await?;
        } else {
            debug!("Launcher {} not present after provisioning", path.display());
        }
    }

    Ok(target)
}

async fn copy_tree(from: &Path, to: &Path) -> io::Result<()> {
    let mut pending = vec![(from.to_path_buf(), to.to_path_buf())];

    while let Some((src, dst)) = pending.pop() {
        fs::create_dir_all(&dst).await?;
        let mut entries = fs::read_dir(&src).await?;
        while let Some(entry) = entries.next_entry().await? {
            let dest = dst.join(entry.file_name());
            if entry.file_type().await?.is_dir() {
                pending.push((entry.path(), dest));
            } else {
                fs::copy(entry.path(), dest).await?;
            }
        }
    }

    Ok(())
}

#[cfg(unix)]
async fn make_executable(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).await
}

#[cfg(not(unix))]
async fn make_executable(_path: &Path) -> io::Result<()> {
    Ok(())
}
