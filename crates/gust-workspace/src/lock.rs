//! Workspace-scoped advisory lock so concurrent invocations against the
//! same package root serialize instead of racing.

use crate::WorkspaceError;
use fs4::FileExt;
use std::fs::{self, File};
use std::path::Path;

pub struct WorkspaceLock {
    file: File,
}

impl WorkspaceLock {
    /// Acquire an exclusive lock on `<root>/.gust/workspace.lock`, creating
    /// the parent directory and lock file if needed.
    pub fn acquire(root: &Path) -> Result<Self, WorkspaceError> {
        let path = crate::controller::workspace_path(root);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = File::options().create(true).write(true).open(&path)?;
        file.lock_exclusive()
            .map_err(|e| WorkspaceError::InvalidConfig(format!("failed to lock workspace: {e}")))?;
        Ok(Self { file })
    }
}

impl Drop for WorkspaceLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}
