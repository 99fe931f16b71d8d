use std::{
    cell::RefCell,
    path::{Path, PathBuf},
    rc::Rc,
};

use tempfile::TempDir;

use crate::foundation::error::{UgoiraError, UgoiraResult};

/// Directory under the temp root that holds every workspace.
pub const WORKSPACE_PARENT: &str = "ugoira-convert";

const NAME_LEN: usize = 32;

struct Active {
    dir: TempDir,
    refs: usize,
}

struct Inner {
    temp_root: PathBuf,
    active: Option<Active>,
}

/// Reference-counted owner of the per-conversion scratch directory.
///
/// The first [`acquire`](Self::acquire) creates
/// `<temp_root>/ugoira-convert/<32 random [a-zA-Z0-9]>`; nested acquires share it and
/// the directory is removed when the last [`WorkspaceGuard`] drops.
#[derive(Clone)]
pub struct WorkspaceManager {
    inner: Rc<RefCell<Inner>>,
}

impl Default for WorkspaceManager {
    fn default() -> Self {
        Self::new(std::env::temp_dir())
    }
}

impl std::fmt::Debug for WorkspaceManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("WorkspaceManager")
            .field("temp_root", &inner.temp_root)
            .field("current", &inner.active.as_ref().map(|a| a.dir.path()))
            .finish()
    }
}

impl WorkspaceManager {
    /// Manager allocating workspaces below `temp_root`.
    pub fn new(temp_root: impl Into<PathBuf>) -> Self {
        Self {
            inner: Rc::new(RefCell::new(Inner {
                temp_root: temp_root.into(),
                active: None,
            })),
        }
    }

    /// Change the temp root. Takes effect on the next 0→1 acquire.
    pub fn set_temp_root(&self, temp_root: impl Into<PathBuf>) {
        self.inner.borrow_mut().temp_root = temp_root.into();
    }

    /// `<temp_root>/ugoira-convert`.
    pub fn parent_dir(&self) -> PathBuf {
        self.inner.borrow().temp_root.join(WORKSPACE_PARENT)
    }

    /// Path of the live workspace, if any guard is held.
    pub fn current(&self) -> Option<PathBuf> {
        self.inner
            .borrow()
            .active
            .as_ref()
            .map(|a| a.dir.path().to_path_buf())
    }

    /// Take a reference on the workspace, creating it if none is live.
    pub fn acquire(&self) -> UgoiraResult<WorkspaceGuard> {
        let mut inner = self.inner.borrow_mut();
        if let Some(active) = inner.active.as_mut() {
            active.refs += 1;
            return Ok(WorkspaceGuard {
                path: active.dir.path().to_path_buf(),
                owner: self.clone(),
            });
        }

        let parent = inner.temp_root.join(WORKSPACE_PARENT);
        std::fs::create_dir_all(&parent).map_err(|e| {
            UgoiraError::workspace(format!(
                "failed to create '{}': {e}",
                parent.display()
            ))
        })?;

        // mkdir fails on collision and tempfile retries with a fresh name.
        let dir = tempfile::Builder::new()
            .prefix("")
            .suffix("")
            .rand_bytes(NAME_LEN)
            .tempdir_in(&parent)
            .map_err(|e| {
                UgoiraError::workspace(format!(
                    "failed to create a workspace in '{}': {e}",
                    parent.display()
                ))
            })?;

        tracing::debug!(path = %dir.path().display(), "workspace created");
        let path = dir.path().to_path_buf();
        inner.active = Some(Active { dir, refs: 1 });
        Ok(WorkspaceGuard {
            path,
            owner: self.clone(),
        })
    }

    fn release(&self) {
        let finished = {
            let mut inner = self.inner.borrow_mut();
            let Some(active) = inner.active.as_mut() else {
                return;
            };
            active.refs -= 1;
            if active.refs > 0 {
                return;
            }
            inner.active.take()
        };

        if let Some(active) = finished {
            let path = active.dir.path().to_path_buf();
            match active.dir.close() {
                Ok(()) => tracing::debug!(path = %path.display(), "workspace removed"),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "failed to remove workspace")
                }
            }
        }
    }
}

/// A held reference on the workspace; dropping it releases the reference.
pub struct WorkspaceGuard {
    path: PathBuf,
    owner: WorkspaceManager,
}

impl WorkspaceGuard {
    /// Workspace directory.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for WorkspaceGuard {
    fn drop(&mut self) {
        self.owner.release();
    }
}
