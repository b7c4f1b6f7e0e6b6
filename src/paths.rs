//! Workspace root location and every path derived from it (§4.8, §6).

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Environment variable naming the workspace root. The design leaves the
/// exact name to the implementer (§6 calls it `<ROOT_ENV>` abstractly); we
/// pick `JIRUST_ROOT`.
pub const ROOT_ENV: &str = "JIRUST_ROOT";

/// Environment variable forwarded verbatim to VCS subprocesses when set.
pub const EDITOR_ENV: &str = "EDITOR";

pub const ROOT_META_DIR: &str = ".jirust_root";
pub const PROJECT_META_DIR: &str = ".jirust";
pub const METADATA_FILE_NAME: &str = "metadata.v2";
pub const PRIMARY_MANIFEST_FILE: &str = ".jirust_manifest";
pub const SNAPSHOT_ROOT_DIR_NAME: &str = "snapshots";
pub const UPDATE_HISTORY_DIR_NAME: &str = "update_history";
pub const MANIFEST_ROOT_DIR_NAME: &str = "manifest";
pub const MANIFEST_V2_SUBDIR: &str = "v2";
pub const LATEST_SNAPSHOT_LINK: &str = "latest";

#[derive(Debug, Error)]
pub enum PathsError {
    #[error("environment variable {0} is not set; cannot locate the workspace root")]
    RootEnvNotSet(&'static str),

    #[error("failed to resolve workspace root {path}")]
    Canonicalize {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// The one context object every other component is handed a reference to
/// (§9's "Context object" redesign note): resolves `<ROOT_ENV>` once and
/// derives every other path from it, instead of re-reading the environment
/// or hard-coding relative paths throughout the codebase.
#[derive(Debug, Clone)]
pub struct RootPaths {
    root: PathBuf,
    snapshot_root_override: Option<PathBuf>,
}

impl RootPaths {
    pub fn from_env() -> Result<Self, PathsError> {
        let raw = std::env::var(ROOT_ENV).map_err(|_| PathsError::RootEnvNotSet(ROOT_ENV))?;
        Self::new(raw)
    }

    pub fn new(path: impl AsRef<Path>) -> Result<Self, PathsError> {
        let path = path.as_ref();
        let root = path
            .canonicalize()
            .map_err(|source| PathsError::Canonicalize {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(Self {
            root,
            snapshot_root_override: None,
        })
    }

    /// Scoped override, per §9: building a new record rather than mutating
    /// process-global state.
    pub fn with_snapshot_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.snapshot_root_override = Some(path.into());
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn root_meta_dir(&self) -> PathBuf {
        self.root.join(ROOT_META_DIR)
    }

    pub fn bin_dir(&self) -> PathBuf {
        self.root_meta_dir().join("bin")
    }

    pub fn update_history_dir(&self) -> PathBuf {
        self.root_meta_dir().join(UPDATE_HISTORY_DIR_NAME)
    }

    pub fn update_history_latest_link(&self) -> PathBuf {
        self.update_history_dir().join(LATEST_SNAPSHOT_LINK)
    }

    pub fn default_snapshot_root(&self) -> PathBuf {
        self.snapshot_root_override
            .clone()
            .unwrap_or_else(|| self.root_meta_dir().join(SNAPSHOT_ROOT_DIR_NAME))
    }

    pub fn manifest_root(&self) -> PathBuf {
        self.root.join(MANIFEST_ROOT_DIR_NAME)
    }

    pub fn manifest_v2_dir(&self) -> PathBuf {
        self.manifest_root().join(MANIFEST_V2_SUBDIR)
    }

    pub fn primary_manifest_file(&self) -> PathBuf {
        self.root.join(PRIMARY_MANIFEST_FILE)
    }

    /// Resolve a manifest name to a file path (§4.2 `resolve_manifest_path`):
    /// absolute names are used as-is; otherwise a root-local file of the
    /// same name overrides the manifest-root copy (legacy); otherwise it is
    /// resolved under `<manifest-root>/v2/`.
    pub fn resolve_manifest_path(&self, name: &str) -> PathBuf {
        let candidate = Path::new(name);
        if candidate.is_absolute() {
            return candidate.to_path_buf();
        }
        let local_override = self.root.join(name);
        if local_override.is_file() {
            return local_override;
        }
        self.manifest_v2_dir().join(name)
    }

    pub fn to_absolute(&self, relative: &str) -> PathBuf {
        self.root.join(relative)
    }

    pub fn to_relative(&self, absolute: &Path) -> PathBuf {
        absolute
            .strip_prefix(&self.root)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| absolute.to_path_buf())
    }
}
