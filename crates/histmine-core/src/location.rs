//! Repository locations: local paths and remote URLs.

use crate::backend::BackendProvider;
use crate::error::{Error, Result};
use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{info, warn};

const REMOTE_PREFIXES: [&str; 3] = ["git@", "https://", "http://"];

/// True when `location` is a URL to clone rather than a local path.
pub fn is_remote(location: &str) -> bool {
    REMOTE_PREFIXES.iter().any(|p| location.starts_with(p))
}

/// Repository name from a clone URL: the last path segment without `.git`.
pub fn repo_name_from_url(url: &str) -> Result<String> {
    let Some(slash) = url.rfind('/') else {
        return Err(Error::MalformedUrl(url.to_string()));
    };
    let segment = &url[slash + 1..];
    let name = segment.strip_suffix(".git").unwrap_or(segment);
    if name.is_empty() {
        return Err(Error::MalformedUrl(url.to_string()));
    }
    Ok(name.to_string())
}

/// A local working copy for one location.
///
/// Session clones live in a temporary directory that is removed when the
/// checkout is dropped.
#[derive(Debug)]
pub struct Checkout {
    path: PathBuf,
    temp: Option<TempDir>,
}

impl Checkout {
    /// Resolve `location` to a local path, cloning remote URLs first.
    pub fn prepare(
        location: &str,
        clone_to: Option<&Path>,
        provider: &dyn BackendProvider,
    ) -> Result<Self> {
        if !is_remote(location) {
            return Ok(Self {
                path: PathBuf::from(location),
                temp: None,
            });
        }

        let name = repo_name_from_url(location)?;
        match clone_to {
            Some(dir) => {
                let dest = dir.join(&name);
                if is_populated(&dest)? {
                    info!(path = %dest.display(), "Reusing folder for {}", location);
                } else {
                    info!("Cloning {} in {}", location, dest.display());
                    provider.clone_repository(location, &dest)?;
                }
                Ok(Self {
                    path: dest,
                    temp: None,
                })
            }
            None => {
                let temp = tempfile::Builder::new().prefix("histmine-").tempdir()?;
                let dest = temp.path().join(&name);
                info!("Cloning {} in temporary folder {}", location, dest.display());
                provider.clone_repository(location, &dest)?;
                Ok(Self {
                    path: dest,
                    temp: Some(temp),
                })
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// True when the working copy is removed on drop.
    pub fn is_temporary(&self) -> bool {
        self.temp.is_some()
    }
}

impl Drop for Checkout {
    fn drop(&mut self) {
        if let Some(temp) = self.temp.take() {
            let dir = temp.path().to_path_buf();
            match temp.close() {
                Ok(()) => info!(path = %dir.display(), "Removed temporary clone"),
                Err(e) => warn!(path = %dir.display(), "Could not remove temporary clone: {}", e),
            }
        }
    }
}

/// Check that a caller-supplied clone directory exists.
pub fn validate_clone_dir(dir: &Path) -> Result<()> {
    if dir.is_dir() {
        return Ok(());
    }
    let kind = if dir.exists() {
        io::ErrorKind::InvalidInput
    } else {
        io::ErrorKind::NotFound
    };
    Err(Error::backend(io::Error::new(
        kind,
        format!("Clone destination is not a directory: {}", dir.display()),
    )))
}

fn is_populated(dir: &Path) -> Result<bool> {
    if !dir.is_dir() {
        return Ok(false);
    }
    Ok(std::fs::read_dir(dir)?.next().is_some())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutils::{MockBackend, MockProvider};

    #[test]
    fn test_is_remote() {
        assert!(is_remote("git@github.com:owner/repo.git"));
        assert!(is_remote("https://github.com/owner/repo"));
        assert!(is_remote("http://example.com/repo.git"));
        assert!(!is_remote("/home/me/repo"));
        assert!(!is_remote("repos/https-client"));
    }

    #[test]
    fn test_repo_name_from_url() {
        assert_eq!(repo_name_from_url("https://github.com/o/pydriller.git").unwrap(), "pydriller");
        assert_eq!(repo_name_from_url("git@github.com:o/tool").unwrap(), "tool");
        assert!(matches!(
            repo_name_from_url("https://github.com/o/"),
            Err(Error::MalformedUrl(_))
        ));
        assert!(matches!(repo_name_from_url("git@host"), Err(Error::MalformedUrl(_))));
    }

    #[test]
    fn test_local_location_is_untouched() {
        let provider = MockProvider::new(MockBackend::new());
        let checkout = Checkout::prepare("/some/repo", None, &provider).unwrap();
        assert_eq!(checkout.path(), Path::new("/some/repo"));
        assert!(!checkout.is_temporary());
        assert!(provider.cloned().is_empty());
    }

    #[test]
    fn test_temporary_clone_removed_on_drop() {
        let provider = MockProvider::new(MockBackend::new());
        let checkout = Checkout::prepare("https://host/o/repo.git", None, &provider).unwrap();
        let path = checkout.path().to_path_buf();
        assert!(checkout.is_temporary());
        assert!(path.ends_with("repo"));
        assert!(path.exists());
        drop(checkout);
        assert!(!path.exists());
    }

    #[test]
    fn test_clone_dir_is_reused() {
        let dir = tempfile::TempDir::new().unwrap();
        let provider = MockProvider::new(MockBackend::new());

        let first = Checkout::prepare("https://host/o/repo.git", Some(dir.path()), &provider).unwrap();
        assert_eq!(first.path(), dir.path().join("repo"));
        drop(first);
        assert!(dir.path().join("repo").exists());

        let _second =
            Checkout::prepare("https://host/o/repo.git", Some(dir.path()), &provider).unwrap();
        assert_eq!(provider.cloned().len(), 1);
    }

    #[test]
    fn test_validate_clone_dir() {
        let dir = tempfile::TempDir::new().unwrap();
        assert!(validate_clone_dir(dir.path()).is_ok());
    }

    #[test]
    fn test_invalid_clone_dir_is_backend_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let cause = |err: Error| match err {
            Error::Backend(source) => source
                .downcast::<io::Error>()
                .map(|e| e.kind())
                .unwrap(),
            other => panic!("unexpected error: {other:?}"),
        };

        let missing = validate_clone_dir(&dir.path().join("missing")).unwrap_err();
        assert_eq!(cause(missing), io::ErrorKind::NotFound);

        let file = dir.path().join("file");
        std::fs::write(&file, "x").unwrap();
        let not_dir = validate_clone_dir(&file).unwrap_err();
        assert!(!not_dir.is_fatal_configuration());
        assert_eq!(cause(not_dir), io::ErrorKind::InvalidInput);
    }
}
