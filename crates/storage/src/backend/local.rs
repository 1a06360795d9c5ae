//! Local filesystem state store.
//!
//! One file per key inside a configured directory, accessed with `tokio::fs`
//! for async I/O.

use crate::backend::KeyStream;
use crate::error::{ErrorKind, Result};
use crate::{StateStore, keys::validate as validate_key};
use async_stream::stream;
use async_trait::async_trait;
use std::fs::create_dir_all as sync_create_dir;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Prefix of in-flight writes. Keys may never start with a dot, so these can
/// never be mistaken for (or listed as) real entries.
const TEMP_PREFIX: &str = ".tmp-";

/// Local filesystem state store.
///
/// # Examples
///
/// ```no_run
/// use folio_storage::backend::LocalStore;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = LocalStore::new("local", "/home/reader/.local/share/folio/state")?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct LocalStore {
    name: String,
    root: PathBuf,
}
impl LocalStore {
    /// Create a new local store rooted at an absolute directory, creating the
    /// directory if it does not exist yet.
    pub fn new(name: impl Into<String>, root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.is_absolute() {
            exn::bail!(ErrorKind::StoreError(format!("state directory must be absolute: {}", root.display())));
        }
        if root.exists() {
            if !root.is_dir() {
                exn::bail!(ErrorKind::StoreError(format!("not a directory: {}", root.display())));
            }
        } else {
            // Use non-async here; it'll only happen once on startup and it's
            // not worth the hassle of making the constructor async.
            sync_create_dir(&root).map_err(|e| Self::map_io_error(e, &root))?;
        }
        Ok(Self { name: name.into(), root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        Ok(self.root.join(validate_key(key)?))
    }

    fn map_io_error(e: std::io::Error, path: &Path) -> ErrorKind {
        match e.kind() {
            std::io::ErrorKind::PermissionDenied => ErrorKind::PermissionDenied(path.to_path_buf()),
            _ => ErrorKind::Io(e),
        }
    }
}

#[async_trait]
impl StateStore for LocalStore {
    fn name(&self) -> &str {
        &self.name
    }

    fn keys_stream<'a>(&'a self, prefix: Option<&'a str>) -> KeyStream<'a> {
        Box::pin(stream! {
            let mut entries = match fs::read_dir(&self.root).await {
                Ok(entries) => entries,
                // Someone removed the directory underneath us: nothing stored.
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => return,
                Err(err) => {
                    yield Err(exn::Exn::from(Self::map_io_error(err, &self.root)));
                    return;
                }
            };
            loop {
                let entry = match entries.next_entry().await {
                    Ok(Some(entry)) => entry,
                    Ok(None) => break,
                    Err(err) => {
                        yield Err(exn::Exn::from(Self::map_io_error(err, &self.root)));
                        break;
                    }
                };
                let Some(key) = entry.file_name().to_str().map(str::to_string) else {
                    tracing::debug!(store = %self.name, file = ?entry.file_name(), "Skipping non UTF-8 file name");
                    continue;
                };
                if key.starts_with('.') {
                    continue;
                }
                if prefix.is_some_and(|p| !key.starts_with(p)) {
                    continue;
                }
                match entry.file_type().await {
                    Ok(kind) if kind.is_file() => yield Ok(key),
                    Ok(_) => continue,
                    Err(err) => yield Err(exn::Exn::from(Self::map_io_error(err, &entry.path()))),
                }
            }
        })
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key)?;
        match fs::read(&path).await {
            Ok(bytes) => match String::from_utf8(bytes) {
                Ok(value) => Ok(Some(value)),
                Err(_) => exn::bail!(ErrorKind::InvalidValue(key.to_string())),
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(exn::Exn::from(Self::map_io_error(err, &path))),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key)?;
        // Write then rename, so a reader never observes a half-written value.
        let temp = self.root.join(format!("{TEMP_PREFIX}{key}"));
        fs::write(&temp, value.as_bytes()).await.map_err(|e| Self::map_io_error(e, &temp))?;
        if let Err(err) = fs::rename(&temp, &path).await {
            _ = fs::remove_file(&temp).await;
            exn::bail!(Self::map_io_error(err, &path));
        }
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<bool> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(exn::Exn::from(Self::map_io_error(err, &path))),
        }
    }
}
