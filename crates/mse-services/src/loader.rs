//! Image-set loader
//!
//! Registers a folder with `real/` and `synth/` subfolders as a new study.
//! Files are copied into media storage first; the set and its image rows
//! are then inserted in one transaction. A file that cannot be read or
//! stored is skipped and reported, the rest still load.
//!
//! Stored keys are opaque (`image_sets/<set>/<random>.<ext>`) so a media
//! URL never tells a clinician which subfolder an image came from.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;
use mse_core::ImageKind;
use mse_db::{RepositoryError, Stores};
use mse_models::{ImageSet, NewImage, NewImageSet};
use mse_storage::{join_key, Storage, StorageError};
use rand::seq::SliceRandom;
use thiserror::Error;
use tokio::fs;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Accepted image extensions, compared case-insensitively
pub const IMAGE_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

/// Storage prefix for loaded sets
pub const IMAGE_SETS_PREFIX: &str = "image_sets";

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Folder '{0}' does not exist")]
    FolderNotFound(PathBuf),

    #[error("'{kind}' subfolder not found in '{folder}'")]
    MissingSubfolder { folder: PathBuf, kind: &'static str },

    #[error("Image set with name '{0}' already exists")]
    DuplicateImageSet(String),

    #[error("Invalid image set name '{0}'")]
    InvalidName(String),

    #[error("No valid images found in '{0}'")]
    NoImages(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// A loadable file found on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedImage {
    pub source: PathBuf,
    pub filename: String,
    pub kind: ImageKind,
}

/// A file left out of the set and why
#[derive(Debug, Clone)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: String,
}

/// Result of [`scan_folder`]
#[derive(Debug, Clone, Default)]
pub struct FolderScan {
    /// Loadable files, real first, each kind sorted by filename
    pub images: Vec<ScannedImage>,
    /// Entries with an image extension that cannot be loaded
    pub skipped: Vec<SkippedFile>,
}

impl FolderScan {
    fn skip(&mut self, path: PathBuf, reason: impl Into<String>) {
        let reason = reason.into();
        warn!(path = ?path, %reason, "Skipping file");
        self.skipped.push(SkippedFile { path, reason });
    }
}

#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    pub description: String,
    /// Recorded as creator when it names a superuser
    pub admin_username: Option<String>,
}

/// Outcome of a successful load
#[derive(Debug, Clone)]
pub struct LoadReport {
    pub image_set: ImageSet,
    pub real: usize,
    pub synthetic: usize,
    pub skipped: Vec<SkippedFile>,
    pub warnings: Vec<String>,
}

impl LoadReport {
    pub fn total(&self) -> usize {
        self.real + self.synthetic
    }
}

pub fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|allowed| ext.eq_ignore_ascii_case(allowed))
        })
}

/// Check the folder layout and list its image files
///
/// Symlinks are followed. Image entries that are broken, not regular files,
/// or not UTF-8 named are reported in [`FolderScan::skipped`], as is a file
/// whose name was already taken by an earlier one (real before synth).
pub async fn scan_folder(folder: &Path) -> Result<FolderScan, LoadError> {
    if !fs::try_exists(folder).await? || !fs::metadata(folder).await?.is_dir() {
        return Err(LoadError::FolderNotFound(folder.to_path_buf()));
    }

    let mut subfolders = Vec::with_capacity(ImageKind::ALL.len());
    for kind in ImageKind::ALL {
        let path = folder.join(kind.folder_name());
        let is_dir = match fs::metadata(&path).await {
            Ok(meta) => meta.is_dir(),
            Err(_) => false,
        };
        if !is_dir {
            return Err(LoadError::MissingSubfolder {
                folder: folder.to_path_buf(),
                kind: kind.folder_name(),
            });
        }
        subfolders.push((kind, path));
    }

    let mut scan = FolderScan::default();
    let mut taken: HashMap<String, ImageKind> = HashMap::new();
    for (kind, path) in subfolders {
        let mut found = Vec::new();
        let mut entries = fs::read_dir(&path).await?;
        while let Some(entry) = entries.next_entry().await? {
            let source = entry.path();
            if !is_image_file(&source) {
                continue;
            }
            match fs::metadata(&source).await {
                Ok(meta) if meta.is_file() => {}
                Ok(_) => {
                    scan.skip(source, "not a regular file");
                    continue;
                }
                Err(e) => {
                    scan.skip(source, format!("unreadable: {}", e));
                    continue;
                }
            }
            let Some(filename) = source.file_name().and_then(|n| n.to_str()) else {
                scan.skip(source, "file name is not valid UTF-8");
                continue;
            };
            found.push(ScannedImage {
                filename: filename.to_string(),
                source,
                kind,
            });
        }

        found.sort_by(|a, b| a.filename.cmp(&b.filename));
        for image in found {
            if let Some(first) = taken.get(&image.filename) {
                let reason = format!(
                    "duplicate filename '{}', already loaded from {}/",
                    image.filename,
                    first.folder_name()
                );
                scan.skip(image.source, reason);
                continue;
            }
            taken.insert(image.filename.clone(), image.kind);
            scan.images.push(image);
        }
    }

    scan.skipped.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(scan)
}

fn validate_name(name: &str) -> Result<&str, LoadError> {
    let trimmed = name.trim();
    let invalid = trimmed.is_empty()
        || trimmed.contains('/')
        || trimmed.contains('\\')
        || trimmed == "."
        || trimmed == "..";
    if invalid {
        Err(LoadError::InvalidName(name.to_string()))
    } else {
        Ok(trimmed)
    }
}

/// Random stored name keeping the lowercased extension
fn opaque_filename(source: &Path) -> String {
    let ext = source
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    format!("{}.{}", Uuid::new_v4().simple(), ext)
}

pub struct ImageSetLoader {
    stores: Stores,
    storage: Arc<dyn Storage>,
}

impl ImageSetLoader {
    pub fn new(stores: Stores, storage: Arc<dyn Storage>) -> Self {
        Self { stores, storage }
    }

    /// Load `folder` as a new image set called `name`
    #[instrument(skip(self, options), fields(storage = self.storage.name()))]
    pub async fn load(
        &self,
        folder: &Path,
        name: &str,
        options: LoadOptions,
    ) -> Result<LoadReport, LoadError> {
        let name = validate_name(name)?;
        let FolderScan {
            images: scanned,
            mut skipped,
        } = scan_folder(folder).await?;

        if self.stores.image_sets.find_by_name(name).await?.is_some() {
            return Err(LoadError::DuplicateImageSet(name.to_string()));
        }

        let mut warnings = Vec::new();
        let created_by_id = match options.admin_username.as_deref() {
            None => None,
            Some(username) => match self.stores.clinicians.find_by_username(username).await? {
                Some(admin) if admin.is_superuser => Some(admin.id),
                _ => {
                    let message = format!(
                        "Admin user '{}' not found. Image set will be created without creator.",
                        username
                    );
                    warn!(username, "Admin user not found");
                    warnings.push(message);
                    None
                }
            },
        };

        let mut images = Vec::with_capacity(scanned.len());
        for image in scanned {
            match self.store_file(name, &image).await {
                Ok(key) => images.push(NewImage {
                    path: key,
                    original_filename: image.filename,
                    is_real: image.kind.is_real(),
                }),
                Err(reason) => {
                    warn!(path = ?image.source, %reason, "Skipping image");
                    skipped.push(SkippedFile {
                        path: image.source,
                        reason,
                    });
                }
            }
        }

        if images.is_empty() {
            return Err(LoadError::NoImages(folder.to_path_buf()));
        }
        // row ids follow insertion order and must not group by kind
        images.shuffle(&mut rand::rng());

        let keys: Vec<String> = images.iter().map(|i| i.path.clone()).collect();
        let real = images.iter().filter(|i| i.is_real).count();
        let synthetic = images.len() - real;

        let created = self
            .stores
            .image_sets
            .create_with_images(
                NewImageSet {
                    name: name.to_string(),
                    description: options.description,
                    created_by_id,
                },
                images,
            )
            .await;

        let image_set = match created {
            Ok(set) => set,
            Err(err) => {
                self.remove_files(&keys).await;
                return Err(self.insert_error(name, err).await);
            }
        };

        info!(
            image_set_id = image_set.id,
            real,
            synthetic,
            skipped = skipped.len(),
            "Image set loaded"
        );

        Ok(LoadReport {
            image_set,
            real,
            synthetic,
            skipped,
            warnings,
        })
    }

    /// Only a name taken by a concurrent load is a duplicate set
    async fn insert_error(&self, name: &str, err: RepositoryError) -> LoadError {
        if !matches!(err, RepositoryError::Conflict(_)) {
            return err.into();
        }
        match self.stores.image_sets.find_by_name(name).await {
            Ok(Some(_)) => LoadError::DuplicateImageSet(name.to_string()),
            Ok(None) => err.into(),
            Err(lookup) => lookup.into(),
        }
    }

    /// Copy one file into storage, returning its key or the skip reason
    async fn store_file(&self, set_name: &str, image: &ScannedImage) -> Result<String, String> {
        let data = fs::read(&image.source)
            .await
            .map_err(|e| format!("read failed: {}", e))?;

        let stored_name = opaque_filename(&image.source);
        let key = join_key([IMAGE_SETS_PREFIX, set_name, stored_name.as_str()]);
        self.storage
            .put(&key, Bytes::from(data))
            .await
            .map_err(|e: StorageError| format!("copy failed: {}", e))?;
        Ok(key)
    }

    async fn remove_files(&self, keys: &[String]) {
        for key in keys {
            if let Err(e) = self.storage.delete(key).await {
                warn!(key, error = %e, "Failed to remove stored image");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{clinician, new_clinician};
    use async_trait::async_trait;
    use mse_storage::{FileMetadata, MemoryStorage, StorageResult};

    /// Memory storage refusing keys with one extension
    struct RejectingStorage {
        inner: MemoryStorage,
        rejected_ext: &'static str,
    }

    #[async_trait]
    impl Storage for RejectingStorage {
        async fn put(&self, key: &str, data: Bytes) -> StorageResult<FileMetadata> {
            if key.ends_with(self.rejected_ext) {
                return Err(StorageError::IoError(std::io::Error::other("disk full")));
            }
            self.inner.put(key, data).await
        }

        async fn get(&self, key: &str) -> StorageResult<Bytes> {
            self.inner.get(key).await
        }

        async fn delete(&self, key: &str) -> StorageResult<()> {
            self.inner.delete(key).await
        }

        async fn exists(&self, key: &str) -> StorageResult<bool> {
            self.inner.exists(key).await
        }

        async fn metadata(&self, key: &str) -> StorageResult<FileMetadata> {
            self.inner.metadata(key).await
        }

        fn name(&self) -> &str {
            "rejecting"
        }
    }

    fn write(dir: &Path, relative: &str, data: &[u8]) {
        let path = dir.join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, data).unwrap();
    }

    fn study_folder() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "real/b.png", b"real-b");
        write(dir.path(), "real/a.JPG", b"real-a");
        write(dir.path(), "real/notes.txt", b"ignored");
        write(dir.path(), "synth/c.jpeg", b"synth-c");
        dir
    }

    fn loader() -> (ImageSetLoader, Stores, Arc<MemoryStorage>) {
        let stores = Stores::in_memory();
        let storage = Arc::new(MemoryStorage::new());
        (
            ImageSetLoader::new(stores.clone(), storage.clone()),
            stores,
            storage,
        )
    }

    #[test]
    fn test_is_image_file() {
        assert!(is_image_file(Path::new("x/a.PNG")));
        assert!(is_image_file(Path::new("a.jpeg")));
        assert!(!is_image_file(Path::new("a.gif")));
        assert!(!is_image_file(Path::new("jpg")));
    }

    #[tokio::test]
    async fn test_scan_folder() {
        let dir = study_folder();
        let scan = scan_folder(dir.path()).await.unwrap();
        assert!(scan.skipped.is_empty());
        let names: Vec<(&str, ImageKind)> = scan
            .images
            .iter()
            .map(|s| (s.filename.as_str(), s.kind))
            .collect();
        assert_eq!(
            names,
            vec![
                ("a.JPG", ImageKind::Real),
                ("b.png", ImageKind::Real),
                ("c.jpeg", ImageKind::Synthetic),
            ]
        );
    }

    #[tokio::test]
    async fn test_layout_errors() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            scan_folder(&dir.path().join("missing")).await,
            Err(LoadError::FolderNotFound(_))
        ));

        std::fs::create_dir(dir.path().join("real")).unwrap();
        assert!(matches!(
            scan_folder(dir.path()).await,
            Err(LoadError::MissingSubfolder { kind: "synth", .. })
        ));
    }

    #[tokio::test]
    async fn test_load_and_rerun() {
        let dir = study_folder();
        let (loader, stores, storage) = loader();

        let report = loader
            .load(dir.path(), "study1", LoadOptions::default())
            .await
            .unwrap();
        assert_eq!((report.real, report.synthetic), (2, 1));
        assert!(report.skipped.is_empty());
        assert_eq!(storage.keys().await.len(), 3);

        let images = stores
            .image_sets
            .images_for_set(report.image_set.id)
            .await
            .unwrap();
        assert_eq!(images.len(), 3);
        for image in &images {
            let stored = storage.get(&image.path).await.unwrap();
            let expected: &[u8] = match image.original_filename.as_str() {
                "a.JPG" => b"real-a",
                "b.png" => b"real-b",
                "c.jpeg" => b"synth-c",
                other => panic!("unexpected image {}", other),
            };
            assert_eq!(stored.as_ref(), expected);
        }

        let err = loader
            .load(dir.path(), "study1", LoadOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, LoadError::DuplicateImageSet(_)));
        assert_eq!(stores.image_sets.count_images().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_stored_paths_hide_kind() {
        let dir = study_folder();
        let (loader, stores, _) = loader();

        let report = loader
            .load(dir.path(), "blind", LoadOptions::default())
            .await
            .unwrap();
        let images = stores
            .image_sets
            .images_for_set(report.image_set.id)
            .await
            .unwrap();

        for image in &images {
            assert!(image.path.starts_with("image_sets/blind/"));
            assert!(!image.path.contains("real"));
            assert!(!image.path.contains("synth"));
            let stem = Path::new(&image.path).file_stem().unwrap().to_str().unwrap();
            assert_eq!(stem.len(), 32);
            assert!(stem.chars().all(|c| c.is_ascii_hexdigit()));
        }
        let a = images.iter().find(|i| i.original_filename == "a.JPG").unwrap();
        assert!(a.path.ends_with(".jpg"));
    }

    #[tokio::test]
    async fn test_shared_filename_across_kinds() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "real/001.png", b"real-1");
        write(dir.path(), "real/002.png", b"real-2");
        write(dir.path(), "synth/001.png", b"synth-1");
        write(dir.path(), "synth/003.png", b"synth-3");
        let (loader, stores, storage) = loader();

        let report = loader
            .load(dir.path(), "shared", LoadOptions::default())
            .await
            .unwrap();
        assert_eq!((report.real, report.synthetic), (2, 1));
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].path, dir.path().join("synth/001.png"));
        assert!(report.skipped[0].reason.contains("already loaded from real/"));
        assert_eq!(storage.keys().await.len(), 3);

        let images = stores
            .image_sets
            .images_for_set(report.image_set.id)
            .await
            .unwrap();
        let first = images.iter().find(|i| i.original_filename == "001.png").unwrap();
        assert!(first.is_real);
    }

    #[tokio::test]
    async fn test_failed_copy_reported() {
        let dir = study_folder();
        let stores = Stores::in_memory();
        let storage = Arc::new(RejectingStorage {
            inner: MemoryStorage::new(),
            rejected_ext: ".png",
        });
        let loader = ImageSetLoader::new(stores.clone(), storage.clone());

        let report = loader
            .load(dir.path(), "partial", LoadOptions::default())
            .await
            .unwrap();
        assert_eq!((report.real, report.synthetic), (1, 1));
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].path, dir.path().join("real/b.png"));
        assert!(report.skipped[0].reason.starts_with("copy failed"));
        assert!(report.skipped[0].reason.contains("disk full"));

        let keys = storage.inner.keys().await;
        assert_eq!(keys.len(), 2);
        assert!(keys.iter().all(|k| !k.ends_with(".png")));
        assert_eq!(stores.image_sets.count_images().await.unwrap(), 2);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_symlinks_followed_and_broken_reported() {
        use std::os::unix::fs::symlink;

        let dir = study_folder();
        let outside = tempfile::tempdir().unwrap();
        write(outside.path(), "linked.png", b"linked");
        symlink(outside.path().join("linked.png"), dir.path().join("synth/linked.png")).unwrap();
        symlink(outside.path().join("gone.png"), dir.path().join("synth/broken.png")).unwrap();
        std::fs::create_dir(dir.path().join("real/folder.jpg")).unwrap();
        let (loader, _, storage) = loader();

        let report = loader
            .load(dir.path(), "linked", LoadOptions::default())
            .await
            .unwrap();
        assert_eq!((report.real, report.synthetic), (2, 2));
        assert_eq!(storage.keys().await.len(), 4);

        let skipped: Vec<(PathBuf, &str)> = report
            .skipped
            .iter()
            .map(|s| (s.path.clone(), s.reason.as_str()))
            .collect();
        assert_eq!(skipped.len(), 2);
        assert_eq!(skipped[0].0, dir.path().join("real/folder.jpg"));
        assert_eq!(skipped[0].1, "not a regular file");
        assert_eq!(skipped[1].0, dir.path().join("synth/broken.png"));
        assert!(skipped[1].1.starts_with("unreadable"));
    }

    #[tokio::test]
    async fn test_empty_folders_persist_nothing() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("real")).unwrap();
        std::fs::create_dir(dir.path().join("synth")).unwrap();
        let (loader, stores, _) = loader();

        let err = loader
            .load(dir.path(), "empty", LoadOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, LoadError::NoImages(_)));
        assert!(stores.image_sets.find_by_name("empty").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_admin_username() {
        let dir = study_folder();
        let (loader, stores, _) = loader();
        let admin = stores
            .clinicians
            .create(new_clinician("admin", true))
            .await
            .unwrap();
        clinician(&stores, "doctor1").await;

        let report = loader
            .load(
                dir.path(),
                "with-admin",
                LoadOptions {
                    description: "Chest X-rays".into(),
                    admin_username: Some("admin".into()),
                },
            )
            .await
            .unwrap();
        assert_eq!(report.image_set.created_by_id, Some(admin.id));
        assert_eq!(report.image_set.description, "Chest X-rays");
        assert!(report.warnings.is_empty());

        let report = loader
            .load(
                dir.path(),
                "not-admin",
                LoadOptions {
                    admin_username: Some("doctor1".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(report.image_set.created_by_id, None);
        assert_eq!(report.warnings.len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_name() {
        let dir = study_folder();
        let (loader, _, _) = loader();
        for name in ["", "  ", "a/b", ".."] {
            assert!(matches!(
                loader.load(dir.path(), name, LoadOptions::default()).await,
                Err(LoadError::InvalidName(_))
            ));
        }
    }
}
