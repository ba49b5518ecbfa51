//! Fingerprinting and staging of the static asset directory.
//!
//! The asset tree is opaque: every regular file is recorded with its
//! bucket-relative key, size, and SHA-256 digest. The asset hash covers
//! keys and contents, so renaming a file changes the hash as well.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use sha2::{Digest, Sha256};
use staticstack_common::constants::{ASSET_PACKAGING, SHORT_CACHE_PATHS};
use staticstack_common::error::{Result, StackError};
use staticstack_common::types::Sha256Hash;
use walkdir::WalkDir;

/// One file of the asset tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssetFile {
    /// Key relative to the asset root, `/`-prefixed and `/`-separated.
    pub key: String,
    /// Size in bytes.
    pub size: u64,
    /// Hex SHA-256 of the content.
    pub sha256: String,
}

/// A fingerprinted asset directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StagedAsset {
    source_path: PathBuf,
    hash: Sha256Hash,
    files: Vec<AssetFile>,
}

impl StagedAsset {
    /// Walks `path` and fingerprints every regular file beneath it.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the path does not exist, `Config` if it is not a
    /// directory or holds no files, and `Io` if a file cannot be read.
    pub fn fingerprint(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(StackError::NotFound {
                kind: "asset directory",
                id: path.display().to_string(),
            });
        }
        if !path.is_dir() {
            return Err(StackError::Config {
                message: format!("asset source {} is not a directory", path.display()),
            });
        }
        tracing::info!(path = %path.display(), "fingerprinting asset directory");

        let files = collect_files(path)?;
        if files.is_empty() {
            return Err(StackError::Config {
                message: format!("asset directory {} contains no files", path.display()),
            });
        }
        if !files
            .iter()
            .any(|f| SHORT_CACHE_PATHS.contains(&f.key.as_str()))
        {
            tracing::warn!(
                path = %path.display(),
                entry_paths = ?SHORT_CACHE_PATHS,
                "no entry file found; every file gets the long cache lifetime"
            );
        }

        let mut hasher = Sha256::new();
        for file in &files {
            hasher.update(file.key.as_bytes());
            hasher.update([0]);
            hasher.update(file.sha256.as_bytes());
            hasher.update([0]);
        }
        let hash = Sha256Hash::from_hex(hex::encode(hasher.finalize()))?;
        tracing::debug!(hash = %hash, files = files.len(), "asset fingerprinted");

        Ok(Self {
            source_path: path.to_path_buf(),
            hash,
            files,
        })
    }

    /// Directory the asset was read from.
    #[must_use]
    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    /// Content hash of the whole tree.
    #[must_use]
    pub const fn hash(&self) -> &Sha256Hash {
        &self.hash
    }

    /// Files in key order.
    #[must_use]
    pub fn files(&self) -> &[AssetFile] {
        &self.files
    }

    /// Total size of all files in bytes.
    #[must_use]
    pub fn total_bytes(&self) -> u64 {
        self.files.iter().map(|f| f.size).sum()
    }

    /// Object key of the published asset in the bootstrap bucket.
    #[must_use]
    pub fn object_key(&self) -> String {
        format!("{}.{ASSET_PACKAGING}", self.hash)
    }

    /// Name of the staging directory inside an output directory.
    #[must_use]
    pub fn staging_dir_name(&self) -> String {
        format!("asset.{}", self.hash)
    }

    /// Copies the asset tree into `out_dir/asset.<hash>/`.
    ///
    /// Files are copied into a scratch directory inside `out_dir` that is
    /// renamed into place only once every file is copied, so an existing
    /// staging directory is always complete and is left untouched.
    ///
    /// # Errors
    ///
    /// Returns an error if a file cannot be copied.
    pub fn stage_into(&self, out_dir: &Path) -> Result<PathBuf> {
        let target = out_dir.join(self.staging_dir_name());
        if target.exists() {
            tracing::debug!(path = %target.display(), "asset already staged");
            return Ok(target);
        }

        fs::create_dir_all(out_dir).map_err(|e| StackError::io(out_dir, e))?;
        let scratch = tempfile::Builder::new()
            .prefix(".staging-")
            .tempdir_in(out_dir)
            .map_err(|e| StackError::io(out_dir, e))?;

        for file in &self.files {
            let relative = file.key.trim_start_matches('/');
            let from = self.source_path.join(relative);
            let to = scratch.path().join(relative);
            if let Some(parent) = to.parent() {
                fs::create_dir_all(parent).map_err(|e| StackError::io(parent, e))?;
            }
            let _ = fs::copy(&from, &to).map_err(|e| StackError::io(&from, e))?;
        }

        fs::rename(scratch.path(), &target).map_err(|e| StackError::io(&target, e))?;
        tracing::info!(path = %target.display(), files = self.files.len(), "asset staged");
        Ok(target)
    }
}

fn collect_files(root: &Path) -> Result<Vec<AssetFile>> {
    let mut files = Vec::new();

    for entry in WalkDir::new(root)
        .follow_links(false)
        .sort_by(|a, b| a.file_name().cmp(b.file_name()))
    {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(root).to_path_buf();
            StackError::Io {
                source: e.into_io_error().unwrap_or_else(|| {
                    std::io::Error::other("filesystem loop while walking assets")
                }),
                path,
            }
        })?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let relative = path.strip_prefix(root).map_err(|_| StackError::Config {
            message: format!("{} escapes the asset root", path.display()),
        })?;
        let mut key = String::new();
        for component in relative.components() {
            let part = component.as_os_str().to_str().ok_or_else(|| StackError::Config {
                message: format!("asset file name is not valid UTF-8: {}", path.display()),
            })?;
            key.push('/');
            key.push_str(part);
        }

        let (size, sha256) = hash_file(path)?;
        files.push(AssetFile { key, size, sha256 });
    }

    files.sort_by(|a, b| a.key.cmp(&b.key));
    Ok(files)
}

fn hash_file(path: &Path) -> Result<(u64, String)> {
    let mut file = fs::File::open(path).map_err(|e| StackError::io(path, e))?;
    let mut hasher = Sha256::new();
    let size = io::copy(&mut file, &mut hasher).map_err(|e| StackError::io(path, e))?;
    Ok((size, hex::encode(hasher.finalize())))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn site(files: &[(&str, &str)]) -> tempfile::TempDir {
        let dir = tempfile::tempdir().expect("tempdir");
        for (name, content) in files {
            let path = dir.path().join(name);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).expect("mkdir");
            }
            fs::write(path, content).expect("write");
        }
        dir
    }

    #[test]
    fn missing_directory_is_not_found() {
        let err = StagedAsset::fingerprint(Path::new("/nonexistent/web/dist")).unwrap_err();
        assert!(matches!(err, StackError::NotFound { .. }), "got: {err}");
    }

    #[test]
    fn empty_directory_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = StagedAsset::fingerprint(dir.path()).unwrap_err();
        assert!(err.to_string().contains("no files"), "got: {err}");
    }

    #[test]
    fn file_instead_of_directory_is_rejected() {
        let dir = site(&[("index.html", "<html></html>")]);
        let err = StagedAsset::fingerprint(&dir.path().join("index.html")).unwrap_err();
        assert!(err.to_string().contains("not a directory"), "got: {err}");
    }

    #[test]
    fn keys_are_rooted_and_sorted() {
        let dir = site(&[
            ("index.html", "<html></html>"),
            ("assets/app.js", "console.log(1)"),
            ("assets/app.css", "body{}"),
        ]);
        let asset = StagedAsset::fingerprint(dir.path()).expect("fingerprint");
        let keys: Vec<_> = asset.files().iter().map(|f| f.key.as_str()).collect();
        assert_eq!(keys, vec!["/assets/app.css", "/assets/app.js", "/index.html"]);
        assert_eq!(asset.total_bytes(), 13 + 14 + 6);
    }

    #[test]
    fn hash_is_stable_and_content_sensitive() {
        let a = site(&[("index.html", "one")]);
        let b = site(&[("index.html", "one")]);
        let c = site(&[("index.html", "two")]);
        let ha = StagedAsset::fingerprint(a.path()).expect("a");
        let hb = StagedAsset::fingerprint(b.path()).expect("b");
        let hc = StagedAsset::fingerprint(c.path()).expect("c");
        assert_eq!(ha.hash(), hb.hash());
        assert_ne!(ha.hash(), hc.hash());
    }

    #[test]
    fn hash_is_name_sensitive() {
        let a = site(&[("index.html", "same")]);
        let b = site(&[("main.html", "same")]);
        let ha = StagedAsset::fingerprint(a.path()).expect("a");
        let hb = StagedAsset::fingerprint(b.path()).expect("b");
        assert_ne!(ha.hash(), hb.hash());
    }

    #[test]
    fn object_key_uses_hash_and_packaging() {
        let dir = site(&[("index.html", "x")]);
        let asset = StagedAsset::fingerprint(dir.path()).expect("fingerprint");
        assert_eq!(asset.object_key(), format!("{}.zip", asset.hash()));
    }

    #[test]
    fn stage_into_copies_tree_once() {
        let dir = site(&[("index.html", "<html></html>"), ("img/logo.svg", "<svg/>")]);
        let out = tempfile::tempdir().expect("out");
        let asset = StagedAsset::fingerprint(dir.path()).expect("fingerprint");

        let staged = asset.stage_into(out.path()).expect("stage");
        assert_eq!(
            fs::read_to_string(staged.join("img/logo.svg")).expect("read"),
            "<svg/>"
        );

        let again = asset.stage_into(out.path()).expect("stage twice");
        assert_eq!(staged, again);
    }

    #[test]
    fn failed_staging_is_not_reused() {
        let dir = site(&[("a.txt", "a"), ("index.html", "<html></html>"), ("z.txt", "z")]);
        let out = tempfile::tempdir().expect("out");
        let asset = StagedAsset::fingerprint(dir.path()).expect("fingerprint");

        fs::rename(dir.path().join("z.txt"), dir.path().join("z.hidden")).expect("hide");
        let err = asset.stage_into(out.path()).unwrap_err();
        assert!(err.to_string().contains("z.txt"), "got: {err}");
        assert!(!out.path().join(asset.staging_dir_name()).exists());

        fs::rename(dir.path().join("z.hidden"), dir.path().join("z.txt")).expect("restore");
        let staged = asset.stage_into(out.path()).expect("stage");
        for file in asset.files() {
            let relative = file.key.trim_start_matches('/');
            assert!(staged.join(relative).is_file(), "{} not staged", file.key);
        }

        let leftovers: Vec<_> = fs::read_dir(out.path())
            .expect("read out")
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with(".staging-"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn non_utf8_file_names_are_rejected() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let dir = site(&[("index.html", "<html></html>")]);
        fs::write(dir.path().join(OsStr::from_bytes(b"a\xff.js")), "1").expect("write");
        fs::write(dir.path().join(OsStr::from_bytes(b"a\xfe.js")), "2").expect("write");

        let err = StagedAsset::fingerprint(dir.path()).unwrap_err();
        assert!(matches!(err, StackError::Config { .. }), "got: {err}");
        assert!(err.to_string().contains("not valid UTF-8"), "got: {err}");
    }

    #[test]
    fn file_size_is_recorded() {
        let content = "x".repeat(20_000);
        let dir = site(&[("big.js", content.as_str())]);
        let asset = StagedAsset::fingerprint(dir.path()).expect("fingerprint");
        assert_eq!(asset.files()[0].size, 20_000);
        assert_eq!(asset.files()[0].sha256.len(), 64);
    }
}
