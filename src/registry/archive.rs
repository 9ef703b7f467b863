//! Release tarball builder
//!
//! Layout of the outer (uncompressed) tar, in order:
//!
//! | entry             | content                                         |
//! |-------------------|-------------------------------------------------|
//! | `VERSION`         | tarball format version, `3`                     |
//! | `CHECKSUM`        | uppercase hex SHA-256 of the three other blobs  |
//! | `metadata.json`   | release metadata as pretty JSON                 |
//! | `contents.tar.gz` | deterministic gzip tar of the release files     |
//!
//! Headers carry mtime 0, mode 0644 and uid/gid 0 so identical inputs give
//! byte-identical archives.

use std::fs;
use std::io::Write;
use std::path::PathBuf;

use flate2::{Compression, GzBuilder};
use sha2::{Digest, Sha256};
use tar::{Builder, Header, HeaderMode};
use tracing::debug;

use crate::core::error::{PublishError, PublishResult};
use crate::core::traits::ArchiveBuilder;
use crate::release::metadata::Metadata;

/// Tarball format version written to `VERSION`
pub const TARBALL_VERSION: &str = "3";

/// Builds release tarballs from files under a project root
#[derive(Debug, Clone)]
pub struct TarballBuilder {
    root: PathBuf,
}

impl TarballBuilder {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn contents(&self, files: &[String]) -> PublishResult<Vec<u8>> {
        let encoder = GzBuilder::new()
            .mtime(0)
            .operating_system(255)
            .write(Vec::new(), Compression::best());

        let mut tar = Builder::new(encoder);
        tar.mode(HeaderMode::Deterministic);

        for file in files {
            let path = self.root.join(file);
            let data = fs::read(&path).map_err(|e| PublishError::Archive {
                message: format!("cannot read {}: {}", path.display(), e),
            })?;
            write_entry(&mut tar, file, &data)?;
        }

        let encoder = tar.into_inner().map_err(archive_error)?;
        encoder.finish().map_err(archive_error)
    }
}

impl ArchiveBuilder for TarballBuilder {
    fn build(&self, metadata: &Metadata, files: &[String]) -> PublishResult<Vec<u8>> {
        let metadata_json = serde_json::to_vec_pretty(metadata).map_err(|e| {
            PublishError::Archive {
                message: format!("cannot serialize metadata: {}", e),
            }
        })?;
        let contents = self.contents(files)?;
        let checksum = checksum(&[
            TARBALL_VERSION.as_bytes(),
            metadata_json.as_slice(),
            contents.as_slice(),
        ]);

        let mut tar = Builder::new(Vec::new());
        tar.mode(HeaderMode::Deterministic);
        write_entry(&mut tar, "VERSION", TARBALL_VERSION.as_bytes())?;
        write_entry(&mut tar, "CHECKSUM", checksum.as_bytes())?;
        write_entry(&mut tar, "metadata.json", &metadata_json)?;
        write_entry(&mut tar, "contents.tar.gz", &contents)?;

        let archive = tar.into_inner().map_err(archive_error)?;

        debug!(
            package = %metadata.name,
            version = %metadata.version,
            files = files.len(),
            size = archive.len(),
            checksum = %checksum,
            "built release tarball"
        );

        Ok(archive)
    }
}

/// Uppercase hex SHA-256 over the concatenation of `parts`
pub fn checksum(parts: &[&[u8]]) -> String {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    hex::encode_upper(hasher.finalize())
}

/// Append one entry; paths over 100 bytes get a GNU long-name record
fn write_entry<W: Write>(tar: &mut Builder<W>, path: &str, data: &[u8]) -> PublishResult<()> {
    let mut header = Header::new_gnu();
    header.set_size(data.len() as u64);
    header.set_mode(0o644);
    header.set_uid(0);
    header.set_gid(0);
    header.set_mtime(0);

    tar.append_data(&mut header, path, data).map_err(archive_error)
}

fn archive_error(e: std::io::Error) -> PublishError {
    PublishError::Archive {
        message: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::GzDecoder;
    use std::collections::BTreeMap;
    use std::io::Read;
    use tempfile::TempDir;

    fn metadata(files: &[&str]) -> Metadata {
        Metadata {
            name: "ecto".to_string(),
            version: "0.2.0".to_string(),
            description: None,
            licenses: Some(vec!["Apache-2.0".to_string()]),
            contributors: None,
            links: None,
            requirements: BTreeMap::new(),
            files: files.iter().map(|f| f.to_string()).collect(),
        }
    }

    fn entries(data: &[u8]) -> Vec<(String, Vec<u8>)> {
        let mut archive = tar::Archive::new(data);
        archive
            .entries()
            .unwrap()
            .map(|entry| {
                let mut entry = entry.unwrap();
                let path = entry.path().unwrap().to_string_lossy().into_owned();
                let mut content = Vec::new();
                entry.read_to_end(&mut content).unwrap();
                (path, content)
            })
            .collect()
    }

    fn fixture() -> TempDir {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir_all(temp_dir.path().join("lib")).unwrap();
        fs::write(temp_dir.path().join("lib/ecto.ex"), "defmodule Ecto do\nend\n").unwrap();
        fs::write(temp_dir.path().join("README.md"), "# Ecto\n").unwrap();
        temp_dir
    }

    #[test]
    fn test_outer_layout_and_checksum() {
        let temp_dir = fixture();
        let files = ["README.md", "lib/ecto.ex"];
        let builder = TarballBuilder::new(temp_dir.path());

        let archive = builder.build(&metadata(&files), &files.map(String::from)).unwrap();
        let outer = entries(&archive);

        let names: Vec<&str> = outer.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(names, vec!["VERSION", "CHECKSUM", "metadata.json", "contents.tar.gz"]);
        assert_eq!(outer[0].1, b"3");

        let expected = checksum(&[
            outer[0].1.as_slice(),
            outer[2].1.as_slice(),
            outer[3].1.as_slice(),
        ]);
        assert_eq!(String::from_utf8(outer[1].1.clone()).unwrap(), expected);
        assert_eq!(expected.len(), 64);
        assert_eq!(expected, expected.to_uppercase());

        let decoded: Metadata = serde_json::from_slice(&outer[2].1).unwrap();
        assert_eq!(decoded, metadata(&files));
    }

    #[test]
    fn test_contents_hold_listed_files() {
        let temp_dir = fixture();
        let files = vec!["lib/ecto.ex".to_string()];
        let builder = TarballBuilder::new(temp_dir.path());

        let archive = builder.build(&metadata(&["lib/ecto.ex"]), &files).unwrap();
        let outer = entries(&archive);

        let mut gz = GzDecoder::new(outer[3].1.as_slice());
        let mut inner_bytes = Vec::new();
        gz.read_to_end(&mut inner_bytes).unwrap();
        let inner = entries(&inner_bytes);

        assert_eq!(inner.len(), 1);
        assert_eq!(inner[0].0, "lib/ecto.ex");
        assert_eq!(inner[0].1, b"defmodule Ecto do\nend\n");
    }

    #[test]
    fn test_long_paths_are_packed() {
        let temp_dir = fixture();
        let long = format!(
            "lib/my_app_web/controllers/{}/page_controller.ex",
            "nested_directory_name".repeat(4)
        );
        assert!(long.len() > 100);
        fs::create_dir_all(temp_dir.path().join(&long).parent().unwrap()).unwrap();
        fs::write(temp_dir.path().join(&long), "defmodule Page do\nend\n").unwrap();

        let builder = TarballBuilder::new(temp_dir.path());
        let archive = builder
            .build(&metadata(&[long.as_str()]), &[long.clone()])
            .unwrap();
        let outer = entries(&archive);

        let mut gz = GzDecoder::new(outer[3].1.as_slice());
        let mut inner_bytes = Vec::new();
        gz.read_to_end(&mut inner_bytes).unwrap();
        let inner = entries(&inner_bytes);

        assert_eq!(inner.len(), 1);
        assert_eq!(inner[0].0, long);
        assert_eq!(inner[0].1, b"defmodule Page do\nend\n");
    }

    #[test]
    fn test_build_is_deterministic() {
        let temp_dir = fixture();
        let files = vec!["README.md".to_string(), "lib/ecto.ex".to_string()];
        let builder = TarballBuilder::new(temp_dir.path());
        let metadata = metadata(&["README.md", "lib/ecto.ex"]);

        let first = builder.build(&metadata, &files).unwrap();
        let second = builder.build(&metadata, &files).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_missing_file_is_archive_error() {
        let temp_dir = fixture();
        let builder = TarballBuilder::new(temp_dir.path());

        let err = builder
            .build(&metadata(&[]), &["missing.ex".to_string()])
            .unwrap_err();
        assert!(matches!(err, PublishError::Archive { message } if message.contains("missing.ex")));
    }
}
