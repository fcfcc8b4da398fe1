//! Real package archives built on the fly, for tests.
//!
//! Enabled by the `fixture` feature so dependent crates can build pools in
//! their own tests.

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use pacstage_compress::Compression;
use std::fs::File;
use std::path::Path;
use std::time::{Duration, SystemTime};

#[cfg(feature = "zstd")]
const DEFAULT_COMPRESSION: Compression = Compression::Zstd;
#[cfg(not(feature = "zstd"))]
const DEFAULT_COMPRESSION: Compression = Compression::Gzip;

enum Manifest {
    File(String),
    Directory,
}

/// Builder for a `.pkg.tar*` archive holding a `.PKGINFO` and optional payload.
pub struct PackageBuilder {
    stem: String,
    arch: Option<String>,
    filename: Option<String>,
    manifest: Manifest,
    payload: Vec<(String, Vec<u8>)>,
    compression: Compression,
}

impl PackageBuilder {
    /// A package with just `pkgname` and `pkgver` set.
    pub fn new(name: &str, version: &str) -> Self {
        Self {
            stem: format!("{name}-{version}"),
            arch: None,
            filename: None,
            manifest: Manifest::File(format!("pkgname = {name}\npkgver = {version}\n")),
            payload: Vec::new(),
            compression: DEFAULT_COMPRESSION,
        }
    }

    /// A package with verbatim manifest text, stored as `filename`.
    pub fn from_manifest(filename: &str, manifest: &str) -> Self {
        Self {
            stem: String::new(),
            arch: None,
            filename: Some(filename.to_string()),
            manifest: Manifest::File(manifest.to_string()),
            payload: Vec::new(),
            compression: Compression::None,
        }
    }

    /// Append a raw `key = value` manifest line.
    pub fn line(mut self, key: &str, value: &str) -> Self {
        if let Manifest::File(text) = &mut self.manifest {
            text.push_str(&format!("{key} = {value}\n"));
        }
        self
    }

    pub fn arch(mut self, arch: &str) -> Self {
        self.arch = Some(arch.to_string());
        self.line("arch", arch)
    }

    pub fn depend(self, depend: &str) -> Self {
        self.line("depend", depend)
    }

    /// Add a payload file.
    pub fn file(mut self, path: &str, content: impl AsRef<[u8]>) -> Self {
        self.payload.push((path.to_string(), content.as_ref().to_vec()));
        self
    }

    pub fn compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    /// Store the archive under an explicit name.
    pub fn named(mut self, filename: &str) -> Self {
        self.filename = Some(filename.to_string());
        self
    }

    /// Replace the `.PKGINFO` file with a directory of the same name.
    pub fn manifest_as_directory(mut self) -> Self {
        self.manifest = Manifest::Directory;
        self
    }

    /// The name `makepkg` would give this archive, unless overridden.
    pub fn filename(&self) -> String {
        match &self.filename {
            Some(filename) => filename.clone(),
            None => format!(
                "{}-{}.pkg.tar{}",
                self.stem,
                self.arch.as_deref().unwrap_or("any"),
                self.compression.extension()
            ),
        }
    }

    /// Build the compressed archive in memory.
    pub fn build(&self) -> Result<Vec<u8>> {
        let mut builder = tar::Builder::new(Vec::new());
        match &self.manifest {
            Manifest::File(text) => append(&mut builder, tar::EntryType::Regular, ".PKGINFO", text.as_bytes())?,
            Manifest::Directory => append(&mut builder, tar::EntryType::Directory, ".PKGINFO", &[])?,
        }
        for (path, content) in &self.payload {
            append(&mut builder, tar::EntryType::Regular, path, content)?;
        }
        let tar = builder.into_inner().or_raise(|| ErrorKind::Io)?;
        self.compression.compress(&tar).or_raise(|| ErrorKind::Io)
    }

    /// Build the archive into `dir`, returning its filename.
    pub fn write_to(&self, dir: &Path) -> Result<String> {
        let filename = self.filename();
        std::fs::write(dir.join(&filename), self.build()?).or_raise(|| ErrorKind::Io)?;
        Ok(filename)
    }
}

fn append(builder: &mut tar::Builder<Vec<u8>>, kind: tar::EntryType, path: &str, content: &[u8]) -> Result<()> {
    let mut header = tar::Header::new_gnu();
    header.set_entry_type(kind);
    header.set_size(content.len() as u64);
    header.set_mode(if kind.is_dir() { 0o755 } else { 0o644 });
    header.set_mtime(0);
    builder.append_data(&mut header, path, content).or_raise(|| ErrorKind::Io)
}

/// Set the modification time of `path` to `unix` seconds.
pub fn set_mtime(path: &Path, unix: u64) -> Result<()> {
    let file = File::options().write(true).open(path).or_raise(|| ErrorKind::Io)?;
    file.set_modified(SystemTime::UNIX_EPOCH + Duration::from_secs(unix)).or_raise(|| ErrorKind::Io)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn makepkg_style_filenames() {
        let builder = PackageBuilder::new("zlib", "1.3.1-2").arch("x86_64").compression(Compression::Gzip);
        assert_eq!(builder.filename(), "zlib-1.3.1-2-x86_64.pkg.tar.gz");
        let builder = PackageBuilder::new("tzdata", "2024a-1").compression(Compression::None);
        assert_eq!(builder.filename(), "tzdata-2024a-1-any.pkg.tar");
        assert_eq!(builder.named("custom.pkg.tar").filename(), "custom.pkg.tar");
    }
}
