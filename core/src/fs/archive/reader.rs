//! Entry readers for the supported archive formats.

use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use unrar::{CursorBeforeHeader, OpenArchive, Process};
use zip::read::ZipArchive;

use crate::Result;
use crate::fs::util;
use crate::types::ContainerKind;

/// Sequential access to the file entries of one archive.
///
/// Readers are not required to be `Send`: the extraction worker builds its own through an
/// [`OpenReader`] on the thread that uses it.
pub trait ArchiveReader {
    /// Names of every visible file entry, in archive order. Directories and hidden entries
    /// are skipped.
    fn entry_names(&mut self) -> Result<Vec<String>>;

    /// Decompress the entry called `name`.
    fn read_entry(&mut self, name: &str) -> Result<Vec<u8>>;
}

/// Opens a fresh reader on whichever thread drives the extraction.
pub type OpenReader = Box<dyn FnOnce() -> Result<Box<dyn ArchiveReader>> + Send>;

/// Open the reader matching `kind`. Folders have no reader.
pub fn open_reader(kind: ContainerKind, path: &Path) -> Result<Box<dyn ArchiveReader>> {
    match kind {
        ContainerKind::Zip => Ok(Box::new(ZipReader::open(path)?)),
        ContainerKind::Rar => Ok(Box::new(RarReader::open(path)?)),
        ContainerKind::Folder => Err(anyhow!("{:?} is a folder, not an archive", path)),
    }
}

/// Deferred [`open_reader`] for `path`.
pub fn reader_opener(kind: ContainerKind, path: &Path) -> OpenReader {
    let path = path.to_path_buf();
    Box::new(move || open_reader(kind, &path))
}

/// Zip reader keeping the archive handle open for its whole lifetime.
#[derive(Debug)]
pub struct ZipReader {
    archive: ZipArchive<File>,
}

impl ZipReader {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("opening archive {:?}", path))?;
        let archive = ZipArchive::new(file).map_err(|err| anyhow!("{}", err))?;
        Ok(Self { archive })
    }
}

impl ArchiveReader for ZipReader {
    fn entry_names(&mut self) -> Result<Vec<String>> {
        let mut names = Vec::with_capacity(self.archive.len());
        for idx in 0..self.archive.len() {
            let file = self.archive.by_index(idx).map_err(|err| anyhow!("{}", err))?;
            if file.is_dir() || file.enclosed_name().is_none() || util::is_hidden(file.name()) {
                continue;
            }
            names.push(file.name().to_string());
        }
        Ok(names)
    }

    fn read_entry(&mut self, name: &str) -> Result<Vec<u8>> {
        let mut file = self.archive.by_name(name).map_err(|err| anyhow!("{}: {}", name, err))?;
        let mut bytes = Vec::with_capacity(file.size() as usize);
        file.read_to_end(&mut bytes).with_context(|| format!("decompressing {name}"))?;
        Ok(bytes)
    }
}

type RarCursor = OpenArchive<Process, CursorBeforeHeader>;

/// Rar reader holding one forward-only processing cursor.
///
/// Entries are read by walking the cursor forward, so reading pages in archive order
/// decompresses each entry once even in solid archives. A request for an entry behind the
/// cursor restarts the walk from the first header.
pub struct RarReader {
    path: PathBuf,
    cursor: Option<RarCursor>,
}

impl fmt::Debug for RarReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RarReader")
            .field("path", &self.path)
            .field("positioned", &self.cursor.is_some())
            .finish()
    }
}

impl RarReader {
    pub fn open(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(anyhow!("archive {:?} is not a file", path));
        }
        Ok(Self { path: path.to_path_buf(), cursor: None })
    }

    fn rewind(&self) -> Result<RarCursor> {
        unrar::Archive::new(&self.path)
            .open_for_processing()
            .map_err(|err| anyhow!("opening rar {:?}: {}", self.path, err))
    }
}

impl ArchiveReader for RarReader {
    fn entry_names(&mut self) -> Result<Vec<String>> {
        let listing = unrar::Archive::new(&self.path)
            .open_for_listing()
            .map_err(|err| anyhow!("opening rar {:?}: {}", self.path, err))?;

        let mut names = Vec::new();
        for header in listing {
            let header = header.map_err(|err| anyhow!("reading rar header: {}", err))?;
            if header.is_directory() {
                continue;
            }
            let name = header.filename.to_string_lossy().into_owned();
            if !util::is_hidden(&name) {
                names.push(name);
            }
        }
        Ok(names)
    }

    fn read_entry(&mut self, name: &str) -> Result<Vec<u8>> {
        // A failed step drops the cursor; the next call starts over.
        let mut rewound = false;
        loop {
            let cursor = match self.cursor.take() {
                Some(cursor) => cursor,
                None => {
                    rewound = true;
                    self.rewind()?
                }
            };

            let Some(header) =
                cursor.read_header().map_err(|err| anyhow!("reading rar header: {}", err))?
            else {
                if rewound {
                    return Err(anyhow!("entry {name} not found in {:?}", self.path));
                }
                continue;
            };

            if header.entry().filename.to_string_lossy() == name {
                let (bytes, rest) =
                    header.read().map_err(|err| anyhow!("decompressing {name}: {}", err))?;
                self.cursor = Some(rest);
                return Ok(bytes);
            }
            self.cursor =
                Some(header.skip().map_err(|err| anyhow!("skipping rar entry: {}", err))?);
        }
    }
}
