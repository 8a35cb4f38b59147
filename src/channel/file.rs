//! Append-only file capability
//!
//! The channel only talks to its file through `LogFile`, so tests can hand in
//! doubles instead of real files.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// An already-open, append-capable file
pub trait LogFile: Send {
    /// Current length of the file in bytes
    fn size(&mut self) -> io::Result<u64>;

    /// Append all of `buf` at the end of the file
    fn append(&mut self, buf: &[u8]) -> io::Result<()>;

    /// Read into `buf` starting at `position`; returns bytes read (0 at EOF)
    fn read_at(&mut self, buf: &mut [u8], position: u64) -> io::Result<usize>;

    /// Make appended bytes durable
    fn sync(&mut self) -> io::Result<()>;

    /// Release the underlying resource
    fn close(&mut self) -> io::Result<()>;
}

/// `LogFile` backed by a file on disk
pub struct FileHandle {
    path: PathBuf,
    file: Option<File>,
}

impl FileHandle {
    /// Open or create the file at `path`; existing content is kept
    pub fn open(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .open(path)?;

        Ok(Self {
            path: path.to_path_buf(),
            file: Some(file),
        })
    }

    /// Path this handle was opened with
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn file(&mut self) -> io::Result<&mut File> {
        self.file.as_mut().ok_or_else(|| {
            io::Error::new(io::ErrorKind::Other, "file handle is closed")
        })
    }
}

impl LogFile for FileHandle {
    fn size(&mut self) -> io::Result<u64> {
        Ok(self.file()?.metadata()?.len())
    }

    fn append(&mut self, buf: &[u8]) -> io::Result<()> {
        let file = self.file()?;
        file.seek(SeekFrom::End(0))?;
        file.write_all(buf)
    }

    fn read_at(&mut self, buf: &mut [u8], position: u64) -> io::Result<usize> {
        let file = self.file()?;
        file.seek(SeekFrom::Start(position))?;

        // Keep reading until buf is full or EOF
        let mut filled = 0;
        while filled < buf.len() {
            match file.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(filled)
    }

    fn sync(&mut self) -> io::Result<()> {
        self.file()?.sync_data()
    }

    fn close(&mut self) -> io::Result<()> {
        // Dropping the File closes the descriptor
        self.file.take();
        Ok(())
    }
}
