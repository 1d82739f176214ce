//! Keymap File Descriptors
//!
//! The virtual keyboard protocol takes the keymap as a file descriptor the
//! compositor maps read-only. [`KeymapFile`] owns an anonymous memfd holding
//! one document; the descriptor is closed when the value is dropped, on every
//! path including errors. The compositor receives its own duplicate over the
//! socket, so dropping ours right after the request is sent is safe.
//!
//! # Platform Support
//!
//! Requires Linux 3.17+ with memfd_create syscall support.

use std::ffi::CStr;
use std::fs::File;
use std::io::Write;
use std::os::fd::{AsFd, AsRawFd, BorrowedFd};

use nix::fcntl::{fcntl, FcntlArg, SealFlag};
use nix::sys::memfd::{memfd_create, MemFdCreateFlag};
use tracing::{debug, warn};

use crate::error::Result;
use crate::keymap::KeymapDocument;

const MEMFD_NAME: &CStr = c"wtype-keymap";

/// Sealed in-memory file holding one keymap document
#[derive(Debug)]
pub struct KeymapFile {
    file: File,
    len: u32,
}

impl KeymapFile {
    /// Create the memfd and write the whole document into it
    ///
    /// # Errors
    ///
    /// Fails if memfd creation or writing fails.
    pub fn create(document: &KeymapDocument) -> Result<Self> {
        let fd = memfd_create(
            MEMFD_NAME,
            MemFdCreateFlag::MFD_CLOEXEC | MemFdCreateFlag::MFD_ALLOW_SEALING,
        )
        .map_err(std::io::Error::from)?;

        let mut file = File::from(fd);
        file.write_all(document.as_bytes())?;
        file.flush()?;

        // Sealing is hardening only; a compositor works fine without it
        let seals = SealFlag::F_SEAL_SHRINK | SealFlag::F_SEAL_GROW | SealFlag::F_SEAL_WRITE;
        if let Err(e) = fcntl(file.as_raw_fd(), FcntlArg::F_ADD_SEALS(seals)) {
            warn!("Failed to seal keymap memfd: {}", e);
        }

        debug!("Wrote {} keymap bytes to memfd", document.size());

        Ok(Self {
            file,
            len: document.size(),
        })
    }

    /// Size to announce with the fd, terminator included
    pub fn len(&self) -> u32 {
        self.len
    }

    /// True if the document was empty
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl AsFd for KeymapFile {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.file.as_fd()
    }
}
