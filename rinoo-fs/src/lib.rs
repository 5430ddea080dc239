//! Linux `inotify` filesystem watches surfaced as an async event
//! stream.
//!
//! Grounded in `original_source/src/fs/test/rn_inotify.c`'s
//! `rn_inotify`/`rn_inotify_add_watch`/`rn_inotify_event` shape (spec.md
//! §6, "Inotify"), reworked the way `rinoo-net`'s `Socket` wraps a
//! nonblocking fd around the current runtime's readiness poller instead
//! of the original's direct epoll integration. Recursive watches are
//! this crate's own addition on top of the raw kernel API: a directory
//! watched with `recursive: true` also gets `IN_CREATE` watched
//! internally (regardless of whether the caller asked for it) so newly
//! created subdirectories can be watched in turn; that bookkeeping
//! event is never surfaced unless the caller's own mask also asked for
//! `CREATE`.

use std::collections::HashMap;
use std::ffi::CString;
use std::io;
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd, RawFd};
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};

use rinoo_buf::Buffer;
use rinoo_driver::{syscall, Error, Result};
use rinoo_log::trace;
use rinoo_runtime::readable;

bitflags::bitflags! {
    /// Which filesystem events a watch reports, mirroring a subset of
    /// the kernel's `IN_*` constants (spec.md §6: "mask bits {CREATE,
    /// DELETE, MODIFY, …} defined by kernel").
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Mask: u32 {
        const CREATE      = libc::IN_CREATE as u32;
        const DELETE      = libc::IN_DELETE as u32;
        const MODIFY      = libc::IN_MODIFY as u32;
        const ATTRIB      = libc::IN_ATTRIB as u32;
        const MOVED_FROM  = libc::IN_MOVED_FROM as u32;
        const MOVED_TO    = libc::IN_MOVED_TO as u32;
        const DELETE_SELF = libc::IN_DELETE_SELF as u32;
        const MOVE_SELF   = libc::IN_MOVE_SELF as u32;
    }
}

/// A single filesystem change observed on a watched path.
#[derive(Debug, Clone)]
pub struct InotifyEvent {
    pub mask: Mask,
    pub path: PathBuf,
}

#[derive(Clone)]
struct Watch {
    path: PathBuf,
    mask: Mask,
    recursive: bool,
}

/// An inotify instance: one kernel fd, a table of active watches keyed
/// by watch descriptor, and a [`Buffer`] used to accumulate raw event
/// bytes across partial reads.
///
/// Mirrors `rn_inotify_t`.
pub struct Inotify {
    fd: OwnedFd,
    watches: HashMap<i32, Watch>,
    buf: Buffer,
}

const HEADER_LEN: usize = std::mem::size_of::<i32>() * 3 + std::mem::size_of::<u32>();

struct RawEvent {
    wd: i32,
    mask: u32,
    name: String,
}

impl Inotify {
    /// Opens a new, watchless inotify instance.
    ///
    /// Mirrors `rn_inotify`.
    pub fn new() -> Result<Self> {
        let raw = syscall!(libc::inotify_init1(libc::IN_NONBLOCK | libc::IN_CLOEXEC))?;
        // SAFETY: `inotify_init1` returned a freshly owned descriptor.
        let fd = unsafe { OwnedFd::from_raw_fd(raw) };
        Ok(Self {
            fd,
            watches: HashMap::new(),
            buf: Buffer::new()?,
        })
    }

    /// Watches `path` for the events in `mask`. If `recursive`, every
    /// subdirectory that currently exists (or is created later) under
    /// `path` is watched too.
    ///
    /// Mirrors `rn_inotify_add_watch`.
    pub fn add_watch(&mut self, path: impl AsRef<Path>, mask: Mask, recursive: bool) -> Result<()> {
        self.add_watch_inner(path.as_ref(), mask, recursive)
    }

    fn add_watch_inner(&mut self, path: &Path, mask: Mask, recursive: bool) -> Result<()> {
        let sys_mask = if recursive {
            mask | Mask::CREATE
        } else {
            mask
        };
        let wd = self.raw_add_watch(path, sys_mask)?;
        self.watches.insert(
            wd,
            Watch {
                path: path.to_path_buf(),
                mask,
                recursive,
            },
        );
        if recursive {
            if let Ok(entries) = std::fs::read_dir(path) {
                for entry in entries.flatten() {
                    let child = entry.path();
                    if child.is_dir() {
                        self.add_watch_inner(&child, mask, true)?;
                    }
                }
            }
        }
        Ok(())
    }

    fn raw_add_watch(&self, path: &Path, mask: Mask) -> Result<i32> {
        let c_path = CString::new(path.as_os_str().as_bytes()).map_err(|_| Error::InvalidArgument)?;
        let wd = syscall!(libc::inotify_add_watch(
            self.fd.as_raw_fd(),
            c_path.as_ptr(),
            mask.bits(),
        ))?;
        trace!("watching {} as wd {}", path.display(), wd);
        Ok(wd)
    }

    /// Waits for and returns the next event satisfying any active
    /// watch's mask. Internal bookkeeping events (e.g. a subdirectory
    /// create noticed only to extend a recursive watch) are consumed
    /// without being returned.
    ///
    /// Mirrors `rn_inotify_event`.
    pub async fn event(&mut self) -> Result<InotifyEvent> {
        loop {
            if let Some(raw) = self.take_event() {
                if let Some(event) = self.translate(raw)? {
                    return Ok(event);
                }
                continue;
            }
            self.fill().await?;
        }
    }

    async fn fill(&mut self) -> Result<()> {
        let fd = self.fd.as_raw_fd();
        let mut scratch = [0u8; 4096];
        loop {
            let n = syscall!(libc::read(fd, scratch.as_mut_ptr().cast(), scratch.len()));
            match n {
                Ok(n) if n > 0 => {
                    self.buf.add(&scratch[..n as usize])?;
                    return Ok(());
                }
                Ok(_) => return Err(Error::Closed),
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    readable(fd).await.map_err(Error::from)?;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn take_event(&mut self) -> Option<RawEvent> {
        let slice = self.buf.as_slice();
        if slice.len() < HEADER_LEN {
            return None;
        }
        let wd = i32::from_ne_bytes(slice[0..4].try_into().unwrap());
        let mask = u32::from_ne_bytes(slice[4..8].try_into().unwrap());
        let len = u32::from_ne_bytes(slice[12..16].try_into().unwrap()) as usize;
        let total = HEADER_LEN + len;
        if slice.len() < total {
            return None;
        }
        let name_bytes = &slice[HEADER_LEN..total];
        let name_end = name_bytes.iter().position(|&b| b == 0).unwrap_or(len);
        let name = String::from_utf8_lossy(&name_bytes[..name_end]).into_owned();
        self.buf.erase(total);
        Some(RawEvent { wd, mask, name })
    }

    fn translate(&mut self, raw: RawEvent) -> Result<Option<InotifyEvent>> {
        let Some(watch) = self.watches.get(&raw.wd).cloned() else {
            return Ok(None);
        };
        let is_dir = raw.mask & (libc::IN_ISDIR as u32) != 0;
        let path = if raw.name.is_empty() {
            watch.path.clone()
        } else {
            watch.path.join(&raw.name)
        };
        if watch.recursive && is_dir && raw.mask & (libc::IN_CREATE as u32) != 0 {
            self.add_watch_inner(&path, watch.mask, true)?;
        }
        let observed = Mask::from_bits_truncate(raw.mask);
        let reportable = observed & watch.mask;
        if reportable.is_empty() {
            return Ok(None);
        }
        Ok(Some(InotifyEvent {
            mask: reportable,
            path,
        }))
    }
}

impl AsRawFd for Inotify {
    fn as_raw_fd(&self) -> RawFd {
        self.fd.as_raw_fd()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rinoo_runtime::Runtime;
    use std::fs;

    #[test]
    fn reports_create_and_delete_for_watched_directory() {
        let rt = Runtime::new().unwrap();
        rt.block_on(async {
            let dir = tempfile::tempdir().unwrap();
            let mut inotify = Inotify::new().unwrap();
            inotify
                .add_watch(dir.path(), Mask::CREATE | Mask::DELETE, false)
                .unwrap();

            let file = dir.path().join("probe");
            fs::write(&file, b"x").unwrap();
            let created = inotify.event().await.unwrap();
            assert!(created.mask.contains(Mask::CREATE));
            assert_eq!(created.path, file);

            fs::remove_file(&file).unwrap();
            let deleted = inotify.event().await.unwrap();
            assert!(deleted.mask.contains(Mask::DELETE));
            assert_eq!(deleted.path, file);
        });
    }

    #[test]
    fn recursive_watch_follows_new_subdirectories() {
        let rt = Runtime::new().unwrap();
        rt.block_on(async {
            let dir = tempfile::tempdir().unwrap();
            let mut inotify = Inotify::new().unwrap();
            inotify.add_watch(dir.path(), Mask::CREATE, true).unwrap();

            let sub = dir.path().join("child");
            fs::create_dir(&sub).unwrap();
            // The directory's own creation is reported first...
            let sub_created = inotify.event().await.unwrap();
            assert_eq!(sub_created.path, sub);

            // ...and a file created inside it afterward is observed too,
            // proving the recursive watch was actually installed on `sub`.
            let nested = sub.join("nested");
            fs::write(&nested, b"x").unwrap();
            let nested_created = inotify.event().await.unwrap();
            assert_eq!(nested_created.path, nested);
        });
    }
}
