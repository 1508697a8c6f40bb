//! A small ext-style filesystem contained entirely within a single backing file.
//!
//! This crate implements the CORE filesystem engine only: disk image layout, the inode
//! model with indirect block trees, the allocation bitmaps, the directory representation,
//! and the create/read/write/delete operations. It exposes a handle-based API; an
//! interactive shell or a formatting tool are external consumers (see the `mkfs` and
//! `shell` binaries), not part of this library.

pub mod allocator;
pub mod bitmap;
pub mod directory;
pub mod disk;
pub mod error;
pub mod fs;
pub mod geometry;
pub mod group_desc;
pub mod inode;
pub mod superblock;

pub use error::{Error, Result};
pub use fs::{Filesystem, FormatOptions, FsckReport, WriteMode};
pub use geometry::ROOT_INODE;
