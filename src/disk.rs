//! Block-granular I/O on the backing image file.
//!
//! Every higher layer routes reads and writes through here instead of computing file
//! offsets itself, the same separation the teacher keeps between `BlockGroupDescriptor`/
//! `INode` (which only know block ids and in-block offsets) and the raw `Seek`/`Read`/
//! `Write` calls on the `File`.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::mem::size_of;
use std::path::Path;
use std::slice;

use crate::error::Result;
use crate::geometry::{BLOCKS_COUNT, BLOCK_SIZE};

/// Reinterprets `val`'s raw memory as a byte slice. The on-disk records (`Superblock`,
/// `GroupDescriptor`, `Inode`) each keep a private `#[repr(C, packed)]` shadow of their
/// disk layout and move it to and from the image through this, rather than serializing
/// field by field.
pub(crate) fn reinterpret<T>(val: &T) -> &[u8] {
	unsafe { slice::from_raw_parts(val as *const T as *const u8, size_of::<T>()) }
}

/// A handle on the backing disk image.
pub struct Disk {
	file: File,
}

impl Disk {
	/// Opens an existing disk image at `path` for reading and writing.
	pub fn open(path: &Path) -> Result<Self> {
		let file = OpenOptions::new().read(true).write(true).open(path)?;
		Ok(Self { file })
	}

	/// Creates a fresh, zero-filled disk image at `path`, truncating it if it already exists.
	pub fn create(path: &Path) -> Result<Self> {
		let file = OpenOptions::new()
			.read(true)
			.write(true)
			.create(true)
			.truncate(true)
			.open(path)?;
		file.set_len(BLOCK_SIZE * BLOCKS_COUNT as u64)?;
		Ok(Self { file })
	}

	/// Reads exactly `buf.len()` bytes starting at `block_id * BLOCK_SIZE + offset`.
	pub fn read_at(&mut self, block_id: u32, offset: u64, buf: &mut [u8]) -> Result<()> {
		let pos = block_id as u64 * BLOCK_SIZE + offset;
		self.file.seek(SeekFrom::Start(pos))?;
		self.file.read_exact(buf)?;
		Ok(())
	}

	/// Writes exactly `buf` starting at `block_id * BLOCK_SIZE + offset`.
	pub fn write_at(&mut self, block_id: u32, offset: u64, buf: &[u8]) -> Result<()> {
		let pos = block_id as u64 * BLOCK_SIZE + offset;
		self.file.seek(SeekFrom::Start(pos))?;
		self.file.write_all(buf)?;
		Ok(())
	}

	/// Reads a whole block into a freshly allocated buffer.
	pub fn read_block(&mut self, block_id: u32) -> Result<Vec<u8>> {
		let mut buf = vec![0u8; BLOCK_SIZE as usize];
		self.read_at(block_id, 0, &mut buf)?;
		Ok(buf)
	}

	/// Writes a whole block of `BLOCK_SIZE` bytes.
	pub fn write_block(&mut self, block_id: u32, buf: &[u8]) -> Result<()> {
		debug_assert_eq!(buf.len(), BLOCK_SIZE as usize);
		self.write_at(block_id, 0, buf)
	}

	/// Overwrites an entire block with zero bytes.
	pub fn zero_block(&mut self, block_id: u32) -> Result<()> {
		let zeros = vec![0u8; BLOCK_SIZE as usize];
		self.write_block(block_id, &zeros)
	}

	/// Reads a little-endian `u32` at the given `index` (0-origin) within `block_id`.
	pub fn read_u32(&mut self, block_id: u32, index: u32) -> Result<u32> {
		let mut buf = [0u8; 4];
		self.read_at(block_id, index as u64 * 4, &mut buf)?;
		Ok(u32::from_le_bytes(buf))
	}

	/// Writes a little-endian `u32` at the given `index` (0-origin) within `block_id`.
	pub fn write_u32(&mut self, block_id: u32, index: u32, value: u32) -> Result<()> {
		self.write_at(block_id, index as u64 * 4, &value.to_le_bytes())
	}
}
