//! Inode and data-block (de)allocation.
//!
//! Two instances of the same bitmap-plus-counter pattern, one for inodes and one for data
//! blocks, each coupled to the group descriptor's counters.

use crate::bitmap::Bitmap;
use crate::error::{Error, Result};
use crate::group_desc::GroupDescriptor;
use crate::inode::{FileType, Inode, InodeTable};

/// Allocates a fresh data block, returning its data-block id (not a physical block address).
///
/// Scans from index 1: index 0 is permanently reserved and never handed out, so it safely
/// doubles as the "no block" sentinel in an inode's block-id fields.
pub fn allocate_data_block(bitmap: &mut Bitmap, group: &mut GroupDescriptor) -> Result<u32> {
	if group.free_blocks_count == 0 {
		return Err(Error::NoSpace);
	}
	let id = bitmap.find_first_free(1).ok_or(Error::NoSpace)?;
	bitmap.set(id)?;
	group.free_blocks_count -= 1;
	Ok(id as u32)
}

/// Frees a previously allocated data block.
pub fn free_data_block(bitmap: &mut Bitmap, group: &mut GroupDescriptor, id: u32) -> Result<()> {
	bitmap.clear(id as usize)?;
	group.free_blocks_count += 1;
	Ok(())
}

/// Allocates a fresh inode of the given type, returning its (0-origin) inode number.
pub fn allocate_inode(
	bitmap: &mut Bitmap,
	group: &mut GroupDescriptor,
	table: &mut InodeTable,
	file_type: FileType,
	permissions: u16,
) -> Result<u32> {
	if group.free_inodes_count == 0 {
		return Err(Error::NoSpace);
	}
	let i = bitmap.find_first_free(0).ok_or(Error::NoSpace)?;
	bitmap.set(i)?;
	group.free_inodes_count -= 1;
	if file_type == FileType::Directory {
		group.used_dirs_count += 1;
	}
	let node = Inode::new(i as u32, file_type, permissions);
	table.set(i as u32, node)?;
	Ok(i as u32)
}

/// Deallocates an inode, zeroing its record and releasing its bit.
///
/// Rejects `n == 0` (the root's own index, see `geometry::ROOT_INODE`): this is what keeps
/// the root directory permanently unlinkable rather than needing a dedicated special case.
pub fn deallocate_inode(
	bitmap: &mut Bitmap,
	group: &mut GroupDescriptor,
	table: &mut InodeTable,
	n: u32,
) -> Result<()> {
	if n == 0 || n >= bitmap.len() as u32 {
		return Err(Error::Bounds);
	}
	if !bitmap.test(n as usize)? {
		return Err(Error::NotAllocated);
	}
	let was_dir = table.get(n)?.file_type == FileType::Directory;
	bitmap.clear(n as usize)?;
	if was_dir {
		group.used_dirs_count -= 1;
	}
	table.set(n, Inode::zeroed(n))?;
	group.free_inodes_count += 1;
	Ok(())
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn data_block_allocation_starts_at_one() {
		let mut bitmap = Bitmap::init(16);
		let mut group = GroupDescriptor::new(16, 16);
		let id = allocate_data_block(&mut bitmap, &mut group).unwrap();
		assert_eq!(id, 1);
		assert_eq!(group.free_blocks_count, 15);
	}

	#[test]
	fn data_block_no_space() {
		let mut bitmap = Bitmap::init(16);
		let mut group = GroupDescriptor::new(0, 16);
		assert!(matches!(
			allocate_data_block(&mut bitmap, &mut group),
			Err(Error::NoSpace)
		));
	}

	#[test]
	fn free_data_block_restores_counter() {
		let mut bitmap = Bitmap::init(16);
		let mut group = GroupDescriptor::new(16, 16);
		let id = allocate_data_block(&mut bitmap, &mut group).unwrap();
		free_data_block(&mut bitmap, &mut group, id).unwrap();
		assert_eq!(group.free_blocks_count, 16);
		assert!(!bitmap.test(id as usize).unwrap());
	}

	#[test]
	fn inode_allocation_tracks_directories() {
		let mut bitmap = Bitmap::init(16);
		let mut group = GroupDescriptor::new(16, 16);
		let mut table = InodeTable::init(16);
		let root = allocate_inode(&mut bitmap, &mut group, &mut table, FileType::Directory, 0o755)
			.unwrap();
		assert_eq!(root, 0);
		assert_eq!(group.used_dirs_count, 1);
		assert_eq!(group.free_inodes_count, 15);
	}

	#[test]
	fn deallocate_root_is_rejected() {
		let mut bitmap = Bitmap::init(16);
		let mut group = GroupDescriptor::new(16, 16);
		let mut table = InodeTable::init(16);
		allocate_inode(&mut bitmap, &mut group, &mut table, FileType::Directory, 0o755).unwrap();
		assert!(matches!(
			deallocate_inode(&mut bitmap, &mut group, &mut table, 0),
			Err(Error::Bounds)
		));
	}

	#[test]
	fn deallocate_unallocated_inode_fails() {
		let mut bitmap = Bitmap::init(16);
		let mut group = GroupDescriptor::new(16, 16);
		let mut table = InodeTable::init(16);
		assert!(matches!(
			deallocate_inode(&mut bitmap, &mut group, &mut table, 5),
			Err(Error::NotAllocated)
		));
	}

	#[test]
	fn deallocate_directory_decrements_used_dirs() {
		let mut bitmap = Bitmap::init(16);
		let mut group = GroupDescriptor::new(16, 16);
		let mut table = InodeTable::init(16);
		allocate_inode(&mut bitmap, &mut group, &mut table, FileType::Directory, 0o755).unwrap();
		let f = allocate_inode(&mut bitmap, &mut group, &mut table, FileType::Directory, 0o755)
			.unwrap();
		deallocate_inode(&mut bitmap, &mut group, &mut table, f).unwrap();
		assert_eq!(group.used_dirs_count, 1);
		assert_eq!(group.free_inodes_count, 15);
	}
}
