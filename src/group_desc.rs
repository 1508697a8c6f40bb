//! The (single) block group descriptor: mutable counters plus pointers to the bitmaps and
//! inode table, patterned on the teacher's `BlockGroupDescriptor`.

use std::mem;
use std::slice;

use crate::disk::{reinterpret, Disk};
use crate::error::Result;
use crate::geometry::{
	BLOCK_BITMAP_BLOCK, GROUP_DESC_BLOCK, INODE_BITMAP_BLOCK, INODE_TABLE_BLOCK,
};

/// The mutable counters and fixed pointers describing the filesystem's single block group.
#[derive(Debug, Clone)]
pub struct GroupDescriptor {
	pub block_bitmap_block: u32,
	pub inode_bitmap_block: u32,
	pub inode_table_block: u32,
	pub free_blocks_count: u32,
	pub free_inodes_count: u32,
	pub used_dirs_count: u32,
}

/// The descriptor's on-disk layout, moved to and from the image via [`reinterpret`].
#[repr(C, packed)]
struct RawGroupDescriptor {
	block_bitmap_block: u32,
	inode_bitmap_block: u32,
	inode_table_block: u32,
	free_blocks_count: u32,
	free_inodes_count: u32,
	used_dirs_count: u32,
}

impl GroupDescriptor {
	/// Builds the descriptor for a freshly formatted image.
	pub fn new(free_blocks_count: u32, free_inodes_count: u32) -> Self {
		Self {
			block_bitmap_block: BLOCK_BITMAP_BLOCK,
			inode_bitmap_block: INODE_BITMAP_BLOCK,
			inode_table_block: INODE_TABLE_BLOCK,
			free_blocks_count,
			free_inodes_count,
			used_dirs_count: 0,
		}
	}

	fn to_raw(&self) -> RawGroupDescriptor {
		RawGroupDescriptor {
			block_bitmap_block: self.block_bitmap_block,
			inode_bitmap_block: self.inode_bitmap_block,
			inode_table_block: self.inode_table_block,
			free_blocks_count: self.free_blocks_count,
			free_inodes_count: self.free_inodes_count,
			used_dirs_count: self.used_dirs_count,
		}
	}

	fn from_raw(raw: RawGroupDescriptor) -> Self {
		Self {
			block_bitmap_block: raw.block_bitmap_block,
			inode_bitmap_block: raw.inode_bitmap_block,
			inode_table_block: raw.inode_table_block,
			free_blocks_count: raw.free_blocks_count,
			free_inodes_count: raw.free_inodes_count,
			used_dirs_count: raw.used_dirs_count,
		}
	}

	/// Reads the descriptor from its fixed block.
	pub fn read(disk: &mut Disk) -> Result<Self> {
		let mut raw: RawGroupDescriptor = unsafe { mem::zeroed() };
		let buf = unsafe {
			slice::from_raw_parts_mut(
				&mut raw as *mut _ as *mut u8,
				mem::size_of::<RawGroupDescriptor>(),
			)
		};
		disk.read_at(GROUP_DESC_BLOCK, 0, buf)?;
		Ok(Self::from_raw(raw))
	}

	/// Writes the descriptor to its fixed block.
	pub fn write(&self, disk: &mut Disk) -> Result<()> {
		let raw = self.to_raw();
		disk.write_at(GROUP_DESC_BLOCK, 0, reinterpret(&raw))
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn round_trips() {
		let mut gd = GroupDescriptor::new(100, 50);
		gd.used_dirs_count = 3;
		let raw = gd.to_raw();
		let decoded = GroupDescriptor::from_raw(raw);
		assert_eq!(decoded.free_blocks_count, 100);
		assert_eq!(decoded.free_inodes_count, 50);
		assert_eq!(decoded.used_dirs_count, 3);
		assert_eq!(decoded.inode_table_block, INODE_TABLE_BLOCK);
	}
}
