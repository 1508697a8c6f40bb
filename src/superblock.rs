//! The superblock: a constant geometry record written once at format time.

use std::mem;
use std::slice;

use crate::disk::{reinterpret, Disk};
use crate::error::{Error, Result};
use crate::geometry::{
	BLOCKS_COUNT, BLOCK_SIZE, FIRST_DATA_BLOCK, INODES_COUNT, INODE_SIZE, MAGIC_NUMBER,
	SUPERBLOCK_BLOCK,
};

/// The on-disk superblock. Written once by `format`, read back for validation.
#[derive(Debug, Clone)]
pub struct Superblock {
	pub total_blocks: u32,
	pub total_inodes: u32,
	pub block_size: u32,
	pub inode_size: u32,
	pub blocks_per_group: u32,
	pub inodes_per_group: u32,
	pub first_data_block: u32,
	pub fs_uuid: [u8; 16],
	pub volume_name: [u8; 32],
	pub magic_number: u16,
}

/// The superblock's on-disk layout. Moved to and from the image as raw bytes via
/// [`reinterpret`], the way the teacher's `Superblock`/`BlockGroupDescriptor`/`INode` do.
#[repr(C, packed)]
struct RawSuperblock {
	total_blocks: u32,
	total_inodes: u32,
	block_size: u32,
	inode_size: u32,
	blocks_per_group: u32,
	inodes_per_group: u32,
	first_data_block: u32,
	fs_uuid: [u8; 16],
	volume_name: [u8; 32],
	magic_number: u16,
}

impl Superblock {
	/// Builds the superblock for a freshly formatted image with this crate's fixed geometry.
	pub fn new(fs_uuid: [u8; 16], volume_name: &str) -> Self {
		let mut name = [0u8; 32];
		let bytes = volume_name.as_bytes();
		let len = bytes.len().min(name.len());
		name[..len].copy_from_slice(&bytes[..len]);
		Self {
			total_blocks: BLOCKS_COUNT,
			total_inodes: INODES_COUNT,
			block_size: BLOCK_SIZE as u32,
			inode_size: INODE_SIZE as u32,
			blocks_per_group: BLOCKS_COUNT,
			inodes_per_group: INODES_COUNT,
			first_data_block: FIRST_DATA_BLOCK,
			fs_uuid,
			volume_name: name,
			magic_number: MAGIC_NUMBER,
		}
	}

	fn to_raw(&self) -> RawSuperblock {
		RawSuperblock {
			total_blocks: self.total_blocks,
			total_inodes: self.total_inodes,
			block_size: self.block_size,
			inode_size: self.inode_size,
			blocks_per_group: self.blocks_per_group,
			inodes_per_group: self.inodes_per_group,
			first_data_block: self.first_data_block,
			fs_uuid: self.fs_uuid,
			volume_name: self.volume_name,
			magic_number: self.magic_number,
		}
	}

	fn from_raw(raw: RawSuperblock) -> Self {
		Self {
			total_blocks: raw.total_blocks,
			total_inodes: raw.total_inodes,
			block_size: raw.block_size,
			inode_size: raw.inode_size,
			blocks_per_group: raw.blocks_per_group,
			inodes_per_group: raw.inodes_per_group,
			first_data_block: raw.first_data_block,
			fs_uuid: raw.fs_uuid,
			volume_name: raw.volume_name,
			magic_number: raw.magic_number,
		}
	}

	/// Writes the superblock to block 0. The remainder of the block is left untouched by this
	/// call; `format` zeroes the block first.
	pub fn write(&self, disk: &mut Disk) -> Result<()> {
		let raw = self.to_raw();
		disk.write_at(SUPERBLOCK_BLOCK, 0, reinterpret(&raw))
	}

	/// Reads and validates the superblock from block 0.
	pub fn read(disk: &mut Disk) -> Result<Self> {
		let mut raw: RawSuperblock = unsafe { mem::zeroed() };
		let buf = unsafe {
			slice::from_raw_parts_mut(&mut raw as *mut _ as *mut u8, mem::size_of::<RawSuperblock>())
		};
		disk.read_at(SUPERBLOCK_BLOCK, 0, buf)?;
		let sb = Self::from_raw(raw);
		if sb.magic_number != MAGIC_NUMBER {
			return Err(Error::InvalidArgument);
		}
		Ok(sb)
	}

	/// Tells whether the image at block 0 already carries this filesystem's magic number,
	/// without failing if it does not (used by `mkfs` to warn before reformatting).
	pub fn is_present(disk: &mut Disk) -> Result<bool> {
		let mut buf = [0u8; 2];
		let magic_offset = mem::size_of::<RawSuperblock>() as u64 - 2;
		disk.read_at(SUPERBLOCK_BLOCK, magic_offset, &mut buf)?;
		Ok(u16::from_le_bytes(buf) == MAGIC_NUMBER)
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn round_trips_fields() {
		let raw = Superblock::new([7u8; 16], "rootfs").to_raw();
		let decoded = Superblock::from_raw(raw);
		assert_eq!(decoded.total_blocks, BLOCKS_COUNT);
		assert_eq!(decoded.total_inodes, INODES_COUNT);
		assert_eq!(decoded.first_data_block, FIRST_DATA_BLOCK);
		assert_eq!(decoded.magic_number, MAGIC_NUMBER);
		assert_eq!(&decoded.volume_name[..6], b"rootfs");
	}
}
