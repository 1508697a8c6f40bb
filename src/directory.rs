//! The directory block codec: an ordered list of entries, serialized as
//! `{entries_count, entry[entries_count]}`.

use crate::error::{Error, Result};
use crate::geometry::{DIR_ENTRY_SIZE, MAX_NAME_LEN};
use crate::inode::FileType;

/// One directory entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
	pub inode: u32,
	pub name: String,
	pub file_type: FileType,
}

/// An ordered, in-memory view of a directory's contents.
#[derive(Debug, Clone, Default)]
pub struct DirectoryBlock {
	entries: Vec<DirEntry>,
}

impl DirectoryBlock {
	/// Builds the minimal two-entry block (`.` and `..`) for a freshly created directory.
	///
	/// `self_inode` and `parent_inode` may be equal, which is how the root directory points
	/// `..` at itself.
	pub fn new_minimal(self_inode: u32, parent_inode: u32) -> Self {
		Self {
			entries: vec![
				DirEntry {
					inode: self_inode,
					name: ".".to_owned(),
					file_type: FileType::Directory,
				},
				DirEntry {
					inode: parent_inode,
					name: "..".to_owned(),
					file_type: FileType::Directory,
				},
			],
		}
	}

	/// The entries, in insertion order.
	pub fn entries(&self) -> &[DirEntry] {
		&self.entries
	}

	/// The number of entries.
	pub fn len(&self) -> usize {
		self.entries.len()
	}

	/// Whether the block has no entries at all (never true for a well-formed directory, which
	/// always carries at least `.` and `..`).
	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	/// The on-disk byte size of this block: a 4-byte count followed by one 264-byte record
	/// per entry.
	pub fn encoded_len(&self) -> u64 {
		4 + self.entries.len() as u64 * DIR_ENTRY_SIZE
	}

	/// Looks up an entry by exact name.
	pub fn find(&self, name: &str) -> Option<&DirEntry> {
		self.entries.iter().find(|e| e.name == name)
	}

	/// Returns a new block with `(inode, name, file_type)` appended.
	///
	/// Fails `InvalidArgument` if `name` exceeds 255 bytes, or if an entry with that name
	/// already exists (directory entries are unique by name).
	pub fn add_entry(&self, inode: u32, name: &str, file_type: FileType) -> Result<Self> {
		if name.len() > MAX_NAME_LEN {
			return Err(Error::InvalidArgument);
		}
		if self.find(name).is_some() {
			return Err(Error::InvalidArgument);
		}
		let mut entries = self.entries.clone();
		entries.push(DirEntry {
			inode,
			name: name.to_owned(),
			file_type,
		});
		Ok(Self { entries })
	}

	/// Returns a new block with the first entry whose `inode` matches `inode` removed.
	/// Fails `NotFound` if no entry matches.
	pub fn remove_entry(&self, inode: u32) -> Result<Self> {
		let idx = self
			.entries
			.iter()
			.position(|e| e.inode == inode)
			.ok_or(Error::NotFound)?;
		let mut entries = self.entries.clone();
		entries.remove(idx);
		Ok(Self { entries })
	}

	/// Serializes the block to bytes: `{count: u32, entry[count]}`, each entry laid out as
	/// `{inode: u32, rec_len: u16, name_len: u8, file_type: u8, name: [u8; 256]}`.
	pub fn encode(&self) -> Vec<u8> {
		let mut buf = Vec::with_capacity(self.encoded_len() as usize);
		buf.extend_from_slice(&(self.entries.len() as u32).to_le_bytes());
		for e in &self.entries {
			buf.extend_from_slice(&e.inode.to_le_bytes());
			buf.extend_from_slice(&(DIR_ENTRY_SIZE as u16).to_le_bytes());
			let name_bytes = e.name.as_bytes();
			buf.push(name_bytes.len() as u8);
			buf.push(match e.file_type {
				FileType::Regular => 0,
				FileType::Directory => 1,
			});
			let mut name = [0u8; 256];
			name[..name_bytes.len()].copy_from_slice(name_bytes);
			buf.extend_from_slice(&name);
		}
		buf
	}

	/// Parses a block previously produced by [`Self::encode`].
	pub fn decode(buf: &[u8]) -> Result<Self> {
		if buf.len() < 4 {
			return Err(Error::InvalidArgument);
		}
		let count = u32::from_le_bytes(buf[0..4].try_into().unwrap()) as usize;
		let mut entries = Vec::with_capacity(count);
		let mut r = 4usize;
		for _ in 0..count {
			if buf.len() < r + DIR_ENTRY_SIZE as usize {
				return Err(Error::InvalidArgument);
			}
			let inode = u32::from_le_bytes(buf[r..r + 4].try_into().unwrap());
			// rec_len is fixed and not needed to walk the buffer; skip it.
			let name_len = buf[r + 6] as usize;
			let file_type = match buf[r + 7] {
				0 => FileType::Regular,
				1 => FileType::Directory,
				_ => return Err(Error::InvalidArgument),
			};
			let name_start = r + 8;
			let name = String::from_utf8_lossy(&buf[name_start..name_start + name_len])
				.into_owned();
			entries.push(DirEntry {
				inode,
				name,
				file_type,
			});
			r += DIR_ENTRY_SIZE as usize;
		}
		Ok(Self { entries })
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn minimal_block_has_dot_and_dotdot() {
		let block = DirectoryBlock::new_minimal(1, 0);
		assert_eq!(block.entries()[0].name, ".");
		assert_eq!(block.entries()[0].inode, 1);
		assert_eq!(block.entries()[1].name, "..");
		assert_eq!(block.entries()[1].inode, 0);
	}

	#[test]
	fn add_then_encode_decode_round_trips() {
		let block = DirectoryBlock::new_minimal(0, 0)
			.add_entry(1, "a", FileType::Directory)
			.unwrap()
			.add_entry(2, "b.txt", FileType::Regular)
			.unwrap();
		let bytes = block.encode();
		let decoded = DirectoryBlock::decode(&bytes).unwrap();
		assert_eq!(decoded.entries(), block.entries());
	}

	#[test]
	fn add_duplicate_name_fails() {
		let block = DirectoryBlock::new_minimal(0, 0);
		assert!(matches!(
			block.add_entry(5, ".", FileType::Directory),
			Err(Error::InvalidArgument)
		));
	}

	#[test]
	fn remove_missing_entry_fails() {
		let block = DirectoryBlock::new_minimal(0, 0);
		assert!(matches!(block.remove_entry(99), Err(Error::NotFound)));
	}

	#[test]
	fn remove_entry_preserves_order_of_rest() {
		let block = DirectoryBlock::new_minimal(0, 0)
			.add_entry(1, "a", FileType::Directory)
			.unwrap()
			.add_entry(2, "b", FileType::Directory)
			.unwrap();
		let removed = block.remove_entry(1).unwrap();
		let names: Vec<_> = removed.entries().iter().map(|e| e.name.as_str()).collect();
		assert_eq!(names, vec![".", "..", "b"]);
	}

	#[test]
	fn name_too_long_is_rejected() {
		let block = DirectoryBlock::new_minimal(0, 0);
		let name = "a".repeat(256);
		assert!(matches!(
			block.add_entry(9, &name, FileType::Regular),
			Err(Error::InvalidArgument)
		));
	}
}
