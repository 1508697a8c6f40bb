//! The filesystem's error taxonomy.

use std::fmt;
use std::io;

/// An error produced by a filesystem operation.
#[derive(Debug)]
pub enum Error {
	/// A read, write or seek on the backing image failed.
	Io(io::Error),
	/// The relevant bitmap has no free bit, or a group counter is exhausted.
	NoSpace,
	/// An index (inode number, logical block, directory entry) is out of range.
	Bounds,
	/// The operation references an inode or block that is not currently allocated.
	NotAllocated,
	/// A directory entry's file type does not match the operation, or the inode's own type.
	TypeMismatch,
	/// A name lookup or entry removal found nothing matching.
	NotFound,
	/// A caller-supplied argument is malformed (unknown write mode, name too long, ...).
	InvalidArgument,
}

impl fmt::Display for Error {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Io(e) => write!(f, "I/O error: {e}"),
			Self::NoSpace => write!(f, "no space left on device"),
			Self::Bounds => write!(f, "index out of bounds"),
			Self::NotAllocated => write!(f, "not allocated"),
			Self::TypeMismatch => write!(f, "type mismatch"),
			Self::NotFound => write!(f, "not found"),
			Self::InvalidArgument => write!(f, "invalid argument"),
		}
	}
}

impl std::error::Error for Error {
	fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
		match self {
			Self::Io(e) => Some(e),
			_ => None,
		}
	}
}

impl From<io::Error> for Error {
	fn from(e: io::Error) -> Self {
		Self::Io(e)
	}
}

/// Shorthand for a result carrying this crate's [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
