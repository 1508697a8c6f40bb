//! A minimal interactive shell driving a [`flatfs::Filesystem`] image.
//!
//! Everything here — the prompt, the tokenizer, the diagnostic text — is explicitly out of
//! the core's scope; this binary exists only to exercise the library end to end. Tokenizing
//! is plain `str::split_whitespace`: no quoting, no escaping, no line editing.

use std::env;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::exit;

use flatfs::inode::FileType;
use flatfs::{Filesystem, WriteMode, ROOT_INODE};

/// Tracks the current directory and the path of names leading to it from the root, so `pwd`
/// and `cd ..` have something to walk without the core's stateless API needing to know.
struct Shell {
	fs: Filesystem,
	cur: u32,
	path: Vec<(u32, String)>,
}

impl Shell {
	fn pwd(&self) -> String {
		if self.path.is_empty() {
			"/".to_owned()
		} else {
			let mut s = String::new();
			for (_, name) in &self.path {
				s.push('/');
				s.push_str(name);
			}
			s
		}
	}

	fn run_line(&mut self, line: &str) -> ControlFlow {
		let mut tokens = line.split_whitespace();
		let Some(cmd) = tokens.next() else {
			return ControlFlow::Continue;
		};
		let rest: Vec<&str> = tokens.collect();

		let result = match cmd {
			"ls" => self.cmd_ls(),
			"pwd" => {
				println!("{}", self.pwd());
				Ok(())
			}
			"cf" => self.cmd_cf(&rest),
			"rf" => self.cmd_rf(&rest),
			"wf" => self.cmd_wf(&rest),
			"cd" => self.cmd_cd(&rest),
			"mkdir" => self.cmd_mkdir(&rest),
			"rm" => self.cmd_rm(&rest),
			"test" => self.cmd_test(),
			"exit" => return ControlFlow::Stop,
			_ => {
				eprintln!("shell: unknown command `{cmd}`");
				return ControlFlow::Continue;
			}
		};
		if let Err(e) = result {
			eprintln!("shell: error: {e}");
		}
		ControlFlow::Continue
	}

	fn cmd_ls(&mut self) -> flatfs::Result<()> {
		let entries = self.fs.list_dir(self.cur)?;
		for e in entries {
			let suffix = if e.file_type == FileType::Directory {
				"/"
			} else {
				""
			};
			println!("{}{}", e.name, suffix);
		}
		Ok(())
	}

	fn cmd_cf(&mut self, args: &[&str]) -> flatfs::Result<()> {
		let Some(full_name) = args.first() else {
			eprintln!("usage: cf <name.ext> <data...>");
			return Ok(());
		};
		let (name, extension) = split_name(full_name);
		let data = args[1..].join(" ");
		self.fs
			.create_file(self.cur, name, extension, 0o644, data.as_bytes())?;
		Ok(())
	}

	fn cmd_rf(&mut self, args: &[&str]) -> flatfs::Result<()> {
		let Some(full_name) = args.first() else {
			eprintln!("usage: rf <name.ext>");
			return Ok(());
		};
		let inode = self.fs.lookup_in_dir(self.cur, full_name)?;
		if self.fs.stat(inode)?.is_dir() {
			return Err(flatfs::Error::TypeMismatch);
		}
		let payload = self.fs.read_file(inode)?;
		println!("{}", String::from_utf8_lossy(&payload.data));
		Ok(())
	}

	fn cmd_wf(&mut self, args: &[&str]) -> flatfs::Result<()> {
		let [flag, full_name, content @ ..] = args else {
			eprintln!("usage: wf <-a|-o> <name.ext> <content...>");
			return Ok(());
		};
		let mode = match *flag {
			"-a" => WriteMode::Append,
			"-o" => WriteMode::Overwrite,
			_ => return Err(flatfs::Error::InvalidArgument),
		};
		let inode = self.fs.lookup_in_dir(self.cur, full_name)?;
		if self.fs.stat(inode)?.is_dir() {
			return Err(flatfs::Error::TypeMismatch);
		}
		let data = content.join(" ");
		self.fs.write_file(inode, data.as_bytes(), mode)?;
		Ok(())
	}

	fn cmd_cd(&mut self, args: &[&str]) -> flatfs::Result<()> {
		let Some(&name) = args.first() else {
			eprintln!("usage: cd <dirname>");
			return Ok(());
		};
		if name == "." {
			return Ok(());
		}
		if name == ".." {
			if self.path.pop().is_some() {
				self.cur = self.path.last().map(|(i, _)| *i).unwrap_or(ROOT_INODE);
			}
			return Ok(());
		}
		let inode = self.fs.lookup_in_dir(self.cur, name)?;
		if !self.fs.stat(inode)?.is_dir() {
			return Err(flatfs::Error::TypeMismatch);
		}
		self.path.push((inode, name.to_owned()));
		self.cur = inode;
		Ok(())
	}

	fn cmd_mkdir(&mut self, args: &[&str]) -> flatfs::Result<()> {
		let Some(name) = args.first() else {
			eprintln!("usage: mkdir <dirname>");
			return Ok(());
		};
		self.fs.create_dir(self.cur, name, 0o755)?;
		Ok(())
	}

	fn cmd_rm(&mut self, args: &[&str]) -> flatfs::Result<()> {
		let [flag, target] = args else {
			eprintln!("usage: rm <-f|-d> <target>");
			return Ok(());
		};
		let inode = self.fs.lookup_in_dir(self.cur, target)?;
		let is_dir = self.fs.stat(inode)?.is_dir();
		match *flag {
			"-f" if !is_dir => self.fs.delete_file(inode, self.cur),
			"-d" if is_dir => self.fs.delete_dir(inode, self.cur),
			"-f" | "-d" => Err(flatfs::Error::TypeMismatch),
			_ => Err(flatfs::Error::InvalidArgument),
		}
	}

	fn cmd_test(&mut self) -> flatfs::Result<()> {
		let report = self.fs.check()?;
		println!(
			"free blocks: {} (bitmap set: {}, total: {})",
			report.free_blocks_count, report.block_bitmap_popcount, report.total_data_blocks
		);
		println!(
			"free inodes: {} (bitmap set: {}, total: {})",
			report.free_inodes_count, report.inode_bitmap_popcount, report.total_inodes
		);
		println!("used directories: {}", report.used_dirs_count);
		let blocks_ok = report.free_blocks_count as u64 + report.block_bitmap_popcount as u64
			== report.total_data_blocks as u64;
		let inodes_ok = report.free_inodes_count as u64 + report.inode_bitmap_popcount as u64
			== report.total_inodes as u64;
		println!("block accounting: {}", if blocks_ok { "ok" } else { "MISMATCH" });
		println!("inode accounting: {}", if inodes_ok { "ok" } else { "MISMATCH" });
		Ok(())
	}
}

enum ControlFlow {
	Continue,
	Stop,
}

fn split_name(full: &str) -> (&str, &str) {
	match full.rsplit_once('.') {
		Some((name, ext)) => (name, ext),
		None => (full, ""),
	}
}

fn main() {
	let prog = env::args().next().unwrap_or("shell".to_owned());
	let path = env::args()
		.nth(1)
		.map(PathBuf::from)
		.unwrap_or_else(|| PathBuf::from("drive.bin"));

	let fs = Filesystem::open(&path).unwrap_or_else(|e| {
		eprintln!("{prog}: {}: {e}", path.display());
		exit(1);
	});

	let mut shell = Shell {
		fs,
		cur: ROOT_INODE,
		path: Vec::new(),
	};

	let stdin = io::stdin();
	loop {
		print!("{} $ ", shell.pwd());
		let _ = io::stdout().flush();

		let mut line = String::new();
		if stdin.read_line(&mut line).unwrap_or(0) == 0 {
			break;
		}
		if matches!(shell.run_line(&line), ControlFlow::Stop) {
			break;
		}
	}
}
