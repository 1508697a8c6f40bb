//! `mkfs` creates a fresh filesystem image on a backing file.

use std::env;
use std::path::PathBuf;
use std::process::exit;

use flatfs::{Filesystem, FormatOptions};

/// Structure storing command line arguments.
#[derive(Default)]
struct Args {
	/// The name of the current program used in command line.
	prog: String,
	/// If true, reformat even if the image already carries this filesystem's magic number.
	force: bool,
	/// If true, print command line help.
	help: bool,
	/// The path to the image file the filesystem will be created on.
	image_path: Option<PathBuf>,
}

fn parse_args() -> Args {
	let mut args: Args = Default::default();
	let mut iter = env::args();
	args.prog = iter.next().unwrap_or("mkfs".to_owned());

	for arg in iter {
		match arg.as_str() {
			"-h" | "--help" => args.help = true,
			"-f" | "--force" => args.force = true,
			_ => args.image_path = Some(arg.into()),
		}
	}

	args
}

fn print_usage(prog: &str) {
	eprintln!("Usage: {prog} [-f|--force] [path]");
	eprintln!("Creates a fresh filesystem image at `path` (default: drive.bin).");
}

fn error(prog: &str, msg: impl std::fmt::Display) -> ! {
	eprintln!("{prog}: error: {msg}");
	exit(1);
}

fn main() {
	let args = parse_args();
	if args.help {
		print_usage(&args.prog);
		return;
	}

	let path = args
		.image_path
		.unwrap_or_else(|| PathBuf::from("drive.bin"));

	if path.exists() && !args.force {
		match Filesystem::is_present(&path) {
			Ok(true) => {
				eprintln!(
					"{}: {} already contains a filesystem of this type",
					args.prog,
					path.display()
				);
				eprintln!("Pass -f/--force to reformat it anyway.");
				exit(1);
			}
			Ok(false) => {}
			Err(e) => error(&args.prog, format!("{}: {e}", path.display())),
		}
	}

	Filesystem::create(&path, &FormatOptions::default())
		.unwrap_or_else(|e| error(&args.prog, format!("{}: {e}", path.display())));

	println!("{}: formatted {}", args.prog, path.display());
}
