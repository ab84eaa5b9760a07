//! A flat file system held entirely in memory.
//!
//! Files live in a fixed table of inodes and store their contents in a fixed pool of
//! equally sized data blocks. Both pools are handed out first-fit from occupancy
//! bitmaps:
//!
//! ```text
//! ==========================================================
//! | Bitmap (inodes) | Inodes | Bitmap (data region) | Data |
//! ==========================================================
//! ```
//!
//! ```
//! use memfs::Engine;
//!
//! let mut fs = Engine::create().unwrap();
//! fs.create_file("a.txt").unwrap();
//! fs.write("a.txt", b"hello").unwrap();
//! assert_eq!(fs.read("a.txt", 1024).unwrap(), b"hello");
//! ```
mod alloc;
mod block;
pub mod config;
mod fs;
pub mod io;
mod node;
mod sb;

pub use crate::config::Config;
pub use crate::fs::{Engine, FileInfo, FsError, Listing};
pub use crate::io::BlockNumber;
pub use crate::node::InodeNumber;
pub use crate::sb::SuperBlock;
