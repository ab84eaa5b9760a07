use std::collections::HashSet;
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use log::{debug, info, warn};
use thiserror::Error;

use crate::block::BlockStore;
use crate::config::Config;
use crate::io::{BlockNumber, BlockStorage, MemoryDevice};
use crate::node::{Inode, InodeGroup, InodeNumber};
use crate::sb::SuperBlock;

#[derive(Error, Debug)]
pub enum FsError {
    #[error("file name is empty or too long")]
    InvalidName,
    #[error("a file with that name already exists")]
    AlreadyExists,
    #[error("no free inodes")]
    OutOfInodes,
    #[error("found no file with that name")]
    NotFound,
    #[error("invalid input: no data")]
    InvalidInput,
    #[error("data exceeds the maximum file size")]
    FileTooLarge,
    #[error("no free blocks")]
    OutOfSpace,
    #[error("could not allocate engine storage")]
    OutOfMemory,
    #[error("operation not supported on a directory")]
    IsDirectory,
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("inconsistent file system state: {0}")]
    Inconsistent(String),
    #[error("block device error")]
    Device(#[from] std::io::Error),
}

/// Snapshot of one file's metadata as returned by `Engine::list` and `Engine::stat`.
#[derive(Debug, Clone, PartialEq)]
pub struct FileInfo {
    pub name: String,
    pub size: usize,
    pub created: SystemTime,
    pub modified: SystemTime,
    pub is_directory: bool,
}

impl From<&Inode> for FileInfo {
    fn from(node: &Inode) -> Self {
        Self {
            name: node.name.clone(),
            size: node.size,
            created: node.create_time,
            modified: node.update_time,
            is_directory: node.is_directory,
        }
    }
}

/// A flat, in-memory file system: a fixed inode table over a fixed pool of data
/// blocks. Every file is named directly in the table, there is no hierarchy.
///
/// Name lookups go through an index kept next to the inode table, block and inode
/// allocation are first-fit scans over occupancy bitmaps.
pub struct Engine<T: BlockStorage = MemoryDevice> {
    config: Config,
    blocks: BlockStore<T>,
    inodes: InodeGroup,
}

impl Engine<MemoryDevice> {
    /// Creates an engine with the default geometry.
    pub fn create() -> Result<Self, FsError> {
        Self::with_config(Config::default())
    }

    /// Creates an engine backed by a freshly allocated memory device.
    pub fn with_config(config: Config) -> Result<Self, FsError> {
        config.validate()?;
        let dev = MemoryDevice::new(config.block_size, config.total_blocks())
            .map_err(|_| FsError::OutOfMemory)?;
        Engine::format(dev, config)
    }
}

impl<T: BlockStorage> Engine<T> {
    /// Initializes the file system onto owned block storage. Every block of the
    /// device starts out free, whatever it currently holds.
    pub fn format(dev: T, config: Config) -> Result<Self, FsError> {
        config.validate()?;
        if dev.block_size() != config.block_size || dev.block_count() != config.total_blocks() {
            return Err(FsError::InvalidConfig(format!(
                "device has {} blocks of {} bytes, expected {} blocks of {} bytes",
                dev.block_count(),
                dev.block_size(),
                config.total_blocks(),
                config.block_size
            )));
        }

        let inodes = InodeGroup::new(config.max_files)?;
        info!(
            "Formatted {} blocks of {} bytes with {} inodes.",
            config.total_blocks(),
            config.block_size,
            config.max_files
        );

        Ok(Engine {
            config,
            blocks: BlockStore::new(dev),
            inodes,
        })
    }

    /// Tears the engine down, returning ownership of the block device.
    pub fn destroy(self) -> T {
        info!(
            "Tearing down file system with {} files.",
            self.inodes.total_nodes() - self.inodes.free_nodes()
        );
        self.blocks.into_device()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn create_file(&mut self, name: &str) -> Result<InodeNumber, FsError> {
        self.create_node(name, false)
    }

    /// Creates an empty entry flagged as a directory. Directories hold no
    /// contents and can't be written.
    pub fn create_directory(&mut self, name: &str) -> Result<InodeNumber, FsError> {
        self.create_node(name, true)
    }

    fn create_node(&mut self, name: &str, is_directory: bool) -> Result<InodeNumber, FsError> {
        if name.is_empty() || name.len() >= self.config.max_name_len {
            return Err(FsError::InvalidName);
        }
        if self.inodes.find_by_name(name).is_some() {
            return Err(FsError::AlreadyExists);
        }

        let inum = self
            .inodes
            .allocate_slot(Inode::new(name, is_directory, SystemTime::now()))
            .map_err(|e| {
                warn!("Could not create \"{}\": {}.", name, e);
                e
            })?;
        debug!("Created \"{}\" at inode {}.", name, inum);
        Ok(inum)
    }

    /// Replaces the contents of a file with `data`, returning the number of bytes
    /// written.
    ///
    /// New blocks are claimed before the old ones are given back, so a write that
    /// runs out of space leaves the file exactly as it was. The flip side is that a
    /// rewrite needs enough free blocks for the new contents on top of the blocks
    /// the file already owns.
    pub fn write(&mut self, name: &str, data: &[u8]) -> Result<usize, FsError> {
        let inum = self.lookup(name)?;
        if data.is_empty() {
            return Err(FsError::InvalidInput);
        }
        if self.node(inum)?.is_directory {
            return Err(FsError::IsDirectory);
        }

        let needed = blocks_for(data.len(), self.config.block_size);
        if needed > self.config.max_blocks_per_file() {
            return Err(FsError::FileTooLarge);
        }

        let mut fresh: Vec<BlockNumber> = Vec::with_capacity(needed);
        for _ in 0..needed {
            match self.blocks.allocate() {
                Ok(blocknr) => fresh.push(blocknr),
                Err(e) => {
                    warn!(
                        "Write to \"{}\" needs {} blocks, {} available. Rolling back.",
                        name,
                        needed,
                        fresh.len()
                    );
                    self.release_all(&fresh);
                    return Err(e);
                }
            }
        }
        // A length that is an exact multiple of the block size yields a full
        // final chunk, never an empty one.
        for (chunk, &blocknr) in data.chunks(self.config.block_size).zip(fresh.iter()) {
            if let Err(e) = self.blocks.write(blocknr, chunk) {
                self.release_all(&fresh);
                return Err(e);
            }
        }

        let node = self.node_mut(inum)?;
        let old = std::mem::replace(&mut node.blocks, fresh);
        node.size = data.len();
        node.update_time = SystemTime::now();
        self.release_all(&old);

        debug!(
            "Wrote {} bytes to \"{}\" across {} blocks.",
            data.len(),
            name,
            needed
        );
        Ok(data.len())
    }

    /// Reads up to `max_len` bytes from the start of a file. The result is shorter
    /// than `max_len` when the file is.
    pub fn read(&self, name: &str, max_len: usize) -> Result<Vec<u8>, FsError> {
        let node = self.node(self.lookup(name)?)?;
        let to_read = max_len.min(node.size);

        let mut buf = vec![0; to_read];
        for (chunk, &blocknr) in buf
            .chunks_mut(self.config.block_size)
            .zip(node.blocks.iter())
        {
            self.blocks.read(blocknr, chunk)?;
        }
        Ok(buf)
    }

    /// Removes a file, returning its blocks and inode to the free pools.
    pub fn delete(&mut self, name: &str) -> Result<(), FsError> {
        let inum = self.lookup(name)?;
        let node = self.inodes.get(inum).ok_or(FsError::NotFound)?;
        for &blocknr in node.blocks.iter() {
            self.blocks.release(blocknr);
        }
        self.inodes.release_slot(inum);
        debug!("Deleted \"{}\" from inode {}.", name, inum);
        Ok(())
    }

    /// Metadata of every file in inode table order.
    pub fn list(&self) -> Vec<FileInfo> {
        self.inodes.iter().map(|(_, node)| FileInfo::from(node)).collect()
    }

    pub fn listing(&self) -> Listing {
        Listing(self.list())
    }

    pub fn stat(&self, name: &str) -> Result<FileInfo, FsError> {
        let node = self.node(self.lookup(name)?)?;
        Ok(FileInfo::from(node))
    }

    pub fn statfs(&self) -> SuperBlock {
        SuperBlock {
            block_size: self.config.block_size,
            blocks_count: self.blocks.total_blocks(),
            free_blocks_count: self.blocks.free_blocks(),
            inodes_count: self.inodes.total_nodes(),
            free_inodes_count: self.inodes.free_nodes(),
            max_file_size: self.config.max_blocks_per_file() * self.config.block_size,
            max_name_len: self.config.max_name_len,
        }
    }

    /// Raw data block occupancy bitmap, one bit per block packed into native
    /// endian `u64` words.
    pub fn block_map(&self) -> &[u8] {
        self.blocks.bitmap_bytes()
    }

    /// Raw inode occupancy bitmap, laid out like `block_map`.
    pub fn inode_map(&self) -> &[u8] {
        self.inodes.bitmap_bytes()
    }

    /// Verifies the invariants tying the inode table to the data region: every
    /// referenced block is allocated and owned by one file only, block counts
    /// match file sizes, and the free counters agree with what files hold.
    pub fn check(&self) -> Result<(), FsError> {
        let mut owned = HashSet::new();
        for (inum, node) in self.inodes.iter() {
            let expected = blocks_for(node.size, self.config.block_size);
            if node.blocks.len() != expected {
                return Err(FsError::Inconsistent(format!(
                    "inode {} holds {} bytes in {} blocks, expected {}",
                    inum,
                    node.size,
                    node.blocks.len(),
                    expected
                )));
            }
            for &blocknr in node.blocks.iter() {
                if !self.blocks.is_used(blocknr) {
                    return Err(FsError::Inconsistent(format!(
                        "inode {} references free block {}",
                        inum, blocknr
                    )));
                }
                if !owned.insert(blocknr) {
                    return Err(FsError::Inconsistent(format!(
                        "block {} is shared by more than one inode",
                        blocknr
                    )));
                }
            }
        }

        if owned.len() + self.blocks.free_blocks() != self.blocks.total_blocks() {
            return Err(FsError::Inconsistent(format!(
                "{} owned and {} free blocks out of {}",
                owned.len(),
                self.blocks.free_blocks(),
                self.blocks.total_blocks()
            )));
        }
        if self.inodes.iter().count() + self.inodes.free_nodes() != self.inodes.total_nodes() {
            return Err(FsError::Inconsistent("inode free count drifted".to_string()));
        }
        Ok(())
    }

    fn lookup(&self, name: &str) -> Result<InodeNumber, FsError> {
        self.inodes.find_by_name(name).ok_or(FsError::NotFound)
    }

    fn node(&self, inum: InodeNumber) -> Result<&Inode, FsError> {
        self.inodes.get(inum).ok_or(FsError::NotFound)
    }

    fn node_mut(&mut self, inum: InodeNumber) -> Result<&mut Inode, FsError> {
        self.inodes.get_mut(inum).ok_or(FsError::NotFound)
    }

    fn release_all(&mut self, blocks: &[BlockNumber]) {
        for &blocknr in blocks {
            self.blocks.release(blocknr);
        }
    }
}

/// Number of blocks needed to hold `len` bytes.
fn blocks_for(len: usize, block_size: usize) -> usize {
    len / block_size + (len % block_size != 0) as usize
}

/// Tabular rendering of a file listing.
pub struct Listing(pub Vec<FileInfo>);

fn epoch_secs(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

impl fmt::Display for Listing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "File Listing:")?;
        writeln!(
            f,
            "{:<32} {:<10} {:<24} {:<24}",
            "Name", "Size", "Created", "Modified"
        )?;
        writeln!(f, "{}", "-".repeat(64))?;
        for info in &self.0 {
            let name = if info.is_directory {
                format!("{}/", info.name)
            } else {
                info.name.clone()
            };
            writeln!(
                f,
                "{:<32} {:<10} {:<24} {:<24}",
                name,
                info.size,
                epoch_secs(info.created),
                epoch_secs(info.modified)
            )?;
        }
        Ok(())
    }
}
