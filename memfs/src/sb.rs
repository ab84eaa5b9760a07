/// Summary of the file system geometry and current usage, the in-memory
/// counterpart of an on-disk super block.
///
/// Keeps the size of the file system by tracking the number of blocks allocated
/// to the inode and data regions. The number of inodes available ultimately sets
/// the upper bound on how many files can exist.
///
/// Empty files and directories don't allocate any data blocks but do allocate an
/// inode.
#[derive(Debug, Clone, PartialEq)]
pub struct SuperBlock {
    /// Bytes per data block.
    pub block_size: usize,
    /// All blocks in the data region.
    pub blocks_count: usize,
    /// All blocks available to be allocated.
    pub free_blocks_count: usize,
    /// Total inode slots.
    pub inodes_count: usize,
    /// The number of remaining available inodes.
    pub free_inodes_count: usize,
    pub max_file_size: usize,
    pub max_name_len: usize,
}

impl SuperBlock {
    /// Blocks currently owned by files.
    pub fn used_blocks(&self) -> usize {
        self.blocks_count - self.free_blocks_count
    }

    /// Inodes currently holding a file or directory.
    pub fn used_inodes(&self) -> usize {
        self.inodes_count - self.free_inodes_count
    }

    /// Bytes still available to new file contents.
    pub fn free_bytes(&self) -> usize {
        self.free_blocks_count * self.block_size
    }
}
