use crate::fs::FsError;

/// Construction-time geometry of an engine. Defaults reproduce the classic layout
/// of 16 blocks of 64 bytes shared by up to 256 files.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Names must be strictly shorter than this many bytes.
    pub max_name_len: usize,
    /// Number of inode slots, the upper bound on files that can exist.
    pub max_files: usize,
    /// Size of the data region. Rounded down to a whole number of blocks.
    pub storage_bytes: usize,
    pub block_size: usize,
    /// Rounded down to a whole number of blocks.
    pub max_file_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_name_len: 32,
            max_files: 256,
            storage_bytes: 1024,
            block_size: 64,
            max_file_size: 1024,
        }
    }
}

impl Config {
    pub fn with_max_name_len(mut self, len: usize) -> Self {
        self.max_name_len = len;
        self
    }

    pub fn with_max_files(mut self, files: usize) -> Self {
        self.max_files = files;
        self
    }

    pub fn with_storage_bytes(mut self, bytes: usize) -> Self {
        self.storage_bytes = bytes;
        self
    }

    pub fn with_block_size(mut self, bytes: usize) -> Self {
        self.block_size = bytes;
        self
    }

    pub fn with_max_file_size(mut self, bytes: usize) -> Self {
        self.max_file_size = bytes;
        self
    }

    pub fn total_blocks(&self) -> usize {
        self.storage_bytes.checked_div(self.block_size).unwrap_or(0)
    }

    pub fn max_blocks_per_file(&self) -> usize {
        self.max_file_size.checked_div(self.block_size).unwrap_or(0)
    }

    pub fn validate(&self) -> Result<(), FsError> {
        if self.block_size == 0 {
            return Err(FsError::InvalidConfig("block size must be non-zero".to_string()));
        }
        if self.max_files == 0 {
            return Err(FsError::InvalidConfig("at least one file slot is required".to_string()));
        }
        // One byte for the name plus the exclusive bound.
        if self.max_name_len < 2 {
            return Err(FsError::InvalidConfig(format!(
                "max name length {} leaves no room for a name",
                self.max_name_len
            )));
        }
        if self.total_blocks() == 0 {
            return Err(FsError::InvalidConfig(format!(
                "storage of {} bytes holds no {} byte block",
                self.storage_bytes, self.block_size
            )));
        }
        if self.max_blocks_per_file() == 0 {
            return Err(FsError::InvalidConfig(format!(
                "max file size {} is smaller than one block",
                self.max_file_size
            )));
        }
        Ok(())
    }
}
