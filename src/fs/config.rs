use crate::{
    disk::{BLOCK_SIZE, DEFAULT_BLOCK_COUNT},
    fs::error::{FileSystemError, Result},
};

pub const SUPER_BLOCK_BLOCK_ID: u32 = 0;
pub const INODE_BITMAP_BLOCK_ID: u32 = 1;
pub const FREE_BITMAP_START_BLOCK_ID: u32 = 2;

/// 超级块魔数 "VDFS"
pub const MAGIC: u32 = 0x5644_4653;

// 编码后的 inode 只有 38 字节，按 2 的幂对齐到 64 字节，一个 1KB 块存 16 个
pub const INODE_SIZE: usize = 64;
pub const INODES_PER_BLOCK: u32 = (BLOCK_SIZE / INODE_SIZE) as u32;

// 默认总共 256 个 inode，占 16 个块
pub const DEFAULT_TOTAL_INODES: u32 = 256;

// 0 号 inode 是“未分配”哨兵，根目录从 1 开始
pub const ROOT_INODE_ID: u32 = 1;

pub const DIRECT_BLOCKS: usize = 3;
pub const INDIRECT_ENTRIES: usize = 128;
pub const MAX_FILE_BLOCKS: usize = DIRECT_BLOCKS + INDIRECT_ENTRIES;
pub const MAX_FILE_SIZE: usize = MAX_FILE_BLOCKS * BLOCK_SIZE;

/// 文件系统几何参数，格式化时使用
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FsConfig {
    pub total_blocks: u32,
    pub total_inodes: u32,
}

impl Default for FsConfig {
    fn default() -> Self {
        Self {
            total_blocks: DEFAULT_BLOCK_COUNT,
            total_inodes: DEFAULT_TOTAL_INODES,
        }
    }
}

impl FsConfig {
    pub fn new(total_blocks: u32, total_inodes: u32) -> Self {
        Self {
            total_blocks,
            total_inodes,
        }
    }

    pub fn inode_table_blocks(&self) -> u32 {
        self.total_inodes.div_ceil(INODES_PER_BLOCK)
    }

    /// 空闲块位图占用的块数。每个数据块一个标志字节，
    /// 按“除去固定区域后剩余的块数”向上取整，略有富余。
    pub fn free_bitmap_blocks(&self) -> u32 {
        let fixed = FREE_BITMAP_START_BLOCK_ID + self.inode_table_blocks();
        self.total_blocks
            .saturating_sub(fixed)
            .div_ceil(BLOCK_SIZE as u32)
    }

    pub fn inode_table_start(&self) -> u32 {
        FREE_BITMAP_START_BLOCK_ID + self.free_bitmap_blocks()
    }

    pub fn data_block_start(&self) -> u32 {
        self.inode_table_start() + self.inode_table_blocks()
    }

    pub fn data_blocks(&self) -> u32 {
        self.total_blocks.saturating_sub(self.data_block_start())
    }

    /// 检查几何参数能否放得下所有区域
    pub fn validate(&self) -> Result<()> {
        // inode 位图只占一个块，每个 inode 一个字节
        if self.total_inodes as usize > BLOCK_SIZE {
            return Err(FileSystemError::InvalidOperand(format!(
                "{} inodes do not fit in a one-block inode bitmap (max {})",
                self.total_inodes, BLOCK_SIZE
            )));
        }
        if self.total_inodes <= ROOT_INODE_ID {
            return Err(FileSystemError::InvalidOperand(format!(
                "need more than {} inodes, got {}",
                ROOT_INODE_ID, self.total_inodes
            )));
        }
        // 至少要有根目录块和一个可分配块
        if self.data_blocks() < 2 {
            return Err(FileSystemError::InvalidOperand(format!(
                "{} blocks leave no room for data blocks",
                self.total_blocks
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_layout() {
        let config = FsConfig::default();
        assert_eq!(config.inode_table_blocks(), 16);
        assert_eq!(config.free_bitmap_blocks(), 16);
        assert_eq!(config.inode_table_start(), 18);
        assert_eq!(config.data_block_start(), 34);
        assert_eq!(config.data_blocks(), 16350);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn free_bitmap_covers_every_data_block() {
        for total in [40u32, 100, 1058, 1059, 5000, 16384, 40000] {
            let config = FsConfig::new(total, 256);
            let capacity = config.free_bitmap_blocks() as usize * BLOCK_SIZE;
            assert!(capacity >= config.data_blocks() as usize, "total={}", total);
        }
    }

    #[test]
    fn rejects_bad_geometry() {
        assert!(FsConfig::new(16384, 2048).validate().is_err());
        assert!(FsConfig::new(16384, 1).validate().is_err());
        assert!(FsConfig::new(20, 256).validate().is_err());
    }
}
