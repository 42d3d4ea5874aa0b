use log::info;
use serde::{Deserialize, Serialize};

use crate::{
    disk::{BlockDevice, BLOCK_SIZE},
    fs::{
        codec,
        config::{
            FsConfig, FREE_BITMAP_START_BLOCK_ID, INODE_BITMAP_BLOCK_ID, MAGIC, ROOT_INODE_ID,
            SUPER_BLOCK_BLOCK_ID,
        },
        error::{FileSystemError, Result},
    },
};

/// 描述整个磁盘静态布局的记录，格式化时写入 0 号块，之后不再修改
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuperBlock {
    pub magic: u32,             // 魔数，用于识别文件系统
    pub total_blocks: u32,      // 文件系统总块数
    pub total_inodes: u32,      // inode 表容量
    pub inode_table_start: u32, // inode 表起始块号
    pub root_inode_number: u32, // 根目录 inode 编号
    pub free_bitmap_start: u32, // 空闲块位图起始块
    pub inode_bitmap_start: u32, // inode 位图所在块
    pub data_block_start: u32,  // 数据区起始块号
}

impl SuperBlock {
    pub fn new(config: &FsConfig) -> Self {
        Self {
            magic: MAGIC,
            total_blocks: config.total_blocks,
            total_inodes: config.total_inodes,
            inode_table_start: config.inode_table_start(),
            root_inode_number: ROOT_INODE_ID,
            free_bitmap_start: FREE_BITMAP_START_BLOCK_ID,
            inode_bitmap_start: INODE_BITMAP_BLOCK_ID,
            data_block_start: config.data_block_start(),
        }
    }

    /// 数据块个数，也是空闲块位图的长度
    pub fn data_blocks(&self) -> u32 {
        self.total_blocks - self.data_block_start
    }

    /// 根目录的第一个数据块，格式化时固定为数据区第 0 块
    pub fn root_directory_block(&self) -> u32 {
        self.data_block_start
    }

    pub fn is_data_block(&self, block: u32) -> bool {
        block >= self.data_block_start && block < self.total_blocks
    }

    pub fn to_block(&self) -> Result<[u8; BLOCK_SIZE]> {
        let bytes = codec::encode(self, BLOCK_SIZE)?;
        let mut block = [0u8; BLOCK_SIZE];
        block.copy_from_slice(&bytes);
        Ok(block)
    }

    /// 解码并检查魔数和区域顺序
    pub fn from_block(block: &[u8]) -> Result<Self> {
        let sb: SuperBlock = codec::decode(block)?;
        if sb.magic != MAGIC {
            return Err(FileSystemError::CorruptEncoding(format!(
                "bad superblock magic {:#010x}",
                sb.magic
            )));
        }
        let ordered = sb.inode_bitmap_start < sb.free_bitmap_start
            && sb.free_bitmap_start < sb.inode_table_start
            && sb.inode_table_start < sb.data_block_start
            && sb.data_block_start < sb.total_blocks
            && sb.root_inode_number < sb.total_inodes;
        if !ordered {
            return Err(FileSystemError::CorruptEncoding(format!(
                "superblock regions out of order: {:?}",
                sb
            )));
        }
        Ok(sb)
    }

    /// 写入 0 号块，只在格式化时调用一次
    pub fn initialize<D: BlockDevice>(&self, disk: &mut D) -> Result<()> {
        disk.write_block(SUPER_BLOCK_BLOCK_ID, &self.to_block()?)?;
        info!(
            "superblock written: inode table at {}, data blocks at {} ({} blocks)",
            self.inode_table_start,
            self.data_block_start,
            self.data_blocks()
        );
        Ok(())
    }

    /// 每次访问都从 0 号块重新解码，不做缓存
    pub fn read<D: BlockDevice>(disk: &D) -> Result<Self> {
        let mut block = [0u8; BLOCK_SIZE];
        disk.read_block(SUPER_BLOCK_BLOCK_ID, &mut block)?;
        Self::from_block(&block)
    }
}
