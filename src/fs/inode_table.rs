use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::{
    disk::BlockDevice,
    fs::{
        codec,
        config::{DIRECT_BLOCKS, INODES_PER_BLOCK, INODE_SIZE},
        error::{FileSystemError, Resource, Result},
        inode_bitmap::InodeBitmap,
        super_block::SuperBlock,
        FileSystem,
    },
    utils::current_timestamp,
};

/// 磁盘上的 inode 记录。块地址 0 表示“未分配”。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inode {
    pub is_valid: bool,     // 是否是一个真实存在的文件
    pub is_directory: bool, // 是否是目录
    pub version: u32,       // 每次成功写入内容后加一
    pub direct_block_1: u32,
    pub direct_block_2: u32,
    pub direct_block_3: u32,
    pub indirect_block: u32, // 一级间接块
    pub create_time: i64,
    pub modify_time: i64,
}

impl Inode {
    /// 新建的普通文件：有效、无数据块、时间戳为当前时间
    pub fn new_file() -> Self {
        let now = current_timestamp();
        Self {
            is_valid: true,
            create_time: now,
            modify_time: now,
            ..Self::default()
        }
    }

    /// 第一个直接块存放目录项的目录
    pub fn new_directory(first_block: u32) -> Self {
        Self {
            is_directory: true,
            direct_block_1: first_block,
            ..Self::new_file()
        }
    }

    pub fn is_file(&self) -> bool {
        self.is_valid && !self.is_directory
    }

    pub fn direct_blocks(&self) -> [u32; DIRECT_BLOCKS] {
        [self.direct_block_1, self.direct_block_2, self.direct_block_3]
    }

    pub fn direct_block(&self, index: usize) -> u32 {
        self.direct_blocks()[index]
    }

    pub fn set_direct_block(&mut self, index: usize, block: u32) {
        match index {
            0 => self.direct_block_1 = block,
            1 => self.direct_block_2 = block,
            2 => self.direct_block_3 = block,
            _ => unreachable!("inode has only {} direct blocks", DIRECT_BLOCKS),
        }
    }

    pub fn touch(&mut self) {
        self.modify_time = current_timestamp();
    }
}

impl<D: BlockDevice> FileSystem<D> {
    /// inode 槽号 -> (块号, 块内偏移)
    fn inode_location(sb: &SuperBlock, inode_num: u32) -> (u32, usize) {
        assert!(
            inode_num < sb.total_inodes,
            "inode slot {} outside table of {}",
            inode_num,
            sb.total_inodes
        );
        let block = sb.inode_table_start + inode_num / INODES_PER_BLOCK;
        let offset = (inode_num % INODES_PER_BLOCK) as usize * INODE_SIZE;
        (block, offset)
    }

    fn check_inode_num(sb: &SuperBlock, inode_num: u32) -> Result<()> {
        if inode_num == 0 || inode_num >= sb.total_inodes {
            return Err(FileSystemError::InvalidOperand(format!(
                "inode number {} outside 1..{}",
                inode_num, sb.total_inodes
            )));
        }
        Ok(())
    }

    pub fn read_inode(&self, inode_num: u32) -> Result<Inode> {
        let sb = self.super_block()?;
        Self::check_inode_num(&sb, inode_num)?;
        let (block, offset) = Self::inode_location(&sb, inode_num);
        let buf = self.read_raw(block)?;
        codec::decode(&buf[offset..offset + INODE_SIZE])
    }

    /// 只写记录本身，不改 `modify_time`；内容引擎写入前自己 touch
    pub fn write_inode(&mut self, inode: &Inode, inode_num: u32) -> Result<()> {
        let sb = self.super_block()?;
        Self::check_inode_num(&sb, inode_num)?;
        let (block, offset) = Self::inode_location(&sb, inode_num);
        let bytes = codec::encode(inode, INODE_SIZE)?;
        let mut buf = self.read_raw(block)?;
        buf[offset..offset + INODE_SIZE].copy_from_slice(&bytes);
        self.write_raw(block, &buf)
    }

    /// 从根 inode 的编号开始找空闲槽，分配并写入一个新的普通文件 inode
    pub fn create_inode(&mut self) -> Result<(Inode, u32)> {
        let sb = self.super_block()?;
        let mut bitmap = InodeBitmap::load(&self.disk, &sb)?;
        let Some(inode_num) = bitmap.first_free_from(sb.root_inode_number) else {
            warn!("inode table exhausted ({} slots)", sb.total_inodes);
            return Err(FileSystemError::ResourceExhausted(Resource::Inode));
        };
        bitmap.flip(inode_num);
        bitmap.sync(&mut self.disk)?;

        let inode = Inode::new_file();
        self.write_inode(&inode, inode_num)?;
        debug!("allocated inode {}", inode_num);
        Ok((inode, inode_num))
    }

    /// 清除 inode 位图中的标志
    pub(crate) fn release_inode_slot(&mut self, inode_num: u32) -> Result<()> {
        let sb = self.super_block()?;
        let mut bitmap = InodeBitmap::load(&self.disk, &sb)?;
        if bitmap.is_used(inode_num) {
            bitmap.flip(inode_num);
            bitmap.sync(&mut self.disk)?;
            debug!("released inode {}", inode_num);
        }
        Ok(())
    }

    /// inode 位图中该槽是否被占用
    pub fn inode_in_use(&self, inode_num: u32) -> Result<bool> {
        let sb = self.super_block()?;
        Self::check_inode_num(&sb, inode_num)?;
        Ok(InodeBitmap::load(&self.disk, &sb)?.is_used(inode_num))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::{config::FsConfig, error::ErrorKind};

    #[test]
    fn inode_round_trip_fits_slot() {
        let inode = Inode {
            is_valid: true,
            is_directory: false,
            version: 7,
            direct_block_1: 40,
            direct_block_2: 41,
            direct_block_3: 0,
            indirect_block: 99,
            create_time: 1_700_000_000,
            modify_time: -5,
        };
        let bytes = codec::encode(&inode, INODE_SIZE).unwrap();
        assert_eq!(bytes.len(), INODE_SIZE);
        assert_eq!(codec::encoded_len(&inode).unwrap(), 38);
        assert_eq!(codec::decode::<Inode>(&bytes).unwrap(), inode);
    }

    #[test]
    fn slot_arithmetic() {
        let sb = SuperBlock::new(&FsConfig::default());
        assert_eq!(FileSystem::<crate::disk::MemoryDisk>::inode_location(&sb, 0), (18, 0));
        assert_eq!(FileSystem::<crate::disk::MemoryDisk>::inode_location(&sb, 17), (19, 64));
        assert_eq!(
            FileSystem::<crate::disk::MemoryDisk>::inode_location(&sb, 255),
            (33, 15 * 64)
        );
    }

    #[test]
    fn create_read_write_inode() {
        let mut fs = FileSystem::initialize_with(FsConfig::new(256, 32)).unwrap();
        let (inode, num) = fs.create_inode().unwrap();
        assert_eq!(num, 2);
        assert!(inode.is_valid);
        assert_eq!(inode.direct_blocks(), [0, 0, 0]);
        assert!(fs.inode_in_use(num).unwrap());

        let mut changed = fs.read_inode(num).unwrap();
        assert_eq!(changed, inode);
        changed.version = 3;
        changed.direct_block_2 = 77;
        fs.write_inode(&changed, num).unwrap();
        assert_eq!(fs.read_inode(num).unwrap(), changed);
        // 相邻槽不受影响
        assert_eq!(fs.read_inode(num + 1).unwrap(), Inode::default());
    }

    #[test]
    fn inode_table_exhaustion() {
        let mut fs = FileSystem::initialize_with(FsConfig::new(256, 16)).unwrap();
        // 0 是哨兵、1 是根目录，剩余 14 个
        for expected in 2..16 {
            assert_eq!(fs.create_inode().unwrap().1, expected);
        }
        let err = fs.create_inode().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ResourceExhausted);
    }

    #[test]
    fn out_of_range_inode_number() {
        let fs = FileSystem::initialize_filesystem().unwrap();
        assert_eq!(fs.read_inode(0).unwrap_err().kind(), ErrorKind::InvalidOperand);
        assert_eq!(fs.read_inode(256).unwrap_err().kind(), ErrorKind::InvalidOperand);
    }
}
