use crate::{
    disk::BlockDevice,
    fs::{bitmap::Bitmap, config::ROOT_INODE_ID, error::Result, super_block::SuperBlock},
};

/// inode 分配位图：每个 inode 槽一个标志字节，整体放在一个块里
#[derive(Debug, Clone)]
pub struct InodeBitmap(Bitmap);

impl InodeBitmap {
    pub fn new(sb: &SuperBlock) -> Self {
        Self(Bitmap::new(sb.total_inodes as usize, sb.inode_bitmap_start))
    }

    pub fn load<D: BlockDevice>(disk: &D, sb: &SuperBlock) -> Result<Self> {
        Bitmap::load(disk, sb.inode_bitmap_start, sb.total_inodes as usize).map(Self)
    }

    pub fn sync<D: BlockDevice>(&self, disk: &mut D) -> Result<()> {
        self.0.sync(disk)
    }

    pub fn is_used(&self, inode_num: u32) -> bool {
        self.0.is_used(inode_num as usize)
    }

    pub fn flip(&mut self, inode_num: u32) -> bool {
        self.0.flip(inode_num as usize)
    }

    pub fn set(&mut self, inode_num: u32, used: bool) {
        self.0.set(inode_num as usize, used)
    }

    /// 从 `from` 号 inode 开始找第一个空闲槽
    pub fn first_free_from(&self, from: u32) -> Option<u32> {
        self.0.first_free_from(from as usize).map(|i| i as u32)
    }

    /// 可分配的空闲 inode 数，0 号哨兵槽不计入
    pub fn free_inodes(&self) -> usize {
        self.0.free_count_from(ROOT_INODE_ID as usize)
    }
}
