use crate::{
    disk::BlockDevice,
    fs::{bitmap::Bitmap, error::Result, super_block::SuperBlock},
};

/// 空闲块位图：第 i 个标志对应块号 `data_block_start + i`，跨越多个块
#[derive(Debug, Clone)]
pub struct DataBlockBitmap {
    bits: Bitmap,
    data_block_start: u32,
}

impl DataBlockBitmap {
    pub fn new(sb: &SuperBlock) -> Self {
        Self {
            bits: Bitmap::new(sb.data_blocks() as usize, sb.free_bitmap_start),
            data_block_start: sb.data_block_start,
        }
    }

    pub fn load<D: BlockDevice>(disk: &D, sb: &SuperBlock) -> Result<Self> {
        Ok(Self {
            bits: Bitmap::load(disk, sb.free_bitmap_start, sb.data_blocks() as usize)?,
            data_block_start: sb.data_block_start,
        })
    }

    pub fn sync<D: BlockDevice>(&self, disk: &mut D) -> Result<()> {
        self.bits.sync(disk)
    }

    fn index_of(&self, block: u32) -> usize {
        (block - self.data_block_start) as usize
    }

    pub fn is_used(&self, block: u32) -> bool {
        self.bits.is_used(self.index_of(block))
    }

    pub fn flip(&mut self, block: u32) -> bool {
        let index = self.index_of(block);
        self.bits.flip(index)
    }

    pub fn set(&mut self, block: u32, used: bool) {
        let index = self.index_of(block);
        self.bits.set(index, used)
    }

    /// 从块号 `from` 开始找第一个空闲数据块，返回块号
    pub fn first_free_from(&self, from: u32) -> Option<u32> {
        self.bits
            .first_free_from(self.index_of(from))
            .map(|i| self.data_block_start + i as u32)
    }

    pub fn free_blocks(&self) -> usize {
        self.bits.free_count_from(0)
    }
}
