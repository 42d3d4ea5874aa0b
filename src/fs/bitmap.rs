use log::trace;

use crate::disk::{Block, BlockDevice, BLOCK_SIZE};
use crate::fs::error::Result;

/// 位图的磁盘区域：每个单元一个标志字节（0 = 空闲，非 0 = 已用），
/// 从 `start_block` 开始连续存放，最后一块用 0 填充。
#[derive(Debug, Clone)]
pub struct Bitmap {
    flags: Vec<u8>,
    start_block: u32,
}

impl Bitmap {
    /// 全部空闲的位图
    pub fn new(len: usize, start_block: u32) -> Self {
        Self {
            flags: vec![0; len],
            start_block,
        }
    }

    /// 从磁盘完整读入 `len` 个标志
    pub fn load<D: BlockDevice>(disk: &D, start_block: u32, len: usize) -> Result<Self> {
        let size_in_blocks = len.div_ceil(BLOCK_SIZE);
        let mut flags = Vec::with_capacity(size_in_blocks * BLOCK_SIZE);
        let mut block_buf: Block = [0; BLOCK_SIZE];

        for i in 0..size_in_blocks {
            disk.read_block(start_block + i as u32, &mut block_buf)?;
            flags.extend_from_slice(&block_buf);
        }

        // 截掉填充字节，只保留有效标志
        flags.truncate(len);
        // 非 0 一律视为已用
        for flag in flags.iter_mut() {
            *flag = (*flag != 0) as u8;
        }

        Ok(Self { flags, start_block })
    }

    /// 把整个位图区域写回磁盘
    pub fn sync<D: BlockDevice>(&self, disk: &mut D) -> Result<()> {
        for (i, chunk) in self.flags.chunks(BLOCK_SIZE).enumerate() {
            let mut block_buf: Block = [0; BLOCK_SIZE];
            block_buf[..chunk.len()].copy_from_slice(chunk);
            disk.write_block(self.start_block + i as u32, &block_buf)?;
        }
        trace!(
            "bitmap at block {} synced ({} flags)",
            self.start_block,
            self.flags.len()
        );
        Ok(())
    }

    pub fn is_used(&self, index: usize) -> bool {
        self.flags[index] != 0
    }

    /// 翻转单个标志，返回翻转后的状态
    pub fn flip(&mut self, index: usize) -> bool {
        self.flags[index] ^= 1;
        self.flags[index] != 0
    }

    pub fn set(&mut self, index: usize, used: bool) {
        self.flags[index] = used as u8;
    }

    /// 从 `from` 开始线性查找第一个空闲单元
    pub fn first_free_from(&self, from: usize) -> Option<usize> {
        (from..self.flags.len()).find(|&i| self.flags[i] == 0)
    }

    /// `from` 之后的空闲单元个数
    pub fn free_count_from(&self, from: usize) -> usize {
        self.flags.iter().skip(from).filter(|&&f| f == 0).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disk::MemoryDisk;

    #[test]
    fn flip_and_scan() {
        let mut bitmap = Bitmap::new(10, 0);
        assert_eq!(bitmap.first_free_from(0), Some(0));
        assert!(bitmap.flip(0));
        assert!(bitmap.flip(1));
        assert_eq!(bitmap.first_free_from(0), Some(2));
        assert!(!bitmap.flip(0));
        assert_eq!(bitmap.first_free_from(0), Some(0));
        assert_eq!(bitmap.first_free_from(1), Some(2));
        assert_eq!(bitmap.free_count_from(0), 9);
        assert_eq!(bitmap.free_count_from(1), 8);
    }

    #[test]
    fn full_bitmap_has_no_free_slot() {
        let mut bitmap = Bitmap::new(3, 0);
        for i in 0..3 {
            bitmap.set(i, true);
        }
        assert_eq!(bitmap.first_free_from(0), None);
    }

    #[test]
    fn multi_block_sync_and_load() {
        let mut disk = MemoryDisk::new(8);
        let len = BLOCK_SIZE * 2 + 100;
        let mut bitmap = Bitmap::new(len, 2);
        bitmap.set(0, true);
        bitmap.set(BLOCK_SIZE, true);
        bitmap.set(len - 1, true);
        bitmap.sync(&mut disk).unwrap();

        let loaded = Bitmap::load(&disk, 2, len).unwrap();
        assert!(loaded.is_used(0));
        assert!(loaded.is_used(BLOCK_SIZE));
        assert!(loaded.is_used(len - 1));
        assert_eq!(loaded.free_count_from(0), len - 3);
    }
}
