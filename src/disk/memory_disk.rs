use std::io::{Error, ErrorKind, Result};

use crate::disk::{
    block_device::BlockDevice,
    types::{Block, BLOCK_SIZE, DEFAULT_BLOCK_COUNT},
};

/// 完全驻留在进程内存中的虚拟磁盘
#[derive(Clone)]
pub struct MemoryDisk {
    blocks: Vec<Block>,
}

impl MemoryDisk {
    /// 创建一块全零的虚拟磁盘
    pub fn new(block_count: u32) -> Self {
        Self {
            blocks: vec![[0; BLOCK_SIZE]; block_count as usize],
        }
    }

    fn slot(&self, block_id: u32) -> Result<usize> {
        let index = block_id as usize;
        if index >= self.blocks.len() {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                format!(
                    "block {} out of range (disk has {} blocks)",
                    block_id,
                    self.blocks.len()
                ),
            ));
        }
        Ok(index)
    }
}

impl Default for MemoryDisk {
    fn default() -> Self {
        Self::new(DEFAULT_BLOCK_COUNT)
    }
}

// 16MB 的块数组直接打印没有意义，只输出块数
impl std::fmt::Debug for MemoryDisk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryDisk")
            .field("blocks", &self.blocks.len())
            .finish()
    }
}

impl BlockDevice for MemoryDisk {
    fn block_count(&self) -> u32 {
        self.blocks.len() as u32
    }

    fn read_block(&self, block_id: u32, buf: &mut Block) -> Result<()> {
        let index = self.slot(block_id)?;
        buf.copy_from_slice(&self.blocks[index]);
        Ok(())
    }

    fn write_block(&mut self, block_id: u32, buf: &Block) -> Result<()> {
        let index = self.slot(block_id)?;
        self.blocks[index].copy_from_slice(buf);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_read_block() {
        let mut disk = MemoryDisk::new(8);
        let mut block = [0u8; BLOCK_SIZE];
        block[0] = 0xAB;
        block[BLOCK_SIZE - 1] = 0xCD;
        disk.write_block(3, &block).unwrap();

        let mut buf = [0u8; BLOCK_SIZE];
        disk.read_block(3, &mut buf).unwrap();
        assert_eq!(buf, block);

        disk.read_block(2, &mut buf).unwrap();
        assert!(buf.iter().all(|&b| b == 0));
    }

    #[test]
    fn out_of_range_block_is_an_error() {
        let mut disk = MemoryDisk::new(4);
        let mut buf = [0u8; BLOCK_SIZE];
        assert!(disk.read_block(4, &mut buf).is_err());
        assert!(disk.write_block(100, &buf).is_err());
        assert_eq!(disk.block_count(), 4);
    }
}
