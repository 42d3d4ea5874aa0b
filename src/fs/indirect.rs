use crate::{
    disk::{Block, BLOCK_SIZE},
    fs::config::INDIRECT_ENTRIES,
};

const ADDR_SIZE: usize = std::mem::size_of::<u32>();

/// 一级间接块：128 个小端 u32 块地址，0 表示未分配，其余字节补零
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndirectBlock {
    entries: [u32; INDIRECT_ENTRIES],
}

impl Default for IndirectBlock {
    fn default() -> Self {
        Self {
            entries: [0; INDIRECT_ENTRIES],
        }
    }
}

impl IndirectBlock {
    pub fn get(&self, index: usize) -> u32 {
        self.entries[index]
    }

    pub fn set(&mut self, index: usize, block: u32) {
        self.entries[index] = block;
    }

    /// 按顺序给出已分配的地址，遇到第一个 0 停止
    pub fn allocated(&self) -> impl Iterator<Item = u32> + '_ {
        self.entries.iter().copied().take_while(|&b| b != 0)
    }

    pub fn to_block(&self) -> Block {
        let mut block = [0u8; BLOCK_SIZE];
        for (slot, addr) in block.chunks_exact_mut(ADDR_SIZE).zip(self.entries.iter()) {
            slot.copy_from_slice(&addr.to_le_bytes());
        }
        block
    }

    pub fn from_block(block: &Block) -> Self {
        let mut entries = [0u32; INDIRECT_ENTRIES];
        for (addr, bytes) in entries.iter_mut().zip(block.chunks_exact(ADDR_SIZE)) {
            *addr = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        }
        Self { entries }
    }
}
