use std::io::Result;

use crate::disk::types::Block;

/// 按块寻址的存储设备。文件系统只通过这个接口访问磁盘。
pub trait BlockDevice {
    /// 设备包含的块总数
    fn block_count(&self) -> u32;
    fn read_block(&self, block_id: u32, buf: &mut Block) -> Result<()>;
    fn write_block(&mut self, block_id: u32, buf: &Block) -> Result<()>;
}
