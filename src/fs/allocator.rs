use log::{debug, warn};

use crate::{
    disk::{BlockDevice, BLOCK_SIZE},
    fs::{
        data_block_bitmap::DataBlockBitmap,
        error::{FileSystemError, Resource, Result},
        FileSystem,
    },
};

impl<D: BlockDevice> FileSystem<D> {
    /// 分配一个数据块：从根目录第一个数据块之后线性扫描空闲块位图，
    /// 标记已用并写回位图。返回的块已清零。
    pub fn allocate_block(&mut self) -> Result<u32> {
        let sb = self.super_block()?;
        let mut bitmap = DataBlockBitmap::load(&self.disk, &sb)?;
        let Some(block) = bitmap.first_free_from(sb.root_directory_block() + 1) else {
            warn!("no free data block left ({} total)", sb.data_blocks());
            return Err(FileSystemError::ResourceExhausted(Resource::DataBlock));
        };
        bitmap.flip(block);
        bitmap.sync(&mut self.disk)?;

        // 回收来的块可能还有旧内容，间接块尤其不能带着旧地址
        self.write_raw(block, &[0; BLOCK_SIZE])?;
        debug!("allocated data block {}", block);
        Ok(block)
    }

    /// 确认这些块都能释放：在数据区内且不是根目录块
    pub(crate) fn check_releasable(&self, blocks: &[u32]) -> Result<()> {
        let sb = self.super_block()?;
        match blocks
            .iter()
            .find(|&&b| !sb.is_data_block(b) || b == sb.root_directory_block())
        {
            Some(bad) => Err(FileSystemError::CorruptEncoding(format!(
                "block {} cannot be released",
                bad
            ))),
            None => Ok(()),
        }
    }

    /// 在一次位图重写里释放一组数据块，任何一块不合法时什么都不改
    pub fn release_blocks(&mut self, blocks: &[u32]) -> Result<()> {
        if blocks.is_empty() {
            return Ok(());
        }
        self.check_releasable(blocks)?;
        let sb = self.super_block()?;
        let mut bitmap = DataBlockBitmap::load(&self.disk, &sb)?;
        for &block in blocks {
            bitmap.set(block, false);
        }
        bitmap.sync(&mut self.disk)?;
        debug!("released data blocks {:?}", blocks);
        Ok(())
    }

    /// 空闲块位图中该块是否被占用
    pub fn block_in_use(&self, block: u32) -> Result<bool> {
        let sb = self.super_block()?;
        if !sb.is_data_block(block) {
            return Err(FileSystemError::InvalidOperand(format!(
                "block {} is not a data block",
                block
            )));
        }
        Ok(DataBlockBitmap::load(&self.disk, &sb)?.is_used(block))
    }
}
