use log::debug;

use crate::{
    disk::BlockDevice,
    fs::{
        error::{FileSystemError, Result},
        inode_table::Inode,
        FileSystem,
    },
};

impl<D: BlockDevice> FileSystem<D> {
    /// 从目录 `parent` 中删除 inode `inode_num`：
    /// 压缩掉目录项，清除 inode 位图标志，释放全部数据块（含间接块），
    /// 最后把 inode 标记为无效。非空目录不能删除。
    pub fn unlink(&mut self, inode_num: u32, parent: &Inode) -> Result<()> {
        let mut dir = self.read_directory(parent)?;
        let slot = dir.slot_of(inode_num).ok_or_else(|| {
            FileSystemError::NotFound(format!("inode {} in directory", inode_num))
        })?;

        let inode = self.read_inode(inode_num)?;
        if inode.is_directory {
            let children = self.read_directory(&inode)?;
            if children.named_entries().next().is_some() {
                return Err(FileSystemError::InvalidOperand(format!(
                    "directory inode {} is not empty",
                    inode_num
                )));
            }
        }

        // 先收集并检查要回收的块，出错时磁盘保持原样
        let mut blocks = self.file_blocks(&inode)?;
        if inode.indirect_block != 0 {
            blocks.push(inode.indirect_block);
        }
        self.check_releasable(&blocks)?;

        dir.remove(slot);
        self.write_directory(parent, &dir)?;
        self.release_inode_slot(inode_num)?;
        self.release_blocks(&blocks)?;

        let mut cleared = Inode {
            version: inode.version,
            create_time: inode.create_time,
            ..Inode::default()
        };
        cleared.touch();
        self.write_inode(&cleared, inode_num)?;
        debug!("unlinked inode {}", inode_num);
        Ok(())
    }
}
