use log::{debug, trace};

use crate::{
    disk::{BlockDevice, BLOCK_SIZE},
    fs::{
        config::{DIRECT_BLOCKS, MAX_FILE_BLOCKS, MAX_FILE_SIZE},
        error::{FileSystemError, Result},
        indirect::IndirectBlock,
        inode_table::Inode,
        FileSystem,
    },
};

impl<D: BlockDevice> FileSystem<D> {
    fn ensure_regular_file(inode: &Inode) -> Result<()> {
        if !inode.is_valid {
            return Err(FileSystemError::InvalidOperand(
                "inode is not allocated".to_string(),
            ));
        }
        if inode.is_directory {
            return Err(FileSystemError::InvalidOperand(
                "inode is a directory".to_string(),
            ));
        }
        Ok(())
    }

    fn read_indirect(&self, block: u32) -> Result<IndirectBlock> {
        Ok(IndirectBlock::from_block(&self.read_raw(block)?))
    }

    /// 文件内容所在的数据块，按逻辑顺序排列
    pub fn file_blocks(&self, inode: &Inode) -> Result<Vec<u32>> {
        let mut blocks: Vec<u32> = inode
            .direct_blocks()
            .into_iter()
            .take_while(|&b| b != 0)
            .collect();
        if blocks.len() == DIRECT_BLOCKS && inode.indirect_block != 0 {
            blocks.extend(self.read_indirect(inode.indirect_block)?.allocated());
        }

        let sb = self.super_block()?;
        if let Some(bad) = blocks.iter().find(|&&b| !sb.is_data_block(b)) {
            return Err(FileSystemError::CorruptEncoding(format!(
                "file points at block {} outside the data region",
                bad
            )));
        }
        Ok(blocks)
    }

    /// 按顺序拼接文件的全部数据块。结果按块对齐，包含最后一块的填充。
    pub fn read(&self, inode: &Inode) -> Result<Vec<u8>> {
        Self::ensure_regular_file(inode)?;
        let blocks = self.file_blocks(inode)?;
        let mut content = Vec::with_capacity(blocks.len() * BLOCK_SIZE);
        for block in blocks {
            trace!("reading data block {}", block);
            content.extend_from_slice(&self.read_raw(block)?);
        }
        Ok(content)
    }

    /// 用 `content` 覆盖文件内容（不是追加）。
    ///
    /// 按块切分，缺少的直接块或间接块按需分配；最后一块不足的部分补零，
    /// 不再需要的旧块会被释放。中途分配失败时，之前写好的块保留在磁盘上，
    /// inode 也会带着已分配的地址写回，然后返回错误。
    pub fn write(&mut self, inode: &mut Inode, inode_num: u32, content: &[u8]) -> Result<()> {
        Self::ensure_regular_file(inode)?;
        // 调用方手里的副本可能已经过期，以磁盘上的状态为准
        if !self.inode_in_use(inode_num)? {
            return Err(FileSystemError::InvalidOperand(format!(
                "inode {} is not allocated",
                inode_num
            )));
        }
        Self::ensure_regular_file(&self.read_inode(inode_num)?)?;
        let needed = content.len().div_ceil(BLOCK_SIZE);
        if needed > MAX_FILE_BLOCKS {
            return Err(FileSystemError::CapacityExceeded(format!(
                "{} bytes exceed the {}-byte file limit",
                content.len(),
                MAX_FILE_SIZE
            )));
        }

        let mut indirect: Option<IndirectBlock> = None;
        let mut outcome = self.write_chunks(inode, &mut indirect, content);
        if outcome.is_ok() {
            outcome = self.release_tail(inode, &mut indirect, needed);
        }
        if let Some(table) = &indirect {
            if inode.indirect_block != 0 {
                self.write_raw(inode.indirect_block, &table.to_block())?;
            }
        }

        if outcome.is_ok() {
            inode.version = inode.version.wrapping_add(1);
        }
        inode.touch();
        self.write_inode(inode, inode_num)?;
        debug!(
            "wrote {} bytes ({} blocks) to inode {}",
            content.len(),
            needed,
            inode_num
        );
        outcome
    }

    fn write_chunks(
        &mut self,
        inode: &mut Inode,
        indirect: &mut Option<IndirectBlock>,
        content: &[u8],
    ) -> Result<()> {
        for (index, chunk) in content.chunks(BLOCK_SIZE).enumerate() {
            let block = self.ensure_data_block(inode, indirect, index)?;
            let mut buf = [0u8; BLOCK_SIZE];
            buf[..chunk.len()].copy_from_slice(chunk);
            trace!("writing chunk {} to block {}", index, block);
            self.write_raw(block, &buf)?;
        }
        Ok(())
    }

    /// 第 `index` 个逻辑块对应的数据块，没有就分配
    fn ensure_data_block(
        &mut self,
        inode: &mut Inode,
        indirect: &mut Option<IndirectBlock>,
        index: usize,
    ) -> Result<u32> {
        if index < DIRECT_BLOCKS {
            let block = inode.direct_block(index);
            if block != 0 {
                return Ok(block);
            }
            let block = self.allocate_block()?;
            inode.set_direct_block(index, block);
            return Ok(block);
        }

        if inode.indirect_block == 0 {
            inode.indirect_block = self.allocate_block()?;
            *indirect = Some(IndirectBlock::default());
        }
        if indirect.is_none() {
            *indirect = Some(self.read_indirect(inode.indirect_block)?);
        }
        let slot = index - DIRECT_BLOCKS;
        let current = indirect.as_ref().map_or(0, |t| t.get(slot));
        if current != 0 {
            return Ok(current);
        }
        let block = self.allocate_block()?;
        if let Some(table) = indirect.as_mut() {
            table.set(slot, block);
        }
        Ok(block)
    }

    /// 释放第 `keep` 个逻辑块及之后的所有块；`keep` 不超过直接块数时连间接块一起释放
    fn release_tail(
        &mut self,
        inode: &mut Inode,
        indirect: &mut Option<IndirectBlock>,
        keep: usize,
    ) -> Result<()> {
        let mut released = Vec::new();
        for index in keep.min(DIRECT_BLOCKS)..DIRECT_BLOCKS {
            let block = inode.direct_block(index);
            if block != 0 {
                released.push(block);
                inode.set_direct_block(index, 0);
            }
        }

        if inode.indirect_block != 0 {
            if indirect.is_none() {
                *indirect = Some(self.read_indirect(inode.indirect_block)?);
            }
            if let Some(table) = indirect.as_mut() {
                for slot in keep.saturating_sub(DIRECT_BLOCKS)..MAX_FILE_BLOCKS - DIRECT_BLOCKS {
                    let block = table.get(slot);
                    if block != 0 {
                        released.push(block);
                        table.set(slot, 0);
                    }
                }
            }
            if keep <= DIRECT_BLOCKS {
                released.push(inode.indirect_block);
                inode.indirect_block = 0;
                *indirect = None;
            }
        }

        self.release_blocks(&released)
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        disk::BLOCK_SIZE,
        fs::{
            config::{FsConfig, MAX_FILE_SIZE},
            error::ErrorKind,
            FileSystem, OpenMode,
        },
    };

    fn pattern(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8 + 1).collect()
    }

    #[test]
    fn small_write_is_block_aligned() {
        let mut fs = FileSystem::initialize_filesystem().unwrap();
        let (root, _) = fs.root().unwrap();
        let (mut file, num) = fs.open(OpenMode::Create, "a.txt", &root).unwrap();
        fs.write(&mut file, num, b"hello").unwrap();

        let content = fs.read(&file).unwrap();
        assert_eq!(content.len(), BLOCK_SIZE);
        assert_eq!(&content[..5], b"hello");
        assert!(content[5..].iter().all(|&b| b == 0));
        assert_eq!(fs.read_inode(num).unwrap(), file);
        assert_eq!(file.version, 1);
    }

    #[test]
    fn write_spanning_indirect_blocks() {
        let mut fs = FileSystem::initialize_filesystem().unwrap();
        let (root, _) = fs.root().unwrap();
        let (mut file, num) = fs.open(OpenMode::Create, "big", &root).unwrap();
        let data = pattern(BLOCK_SIZE * 10 + 17);
        fs.write(&mut file, num, &data).unwrap();

        assert_ne!(file.indirect_block, 0);
        assert_eq!(fs.file_blocks(&file).unwrap().len(), 11);
        let content = fs.read(&file).unwrap();
        assert_eq!(content.len(), BLOCK_SIZE * 11);
        assert_eq!(&content[..data.len()], &data[..]);
    }

    #[test]
    fn capacity_boundary() {
        let mut fs = FileSystem::initialize_filesystem().unwrap();
        let (root, _) = fs.root().unwrap();
        let (mut file, num) = fs.open(OpenMode::Create, "max", &root).unwrap();
        let data = pattern(MAX_FILE_SIZE);
        fs.write(&mut file, num, &data).unwrap();
        assert_eq!(fs.read(&file).unwrap(), data);

        let (mut other, other_num) = fs.open(OpenMode::Create, "over", &root).unwrap();
        let before = fs.usage().unwrap();
        let err = fs
            .write(&mut other, other_num, &pattern(MAX_FILE_SIZE + 1))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CapacityExceeded);
        assert_eq!(fs.usage().unwrap(), before);
    }

    #[test]
    fn overwrite_reuses_blocks_and_releases_surplus() {
        let mut fs = FileSystem::initialize_filesystem().unwrap();
        let (root, _) = fs.root().unwrap();
        let (mut file, num) = fs.open(OpenMode::Create, "f", &root).unwrap();
        let baseline = fs.usage().unwrap().free_blocks;

        fs.write(&mut file, num, &pattern(BLOCK_SIZE * 6)).unwrap();
        let first = file.direct_block_1;
        // 6 个数据块 + 1 个间接块
        assert_eq!(fs.usage().unwrap().free_blocks, baseline - 7);

        fs.write(&mut file, num, b"short").unwrap();
        assert_eq!(file.direct_block_1, first);
        assert_eq!(file.direct_block_2, 0);
        assert_eq!(file.indirect_block, 0);
        assert_eq!(fs.usage().unwrap().free_blocks, baseline - 1);
        assert_eq!(fs.read(&file).unwrap().len(), BLOCK_SIZE);

        fs.write(&mut file, num, b"").unwrap();
        assert_eq!(fs.usage().unwrap().free_blocks, baseline);
        assert!(fs.read(&file).unwrap().is_empty());
    }

    #[test]
    fn shrink_within_indirect_keeps_indirect_block() {
        let mut fs = FileSystem::initialize_filesystem().unwrap();
        let (root, _) = fs.root().unwrap();
        let (mut file, num) = fs.open(OpenMode::Create, "f", &root).unwrap();
        fs.write(&mut file, num, &pattern(BLOCK_SIZE * 8)).unwrap();
        let indirect = file.indirect_block;

        let data = pattern(BLOCK_SIZE * 4 + 1);
        fs.write(&mut file, num, &data).unwrap();
        assert_eq!(file.indirect_block, indirect);
        assert_eq!(fs.file_blocks(&file).unwrap().len(), 5);
        assert_eq!(&fs.read(&file).unwrap()[..data.len()], &data[..]);
    }

    #[test]
    fn read_and_write_reject_directories() {
        let mut fs = FileSystem::initialize_filesystem().unwrap();
        let (mut root, root_num) = fs.root().unwrap();
        assert_eq!(
            fs.read(&root).unwrap_err().kind(),
            ErrorKind::InvalidOperand
        );
        assert_eq!(
            fs.write(&mut root, root_num, b"x").unwrap_err().kind(),
            ErrorKind::InvalidOperand
        );
        let invalid = fs.read_inode(100).unwrap();
        assert_eq!(
            fs.read(&invalid).unwrap_err().kind(),
            ErrorKind::InvalidOperand
        );
    }

    #[test]
    fn partial_write_survives_exhaustion() {
        // 数据区只有 8 块：根目录占 1 块，剩 7 块
        let config = FsConfig::new(8 + 4, 16);
        let mut fs = FileSystem::initialize_with(config).unwrap();
        assert_eq!(config.data_blocks(), 8);
        let (root, _) = fs.root().unwrap();
        let (mut file, num) = fs.open(OpenMode::Create, "f", &root).unwrap();

        // 需要 10 个数据块 + 1 个间接块
        let data = pattern(BLOCK_SIZE * 10);
        let err = fs.write(&mut file, num, &data).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ResourceExhausted);

        // 3 个直接块 + 间接块 + 3 个间接数据块已落盘
        let stored = fs.read_inode(num).unwrap();
        assert_eq!(stored, file);
        assert_eq!(stored.version, 0);
        let content = fs.read(&stored).unwrap();
        assert_eq!(content.len(), BLOCK_SIZE * 6);
        assert_eq!(&content[..], &data[..BLOCK_SIZE * 6]);
        assert_eq!(fs.usage().unwrap().free_blocks, 0);
    }

    #[test]
    fn write_through_stale_copy_is_rejected() {
        let mut fs = FileSystem::initialize_filesystem().unwrap();
        let (root, _) = fs.root().unwrap();
        let (mut stale, num) = fs.open(OpenMode::Create, "a", &root).unwrap();
        fs.unlink(num, &root).unwrap();
        let before = fs.usage().unwrap();

        let err = fs.write(&mut stale, num, b"ghost").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidOperand);
        assert!(!fs.inode_in_use(num).unwrap());
        assert!(!fs.read_inode(num).unwrap().is_valid);
        assert_eq!(fs.usage().unwrap(), before);
    }

    #[test]
    fn write_with_directory_number_is_rejected() {
        let mut fs = FileSystem::initialize_filesystem().unwrap();
        let (root, root_num) = fs.root().unwrap();
        let (mut file, _) = fs.open(OpenMode::Create, "a", &root).unwrap();
        let err = fs.write(&mut file, root_num, b"x").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidOperand);
        assert!(fs.read_inode(root_num).unwrap().is_directory);
    }
}
