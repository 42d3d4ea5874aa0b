use log::info;

use crate::{
    disk::{Block, BlockDevice, MemoryDisk, BLOCK_SIZE},
    fs::{
        config::FsConfig,
        data_block_bitmap::DataBlockBitmap,
        directory::DirectoryBlock,
        error::{FileSystemError, Result},
        inode_bitmap::InodeBitmap,
        inode_table::Inode,
        super_block::SuperBlock,
    },
};

pub mod allocator;
pub mod bitmap;
pub mod codec;
pub mod config;
pub mod data_block_bitmap;
pub mod directory;
pub mod error;
pub mod file;
pub mod indirect;
pub mod inode_bitmap;
pub mod inode_table;
pub mod path;
pub mod super_block;
pub mod unlink;

/// `open` 的模式。只有 `Create` 会在找不到时新建文件。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    Create,
    Read,
}

/// 资源使用情况
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Usage {
    pub total_inodes: u32,
    pub free_inodes: usize,
    pub data_blocks: u32,
    pub free_blocks: usize,
}

/// 一个文件系统实例，独占它的虚拟磁盘。
/// 所有修改都需要 `&mut self`，同一时刻只有一个调用者。
#[derive(Debug)]
pub struct FileSystem<D: BlockDevice = MemoryDisk> {
    disk: D,
}

impl FileSystem<MemoryDisk> {
    /// 在默认大小的全新内存磁盘上建立空文件系统
    pub fn initialize_filesystem() -> Result<Self> {
        Self::initialize_with(FsConfig::default())
    }

    pub fn initialize_with(config: FsConfig) -> Result<Self> {
        Self::format(MemoryDisk::new(config.total_blocks), &config)
    }
}

impl<D: BlockDevice> FileSystem<D> {
    /// 格式化：清零所有块，写入超级块、两张位图、空 inode 表和根目录
    pub fn format(mut disk: D, config: &FsConfig) -> Result<Self> {
        config.validate()?;
        if disk.block_count() < config.total_blocks {
            return Err(FileSystemError::InvalidOperand(format!(
                "device has {} blocks, layout needs {}",
                disk.block_count(),
                config.total_blocks
            )));
        }

        let zero: Block = [0; BLOCK_SIZE];
        for block_id in 0..config.total_blocks {
            disk.write_block(block_id, &zero)?;
        }

        let sb = SuperBlock::new(config);
        sb.initialize(&mut disk)?;

        let root_num = sb.root_inode_number;
        let root_block = sb.root_directory_block();

        let mut inode_bitmap = InodeBitmap::new(&sb);
        inode_bitmap.set(root_num, true);
        inode_bitmap.sync(&mut disk)?;

        let mut data_bitmap = DataBlockBitmap::new(&sb);
        data_bitmap.set(root_block, true);
        data_bitmap.sync(&mut disk)?;

        let mut fs = Self { disk };
        // 根目录的 ".." 指向自己
        let root_dir = DirectoryBlock::new(root_num, root_num);
        fs.write_raw(root_block, &root_dir.to_block()?)?;
        fs.write_inode(&Inode::new_directory(root_block), root_num)?;

        info!(
            "formatted {} blocks: {} inodes, {} data blocks",
            config.total_blocks,
            config.total_inodes,
            sb.data_blocks()
        );
        Ok(fs)
    }

    /// 接管一块已经格式化过的设备
    pub fn mount(disk: D) -> Result<Self> {
        let sb = SuperBlock::read(&disk)?;
        if disk.block_count() < sb.total_blocks {
            return Err(FileSystemError::CorruptEncoding(format!(
                "superblock describes {} blocks, device has {}",
                sb.total_blocks,
                disk.block_count()
            )));
        }
        let fs = Self { disk };
        let (root, _) = fs.root()?;
        if !root.is_valid || !root.is_directory {
            return Err(FileSystemError::CorruptEncoding(
                "root inode is not a directory".to_string(),
            ));
        }
        info!("mounted file system of {} blocks", sb.total_blocks);
        Ok(fs)
    }

    pub fn super_block(&self) -> Result<SuperBlock> {
        SuperBlock::read(&self.disk)
    }

    /// 根目录 inode 及其编号
    pub fn root(&self) -> Result<(Inode, u32)> {
        let root_num = self.super_block()?.root_inode_number;
        Ok((self.read_inode(root_num)?, root_num))
    }

    pub fn usage(&self) -> Result<Usage> {
        let sb = self.super_block()?;
        Ok(Usage {
            total_inodes: sb.total_inodes,
            free_inodes: InodeBitmap::load(&self.disk, &sb)?.free_inodes(),
            data_blocks: sb.data_blocks(),
            free_blocks: DataBlockBitmap::load(&self.disk, &sb)?.free_blocks(),
        })
    }

    pub fn disk(&self) -> &D {
        &self.disk
    }

    /// 卸下文件系统，交回底层设备
    pub fn into_disk(self) -> D {
        self.disk
    }

    pub(crate) fn read_raw(&self, block_id: u32) -> Result<Block> {
        let mut buf: Block = [0; BLOCK_SIZE];
        self.disk.read_block(block_id, &mut buf)?;
        Ok(buf)
    }

    pub(crate) fn write_raw(&mut self, block_id: u32, buf: &Block) -> Result<()> {
        self.disk.write_block(block_id, buf)?;
        Ok(())
    }
}
