//! 内存虚拟磁盘上的 Unix 风格 inode 文件系统。
//!
//! 磁盘布局：
//! 超级块 | inode 位图 | 空闲块位图 | inode 表 | 数据块区域

pub mod disk;
pub mod fs;
pub mod utils;

pub use disk::{BlockDevice, MemoryDisk, BLOCK_SIZE};
pub use fs::{
    config::FsConfig,
    directory::{DirEntry, DirectoryBlock},
    error::{ErrorKind, FileSystemError, Result},
    indirect::IndirectBlock,
    inode_table::Inode,
    super_block::SuperBlock,
    FileSystem, OpenMode, Usage,
};
