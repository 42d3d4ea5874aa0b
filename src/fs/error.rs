use std::fmt;

use thiserror::Error;

/// 可能耗尽的资源
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Inode,
    DataBlock,
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Inode => write!(f, "inode"),
            Self::DataBlock => write!(f, "data block"),
        }
    }
}

/// 文件系统错误类型
#[derive(Debug, Error)]
pub enum FileSystemError {
    #[error("Disk I/O error: {0}")]
    Io(#[from] std::io::Error), // 底层块设备错误
    #[error("No free {0} available")]
    ResourceExhausted(Resource), // inode 或数据块用尽
    #[error("File or directory not found: {0}")]
    NotFound(String), // 路径分量或文件名不存在
    #[error("Invalid operand: {0}")]
    InvalidOperand(String), // 非目录当目录用、对无效 inode 操作等
    #[error("Capacity exceeded: {0}")]
    CapacityExceeded(String), // 目录槽位或文件块数超过上限
    #[error("Corrupt on-disk structure: {0}")]
    CorruptEncoding(String), // 磁盘结构无法按固定布局解码
}

/// 不带上下文的错误种类，供调用方（如 shell）报告
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Io,
    ResourceExhausted,
    NotFound,
    InvalidOperand,
    CapacityExceeded,
    CorruptEncoding,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Io => "Io",
            Self::ResourceExhausted => "ResourceExhausted",
            Self::NotFound => "NotFound",
            Self::InvalidOperand => "InvalidOperand",
            Self::CapacityExceeded => "CapacityExceeded",
            Self::CorruptEncoding => "CorruptEncoding",
        };
        f.write_str(name)
    }
}

impl FileSystemError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Io(_) => ErrorKind::Io,
            Self::ResourceExhausted(_) => ErrorKind::ResourceExhausted,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::InvalidOperand(_) => ErrorKind::InvalidOperand,
            Self::CapacityExceeded(_) => ErrorKind::CapacityExceeded,
            Self::CorruptEncoding(_) => ErrorKind::CorruptEncoding,
        }
    }
}

impl From<bincode::Error> for FileSystemError {
    fn from(e: bincode::Error) -> Self {
        FileSystemError::CorruptEncoding(e.to_string())
    }
}

/// 文件系统统一结果类型
pub type Result<T> = std::result::Result<T, FileSystemError>;
