use log::debug;
use serde::{Deserialize, Serialize};

use crate::{
    disk::{BlockDevice, BLOCK_SIZE},
    fs::{
        codec,
        error::{FileSystemError, Result},
        inode_table::Inode,
        FileSystem, OpenMode,
    },
};

pub const NAME_LEN: usize = 20;
pub const DIR_ENTRIES: usize = 32;

// 0 号槽是 "."，1 号槽是 ".."
const SELF_SLOT: usize = 0;
const PARENT_SLOT: usize = 1;
const FIRST_NAMED_SLOT: usize = 2;

/// 一个目录项：inode 编号 + 以 0 填充的定长名字
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirEntry {
    pub inode_number: u32,
    name: [u8; NAME_LEN],
}

impl DirEntry {
    fn raw(inode_number: u32, name: &str) -> Self {
        let mut bytes = [0u8; NAME_LEN];
        bytes[..name.len()].copy_from_slice(name.as_bytes());
        Self {
            inode_number,
            name: bytes,
        }
    }

    /// 校验后构造一个普通目录项
    pub fn new(inode_number: u32, name: &str) -> Result<Self> {
        validate_name(name)?;
        Ok(Self::raw(inode_number, name))
    }

    pub fn name(&self) -> Result<&str> {
        let len = self.name.iter().position(|&c| c == 0).unwrap_or(NAME_LEN);
        std::str::from_utf8(&self.name[..len]).map_err(|e| {
            FileSystemError::CorruptEncoding(format!("directory entry name: {}", e))
        })
    }

    /// 空槽：inode 编号为 0
    pub fn is_empty(&self) -> bool {
        self.inode_number == 0
    }
}

/// 新建目录项时名字的限制
pub fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() || name.len() > NAME_LEN {
        return Err(FileSystemError::InvalidOperand(format!(
            "name '{}' must be 1..={} bytes",
            name, NAME_LEN
        )));
    }
    if name == "." || name == ".." || name.contains('/') || name.contains('\0') {
        return Err(FileSystemError::InvalidOperand(format!(
            "'{}' is not a valid file name",
            name
        )));
    }
    Ok(())
}

/// 一个目录的全部内容，只占 inode 的第一个直接块。
///
/// 删除时压缩：已用目录项总是块内的前缀，编号为 0 的槽一定在已用区之后。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryBlock {
    entries: [DirEntry; DIR_ENTRIES],
}

impl DirectoryBlock {
    pub fn new(parent_inode_num: u32, self_inode_num: u32) -> Self {
        let mut entries = [DirEntry::default(); DIR_ENTRIES];
        entries[SELF_SLOT] = DirEntry::raw(self_inode_num, ".");
        entries[PARENT_SLOT] = DirEntry::raw(parent_inode_num, "..");
        Self { entries }
    }

    pub fn self_inode(&self) -> u32 {
        self.entries[SELF_SLOT].inode_number
    }

    pub fn parent_inode(&self) -> u32 {
        self.entries[PARENT_SLOT].inode_number
    }

    pub fn entry(&self, slot: usize) -> &DirEntry {
        &self.entries[slot]
    }

    /// 所有已用槽，包括 "." 和 ".."
    pub fn entries(&self) -> impl Iterator<Item = &DirEntry> {
        self.entries.iter().filter(|e| !e.is_empty())
    }

    /// "." 和 ".." 之后的普通目录项
    pub fn named_entries(&self) -> impl Iterator<Item = &DirEntry> {
        self.entries[FIRST_NAMED_SLOT..]
            .iter()
            .filter(|e| !e.is_empty())
    }

    pub fn is_full(&self) -> bool {
        self.entries.iter().all(|e| !e.is_empty())
    }

    /// 在普通目录项中按名字查找，扫描全部槽位
    pub fn find(&self, name: &str) -> Result<Option<(usize, DirEntry)>> {
        for (slot, entry) in self.entries.iter().enumerate().skip(FIRST_NAMED_SLOT) {
            if !entry.is_empty() && entry.name()? == name {
                return Ok(Some((slot, *entry)));
            }
        }
        Ok(None)
    }

    /// 按 inode 编号查找普通目录项
    pub fn slot_of(&self, inode_number: u32) -> Option<usize> {
        (FIRST_NAMED_SLOT..DIR_ENTRIES).find(|&slot| {
            let entry = &self.entries[slot];
            !entry.is_empty() && entry.inode_number == inode_number
        })
    }

    /// 放进第一个空槽，返回槽号
    pub fn insert(&mut self, entry: DirEntry) -> Result<usize> {
        let slot = (FIRST_NAMED_SLOT..DIR_ENTRIES)
            .find(|&slot| self.entries[slot].is_empty())
            .ok_or_else(|| {
                FileSystemError::CapacityExceeded(format!(
                    "directory already holds {} entries",
                    DIR_ENTRIES
                ))
            })?;
        self.entries[slot] = entry;
        Ok(slot)
    }

    /// 删除一个普通目录项，后面的目录项整体前移
    pub fn remove(&mut self, slot: usize) -> DirEntry {
        assert!(
            (FIRST_NAMED_SLOT..DIR_ENTRIES).contains(&slot),
            "slot {} is reserved or out of range",
            slot
        );
        let removed = self.entries[slot];
        self.entries.copy_within(slot + 1.., slot);
        self.entries[DIR_ENTRIES - 1] = DirEntry::default();
        removed
    }

    pub fn to_block(&self) -> Result<[u8; BLOCK_SIZE]> {
        let bytes = codec::encode(self, BLOCK_SIZE)?;
        let mut block = [0u8; BLOCK_SIZE];
        block.copy_from_slice(&bytes);
        Ok(block)
    }

    pub fn from_block(block: &[u8]) -> Result<Self> {
        let dir: DirectoryBlock = codec::decode(block)?;
        if dir.entries[SELF_SLOT].is_empty() || dir.entries[SELF_SLOT].name()? != "." {
            return Err(FileSystemError::CorruptEncoding(
                "directory block has no '.' entry".to_string(),
            ));
        }
        Ok(dir)
    }
}

impl<D: BlockDevice> FileSystem<D> {
    fn ensure_directory(dir: &Inode) -> Result<()> {
        if !dir.is_valid || !dir.is_directory || dir.direct_block_1 == 0 {
            return Err(FileSystemError::InvalidOperand(
                "inode is not a valid directory".to_string(),
            ));
        }
        Ok(())
    }

    /// 解码目录 inode 的第一个直接块
    pub fn read_directory(&self, dir: &Inode) -> Result<DirectoryBlock> {
        Self::ensure_directory(dir)?;
        DirectoryBlock::from_block(&self.read_raw(dir.direct_block_1)?)
    }

    pub(crate) fn write_directory(&mut self, dir: &Inode, block: &DirectoryBlock) -> Result<()> {
        Self::ensure_directory(dir)?;
        self.write_raw(dir.direct_block_1, &block.to_block()?)
    }

    /// 把 `self_inode_num` 变成 `parent_inode_num` 下的目录：
    /// 写入只含 "." 和 ".." 的目录块，必要时先分配第一个直接块。
    /// 两个 inode 都必须已经分配，父 inode 必须是目录。
    pub fn create_directory(
        &mut self,
        parent_inode_num: u32,
        self_inode_num: u32,
    ) -> Result<DirectoryBlock> {
        let mut inode = self.read_inode(self_inode_num)?;
        if !inode.is_valid || !self.inode_in_use(self_inode_num)? {
            return Err(FileSystemError::InvalidOperand(format!(
                "inode {} is not allocated",
                self_inode_num
            )));
        }
        let parent = self.read_inode(parent_inode_num)?;
        if !self.inode_in_use(parent_inode_num)? {
            return Err(FileSystemError::InvalidOperand(format!(
                "parent inode {} is not allocated",
                parent_inode_num
            )));
        }
        Self::ensure_directory(&parent)?;
        if !inode.is_directory && inode.direct_blocks().iter().any(|&b| b != 0) {
            return Err(FileSystemError::InvalidOperand(format!(
                "inode {} already holds file content",
                self_inode_num
            )));
        }
        if inode.direct_block_1 == 0 {
            inode.direct_block_1 = self.allocate_block()?;
        }
        inode.is_valid = true;
        inode.is_directory = true;

        let block = DirectoryBlock::new(parent_inode_num, self_inode_num);
        self.write_raw(inode.direct_block_1, &block.to_block()?)?;
        self.write_inode(&inode, self_inode_num)?;
        debug!(
            "inode {} is now a directory under {}",
            self_inode_num, parent_inode_num
        );
        Ok(block)
    }

    /// 不修改磁盘的查找。"." 和 ".." 通过保留槽解析。
    pub fn lookup(&self, name: &str, parent: &Inode) -> Result<Option<(Inode, u32)>> {
        let dir = self.read_directory(parent)?;
        let inode_num = match name {
            "." => Some(dir.self_inode()),
            ".." => Some(dir.parent_inode()),
            _ => dir.find(name)?.map(|(_, entry)| entry.inode_number),
        };
        match inode_num {
            Some(num) => Ok(Some((self.read_inode(num)?, num))),
            None => Ok(None),
        }
    }

    /// 在目录 `parent` 中打开 `name`。找不到时只有 `Create` 模式会新建。
    pub fn open(&mut self, mode: OpenMode, name: &str, parent: &Inode) -> Result<(Inode, u32)> {
        if let Some(found) = self.lookup(name, parent)? {
            return Ok(found);
        }
        if mode != OpenMode::Create {
            return Err(FileSystemError::NotFound(name.to_string()));
        }

        validate_name(name)?;
        let mut dir = self.read_directory(parent)?;
        // 先确认有空槽，避免白白分配一个 inode
        if dir.is_full() {
            return Err(FileSystemError::CapacityExceeded(format!(
                "directory already holds {} entries",
                DIR_ENTRIES
            )));
        }
        let (inode, inode_num) = self.create_inode()?;
        dir.insert(DirEntry::new(inode_num, name)?)?;
        self.write_directory(parent, &dir)?;
        debug!("created '{}' as inode {}", name, inode_num);
        Ok((inode, inode_num))
    }

    /// 在 `parent` 下新建名为 `name` 的子目录
    pub fn make_directory(&mut self, name: &str, parent: &Inode) -> Result<(Inode, u32)> {
        if self.lookup(name, parent)?.is_some() {
            return Err(FileSystemError::InvalidOperand(format!(
                "'{}' already exists",
                name
            )));
        }
        let parent_num = self.read_directory(parent)?.self_inode();
        let (_, inode_num) = self.open(OpenMode::Create, name, parent)?;
        if let Err(e) = self.create_directory(parent_num, inode_num) {
            // 撤销刚建的目录项和 inode，不留下半成品
            self.unlink(inode_num, parent)?;
            return Err(e);
        }
        Ok((self.read_inode(inode_num)?, inode_num))
    }

    /// 目录中的全部目录项（含 "." 和 ".."）
    pub fn list_directory(&self, dir: &Inode) -> Result<Vec<DirEntry>> {
        Ok(self.read_directory(dir)?.entries().copied().collect())
    }
}
