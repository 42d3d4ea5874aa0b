//! 磁盘记录的定长编码。
//!
//! 所有记录都只含定长字段，用 fixint + 小端的 bincode 编码后，
//! 字段顺序和宽度完全确定。记录存放在补零的槽位里，解码时忽略尾部填充。

use bincode::Options;
use serde::{de::DeserializeOwned, Serialize};

use crate::fs::error::{FileSystemError, Result};

fn options() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .with_little_endian()
        .allow_trailing_bytes()
}

/// 编码并补零到 `slot_size` 字节
pub fn encode<T: Serialize>(value: &T, slot_size: usize) -> Result<Vec<u8>> {
    let mut bytes = options().serialize(value)?;
    if bytes.len() > slot_size {
        return Err(FileSystemError::CorruptEncoding(format!(
            "record of {} bytes does not fit a {}-byte slot",
            bytes.len(),
            slot_size
        )));
    }
    bytes.resize(slot_size, 0);
    Ok(bytes)
}

pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    Ok(options().deserialize(bytes)?)
}

/// 记录编码后的实际字节数（不含填充）
pub fn encoded_len<T: Serialize>(value: &T) -> Result<usize> {
    Ok(options().serialized_size(value)? as usize)
}
