/// 每个逻辑块（Block）的大小：1KB
/// 文件系统以“块”为最小读写单位。
pub const BLOCK_SIZE: usize = 1024;

/// 默认磁盘块数：16384 块 × 1KB = 16MB，全部驻留在内存中。
pub const DEFAULT_BLOCK_COUNT: u32 = 16 * 1024;

/// 定义一个逻辑块类型（每块 1KB 的字节数组）
/// 所有磁盘读写都以 Block 为单位进行。
pub type Block = [u8; BLOCK_SIZE];
