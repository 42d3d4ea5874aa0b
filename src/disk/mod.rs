mod block_device;
mod memory_disk;
mod types;

pub use block_device::BlockDevice;
pub use memory_disk::MemoryDisk;
pub use types::{Block, BLOCK_SIZE, DEFAULT_BLOCK_COUNT};
