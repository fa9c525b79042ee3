pub mod block_device;

pub mod sfs;

/// 扇区是磁盘寻址与 I/O 的基本单位
pub const SECTOR_SIZE: usize = 128;

pub type DataBlock = [u8; SECTOR_SIZE];

use block_device::BlockCacheManager;
use lazy_static::lazy_static;
use spin::Mutex;

lazy_static! {
    pub static ref BLOCK_CACHE_MANAGER: Mutex<BlockCacheManager> =
        Mutex::new(BlockCacheManager::default());
}
