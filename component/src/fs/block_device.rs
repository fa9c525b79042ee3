use std::any::Any;
use std::collections::BTreeMap;
use std::sync::Arc;

use spin::Mutex;

use super::{DataBlock, SECTOR_SIZE};

/// 扇区设备契约: 同步读写一个扇区.
/// 字节级的磁盘时序模拟不在本层关心范围内
pub trait BlockDevice: Send + Sync + Any {
    fn read_sector(&self, sector_id: usize, buf: &mut [u8]);
    fn write_sector(&self, sector_id: usize, buf: &[u8]);
}

pub struct BlockCache {
    cache: DataBlock,
    sector_id: usize,
    block_device: Arc<dyn BlockDevice>,
    modified: bool,
}

impl BlockCache {
    /// Load a new BlockCache from disk.
    pub fn new(sector_id: usize, block_device: Arc<dyn BlockDevice>) -> Self {
        let mut cache = [0u8; SECTOR_SIZE];
        block_device.read_sector(sector_id, &mut cache);
        Self {
            cache,
            sector_id,
            block_device,
            modified: false,
        }
    }

    pub fn read<V>(&self, f: impl FnOnce(&DataBlock) -> V) -> V {
        f(&self.cache)
    }

    pub fn modify<V>(&mut self, f: impl FnOnce(&mut DataBlock) -> V) -> V {
        self.modified = true;
        f(&mut self.cache)
    }

    pub fn sync(&mut self) {
        if self.modified {
            self.modified = false;
            self.block_device.write_sector(self.sector_id, &self.cache);
        }
    }
}

impl Drop for BlockCache {
    fn drop(&mut self) {
        self.sync()
    }
}

const BLOCK_CACHE_SIZE: usize = 32;

#[derive(Default)]
pub struct BlockCacheManager {
    map: BTreeMap<usize, Arc<Mutex<BlockCache>>>,
    block_device: Option<Arc<dyn BlockDevice>>,
}

impl BlockCacheManager {
    pub fn get_block_cache(&mut self, sector_id: usize) -> Arc<Mutex<BlockCache>> {
        // 如果已经在缓存中
        if let Some(block_cache) = self.map.get(&sector_id) {
            block_cache.clone()
        } else {
            // 保留还有引用的
            if self.map.len() == BLOCK_CACHE_SIZE {
                if let Some((&key, _)) = self
                    .map
                    .iter()
                    .find(|(_, cache)| Arc::strong_count(cache) == 1)
                {
                    self.map.remove(&key);
                }
            }

            let block_cache = Arc::new(Mutex::new(BlockCache::new(
                sector_id,
                Arc::clone(
                    self.block_device
                        .as_ref()
                        .expect("block_device haven't been registered yet"),
                ),
            )));
            self.map.insert(sector_id, block_cache.clone());
            block_cache
        }
    }

    pub fn flush(&mut self) {
        for (_, block_cache) in self.map.iter_mut() {
            block_cache.lock().sync();
        }
    }
}

/// 换上新设备, 旧缓存逐个落盘到旧设备后丢弃
pub fn register_block_device(block_device: impl BlockDevice) {
    let mut manager = super::BLOCK_CACHE_MANAGER.lock();
    manager.map.clear();
    manager.block_device = Some(Arc::new(block_device));
}

fn sector_nth(sector_id: usize) -> Arc<Mutex<BlockCache>> {
    super::BLOCK_CACHE_MANAGER.lock().get_block_cache(sector_id)
}

pub fn read<V>(sector_id: usize, operation: impl FnOnce(&DataBlock) -> V) -> V {
    sector_nth(sector_id).lock().read(operation)
}

pub fn modify<V>(sector_id: usize, operation: impl FnOnce(&mut DataBlock) -> V) -> V {
    sector_nth(sector_id).lock().modify(operation)
}

pub fn sync(sector_id: usize) {
    sector_nth(sector_id).lock().sync()
}

pub fn flush() {
    super::BLOCK_CACHE_MANAGER.lock().flush()
}
