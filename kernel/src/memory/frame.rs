//! 物理页帧池
//!
//! 多个内核线程可能同时要页帧, 这是唯一用真正的 Lock
//! 保护的共享资源, 其余内核结构靠关中断互斥

use std::sync::Arc;

use component::memory::Bitmap;
use logger::info;
use sys_interface::config::NUM_PHYS_PAGES;

use crate::sync::lock::Lock;
use crate::sync::unicore::UPSafeCell;

struct FrameManager {
    lock: Arc<Lock>,
    bitmap: Bitmap,
}

lazy_static! {
    static ref FRAME_MANAGER: UPSafeCell<FrameManager> = unsafe {
        info!("FRAME_MANAGER initializing...");
        UPSafeCell::new(FrameManager {
            lock: Arc::new(Lock::new("frame manager lock")),
            bitmap: Bitmap::new(NUM_PHYS_PAGES),
        })
    };
}

pub fn reset() {
    let mut manager = FRAME_MANAGER.exclusive_access();
    manager.lock = Arc::new(Lock::new("frame manager lock"));
    manager.bitmap = Bitmap::new(NUM_PHYS_PAGES);
}

/// 原子地取一个空闲页帧, 耗尽时返回 None
pub fn acquire() -> Option<usize> {
    let lock = FRAME_MANAGER.exclusive_access().lock.clone();
    lock.acquire();
    let frame = FRAME_MANAGER.exclusive_access().bitmap.find_and_set();
    lock.release();
    frame
}

/// 原子地归还页帧
pub fn release(frame: usize) {
    let lock = FRAME_MANAGER.exclusive_access().lock.clone();
    lock.acquire();
    FRAME_MANAGER.exclusive_access().bitmap.clear(frame);
    lock.release();
}

pub fn num_avail() -> usize {
    let lock = FRAME_MANAGER.exclusive_access().lock.clone();
    lock.acquire();
    let avail = FRAME_MANAGER.exclusive_access().bitmap.num_clear();
    lock.release();
    avail
}
