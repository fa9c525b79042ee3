//! 内核全局单例只有一份, 所有内核测试串行引导

use std::sync::{Mutex, MutexGuard};

use lazy_static::lazy_static;
use sos::{kernel_start, KernelConfig};

lazy_static! {
    static ref KERNEL_LOCK: Mutex<()> = Mutex::new(());
}

/// 持有返回的 guard 期间独占内核
pub fn boot(config: KernelConfig) -> MutexGuard<'static, ()> {
    let guard = KERNEL_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    kernel_start(config);
    guard
}
