//! 时钟设备: 周期性的 Timer 中断
//!
//! 处理函数先唤醒睡眠到期的线程, 再视调度策略请求抢占.
//! 只有还有人在睡或抢占仍有意义时才重新装载,
//! 否则让待决队列自然排空, idle 就能据此发现死锁

use logger::debug;
use sys_interface::config::TIMER_TICKS;

use super::interrupt::{self, IntKind};
use crate::sync::unicore::UPSafeCell;
use crate::task::scheduler;

lazy_static! {
    static ref ARMED: UPSafeCell<bool> = unsafe { UPSafeCell::new(false) };
}

pub fn reset() {
    *ARMED.exclusive_access() = false;
}

/// 保证接下来 TIMER_TICKS 内会有一次时钟中断
pub fn ensure_armed() {
    let mut armed = ARMED.exclusive_access();
    if !*armed {
        *armed = true;
        drop(armed);
        interrupt::schedule(IntKind::Timer, TIMER_TICKS);
    }
}

/// 时钟中断处理函数, 由中断控制器在关中断下调用
pub(crate) fn handler() {
    debug!("timer interrupt");
    *ARMED.exclusive_access() = false;

    scheduler::wake_up_sleeping_thread();
    if scheduler::is_preemptive() {
        interrupt::yield_on_return();
    }

    let rearm =
        scheduler::has_sleepers() || (scheduler::is_preemptive() && !scheduler::ready_is_empty());
    if rearm {
        ensure_armed();
    }
}
