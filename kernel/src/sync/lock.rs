//! 互斥锁, 带优先级捐赠
//!
//! 竞争失败的线程先把有效优先级捐给持有者 (沿 desired_lock 链传递),
//! 再排队睡眠. 释放时清掉持有者收到的捐赠并唤醒所有等待者;
//! 抢占式调度下, 曾被捐赠过的持有者释放后立刻让出 CPU

use std::collections::VecDeque;
use std::sync::Arc;

use logger::debug;

use super::unicore::UPSafeCell;
use crate::machine::interrupt::{self, IntStatus};
use crate::task::{self, scheduler, Tcb};

pub struct Lock {
    name: &'static str,
    inner: UPSafeCell<LockInner>,
}

struct LockInner {
    locked: bool,
    holder: Option<Arc<Tcb>>,
    wait_queue: VecDeque<Arc<Tcb>>,
}

impl Lock {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            inner: unsafe {
                UPSafeCell::new(LockInner {
                    locked: false,
                    holder: None,
                    wait_queue: VecDeque::new(),
                })
            },
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn holder(&self) -> Option<Arc<Tcb>> {
        self.inner.exclusive_access().holder.clone()
    }

    pub fn is_held_by_current_thread(&self) -> bool {
        let current = task::api::current_tcb();
        self.inner
            .exclusive_access()
            .holder
            .as_ref()
            .is_some_and(|holder| Arc::ptr_eq(holder, &current))
    }

    /// 重复加锁是致命错误
    pub fn acquire(self: &Arc<Self>) {
        let current = task::api::current_tcb();
        {
            let inner = self.inner.exclusive_access();
            assert!(
                !inner.locked
                    || !inner
                        .holder
                        .as_ref()
                        .is_some_and(|holder| Arc::ptr_eq(holder, &current)),
                "thread {} re-acquires lock {}",
                current.name(),
                self.name
            );
        }

        let old_level = interrupt::set_level(IntStatus::Off);

        loop {
            let mut inner = self.inner.exclusive_access();
            if !inner.locked {
                inner.locked = true;
                inner.holder = Some(current.clone());
                drop(inner);
                current.reset_desired_lock();
                break;
            }
            let holder = inner.holder.clone().expect("locked lock has a holder");
            drop(inner);

            // 先捐优先级再排队睡觉
            current.set_desired_lock(Arc::downgrade(self));
            scheduler::donate_priority(&current, &holder);
            self.inner.exclusive_access().wait_queue.push_back(current.clone());
            task::api::sleep_current(false);
        }
        debug!("lock {} is held by {}", self.name, current.name());

        interrupt::set_level(old_level);
    }

    /// 只有持有者可以释放
    pub fn release(self: &Arc<Self>) {
        let current = task::api::current_tcb();
        {
            let inner = self.inner.exclusive_access();
            assert!(inner.locked, "release of unheld lock {}", self.name);
            assert!(
                inner
                    .holder
                    .as_ref()
                    .is_some_and(|holder| Arc::ptr_eq(holder, &current)),
                "thread {} releases lock {} it does not hold",
                current.name(),
                self.name
            );
        }

        let old_level = interrupt::set_level(IntStatus::Off);

        // 清掉持有期间收到的捐赠
        let holder_had_donation = current.reset_effective_priority();

        loop {
            let waiter = self.inner.exclusive_access().wait_queue.pop_front();
            match waiter {
                Some(tcb) => scheduler::ready_to_run(tcb),
                None => break,
            }
        }

        {
            let mut inner = self.inner.exclusive_access();
            inner.holder = None;
            inner.locked = false;
        }
        debug!("lock {} is released", self.name);

        interrupt::set_level(old_level);

        if scheduler::is_preemptive() && holder_had_donation {
            task::api::yield_now();
        }
    }
}
