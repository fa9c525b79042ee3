//! 条件变量, Mesa 语义
//!
//! wait 在关中断下入队并放锁, 醒来后在开中断区重新拿锁;
//! signal 只是把一个等待者搬进就绪队列, 唤醒者继续持锁运行,
//! 所以被唤醒的一方必须重查自己的谓词

use std::collections::VecDeque;
use std::sync::Arc;

use super::lock::Lock;
use super::unicore::UPSafeCell;
use crate::machine::interrupt::{self, IntStatus};
use crate::task::{self, scheduler, Tcb};

pub struct Condition {
    name: &'static str,
    wait_queue: UPSafeCell<VecDeque<Arc<Tcb>>>,
}

impl Condition {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            wait_queue: unsafe { UPSafeCell::new(VecDeque::new()) },
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// 原子地入队 + 放锁 + 睡眠; 返回前重新拿锁
    pub fn wait(&self, condition_lock: &Arc<Lock>) {
        assert!(condition_lock.is_held_by_current_thread());

        let current = task::api::current_tcb();
        let old_level = interrupt::set_level(IntStatus::Off);

        self.wait_queue.exclusive_access().push_back(current);
        condition_lock.release();
        task::api::sleep_current(false);

        interrupt::set_level(old_level);

        condition_lock.acquire();
    }

    /// 至多唤醒一个等待者
    pub fn signal(&self, condition_lock: &Arc<Lock>) {
        assert!(condition_lock.is_held_by_current_thread());

        let old_level = interrupt::set_level(IntStatus::Off);
        let waiter = self.wait_queue.exclusive_access().pop_front();
        if let Some(tcb) = waiter {
            scheduler::ready_to_run(tcb);
        }
        interrupt::set_level(old_level);
    }

    /// 唤醒所有等待者
    pub fn broadcast(&self, condition_lock: &Arc<Lock>) {
        while !self.wait_queue.exclusive_access().is_empty() {
            self.signal(condition_lock);
        }
    }
}
