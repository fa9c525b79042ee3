//! 信号量
//!
//! P 在值为零时把自己挂进等待队列并睡眠, 醒来后重新检查;
//! V 先唤醒队头再加一. 不变式: value > 0 时队列必空

use std::collections::VecDeque;
use std::sync::Arc;

use super::unicore::UPSafeCell;
use crate::machine::interrupt::{self, IntStatus};
use crate::task::{self, scheduler, Tcb};

pub struct Semaphore {
    name: &'static str,
    inner: UPSafeCell<SemaphoreInner>,
}

struct SemaphoreInner {
    value: isize,
    queue: VecDeque<Arc<Tcb>>,
}

impl Semaphore {
    pub fn new(name: &'static str, initial_value: isize) -> Self {
        assert!(initial_value >= 0);
        Self {
            name,
            inner: unsafe {
                UPSafeCell::new(SemaphoreInner {
                    value: initial_value,
                    queue: VecDeque::new(),
                })
            },
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn value(&self) -> isize {
        self.inner.exclusive_access().value
    }

    /// 等待值大于零, 然后消耗一个
    pub fn p(&self) {
        let old_level = interrupt::set_level(IntStatus::Off);

        loop {
            let current = task::api::current_tcb();
            let mut inner = self.inner.exclusive_access();
            if inner.value > 0 {
                inner.value -= 1;
                break;
            }
            // 信号量不可用, 排队睡觉
            inner.queue.push_back(current);
            drop(inner);
            task::api::sleep_current(false);
        }

        interrupt::set_level(old_level);
    }

    /// 加一, 有人在等就叫醒队头
    pub fn v(&self) {
        let old_level = interrupt::set_level(IntStatus::Off);

        let waiter = self.inner.exclusive_access().queue.pop_front();
        if let Some(tcb) = waiter {
            scheduler::ready_to_run(tcb);
        }
        self.inner.exclusive_access().value += 1;

        interrupt::set_level(old_level);
    }
}
