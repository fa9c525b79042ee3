//! 模拟中断控制器
//!
//! 中断只有开/关两级. 关中断即内核唯一的互斥手段;
//! 待决中断按触发时刻排队, 时钟在 set_level(On) 与显式 one_tick 处推进,
//! 推进越过触发时刻的中断立即派发. 处理函数在强制关中断下运行

use std::cmp::Ordering;

use component::collections::SortedList;

use super::{stats, timer};
use crate::sync::unicore::UPSafeCell;
use crate::task;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntStatus {
    Off,
    On,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickKind {
    System,
    User,
}

/// 设备中断种类. 磁盘与控制台按同步契约工作, 只有时钟走中断
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum IntKind {
    Timer,
}

struct PendingInterrupt {
    when: usize,
    kind: IntKind,
}

fn compare_pending(a: &PendingInterrupt, b: &PendingInterrupt) -> Ordering {
    a.when.cmp(&b.when)
}

struct Interrupt {
    level: IntStatus,
    pending: SortedList<PendingInterrupt>,
    yield_on_return: bool,
}

lazy_static! {
    static ref INTERRUPT: UPSafeCell<Interrupt> = unsafe {
        UPSafeCell::new(Interrupt {
            level: IntStatus::Off,
            pending: SortedList::new(compare_pending),
            yield_on_return: false,
        })
    };
}

pub fn reset() {
    let mut interrupt = INTERRUPT.exclusive_access();
    interrupt.level = IntStatus::Off;
    interrupt.pending = SortedList::new(compare_pending);
    interrupt.yield_on_return = false;
}

pub fn get_level() -> IntStatus {
    INTERRUPT.exclusive_access().level
}

/// 切换中断级别并返回旧值. 从关到开意味着离开临界区, 时钟前进一步
pub fn set_level(new_level: IntStatus) -> IntStatus {
    let old_level = {
        let mut interrupt = INTERRUPT.exclusive_access();
        let old = interrupt.level;
        interrupt.level = new_level;
        old
    };
    if old_level == IntStatus::Off && new_level == IntStatus::On {
        one_tick(TickKind::System);
    }
    old_level
}

pub fn enable() {
    set_level(IntStatus::On);
}

/// 在稍后的模拟时刻排一个设备中断
pub(crate) fn schedule(kind: IntKind, delay_ticks: usize) {
    assert!(delay_ticks > 0);
    let when = stats::total_ticks() + delay_ticks;
    INTERRUPT
        .exclusive_access()
        .pending
        .insert(PendingInterrupt { when, kind });
}

/// 中断处理函数请求在处理结束后让出 CPU
pub(crate) fn yield_on_return() {
    INTERRUPT.exclusive_access().yield_on_return = true;
}

/// 推进模拟时钟一步, 派发所有到期的中断.
/// 处理函数跑完后若有让出请求, 在恢复原级别之后执行
pub fn one_tick(kind: TickKind) {
    match kind {
        TickKind::System => stats::advance_system(),
        TickKind::User => stats::advance_user(),
    }

    // 处理期间强制关中断
    let saved_level = {
        let mut interrupt = INTERRUPT.exclusive_access();
        let saved = interrupt.level;
        interrupt.level = IntStatus::Off;
        saved
    };
    fire_due();
    INTERRUPT.exclusive_access().level = saved_level;

    let do_yield = {
        let mut interrupt = INTERRUPT.exclusive_access();
        let y = interrupt.yield_on_return;
        interrupt.yield_on_return = false;
        y
    };
    if do_yield {
        task::api::yield_now();
    }
}

/// 没有线程可跑时把时钟直接拨到下一个待决中断.
/// 一个中断都没有说明再也不会有线程醒来, 是死锁
pub fn idle() {
    let next_when = {
        let interrupt = INTERRUPT.exclusive_access();
        interrupt.pending.front().map(|p| p.when)
    };
    match next_when {
        None => panic!("machine idled with no pending interrupts: all threads blocked"),
        Some(when) => {
            stats::advance_to(when);
            fire_due();
            // 当前线程已阻塞, 让出请求没有意义
            INTERRUPT.exclusive_access().yield_on_return = false;
        }
    }
}

fn fire_due() {
    loop {
        let due = {
            let mut interrupt = INTERRUPT.exclusive_access();
            let is_due = interrupt
                .pending
                .front()
                .map(|p| p.when <= stats::total_ticks())
                .unwrap_or(false);
            if is_due {
                interrupt.pending.remove_front()
            } else {
                None
            }
        };
        match due {
            Some(pending) => dispatch(pending.kind),
            None => break,
        }
    }
}

fn dispatch(kind: IntKind) {
    match kind {
        IntKind::Timer => timer::handler(),
    }
}
