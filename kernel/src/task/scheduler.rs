//! 线程调度器
//!
//! 这些例程假定调用方已经关中断: 单处理器上关中断即互斥.
//! 这里不能用 Lock 互斥 -- 等锁会再进 find_next_to_run, 无限递归.
//!
//! 就绪队列按策略比较器排序, 睡眠队列按唤醒时刻排序;
//! finishing 线程的尸体停在 to_be_destroyed 槽里, 由接班线程回收

use std::cmp::Ordering;
use std::sync::Arc;

use component::collections::SortedList;
use logger::debug;
use sys_interface::config::MAX_DONATION_DEPTH;

use super::switch;
use super::{TaskStatus, Tcb};
use crate::machine::processor;
use crate::machine::stats;
use crate::machine::timer;
use crate::machine::interrupt::{self, IntStatus};
use crate::sync::unicore::UPSafeCell;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerKind {
    /// Round-Robin
    Rr,
    /// First-Come-First-Serve
    Fcfs,
    Priority,
    /// Shortest-Job-First
    Sjf,
}

/// 未来某一时刻要叫醒的线程
struct PendingThread {
    tcb: Arc<Tcb>,
    when: usize,
}

fn compare_pending(a: &PendingThread, b: &PendingThread) -> Ordering {
    a.when.cmp(&b.when)
}

type ThreadComparator = fn(&Arc<Tcb>, &Arc<Tcb>) -> Ordering;

// 比较结果 Less 表示排在队列更前面
fn compare_fifo(_: &Arc<Tcb>, _: &Arc<Tcb>) -> Ordering {
    Ordering::Equal
}

fn compare_priority(a: &Arc<Tcb>, b: &Arc<Tcb>) -> Ordering {
    b.priority().cmp(&a.priority())
}

fn compare_effective_priority(a: &Arc<Tcb>, b: &Arc<Tcb>) -> Ordering {
    b.effective_priority().cmp(&a.effective_priority())
}

fn compare_burst(a: &Arc<Tcb>, b: &Arc<Tcb>) -> Ordering {
    a.burst_ticks().cmp(&b.burst_ticks())
}

fn comparator_for(kind: SchedulerKind, preemptive: bool) -> ThreadComparator {
    match kind {
        SchedulerKind::Rr | SchedulerKind::Fcfs => compare_fifo,
        SchedulerKind::Sjf => compare_burst,
        SchedulerKind::Priority => {
            if preemptive {
                compare_effective_priority
            } else {
                compare_priority
            }
        }
    }
}

struct Scheduler {
    kind: SchedulerKind,
    preemptive: bool,
    comparator: ThreadComparator,
    ready_list: SortedList<Arc<Tcb>>,
    sleep_list: SortedList<PendingThread>,
    to_be_destroyed: Option<Arc<Tcb>>,
    current: Option<Arc<Tcb>>,
}

impl Scheduler {
    fn new(kind: SchedulerKind, preemptive: bool) -> Self {
        assert!(
            !(preemptive && kind == SchedulerKind::Fcfs),
            "FCFS cannot be preemptive"
        );
        let comparator = comparator_for(kind, preemptive);
        Self {
            kind,
            preemptive,
            comparator,
            ready_list: SortedList::new(comparator),
            sleep_list: SortedList::new(compare_pending),
            to_be_destroyed: None,
            current: None,
        }
    }
}

lazy_static! {
    static ref SCHEDULER: UPSafeCell<Scheduler> = {
        logger::info!("SCHEDULER initializing...");
        unsafe { UPSafeCell::new(Scheduler::new(SchedulerKind::Rr, false)) }
    };
}

/// 换上指定策略的新调度器 (内核启动时调用)
pub fn init(kind: SchedulerKind, preemptive: bool) {
    *SCHEDULER.exclusive_access() = Scheduler::new(kind, preemptive);
}

/// 把引导线程登记为当前线程
pub fn bootstrap(main_tcb: Arc<Tcb>) {
    SCHEDULER.exclusive_access().current = Some(main_tcb);
}

pub fn kind() -> SchedulerKind {
    SCHEDULER.exclusive_access().kind
}

pub fn is_preemptive() -> bool {
    SCHEDULER.exclusive_access().preemptive
}

pub fn current_tcb() -> Arc<Tcb> {
    SCHEDULER
        .exclusive_access()
        .current
        .clone()
        .expect("no current thread")
}

pub fn try_current_tcb() -> Option<Arc<Tcb>> {
    SCHEDULER.exclusive_access().current.clone()
}

pub fn ready_is_empty() -> bool {
    SCHEDULER.exclusive_access().ready_list.is_empty()
}

pub fn has_sleepers() -> bool {
    !SCHEDULER.exclusive_access().sleep_list.is_empty()
}

/// 线程可以上 CPU 了, 按策略顺序插入就绪队列
pub fn ready_to_run(tcb: Arc<Tcb>) {
    assert_eq!(interrupt::get_level(), IntStatus::Off);
    debug!("putting thread {} on ready list", tcb.name());

    tcb.set_status(TaskStatus::Ready);
    SCHEDULER.exclusive_access().ready_list.insert(tcb);
    // 抢占依赖时钟中断, 保证它在走
    if is_preemptive() {
        timer::ensure_armed();
    }
}

/// 挑下一个上 CPU 的线程.
/// 非抢占: 取队头, 队列空返回 None.
/// 抢占: 当前线程没阻塞时与队头比较, 队头不落后才换下当前线程
pub fn find_next_to_run() -> Option<Arc<Tcb>> {
    assert_eq!(interrupt::get_level(), IntStatus::Off);
    let mut scheduler = SCHEDULER.exclusive_access();

    if !scheduler.preemptive {
        return scheduler.ready_list.remove_front();
    }

    let current = scheduler.current.clone().expect("no current thread");
    if current.status() == TaskStatus::Blocked {
        return scheduler.ready_list.remove_front();
    }
    if scheduler.ready_list.is_empty() {
        return Some(current);
    }

    let comparator = scheduler.comparator;
    let take_front = {
        let front = scheduler.ready_list.front().unwrap();
        comparator(front, &current) != Ordering::Greater
    };
    if take_front {
        scheduler.ready_list.remove_front()
    } else {
        Some(current)
    }
}

/// 把 CPU 分派给 next. finishing 时把旧线程放进 to_be_destroyed,
/// 等下一个线程跑起来再回收 -- 线程不能在自己的栈上给自己收尸
pub fn run(next: Arc<Tcb>, finishing: bool) {
    assert_eq!(interrupt::get_level(), IntStatus::Off);
    let old = current_tcb();

    {
        let mut scheduler = SCHEDULER.exclusive_access();
        if finishing {
            assert!(
                scheduler.to_be_destroyed.is_none(),
                "to_be_destroyed slot is occupied"
            );
            scheduler.to_be_destroyed = Some(old.clone());
        }
        scheduler.current = Some(next.clone());
    }

    if old.has_space() {
        old.save_user_state();
    }
    // 上下文切换必须冲掉 TLB, 表项不带地址空间标识
    processor::tlb_clean();
    old.check_overflow();

    next.set_status(TaskStatus::Running);
    next.set_start_ticks(stats::user_ticks());
    debug!("switching from {} to {}", old.name(), next.name());

    switch::switch(&old.pad, &next.pad, finishing);

    if finishing {
        // 垂死线程交出 CPU 后沿宿主线程栈退出, 不再回来
        return;
    }

    // 我们回来了, 又跑在 old 上
    assert_eq!(interrupt::get_level(), IntStatus::Off);
    debug!("now in thread {}", old.name());

    check_to_be_destroyed();
    if old.has_space() {
        old.restore_user_state();
    }
}

/// 回收停在 to_be_destroyed 槽里的前任
pub fn check_to_be_destroyed() {
    let corpse = SCHEDULER.exclusive_access().to_be_destroyed.take();
    if let Some(tcb) = corpse {
        debug!("reclaiming thread {}", tcb.name());
        drop(tcb);
    }
}

/// 当前线程睡 sleep_ticks 个 tick. 自行负责关/恢复中断
pub fn set_sleep(sleep_ticks: usize) {
    assert!(sleep_ticks > 0);
    let old_level = interrupt::set_level(IntStatus::Off);

    let when = stats::total_ticks() + sleep_ticks;
    let current = current_tcb();
    debug!("thread {} sleeps until tick {}", current.name(), when);
    SCHEDULER
        .exclusive_access()
        .sleep_list
        .insert(PendingThread { tcb: current, when });
    timer::ensure_armed();

    super::api::sleep_current(false);

    interrupt::set_level(old_level);
}

/// 时钟中断里调用: 把睡眠到期的线程依次搬回就绪队列
pub fn wake_up_sleeping_thread() {
    assert_eq!(interrupt::get_level(), IntStatus::Off);
    loop {
        let due = {
            let mut scheduler = SCHEDULER.exclusive_access();
            let is_due = scheduler
                .sleep_list
                .front()
                .map(|pending| pending.when <= stats::total_ticks())
                .unwrap_or(false);
            if is_due {
                scheduler.sleep_list.remove_front()
            } else {
                None
            }
        };
        match due {
            Some(pending) => ready_to_run(pending.tcb),
            None => break,
        }
    }
}

/// 按当前策略比较两个线程
pub fn compare_thread(a: &Arc<Tcb>, b: &Arc<Tcb>) -> Ordering {
    let comparator = SCHEDULER.exclusive_access().comparator;
    comparator(a, b)
}

/// donor 的有效优先级胜过 donee 时把它捐过去,
/// 并沿 desired_lock 的持有者和 desired_join 的目标迭代传播到不动点.
/// 深度上界挡住环状等待
pub fn donate_priority(donor: &Arc<Tcb>, donee: &Arc<Tcb>) {
    assert_eq!(interrupt::get_level(), IntStatus::Off);
    assert!(!Arc::ptr_eq(donor, donee));

    let mut work = vec![(donor.clone(), donee.clone())];
    let mut depth = 0;
    while let Some((donor, donee)) = work.pop() {
        depth += 1;
        if depth > MAX_DONATION_DEPTH {
            logger::warn!("donation chain deeper than {}, stop", MAX_DONATION_DEPTH);
            break;
        }
        if compare_thread(&donor, &donee) != Ordering::Less {
            continue;
        }
        debug!(
            "thread {} ({}) donates effective priority to {} ({})",
            donor.name(),
            donor.effective_priority(),
            donee.name(),
            donee.effective_priority()
        );
        donee.set_donated(donor.effective_priority());
        update_ready_list(&donee);

        if let Some(lock) = donee.desired_lock() {
            if let Some(holder) = lock.holder() {
                if !Arc::ptr_eq(&holder, &donee) {
                    work.push((donee.clone(), holder));
                }
            }
        }
        if let Some(join_target) = donee.desired_join() {
            if !Arc::ptr_eq(&join_target, &donee) {
                work.push((donee.clone(), join_target));
            }
        }
    }
}

/// 有效优先级变了的线程若在就绪队列里, 摘下来重插恢复有序
pub fn update_ready_list(tcb: &Tcb) -> bool {
    assert_eq!(interrupt::get_level(), IntStatus::Off);
    let mut scheduler = SCHEDULER.exclusive_access();

    let removed = scheduler
        .ready_list
        .remove_where(|candidate| std::ptr::eq(candidate.as_ref(), tcb));
    match removed {
        Some(tcb) => {
            scheduler.ready_list.insert(tcb);
            true
        }
        None => false,
    }
}

/// 打印就绪队列内容, 调试用
pub fn print() {
    let scheduler = SCHEDULER.exclusive_access();
    let names: Vec<String> = scheduler
        .ready_list
        .iter()
        .map(|tcb| tcb.name().to_string())
        .collect();
    println!("Ready list contents: {}", names.join(", "));
}
