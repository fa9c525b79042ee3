//! 模拟时间与性能计数器

use crate::sync::unicore::UPSafeCell;

/// 一次系统层活动推进的 tick 数
pub const SYSTEM_TICK: usize = 10;
/// 一条用户指令推进的 tick 数
pub const USER_TICK: usize = 1;

#[derive(Default)]
pub struct Statistics {
    pub total_ticks: usize,
    pub system_ticks: usize,
    pub user_ticks: usize,
    pub num_page_faults: usize,
    pub num_disk_reads: usize,
    pub num_disk_writes: usize,
    pub num_syscalls: usize,
}

lazy_static! {
    static ref STATS: UPSafeCell<Statistics> =
        unsafe { UPSafeCell::new(Statistics::default()) };
}

pub fn reset() {
    *STATS.exclusive_access() = Statistics::default();
}

pub fn total_ticks() -> usize {
    STATS.exclusive_access().total_ticks
}

pub fn user_ticks() -> usize {
    STATS.exclusive_access().user_ticks
}

pub(crate) fn advance_system() {
    let mut stats = STATS.exclusive_access();
    stats.total_ticks += SYSTEM_TICK;
    stats.system_ticks += SYSTEM_TICK;
}

pub(crate) fn advance_user() {
    let mut stats = STATS.exclusive_access();
    stats.total_ticks += USER_TICK;
    stats.user_ticks += USER_TICK;
}

/// 空转时直接把时钟拨到 when
pub(crate) fn advance_to(when: usize) {
    let mut stats = STATS.exclusive_access();
    if when > stats.total_ticks {
        stats.system_ticks += when - stats.total_ticks;
        stats.total_ticks = when;
    }
}

pub fn add_page_fault() {
    STATS.exclusive_access().num_page_faults += 1;
}

pub fn num_page_faults() -> usize {
    STATS.exclusive_access().num_page_faults
}

pub fn add_disk_read() {
    STATS.exclusive_access().num_disk_reads += 1;
}

pub fn add_disk_write() {
    STATS.exclusive_access().num_disk_writes += 1;
}

pub fn add_syscall() {
    STATS.exclusive_access().num_syscalls += 1;
}

/// 停机时打印全部计数
pub fn print() {
    let stats = STATS.exclusive_access();
    println!(
        "Ticks: total {}, system {}, user {}",
        stats.total_ticks, stats.system_ticks, stats.user_ticks
    );
    println!(
        "Disk I/O: reads {}, writes {}",
        stats.num_disk_reads, stats.num_disk_writes
    );
    println!("Paging: faults {}", stats.num_page_faults);
    println!("System calls: {}", stats.num_syscalls);
}
