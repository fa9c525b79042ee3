//! 内核引导: 把各子系统按依赖顺序接起来
//!
//! 测试会用不同的配置反复引导, 所有全局单例都支持被重置;
//! 上一个内核残留的宿主线程停在各自的切换垫上, 不会再被唤醒

use std::path::PathBuf;

use component::fs::block_device;
use logger::{info, LogLevel};
use sys_interface::config::{NUM_SECTORS, PAGE_SIZE};

use crate::driver::block::{FileDisk, RamDisk};
use crate::fs;
use crate::machine::{interrupt, processor, stats, timer};
use crate::memory::{coremap, frame};
use crate::task::scheduler::{self, SchedulerKind};
use crate::task::Tcb;

pub enum DiskBacking {
    /// 内存盘, 测试与一次性运行用
    Ram,
    /// 宿主文件里的持久磁盘映像
    File(PathBuf),
}

pub struct KernelConfig {
    pub scheduler: SchedulerKind,
    pub preemptive: bool,
    pub format: bool,
    pub disk: DiskBacking,
    pub log_level: LogLevel,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            scheduler: SchedulerKind::Rr,
            preemptive: false,
            format: true,
            disk: DiskBacking::Ram,
            log_level: LogLevel::INFO,
        }
    }
}

/// 引导内核. 返回时引导流程所在的宿主线程已成为 main 线程,
/// 中断打开, 文件系统就绪
pub fn kernel_start(config: KernelConfig) {
    logger::set_log_level(config.log_level);
    info!("kernel initializing...");

    // 页大小与扇区大小一致, 一页正好一个扇区的换入换出
    assert_eq!(PAGE_SIZE, component::fs::SECTOR_SIZE);

    stats::reset();
    interrupt::reset();
    timer::reset();
    processor::reset();

    scheduler::init(config.scheduler, config.preemptive);
    scheduler::bootstrap(Tcb::new_bootstrap("main"));

    match config.disk {
        DiskBacking::Ram => block_device::register_block_device(RamDisk::new(NUM_SECTORS)),
        DiskBacking::File(path) => block_device::register_block_device(
            FileDisk::new(&path, NUM_SECTORS).expect("cannot open disk image"),
        ),
    }
    fs::init(config.format);

    frame::reset();
    coremap::reset();

    if config.preemptive {
        timer::ensure_armed();
    }
    interrupt::enable();
    info!("kernel started");
}

/// 停机收尾: 落盘并打印统计
pub fn halt() {
    fs::flush();
    stats::print();
}
