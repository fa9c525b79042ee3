//! sos: 单处理器教学内核模拟器
//!
//! 四个核心子系统: 线程调度 (睡眠队列 + 优先级捐赠),
//! 关中断实现的同步原语, 软件 TLB + 核心映射的虚拟内存翻译,
//! 以及扇区级文件系统. 模拟的 CPU/磁盘/控制台只以契约形式存在于 machine 与 driver 层

#![allow(dead_code)]

#[macro_use]
extern crate lazy_static;

pub mod driver;
pub mod fs;
pub mod init;
pub mod machine;
pub mod memory;
pub mod sync;
pub mod syscall;
pub mod task;
pub mod trap;
pub mod uprog;

pub use init::{kernel_start, DiskBacking, KernelConfig};
