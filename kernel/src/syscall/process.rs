//! 进程/控制台类系统调用

use logger::{debug, info};

use crate::driver::console;
use crate::fs;
use crate::machine::stats;
use crate::task;

/// 用户程序主动停机: 落盘, 打印统计, 结束模拟器进程
pub fn sys_halt() -> ! {
    info!("shutdown, initiated by user program");
    fs::flush();
    stats::print();
    std::process::exit(0);
}

pub fn sys_exit(exit_code: i32) -> ! {
    debug!(
        "thread {} exited with code {}",
        task::api::current_tcb().name(),
        exit_code
    );
    task::api::finish_current()
}

pub fn sys_print_int(value: i32) -> i32 {
    console::put_int(value);
    0
}

pub fn sys_print_char(ch: i32) -> i32 {
    console::put_char(ch as u8 as char);
    0
}
