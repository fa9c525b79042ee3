//! 系统调用整条链路的测试: 内置用户程序经寄存器陷入内核,
//! 捕获控制台上的 PrintInt 序列做断言

mod common;

use sos::driver::console;
use sos::task::scheduler::SchedulerKind;
use sos::{uprog, KernelConfig};

fn run_program(name: &str) -> Vec<i32> {
    console::capture_start();
    let tcb = uprog::spawn(name).expect("unknown builtin program");
    tcb.join();
    console::capture_take()
        .lines()
        .map(|line| line.parse().expect("console line is an int"))
        .collect()
}

fn rr_config() -> KernelConfig {
    KernelConfig {
        scheduler: SchedulerKind::Rr,
        preemptive: false,
        ..KernelConfig::default()
    }
}

#[test]
fn test_create_program() {
    let _kernel = common::boot(rr_config());
    // 成功 / 空名 / 空指针 / 重名 / 第二个文件 / 空名 / 空指针
    assert_eq!(run_program("create"), vec![0, -1, -1, -1, 0, -1, -1]);
}

#[test]
fn test_open_program() {
    let _kernel = common::boot(rr_config());
    // 空指针 / 空名 / 不存在 / 两次打开同一文件 / 打开文件表只有四个槽
    assert_eq!(
        run_program("open"),
        vec![-1, -1, -1, 0, 1, 2, 3, -1, -1]
    );
}

#[test]
fn test_close_program() {
    let _kernel = common::boot(rr_config());
    // 表满 -1; 关掉 fd 2 后重开拿回最小空闲下标 2; 表又满 -1
    assert_eq!(run_program("close"), vec![-1, 2, -1]);
}

#[test]
fn test_read_program() {
    let _kernel = common::boot(rr_config());
    // 非法 fd / 零长 / 负长 / 正常读 130 字节
    assert_eq!(run_program("read"), vec![-1, -1, -1, 130]);
}

#[test]
fn test_write_program() {
    let _kernel = common::boot(rr_config());
    assert_eq!(
        run_program("write"),
        vec![-1, -1, -1, -1, -1, 0, 4, 1, 1095, -1]
    );
}

#[test]
fn test_write_then_read_round_trip() {
    let _kernel = common::boot(rr_config());
    // 写 4 字节, 重开后读回 4 字节, 内容一致
    assert_eq!(run_program("rw"), vec![4, 4, 1]);
}
