//! 异常入口: 用户程序陷入内核的唯一通道
//!
//! 系统调用约定: 调用号在 r2, 参数在 r4..r7, 结果写回 r2,
//! 返回前 PC 前进一个字 (否则用户程序在原地无限重复陷入).
//! TLB 缺失异常交给核心映射补翻译, 随后引发异常的访存被重试

use logger::trace;
use sys_interface::config::PAGE_SIZE;
use sys_interface::syscall::*;

use crate::machine::processor::{self, ExceptionKind, BAD_VADDR_REG};
use crate::machine::stats;
use crate::memory::coremap;
use crate::syscall;

pub fn exception_handler(which: ExceptionKind) {
    match which {
        ExceptionKind::Syscall => syscall_entry(),
        ExceptionKind::PageFault => {
            let bad_vaddr = processor::read_register(BAD_VADDR_REG) as usize;
            coremap::push_entry_to_tlb(bad_vaddr / PAGE_SIZE);
        }
        other => panic!("unexpected user mode exception {:?}", other),
    }
}

fn syscall_entry() {
    let id = processor::read_register(2) as usize;
    let args = [
        processor::read_register(4),
        processor::read_register(5),
        processor::read_register(6),
        processor::read_register(7),
    ];
    trace!("syscall {} ({})", id, syscall_name(id));
    stats::add_syscall();

    match id {
        SYSCALL_HALT => syscall::process::sys_halt(),
        SYSCALL_EXIT => syscall::process::sys_exit(args[0]),
        _ => {
            let result = match id {
                SYSCALL_CREATE => syscall::fs::sys_create(args[0]),
                SYSCALL_OPEN => syscall::fs::sys_open(args[0]),
                SYSCALL_READ => syscall::fs::sys_read(args[0], args[1], args[2]),
                SYSCALL_WRITE => syscall::fs::sys_write(args[0], args[1], args[2]),
                SYSCALL_CLOSE => syscall::fs::sys_close(args[0]),
                SYSCALL_PRINT_INT => syscall::process::sys_print_int(args[0]),
                SYSCALL_PRINT_CHAR => syscall::process::sys_print_char(args[0]),
                _ => panic!("unexpected system call {}", id),
            };
            processor::write_register(2, result);
            processor::advance_pc();
        }
    }
}
