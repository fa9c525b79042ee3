//! 内置用户程序
//!
//! 指令解释器不在范围内, 用户程序以内建形式存在:
//! 每个程序跑在自己的用户线程和地址空间里, 通过寄存器 + 陷入
//! 走和真实用户程序完全相同的系统调用路径, 参数字符串
//! 先被逐字节搬进用户内存再把虚拟地址放进 r4

use std::sync::Arc;

use sys_interface::config::MAX_VIRT_PAGES;
use sys_interface::syscall::*;

use crate::machine::interrupt::{self, TickKind};
use crate::machine::processor::{self, ExceptionKind};
use crate::memory::address_space::AddressSpace;
use crate::memory::page_table::api as uaccess;
use crate::task::{self, Tcb};
use crate::trap;

/// 触发一次系统调用陷入, 返回 r2 里的结果
fn syscall(id: usize, args: [i32; 4]) -> i32 {
    // 一条陷入指令的开销
    interrupt::one_tick(TickKind::User);
    processor::write_register(2, id as i32);
    processor::write_register(4, args[0]);
    processor::write_register(5, args[1]);
    processor::write_register(6, args[2]);
    processor::write_register(7, args[3]);
    processor::raise_exception(ExceptionKind::Syscall, 0);
    processor::read_register(2)
}

/// 把字符串连同结尾 NUL 搬进当前线程的用户内存, 返回虚拟地址
fn store_str(s: &str) -> i32 {
    let addr = task::api::current_tcb().with_space_mut(|space| space.alloc_buffer(s.len() + 1));
    let mut bytes = s.as_bytes().to_vec();
    bytes.push(0);
    assert!(uaccess::write_user_bytes(addr, &bytes));
    addr as i32
}

/// 在用户内存里划一块裸缓冲
fn alloc_buffer(len: usize) -> i32 {
    task::api::current_tcb().with_space_mut(|space| space.alloc_buffer(len)) as i32
}

fn create_at(path_addr: i32) -> i32 {
    syscall(SYSCALL_CREATE, [path_addr, 0, 0, 0])
}

fn create(path: &str) -> i32 {
    create_at(store_str(path))
}

fn open_at(path_addr: i32) -> i32 {
    syscall(SYSCALL_OPEN, [path_addr, 0, 0, 0])
}

fn open(path: &str) -> i32 {
    open_at(store_str(path))
}

fn close(fd: i32) -> i32 {
    syscall(SYSCALL_CLOSE, [fd, 0, 0, 0])
}

fn read(buf_addr: i32, size: i32, fd: i32) -> i32 {
    syscall(SYSCALL_READ, [buf_addr, size, fd, 0])
}

fn write(buf_addr: i32, size: i32, fd: i32) -> i32 {
    syscall(SYSCALL_WRITE, [buf_addr, size, fd, 0])
}

fn print_int(value: i32) {
    syscall(SYSCALL_PRINT_INT, [value, 0, 0, 0]);
}

fn exit(code: i32) -> ! {
    syscall(SYSCALL_EXIT, [code, 0, 0, 0]);
    unreachable!("exit returned")
}

// ---------------------------------------------------------------------
// 内置程序本体, 与教学用 C 测试程序同构

fn create_prog() {
    let file_name1 = "createFile1095.txt";

    print_int(create(file_name1));
    print_int(create(""));
    print_int(create_at(0));
    // 重名创建
    print_int(create(file_name1));
    print_int(create("abc"));
    print_int(create(""));
    print_int(create_at(0));
    exit(0)
}

fn open_prog() {
    print_int(open_at(0));
    print_int(open(""));

    // 打开不存在的文件
    print_int(open("openFile1095.txt"));

    create("openFile1095.txt");
    print_int(open("openFile1095.txt"));

    // 同一个文件再开一个 fd
    print_int(open("openFile1095.txt"));

    // 打开文件表只有四个槽
    create("f1.txt");
    create("f2.txt");
    create("f3.txt");
    create("f4.txt");

    print_int(open("f1.txt"));
    print_int(open("f2.txt"));
    print_int(open("f3.txt"));
    print_int(open("f4.txt"));
    exit(0)
}

fn close_prog() {
    // 非法 fd 与空槽
    close(-1);
    close(0);

    // 开了再关
    create("closeFile1095.txt");
    let tmp_fd = open("closeFile1095.txt");
    close(tmp_fd);

    let names = ["f1", "f2", "f3", "f4"];
    for name in names {
        create(name);
    }
    let mut fd = [0i32; 4];
    for (i, name) in names.iter().enumerate() {
        fd[i] = open(name);
    }

    // 关一个就腾出一个槽
    print_int(open("closeFile1095.txt")); // -1
    close(fd[2]);
    print_int(open("closeFile1095.txt")); // 2

    print_int(open(names[2])); // -1
    exit(0)
}

fn read_prog() {
    create("bigFile1095.txt");
    let fd = open("bigFile1095.txt");
    // 先铺一段内容进去
    let pattern = alloc_buffer(200);
    write(pattern, 200, fd);

    let fd1 = open("nonExist.txt");
    let data = alloc_buffer(130);

    print_int(read(data, 130, fd1)); // -1

    print_int(read(data, 0, fd)); // -1
    print_int(read(data, -1, fd)); // -1

    print_int(read(data, 130, fd)); // 130
    create("result");
    write(data, 130, open("result"));
    exit(0)
}

fn write_prog() {
    let data = store_str("1095");

    print_int(write(data, 4, -1)); // -1
    print_int(write(data, 4, 0)); // -1

    create("writeFile1095.txt");
    let fd = open("writeFile1095.txt");

    print_int(write(0, 0, fd)); // -1
    print_int(write(0, -1, fd)); // -1

    let empty = store_str("");
    print_int(write(empty, -1, fd)); // -1
    print_int(write(empty, 0, fd)); // 0

    print_int(write(data, 4, fd)); // 4

    create("short");
    let fd_s = open("short");
    print_int(write(data, 1, fd_s)); // 1

    create("long");
    let fd_l = open("long");
    // 缓冲远比字符串长, 后面跟的是用户内存里的零
    let big = alloc_buffer(1095);
    print_int(write(big, 1095, fd_l)); // 1095

    create("neg");
    let fd_n = open("neg");
    print_int(write(data, -1, fd_n)); // -1

    close(fd);
    exit(0)
}

fn rw_prog() {
    create("rwFile1095.txt");
    let fd = open("rwFile1095.txt");
    let data = store_str("1095");
    print_int(write(data, 4, fd)); // 4
    close(fd);

    let fd = open("rwFile1095.txt");
    let buf = alloc_buffer(4);
    print_int(read(buf, 4, fd)); // 4

    // 读回的字节与写入的一致
    let written = uaccess::read_user_bytes(data as usize, 4).unwrap();
    let back = uaccess::read_user_bytes(buf as usize, 4).unwrap();
    print_int((written == back) as i32); // 1
    exit(0)
}

const PROGRAMS: &[(&str, fn())] = &[
    ("create", create_prog),
    ("open", open_prog),
    ("close", close_prog),
    ("read", read_prog),
    ("write", write_prog),
    ("rw", rw_prog),
];

pub fn names() -> Vec<&'static str> {
    PROGRAMS.iter().map(|(name, _)| *name).collect()
}

/// 把内置程序装进一个新的用户线程 (可汇合), 返回其 TCB
pub fn spawn(name: &str) -> Option<Arc<Tcb>> {
    let (_, prog) = PROGRAMS.iter().find(|(n, _)| *n == name)?;
    let prog = *prog;

    let tcb = Tcb::new(name, 0, true);
    tcb.set_space(AddressSpace::new(MAX_VIRT_PAGES));
    tcb.fork(move || prog());
    Some(tcb)
}
