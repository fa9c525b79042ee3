//! 文件类系统调用
//!
//! 用户可见的失败一律折算成 -1: 非法指针 (地址 0), 空文件名,
//! 文件系统层错误, 以及打开文件表占满.
//! 读过文件尾不是错误, 返回值就是实际读到的字节数

use logger::debug;
use sys_interface::config::{DEFAULT_FILE_SIZE, PATH_MAX_LEN};

use crate::fs;
use crate::memory::page_table::api as uaccess;
use crate::task;

/// 用户传来的名字不带斜杠时视作根目录下的文件
fn build_abs_path(path: String) -> String {
    if path.starts_with('/') {
        path
    } else {
        format!("/{}", path)
    }
}

pub fn sys_create(path_addr: i32) -> i32 {
    if path_addr <= 0 {
        debug!("create: illegal path pointer {:#x}", path_addr);
        return -1;
    }
    let path = match uaccess::read_user_str(path_addr as usize, PATH_MAX_LEN) {
        Some(path) if !path.is_empty() => build_abs_path(path),
        _ => return -1,
    };

    match fs::create(&path, DEFAULT_FILE_SIZE, false) {
        Ok(()) => {
            debug!("create '{}' succeeded", path);
            0
        }
        Err(err) => {
            debug!("create '{}' failed: {}", path, err);
            -1
        }
    }
}

pub fn sys_open(path_addr: i32) -> i32 {
    if path_addr <= 0 {
        debug!("open: illegal path pointer {:#x}", path_addr);
        return -1;
    }
    let path = match uaccess::read_user_str(path_addr as usize, PATH_MAX_LEN) {
        Some(path) if !path.is_empty() => build_abs_path(path),
        _ => return -1,
    };

    let file = match fs::open(&path) {
        Ok(file) => file,
        Err(err) => {
            debug!("open '{}' failed: {}", path, err);
            return -1;
        }
    };

    // 表满时把文件系统侧的 OpenFile 还回去
    match task::api::current_tcb().add_open_file(file) {
        Some(fd) => {
            debug!("open '{}' with fd {}", path, fd);
            fd as i32
        }
        None => {
            debug!("open '{}': no room in open file table", path);
            -1
        }
    }
}

pub fn sys_read(buf_addr: i32, size: i32, fd: i32) -> i32 {
    if size <= 0 {
        return -1;
    }
    if buf_addr <= 0 {
        return -1;
    }
    let current = task::api::current_tcb();

    let mut data = vec![0u8; size as usize];
    let num_read = match current.with_open_file(fd, |file| file.read(&mut data)) {
        Some(n) => n,
        None => return -1,
    };
    data.truncate(num_read);

    if !uaccess::write_user_bytes(buf_addr as usize, &data) {
        return -1;
    }
    num_read as i32
}

pub fn sys_write(buf_addr: i32, size: i32, fd: i32) -> i32 {
    let current = task::api::current_tcb();
    if current.with_open_file(fd, |_| ()).is_none() {
        return -1;
    }
    if buf_addr <= 0 {
        return -1;
    }
    if size < 0 {
        return -1;
    }
    if size == 0 {
        return 0;
    }

    let data = match uaccess::read_user_bytes(buf_addr as usize, size as usize) {
        Some(data) => data,
        None => return -1,
    };
    let num_written = current
        .with_open_file(fd, |file| file.write(&data))
        .expect("fd checked above");
    num_written as i32
}

pub fn sys_close(fd: i32) -> i32 {
    if task::api::current_tcb().remove_open_file(fd) {
        0
    } else {
        -1
    }
}
