//! 文件系统的内核侧封装
//!
//! 全局唯一的 FileSystem 实例跑在注册好的扇区设备上.
//! 系统调用期间不抢占, 访问单例时顺带关中断即可保证互斥

use component::fs::block_device;
use component::fs::sfs::{FileSystem, FsError, FsResult, OpenFile};
use logger::info;
use sys_interface::config::NUM_SECTORS;

use crate::sync::unicore::UPIntrFreeCell;

lazy_static! {
    static ref FILE_SYSTEM: UPIntrFreeCell<Option<FileSystem>> =
        unsafe { UPIntrFreeCell::new(None) };
}

/// 在已注册的设备上装起文件系统
pub fn init(format: bool) {
    *FILE_SYSTEM.exclusive_access() = Some(FileSystem::new(format, NUM_SECTORS));
}

fn with_fs<R>(f: impl FnOnce(&FileSystem) -> R) -> R {
    let fs = FILE_SYSTEM.exclusive_access();
    f(fs.as_ref().expect("file system is not initialized"))
}

pub fn create(path: &str, initial_size: usize, is_dir: bool) -> FsResult<()> {
    with_fs(|fs| fs.create(path, initial_size, is_dir))
}

pub fn open(path: &str) -> FsResult<OpenFile> {
    with_fs(|fs| fs.open(path))
}

pub fn remove(path: &str) -> FsResult<()> {
    with_fs(|fs| fs.remove(path))
}

pub fn list(path: &str) -> FsResult<()> {
    with_fs(|fs| fs.list(path))
}

pub fn print() {
    with_fs(|fs| fs.print())
}

pub fn print_file(path: &str) -> FsResult<()> {
    with_fs(|fs| fs.print_file(path))
}

/// 从宿主文件系统导入一个文件
pub fn put(local_path: &str, path: &str) -> FsResult<()> {
    let data = std::fs::read(local_path).map_err(|_| FsError::NotFound)?;
    info!("importing {} ({} bytes) as {}", local_path, data.len(), path);
    with_fs(|fs| {
        fs.create(path, data.len(), false)?;
        let file = fs.open(path)?;
        let written = file.write_at(&data, 0);
        assert_eq!(written, data.len());
        Ok(())
    })
}

/// 把块缓存里的脏扇区全部落盘
pub fn flush() {
    block_device::flush();
}
