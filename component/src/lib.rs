//! 本库用于放置与内核无关的可复用组件,
//! 包括位图, 有序链表, 页面/表项置换算法, 以及扇区级文件系统

pub mod collections;
pub mod fs;
pub mod memory;
pub mod replacement;
pub mod util;

pub const KB: usize = 1024;
pub const MB: usize = 1024 * KB;
