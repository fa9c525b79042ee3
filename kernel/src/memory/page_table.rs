//! 页表与用户内存访问
//!
//! 页表按地址空间私有, 翻译只走 TLB; 缺失时由核心映射把
//! 页表项灌进 TLB. 用户内存的逐字节拷贝走 read_mem/write_mem,
//! 缺页异常处理完后原地重试

use bitflags::bitflags;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct PteFlags: u8 {
        const VALID = 1 << 0;
        const READONLY = 1 << 1;
        /// 最近被访问过
        const USE = 1 << 2;
        /// 最近被写过
        const DIRTY = 1 << 3;
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PageTableEntry {
    pub virtual_page: usize,
    pub physical_page: usize,
    pub flags: PteFlags,
}

impl PageTableEntry {
    pub fn empty(virtual_page: usize) -> Self {
        Self {
            virtual_page,
            physical_page: 0,
            flags: PteFlags::empty(),
        }
    }

    pub fn valid(&self) -> bool {
        self.flags.contains(PteFlags::VALID)
    }

    pub fn readonly(&self) -> bool {
        self.flags.contains(PteFlags::READONLY)
    }

    pub fn dirty(&self) -> bool {
        self.flags.contains(PteFlags::DIRTY)
    }

    pub fn mark_use(&mut self, writing: bool) {
        self.flags.insert(PteFlags::USE);
        if writing {
            self.flags.insert(PteFlags::DIRTY);
        }
    }
}

pub struct PageTable {
    entries: Vec<PageTableEntry>,
}

impl PageTable {
    pub fn new(num_pages: usize) -> Self {
        Self {
            entries: (0..num_pages).map(PageTableEntry::empty).collect(),
        }
    }

    pub fn num_pages(&self) -> usize {
        self.entries.len()
    }

    pub fn entry(&self, vpn: usize) -> &PageTableEntry {
        &self.entries[vpn]
    }

    pub fn entry_mut(&mut self, vpn: usize) -> &mut PageTableEntry {
        &mut self.entries[vpn]
    }
}

/// 用户内存访问辅助
pub mod api {
    use sys_interface::config::PAGE_SIZE;

    use crate::machine::processor;
    use crate::task;

    /// 当前线程地址空间之内才算可读写
    fn user_range_ok(addr: usize, len: usize) -> bool {
        if addr == 0 || len == 0 {
            return false;
        }
        let num_pages = match task::api::current_tcb().space_pages() {
            Some(n) => n,
            None => return false,
        };
        (addr + len - 1) / PAGE_SIZE < num_pages
    }

    /// 逐字节从用户空间拷入字符串, 至多 limit 字节, NUL 截止.
    /// 指针非法返回 None
    pub fn read_user_str(addr: usize, limit: usize) -> Option<String> {
        if addr == 0 {
            return None;
        }
        let mut bytes = Vec::new();
        for i in 0..limit {
            if !user_range_ok(addr + i, 1) {
                return None;
            }
            let ch = loop {
                // 缺页处理完重试
                if let Some(value) = processor::read_mem(addr + i, 1) {
                    break value as u8;
                }
            };
            if ch == 0 {
                break;
            }
            bytes.push(ch);
        }
        String::from_utf8(bytes).ok()
    }

    pub fn read_user_bytes(addr: usize, len: usize) -> Option<Vec<u8>> {
        if len == 0 {
            return Some(Vec::new());
        }
        if !user_range_ok(addr, len) {
            return None;
        }
        let mut bytes = Vec::with_capacity(len);
        for i in 0..len {
            let value = loop {
                if let Some(value) = processor::read_mem(addr + i, 1) {
                    break value;
                }
            };
            bytes.push(value as u8);
        }
        Some(bytes)
    }

    pub fn write_user_bytes(addr: usize, bytes: &[u8]) -> bool {
        if bytes.is_empty() {
            return true;
        }
        if !user_range_ok(addr, bytes.len()) {
            return false;
        }
        for (i, &byte) in bytes.iter().enumerate() {
            loop {
                if processor::write_mem(addr + i, 1, byte as i32) {
                    break;
                }
            }
        }
        true
    }
}
