//! 用户地址空间
//!
//! 可执行映像常驻在内核侧的字节数组里, 按页懒加载进物理内存;
//! 页帧被换出时内容落回映像, 下次缺页再换入, 映像即后备存储.
//! ELF 式装载器不在范围内, 映像由启动方直接给出

use sys_interface::config::{MAX_VIRT_PAGES, PAGE_SIZE};

use super::page_table::{PageTable, PageTableEntry, PteFlags};
use crate::machine::processor;

pub struct AddressSpace {
    num_pages: usize,
    page_table: PageTable,
    image: Vec<u8>,
    /// 参数区分配游标, 0 号页保留不用, 让空指针永远非法
    arg_break: usize,
}

impl AddressSpace {
    pub fn new(num_pages: usize) -> Self {
        assert!(num_pages > 0 && num_pages <= MAX_VIRT_PAGES);
        Self {
            num_pages,
            page_table: PageTable::new(num_pages),
            image: vec![0; num_pages * PAGE_SIZE],
            arg_break: PAGE_SIZE,
        }
    }

    /// 把给定映像放进地址空间开头
    pub fn new_with_image(data: &[u8], num_pages: usize) -> Self {
        let mut space = Self::new(num_pages);
        assert!(data.len() <= space.image.len());
        space.image[..data.len()].copy_from_slice(data);
        space
    }

    pub fn num_pages(&self) -> usize {
        self.num_pages
    }

    pub fn entry(&self, vpn: usize) -> &PageTableEntry {
        self.page_table.entry(vpn)
    }

    /// 在参数区划出 len 字节, 返回用户虚拟地址
    pub fn alloc_buffer(&mut self, len: usize) -> usize {
        let addr = self.arg_break;
        // 4 字节对齐
        self.arg_break += (len + 3) & !3;
        assert!(
            self.arg_break <= self.num_pages * PAGE_SIZE,
            "user argument area exhausted"
        );
        addr
    }

    /// 缺页换入: 把映像里的一页拷进物理页帧并使页表项生效
    pub fn load_page(&mut self, vpn: usize, frame: usize) {
        assert!(vpn < self.num_pages);
        let begin = vpn * PAGE_SIZE;
        processor::write_frame(frame, &self.image[begin..begin + PAGE_SIZE]);

        *self.page_table.entry_mut(vpn) = PageTableEntry {
            virtual_page: vpn,
            physical_page: frame,
            flags: PteFlags::VALID,
        };
    }

    /// 换出: 页帧内容落回映像, 页表项失效
    pub fn evict_page(&mut self, vpn: usize) {
        let entry = self.page_table.entry(vpn);
        assert!(entry.valid());
        let frame = entry.physical_page;

        let page = processor::read_frame(frame);
        let begin = vpn * PAGE_SIZE;
        self.image[begin..begin + PAGE_SIZE].copy_from_slice(&page);

        self.page_table.entry_mut(vpn).flags.remove(PteFlags::VALID);
    }

    /// 把 TLB 表项上累积的 use/dirty 属性抄回页表项
    pub fn sync_page_attributes(&mut self, vpn: usize, tlb_entry: &PageTableEntry) {
        assert_eq!(tlb_entry.virtual_page, vpn);
        let pte = self.page_table.entry_mut(vpn);
        let attrs = tlb_entry.flags & (PteFlags::USE | PteFlags::DIRTY);
        pte.flags.insert(attrs);
    }
}
