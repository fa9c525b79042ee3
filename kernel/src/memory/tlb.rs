//! TLB 管理器: 容量很小的全相联翻译缓存
//!
//! 槽位满时由置换算法挑牺牲者; 上下文切换时整体失效,
//! 因为表项不带地址空间标识

use component::replacement::{ReplacementLru, ReplacementStrategy};
use logger::debug;

use super::page_table::PageTableEntry;

pub struct TlbManager {
    entries: Vec<PageTableEntry>,
    strategy: Box<dyn ReplacementStrategy>,
}

impl TlbManager {
    pub fn new(size: usize) -> Self {
        assert!(size > 0);
        Self {
            entries: (0..size).map(PageTableEntry::empty).collect(),
            strategy: Box::new(ReplacementLru::new(size)),
        }
    }

    /// 线性扫描有效表项; 命中同时向置换算法汇报
    pub fn fetch(&mut self, vpn: usize, now: usize) -> Option<&mut PageTableEntry> {
        let slot = self
            .entries
            .iter()
            .position(|entry| entry.valid() && entry.virtual_page == vpn)?;
        self.strategy.update_element_weight(slot, now);
        Some(&mut self.entries[slot])
    }

    /// 优先用无效槽位缓存新表项, 没有就请置换算法挑一个
    pub fn cache(&mut self, mut entry: PageTableEntry, now: usize) {
        let slot = self
            .entries
            .iter()
            .position(|candidate| !candidate.valid())
            .unwrap_or_else(|| self.strategy.find_one_to_replace());

        entry.flags.insert(super::page_table::PteFlags::VALID);
        debug!("tlb[{}] caches vpn {}", slot, entry.virtual_page);
        self.entries[slot] = entry;
        self.strategy.update_element_weight(slot, now);
    }

    /// 上下文切换时全部失效并复位置换状态
    pub fn clean(&mut self) {
        self.strategy.reset_status();
        for (vpn, entry) in self.entries.iter_mut().enumerate() {
            *entry = PageTableEntry::empty(vpn);
        }
    }

    /// 摘下 vpn 的表项并返回快照, 供换出路径同步属性
    pub fn take(&mut self, vpn: usize) -> Option<PageTableEntry> {
        let slot = self
            .entries
            .iter()
            .position(|entry| entry.valid() && entry.virtual_page == vpn)?;
        let snapshot = self.entries[slot];
        self.entries[slot] = PageTableEntry::empty(slot);
        Some(snapshot)
    }
}
