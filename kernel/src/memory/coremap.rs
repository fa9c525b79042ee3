//! 核心映射: 从物理页帧反查 (所属线程地址空间, 虚页号)
//!
//! 缺页的主路径: 查核心映射 → 必要时取/腾页帧并换入 → 灌 TLB.
//! 不变式: coremap[f] = (vpn, space) 蕴含 space 页表中 vpn 的表项
//! physical_page == f 且 valid

use std::sync::{Arc, Weak};

use component::replacement::{ReplacementFifo, ReplacementStrategy};
use logger::debug;
use sys_interface::config::NUM_PHYS_PAGES;

use super::frame;
use crate::machine::{processor, stats};
use crate::sync::unicore::UPSafeCell;
use crate::task::{self, Tcb};

struct CoreMapEntry {
    vpn: usize,
    owner: Weak<Tcb>,
}

struct CoreMap {
    entries: Vec<Option<CoreMapEntry>>,
    strategy: Box<dyn ReplacementStrategy>,
}

lazy_static! {
    static ref COREMAP: UPSafeCell<CoreMap> = unsafe {
        UPSafeCell::new(CoreMap {
            entries: (0..NUM_PHYS_PAGES).map(|_| None).collect(),
            strategy: Box::new(ReplacementFifo::new(NUM_PHYS_PAGES)),
        })
    };
}

pub fn reset() {
    let mut coremap = COREMAP.exclusive_access();
    coremap.entries = (0..NUM_PHYS_PAGES).map(|_| None).collect();
    coremap.strategy = Box::new(ReplacementFifo::new(NUM_PHYS_PAGES));
}

/// 把当前线程 vpn 的翻译灌进 TLB.
/// 该页不在内存时先找一个页帧 (必要时换出别人) 并从映像换入
pub fn push_entry_to_tlb(vpn: usize) {
    let current = task::api::current_tcb();

    let resident_frame = {
        let coremap = COREMAP.exclusive_access();
        coremap.entries.iter().position(|slot| {
            slot.as_ref()
                .map(|entry| {
                    entry.vpn == vpn
                        && entry.owner.upgrade().is_some_and(|o| Arc::ptr_eq(&o, &current))
                })
                .unwrap_or(false)
        })
    };

    let entry = match resident_frame {
        Some(frame) => {
            COREMAP
                .exclusive_access()
                .strategy
                .update_element_weight(frame, stats::total_ticks());
            current.with_space(|space| *space.entry(vpn))
        }
        None => {
            let frame = match frame::acquire() {
                Some(frame) => frame,
                None => evict_one_frame(&current),
            };
            debug!("loading vpn {} into frame {}", vpn, frame);
            current.with_space_mut(|space| space.load_page(vpn, frame));
            {
                let mut coremap = COREMAP.exclusive_access();
                coremap.entries[frame] = Some(CoreMapEntry {
                    vpn,
                    owner: Arc::downgrade(&current),
                });
                coremap.strategy.update_element_weight(frame, stats::total_ticks());
            }
            stats::add_page_fault();
            current.with_space(|space| *space.entry(vpn))
        }
    };

    processor::tlb_cache(entry);
}

/// 页帧耗尽时的换出路径: 置换算法在核心映射上挑牺牲页帧,
/// 把它在 TLB 里残留的属性同步回属主页表, 内容落回映像, 页帧复用
fn evict_one_frame(current: &Arc<Tcb>) -> usize {
    let victim = COREMAP.exclusive_access().strategy.find_one_to_replace();
    let evicted = COREMAP.exclusive_access().entries[victim].take();

    if let Some(entry) = evicted {
        if let Some(owner) = entry.owner.upgrade() {
            debug!("evicting vpn {} of {} from frame {}", entry.vpn, owner.name(), victim);
            // TLB 只缓存当前线程的翻译
            if Arc::ptr_eq(&owner, current) {
                if let Some(tlb_entry) = processor::tlb_take(entry.vpn) {
                    owner.with_space_mut(|space| space.sync_page_attributes(entry.vpn, &tlb_entry));
                }
            }
            owner.with_space_mut(|space| space.evict_page(entry.vpn));
        }
    }
    victim
}

/// 线程退出时归还它占用的所有页帧
pub fn release_frames_of(tcb: &Arc<Tcb>) {
    let frames: Vec<usize> = {
        let mut coremap = COREMAP.exclusive_access();
        let mut frames = Vec::new();
        for (frame, slot) in coremap.entries.iter_mut().enumerate() {
            let owned = slot
                .as_ref()
                .map(|entry| entry.owner.upgrade().is_some_and(|o| Arc::ptr_eq(&o, tcb)))
                .unwrap_or(false);
            if owned {
                *slot = None;
                frames.push(frame);
            }
        }
        frames
    };
    for frame in frames {
        frame::release(frame);
    }
}

/// 自检: 核心映射与属主页表必须一致
pub fn check_consistency() {
    let coremap = COREMAP.exclusive_access();
    for (frame, slot) in coremap.entries.iter().enumerate() {
        if let Some(entry) = slot {
            if let Some(owner) = entry.owner.upgrade() {
                owner.with_space(|space| {
                    let pte = space.entry(entry.vpn);
                    assert!(pte.valid(), "coremap frame {} maps invalid pte", frame);
                    assert_eq!(pte.physical_page, frame);
                });
            }
        }
    }
}
