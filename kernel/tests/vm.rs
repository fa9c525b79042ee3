//! 虚拟内存翻译流水线的整体测试:
//! TLB 缺失 -> 核心映射 -> 页帧池/换出 -> 映像换入

mod common;

use sos::machine::stats;
use sos::memory::address_space::AddressSpace;
use sos::memory::page_table::api as uaccess;
use sos::memory::{coremap, frame};
use sos::task;
use sos::KernelConfig;
use sys_interface::config::{NUM_PHYS_PAGES, PAGE_SIZE};

fn install_space(num_pages: usize, pattern: impl Fn(usize) -> u8) -> Vec<u8> {
    let image: Vec<u8> = (0..num_pages * PAGE_SIZE).map(pattern).collect();
    let space = AddressSpace::new_with_image(&image, num_pages);
    task::api::current_tcb().set_space(space);
    image
}

#[test]
fn test_demand_paging_reads_image() {
    let _kernel = common::boot(KernelConfig::default());
    let image = install_space(8, |i| (i % 251) as u8);

    let faults_before = stats::num_page_faults();
    let bytes = uaccess::read_user_bytes(PAGE_SIZE, PAGE_SIZE * 2).unwrap();
    assert_eq!(bytes, image[PAGE_SIZE..PAGE_SIZE * 3].to_vec());

    // [PAGE, 3*PAGE) 横跨两个虚页, 每页恰好缺页一次
    assert_eq!(stats::num_page_faults() - faults_before, 2);
    coremap::check_consistency();
}

#[test]
fn test_tlb_hit_does_not_fault_again() {
    let _kernel = common::boot(KernelConfig::default());
    install_space(4, |_| 7);

    assert!(uaccess::read_user_bytes(PAGE_SIZE, 1).is_some());
    let faults = stats::num_page_faults();
    // 同一页再读, TLB 直接命中
    assert!(uaccess::read_user_bytes(PAGE_SIZE + 1, 1).is_some());
    assert_eq!(stats::num_page_faults(), faults);
}

#[test]
fn test_write_read_through_mmu() {
    let _kernel = common::boot(KernelConfig::default());
    install_space(4, |_| 0);

    assert!(uaccess::write_user_bytes(PAGE_SIZE * 2 + 5, b"sos"));
    let bytes = uaccess::read_user_bytes(PAGE_SIZE * 2 + 5, 3).unwrap();
    assert_eq!(&bytes, b"sos");
}

#[test]
fn test_null_and_out_of_range_pointers() {
    let _kernel = common::boot(KernelConfig::default());
    install_space(2, |_| 0);

    assert!(uaccess::read_user_bytes(0, 4).is_none());
    assert!(uaccess::read_user_bytes(2 * PAGE_SIZE, 1).is_none());
    assert!(!uaccess::write_user_bytes(2 * PAGE_SIZE - 1, b"xx"));
}

#[test]
fn test_eviction_reuses_frames_and_keeps_content() {
    let _kernel = common::boot(KernelConfig::default());
    // 虚页比物理页帧多, 必然触发换出
    let num_pages = NUM_PHYS_PAGES + 8;
    let image = install_space(num_pages, |i| (i / PAGE_SIZE) as u8);

    // 逐页触碰一遍, 后段的页会把前段挤出去 (0 号页从偏移 1 读, 避开空指针检查)
    for vpn in 0..num_pages {
        let addr = vpn * PAGE_SIZE + 1;
        let bytes = uaccess::read_user_bytes(addr, 1).unwrap();
        assert_eq!(bytes[0], image[addr]);
    }
    assert_eq!(frame::num_avail(), 0);
    coremap::check_consistency();

    // 被挤出去的早期页重新换入后内容不变
    let bytes = uaccess::read_user_bytes(PAGE_SIZE, 4).unwrap();
    assert_eq!(bytes, image[PAGE_SIZE..PAGE_SIZE + 4].to_vec());
    coremap::check_consistency();
}

#[test]
fn test_eviction_preserves_dirty_pages() {
    let _kernel = common::boot(KernelConfig::default());
    let num_pages = NUM_PHYS_PAGES + 8;
    install_space(num_pages, |_| 0);

    // 写在第 1 页上, 然后触碰所有页把它挤出去
    assert!(uaccess::write_user_bytes(PAGE_SIZE + 9, b"dirty"));
    for vpn in 2..num_pages {
        assert!(uaccess::read_user_bytes(vpn * PAGE_SIZE, 1).is_some());
    }

    // 换出的脏页内容落回映像, 再换入后仍然可见
    let bytes = uaccess::read_user_bytes(PAGE_SIZE + 9, 5).unwrap();
    assert_eq!(&bytes, b"dirty");
}
