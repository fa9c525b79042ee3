//! 虚拟内存翻译流水线: 页表 / TLB / 物理页帧池 / 核心映射 / 地址空间

pub mod address_space;
pub mod coremap;
pub mod frame;
pub mod page_table;
pub mod tlb;
