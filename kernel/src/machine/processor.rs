//! 模拟 CPU 的寄存器堆, 物理内存与软件 TLB
//!
//! 指令解释器不在范围内: 内核态代码替用户程序读写寄存器,
//! 经由 TLB 翻译访问用户内存, 翻译失败时像硬件一样拉起异常.
//! 访存失败的调用方在异常处理返回后重试

use logger::trace;
use sys_interface::config::{NUM_PHYS_PAGES, PAGE_SIZE, TLB_SIZE};

use super::stats;
use crate::memory::page_table::PageTableEntry;
use crate::memory::tlb::TlbManager;
use crate::sync::unicore::UPSafeCell;
use crate::trap;

pub const NUM_GP_REGS: usize = 32;
/// 栈指针
pub const STACK_REG: usize = 29;
/// 上一条指令地址
pub const PREV_PC_REG: usize = 36;
/// 当前指令地址
pub const PC_REG: usize = 34;
/// 下一条指令地址
pub const NEXT_PC_REG: usize = 35;
/// 访存异常时闩住出错的虚拟地址
pub const BAD_VADDR_REG: usize = 39;
pub const NUM_TOTAL_REGS: usize = 40;

/// 指令宽度, 系统调用返回时 PC 前进一个字
pub const INSTRUCTION_SIZE: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExceptionKind {
    /// 用户程序主动陷入
    Syscall,
    /// TLB 里没有有效翻译
    PageFault,
    /// 对只读页写入
    ReadOnly,
    /// 物理地址越界
    BusError,
    /// 虚拟地址非法或未对齐
    AddressError,
}

struct Processor {
    regs: [i32; NUM_TOTAL_REGS],
    memory: Vec<u8>,
    tlb: TlbManager,
}

lazy_static! {
    static ref PROCESSOR: UPSafeCell<Processor> = unsafe {
        UPSafeCell::new(Processor {
            regs: [0; NUM_TOTAL_REGS],
            memory: vec![0; NUM_PHYS_PAGES * PAGE_SIZE],
            tlb: TlbManager::new(TLB_SIZE),
        })
    };
}

pub fn reset() {
    let mut cpu = PROCESSOR.exclusive_access();
    cpu.regs = [0; NUM_TOTAL_REGS];
    cpu.regs[NEXT_PC_REG] = INSTRUCTION_SIZE as i32;
    cpu.memory.fill(0);
    cpu.tlb = TlbManager::new(TLB_SIZE);
}

pub fn read_register(which: usize) -> i32 {
    assert!(which < NUM_TOTAL_REGS);
    PROCESSOR.exclusive_access().regs[which]
}

pub fn write_register(which: usize, value: i32) {
    assert!(which < NUM_TOTAL_REGS);
    PROCESSOR.exclusive_access().regs[which] = value;
}

/// 系统调用返回前推进 PC 一个字, 否则用户程序会在原地重复陷入
pub fn advance_pc() {
    let mut cpu = PROCESSOR.exclusive_access();
    cpu.regs[PREV_PC_REG] = cpu.regs[PC_REG];
    cpu.regs[PC_REG] = cpu.regs[NEXT_PC_REG];
    cpu.regs[NEXT_PC_REG] = cpu.regs[PC_REG] + INSTRUCTION_SIZE as i32;
}

/// 读用户虚拟地址. 翻译失败时拉起异常并返回 None, 调用方重试
pub fn read_mem(addr: usize, size: usize) -> Option<i32> {
    debug_assert!(matches!(size, 1 | 2 | 4));
    let outcome = {
        let mut cpu = PROCESSOR.exclusive_access();
        cpu.translate(addr, size, false).map(|phys_addr| {
            let bytes = &cpu.memory[phys_addr..phys_addr + size];
            match size {
                1 => bytes[0] as i32,
                2 => u16::from_le_bytes(bytes.try_into().unwrap()) as i32,
                _ => i32::from_le_bytes(bytes.try_into().unwrap()),
            }
        })
    };
    match outcome {
        Ok(value) => Some(value),
        Err(kind) => {
            raise_exception(kind, addr);
            None
        }
    }
}

/// 写用户虚拟地址. 翻译失败时拉起异常并返回 false, 调用方重试
pub fn write_mem(addr: usize, size: usize, value: i32) -> bool {
    debug_assert!(matches!(size, 1 | 2 | 4));
    let outcome = {
        let mut cpu = PROCESSOR.exclusive_access();
        cpu.translate(addr, size, true).map(|phys_addr| {
            match size {
                1 => cpu.memory[phys_addr] = value as u8,
                2 => cpu.memory[phys_addr..phys_addr + 2]
                    .copy_from_slice(&(value as u16).to_le_bytes()),
                _ => cpu.memory[phys_addr..phys_addr + 4].copy_from_slice(&value.to_le_bytes()),
            };
        })
    };
    match outcome {
        Ok(()) => true,
        Err(kind) => {
            raise_exception(kind, addr);
            false
        }
    }
}

/// 像硬件一样拉起异常: 闩住出错地址, 进入异常处理入口
pub fn raise_exception(kind: ExceptionKind, bad_vaddr: usize) {
    trace!("exception {:?} at vaddr {:#x}", kind, bad_vaddr);
    write_register(BAD_VADDR_REG, bad_vaddr as i32);
    trap::exception_handler(kind);
}

impl Processor {
    /// 纯 TLB 翻译: 页表只在缺失处理时被核心映射查询
    fn translate(&mut self, addr: usize, size: usize, writing: bool) -> Result<usize, ExceptionKind> {
        if addr % size != 0 {
            return Err(ExceptionKind::AddressError);
        }
        let vpn = addr / PAGE_SIZE;
        let offset = addr % PAGE_SIZE;

        let now = stats::total_ticks();
        let entry = match self.tlb.fetch(vpn, now) {
            Some(entry) => entry,
            None => return Err(ExceptionKind::PageFault),
        };
        if writing && entry.readonly() {
            return Err(ExceptionKind::ReadOnly);
        }
        entry.mark_use(writing);

        let phys_addr = entry.physical_page * PAGE_SIZE + offset;
        if phys_addr + size > self.memory.len() {
            return Err(ExceptionKind::BusError);
        }
        Ok(phys_addr)
    }
}

/// 把一整页内容搬进物理页帧, 供地址空间换入使用
pub fn write_frame(frame: usize, page: &[u8]) {
    assert_eq!(page.len(), PAGE_SIZE);
    let mut cpu = PROCESSOR.exclusive_access();
    let begin = frame * PAGE_SIZE;
    cpu.memory[begin..begin + PAGE_SIZE].copy_from_slice(page);
}

/// 读出一整页物理页帧内容, 供换出落回映像使用
pub fn read_frame(frame: usize) -> Vec<u8> {
    let cpu = PROCESSOR.exclusive_access();
    let begin = frame * PAGE_SIZE;
    cpu.memory[begin..begin + PAGE_SIZE].to_vec()
}

pub fn tlb_cache(entry: PageTableEntry) {
    let now = stats::total_ticks();
    PROCESSOR.exclusive_access().tlb.cache(entry, now);
}

/// 上下文切换时清空 TLB
pub fn tlb_clean() {
    PROCESSOR.exclusive_access().tlb.clean();
}

/// 把 vpn 的 TLB 表项摘下来 (若在), 返回其属性快照
pub fn tlb_take(vpn: usize) -> Option<PageTableEntry> {
    PROCESSOR.exclusive_access().tlb.take(vpn)
}

pub fn save_regs() -> [i32; NUM_TOTAL_REGS] {
    PROCESSOR.exclusive_access().regs
}

pub fn load_regs(regs: &[i32; NUM_TOTAL_REGS]) {
    PROCESSOR.exclusive_access().regs = *regs;
}
