//! 模拟机器与内核的配置信息
//!
//! 页大小与扇区大小保持一致, 这样一页正好对应一个扇区的换入换出

/// 物理页大小 (bytes)
pub const PAGE_SIZE: usize = 128;
/// 物理页数目, 物理内存总量 = NUM_PHYS_PAGES * PAGE_SIZE
pub const NUM_PHYS_PAGES: usize = 32;
/// 单个地址空间最多包含的虚页数
pub const MAX_VIRT_PAGES: usize = 64;
/// TLB 表项数目
pub const TLB_SIZE: usize = 4;

/// 磁盘扇区总数
pub const NUM_SECTORS: usize = 1024;

/// 每个线程的打开文件表容量, 下标即用户文件描述符
pub const MAX_OPEN_FILES: usize = 4;
/// 路径中单个分量的最大长度
pub const FILE_NAME_MAX_LEN: usize = 32;
/// 整条路径的最大长度
pub const PATH_MAX_LEN: usize = 255;
/// Create 系统调用不携带大小参数, 新文件统一使用该初始大小
pub const DEFAULT_FILE_SIZE: usize = 1095;

/// 时钟中断间隔 (ticks)
pub const TIMER_TICKS: usize = 100;

/// 线程优先级范围 [0, PRIORITY_MAX]
pub const PRIORITY_MAX: usize = 7;
/// 优先级捐赠沿 desired_lock/desired_join 传播的深度上界, 防止环
pub const MAX_DONATION_DEPTH: usize = 16;

/// 一次最多排队执行的用户程序数目
pub const MAX_USER_PROGRAMS: usize = 5;

/// 模拟执行栈大小 (bytes), 栈底放置 fencepost 魔数
pub const STACK_SIZE: usize = 8 * 1024;
