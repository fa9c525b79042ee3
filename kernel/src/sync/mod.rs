//! 同步原语: 信号量 / 锁 / 条件变量 / 信箱
//!
//! 单处理器上不需要硬件原子指令, 原子性全部来自关掉模拟中断:
//! 关中断期间不可能发生上下文切换, 当前线程独占 CPU 直到重新开中断.
//! 这些原语可能在中断已关的情况下被调用, 所以退出临界区时
//! 一律恢复进入时保存的中断状态而不是无条件开中断

pub mod condvar;
pub mod lock;
pub mod mailbox;
pub mod semaphore;
pub mod unicore;

pub use condvar::Condition;
pub use lock::Lock;
pub use mailbox::Mailbox;
pub use semaphore::Semaphore;
pub use unicore::{UPIntrFreeCell, UPSafeCell};
