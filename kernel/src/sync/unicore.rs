use std::cell::{RefCell, RefMut};
use std::ops::{Deref, DerefMut};

use crate::machine::interrupt::{self, IntStatus};

pub struct UPSafeCell<T> {
    /// inner data
    inner: RefCell<T>,
}

// 内核模拟的是单处理器, 切换纪律保证同一时刻只有一个线程在运行,
// 因此我们向编译器保证 UPSafeCell 是 Sync 的
unsafe impl<T> Sync for UPSafeCell<T> {}

impl<T> UPSafeCell<T> {
    /// 使用者需要保证独占访问纪律成立
    pub unsafe fn new(value: T) -> Self {
        Self {
            inner: RefCell::new(value),
        }
    }

    /// 以可变借用形式访问
    /// 借用必须在可能触发上下文切换的调用之前释放
    pub fn exclusive_access(&self) -> RefMut<'_, T> {
        self.inner.borrow_mut()
    }
}

/// 访问期间自动关中断的独占单元, 离开时恢复原中断状态.
/// 适合系统调用路径上的全局单例 (文件系统, 控制台)
pub struct UPIntrFreeCell<T> {
    inner: RefCell<T>,
}

unsafe impl<T> Sync for UPIntrFreeCell<T> {}

pub struct UPIntrRefMut<'a, T> {
    guard: Option<RefMut<'a, T>>,
    old_level: IntStatus,
}

impl<T> UPIntrFreeCell<T> {
    /// # Safety
    /// 使用者需要保证独占访问纪律成立
    pub unsafe fn new(value: T) -> Self {
        Self {
            inner: RefCell::new(value),
        }
    }

    pub fn exclusive_access(&self) -> UPIntrRefMut<'_, T> {
        let old_level = interrupt::set_level(IntStatus::Off);
        UPIntrRefMut {
            guard: Some(self.inner.borrow_mut()),
            old_level,
        }
    }

    pub fn exclusive_session<F, V>(&self, f: F) -> V
    where
        F: FnOnce(&mut T) -> V,
    {
        let mut guard = self.exclusive_access();
        f(guard.deref_mut())
    }
}

impl<T> Drop for UPIntrRefMut<'_, T> {
    fn drop(&mut self) {
        // 先放掉借用再恢复中断
        self.guard.take();
        interrupt::set_level(self.old_level);
    }
}

impl<T> Deref for UPIntrRefMut<'_, T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        self.guard.as_ref().unwrap()
    }
}

impl<T> DerefMut for UPIntrRefMut<'_, T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.guard.as_mut().unwrap()
    }
}
