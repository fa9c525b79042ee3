//! 线程控制块与线程生命周期
//!
//! Fork -- 分配模拟执行栈, 把线程体挂上宿主线程并入就绪队列
//! Begin -- 新线程首次上 CPU 时回收前任尸体并开中断
//! Yield -- 让出 CPU 给下一个就绪线程
//! Sleep -- 阻塞让出 CPU, 直到被显式放回就绪队列
//! Finish/Join -- 可汇合线程与汇合方的四段握手

pub mod fdtable;
pub mod scheduler;
pub mod switch;

use std::sync::{Arc, Weak};

use logger::debug;
use sys_interface::config::{PRIORITY_MAX, STACK_SIZE};

use crate::machine::processor::{self, NUM_TOTAL_REGS};
use crate::machine::{interrupt, interrupt::IntStatus, stats};
use crate::memory::address_space::AddressSpace;
use crate::memory::coremap;
use crate::sync::condvar::Condition;
use crate::sync::lock::Lock;
use crate::sync::unicore::UPSafeCell;
use fdtable::FdTable;
use switch::SwitchPad;

/// 栈底哨兵, 用于发现栈溢出
const STACK_FENCEPOST: u32 = 0x0ded_beef;

/// CPU 突发预测的指数平均系数
const ALPHA: f64 = 0.5;
const INITIAL_BURST: usize = 10;

/// finishing 切换后沿宿主线程栈展开用的私有哨兵
pub(crate) struct ThreadExit;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    JustCreated,
    Ready,
    Running,
    Blocked,
}

/// 模拟执行栈. 线程逻辑跑在宿主线程上, 这里只保留
/// 栈的记账与栈底哨兵检查
struct ThreadStack {
    data: Box<[u32]>,
}

impl ThreadStack {
    fn allocate() -> Self {
        let mut data = vec![0u32; STACK_SIZE / 4].into_boxed_slice();
        data[0] = STACK_FENCEPOST;
        Self { data }
    }

    fn check(&self) {
        assert_eq!(self.data[0], STACK_FENCEPOST, "thread stack overflow");
    }
}

/// 可汇合线程的握手状态: Finish 和 Join 各自等对方走到位
struct JoinState {
    lock: Arc<Lock>,
    join_wait: Condition,
    finish_wait: Condition,
    delete_wait: Condition,
    flags: UPSafeCell<JoinFlags>,
}

#[derive(Default)]
struct JoinFlags {
    join_called: bool,
    finish_called: bool,
    ready_to_finish: bool,
}

pub struct Tcb {
    name: String,
    pub(crate) pad: SwitchPad,
    join: Option<JoinState>,
    inner: UPSafeCell<TcbInner>,
}

struct TcbInner {
    status: TaskStatus,
    priority: usize,
    donated_priority: usize,
    is_donated: bool,
    fork_called: bool,
    desired_join: Option<Weak<Tcb>>,
    desired_lock: Option<Weak<Lock>>,
    /// 预测的下一次 CPU 突发长度 (user ticks)
    burst_ticks: usize,
    /// 本次上 CPU 时的 user tick
    start_ticks: usize,
    stack: Option<ThreadStack>,
    space: Option<AddressSpace>,
    user_regs: [i32; NUM_TOTAL_REGS],
    fd_table: FdTable,
}

impl Tcb {
    pub fn new(name: &str, priority: usize, joinable: bool) -> Arc<Self> {
        let join = joinable.then(|| JoinState {
            lock: Arc::new(Lock::new("join lock")),
            join_wait: Condition::new("join called cv"),
            finish_wait: Condition::new("finish called cv"),
            delete_wait: Condition::new("permission to delete cv"),
            flags: unsafe { UPSafeCell::new(JoinFlags::default()) },
        });
        Arc::new(Self {
            name: name.to_string(),
            pad: SwitchPad::new(false),
            join,
            inner: unsafe {
                UPSafeCell::new(TcbInner {
                    status: TaskStatus::JustCreated,
                    priority: priority.min(PRIORITY_MAX),
                    donated_priority: 0,
                    is_donated: false,
                    fork_called: false,
                    desired_join: None,
                    desired_lock: None,
                    burst_ticks: INITIAL_BURST,
                    start_ticks: 0,
                    stack: None,
                    space: None,
                    user_regs: [0; NUM_TOTAL_REGS],
                    fd_table: FdTable::default(),
                })
            },
        })
    }

    /// 把正在执行引导流程的宿主线程包装成 main 线程
    pub fn new_bootstrap(name: &str) -> Arc<Self> {
        let tcb = Self::new(name, 0, false);
        tcb.pad.mark_running();
        {
            let mut inner = tcb.inner.exclusive_access();
            inner.status = TaskStatus::Running;
            inner.fork_called = true;
        }
        tcb
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn status(&self) -> TaskStatus {
        self.inner.exclusive_access().status
    }

    pub(crate) fn set_status(&self, status: TaskStatus) {
        self.inner.exclusive_access().status = status;
    }

    pub fn is_joinable(&self) -> bool {
        self.join.is_some()
    }

    pub fn priority(&self) -> usize {
        self.inner.exclusive_access().priority
    }

    pub fn set_priority(&self, priority: usize) {
        self.inner.exclusive_access().priority = priority.min(PRIORITY_MAX);
    }

    /// 有效优先级: 有捐赠时用捐来的, 否则用自己的
    pub fn effective_priority(&self) -> usize {
        assert_eq!(interrupt::get_level(), IntStatus::Off);
        let inner = self.inner.exclusive_access();
        if inner.is_donated {
            inner.donated_priority
        } else {
            inner.priority
        }
    }

    /// 接受一笔捐赠, 级联传播由调度器负责
    pub(crate) fn set_donated(&self, donated_priority: usize) {
        assert_eq!(interrupt::get_level(), IntStatus::Off);
        let mut inner = self.inner.exclusive_access();
        inner.donated_priority = donated_priority;
        inner.is_donated = true;
    }

    /// 清掉收到的捐赠, 返回此前是否有捐赠
    pub fn reset_effective_priority(&self) -> bool {
        assert_eq!(interrupt::get_level(), IntStatus::Off);
        let had_donation = {
            let mut inner = self.inner.exclusive_access();
            let had = inner.is_donated;
            inner.is_donated = false;
            had
        };
        if had_donation {
            scheduler::update_ready_list(self);
        }
        had_donation
    }

    pub(crate) fn set_desired_lock(&self, lock: Weak<Lock>) {
        self.inner.exclusive_access().desired_lock = Some(lock);
    }

    pub(crate) fn reset_desired_lock(&self) {
        self.inner.exclusive_access().desired_lock = None;
    }

    pub(crate) fn desired_lock(&self) -> Option<Arc<Lock>> {
        self.inner
            .exclusive_access()
            .desired_lock
            .as_ref()
            .and_then(|weak| weak.upgrade())
    }

    pub(crate) fn set_desired_join(&self, target: Weak<Tcb>) {
        self.inner.exclusive_access().desired_join = Some(target);
    }

    pub(crate) fn reset_desired_join(&self) {
        self.inner.exclusive_access().desired_join = None;
    }

    pub(crate) fn desired_join(&self) -> Option<Arc<Tcb>> {
        self.inner
            .exclusive_access()
            .desired_join
            .as_ref()
            .and_then(|weak| weak.upgrade())
    }

    pub fn burst_ticks(&self) -> usize {
        self.inner.exclusive_access().burst_ticks
    }

    pub(crate) fn set_start_ticks(&self, start_ticks: usize) {
        self.inner.exclusive_access().start_ticks = start_ticks;
    }

    /// 让出 CPU 时用实际突发长度修正预测值
    pub(crate) fn update_burst(&self) {
        let mut inner = self.inner.exclusive_access();
        let actual = stats::user_ticks().saturating_sub(inner.start_ticks);
        let predicted = ALPHA * actual as f64 + (1.0 - ALPHA) * inner.burst_ticks as f64;
        inner.burst_ticks = predicted as usize;
        debug!(
            "thread {}: actual burst {}, predict next {}",
            self.name, actual, inner.burst_ticks
        );
    }

    pub(crate) fn check_overflow(&self) {
        let inner = self.inner.exclusive_access();
        if let Some(stack) = inner.stack.as_ref() {
            stack.check();
        }
    }

    pub fn set_space(&self, space: AddressSpace) {
        self.inner.exclusive_access().space = Some(space);
    }

    pub fn has_space(&self) -> bool {
        self.inner.exclusive_access().space.is_some()
    }

    pub fn space_pages(&self) -> Option<usize> {
        self.inner
            .exclusive_access()
            .space
            .as_ref()
            .map(|space| space.num_pages())
    }

    pub fn with_space<R>(&self, f: impl FnOnce(&AddressSpace) -> R) -> R {
        let inner = self.inner.exclusive_access();
        f(inner.space.as_ref().expect("thread has no address space"))
    }

    pub fn with_space_mut<R>(&self, f: impl FnOnce(&mut AddressSpace) -> R) -> R {
        let mut inner = self.inner.exclusive_access();
        f(inner.space.as_mut().expect("thread has no address space"))
    }

    /// 上下文切换时保存用户态寄存器
    pub(crate) fn save_user_state(&self) {
        self.inner.exclusive_access().user_regs = processor::save_regs();
    }

    pub(crate) fn restore_user_state(&self) {
        let regs = self.inner.exclusive_access().user_regs;
        processor::load_regs(&regs);
    }

    pub fn add_open_file(&self, file: component::fs::sfs::OpenFile) -> Option<usize> {
        self.inner.exclusive_access().fd_table.add(file)
    }

    pub fn remove_open_file(&self, fd: i32) -> bool {
        self.inner.exclusive_access().fd_table.remove(fd)
    }

    pub fn with_open_file<R>(
        &self,
        fd: i32,
        f: impl FnOnce(&component::fs::sfs::OpenFile) -> R,
    ) -> Option<R> {
        let inner = self.inner.exclusive_access();
        inner.fd_table.get(fd).map(f)
    }

    pub(crate) fn fork_called(&self) -> bool {
        self.inner.exclusive_access().fork_called
    }

    /// 并发执行线程体: 备好模拟栈与宿主线程, 入就绪队列.
    /// 抢占式调度下 fork 之后立即让出一次
    pub fn fork(self: &Arc<Self>, func: impl FnOnce() + Send + 'static) {
        debug!("forking thread {}", self.name);
        {
            self.inner.exclusive_access().stack = Some(ThreadStack::allocate());
        }

        let tcb = self.clone();
        std::thread::Builder::new()
            .name(self.name.clone())
            .spawn(move || {
                tcb.pad.wait_until_running();
                thread_root(tcb, func);
            })
            .expect("cannot spawn host thread");

        let old_level = interrupt::set_level(IntStatus::Off);
        scheduler::ready_to_run(self.clone());
        self.inner.exclusive_access().fork_called = true;
        interrupt::set_level(old_level);

        if scheduler::is_preemptive() {
            api::yield_now();
        }
    }

    /// 等待可汇合线程结束. 抢占式调度下沿 desired_join 边
    /// 持续把有效优先级捐给被等待的线程
    pub fn join(self: &Arc<Self>) {
        let current = api::current_tcb();
        assert!(!Arc::ptr_eq(self, &current), "thread joins itself");
        assert!(self.fork_called(), "join before fork");
        let join = self.join.as_ref().expect("join on non-joinable thread");
        {
            let flags = join.flags.exclusive_access();
            assert!(!flags.join_called, "join called twice");
        }

        let old_level = interrupt::set_level(IntStatus::Off);
        debug!("joining thread {}", self.name);

        join.lock.acquire();
        join.flags.exclusive_access().join_called = true;

        while !join.flags.exclusive_access().finish_called {
            if scheduler::is_preemptive() {
                let saved = interrupt::set_level(IntStatus::Off);
                current.set_desired_join(Arc::downgrade(self));
                scheduler::donate_priority(&current, self);
                interrupt::set_level(saved);
            }
            join.finish_wait.wait(&join.lock);
        }

        current.reset_desired_join();
        join.join_wait.signal(&join.lock);

        join.flags.exclusive_access().ready_to_finish = true;
        join.delete_wait.signal(&join.lock);

        join.lock.release();
        interrupt::set_level(old_level);
    }
}

/// 新线程首次上 CPU: 回收前任尸体, 开中断, 执行线程体, 最后收尾
fn thread_root(tcb: Arc<Tcb>, func: impl FnOnce()) {
    begin(&tcb);
    func();
    api::finish_current();
}

fn begin(tcb: &Arc<Tcb>) {
    debug!("beginning thread {}", tcb.name());
    scheduler::check_to_be_destroyed();
    interrupt::enable();
}

/// 公有接口
pub mod api {
    use super::*;

    pub fn current_tcb() -> Arc<Tcb> {
        scheduler::current_tcb()
    }

    /// 让出 CPU 给下一个就绪线程, 没有就立即返回
    pub fn yield_now() {
        let old_level = interrupt::set_level(IntStatus::Off);
        let current = current_tcb();
        debug!("yielding thread {}", current.name());

        if let Some(next) = scheduler::find_next_to_run() {
            if !Arc::ptr_eq(&next, &current) {
                current.update_burst();
                scheduler::ready_to_run(current.clone());
                scheduler::run(next, false);
            }
        }
        interrupt::set_level(old_level);
    }

    /// 阻塞让出 CPU. 没有就绪线程时空转等中断制造出一个.
    /// 假定调用方已关中断; 返回时中断仍处于关闭状态
    pub fn sleep_current(finishing: bool) {
        assert_eq!(interrupt::get_level(), IntStatus::Off);
        let current = current_tcb();
        debug!("sleeping thread {}", current.name());

        current.update_burst();
        current.set_status(TaskStatus::Blocked);

        let next = loop {
            match scheduler::find_next_to_run() {
                Some(next) => break next,
                None => interrupt::idle(),
            }
        };
        scheduler::run(next, finishing);
    }

    /// 结束当前线程. 可汇合线程要先与 Join 方完成握手;
    /// TCB 本体留给下一个线程回收, 宿主线程沿栈展开退出
    pub fn finish_current() -> ! {
        interrupt::set_level(IntStatus::Off);
        let current = current_tcb();
        debug!("finishing thread {}", current.name());

        if let Some(join) = current.join.as_ref() {
            join.lock.acquire();
            join.flags.exclusive_access().finish_called = true;

            while !join.flags.exclusive_access().join_called {
                join.join_wait.wait(&join.lock);
                interrupt::set_level(IntStatus::Off);
            }
            join.finish_wait.signal(&join.lock);

            if scheduler::is_preemptive() {
                // 汇合方必须先离开 Join, 再允许本线程带着低优先级收尾
                current.set_priority(0);
                current.reset_effective_priority();
            }

            while !join.flags.exclusive_access().ready_to_finish {
                join.delete_wait.wait(&join.lock);
                interrupt::set_level(IntStatus::Off);
            }
            join.lock.release();
            interrupt::set_level(IntStatus::Off);
            debug!("wholly finishing thread after join: {}", current.name());
        }

        // 归还占用的资源, 尸体交给接班线程
        coremap::release_frames_of(&current);
        {
            let mut inner = current.inner.exclusive_access();
            inner.fd_table.clear();
            inner.space = None;
        }

        sleep_current(true);
        // 此后本宿主线程不得再执行任何线程体代码
        std::panic::resume_unwind(Box::new(ThreadExit));
    }
}
