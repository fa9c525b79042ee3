//! 优先级捐赠的端到端测试 (抢占式 Priority 调度)

mod common;

use std::sync::Arc;

use sos::machine::interrupt::{self, IntStatus};
use sos::sync::{Lock, Semaphore};
use sos::task::scheduler::SchedulerKind;
use sos::task::Tcb;
use sos::KernelConfig;

type Trace = Arc<spin::Mutex<Vec<String>>>;

fn effective_priority_of(tcb: &Arc<Tcb>) -> usize {
    let old_level = interrupt::set_level(IntStatus::Off);
    let priority = tcb.effective_priority();
    interrupt::set_level(old_level);
    priority
}

/// 低优先级 A 持锁, 高优先级 B 求锁:
/// A 的有效优先级被抬到 B 的水平, 直到 A 释放才回落, 随后 B 立刻拿锁
#[test]
fn test_lock_priority_donation() {
    let _kernel = common::boot(KernelConfig {
        scheduler: SchedulerKind::Priority,
        preemptive: true,
        ..KernelConfig::default()
    });

    let trace: Trace = Arc::new(spin::Mutex::new(Vec::new()));
    let lock = Arc::new(Lock::new("contended lock"));
    let gate = Arc::new(Semaphore::new("gate", 0));

    // 低优先级持有者
    let holder = Tcb::new("holder", 1, true);
    {
        let lock = lock.clone();
        let gate = gate.clone();
        let trace = trace.clone();
        holder.fork(move || {
            lock.acquire();
            trace.lock().push("holder acquired".to_string());
            // 停在这里, 等主线程放行后再释放
            gate.p();
            trace.lock().push("holder releasing".to_string());
            lock.release();
            trace.lock().push("holder after release".to_string());
        });
    }

    // 高优先级竞争者
    let contender = Tcb::new("contender", 6, true);
    {
        let lock = lock.clone();
        let trace = trace.clone();
        contender.fork(move || {
            trace.lock().push("contender wants lock".to_string());
            lock.acquire();
            trace.lock().push("contender acquired".to_string());
            lock.release();
        });
    }

    // holder 抢过 main(0) 先跑并拿到锁, contender 抢过两者后阻塞在锁上;
    // 此刻捐赠应已把 holder 抬到 contender 的水平
    assert_eq!(effective_priority_of(&holder), 6);
    assert_eq!(effective_priority_of(&contender), 6);

    // 放行 holder
    gate.v();
    sos::task::api::yield_now();

    holder.join();
    contender.join();
    // 让两个孩子跑完收尾握手
    sos::task::api::yield_now();

    // 释放后捐赠已被清掉, Finish 阶段又把自带优先级降为 0
    assert_eq!(effective_priority_of(&holder), 0);

    let trace = trace.lock();
    let expected_prefix = vec![
        "holder acquired".to_string(),
        "contender wants lock".to_string(),
    ];
    assert_eq!(&trace[..2], &expected_prefix[..]);

    // 释放动作之后, 高优先级的 contender 先于 holder 的后续代码拿到 CPU
    let releasing = trace.iter().position(|s| s == "holder releasing").unwrap();
    let contender_got = trace.iter().position(|s| s == "contender acquired").unwrap();
    let holder_after = trace
        .iter()
        .position(|s| s == "holder after release")
        .unwrap();
    assert!(releasing < contender_got);
    assert!(contender_got < holder_after);
}

/// Join 也沿 desired_join 边捐优先级
#[test]
fn test_join_priority_donation() {
    let _kernel = common::boot(KernelConfig {
        scheduler: SchedulerKind::Priority,
        preemptive: true,
        ..KernelConfig::default()
    });

    let gate = Arc::new(Semaphore::new("gate", 0));

    let worker = Tcb::new("worker", 1, true);
    {
        let gate = gate.clone();
        worker.fork(move || {
            gate.p();
        });
    }

    // 高优先级 joiner 等 worker 结束, 捐赠沿 desired_join 抬高 worker
    let joiner = Tcb::new("joiner", 5, true);
    {
        let worker = worker.clone();
        joiner.fork(move || {
            worker.join();
        });
    }

    // joiner 已在 Join 里等待
    let old_level = interrupt::set_level(IntStatus::Off);
    let boosted = worker.effective_priority();
    interrupt::set_level(old_level);
    assert_eq!(boosted, 5);

    gate.v();
    sos::task::api::yield_now();
    joiner.join();
}

/// 捐赠沿锁链传递: C(高) 等 B, B 等 A, A 被连环抬高
#[test]
fn test_transitive_donation_through_lock_chain() {
    let _kernel = common::boot(KernelConfig {
        scheduler: SchedulerKind::Priority,
        preemptive: true,
        ..KernelConfig::default()
    });

    let lock_a = Arc::new(Lock::new("lock a"));
    let lock_b = Arc::new(Lock::new("lock b"));
    let gate = Arc::new(Semaphore::new("gate", 0));

    // A 持有 lock_a
    let thread_a = Tcb::new("a", 1, true);
    {
        let lock_a = lock_a.clone();
        let gate = gate.clone();
        thread_a.fork(move || {
            lock_a.acquire();
            gate.p();
            lock_a.release();
        });
    }

    // B 持有 lock_b, 又去等 lock_a
    let thread_b = Tcb::new("b", 2, true);
    {
        let lock_a = lock_a.clone();
        let lock_b = lock_b.clone();
        thread_b.fork(move || {
            lock_b.acquire();
            lock_a.acquire();
            lock_a.release();
            lock_b.release();
        });
    }

    // C 高优先级等 lock_b
    let thread_c = Tcb::new("c", 7, true);
    {
        let lock_b = lock_b.clone();
        thread_c.fork(move || {
            lock_b.acquire();
            lock_b.release();
        });
    }

    // C -> B -> A 整条链都该被抬到 7
    assert_eq!(effective_priority_of(&thread_b), 7);
    assert_eq!(effective_priority_of(&thread_a), 7);

    gate.v();
    sos::task::api::yield_now();
    thread_a.join();
    thread_b.join();
    thread_c.join();
}
