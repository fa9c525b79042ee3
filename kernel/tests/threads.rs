//! 线程生命周期与同步原语的整体测试
//!
//! 全部跑在非抢占 RR 下, 交错完全由 yield/阻塞点决定, 可以逐步断言

mod common;

use std::sync::Arc;

use sos::machine::interrupt::{self, TickKind};
use sos::sync::{Mailbox, Semaphore};
use sos::task::scheduler::{self, SchedulerKind};
use sos::task::{self, Tcb};
use sos::KernelConfig;

type Trace = Arc<spin::Mutex<Vec<String>>>;

fn rr_config() -> KernelConfig {
    KernelConfig {
        scheduler: SchedulerKind::Rr,
        preemptive: false,
        ..KernelConfig::default()
    }
}

#[test]
fn test_yield_ping_pong() {
    let _kernel = common::boot(rr_config());
    let trace: Trace = Arc::new(spin::Mutex::new(Vec::new()));

    let child_trace = trace.clone();
    let child = Tcb::new("forked thread", 0, true);
    child.fork(move || {
        for num in 0..5 {
            child_trace.lock().push(format!("1-{}", num));
            task::api::yield_now();
        }
    });

    for num in 0..5 {
        trace.lock().push(format!("0-{}", num));
        task::api::yield_now();
    }
    child.join();

    let expected: Vec<String> = (0..5)
        .flat_map(|num| [format!("0-{}", num), format!("1-{}", num)])
        .collect();
    assert_eq!(*trace.lock(), expected);
}

#[test]
fn test_semaphore_ping_pong() {
    let _kernel = common::boot(rr_config());

    let ping = Arc::new(Semaphore::new("ping", 0));
    let pong = Arc::new(Semaphore::new("pong", 0));

    let helper_ping = ping.clone();
    let helper_pong = pong.clone();
    let helper = Tcb::new("ping helper", 0, true);
    helper.fork(move || {
        for _ in 0..10 {
            helper_ping.p();
            helper_pong.v();
        }
    });

    for _ in 0..10 {
        ping.v();
        pong.p();
    }
    helper.join();

    assert_eq!(ping.value(), 0);
    assert_eq!(pong.value(), 0);
}

#[test]
fn test_semaphore_pv_counting() {
    let _kernel = common::boot(rr_config());

    let sem = Arc::new(Semaphore::new("counting", 0));
    let mut producers = Vec::new();
    for which in 0..3 {
        let sem = sem.clone();
        let producer = Tcb::new(&format!("producer{}", which), 0, true);
        producer.fork(move || {
            for _ in 0..5 {
                sem.v();
                task::api::yield_now();
            }
        });
        producers.push(producer);
    }

    // 每个 V 都要对上一个 P
    for _ in 0..15 {
        sem.p();
    }
    for producer in &producers {
        producer.join();
    }
    assert_eq!(sem.value(), 0);
}

#[test]
fn test_mailbox_rendezvous() {
    let _kernel = common::boot(rr_config());
    let trace: Trace = Arc::new(spin::Mutex::new(Vec::new()));

    let mailbox = Arc::new(Mailbox::new("mailbox"));

    let sender_mailbox = mailbox.clone();
    let sender_trace = trace.clone();
    let sender = Tcb::new("sender", 0, true);
    sender.fork(move || {
        sender_mailbox.send(1095);
        sender_trace.lock().push("sent".to_string());
    });

    // 让发送方先跑: 没有接收者挂起, Send 不得提交
    task::api::yield_now();
    trace.lock().push("before receive".to_string());

    let message = mailbox.receive();
    assert_eq!(message, 1095);
    sender.join();

    let trace = trace.lock();
    let before = trace.iter().position(|s| s == "before receive").unwrap();
    let sent = trace.iter().position(|s| s == "sent").unwrap();
    assert!(before < sent, "send committed before a receive was pending");
}

#[test]
fn test_sleep_wakes_in_tick_order() {
    let _kernel = common::boot(rr_config());
    let trace: Trace = Arc::new(spin::Mutex::new(Vec::new()));

    for (name, ticks) in [("t1", 300usize), ("t2", 100usize)] {
        let trace = trace.clone();
        let tcb = Tcb::new(name, 0, false);
        tcb.fork(move || {
            scheduler::set_sleep(ticks);
            trace.lock().push(name.to_string());
        });
    }

    // 自己睡得最久, 醒来时两个孩子都该按唤醒时刻排好了
    scheduler::set_sleep(500);
    assert_eq!(*trace.lock(), vec!["t2".to_string(), "t1".to_string()]);
}

#[test]
fn test_burst_prediction_exponential_average() {
    let _kernel = common::boot(rr_config());

    let worker = Tcb::new("worker", 0, false);
    let spinner = Tcb::new("spinner", 0, false);

    worker.fork(move || {
        // 烧 20 个 user tick 再让出
        for _ in 0..20 {
            interrupt::one_tick(TickKind::User);
        }
        task::api::yield_now();
    });
    spinner.fork(|| {});

    task::api::yield_now();

    // 初始预测 10, 实际突发 20: 0.5*20 + 0.5*10 = 15
    assert_eq!(worker.burst_ticks(), 15);

    // 收尾: 让两个孩子跑完
    task::api::yield_now();
    task::api::yield_now();
}

#[test]
fn test_join_handshake() {
    let _kernel = common::boot(rr_config());
    let trace: Trace = Arc::new(spin::Mutex::new(Vec::new()));

    let child_trace = trace.clone();
    let child = Tcb::new("joinable child", 0, true);
    child.fork(move || {
        child_trace.lock().push("child body".to_string());
    });

    child.join();
    trace.lock().push("joined".to_string());

    assert_eq!(
        *trace.lock(),
        vec!["child body".to_string(), "joined".to_string()]
    );
}

#[test]
fn test_ready_list_respects_priority_order() {
    let _kernel = common::boot(KernelConfig {
        scheduler: SchedulerKind::Priority,
        preemptive: false,
        ..KernelConfig::default()
    });
    let trace: Trace = Arc::new(spin::Mutex::new(Vec::new()));

    // 非抢占: fork 只入队不换人, 优先级决定出队顺序
    for (name, priority) in [("low", 1usize), ("high", 7usize), ("mid", 4usize)] {
        let trace = trace.clone();
        let tcb = Tcb::new(name, priority, false);
        tcb.fork(move || {
            trace.lock().push(name.to_string());
        });
    }

    // 换下自己, 三个孩子按优先级依次上 CPU
    task::api::yield_now();
    task::api::yield_now();
    task::api::yield_now();
    task::api::yield_now();

    assert_eq!(
        *trace.lock(),
        vec!["high".to_string(), "mid".to_string(), "low".to_string()]
    );
}

#[test]
fn test_sjf_picks_shortest_predicted_burst() {
    let _kernel = common::boot(KernelConfig {
        scheduler: SchedulerKind::Sjf,
        preemptive: false,
        ..KernelConfig::default()
    });
    let trace: Trace = Arc::new(spin::Mutex::new(Vec::new()));

    // 先各跑一轮把突发预测拉开: fast 实际 2, slow 实际 30
    let fast = Tcb::new("fast", 0, false);
    let slow = Tcb::new("slow", 0, false);

    let fast_trace = trace.clone();
    let slow_trace = trace.clone();
    fast.fork(move || {
        for _ in 0..2 {
            interrupt::one_tick(TickKind::User);
        }
        task::api::yield_now();
        fast_trace.lock().push("fast".to_string());
    });
    slow.fork(move || {
        for _ in 0..30 {
            interrupt::one_tick(TickKind::User);
        }
        task::api::yield_now();
        slow_trace.lock().push("slow".to_string());
    });

    // 第一轮按 FIFO (预测都是 10), 第二轮按预测值: fast(6) 先于 slow(20)
    for _ in 0..6 {
        task::api::yield_now();
    }

    let trace = trace.lock();
    let fast_at = trace.iter().position(|s| s == "fast").unwrap();
    let slow_at = trace.iter().position(|s| s == "slow").unwrap();
    assert!(fast_at < slow_at, "short predicted burst must run first");
}
