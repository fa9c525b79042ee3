//! 信箱: 单槽会合缓冲
//!
//! Send 只有在已有 Receive 挂起时才会提交消息;
//! 双方各自在一个条件变量上等待, 内部用一把锁串行化

use std::sync::Arc;

use super::condvar::Condition;
use super::lock::Lock;
use super::unicore::UPSafeCell;

pub struct Mailbox {
    name: &'static str,
    lock: Arc<Lock>,
    send_wait: Condition,
    recv_wait: Condition,
    inner: UPSafeCell<MailboxInner>,
}

struct MailboxInner {
    buffer: i32,
    buffer_writable: bool,
    num_recv_called: usize,
}

impl Mailbox {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            lock: Arc::new(Lock::new("mailbox lock")),
            send_wait: Condition::new("mailbox send cv"),
            recv_wait: Condition::new("mailbox recv cv"),
            inner: unsafe {
                UPSafeCell::new(MailboxInner {
                    buffer: 0,
                    buffer_writable: true,
                    num_recv_called: 0,
                })
            },
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// 等到缓冲可写且有接收者挂起, 放入消息
    pub fn send(&self, message: i32) {
        self.lock.acquire();

        loop {
            let inner = self.inner.exclusive_access();
            if inner.buffer_writable && inner.num_recv_called > 0 {
                break;
            }
            drop(inner);
            self.send_wait.wait(&self.lock);
        }

        {
            let mut inner = self.inner.exclusive_access();
            inner.buffer = message;
            inner.buffer_writable = false;
        }

        self.recv_wait.signal(&self.lock);
        self.lock.release();
    }

    /// 登记自己, 叫醒可能在等接收者的发送方, 然后等消息
    pub fn receive(&self) -> i32 {
        self.lock.acquire();

        self.inner.exclusive_access().num_recv_called += 1;
        self.send_wait.signal(&self.lock);

        loop {
            let inner = self.inner.exclusive_access();
            if !inner.buffer_writable {
                break;
            }
            drop(inner);
            self.recv_wait.wait(&self.lock);
        }

        let message = {
            let mut inner = self.inner.exclusive_access();
            inner.num_recv_called -= 1;
            inner.buffer_writable = true;
            inner.buffer
        };

        self.lock.release();
        message
    }
}
