//! 同步控制台输出
//!
//! 输出默认落到宿主 stdout; 测试可以切到捕获缓冲,
//! 以便对 PrintInt 序列做断言

use crate::sync::unicore::UPIntrFreeCell;

enum Sink {
    Stdout,
    Capture(String),
}

struct Console {
    sink: Sink,
}

lazy_static! {
    static ref CONSOLE: UPIntrFreeCell<Console> =
        unsafe { UPIntrFreeCell::new(Console { sink: Sink::Stdout }) };
}

pub fn put_char(ch: char) {
    let mut console = CONSOLE.exclusive_access();
    match &mut console.sink {
        Sink::Stdout => print!("{}", ch),
        Sink::Capture(buffer) => buffer.push(ch),
    }
}

/// 整数输出自带换行
pub fn put_int(value: i32) {
    let mut console = CONSOLE.exclusive_access();
    match &mut console.sink {
        Sink::Stdout => println!("{}", value),
        Sink::Capture(buffer) => {
            buffer.push_str(&value.to_string());
            buffer.push('\n');
        }
    }
}

/// 开始把输出截进缓冲
pub fn capture_start() {
    CONSOLE.exclusive_access().sink = Sink::Capture(String::new());
}

/// 取走捕获内容并切回 stdout
pub fn capture_take() -> String {
    let mut console = CONSOLE.exclusive_access();
    match std::mem::replace(&mut console.sink, Sink::Stdout) {
        Sink::Capture(buffer) => buffer,
        Sink::Stdout => String::new(),
    }
}
