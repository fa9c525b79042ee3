use core::fmt;
use core::sync::atomic::{AtomicU8, Ordering};
use std::io::Write;
use std::time::Instant;

use lazy_static::lazy_static;

lazy_static! {
    static ref BOOT_INSTANT: Instant = Instant::now();
}

pub fn logger_print(args: fmt::Arguments) {
    // 日志走 stderr, 模拟控制台的输出走 stdout, 两者互不干扰
    let mut err = std::io::stderr().lock();
    err.write_fmt(args).unwrap();
}

#[derive(Debug)]
pub enum Color {
    Red = 31,
    Yellow = 93,
    Blue = 35,
    Green = 32,
    Gray = 34,
}

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy)]
#[allow(clippy::upper_case_acronyms)]
pub enum LogLevel {
    ERROR = 50,
    WARN = 40,
    INFO = 30,
    DEBUG = 20,
    TRACE = 10,
}

// 默认只打印 INFO 及以上
static LOG_LEVEL: AtomicU8 = AtomicU8::new(LogLevel::INFO as u8);

pub fn set_log_level(level: LogLevel) {
    LOG_LEVEL.store(level as u8, Ordering::Relaxed);
}

pub fn log_level() -> u8 {
    LOG_LEVEL.load(Ordering::Relaxed)
}

/// 自进程启动以来经过的毫秒数, 只用于日志时间列
pub fn logger_time_ms() -> u128 {
    BOOT_INSTANT.elapsed().as_millis()
}

/// 通用打印
/// 类似样式
/// [        79 ms][INFO]   [kernel] Application exited with code 1
#[macro_export]
macro_rules! log {
    ($color:expr, $level:literal, $($arg:tt)*) => {
        $crate::logger_print(format_args!("\x1B[90m[{:10} ms]\x1B[0m\x1B[{}m[{}]\t[kernel] {}\x1B[0m\n", $crate::logger_time_ms(), ($color as i32), $level, format_args!($($arg)*)))
    }
}

#[macro_export]
macro_rules! error {
    ($($arg:tt)*) => {
        if $crate::LogLevel::ERROR as u8 >= $crate::log_level() {
            $crate::log!($crate::Color::Red, "ERROR", $($arg)*)
        }
    }
}

#[macro_export]
macro_rules! warn {
    ($($arg:tt)*) => {
        if $crate::LogLevel::WARN as u8 >= $crate::log_level() {
            $crate::log!($crate::Color::Yellow, "WARN", $($arg)*)
        }
    }
}

#[macro_export]
macro_rules! info {
    ($($arg:tt)*) => {
        if $crate::LogLevel::INFO as u8 >= $crate::log_level() {
            $crate::log!($crate::Color::Blue, "INFO", $($arg)*)
        }
    }
}

#[macro_export]
macro_rules! debug {
    ($($arg:tt)*) => {
        if $crate::LogLevel::DEBUG as u8 >= $crate::log_level() {
            $crate::log!($crate::Color::Green, "DEBUG", $($arg)*)
        }
    }
}

#[macro_export]
macro_rules! trace {
    ($($arg:tt)*) => {
        if $crate::LogLevel::TRACE as u8 >= $crate::log_level() {
            $crate::log!($crate::Color::Gray, "TRACE", $($arg)*)
        }
    }
}
