//! 模拟器入口: 解释命令行, 执行文件系统命令或用户程序

use std::path::PathBuf;

use logger::{error, LogLevel};
use sos::task::scheduler::SchedulerKind;
use sos::{fs, init, uprog, DiskBacking, KernelConfig};
use sys_interface::config::MAX_USER_PROGRAMS;

/// 磁盘映像固定放在工作目录下
const DISK_IMAGE: &str = "DISK";

enum FsCommand {
    Put(String, String),
    Mkdir(String),
    List(String),
    Remove(String),
    Cat(String),
    Print,
}

struct BootArgs {
    debug: bool,
    format: bool,
    programs: Vec<String>,
    fs_command: Option<FsCommand>,
}

fn usage() {
    println!("usage: sos [-s] [-e PROG]... [-format] [-put LOCAL PATH]");
    println!("           [-mkdir PATH] [-ls PATH] [-rm PATH] [-cat PATH] [-p] [-u]");
    println!("builtin programs: {}", uprog::names().join(", "));
}

fn parse_args(args: &[String]) -> Option<BootArgs> {
    let mut parsed = BootArgs {
        debug: false,
        format: false,
        programs: Vec::new(),
        fs_command: None,
    };

    let mut i = 0;
    while i < args.len() {
        let take_one = |i: usize| -> Option<String> { args.get(i + 1).cloned() };
        match args[i].as_str() {
            "-s" => parsed.debug = true,
            "-e" => {
                parsed.programs.push(take_one(i)?);
                i += 1;
            }
            "-format" => parsed.format = true,
            "-put" => {
                let local = take_one(i)?;
                let path = args.get(i + 2).cloned()?;
                parsed.fs_command = Some(FsCommand::Put(local, path));
                i += 2;
            }
            "-mkdir" => {
                parsed.fs_command = Some(FsCommand::Mkdir(take_one(i)?));
                i += 1;
            }
            "-ls" => {
                parsed.fs_command = Some(FsCommand::List(take_one(i)?));
                i += 1;
            }
            "-rm" => {
                parsed.fs_command = Some(FsCommand::Remove(take_one(i)?));
                i += 1;
            }
            "-cat" => {
                parsed.fs_command = Some(FsCommand::Cat(take_one(i)?));
                i += 1;
            }
            "-p" => parsed.fs_command = Some(FsCommand::Print),
            "-u" => {
                usage();
                return None;
            }
            unknown => {
                println!("unknown flag: {}", unknown);
                usage();
                return None;
            }
        }
        i += 1;
    }

    if parsed.programs.len() > MAX_USER_PROGRAMS {
        println!("at most {} user programs", MAX_USER_PROGRAMS);
        return None;
    }
    Some(parsed)
}

fn run_fs_command(command: &FsCommand) {
    let report = |result: component::fs::sfs::FsResult<()>| {
        if let Err(err) = result {
            error!("file system command failed: {}", err);
        }
    };
    match command {
        FsCommand::Put(local, path) => report(fs::put(local, path)),
        FsCommand::Mkdir(path) => report(fs::create(path, 0, true)),
        FsCommand::List(path) => report(fs::list(path)),
        FsCommand::Remove(path) => report(fs::remove(path)),
        FsCommand::Cat(path) => report(fs::print_file(path)),
        FsCommand::Print => fs::print(),
    }
}

fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(parsed) = parse_args(&args) else {
        return;
    };

    init::kernel_start(KernelConfig {
        scheduler: SchedulerKind::Priority,
        preemptive: true,
        format: parsed.format,
        disk: DiskBacking::File(PathBuf::from(DISK_IMAGE)),
        log_level: if parsed.debug {
            LogLevel::TRACE
        } else {
            LogLevel::INFO
        },
    });

    if let Some(command) = parsed.fs_command.as_ref() {
        run_fs_command(command);
    }

    // 把排队的用户程序逐个装上线程, 然后等它们全部结束
    let mut user_threads = Vec::new();
    for name in &parsed.programs {
        match uprog::spawn(name) {
            Some(tcb) => user_threads.push(tcb),
            None => error!("no builtin program named '{}'", name),
        }
    }
    for tcb in &user_threads {
        tcb.join();
    }

    init::halt();
}
