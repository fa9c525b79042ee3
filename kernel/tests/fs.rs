//! 内核侧文件系统封装的测试: 启动命令走的 mkdir/put/rm 路径

mod common;

use component::fs::sfs::FsError;
use sos::fs;
use sos::KernelConfig;

#[test]
fn test_mkdir_and_nested_create() {
    let _kernel = common::boot(KernelConfig::default());

    assert!(fs::create("/home", 0, true).is_ok());
    assert!(fs::create("/home/user", 0, true).is_ok());
    assert!(fs::create("/home/user/note.txt", 64, false).is_ok());

    let file = fs::open("/home/user/note.txt").unwrap();
    assert_eq!(file.length(), 64);

    // 目录不可删
    assert_eq!(fs::remove("/home/user"), Err(FsError::IsADirectory));
    // 文件删掉后就打不开了
    assert!(fs::remove("/home/user/note.txt").is_ok());
    assert!(matches!(
        fs::open("/home/user/note.txt"),
        Err(FsError::NotFound)
    ));
}

#[test]
fn test_put_imports_host_file() {
    let _kernel = common::boot(KernelConfig::default());

    let local = std::env::temp_dir().join(format!("sos-put-{}.txt", std::process::id()));
    let content = b"imported from the host file system";
    std::fs::write(&local, content).unwrap();

    assert!(fs::put(local.to_str().unwrap(), "/imported.txt").is_ok());
    let file = fs::open("/imported.txt").unwrap();
    assert_eq!(file.length(), content.len());

    let mut back = vec![0u8; content.len()];
    assert_eq!(file.read_at(&mut back, 0), content.len());
    assert_eq!(back, content);

    std::fs::remove_file(&local).ok();
}

#[test]
fn test_put_missing_local_file_fails() {
    let _kernel = common::boot(KernelConfig::default());
    assert_eq!(
        fs::put("/definitely/not/there", "/x"),
        Err(FsError::NotFound)
    );
}

#[test]
fn test_list_and_print_do_not_disturb_state() {
    let _kernel = common::boot(KernelConfig::default());

    fs::create("/d", 0, true).unwrap();
    fs::create("/d/f", 16, false).unwrap();

    assert!(fs::list("/").is_ok());
    assert!(fs::list("/d").is_ok());
    assert!(fs::list("/d/f").is_ok()); // 打印 "FILE f"
    assert!(matches!(fs::list("/nope"), Err(FsError::NotFound)));

    fs::print();
    assert!(fs::print_file("/d/f").is_ok());

    // 元数据打印之后一切照旧
    assert!(fs::open("/d/f").is_ok());
}
