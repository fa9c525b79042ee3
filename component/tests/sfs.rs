//! 对扇区级文件系统的整体测试, 跑在内存盘上
//!
//! 块缓存管理器是全局的, 所有用例串行并各自重新注册一块新盘

use std::sync::Mutex;

use component::fs::block_device::{self, BlockDevice};
use component::fs::sfs::{
    Directory, FileHeader, FileSystem, FreeMap, FsError, OpenFile, FREE_MAP_SECTOR, MAX_FILE_SIZE,
    NUM_DIR_ENTRIES,
};
use component::fs::SECTOR_SIZE;
use lazy_static::lazy_static;

const NUM_SECTORS: usize = 256;

struct MemDisk {
    sectors: spin::Mutex<Vec<u8>>,
}

impl MemDisk {
    fn new(num_sectors: usize) -> Self {
        Self {
            sectors: spin::Mutex::new(vec![0; num_sectors * SECTOR_SIZE]),
        }
    }
}

impl BlockDevice for MemDisk {
    fn read_sector(&self, sector_id: usize, buf: &mut [u8]) {
        let sectors = self.sectors.lock();
        let begin = sector_id * SECTOR_SIZE;
        buf.copy_from_slice(&sectors[begin..begin + SECTOR_SIZE]);
    }

    fn write_sector(&self, sector_id: usize, buf: &[u8]) {
        let mut sectors = self.sectors.lock();
        let begin = sector_id * SECTOR_SIZE;
        sectors[begin..begin + SECTOR_SIZE].copy_from_slice(buf);
    }
}

lazy_static! {
    static ref FS_TEST_LOCK: Mutex<()> = Mutex::new(());
}

fn with_fresh_fs<F: FnOnce(&FileSystem)>(f: F) {
    let _guard = FS_TEST_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    block_device::register_block_device(MemDisk::new(NUM_SECTORS));
    let fs = FileSystem::new(true, NUM_SECTORS);
    f(&fs);
}

#[test]
fn test_create_open_read_write_round_trip() {
    with_fresh_fs(|fs| {
        assert!(fs.create("/f", 64, false).is_ok());

        let file = fs.open("/f").expect("created file must open");
        assert_eq!(file.length(), 64);

        let written = file.write_at(b"1095", 0);
        assert_eq!(written, 4);

        let again = fs.open("/f").expect("reopen");
        let mut buf = [0u8; 4];
        assert_eq!(again.read_at(&mut buf, 0), 4);
        assert_eq!(&buf, b"1095");
    });
}

#[test]
fn test_read_past_end_returns_fewer_bytes() {
    with_fresh_fs(|fs| {
        fs.create("/f", 10, false).unwrap();
        let file = fs.open("/f").unwrap();
        let mut buf = [0u8; 64];
        assert_eq!(file.read_at(&mut buf, 0), 10);
        assert_eq!(file.read_at(&mut buf, 10), 0);

        // 写也同样被文件长度截断
        assert_eq!(file.write_at(&[7u8; 64], 4), 6);
    });
}

#[test]
fn test_duplicate_create_fails() {
    with_fresh_fs(|fs| {
        assert!(fs.create("/createFile1095.txt", 16, false).is_ok());
        assert_eq!(
            fs.create("/createFile1095.txt", 16, false),
            Err(FsError::AlreadyExists)
        );
    });
}

#[test]
fn test_open_missing_or_directory_fails() {
    with_fresh_fs(|fs| {
        assert!(matches!(fs.open("/nope"), Err(FsError::NotFound)));
        fs.create("/dir", 0, true).unwrap();
        assert!(matches!(fs.open("/dir"), Err(FsError::IsADirectory)));
        assert!(matches!(fs.remove("/dir"), Err(FsError::IsADirectory)));
    });
}

#[test]
fn test_nested_directories() {
    with_fresh_fs(|fs| {
        fs.create("/a", 0, true).unwrap();
        fs.create("/a/b", 0, true).unwrap();
        fs.create("/a/b/f", 32, false).unwrap();

        let file = fs.open("/a/b/f").unwrap();
        assert_eq!(file.length(), 32);

        // 中间分量是文件时下降失败
        fs.create("/a/plain", 8, false).unwrap();
        assert!(matches!(
            fs.create("/a/plain/x", 8, false),
            Err(FsError::NotADirectory)
        ));
        // 中间分量缺失
        assert!(matches!(fs.open("/a/miss/x"), Err(FsError::NotFound)));
        // 相对路径非法
        assert!(matches!(fs.open("relative"), Err(FsError::InvalidPath)));
    });
}

#[test]
fn test_chained_header_big_file() {
    with_fresh_fs(|fs| {
        let big = MAX_FILE_SIZE + 3 * SECTOR_SIZE + 17;
        fs.create("/big", big, false).unwrap();

        let file = fs.open("/big").unwrap();
        assert_eq!(file.length(), big);

        // 跨越链节边界写再读
        let pattern: Vec<u8> = (0..SECTOR_SIZE * 2).map(|i| (i % 251) as u8).collect();
        let at = MAX_FILE_SIZE - SECTOR_SIZE;
        assert_eq!(file.write_at(&pattern, at), pattern.len());

        let mut back = vec![0u8; pattern.len()];
        assert_eq!(file.read_at(&mut back, at), pattern.len());
        assert_eq!(back, pattern);
    });
}

#[test]
fn test_header_write_back_fetch_round_trip() {
    with_fresh_fs(|fs| {
        let big = MAX_FILE_SIZE + 5 * SECTOR_SIZE;
        fs.create("/big", big, false).unwrap();
        let sector = {
            let dir = fs.find_sub_directory("/big").unwrap();
            let mut directory = Directory::new(NUM_DIR_ENTRIES);
            directory.fetch_from(&dir);
            directory.find("big").unwrap()
        };

        let first = FileHeader::fetch_from(sector);
        first.write_back(sector);
        let second = FileHeader::fetch_from(sector);

        assert_eq!(first.file_length(), second.file_length());
        assert_eq!(first.num_sectors(), second.num_sectors());
        assert_eq!(first.next_header_sector(), second.next_header_sector());
        for i in 0..first.num_sectors() {
            assert_eq!(first.data_sector(i), second.data_sector(i));
        }
    });
}

#[test]
fn test_remove_returns_exactly_the_allocated_bits() {
    with_fresh_fs(|fs| {
        let mut before = FreeMap::new(NUM_SECTORS);
        before.fetch_from(&OpenFile::new(FREE_MAP_SECTOR));

        fs.create("/f", MAX_FILE_SIZE + 100, false).unwrap();
        fs.remove("/f").unwrap();

        let mut after = FreeMap::new(NUM_SECTORS);
        after.fetch_from(&OpenFile::new(FREE_MAP_SECTOR));

        for sector in 0..NUM_SECTORS {
            assert_eq!(before.test(sector), after.test(sector), "sector {}", sector);
        }
    });
}

#[test]
fn test_create_rolls_back_on_exhaustion() {
    with_fresh_fs(|fs| {
        let mut before = FreeMap::new(NUM_SECTORS);
        before.fetch_from(&OpenFile::new(FREE_MAP_SECTOR));
        let clear_before = before.num_clear();

        // 远超磁盘容量, 分配途中必然失败
        let too_big = NUM_SECTORS * SECTOR_SIZE;
        assert_eq!(fs.create("/huge", too_big, false), Err(FsError::NoSpace));

        let mut after = FreeMap::new(NUM_SECTORS);
        after.fetch_from(&OpenFile::new(FREE_MAP_SECTOR));
        assert_eq!(after.num_clear(), clear_before);

        // 目录里也不应残留半个条目
        assert!(matches!(fs.open("/huge"), Err(FsError::NotFound)));
    });
}

#[test]
fn test_remove_missing_fails() {
    with_fresh_fs(|fs| {
        assert!(matches!(fs.remove("/nope"), Err(FsError::NotFound)));
    });
}
