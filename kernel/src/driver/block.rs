//! 扇区磁盘设备
//!
//! 字节级的旋转/寻道时延模拟不在范围内, 设备契约是同步读写整扇区.
//! RamDisk 用于测试与默认启动, FileDisk 把扇区映像持久化到宿主文件,
//! 文件开头放一个魔数用来识别已格式化的磁盘映像

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use component::fs::block_device::BlockDevice;
use component::fs::SECTOR_SIZE;
use logger::info;

use crate::machine::stats;

pub struct RamDisk {
    sectors: spin::Mutex<Vec<u8>>,
}

impl RamDisk {
    pub fn new(num_sectors: usize) -> Self {
        Self {
            sectors: spin::Mutex::new(vec![0; num_sectors * SECTOR_SIZE]),
        }
    }
}

impl BlockDevice for RamDisk {
    fn read_sector(&self, sector_id: usize, buf: &mut [u8]) {
        stats::add_disk_read();
        let sectors = self.sectors.lock();
        let begin = sector_id * SECTOR_SIZE;
        buf.copy_from_slice(&sectors[begin..begin + SECTOR_SIZE]);
    }

    fn write_sector(&self, sector_id: usize, buf: &[u8]) {
        stats::add_disk_write();
        let mut sectors = self.sectors.lock();
        let begin = sector_id * SECTOR_SIZE;
        sectors[begin..begin + SECTOR_SIZE].copy_from_slice(buf);
    }
}

/// 磁盘映像文件的识别魔数
const DISK_MAGIC: u32 = 0x456789ab;
const MAGIC_SIZE: u64 = 4;

pub struct FileDisk {
    file: spin::Mutex<File>,
}

impl FileDisk {
    /// 打开或新建磁盘映像. 新映像被填零并写入魔数,
    /// 旧映像校验魔数防止拿错文件
    pub fn new(path: &Path, num_sectors: usize) -> std::io::Result<Self> {
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(path)?;

        if file.metadata()?.len() == 0 {
            info!("creating disk image {:?}", path);
            file.write_all(&DISK_MAGIC.to_le_bytes())?;
            file.write_all(&vec![0; num_sectors * SECTOR_SIZE])?;
        } else {
            let mut magic = [0u8; 4];
            file.seek(SeekFrom::Start(0))?;
            file.read_exact(&mut magic)?;
            assert_eq!(
                u32::from_le_bytes(magic),
                DISK_MAGIC,
                "not a disk image: {:?}",
                path
            );
        }

        Ok(Self {
            file: spin::Mutex::new(file),
        })
    }
}

impl BlockDevice for FileDisk {
    fn read_sector(&self, sector_id: usize, buf: &mut [u8]) {
        stats::add_disk_read();
        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(MAGIC_SIZE + (sector_id * SECTOR_SIZE) as u64))
            .expect("disk seek failed");
        file.read_exact(buf).expect("disk read failed");
    }

    fn write_sector(&self, sector_id: usize, buf: &[u8]) {
        stats::add_disk_write();
        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(MAGIC_SIZE + (sector_id * SECTOR_SIZE) as u64))
            .expect("disk seek failed");
        file.write_all(buf).expect("disk write failed");
    }
}
