//! 文件头 (i-node): 定长的磁盘记录, 把文件内偏移映射到数据扇区.
//! 一个文件头正好占一个扇区; 文件超过 MAX_FILE_SIZE 时
//! 通过 next_header_sector 链成单向链表, 读入内存时整条链被立即物化

use logger::debug;

use super::super::{block_device, SECTOR_SIZE};
use super::error::{FsError, FsResult};
use crate::memory::Bitmap;
use crate::util::div_round_up;

/// 盘上前三个 i32 之外都是直接块指针
pub const NUM_DIRECT: usize = (SECTOR_SIZE - 3 * 4) / 4;
/// 单个文件头能覆盖的字节数
pub const MAX_FILE_SIZE: usize = NUM_DIRECT * SECTOR_SIZE;

/// 盘上格式 (小端 i32): [num_bytes][num_sectors][next_header_sector][data_sectors..]
pub struct FileHeader {
    /// 本节文件头覆盖的字节数, 整个文件的长度是链上各节之和
    num_bytes: usize,
    num_sectors: usize,
    /// -1 表示链到此为止
    next_header_sector: i32,
    data_sectors: [i32; NUM_DIRECT],
    next: Option<Box<FileHeader>>,
}

impl Default for FileHeader {
    fn default() -> Self {
        Self::new()
    }
}

impl FileHeader {
    pub fn new() -> Self {
        Self {
            num_bytes: 0,
            num_sectors: 0,
            next_header_sector: -1,
            data_sectors: [0; NUM_DIRECT],
            next: None,
        }
    }

    /// 从空闲位图里为新文件预定数据扇区, 超长部分递归分配下一节.
    /// 失败时半成品仍然挂在链上, 调用方负责用 deallocate 回滚
    pub fn allocate(&mut self, free_map: &mut Bitmap, file_size: usize) -> FsResult<()> {
        let num_total_sectors = div_round_up(file_size, SECTOR_SIZE);
        self.num_bytes = file_size.min(MAX_FILE_SIZE);

        let want = num_total_sectors.min(NUM_DIRECT);
        if free_map.num_clear() < want {
            return Err(FsError::NoSpace);
        }
        // num_sectors 始终只计已拿到手的扇区, 这样回滚不会清到别人的位
        self.num_sectors = 0;
        for i in 0..want {
            match free_map.find_and_set() {
                Some(sector) => {
                    self.data_sectors[i] = sector as i32;
                    self.num_sectors = i + 1;
                }
                None => return Err(FsError::NoSpace),
            }
        }

        if num_total_sectors > NUM_DIRECT {
            let next_sector = free_map.find_and_set().ok_or(FsError::NoSpace)?;
            self.next_header_sector = next_sector as i32;
            debug!("allocate next part of file header at sector {}", next_sector);

            let mut next = Box::new(FileHeader::new());
            let result = next.allocate(free_map, file_size - MAX_FILE_SIZE);
            self.next = Some(next);
            result
        } else {
            Ok(())
        }
    }

    /// 归还整条链占用的数据扇区和链上的文件头扇区.
    /// 要归还的位必须处于置位状态, 否则说明状态已经不一致
    pub fn deallocate(&mut self, free_map: &mut Bitmap) {
        if let Some(next) = self.next.as_mut() {
            debug!(
                "deallocate next part of file header at sector {}",
                self.next_header_sector
            );
            next.deallocate(free_map);
            let next_sector = self.next_header_sector as usize;
            assert!(free_map.test(next_sector));
            free_map.clear(next_sector);
            self.next_header_sector = -1;
            self.next = None;
        }

        for i in 0..self.num_sectors {
            let sector = self.data_sectors[i] as usize;
            assert!(free_map.test(sector), "sector {} double free", sector);
            free_map.clear(sector);
        }
        self.num_sectors = 0;
        self.num_bytes = 0;
    }

    /// 从磁盘读入文件头, 链上各节被立即读入
    pub fn fetch_from(sector: usize) -> Self {
        debug!("fetch file header from sector {}", sector);
        let mut hdr = FileHeader::new();
        block_device::read(sector, |data| {
            hdr.num_bytes = i32::from_le_bytes(data[0..4].try_into().unwrap()) as usize;
            hdr.num_sectors = i32::from_le_bytes(data[4..8].try_into().unwrap()) as usize;
            hdr.next_header_sector = i32::from_le_bytes(data[8..12].try_into().unwrap());
            for i in 0..hdr.num_sectors {
                let at = 12 + i * 4;
                hdr.data_sectors[i] = i32::from_le_bytes(data[at..at + 4].try_into().unwrap());
            }
        });

        if hdr.next_header_sector != -1 {
            hdr.next = Some(Box::new(FileHeader::fetch_from(
                hdr.next_header_sector as usize,
            )));
        }
        hdr
    }

    /// 把文件头写回磁盘, 链上各节一并写回
    pub fn write_back(&self, sector: usize) {
        debug!("write file header back to sector {}", sector);
        block_device::modify(sector, |data| {
            data.fill(0);
            data[0..4].copy_from_slice(&(self.num_bytes as i32).to_le_bytes());
            data[4..8].copy_from_slice(&(self.num_sectors as i32).to_le_bytes());
            data[8..12].copy_from_slice(&self.next_header_sector.to_le_bytes());
            for i in 0..self.num_sectors {
                let at = 12 + i * 4;
                data[at..at + 4].copy_from_slice(&self.data_sectors[i].to_le_bytes());
            }
        });

        if let Some(next) = self.next.as_ref() {
            next.write_back(self.next_header_sector as usize);
        }
    }

    /// 文件内偏移到数据扇区号的翻译
    pub fn byte_to_sector(&self, offset: usize) -> usize {
        if offset >= MAX_FILE_SIZE {
            self.next
                .as_ref()
                .expect("offset beyond header chain")
                .byte_to_sector(offset - MAX_FILE_SIZE)
        } else {
            self.data_sectors[offset / SECTOR_SIZE] as usize
        }
    }

    pub fn file_length(&self) -> usize {
        match self.next.as_ref() {
            Some(next) => self.num_bytes + next.file_length(),
            None => self.num_bytes,
        }
    }

    pub fn num_sectors(&self) -> usize {
        self.num_sectors
    }

    pub fn next_header_sector(&self) -> i32 {
        self.next_header_sector
    }

    pub fn data_sector(&self, index: usize) -> usize {
        assert!(index < self.num_sectors);
        self.data_sectors[index] as usize
    }

    /// 打印文件头以及各数据扇区内容 (不可打印字节转义成十六进制)
    pub fn print(&self) {
        println!(
            "FileHeader contents.  File size: {}.  File blocks:",
            self.num_bytes
        );
        let sectors: Vec<String> = (0..self.num_sectors)
            .map(|i| self.data_sectors[i].to_string())
            .collect();
        println!("{}", sectors.join(" "));

        println!("File contents:");
        let mut remaining = self.num_bytes;
        for i in 0..self.num_sectors {
            let mut line = String::new();
            block_device::read(self.data_sectors[i] as usize, |data| {
                for &byte in data.iter().take(remaining.min(SECTOR_SIZE)) {
                    if (0x20..=0x7e).contains(&byte) {
                        line.push(byte as char);
                    } else {
                        line.push_str(&format!("\\{:x}", byte));
                    }
                }
            });
            remaining = remaining.saturating_sub(SECTOR_SIZE);
            println!("{}", line);
        }

        if let Some(next) = self.next.as_ref() {
            next.print();
        }
    }
}
