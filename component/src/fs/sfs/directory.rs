//! 目录: 定容量的 (名字, 文件头扇区, 是否目录) 表.
//! 目录本身也是一个文件, 根目录的文件头固定在 1 号扇区

use logger::debug;

use super::error::{FsError, FsResult};
use super::open_file::OpenFile;

pub const NUM_DIR_ENTRIES: usize = 64;
pub const FILE_NAME_MAX_LEN: usize = 32;

/// 盘上格式: [in_use:i32][name[FILE_NAME_MAX_LEN+1]][header_sector:i32][is_dir:i32]
const ENTRY_SIZE: usize = 4 + (FILE_NAME_MAX_LEN + 1) + 4 + 4;
pub const DIRECTORY_FILE_SIZE: usize = ENTRY_SIZE * NUM_DIR_ENTRIES;

#[derive(Clone)]
struct DirectoryEntry {
    in_use: bool,
    name: String,
    header_sector: i32,
    is_dir: bool,
}

impl DirectoryEntry {
    fn empty() -> Self {
        Self {
            in_use: false,
            name: String::new(),
            header_sector: -1,
            is_dir: false,
        }
    }

    fn encode(&self, buf: &mut [u8]) {
        assert!(buf.len() >= ENTRY_SIZE);
        buf[..ENTRY_SIZE].fill(0);
        buf[0..4].copy_from_slice(&(self.in_use as i32).to_le_bytes());
        let name_bytes = self.name.as_bytes();
        assert!(name_bytes.len() <= FILE_NAME_MAX_LEN);
        buf[4..4 + name_bytes.len()].copy_from_slice(name_bytes);
        let at = 4 + FILE_NAME_MAX_LEN + 1;
        buf[at..at + 4].copy_from_slice(&self.header_sector.to_le_bytes());
        buf[at + 4..at + 8].copy_from_slice(&(self.is_dir as i32).to_le_bytes());
    }

    fn decode(buf: &[u8]) -> Self {
        assert!(buf.len() >= ENTRY_SIZE);
        let in_use = i32::from_le_bytes(buf[0..4].try_into().unwrap()) != 0;
        let name_field = &buf[4..4 + FILE_NAME_MAX_LEN + 1];
        let name_len = name_field.iter().position(|&b| b == 0).unwrap_or(FILE_NAME_MAX_LEN);
        let name = String::from_utf8_lossy(&name_field[..name_len]).into_owned();
        let at = 4 + FILE_NAME_MAX_LEN + 1;
        let header_sector = i32::from_le_bytes(buf[at..at + 4].try_into().unwrap());
        let is_dir = i32::from_le_bytes(buf[at + 4..at + 8].try_into().unwrap()) != 0;
        Self {
            in_use,
            name,
            header_sector,
            is_dir,
        }
    }
}

pub struct Directory {
    table: Vec<DirectoryEntry>,
}

impl Directory {
    pub fn new(size: usize) -> Self {
        Self {
            table: vec![DirectoryEntry::empty(); size],
        }
    }

    /// 从目录文件读入目录表
    pub fn fetch_from(&mut self, file: &OpenFile) {
        let mut bytes = vec![0u8; ENTRY_SIZE * self.table.len()];
        let read = file.read_at(&mut bytes, 0);
        assert_eq!(read, bytes.len());
        for (i, entry) in self.table.iter_mut().enumerate() {
            *entry = DirectoryEntry::decode(&bytes[i * ENTRY_SIZE..]);
        }
    }

    /// 把目录表写回目录文件
    pub fn write_back(&self, file: &OpenFile) {
        let mut bytes = vec![0u8; ENTRY_SIZE * self.table.len()];
        for (i, entry) in self.table.iter().enumerate() {
            entry.encode(&mut bytes[i * ENTRY_SIZE..]);
        }
        let written = file.write_at(&bytes, 0);
        assert_eq!(written, bytes.len());
    }

    fn index_of(&self, name: &str) -> Option<usize> {
        self.table
            .iter()
            .position(|entry| entry.in_use && entry.name == name)
    }

    /// 返回 name 对应的文件头扇区
    pub fn find(&self, name: &str) -> Option<usize> {
        self.index_of(name)
            .map(|i| self.table[i].header_sector as usize)
    }

    pub fn is_dir(&self, name: &str) -> bool {
        self.index_of(name)
            .map(|i| self.table[i].is_dir)
            .unwrap_or(false)
    }

    pub fn add(&mut self, name: &str, header_sector: usize, is_dir: bool) -> FsResult<()> {
        if name.len() > FILE_NAME_MAX_LEN {
            return Err(FsError::NameTooLong);
        }
        if self.index_of(name).is_some() {
            return Err(FsError::AlreadyExists);
        }

        let slot = self
            .table
            .iter()
            .position(|entry| !entry.in_use)
            .ok_or(FsError::NoDirectorySlot)?;
        debug!("directory add '{}' at slot {}", name, slot);
        self.table[slot] = DirectoryEntry {
            in_use: true,
            name: name.to_string(),
            header_sector: header_sector as i32,
            is_dir,
        };
        Ok(())
    }

    pub fn remove(&mut self, name: &str) -> FsResult<()> {
        let index = self.index_of(name).ok_or(FsError::NotFound)?;
        self.table[index].in_use = false;
        Ok(())
    }

    /// 打印目录下所有名字
    pub fn list(&self) {
        for entry in self.table.iter().filter(|entry| entry.in_use) {
            println!("{}", entry.name);
        }
    }

    /// 打印目录表细节, 供 -p 元数据输出使用
    pub fn print(&self) {
        println!("Directory contents:");
        for entry in self.table.iter().filter(|entry| entry.in_use) {
            println!(
                "Name: {}, Sector: {}{}",
                entry.name,
                entry.header_sector,
                if entry.is_dir { ", Directory" } else { "" }
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_encode_decode_round_trip() {
        let entry = DirectoryEntry {
            in_use: true,
            name: "closeFile1095.txt".to_string(),
            header_sector: 42,
            is_dir: false,
        };
        let mut buf = vec![0u8; ENTRY_SIZE];
        entry.encode(&mut buf);
        let back = DirectoryEntry::decode(&buf);
        assert!(back.in_use);
        assert_eq!(back.name, "closeFile1095.txt");
        assert_eq!(back.header_sector, 42);
        assert!(!back.is_dir);
    }

    #[test]
    fn test_add_find_remove() {
        let mut directory = Directory::new(4);
        assert!(directory.add("a", 10, false).is_ok());
        assert!(directory.add("d", 11, true).is_ok());
        assert_eq!(directory.find("a"), Some(10));
        assert!(directory.is_dir("d"));
        assert!(!directory.is_dir("a"));

        assert_eq!(directory.add("a", 12, false), Err(FsError::AlreadyExists));
        assert!(directory.remove("a").is_ok());
        assert_eq!(directory.find("a"), None);
        assert_eq!(directory.remove("a"), Err(FsError::NotFound));
    }

    #[test]
    fn test_add_rejects_long_name_and_full_table() {
        let mut directory = Directory::new(2);
        let long_name = "x".repeat(FILE_NAME_MAX_LEN + 1);
        assert_eq!(
            directory.add(&long_name, 10, false),
            Err(FsError::NameTooLong)
        );

        assert!(directory.add("a", 10, false).is_ok());
        assert!(directory.add("b", 11, false).is_ok());
        assert_eq!(directory.add("c", 12, false), Err(FsError::NoDirectorySlot));
    }
}
