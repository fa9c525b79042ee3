//! 文件系统总控: 在路径和文件之间建立映射
//!
//! 修改目录或位图的操作 (create/remove) 成功时立刻把变更写回磁盘;
//! 失败时丢弃内存中的半成品并逐项回滚已占用的资源, 不写回

use logger::{debug, info};

use super::directory::{Directory, DIRECTORY_FILE_SIZE, FILE_NAME_MAX_LEN, NUM_DIR_ENTRIES};
use super::error::{FsError, FsResult};
use super::freemap::FreeMap;
use super::header::FileHeader;
use super::open_file::OpenFile;

/// 空闲扇区位图文件的文件头所在扇区
pub const FREE_MAP_SECTOR: usize = 0;
/// 根目录文件的文件头所在扇区
pub const DIRECTORY_SECTOR: usize = 1;

pub struct FileSystem {
    num_sectors: usize,
    free_map_file: OpenFile,
    directory_file: OpenFile,
}

impl FileSystem {
    /// format 为真时把磁盘初始化成空文件系统,
    /// 否则只是打开位图文件和根目录文件
    pub fn new(format: bool, num_sectors: usize) -> Self {
        info!("initializing the file system");
        if format {
            info!("formatting the file system");
            let mut free_map = FreeMap::new(num_sectors);
            let mut directory = Directory::new(NUM_DIR_ENTRIES);
            let mut map_hdr = FileHeader::new();
            let mut dir_hdr = FileHeader::new();

            // 先占住两个众所周知的文件头扇区
            free_map.set(FREE_MAP_SECTOR);
            free_map.set(DIRECTORY_SECTOR);

            let free_map_size = free_map.num_bytes();
            map_hdr
                .allocate(&mut free_map, free_map_size)
                .expect("no space for free map file");
            dir_hdr
                .allocate(&mut free_map, DIRECTORY_FILE_SIZE)
                .expect("no space for root directory file");

            // 文件头必须先落盘, open 是靠读文件头工作的
            map_hdr.write_back(FREE_MAP_SECTOR);
            dir_hdr.write_back(DIRECTORY_SECTOR);

            let free_map_file = OpenFile::new(FREE_MAP_SECTOR);
            let directory_file = OpenFile::new(DIRECTORY_SECTOR);

            free_map.write_back(&free_map_file);
            directory.write_back(&directory_file);

            Self {
                num_sectors,
                free_map_file,
                directory_file,
            }
        } else {
            Self {
                num_sectors,
                free_map_file: OpenFile::new(FREE_MAP_SECTOR),
                directory_file: OpenFile::new(DIRECTORY_SECTOR),
            }
        }
    }

    /// 建文件或子目录. 大小在创建时即告固定, 目录使用 DIRECTORY_FILE_SIZE.
    /// 任何一步失败都回滚: 清掉文件头扇区位, 摘除目录项, 归还数据扇区
    pub fn create(&self, path: &str, initial_size: usize, is_dir: bool) -> FsResult<()> {
        debug!("creating '{}' size {}", path, initial_size);
        let initial_size = if is_dir { DIRECTORY_FILE_SIZE } else { initial_size };

        let cur_dir_file = self.find_sub_directory(path)?;
        let name = Self::last_component(path)?;

        let mut directory = Directory::new(NUM_DIR_ENTRIES);
        directory.fetch_from(&cur_dir_file);
        if directory.find(name).is_some() {
            return Err(FsError::AlreadyExists);
        }

        let mut free_map = FreeMap::new(self.num_sectors);
        free_map.fetch_from(&self.free_map_file);

        // 给文件头留一个扇区
        let sector = free_map.find_and_set().ok_or(FsError::NoSpace)?;
        if let Err(err) = directory.add(name, sector, is_dir) {
            free_map.clear(sector);
            return Err(err);
        }

        let mut hdr = FileHeader::new();
        if let Err(err) = hdr.allocate(&mut free_map, initial_size) {
            hdr.deallocate(&mut free_map);
            free_map.clear(sector);
            directory
                .remove(name)
                .expect("entry added above must exist");
            return Err(err);
        }

        // 全部成功, 统一落盘
        hdr.write_back(sector);
        directory.write_back(&cur_dir_file);
        free_map.write_back(&self.free_map_file);
        Ok(())
    }

    /// 打开文件读写. 目录不可被 open
    pub fn open(&self, path: &str) -> FsResult<OpenFile> {
        debug!("opening '{}'", path);
        let cur_dir_file = self.find_sub_directory(path)?;
        let name = Self::last_component(path)?;

        let mut directory = Directory::new(NUM_DIR_ENTRIES);
        directory.fetch_from(&cur_dir_file);

        let sector = directory.find(name).ok_or(FsError::NotFound)?;
        if directory.is_dir(name) {
            return Err(FsError::IsADirectory);
        }
        Ok(OpenFile::new(sector))
    }

    /// 删除文件: 归还数据扇区与文件头扇区, 摘除目录项, 写回目录和位图
    pub fn remove(&self, path: &str) -> FsResult<()> {
        debug!("removing '{}'", path);
        let cur_dir_file = self.find_sub_directory(path)?;
        let name = Self::last_component(path)?;

        let mut directory = Directory::new(NUM_DIR_ENTRIES);
        directory.fetch_from(&cur_dir_file);

        let sector = directory.find(name).ok_or(FsError::NotFound)?;
        if directory.is_dir(name) {
            return Err(FsError::IsADirectory);
        }

        let mut hdr = FileHeader::fetch_from(sector);
        let mut free_map = FreeMap::new(self.num_sectors);
        free_map.fetch_from(&self.free_map_file);

        hdr.deallocate(&mut free_map);
        free_map.clear(sector);
        directory
            .remove(name)
            .expect("entry found above must exist");

        directory.write_back(&cur_dir_file);
        free_map.write_back(&self.free_map_file);
        Ok(())
    }

    /// 列出 path 指向目录的所有条目; path 指向文件时打印 "FILE <name>"
    pub fn list(&self, path: &str) -> FsResult<()> {
        debug!("listing '{}'", path);
        let sector = if path == "/" {
            DIRECTORY_SECTOR
        } else {
            let cur_dir_file = self.find_sub_directory(path)?;
            let name = Self::last_component(path)?;

            let mut directory = Directory::new(NUM_DIR_ENTRIES);
            directory.fetch_from(&cur_dir_file);
            let sector = directory.find(name).ok_or(FsError::NotFound)?;
            if !directory.is_dir(name) {
                println!("FILE {}", name);
                return Ok(());
            }
            sector
        };

        let dir_file = OpenFile::new(sector);
        let mut directory = Directory::new(NUM_DIR_ENTRIES);
        directory.fetch_from(&dir_file);
        directory.list();
        Ok(())
    }

    /// 打印文件系统元数据: 两个保留文件头, 位图和根目录内容
    pub fn print(&self) {
        println!("Bit map file header:");
        FileHeader::fetch_from(FREE_MAP_SECTOR).print();

        println!("Directory file header:");
        FileHeader::fetch_from(DIRECTORY_SECTOR).print();

        let mut free_map = FreeMap::new(self.num_sectors);
        free_map.fetch_from(&self.free_map_file);
        free_map.print();

        let mut directory = Directory::new(NUM_DIR_ENTRIES);
        directory.fetch_from(&self.directory_file);
        directory.print();
    }

    /// 打印单个文件的文件头与内容
    pub fn print_file(&self, path: &str) -> FsResult<()> {
        let cur_dir_file = self.find_sub_directory(path)?;
        let name = Self::last_component(path)?;

        let mut directory = Directory::new(NUM_DIR_ENTRIES);
        directory.fetch_from(&cur_dir_file);

        let sector = directory.find(name).ok_or(FsError::NotFound)?;
        if directory.is_dir(name) {
            return Err(FsError::IsADirectory);
        }
        FileHeader::fetch_from(sector).print();
        Ok(())
    }

    /// 沿路径逐级下降, 返回最后一个分量的父目录文件.
    /// 中间分量缺失或不是目录都是错误
    pub fn find_sub_directory(&self, path: &str) -> FsResult<OpenFile> {
        if !path.starts_with('/') {
            return Err(FsError::InvalidPath);
        }
        let components: Vec<&str> = path.split('/').filter(|c| !c.is_empty()).collect();
        if components.is_empty() {
            return Err(FsError::InvalidPath);
        }

        let mut sector = DIRECTORY_SECTOR;
        for component in &components[..components.len() - 1] {
            let dir_file = OpenFile::new(sector);
            let mut directory = Directory::new(NUM_DIR_ENTRIES);
            directory.fetch_from(&dir_file);

            sector = directory.find(component).ok_or(FsError::NotFound)?;
            if !directory.is_dir(component) {
                return Err(FsError::NotADirectory);
            }
        }
        Ok(OpenFile::new(sector))
    }

    fn last_component(path: &str) -> FsResult<&str> {
        let name = path
            .split('/')
            .filter(|c| !c.is_empty())
            .last()
            .ok_or(FsError::InvalidPath)?;
        if name.len() > FILE_NAME_MAX_LEN {
            return Err(FsError::NameTooLong);
        }
        Ok(name)
    }
}
