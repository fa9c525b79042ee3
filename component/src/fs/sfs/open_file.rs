//! 打开文件: 持有读入内存的文件头和一个读写位置

use std::cell::Cell;

use super::super::{block_device, SECTOR_SIZE};
use super::header::FileHeader;

pub struct OpenFile {
    hdr: FileHeader,
    hdr_sector: usize,
    seek_position: Cell<usize>,
}

impl OpenFile {
    /// 打开文件头位于 sector 的文件
    pub fn new(sector: usize) -> Self {
        Self {
            hdr: FileHeader::fetch_from(sector),
            hdr_sector: sector,
            seek_position: Cell::new(0),
        }
    }

    pub fn length(&self) -> usize {
        self.hdr.file_length()
    }

    pub fn header_sector(&self) -> usize {
        self.hdr_sector
    }

    pub fn seek(&self, position: usize) {
        self.seek_position.set(position);
    }

    /// 从 position 处读 buf.len() 字节, 返回实际读到的字节数.
    /// 读过文件尾不是错误, 只是读到的字节变少 (可能为 0)
    pub fn read_at(&self, buf: &mut [u8], position: usize) -> usize {
        let file_length = self.length();
        if position >= file_length || buf.is_empty() {
            return 0;
        }
        let num_bytes = buf.len().min(file_length - position);

        let mut done = 0;
        while done < num_bytes {
            let offset = position + done;
            let sector = self.hdr.byte_to_sector(offset);
            let in_sector = offset % SECTOR_SIZE;
            let chunk = (SECTOR_SIZE - in_sector).min(num_bytes - done);
            block_device::read(sector, |data| {
                buf[done..done + chunk].copy_from_slice(&data[in_sector..in_sector + chunk]);
            });
            done += chunk;
        }
        done
    }

    /// 向 position 处写入字节, 返回实际写入的字节数.
    /// 文件大小在创建时已经固定, 超出部分被截断
    pub fn write_at(&self, bytes: &[u8], position: usize) -> usize {
        let file_length = self.length();
        if position >= file_length || bytes.is_empty() {
            return 0;
        }
        let num_bytes = bytes.len().min(file_length - position);

        let mut done = 0;
        while done < num_bytes {
            let offset = position + done;
            let sector = self.hdr.byte_to_sector(offset);
            let in_sector = offset % SECTOR_SIZE;
            let chunk = (SECTOR_SIZE - in_sector).min(num_bytes - done);
            block_device::modify(sector, |data| {
                data[in_sector..in_sector + chunk].copy_from_slice(&bytes[done..done + chunk]);
            });
            done += chunk;
        }
        done
    }

    /// 从当前位置读并推进位置
    pub fn read(&self, buf: &mut [u8]) -> usize {
        let result = self.read_at(buf, self.seek_position.get());
        self.seek_position.set(self.seek_position.get() + result);
        result
    }

    /// 向当前位置写并推进位置
    pub fn write(&self, bytes: &[u8]) -> usize {
        let result = self.write_at(bytes, self.seek_position.get());
        self.seek_position.set(self.seek_position.get() + result);
        result
    }
}
