//! 可持久化的空闲扇区位图: 在通用位图之上
//! 增加了从文件读入/写回文件的能力

use std::ops::{Deref, DerefMut};

use super::open_file::OpenFile;
use crate::memory::Bitmap;

pub struct FreeMap {
    bitmap: Bitmap,
}

impl FreeMap {
    pub fn new(num_sectors: usize) -> Self {
        Self {
            bitmap: Bitmap::new(num_sectors),
        }
    }

    /// 从位图文件读入内容
    pub fn fetch_from(&mut self, file: &OpenFile) {
        let mut bytes = vec![0u8; self.bitmap.num_bytes()];
        let read = file.read_at(&mut bytes, 0);
        assert_eq!(read, bytes.len());
        self.bitmap.import(&bytes);
    }

    /// 把位图内容写回位图文件
    pub fn write_back(&self, file: &OpenFile) {
        let bytes = self.bitmap.export();
        let written = file.write_at(&bytes, 0);
        assert_eq!(written, bytes.len());
    }
}

impl Deref for FreeMap {
    type Target = Bitmap;

    fn deref(&self) -> &Self::Target {
        &self.bitmap
    }
}

impl DerefMut for FreeMap {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.bitmap
    }
}
