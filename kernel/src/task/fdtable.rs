//! 每线程的打开文件表, 容量固定, 下标即用户文件描述符

use component::fs::sfs::OpenFile;
use sys_interface::config::MAX_OPEN_FILES;

pub struct FdTable {
    slots: Vec<Option<OpenFile>>,
}

impl Default for FdTable {
    fn default() -> Self {
        Self {
            slots: (0..MAX_OPEN_FILES).map(|_| None).collect(),
        }
    }
}

impl FdTable {
    /// 占用最小可用下标, 表满返回 None
    pub fn add(&mut self, file: OpenFile) -> Option<usize> {
        let fd = self.slots.iter().position(|slot| slot.is_none())?;
        self.slots[fd] = Some(file);
        Some(fd)
    }

    /// 关闭并释放槽位, fd 非法或未占用返回 false
    pub fn remove(&mut self, fd: i32) -> bool {
        if fd < 0 || fd as usize >= MAX_OPEN_FILES {
            return false;
        }
        self.slots[fd as usize].take().is_some()
    }

    pub fn get(&self, fd: i32) -> Option<&OpenFile> {
        if fd < 0 || fd as usize >= MAX_OPEN_FILES {
            return None;
        }
        self.slots[fd as usize].as_ref()
    }

    pub fn clear(&mut self) {
        for slot in self.slots.iter_mut() {
            *slot = None;
        }
    }
}
