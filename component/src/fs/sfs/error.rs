use std::fmt;

/// 文件系统各层统一的错误类型.
/// 系统调用层会把它压平成 -1 哨兵值
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsError {
    /// 路径分量或文件不存在
    NotFound,
    /// 同名文件已存在
    AlreadyExists,
    /// 路径中间分量不是目录
    NotADirectory,
    /// 对目录做了只能对文件做的操作
    IsADirectory,
    /// 分量超出 FILE_NAME_MAX_LEN
    NameTooLong,
    /// 路径没有以 '/' 开头, 或没有分量
    InvalidPath,
    /// 空闲扇区不足
    NoSpace,
    /// 目录表没有空槽
    NoDirectorySlot,
}

impl fmt::Display for FsError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let reason = match self {
            FsError::NotFound => "not found",
            FsError::AlreadyExists => "already exists",
            FsError::NotADirectory => "not a directory",
            FsError::IsADirectory => "is a directory",
            FsError::NameTooLong => "name too long",
            FsError::InvalidPath => "invalid path",
            FsError::NoSpace => "no free sectors",
            FsError::NoDirectorySlot => "no free directory slot",
        };
        write!(f, "{}", reason)
    }
}

pub type FsResult<T> = Result<T, FsError>;
