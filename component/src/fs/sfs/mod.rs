//! 扇区级文件系统
//!
//! 磁盘布局: 0 号扇区放空闲扇区位图文件的文件头, 1 号扇区放根目录的文件头,
//! 其余扇区由位图统一管理. 位图和根目录本身都是普通文件,
//! 文件系统在运行期间始终保持这两个文件打开

pub mod directory;
pub mod error;
pub mod filesystem;
pub mod freemap;
pub mod header;
pub mod open_file;

pub use directory::{Directory, DIRECTORY_FILE_SIZE, FILE_NAME_MAX_LEN, NUM_DIR_ENTRIES};
pub use error::{FsError, FsResult};
pub use filesystem::{FileSystem, DIRECTORY_SECTOR, FREE_MAP_SECTOR};
pub use freemap::FreeMap;
pub use header::{FileHeader, MAX_FILE_SIZE, NUM_DIRECT};
pub use open_file::OpenFile;
