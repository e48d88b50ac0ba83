pub mod async_dir_save_repository;
pub mod config_service;
pub mod memory_fs;
pub mod memory_save_repository;
pub mod paths;
pub mod storage;

pub use crate::async_dir_save_repository::AsyncDirSaveRepository;
pub use crate::config_service::ConfigService;
pub use crate::memory_fs::MemoryVirtualFs;
pub use crate::memory_save_repository::MemorySaveRepository;
pub use crate::paths::GbaPaths;
