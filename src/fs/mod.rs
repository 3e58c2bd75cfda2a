pub mod ext4;
pub mod fat32;
pub mod lofs;
pub mod procfs;
pub mod tmpfs;
