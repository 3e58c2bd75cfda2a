mod device;
mod driver;
mod error;
mod header;
mod init;

pub use device::PCIDevice;
pub use driver::{register_driver, PCIDriver};
pub use error::PciError;
pub use header::{CommonHeader, Header};
pub use init::init_pcie;
