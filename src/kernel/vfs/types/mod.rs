mod device_id;
mod mode;

pub use device_id::DeviceId;
pub use mode::{Format, Mode, Permission};
