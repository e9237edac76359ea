pub mod device_handle;

pub use device_handle::*;
