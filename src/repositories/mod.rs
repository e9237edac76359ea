mod device;
mod event;
mod reading;

pub use device::DeviceRepository;
pub use event::EventRepository;
pub use reading::ReadingRepository;
