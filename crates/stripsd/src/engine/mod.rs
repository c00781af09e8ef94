mod driver;
mod event;

pub use driver::Driver;
pub use driver::DriverError;
pub use driver::TransportSender;
pub use event::DeviceEvent;
pub use event::TransportEvent;
