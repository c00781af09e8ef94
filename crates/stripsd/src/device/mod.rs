// Private module - allowed by clippy.toml allow-private-module-inception
#[allow(clippy::module_inception)]
mod device;
mod error;


pub use device::ReportOutcome;
pub use device::SettingsMessage;
pub use device::StripsDevice;
pub use error::DeviceError;
