pub mod capability;
pub mod config;
pub mod device;
pub mod engine;
pub mod host;
pub mod maintenance;
pub mod policy;
pub mod reconcile;
pub mod report;
pub mod scene;
pub mod settings;
pub mod variant;

pub use capability::CapabilityId;
pub use capability::CapabilitySet;
pub use capability::CapabilityValue;
pub use config::Config;
pub use config::LogLevel;
pub use device::DeviceError;
pub use device::SettingsMessage;
pub use device::StripsDevice;
pub use engine::DeviceEvent;
pub use engine::Driver;
pub use engine::TransportEvent;
pub use host::HostError;
pub use host::HostServices;
pub use policy::compute_capabilities;
pub use reconcile::NodeInfo;
pub use settings::Settings;
pub use variant::DeviceVariant;
