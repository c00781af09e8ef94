use serde::Deserialize;
use serde::Serialize;

use crate::capability::CapabilityId;
use crate::reconcile::NodeInfo;
use crate::report::CommandClass;
use crate::report::RawReport;
use crate::settings::Settings;

/// An event from the transport, addressed to one device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransportEvent {
    pub device: String,
    pub event: DeviceEvent,
}

/// Events a device reacts to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DeviceEvent {
    /// The node finished its interview and is ready for use
    Init {
        #[serde(default)]
        node: NodeInfo,
    },

    /// A report payload for one command class
    Report {
        command_class: CommandClass,
        report: RawReport,
    },

    /// The user changed settings. `changed_keys` defaults to the keys whose
    /// stored value differs.
    Settings {
        settings: Settings,
        #[serde(default)]
        changed_keys: Option<Vec<String>>,
    },

    /// The user pressed a maintenance button
    MaintenanceAction { button: CapabilityId },
}

impl DeviceEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Init { .. } => "init",
            Self::Report { .. } => "report",
            Self::Settings { .. } => "settings",
            Self::MaintenanceAction { .. } => "maintenance_action",
        }
    }
}
