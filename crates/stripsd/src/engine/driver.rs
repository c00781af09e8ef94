use std::collections::BTreeMap;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;
use tracing::info;
use tracing::warn;

use super::event::DeviceEvent;
use super::event::TransportEvent;
use crate::device::DeviceError;
use crate::device::SettingsMessage;
use crate::device::StripsDevice;

/// Capacity for the transport→driver event channel
/// Provides backpressure when the transport sends faster than devices handle events
const TRANSPORT_CHANNEL_SIZE: usize = 256;

pub type TransportSender = mpsc::Sender<TransportEvent>;
type TransportReceiver = mpsc::Receiver<TransportEvent>;

#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    #[error("no device registered as {0}")]
    UnknownDevice(String),

    #[error("device {device} failed to handle {event} event: {source}")]
    Device {
        device: String,
        event: &'static str,
        #[source]
        source: DeviceError,
    },
}

/// Strips driver
///
/// Owns every device and feeds transport events to them one at a time, so a
/// device never sees a report while it is still reconciling capabilities.
pub struct Driver {
    devices: BTreeMap<String, StripsDevice>,

    /// Receive events from the transport
    events_rx: TransportReceiver,

    /// Flow triggers still in flight
    scene_tasks: Vec<JoinHandle<()>>,
}

impl Driver {
    /// Create a driver and the sender the transport uses to reach it
    pub fn new() -> (Self, TransportSender) {
        let (events_tx, events_rx) = mpsc::channel(TRANSPORT_CHANNEL_SIZE);
        let driver = Self {
            devices: BTreeMap::new(),
            events_rx,
            scene_tasks: Vec::new(),
        };
        (driver, events_tx)
    }

    /// Register a device. A device with the same id is replaced.
    pub fn add_device(&mut self, device: StripsDevice) {
        info!(device = %device.id(), variant = %device.variant(), "device added");
        self.devices.insert(device.id().to_string(), device);
    }

    pub fn device(&self, id: &str) -> Option<&StripsDevice> {
        self.devices.get(id)
    }

    pub fn devices(&self) -> impl Iterator<Item = &StripsDevice> {
        self.devices.values()
    }

    /// Run the driver's main event loop
    ///
    /// Returns once every sender is dropped. Failures are logged per event
    /// and never stop the loop.
    pub async fn run(&mut self) {
        info!(devices = self.devices.len(), "Driver starting");

        while let Some(event) = self.events_rx.recv().await {
            let device = event.device.clone();
            match self.handle_event(event).await {
                Ok(Some(message)) => info!(device = %device, %message, "settings message"),
                Ok(None) => {}
                Err(e) => warn!("Error handling event: {}", e),
            }
        }

        info!("Driver shutting down");
    }

    /// Deliver one event to its device
    ///
    /// Returns the user-facing message of a settings update, if any.
    pub async fn handle_event(
        &mut self,
        event: TransportEvent,
    ) -> Result<Option<SettingsMessage>, DriverError> {
        let TransportEvent { device: id, event } = event;
        let kind = event.kind();
        let device = self
            .devices
            .get_mut(&id)
            .ok_or_else(|| DriverError::UnknownDevice(id.clone()))?;
        debug!(device = %id, event = kind, "handling event");

        let result = match event {
            DeviceEvent::Init { node } => device.on_init(node).await.map(|()| None),
            DeviceEvent::Report {
                command_class,
                report,
            } => match device.handle_report(command_class, &report).await {
                Ok(outcome) => {
                    self.scene_tasks.extend(outcome.scene);
                    Ok(None)
                }
                Err(e) => Err(e),
            },
            DeviceEvent::Settings {
                settings,
                changed_keys,
            } => device.apply_settings(settings, changed_keys).await,
            DeviceEvent::MaintenanceAction { button } => {
                device.run_maintenance_action(&button).await.map(|()| None)
            }
        };

        self.scene_tasks.retain(|task| !task.is_finished());

        result.map_err(|source| DriverError::Device {
            device: id,
            event: kind,
            source,
        })
    }

    /// Wait for every flow trigger spawned so far
    pub async fn drain_scene_tasks(&mut self) {
        for task in self.scene_tasks.drain(..) {
            if let Err(e) = task.await {
                warn!("Scene task failed: {}", e);
            }
        }
    }
}

impl std::fmt::Debug for Driver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Driver")
            .field("devices", &self.devices.keys().collect::<Vec<_>>())
            .field("scene_tasks", &self.scene_tasks.len())
            .finish()
    }
}
