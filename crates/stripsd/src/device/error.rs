use crate::capability::CapabilityId;
use crate::host::HostError;

#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    #[error(transparent)]
    Host(#[from] HostError),

    #[error("no maintenance action registered for {0}")]
    UnknownAction(CapabilityId),
}
