//! Hardware integration: pin access, edge detection and actuation.
//!
//! Core components:
//! - `pins`: `PinIo` collaborator trait + `SimulatedPins` for development
//! - `events`: `EventKind` and `PinRole` classification
//! - `callbacks`: one handler per event kind
//! - `monitor`: the polling loop and actuation (`HardwareMonitor`)

pub mod callbacks;
pub mod events;
pub mod monitor;
pub mod pins;

pub use callbacks::{CallbackRegistry, EventHandler};
pub use events::{EventKind, PinRole};
pub use monitor::{HardwareMonitor, MonitorStatus, PinState};
pub use pins::{PinIo, PinMode, SimulatedPins};
