//! Serial transport capability layer.
//!
//! The discovery engine consumes ports through the `SerialPortAdapter` and
//! `PortOpener` traits; `SyncSerialPort`/`SystemPortOpener` back them with
//! real hardware and `MockSerialPort`/`MockPortOpener` with scripted state
//! for tests.

mod error;
mod mock;
mod sync_port;
mod traits;

pub use error::PortError;
pub use mock::{MockPortOpener, MockSerialPort};
pub use sync_port::{SyncSerialPort, SystemPortOpener};
pub use traits::{PortOpener, SerialPortAdapter};

use serde::Serialize;

/// One enumerated serial port, with whatever identity the OS exposes.
#[derive(Debug, Clone, Serialize)]
pub struct PortListing {
    /// System name, e.g. `/dev/ttyUSB0` or `COM3`.
    pub name: String,
    /// Human-readable product description, when known.
    pub description: String,
    /// Hardware identity (USB VID/PID), when known.
    pub hardware_id: String,
}

/// Enumerate the serial ports present on this system, sorted by name.
///
/// Used by the CLI when the caller does not name candidate ports explicitly.
pub fn list_candidate_ports() -> Result<Vec<PortListing>, PortError> {
    let mut out = Vec::new();
    for info in serialport::available_ports()? {
        let (description, hardware_id) = match info.port_type {
            serialport::SerialPortType::UsbPort(usb) => (
                usb.product.unwrap_or_default(),
                format!("USB VID:{:04x} PID:{:04x}", usb.vid, usb.pid),
            ),
            serialport::SerialPortType::PciPort => ("PCI device".to_string(), String::new()),
            serialport::SerialPortType::BluetoothPort => {
                ("Bluetooth device".to_string(), String::new())
            }
            serialport::SerialPortType::Unknown => (String::new(), String::new()),
        };
        out.push(PortListing {
            name: info.port_name,
            description,
            hardware_id,
        });
    }
    out.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(out)
}
