use std::io::{ErrorKind, Read, Write};
use std::time::Duration;

use serialport::SerialPort;
use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::traits::{ReadOutcome, Transport, WriteOutcome};

/// Default serial baud rate.
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Serial parity mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Parity {
    #[default]
    None,
    Even,
    Odd,
}

impl From<Parity> for serialport::Parity {
    fn from(parity: Parity) -> Self {
        match parity {
            Parity::None => serialport::Parity::None,
            Parity::Even => serialport::Parity::Even,
            Parity::Odd => serialport::Parity::Odd,
        }
    }
}

/// Number of stop bits per character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StopBits {
    #[default]
    One,
    Two,
}

impl From<StopBits> for serialport::StopBits {
    fn from(stop_bits: StopBits) -> Self {
        match stop_bits {
            StopBits::One => serialport::StopBits::One,
            StopBits::Two => serialport::StopBits::Two,
        }
    }
}

/// Serial line settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialConfig {
    /// Port identifier as given by the user (`3`, `COM3`, `/dev/ttyUSB0`, ...).
    pub port: String,
    pub baud_rate: u32,
    pub parity: Parity,
    pub stop_bits: StopBits,
}

impl SerialConfig {
    pub fn new(port: impl Into<String>) -> Self {
        Self {
            port: port.into(),
            baud_rate: DEFAULT_BAUD_RATE,
            parity: Parity::default(),
            stop_bits: StopBits::default(),
        }
    }

    /// Resolved device path for this platform.
    pub fn device_name(&self) -> String {
        serial_device_name(&self.port)
    }
}

/// Map a user-supplied port identifier to a platform device name.
///
/// Full paths and `COM*` names are used verbatim. A bare identifier becomes
/// `COM<id>` on Windows and `/dev/tty<id>` elsewhere.
pub fn serial_device_name(port: &str) -> String {
    let verbatim = port.contains('/')
        || port.contains('\\')
        || port.to_ascii_uppercase().starts_with("COM");
    if verbatim {
        return port.to_string();
    }
    if cfg!(windows) {
        format!("COM{port}")
    } else {
        format!("/dev/tty{port}")
    }
}

/// Serial line transport with zero-timeout reads.
pub struct SerialPortTransport {
    config: SerialConfig,
    port: Option<Box<dyn SerialPort>>,
}

impl SerialPortTransport {
    pub fn new(config: SerialConfig) -> Self {
        Self { config, port: None }
    }

    fn port_mut(&mut self) -> Result<&mut Box<dyn SerialPort>> {
        self.port.as_mut().ok_or(TransportError::NotOpen)
    }
}

fn is_idle(kind: ErrorKind) -> bool {
    matches!(
        kind,
        ErrorKind::WouldBlock | ErrorKind::TimedOut | ErrorKind::Interrupted
    )
}

impl Transport for SerialPortTransport {
    fn open(&mut self) -> Result<()> {
        let device = self.config.device_name();
        let port = serialport::new(device.as_str(), self.config.baud_rate)
            .data_bits(serialport::DataBits::Eight)
            .parity(self.config.parity.into())
            .stop_bits(self.config.stop_bits.into())
            .flow_control(serialport::FlowControl::None)
            .timeout(Duration::ZERO)
            .open()
            .map_err(|source| TransportError::Serial {
                port: device.clone(),
                source,
            })?;

        info!(
            port = %device,
            baud_rate = self.config.baud_rate,
            parity = ?self.config.parity,
            stop_bits = ?self.config.stop_bits,
            "serial port opened"
        );
        self.port = Some(port);
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<ReadOutcome> {
        let port = self.port_mut()?;
        match port.read(buf) {
            Ok(0) => Ok(ReadOutcome::WouldBlock),
            Ok(n) => Ok(ReadOutcome::Data(n)),
            Err(err) if is_idle(err.kind()) => Ok(ReadOutcome::WouldBlock),
            Err(err) => Err(TransportError::Io(err)),
        }
    }

    fn write(&mut self, data: &[u8]) -> Result<WriteOutcome> {
        let port = self.port_mut()?;
        match port.write(data) {
            Ok(0) => Ok(WriteOutcome::WouldBlock),
            Ok(n) => Ok(WriteOutcome::Written(n)),
            Err(err) if is_idle(err.kind()) => Ok(WriteOutcome::WouldBlock),
            Err(err) => Err(TransportError::Io(err)),
        }
    }

    fn close(&mut self) -> Result<()> {
        if self.port.take().is_some() {
            debug!(port = %self.config.device_name(), "serial port closed");
        }
        Ok(())
    }

    fn describe(&self) -> String {
        format!(
            "serial://{}@{}",
            self.config.device_name(),
            self.config.baud_rate
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_paths_are_used_verbatim() {
        assert_eq!(serial_device_name("/dev/ttyACM0"), "/dev/ttyACM0");
        assert_eq!(serial_device_name("COM7"), "COM7");
        assert_eq!(serial_device_name(r"\\.\COM12"), r"\\.\COM12");
    }

    #[test]
    #[cfg(not(windows))]
    fn bare_identifier_maps_to_tty() {
        assert_eq!(serial_device_name("USB0"), "/dev/ttyUSB0");
    }

    #[test]
    #[cfg(windows)]
    fn bare_identifier_maps_to_com() {
        assert_eq!(serial_device_name("4"), "COM4");
    }

    #[test]
    fn config_defaults() {
        let config = SerialConfig::new("/dev/ttyS0");
        assert_eq!(config.baud_rate, 115_200);
        assert_eq!(config.parity, Parity::None);
        assert_eq!(config.stop_bits, StopBits::One);
    }

    #[test]
    fn line_settings_map_to_backend() {
        assert_eq!(
            serialport::Parity::from(Parity::Odd),
            serialport::Parity::Odd
        );
        assert_eq!(
            serialport::StopBits::from(StopBits::Two),
            serialport::StopBits::Two
        );
    }

    #[test]
    fn io_before_open_is_not_open() {
        let mut transport = SerialPortTransport::new(SerialConfig::new("/dev/ttyS0"));
        let mut buf = [0u8; 4];
        assert!(matches!(
            transport.read(&mut buf),
            Err(TransportError::NotOpen)
        ));
        assert!(matches!(
            transport.write(b"x"),
            Err(TransportError::NotOpen)
        ));
    }

    #[test]
    #[cfg(unix)]
    fn missing_device_is_fatal() {
        let mut transport =
            SerialPortTransport::new(SerialConfig::new("/dev/sdsio-missing-device"));
        assert!(matches!(
            transport.open(),
            Err(TransportError::Serial { .. })
        ));
    }

    #[test]
    fn describe_includes_device_and_baud() {
        let mut config = SerialConfig::new("/dev/ttyUSB1");
        config.baud_rate = 921_600;
        let transport = SerialPortTransport::new(config);
        assert_eq!(transport.describe(), "serial:///dev/ttyUSB1@921600");
    }
}
