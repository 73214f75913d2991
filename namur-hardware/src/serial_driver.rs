//! Serial driver for low-level NAMUR communication
//!
//! The NAMUR link has no acknowledgement, no length prefix and no checksum. A
//! command is a CRLF-terminated ASCII line; the reply is whatever the device
//! sends back before the line goes quiet. Exchanges here are blocking and are
//! expected to run on a worker thread (see `HeaterStirrer`).

use namur_core::{decode_response, frame_command, Command, NamurError, Result, SerialSettings};
use std::io;
use std::thread;
use std::time::Instant;
use tokio_serial::SerialPort;
use tracing::{debug, error, trace, warn};

/// Size of a single read from the port
const READ_CHUNK: usize = 256;

/// Byte-level access to an open serial session
///
/// Implemented for real ports by `NativeLink`; tests substitute scripted links.
pub trait SerialLink: Send {
    /// Write the whole buffer to the port
    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()>;

    /// Flush pending output
    fn flush(&mut self) -> io::Result<()>;

    /// Number of bytes waiting in the input buffer
    fn bytes_available(&mut self) -> io::Result<usize>;

    /// Read up to `buf.len()` bytes
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Discard any unread input
    fn clear_input(&mut self) -> io::Result<()>;
}

/// Opens serial sessions for a `NamurClient`
pub trait PortOpener: Send {
    fn open(&self, settings: &SerialSettings) -> Result<Box<dyn SerialLink>>;
}

/// `SerialLink` over an OS serial port
pub struct NativeLink(Box<dyn SerialPort>);

impl SerialLink for NativeLink {
    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        io::Write::write_all(&mut self.0, bytes)
    }

    fn flush(&mut self) -> io::Result<()> {
        io::Write::flush(&mut self.0)
    }

    fn bytes_available(&mut self) -> io::Result<usize> {
        self.0
            .bytes_to_read()
            .map(|n| n as usize)
            .map_err(io::Error::from)
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        io::Read::read(&mut self.0, buf)
    }

    fn clear_input(&mut self) -> io::Result<()> {
        self.0
            .clear(tokio_serial::ClearBuffer::Input)
            .map_err(io::Error::from)
    }
}

/// Opens OS serial ports with NAMUR framing (7 data bits, even parity, 1 stop bit)
#[derive(Debug, Default, Clone, Copy)]
pub struct NativePortOpener;

impl PortOpener for NativePortOpener {
    fn open(&self, settings: &SerialSettings) -> Result<Box<dyn SerialLink>> {
        debug!(
            "Opening serial port: {} @ {} baud (7E1)",
            settings.port, settings.baud_rate
        );

        let port = tokio_serial::new(settings.port.as_str(), settings.baud_rate)
            .timeout(settings.write_timeout())
            .data_bits(tokio_serial::DataBits::Seven)
            .parity(tokio_serial::Parity::Even)
            .stop_bits(tokio_serial::StopBits::One)
            .flow_control(tokio_serial::FlowControl::None)
            .open()
            .map_err(|e| {
                error!("Failed to open serial port {}: {}", settings.port, e);
                NamurError::Connection(format!(
                    "Failed to open serial port {}: {}",
                    settings.port, e
                ))
            })?;

        Ok(Box::new(NativeLink(port)))
    }
}

/// Command/response exchanges with a NAMUR device
///
/// The convenience methods map one-to-one onto the NAMUR vocabulary and
/// return the device's raw reply text.
pub trait NamurTransport: Send + 'static {
    /// Open the session if it is not already open
    fn open(&mut self) -> Result<()>;

    /// Release the session if open
    fn close(&mut self);

    /// Check whether a session is currently held
    fn is_open(&self) -> bool;

    /// Send one command line built from `tokens` and collect the reply
    fn send(&mut self, tokens: &[&str]) -> Result<String>;

    /// Send a vocabulary command
    fn execute(&mut self, command: Command) -> Result<String> {
        let tokens = command.tokens();
        let refs: Vec<&str> = tokens.iter().map(String::as_str).collect();
        self.send(&refs)
    }

    fn read_name(&mut self) -> Result<String> {
        self.execute(Command::ReadName)
    }

    fn read_speed(&mut self) -> Result<String> {
        self.execute(Command::ReadSpeed)
    }

    fn read_speed_setpoint(&mut self) -> Result<String> {
        self.execute(Command::ReadSpeedSetpoint)
    }

    fn set_speed(&mut self, rpm: i64) -> Result<String> {
        self.execute(Command::SetSpeed(rpm))
    }

    fn start(&mut self) -> Result<String> {
        self.execute(Command::Start)
    }

    fn stop(&mut self) -> Result<String> {
        self.execute(Command::Stop)
    }

    fn set_temperature(&mut self, degrees: i64) -> Result<String> {
        self.execute(Command::SetTemperature(degrees))
    }

    fn start_heating(&mut self) -> Result<String> {
        self.execute(Command::StartHeating)
    }
}

/// Blocking NAMUR client owning at most one serial session
pub struct NamurClient<O: PortOpener = NativePortOpener> {
    settings: SerialSettings,
    opener: O,
    session: Option<Box<dyn SerialLink>>,
}

impl NamurClient<NativePortOpener> {
    /// Create a client for a real serial port. The port is opened lazily.
    pub fn new(settings: SerialSettings) -> Self {
        Self::with_opener(settings, NativePortOpener)
    }
}

impl<O: PortOpener> NamurClient<O> {
    /// Create a client with a custom session opener
    pub fn with_opener(settings: SerialSettings, opener: O) -> Self {
        Self {
            settings,
            opener,
            session: None,
        }
    }

    pub fn settings(&self) -> &SerialSettings {
        &self.settings
    }

    /// Open a session, run `f`, and close the session whatever the outcome
    pub fn scoped<R>(mut self, f: impl FnOnce(&mut Self) -> Result<R>) -> Result<R> {
        self.open_session()?;
        let result = f(&mut self);
        self.close_session();
        result
    }

    fn open_session(&mut self) -> Result<()> {
        if self.session.is_some() {
            return Ok(());
        }

        let link = self.opener.open(&self.settings)?;
        self.session = Some(link);
        debug!("Serial session open on {}", self.settings.port);

        thread::sleep(self.settings.open_settle());
        Ok(())
    }

    fn close_session(&mut self) {
        if self.session.take().is_some() {
            debug!("Serial session closed on {}", self.settings.port);
        }
    }

    /// Keep draining until the deadline has passed and nothing is pending
    fn read_until_quiet(link: &mut dyn SerialLink, settings: &SerialSettings) -> Result<Vec<u8>> {
        let mut response = Vec::new();
        let mut chunk = [0u8; READ_CHUNK];
        let deadline = Instant::now() + settings.timeout();

        loop {
            let available = link.bytes_available()?;

            if available == 0 {
                if Instant::now() >= deadline {
                    break;
                }
                thread::sleep(settings.poll_interval());
                continue;
            }

            let want = available.min(READ_CHUNK);
            let n = link.read(&mut chunk[..want])?;
            trace!("Read {} byte(s)", n);
            response.extend_from_slice(&chunk[..n]);
        }

        Ok(response)
    }
}

impl<O: PortOpener + 'static> NamurTransport for NamurClient<O> {
    fn open(&mut self) -> Result<()> {
        self.open_session()
    }

    fn close(&mut self) {
        self.close_session()
    }

    fn is_open(&self) -> bool {
        self.session.is_some()
    }

    fn send(&mut self, tokens: &[&str]) -> Result<String> {
        let payload = frame_command(tokens)?;

        self.open_session()?;
        let settings = &self.settings;
        let link = self
            .session
            .as_deref_mut()
            .ok_or_else(|| NamurError::Connection("Serial session not open".to_string()))?;

        debug!("TX: {:?}", String::from_utf8_lossy(&payload));

        link.clear_input().map_err(|e| {
            warn!("Failed to clear input buffer: {}", e);
            NamurError::Io(e)
        })?;

        link.write_all(&payload)
            .and_then(|_| link.flush())
            .map_err(|e| {
                error!("Write failed: {}", e);
                NamurError::Io(e)
            })?;

        thread::sleep(settings.response_settle());

        let raw = Self::read_until_quiet(link, settings).map_err(|e| {
            error!("Read failed: {}", e);
            e
        })?;

        let response = decode_response(&raw);
        debug!("RX: {:?}", response);
        Ok(response)
    }
}

/// Open a client on `settings`, run `f`, and always close the session
pub fn with_client<R>(
    settings: SerialSettings,
    f: impl FnOnce(&mut NamurClient) -> Result<R>,
) -> Result<R> {
    NamurClient::new(settings).scoped(f)
}

/// Serial port visible to the operating system
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortInfo {
    /// Port name (e.g. "/dev/ttyUSB0" or "COM7")
    pub name: String,
    /// USB vendor ID, for USB adapters
    pub vid: Option<u16>,
    /// USB product ID, for USB adapters
    pub pid: Option<u16>,
    /// Product string reported by the adapter
    pub product: Option<String>,
}

/// List serial ports the device could be attached to
pub fn list_ports() -> Result<Vec<PortInfo>> {
    let ports = tokio_serial::available_ports().map_err(|e| {
        error!("Failed to enumerate serial ports: {}", e);
        NamurError::Connection(format!("Failed to enumerate ports: {}", e))
    })?;

    let mut infos: Vec<PortInfo> = ports
        .into_iter()
        .map(|port| match port.port_type {
            tokio_serial::SerialPortType::UsbPort(info) => PortInfo {
                name: port.port_name,
                vid: Some(info.vid),
                pid: Some(info.pid),
                product: info.product,
            },
            _ => PortInfo {
                name: port.port_name,
                vid: None,
                pid: None,
                product: None,
            },
        })
        .collect();

    infos.sort_by(|a, b| a.name.cmp(&b.name));
    debug!("Found {} serial port(s)", infos.len());
    Ok(infos)
}
