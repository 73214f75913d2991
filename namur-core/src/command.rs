//! NAMUR command vocabulary and line framing
//!
//! A command on the wire is a sequence of uppercase ASCII tokens joined by
//! single spaces and terminated by CRLF. Responses carry no length prefix or
//! checksum; they are decoded leniently as ASCII and trimmed.

use crate::{NamurError, Result};
use std::fmt;

/// Line terminator appended to every outgoing command
pub const LINE_TERMINATOR: &str = "\r\n";

/// Commands of the NAMUR subset spoken by the heater-stirrer
///
/// Channel 4 is the stirring motor, channel 1 the hotplate setpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Query device identity (`IN_NAME`)
    ReadName,
    /// Query measured stirring speed (`IN_PV_4`)
    ReadSpeed,
    /// Query commanded stirring speed (`IN_SP_4`)
    ReadSpeedSetpoint,
    /// Set stirring speed setpoint in RPM (`OUT_SP_4 <rpm>`)
    SetSpeed(i64),
    /// Enable the stirring motor (`START_4`)
    Start,
    /// Disable the stirring motor (`STOP_4`)
    Stop,
    /// Set temperature setpoint in degrees (`OUT_SP_1 <temp>`)
    SetTemperature(i64),
    /// Enable heating (`START_1`)
    StartHeating,
}

impl Command {
    /// NAMUR keyword for this command
    pub fn keyword(&self) -> &'static str {
        match self {
            Command::ReadName => "IN_NAME",
            Command::ReadSpeed => "IN_PV_4",
            Command::ReadSpeedSetpoint => "IN_SP_4",
            Command::SetSpeed(_) => "OUT_SP_4",
            Command::Start => "START_4",
            Command::Stop => "STOP_4",
            Command::SetTemperature(_) => "OUT_SP_1",
            Command::StartHeating => "START_1",
        }
    }

    /// Tokens sent for this command, keyword first
    pub fn tokens(&self) -> Vec<String> {
        let mut tokens = vec![self.keyword().to_string()];
        match self {
            Command::SetSpeed(value) | Command::SetTemperature(value) => {
                tokens.push(value.to_string());
            }
            _ => {}
        }
        tokens
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tokens().join(" "))
    }
}

/// Build the wire bytes for a command line
///
/// Tokens are uppercased and joined with single spaces, then CRLF is appended.
/// Rejects an empty token list, tokens containing CR or LF, and non-ASCII text.
pub fn frame_command<S: AsRef<str>>(tokens: &[S]) -> Result<Vec<u8>> {
    if tokens.is_empty() {
        return Err(NamurError::InvalidInput(
            "Command requires at least one token".to_string(),
        ));
    }

    for token in tokens {
        let token = token.as_ref();
        if token.contains(['\r', '\n']) {
            return Err(NamurError::InvalidInput(format!(
                "Token contains a line terminator: {:?}",
                token
            )));
        }
        if !token.is_ascii() {
            return Err(NamurError::InvalidInput(format!(
                "Token is not ASCII: {:?}",
                token
            )));
        }
    }

    let line = tokens
        .iter()
        .map(|t| t.as_ref())
        .collect::<Vec<_>>()
        .join(" ")
        .to_ascii_uppercase();

    let mut payload = line.into_bytes();
    payload.extend_from_slice(LINE_TERMINATOR.as_bytes());
    Ok(payload)
}

/// Decode a raw response: non-ASCII bytes are dropped, whitespace trimmed
pub fn decode_response(raw: &[u8]) -> String {
    let text: String = raw
        .iter()
        .filter(|b| b.is_ascii())
        .map(|&b| b as char)
        .collect();
    text.trim().to_string()
}
