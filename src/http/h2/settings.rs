//! HTTP/2 settings management
//!
//! A typed view over the six standardized settings (RFC 7540 Section 6.5.2)
//! with wire apply/serialize. Unknown identifiers are ignored, not errored.

use super::error::{Error, Result};
use bytes::{BufMut, BytesMut};
use std::fmt;

/// Size of one settings record on the wire (16-bit id + 32-bit value)
const RECORD_SIZE: usize = 6;

/// HTTP/2 settings parameters (RFC 7540 Section 6.5.2)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum SettingsParameter {
    /// SETTINGS_HEADER_TABLE_SIZE (0x1)
    HeaderTableSize = 0x1,
    /// SETTINGS_ENABLE_PUSH (0x2)
    EnablePush = 0x2,
    /// SETTINGS_MAX_CONCURRENT_STREAMS (0x3)
    MaxConcurrentStreams = 0x3,
    /// SETTINGS_INITIAL_WINDOW_SIZE (0x4)
    InitialWindowSize = 0x4,
    /// SETTINGS_MAX_FRAME_SIZE (0x5)
    MaxFrameSize = 0x5,
    /// SETTINGS_MAX_HEADER_LIST_SIZE (0x6)
    MaxHeaderListSize = 0x6,
}

impl SettingsParameter {
    /// Convert to u16
    pub fn as_u16(self) -> u16 {
        self as u16
    }

    /// Get parameter name
    pub fn name(&self) -> &'static str {
        match self {
            SettingsParameter::HeaderTableSize => "HEADER_TABLE_SIZE",
            SettingsParameter::EnablePush => "ENABLE_PUSH",
            SettingsParameter::MaxConcurrentStreams => "MAX_CONCURRENT_STREAMS",
            SettingsParameter::InitialWindowSize => "INITIAL_WINDOW_SIZE",
            SettingsParameter::MaxFrameSize => "MAX_FRAME_SIZE",
            SettingsParameter::MaxHeaderListSize => "MAX_HEADER_LIST_SIZE",
        }
    }
}

impl fmt::Display for SettingsParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (0x{:x})", self.name(), self.as_u16())
    }
}

/// HTTP/2 settings
///
/// A fixed struct holding the current value for every standardized
/// identifier. Zero means "unlimited" for max_concurrent_streams and
/// max_header_list_size, matching the protocol defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settings {
    /// Header compression table size (default 4096)
    pub header_table_size: u32,
    /// Server push enabled (default true)
    pub enable_push: bool,
    /// Maximum concurrent streams, 0 = unlimited (default 0)
    pub max_concurrent_streams: u32,
    /// Initial stream flow-control window (default 65 535, max 2^31-1)
    pub initial_window_size: u32,
    /// Largest acceptable frame payload (default 16 384, range 16 384..2^24-1)
    pub max_frame_size: u32,
    /// Maximum header list size, 0 = unlimited (default 0)
    pub max_header_list_size: u32,
}

impl Settings {
    /// The protocol defaults of RFC 7540 Section 6.5.2
    pub fn protocol_defaults() -> Self {
        Settings {
            header_table_size: 4096,
            enable_push: true,
            max_concurrent_streams: 0,
            initial_window_size: 65_535,
            max_frame_size: 16_384,
            max_header_list_size: 0,
        }
    }

    /// The settings this server advertises
    pub fn server_defaults() -> Self {
        Settings {
            max_concurrent_streams: 100,
            ..Self::protocol_defaults()
        }
    }

    /// Set one identifier, bounds-checked
    ///
    /// Unknown identifiers are ignored per RFC 7540 Section 6.5.2.
    pub fn set(&mut self, id: u16, value: u32) -> Result<()> {
        match id {
            0x1 => self.header_table_size = value,
            0x2 => {
                self.enable_push = match value {
                    0 => false,
                    1 => true,
                    other => {
                        return Err(Error::Protocol(format!(
                            "SETTINGS_ENABLE_PUSH must be 0 or 1, got {}",
                            other
                        )))
                    }
                }
            }
            0x3 => self.max_concurrent_streams = value,
            0x4 => {
                if value > 0x7FFF_FFFF {
                    return Err(Error::FlowControl(format!(
                        "initial window size {} exceeds 2^31-1",
                        value
                    )));
                }
                self.initial_window_size = value;
            }
            0x5 => {
                if !(16_384..=16_777_215).contains(&value) {
                    return Err(Error::Protocol(format!(
                        "max frame size {} outside 16384..16777215",
                        value
                    )));
                }
                self.max_frame_size = value;
            }
            0x6 => self.max_header_list_size = value,
            _ => {}
        }
        Ok(())
    }

    /// Apply a SETTINGS frame payload
    ///
    /// The payload must be a whole number of 6-octet records.
    pub fn apply(&mut self, payload: &[u8]) -> Result<()> {
        if payload.len() % RECORD_SIZE != 0 {
            return Err(Error::FrameSize(format!(
                "SETTINGS payload length {} is not a multiple of 6",
                payload.len()
            )));
        }

        for record in payload.chunks_exact(RECORD_SIZE) {
            let id = u16::from_be_bytes([record[0], record[1]]);
            let value = u32::from_be_bytes([record[2], record[3], record[4], record[5]]);
            self.set(id, value)?;
        }

        Ok(())
    }

    /// Serialize only the identifiers that differ from the protocol defaults
    pub fn serialize_non_defaults(&self, dst: &mut BytesMut) {
        let defaults = Settings::protocol_defaults();

        let mut put = |param: SettingsParameter, value: u32| {
            dst.put_u16(param.as_u16());
            dst.put_u32(value);
        };

        if self.header_table_size != defaults.header_table_size {
            put(SettingsParameter::HeaderTableSize, self.header_table_size);
        }
        if self.enable_push != defaults.enable_push {
            put(SettingsParameter::EnablePush, self.enable_push as u32);
        }
        if self.max_concurrent_streams != defaults.max_concurrent_streams {
            put(
                SettingsParameter::MaxConcurrentStreams,
                self.max_concurrent_streams,
            );
        }
        if self.initial_window_size != defaults.initial_window_size {
            put(SettingsParameter::InitialWindowSize, self.initial_window_size);
        }
        if self.max_frame_size != defaults.max_frame_size {
            put(SettingsParameter::MaxFrameSize, self.max_frame_size);
        }
        if self.max_header_list_size != defaults.max_header_list_size {
            put(SettingsParameter::MaxHeaderListSize, self.max_header_list_size);
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Settings::protocol_defaults()
    }
}
