//! Access to attached display monitors over DDC/CI.
//!
//! The [`Transport`] trait is the only way the rest of the crate talks to the
//! platform. Everything above it works against monitor handles it hands out.

use crate::error::TransportError;

#[cfg(windows)]
mod windows;

#[cfg(windows)]
pub use self::windows::{Monitor, WindowsTransport as PlatformTransport};

#[cfg(not(windows))]
pub use self::unsupported::{Monitor, UnsupportedTransport as PlatformTransport};

/// Identity of a display monitor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MonitorInfo {
    pub name: String,
    pub primary: bool,
}

impl Default for MonitorInfo {
    fn default() -> MonitorInfo {
        MonitorInfo {
            name: "Invalid".to_owned(),
            primary: false,
        }
    }
}

// Bit values of the high-level capabilities mask returned by
// GetMonitorCapabilities.
const CAPS_MONITOR_TECHNOLOGY_TYPE: u32 = 0x0001;
const CAPS_BRIGHTNESS: u32 = 0x0002;
const CAPS_CONTRAST: u32 = 0x0004;
const CAPS_COLOR_TEMPERATURE: u32 = 0x0008;
const CAPS_RED_GREEN_BLUE_GAIN: u32 = 0x0010;
const CAPS_RED_GREEN_BLUE_DRIVE: u32 = 0x0020;
const CAPS_DEGAUSS: u32 = 0x0040;
const CAPS_DISPLAY_AREA_POSITION: u32 = 0x0080;
const CAPS_DISPLAY_AREA_SIZE: u32 = 0x0100;
const CAPS_RESTORE_FACTORY_DEFAULTS: u32 = 0x0400;
const CAPS_RESTORE_FACTORY_COLOR_DEFAULTS: u32 = 0x0800;
const RESTORE_FACTORY_DEFAULTS_ENABLES_MONITOR_SETTINGS: u32 = 0x1000;

/// Coarse capability flags reported by a single high-level query.
///
/// `valid` is false when the query itself failed, in which case every other
/// flag is false too.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HighLevelCaps {
    pub valid: bool,
    pub none: bool,
    pub brightness: bool,
    pub color_temperature: bool,
    pub contrast: bool,
    pub degauss: bool,
    pub display_area_position: bool,
    pub display_area_size: bool,
    pub monitor_technology_type: bool,
    pub rgb_drive: bool,
    pub rgb_gain: bool,
    pub restore_factory_color_defaults: bool,
    pub restore_factory_defaults: bool,
    pub restore_factory_defaults_enables_monitor_settings: bool,
}

impl HighLevelCaps {
    /// Maps a raw capabilities mask onto the flag record.
    pub fn from_bits(bits: u32) -> HighLevelCaps {
        let has = |flag: u32| bits & flag != 0;
        HighLevelCaps {
            valid: true,
            none: bits == 0,
            brightness: has(CAPS_BRIGHTNESS),
            color_temperature: has(CAPS_COLOR_TEMPERATURE),
            contrast: has(CAPS_CONTRAST),
            degauss: has(CAPS_DEGAUSS),
            display_area_position: has(CAPS_DISPLAY_AREA_POSITION),
            display_area_size: has(CAPS_DISPLAY_AREA_SIZE),
            monitor_technology_type: has(CAPS_MONITOR_TECHNOLOGY_TYPE),
            rgb_drive: has(CAPS_RED_GREEN_BLUE_DRIVE),
            rgb_gain: has(CAPS_RED_GREEN_BLUE_GAIN),
            restore_factory_color_defaults: has(
                CAPS_RESTORE_FACTORY_COLOR_DEFAULTS,
            ),
            restore_factory_defaults: has(CAPS_RESTORE_FACTORY_DEFAULTS),
            restore_factory_defaults_enables_monitor_settings: has(
                RESTORE_FACTORY_DEFAULTS_ENABLES_MONITOR_SETTINGS,
            ),
        }
    }

    /// The flags paired with their display names, in output order.
    pub fn flags(&self) -> [(&'static str, bool); 12] {
        [
            ("Brightness", self.brightness),
            ("Color temperature", self.color_temperature),
            ("Contrast", self.contrast),
            ("Degauss", self.degauss),
            ("Display area position", self.display_area_position),
            ("Display area size", self.display_area_size),
            ("Monitor technology type", self.monitor_technology_type),
            ("RGB drive", self.rgb_drive),
            ("RGB gain", self.rgb_gain),
            (
                "Restore factory color defaults",
                self.restore_factory_color_defaults,
            ),
            ("Restore factory defaults", self.restore_factory_defaults),
            (
                "Restore factory defaults enables monitor settings",
                self.restore_factory_defaults_enables_monitor_settings,
            ),
        ]
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CodeType {
    Momentary,
    SetParameter,
}

/// The monitor's answer to a VCP feature read.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VcpReply {
    pub code_type: CodeType,
    pub current: u32,
    pub maximum: u32,
}

/// The primitives a platform provides for talking to monitors.
///
/// A `Monitor` owns whatever platform handles back it and releases them when
/// dropped.
pub trait Transport {
    type Monitor;

    /// Returns the monitor at `index` in the platform's enumeration order.
    fn enumerate(&self, index: u32) -> Option<Self::Monitor>;

    fn monitor_info(&self, monitor: &Self::Monitor) -> MonitorInfo;

    fn high_level_caps(&self, monitor: &Self::Monitor) -> HighLevelCaps;

    /// Fetches the raw capabilities string. An empty string is a success.
    fn capabilities_string(
        &self,
        monitor: &Self::Monitor,
    ) -> Result<String, TransportError>;

    fn vcp_get(
        &self,
        monitor: &Self::Monitor,
        code: u8,
    ) -> Result<VcpReply, TransportError>;

    fn vcp_set(
        &self,
        monitor: &Self::Monitor,
        code: u8,
        value: u32,
    ) -> Result<(), TransportError>;

    /// The platform's last-error diagnostic, if it has one.
    fn last_error(&self) -> Option<String> {
        None
    }
}

#[cfg(not(windows))]
mod unsupported {
    use super::{HighLevelCaps, MonitorInfo, Transport, VcpReply};
    use crate::error::TransportError;

    /// Never constructed; there are no monitors to hand out.
    pub enum Monitor {}

    /// A transport for hosts without DDC/CI support. It finds no monitors.
    #[derive(Default)]
    pub struct UnsupportedTransport;

    impl Transport for UnsupportedTransport {
        type Monitor = Monitor;

        fn enumerate(&self, index: u32) -> Option<Monitor> {
            tracing::debug!(
                "no DDC/CI transport on this platform, monitor {} unavailable",
                index
            );
            None
        }

        fn monitor_info(&self, monitor: &Monitor) -> MonitorInfo {
            match *monitor {}
        }

        fn high_level_caps(&self, monitor: &Monitor) -> HighLevelCaps {
            match *monitor {}
        }

        fn capabilities_string(
            &self,
            monitor: &Monitor,
        ) -> Result<String, TransportError> {
            match *monitor {}
        }

        fn vcp_get(
            &self,
            monitor: &Monitor,
            _code: u8,
        ) -> Result<VcpReply, TransportError> {
            match *monitor {}
        }

        fn vcp_set(
            &self,
            monitor: &Monitor,
            _code: u8,
            _value: u32,
        ) -> Result<(), TransportError> {
            match *monitor {}
        }

        fn last_error(&self) -> Option<String> {
            Some("DDC/CI is only supported on Windows".to_owned())
        }
    }
}
