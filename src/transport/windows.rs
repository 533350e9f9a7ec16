use std::{ffi::CStr, mem, ptr, slice};

use tracing::{debug, error, warn};
use windows::Win32::{
    Devices::Display::{
        CapabilitiesRequestAndCapabilitiesReply, DestroyPhysicalMonitor,
        GetCapabilitiesStringLength, GetMonitorCapabilities,
        GetNumberOfPhysicalMonitorsFromHMONITOR,
        GetPhysicalMonitorsFromHMONITOR, GetVCPFeatureAndVCPFeatureReply,
        SetVCPFeature, MC_MOMENTARY, MC_VCP_CODE_TYPE, PHYSICAL_MONITOR,
    },
    Foundation::{GetLastError, BOOL, ERROR_SUCCESS, FALSE, HANDLE, LPARAM, RECT, TRUE},
    Graphics::Gdi::{
        EnumDisplayMonitors, GetMonitorInfoA, HDC, HMONITOR, MONITORINFOEXA,
        MONITORINFOF_PRIMARY,
    },
};

use super::{CodeType, HighLevelCaps, MonitorInfo, Transport, VcpReply};
use crate::error::TransportError;

/// Builds an error for `operation` from the thread's last Win32 error.
fn last_os_error(operation: &'static str) -> TransportError {
    let code = unsafe { GetLastError() };
    if code == ERROR_SUCCESS {
        return TransportError::Failed(operation);
    }

    TransportError::Os {
        operation,
        code: code.0 as i32,
        message: windows::core::Error::from(code.to_hresult()).message(),
    }
}

fn os_error(
    operation: &'static str,
) -> impl FnOnce(windows::core::Error) -> TransportError {
    move |err| TransportError::Os {
        operation,
        code: err.code().0,
        message: err.message(),
    }
}

fn get_hmonitors() -> Vec<HMONITOR> {
    unsafe extern "system" fn enum_display_monitors_callback(
        hmonitor: HMONITOR,
        _: HDC,
        _: *mut RECT,
        data: LPARAM,
    ) -> BOOL {
        let hmonitors = &mut *(data.0 as *mut Vec<HMONITOR>);
        hmonitors.push(hmonitor);

        // Return TRUE to continue the enumeration.
        TRUE
    }

    let mut hmonitors = Vec::new();

    let enumerated = unsafe {
        // Pass None, i.e., NULL, for the first two parameters to enumerate
        // all display monitors.
        EnumDisplayMonitors(
            None,
            None,
            Some(enum_display_monitors_callback),
            LPARAM(ptr::addr_of_mut!(hmonitors) as _),
        )
        .as_bool()
    };
    if !enumerated {
        error!("failed to enumerate display monitors");
    }

    hmonitors
}

/// Returns the physical monitor associated with an HMONITOR handle.
///
/// # Errors
/// Returns `Err` if there are zero or multiple physical monitors associated
/// with a handle.
fn get_physical_monitor(hmonitor: HMONITOR) -> Result<HANDLE, TransportError> {
    unsafe {
        let mut num_physical_monitors: u32 = 0;
        GetNumberOfPhysicalMonitorsFromHMONITOR(
            hmonitor,
            ptr::addr_of_mut!(num_physical_monitors),
        )
        .map_err(os_error("GetNumberOfPhysicalMonitorsFromHMONITOR"))?;

        // A display monitor backed by several physical monitors has no single
        // target for VCP requests, so it's treated as unusable.
        if num_physical_monitors != 1 {
            warn!(
                "display monitor has {} physical monitors, expected exactly one",
                num_physical_monitors
            );
            return Err(TransportError::NoPhysicalMonitor);
        }

        let mut physical_monitor = PHYSICAL_MONITOR::default();
        GetPhysicalMonitorsFromHMONITOR(
            hmonitor,
            slice::from_raw_parts_mut(ptr::addr_of_mut!(physical_monitor), 1),
        )
        .map_err(os_error("GetPhysicalMonitorsFromHMONITOR"))?;

        Ok(physical_monitor.hPhysicalMonitor)
    }
}

/// A display monitor and the physical monitor handle used for DDC/CI.
pub struct Monitor {
    hmonitor: HMONITOR,
    handle: HANDLE,
}

impl Drop for Monitor {
    fn drop(&mut self) {
        unsafe {
            if let Err(err) = DestroyPhysicalMonitor(self.handle) {
                warn!("failed to release a physical monitor: {}", err);
            }
        }
    }
}

/// DDC/CI through the Windows monitor configuration API.
#[derive(Default)]
pub struct WindowsTransport;

impl Transport for WindowsTransport {
    type Monitor = Monitor;

    fn enumerate(&self, index: u32) -> Option<Monitor> {
        let hmonitors = get_hmonitors();
        debug!("enumerated {} display monitors", hmonitors.len());

        let hmonitor = *hmonitors.get(index as usize)?;
        match get_physical_monitor(hmonitor) {
            Ok(handle) => Some(Monitor { hmonitor, handle }),
            Err(err) => {
                error!("failed to open monitor {}: {}", index, err);
                None
            }
        }
    }

    fn monitor_info(&self, monitor: &Monitor) -> MonitorInfo {
        unsafe {
            let mut monitor_info = MONITORINFOEXA::default();
            monitor_info.monitorInfo.cbSize =
                mem::size_of_val(&monitor_info) as u32;
            if !GetMonitorInfoA(
                monitor.hmonitor,
                ptr::addr_of_mut!(monitor_info) as _,
            )
            .as_bool()
            {
                warn!("failed to get monitor information");
                return MonitorInfo::default();
            }

            let device_name_bytes: &[u8] = slice::from_raw_parts(
                monitor_info.szDevice.as_ptr() as _,
                monitor_info.szDevice.len(),
            );
            // The documentation for MONITORINFOEXA doesn't say that the string
            // in szDevice is null-terminated. The struct is zeroed, so it is
            // whenever the name is shorter than szDevice.
            let name = match CStr::from_bytes_until_nul(device_name_bytes) {
                Ok(name) => name.to_string_lossy().into_owned(),
                Err(_) => String::from_utf8_lossy(device_name_bytes).into_owned(),
            };

            MonitorInfo {
                name,
                primary: monitor_info.monitorInfo.dwFlags & MONITORINFOF_PRIMARY
                    != 0,
            }
        }
    }

    fn high_level_caps(&self, monitor: &Monitor) -> HighLevelCaps {
        let mut capabilities: u32 = 0;
        let mut color_temperatures: u32 = 0;
        unsafe {
            if GetMonitorCapabilities(
                monitor.handle,
                ptr::addr_of_mut!(capabilities),
                ptr::addr_of_mut!(color_temperatures),
            ) == FALSE.0
            {
                debug!("{}", last_os_error("GetMonitorCapabilities"));
                return HighLevelCaps::default();
            }
        }

        HighLevelCaps::from_bits(capabilities)
    }

    fn capabilities_string(
        &self,
        monitor: &Monitor,
    ) -> Result<String, TransportError> {
        unsafe {
            let mut capabilities_string_len: u32 = 0;
            if GetCapabilitiesStringLength(
                monitor.handle,
                ptr::addr_of_mut!(capabilities_string_len),
            ) == FALSE.0
            {
                return Err(last_os_error("GetCapabilitiesStringLength"));
            }

            if capabilities_string_len == 0 {
                return Ok(String::new());
            }

            let mut capabilities_string_bytes =
                vec![0u8; capabilities_string_len as usize];
            if CapabilitiesRequestAndCapabilitiesReply(
                monitor.handle,
                &mut capabilities_string_bytes,
            ) == FALSE.0
            {
                return Err(last_os_error("CapabilitiesRequestAndCapabilitiesReply"));
            }

            // Sometimes there's an extra nul byte. Everything after the first
            // one is ignored.
            if let Some(nul_position) =
                capabilities_string_bytes.iter().position(|&b| b == b'\0')
            {
                capabilities_string_bytes.truncate(nul_position);
            }

            String::from_utf8(capabilities_string_bytes)
                .map_err(|_| TransportError::InvalidCapabilitiesString)
        }
    }

    fn vcp_get(
        &self,
        monitor: &Monitor,
        code: u8,
    ) -> Result<VcpReply, TransportError> {
        let mut code_type = MC_VCP_CODE_TYPE::default();
        let mut current: u32 = 0;
        let mut maximum: u32 = 0;
        unsafe {
            if GetVCPFeatureAndVCPFeatureReply(
                monitor.handle,
                code,
                Some(ptr::addr_of_mut!(code_type)),
                ptr::addr_of_mut!(current),
                Some(ptr::addr_of_mut!(maximum)),
            ) == FALSE.0
            {
                return Err(last_os_error("GetVCPFeatureAndVCPFeatureReply"));
            }
        }

        Ok(VcpReply {
            code_type: if code_type == MC_MOMENTARY {
                CodeType::Momentary
            } else {
                CodeType::SetParameter
            },
            current,
            maximum,
        })
    }

    fn vcp_set(
        &self,
        monitor: &Monitor,
        code: u8,
        value: u32,
    ) -> Result<(), TransportError> {
        unsafe {
            if SetVCPFeature(monitor.handle, code, value) == FALSE.0 {
                return Err(last_os_error("SetVCPFeature"));
            }
        }

        Ok(())
    }

    fn last_error(&self) -> Option<String> {
        last_os_error("monitor lookup").diagnostic()
    }
}
