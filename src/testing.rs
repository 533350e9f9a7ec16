//! A scripted transport for tests.

use std::{
    cell::{Cell, RefCell},
    collections::{HashMap, VecDeque},
    rc::Rc,
};

use crate::{
    error::TransportError,
    transport::{CodeType, HighLevelCaps, MonitorInfo, Transport, VcpReply},
};

pub struct FakeMonitor {
    released: Rc<Cell<usize>>,
}

impl Drop for FakeMonitor {
    fn drop(&mut self) {
        self.released.set(self.released.get() + 1);
    }
}

/// A single attached monitor whose VCP reads follow a script.
///
/// Reads pop from `script` first. Once it's empty they return the stored
/// value for the code, which writes update when `reflect_writes` is set.
pub struct FakeTransport {
    pub info: MonitorInfo,
    pub caps_bits: Option<u32>,
    pub capabilities: Option<String>,
    pub script: RefCell<VecDeque<Option<u32>>>,
    pub values: RefCell<HashMap<u8, u32>>,
    pub reflect_writes: bool,
    pub fail_reads: bool,
    pub fail_writes: bool,
    pub writes: RefCell<Vec<(u8, u32)>>,
    pub reads: Cell<usize>,
    pub opened: Cell<usize>,
    pub released: Rc<Cell<usize>>,
}

impl Default for FakeTransport {
    fn default() -> FakeTransport {
        FakeTransport {
            info: MonitorInfo {
                name: r"\\.\DISPLAY1".to_owned(),
                primary: true,
            },
            caps_bits: Some(0),
            capabilities: Some(String::new()),
            script: RefCell::new(VecDeque::new()),
            values: RefCell::new(HashMap::new()),
            reflect_writes: true,
            fail_reads: false,
            fail_writes: false,
            writes: RefCell::new(Vec::new()),
            reads: Cell::new(0),
            opened: Cell::new(0),
            released: Rc::new(Cell::new(0)),
        }
    }
}

impl FakeTransport {
    pub fn with_value(self, code: u8, value: u32) -> FakeTransport {
        self.values.borrow_mut().insert(code, value);
        self
    }

    pub fn with_script(
        self,
        script: impl IntoIterator<Item = Option<u32>>,
    ) -> FakeTransport {
        self.script.borrow_mut().extend(script);
        self
    }
}

impl Transport for FakeTransport {
    type Monitor = FakeMonitor;

    fn enumerate(&self, index: u32) -> Option<FakeMonitor> {
        if index != 0 {
            return None;
        }
        self.opened.set(self.opened.get() + 1);
        Some(FakeMonitor {
            released: Rc::clone(&self.released),
        })
    }

    fn monitor_info(&self, _monitor: &FakeMonitor) -> MonitorInfo {
        self.info.clone()
    }

    fn high_level_caps(&self, _monitor: &FakeMonitor) -> HighLevelCaps {
        self.caps_bits
            .map(HighLevelCaps::from_bits)
            .unwrap_or_default()
    }

    fn capabilities_string(
        &self,
        _monitor: &FakeMonitor,
    ) -> Result<String, TransportError> {
        self.capabilities.clone().ok_or(TransportError::Os {
            operation: "CapabilitiesRequestAndCapabilitiesReply",
            code: 0x1F,
            message: "A device attached to the system is not functioning."
                .to_owned(),
        })
    }

    fn vcp_get(
        &self,
        _monitor: &FakeMonitor,
        code: u8,
    ) -> Result<VcpReply, TransportError> {
        self.reads.set(self.reads.get() + 1);

        let scripted = self.script.borrow_mut().pop_front();
        let current = match scripted {
            Some(reply) => reply,
            None if self.fail_reads => None,
            None => self.values.borrow().get(&code).copied(),
        };

        current
            .map(|current| VcpReply {
                code_type: CodeType::SetParameter,
                current,
                maximum: 100,
            })
            .ok_or(TransportError::Failed("GetVCPFeatureAndVCPFeatureReply"))
    }

    fn vcp_set(
        &self,
        _monitor: &FakeMonitor,
        code: u8,
        value: u32,
    ) -> Result<(), TransportError> {
        if self.fail_writes {
            return Err(TransportError::Failed("SetVCPFeature"));
        }
        self.writes.borrow_mut().push((code, value));
        if self.reflect_writes {
            self.values.borrow_mut().insert(code, value);
        }
        Ok(())
    }

    fn last_error(&self) -> Option<String> {
        Some("Error [1461] Invalid monitor handle.".to_owned())
    }
}
