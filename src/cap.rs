use std::fmt;

use crate::parse::CapabilityNode;

pub const INPUT_SELECT_CODE: u8 = 0x60;

#[derive(Debug, PartialEq)]
pub struct VcpCode {
    pub code: u8,
    pub values: Vec<u8>,
}

/// The parts of a capabilities tree the tool knows how to interpret.
#[derive(Debug)]
pub struct Capabilities {
    pub vcp: Option<Vec<VcpCode>>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Input {
    DisplayPort1,
    DisplayPort2,
    Hdmi1,
    Hdmi2,
}

impl Input {
    pub fn name(self) -> &'static str {
        match self {
            Input::DisplayPort1 => "DisplayPort 1",
            Input::DisplayPort2 => "DisplayPort 2",
            Input::Hdmi1 => "HDMI 1",
            Input::Hdmi2 => "HDMI 2",
        }
    }
}

impl fmt::Display for Input {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl TryFrom<u32> for Input {
    type Error = u32;

    fn try_from(value: u32) -> Result<Input, u32> {
        match value {
            0x0F => Ok(Input::DisplayPort1),
            0x10 => Ok(Input::DisplayPort2),
            0x11 => Ok(Input::Hdmi1),
            0x12 => Ok(Input::Hdmi2),
            _ => Err(value),
        }
    }
}

/// Formats an input select value by name when it's a known input.
pub fn describe_input(value: u32) -> String {
    match Input::try_from(value) {
        Ok(input) => format!("{} (0x{:x})", input, value),
        Err(value) => format!("0x{:x}", value),
    }
}

impl Capabilities {
    /// Collects the VCP codes listed under the first `vcp` branch of a parsed
    /// capabilities string.
    pub fn from_nodes(nodes: &[CapabilityNode]) -> Capabilities {
        let vcp = nodes.iter().find_map(|node| node.find("vcp")).map(|vcp| {
            vcp.children()
                .iter()
                .filter_map(|node| {
                    let code = node.value().as_opcode()?;
                    let values = node
                        .children()
                        .iter()
                        .filter_map(|value| value.value().as_opcode())
                        .collect();
                    Some(VcpCode { code, values })
                })
                .collect()
        });

        Capabilities { vcp }
    }

    /// The known inputs listed as values of the input select code, in the
    /// order the monitor lists them.
    pub fn supported_inputs(&self) -> Vec<Input> {
        self.vcp
            .iter()
            .flatten()
            .find(|vcp_code| vcp_code.code == INPUT_SELECT_CODE)
            .map(|vcp_code| {
                vcp_code
                    .values
                    .iter()
                    .filter_map(|&value| Input::try_from(u32::from(value)).ok())
                    .collect()
            })
            .unwrap_or_default()
    }
}
