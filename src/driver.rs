//! Runs a parsed [`Command`] against one monitor and renders the results.
//!
//! Results go to `out` and per-action failures go to `err`. Neither affects
//! the exit code.

use std::{
    io::{self, Write},
    slice,
};

use tracing::debug;

use crate::{
    cap::Capabilities,
    cli::{Action, Command},
    parse::{self, CapabilityNode, Value},
    transport::{HighLevelCaps, Transport},
    vcp::{self, VerifyOutcome},
};

pub fn run<T, O, E>(
    transport: &T,
    command: &Command,
    out: &mut O,
    err: &mut E,
) -> io::Result<()>
where
    T: Transport,
    O: Write,
    E: Write,
{
    let Some(monitor) = transport.enumerate(command.monitor_index) else {
        writeln!(err, "Failed to get monitor handle")?;
        if let Some(diagnostic) = transport.last_error() {
            writeln!(err, "{}", diagnostic)?;
        }
        return Ok(());
    };

    if command.print_info {
        print_info(transport, &monitor, out)?;
    }
    if command.print_capabilities {
        print_capabilities(transport, &monitor, out, err)?;
    }

    match command.action {
        Some(Action::Get { code }) => match vcp::get(transport, &monitor, code) {
            Some(reply) => writeln!(
                out,
                "VCP feature 0x{:x} = 0x{:x}",
                code, reply.current
            )?,
            None => writeln!(err, "Failed to read VCP feature 0x{:x}", code)?,
        },
        Some(Action::Set { code, value }) => {
            if !vcp::set(transport, &monitor, code, value) {
                writeln!(err, "Failure - failed to set value")?;
                return Ok(());
            }
            writeln!(out, "Setting VCP feature 0x{:x} = 0x{:x}", code, value)?;

            if !command.verify {
                writeln!(out, "Success")?;
                return Ok(());
            }
            match vcp::verify(transport, &monitor, code, value) {
                VerifyOutcome::Confirmed => writeln!(out, "Success")?,
                VerifyOutcome::Mismatch(observed) => writeln!(
                    err,
                    "Failed to verify - expected 0x{:x}, but got 0x{:x}",
                    value, observed
                )?,
                VerifyOutcome::Timeout => {
                    writeln!(err, "Failed to verify - read-back failed.")?
                }
            }
        }
        Some(Action::Toggle) => {
            if vcp::toggle(transport, &monitor, command.verify) {
                writeln!(out, "Successfully toggled input source")?;
            } else {
                writeln!(err, "Failed to toggle input source")?;
            }
        }
        None => {}
    }

    Ok(())
}

fn print_info<T: Transport>(
    transport: &T,
    monitor: &T::Monitor,
    out: &mut impl Write,
) -> io::Result<()> {
    let info = transport.monitor_info(monitor);
    writeln!(out, "Monitor Info")?;
    writeln!(out, "------------")?;
    writeln!(out, "Name: {}", info.name)?;
    writeln!(out, "Primary: {}", info.primary)
}

fn print_capabilities<T: Transport>(
    transport: &T,
    monitor: &T::Monitor,
    out: &mut impl Write,
    err: &mut impl Write,
) -> io::Result<()> {
    writeln!(out, "High-level capabilities:")?;
    let caps = transport.high_level_caps(monitor);
    if caps.valid {
        write_high_level_caps(out, &caps, "  ")?;
    } else {
        writeln!(err, "Could not obtain high-level capabilities.")?;
    }

    writeln!(out, "Low-level capabilities:")?;
    match transport.capabilities_string(monitor) {
        Ok(capabilities_string) => {
            debug!("capabilities string: {:?}", capabilities_string);
            if let Some(root) = parse::parse_root(&capabilities_string) {
                let capabilities = Capabilities::from_nodes(slice::from_ref(&root));
                debug!("supported inputs: {:?}", capabilities.supported_inputs());
                write_node(out, &root, "  ")?;
            }
        }
        Err(error) => {
            debug!("{}", error);
            writeln!(err, "Could not obtain low-level capabilities.")?;
            if let Some(diagnostic) = error.diagnostic() {
                writeln!(err, "{}", diagnostic)?;
            }
        }
    }

    Ok(())
}

pub fn write_high_level_caps(
    out: &mut impl Write,
    caps: &HighLevelCaps,
    indent: &str,
) -> io::Result<()> {
    if caps.none {
        return writeln!(out, "{}None", indent);
    }
    for (name, on) in caps.flags() {
        writeln!(out, "{}{}: {}", indent, name, on as u8)?;
    }
    Ok(())
}

/// Writes a capabilities tree, one value per line, children indented two
/// spaces deeper than their parent. Empty tokens are written as they are, as
/// an indented blank line.
pub fn write_node(
    out: &mut impl Write,
    node: &CapabilityNode,
    indent: &str,
) -> io::Result<()> {
    match node.value() {
        Value::Opcode(code) => write!(out, "{}0x{:x}", indent, code)?,
        Value::Text(text) => write!(out, "{}{}", indent, text)?,
    }

    if node.is_branch() {
        writeln!(out, "(")?;
        let child_indent = format!("{}  ", indent);
        for child in node.children() {
            write_node(out, child, &child_indent)?;
        }
        write!(out, "{})", indent)?;
    }

    writeln!(out)
}
