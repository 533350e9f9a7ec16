//! Command line parsing.
//!
//! Flags are matched case-insensitively, so tokens are first checked and
//! rewritten to their canonical spelling before `argh` parses them.

use std::{io::Write, process::ExitCode};

use argh::FromArgs;

use crate::{driver, error::UsageError, transport::Transport};

pub const USAGE: &str = "monitor_util [--monitor/-m INDEX] [--info/-i] [--capabilities/-c] [(--get/-g ADDRESS) | (--set/-s ADDRESS VALUE) | (--toggle)] [--verify/-v]";

#[derive(Debug, FromArgs)]
/// Inspect and control displays over DDC/CI.
struct Args {
    /// zero-based index of the monitor to use (default 0)
    #[argh(option, short = 'm', default = "0", from_str_fn(parse_monitor_index))]
    monitor: u32,

    /// print the monitor's name and whether it's the primary monitor
    #[argh(switch, short = 'i')]
    info: bool,

    /// print the monitor's high-level and low-level capabilities
    #[argh(switch, short = 'c')]
    capabilities: bool,

    /// read a VCP feature
    #[argh(option, short = 'g', from_str_fn(parse_address))]
    get: Option<u8>,

    /// write a VCP feature, followed by the value to write
    #[argh(option, short = 's', from_str_fn(parse_address))]
    set: Option<u8>,

    /// switch the input source between HDMI and DisplayPort
    #[argh(switch)]
    toggle: bool,

    /// read the feature back after --set or --toggle until it matches
    #[argh(switch, short = 'v')]
    verify: bool,

    /// print debug diagnostics to stderr
    #[argh(switch)]
    debug: bool,

    /// the value written by --set
    #[argh(positional, from_str_fn(parse_value))]
    value: Option<u32>,
}

/// A single VCP action.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    Get { code: u8 },
    Set { code: u8, value: u32 },
    Toggle,
}

/// Everything one invocation asks for.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Command {
    pub monitor_index: u32,
    pub print_info: bool,
    pub print_capabilities: bool,
    pub action: Option<Action>,
    pub verify: bool,
    pub debug: bool,
}

/// Why parsing stopped before producing a [`Command`].
#[derive(Debug, PartialEq)]
pub enum Exit {
    /// Help was requested. Holds the text to print.
    Help(String),
    Usage(UsageError),
}

impl From<UsageError> for Exit {
    fn from(err: UsageError) -> Exit {
        Exit::Usage(err)
    }
}

struct Flag {
    long: &'static str,
    short: Option<&'static str>,
    /// Names of the parameters that follow the flag.
    params: &'static str,
    /// How many parameters follow the flag.
    arity: usize,
}

const FLAGS: &[Flag] = &[
    Flag {
        long: "--monitor",
        short: Some("-m"),
        params: "a monitor index",
        arity: 1,
    },
    Flag {
        long: "--info",
        short: Some("-i"),
        params: "",
        arity: 0,
    },
    Flag {
        long: "--capabilities",
        short: Some("-c"),
        params: "",
        arity: 0,
    },
    Flag {
        long: "--get",
        short: Some("-g"),
        params: "an address",
        arity: 1,
    },
    Flag {
        long: "--set",
        short: Some("-s"),
        params: "an address and value",
        arity: 2,
    },
    Flag {
        long: "--toggle",
        short: None,
        params: "",
        arity: 0,
    },
    Flag {
        long: "--verify",
        short: Some("-v"),
        params: "",
        arity: 0,
    },
    Flag {
        long: "--debug",
        short: None,
        params: "",
        arity: 0,
    },
    Flag {
        long: "--help",
        short: Some("-h"),
        params: "",
        arity: 0,
    },
];

fn find_flag(arg: &str) -> Option<(&'static str, &'static Flag)> {
    FLAGS.iter().find_map(|flag| {
        if flag.long.eq_ignore_ascii_case(arg) {
            Some((flag.long, flag))
        } else {
            let short = flag.short?;
            short.eq_ignore_ascii_case(arg).then_some((short, flag))
        }
    })
}

/// Rewrites flags to their canonical spelling and checks that each flag has
/// its parameters. Parameters are passed through untouched.
fn normalize<S: AsRef<str>>(args: &[S]) -> Result<Vec<String>, UsageError> {
    let mut normalized = Vec::with_capacity(args.len());

    let mut i = 0;
    while i < args.len() {
        let arg = args[i].as_ref();
        let (canonical, flag) = find_flag(arg)
            .ok_or_else(|| UsageError::UnsupportedArgument(arg.to_owned()))?;
        normalized.push(canonical.to_owned());

        let params = &args[i + 1..];
        if params.len() < flag.arity
            || params[..flag.arity]
                .iter()
                .any(|param| find_flag(param.as_ref()).is_some())
        {
            return Err(UsageError::MissingParameter {
                flag: flag_names(flag),
                what: flag.params,
            });
        }
        normalized.extend(
            params[..flag.arity].iter().map(|p| p.as_ref().to_owned()),
        );

        i += 1 + flag.arity;
    }

    Ok(normalized)
}

fn flag_names(flag: &Flag) -> &'static str {
    match flag.long {
        "--monitor" => "--monitor/-m",
        "--get" => "--get/-g",
        "--set" => "--set/-s",
        other => other,
    }
}

/// Parses a number. `0x` or `0X` followed by more characters is
/// hexadecimal, anything else is decimal. The longest run of leading digits is
/// used and the rest of the string is ignored, so `12abc` is 12 and `0x` is 0.
/// Fails when there are no leading digits or the number doesn't fit in 32
/// bits.
pub fn parse_number(s: &str) -> Option<u32> {
    let (digits, radix) = match s.get(..2) {
        Some("0x" | "0X") if s.len() > 2 => (&s[2..], 16),
        _ => (s, 10),
    };
    let end = digits
        .find(|c: char| !c.is_digit(radix))
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }
    u32::from_str_radix(&digits[..end], radix).ok()
}

fn number(what: &str, value: &str) -> Result<u32, String> {
    parse_number(value)
        .ok_or_else(|| format!("Expected {}, but got: {}", what, value))
}

fn parse_monitor_index(value: &str) -> Result<u32, String> {
    number("a monitor index", value)
}

/// Only the low byte of an address is used.
fn parse_address(value: &str) -> Result<u8, String> {
    let address = number("an address", value)?;
    Ok((address & 0xFF) as u8)
}

fn parse_value(value: &str) -> Result<u32, String> {
    number("a value", value)
}

/// Parses the arguments that follow the program name.
pub fn parse_args<S: AsRef<str>>(args: &[S]) -> Result<Command, Exit> {
    let normalized = normalize(args)?;
    let normalized: Vec<&str> =
        normalized.iter().map(String::as_str).collect();

    let args = Args::from_args(&["monitor_util"], &normalized).map_err(
        |early_exit| match early_exit.status {
            Ok(()) => Exit::Help(early_exit.output),
            Err(()) => Exit::Usage(UsageError::Rejected(
                early_exit.output.trim_end().to_owned(),
            )),
        },
    )?;

    let set = match (args.set, args.value) {
        (Some(code), Some(value)) => Some((code, value)),
        (None, None) => None,
        // normalize() only lets a positional through as the second --set
        // parameter.
        (Some(_), None) | (None, Some(_)) => {
            return Err(UsageError::MissingParameter {
                flag: "--set/-s",
                what: "an address and value",
            }
            .into())
        }
    };

    let action = match (args.get, set, args.toggle) {
        (Some(_), Some(_), _) => return Err(UsageError::GetAndSet.into()),
        (Some(_), _, true) | (_, Some(_), true) => {
            return Err(UsageError::ToggleWithGetOrSet.into())
        }
        (Some(code), None, false) => Some(Action::Get { code }),
        (None, Some((code, value)), false) => {
            Some(Action::Set { code, value })
        }
        (None, None, true) => Some(Action::Toggle),
        (None, None, false) => None,
    };

    Ok(Command {
        monitor_index: args.monitor,
        print_info: args.info,
        print_capabilities: args.capabilities,
        action,
        verify: args.verify,
        debug: args.debug,
    })
}

/// Runs one invocation and returns its exit code.
///
/// A usage error writes the error to `err` and the usage line to `out` and
/// exits with 1. Everything else exits with 0, including failed actions. The
/// logger is installed once the command line is known to be valid, with the
/// `--debug` setting.
pub fn run<S, T, O, E>(
    args: &[S],
    transport: &T,
    out: &mut O,
    err: &mut E,
    install_logger: impl FnOnce(bool) -> anyhow::Result<()>,
) -> anyhow::Result<ExitCode>
where
    S: AsRef<str>,
    T: Transport,
    O: Write,
    E: Write,
{
    let command = match parse_args(args) {
        Ok(command) => command,
        Err(Exit::Help(help)) => {
            write!(out, "{}", help)?;
            return Ok(ExitCode::SUCCESS);
        }
        Err(Exit::Usage(usage_error)) => {
            writeln!(err, "{}", usage_error)?;
            writeln!(out, "{}", USAGE)?;
            return Ok(ExitCode::from(1));
        }
    };

    install_logger(command.debug)?;
    driver::run(transport, &command, out, err)?;
    out.flush()?;

    Ok(ExitCode::SUCCESS)
}
