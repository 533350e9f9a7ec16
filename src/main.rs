use std::{env, io, process::ExitCode};

use monitor_util::{cli, logger, transport::PlatformTransport};

fn main() -> anyhow::Result<ExitCode> {
    let args: Vec<String> = env::args().skip(1).collect();
    let transport = PlatformTransport::default();

    cli::run(
        &args,
        &transport,
        &mut io::stdout().lock(),
        &mut io::stderr().lock(),
        logger::init,
    )
}
