//! Entry point for the demo plugin. The host launches this binary and talks
//! to it over stdin/stdout.

use lnplugin_demo::args::parse_cli;
use lnplugin_demo::run;

fn main() -> anyhow::Result<()> {
    run(parse_cli())
}
