use clap::Parser;

mod commands;
mod tty;

use commands::normalize;
use unpin::output;

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(name = "unpin")]
#[command(version = VERSION)]
#[command(about = "Strip version-pin suffixes from quoted imports in TypeScript sources")]
struct Cli {
    #[command(flatten)]
    args: normalize::NormalizeArgs,
}

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();

    let (json_result, exit_code) = commands::run_json(cli.args);
    output::print_json_result(json_result);

    std::process::ExitCode::from(exit_code_to_u8(exit_code))
}

fn exit_code_to_u8(code: i32) -> u8 {
    if code <= 0 {
        0
    } else if code >= 255 {
        255
    } else {
        code as u8
    }
}
