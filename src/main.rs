use clap::builder::PossibleValuesParser;
use clap::{Arg, ArgAction, Command};
use std::process;

// Use modules from the library
use mbatch::commands::{self, tools, transcode};
use mbatch::core::encoder::DEFAULT_SPEED;
use mbatch::core::file_scanner::ScanOrder;
use mbatch::BatchError;

const X264_PRESETS: [&str; 9] = [
    "ultrafast",
    "superfast",
    "veryfast",
    "faster",
    "fast",
    "medium",
    "slow",
    "slower",
    "veryslow",
];

/// Arguments shared by every transcode subcommand
fn run_args(cmd: Command) -> Command {
    cmd.arg(
        Arg::new("dir")
            .short('d')
            .long("dir")
            .value_name("DIR")
            .help("Directory with the files to process")
            .required(true)
            .value_parser(transcode::parse_dir),
    )
    .arg(
        Arg::new("wait")
            .short('w')
            .long("wait")
            .value_name("SECS")
            .help("Wait SECS seconds between files instead of asking (no value: configured default)")
            .num_args(0..=1)
            .default_missing_value(transcode::WAIT_DEFAULT)
            .value_parser(transcode::parse_wait),
    )
    .arg(
        Arg::new("sort")
            .long("sort")
            .value_name("ORDER")
            .help("Processing order: natural, name or none")
            .default_value("natural")
            .value_parser(|s: &str| s.parse::<ScanOrder>()),
    )
    .arg(
        Arg::new("legacy-match")
            .long("legacy-match")
            .help("Treat a file as done if any ledger line contains its path")
            .action(ArgAction::SetTrue),
    )
}

fn build_cli() -> Command {
    Command::new("mbatch")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Resumable batch transcoder for directories of audio and video files")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .help("Show debug logging")
                .global(true)
                .action(ArgAction::SetTrue),
        )
        .subcommand(run_args(
            Command::new("audio")
                .about("Re-encode m4a/m4b (or mp3) files to low-bitrate AAC with qaac")
                .arg(
                    Arg::new("mp3")
                        .long("mp3")
                        .help("Process mp3 files (decoded to wav first)")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("stereo")
                        .long("stereo")
                        .help("Keep all channels instead of down-mixing to mono")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("hq")
                        .long("hq")
                        .help("32 kHz output instead of 22.05 kHz")
                        .action(ArgAction::SetTrue),
                ),
        ))
        .subcommand(run_args(
            Command::new("video")
                .about("Re-encode mp4/avi files to h264 with ffmpeg")
                .arg(
                    Arg::new("resolution")
                        .short('r')
                        .long("resolution")
                        .value_name("HEIGHT")
                        .help("Output height in pixels")
                        .value_parser(clap::value_parser!(u32))
                        .default_value("540"),
                )
                .arg(
                    Arg::new("speed")
                        .short('s')
                        .long("speed")
                        .value_name("PRESET")
                        .help("x264 preset")
                        .value_parser(PossibleValuesParser::new(X264_PRESETS))
                        .default_value(DEFAULT_SPEED),
                )
                .arg(
                    Arg::new("aac")
                        .long("aac")
                        .help("AAC (libfdk_aac) audio track instead of mp3")
                        .action(ArgAction::SetTrue),
                ),
        ))
        .subcommand(
            Command::new("set")
                .about("Set configuration values (use 'mbatch set --help' for subcommands)")
                .subcommand_required(true)
                .arg_required_else_help(true)
                .subcommand(
                    Command::new("tool")
                        .about("Set the fallback path of an external tool")
                        .arg(
                            Arg::new("name")
                                .help("Tool name (ffprobe, ffmpeg, qaac64)")
                                .required(true)
                                .index(1),
                        )
                        .arg(
                            Arg::new("path")
                                .help("Path to the executable")
                                .required_unless_present("unset")
                                .index(2),
                        )
                        .arg(
                            Arg::new("unset")
                                .long("unset")
                                .help("Forget the configured path")
                                .conflicts_with("path")
                                .action(ArgAction::SetTrue),
                        ),
                ),
        )
        .subcommand(
            Command::new("get")
                .about("Get configuration values (use 'mbatch get --help' for subcommands)")
                .subcommand_required(true)
                .arg_required_else_help(true)
                .subcommand(
                    Command::new("tools").about("Show where each external tool resolves to"),
                ),
        )
}

fn main() {
    let matches = build_cli().get_matches();
    mbatch::init_logging(matches.get_flag("verbose"));

    let result = match matches.subcommand() {
        Some(("audio", sub_matches)) => commands::audio(sub_matches),
        Some(("video", sub_matches)) => commands::video(sub_matches),
        Some(("set", sub_matches)) => tools::handle_set(sub_matches),
        Some(("get", sub_matches)) => tools::handle_get(sub_matches),
        _ => Ok(()),
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        let code = e
            .chain()
            .find_map(|cause| cause.downcast_ref::<BatchError>())
            .map(BatchError::exit_code)
            .unwrap_or(1);
        process::exit(code);
    }
}
