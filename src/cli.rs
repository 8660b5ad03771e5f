//! Command-line interface for tonetrim
//!
//! Provides argument parsing using clap derive macros.

use clap::Parser;
use std::path::PathBuf;

/// Remove operator marker tones from WAV recordings
#[derive(Parser, Debug)]
#[command(
    name = "tonetrim",
    version,
    about = "Remove operator marker tones from WAV recordings"
)]
pub struct Cli {
    /// Input WAV file
    #[arg(value_name = "INPUT")]
    pub input: Option<PathBuf>,

    /// Output path (default: INPUT with .wav replaced by .trim.wav)
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Path to a TOML file overriding tone thresholds
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Play the trimmed audio while writing it
    #[arg(long)]
    pub play: bool,

    /// Suppress output (quiet mode)
    #[arg(short, long)]
    pub quiet: bool,

    /// Verbose output (-v: diagnostics, -vv: per-frame pitch readings)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_parse_without_arguments() {
        let cli = Cli::try_parse_from(["tonetrim"]).unwrap();
        assert!(cli.input.is_none());
        assert!(cli.output.is_none());
        assert!(cli.config.is_none());
        assert!(!cli.play);
        assert!(!cli.quiet);
        assert_eq!(cli.verbose, 0);
    }

    #[test]
    fn test_parse_input() {
        let cli = Cli::try_parse_from(["tonetrim", "call.wav"]).unwrap();
        assert_eq!(cli.input, Some(PathBuf::from("call.wav")));
    }

    #[test]
    fn test_parse_output_short_and_long() {
        let cli = Cli::try_parse_from(["tonetrim", "in.wav", "-o", "out.wav"]).unwrap();
        assert_eq!(cli.output, Some(PathBuf::from("out.wav")));

        let cli = Cli::try_parse_from(["tonetrim", "in.wav", "--output", "out.wav"]).unwrap();
        assert_eq!(cli.output, Some(PathBuf::from("out.wav")));
    }

    #[test]
    fn test_parse_config_and_play() {
        let cli =
            Cli::try_parse_from(["tonetrim", "--config", "t.toml", "--play", "in.wav"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("t.toml")));
        assert!(cli.play);
    }

    #[test]
    fn test_parse_verbose_double() {
        let cli = Cli::try_parse_from(["tonetrim", "-vv", "in.wav"]).unwrap();
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn test_parse_quiet() {
        let cli = Cli::try_parse_from(["tonetrim", "-q", "in.wav"]).unwrap();
        assert!(cli.quiet);
    }

    #[test]
    fn test_extra_positional_is_rejected() {
        assert!(Cli::try_parse_from(["tonetrim", "a.wav", "b.wav"]).is_err());
    }

    #[test]
    fn test_command_definition_is_valid() {
        Cli::command().debug_assert();
    }
}
