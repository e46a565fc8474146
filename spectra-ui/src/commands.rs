//! Command line parsing for the interactive front end
//!
//! One command per line, parsed with clap in multicall mode: the first word
//! names the command. Paths and VOTABLE text are trailing arguments joined
//! back with single spaces.

use std::path::PathBuf;

use clap::builder::BoolishValueParser;
use clap::error::ErrorKind;
use clap::{ArgAction, CommandFactory, Parser, Subcommand};
use spectra_common::{Error, Result};

use crate::view::analyzer::AnalyzerCommand;
use crate::view::downloader::{DownloaderCommand, VotInputType};

const COMMANDS_TEMPLATE: &str = "commands:\n{subcommands}";

/// Parsed input line
#[derive(Debug, Clone, PartialEq)]
pub enum Input<C> {
    Command(C),
    /// Rendered help text
    Help(String),
    Quit,
    Empty,
}

/// Parser turning a line into a controller command
pub trait CommandParser {
    type Command;

    fn parse(line: &str) -> Result<Input<Self::Command>>;

    /// Help listing every command
    fn help() -> String;
}

fn parse_line<P, C>(line: &str, convert: impl FnOnce(P) -> Option<C>) -> Result<Input<C>>
where
    P: Parser,
{
    let words: Vec<&str> = line.split_whitespace().collect();
    if words.is_empty() {
        return Ok(Input::Empty);
    }
    match P::try_parse_from(words) {
        Ok(parsed) => Ok(convert(parsed).map_or(Input::Quit, Input::Command)),
        Err(e)
            if matches!(
                e.kind(),
                ErrorKind::DisplayHelp | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
            ) =>
        {
            Ok(Input::Help(e.to_string()))
        }
        Err(e) => Err(Error::InvalidInput(e.to_string().trim_end().to_string())),
    }
}

fn render_help<P: CommandFactory>() -> String {
    P::command().render_help().to_string()
}

fn joined(words: Vec<String>) -> String {
    words.join(" ")
}

/// Analyzer commands
#[derive(Parser, Debug)]
#[command(multicall = true, help_template = COMMANDS_TEMPLATE)]
pub struct AnalyzerCommands {
    #[command(subcommand)]
    line: AnalyzerLine,
}

#[derive(Subcommand, Debug)]
enum AnalyzerLine {
    /// List a directory (or the directory of a file)
    #[command(visible_alias = "path")]
    Cd {
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        path: Vec<String>,
    },
    /// Click a listing row
    Open { row: usize },
    /// Move the frequency shift slider
    Freq0 { value: u32 },
    /// Move the window size slider
    Wsize { value: u32 },
    /// Show only the transformation (on/off)
    Only {
        #[arg(
            required = true,
            action = ArgAction::Set,
            value_parser = BoolishValueParser::new()
        )]
        flag: bool,
    },
    /// Leave the session
    #[command(visible_alias = "exit")]
    Quit,
}

impl CommandParser for AnalyzerCommands {
    type Command = AnalyzerCommand;

    fn parse(line: &str) -> Result<Input<AnalyzerCommand>> {
        parse_line(line, |parsed: AnalyzerCommands| match parsed.line {
            AnalyzerLine::Cd { path } => Some(AnalyzerCommand::FollowPath(joined(path))),
            AnalyzerLine::Open { row } => Some(AnalyzerCommand::OpenRow(row)),
            AnalyzerLine::Freq0 { value } => Some(AnalyzerCommand::SetFreq0(value)),
            AnalyzerLine::Wsize { value } => Some(AnalyzerCommand::SetWindowSize(value)),
            AnalyzerLine::Only { flag } => Some(AnalyzerCommand::OnlyTransformation(flag)),
            AnalyzerLine::Quit => None,
        })
    }

    fn help() -> String {
        render_help::<Self>()
    }
}

/// Downloader commands
#[derive(Parser, Debug)]
#[command(multicall = true, help_template = COMMANDS_TEMPLATE)]
pub struct DownloaderCommands {
    #[command(subcommand)]
    line: DownloaderLine,
}

#[derive(Subcommand, Debug)]
enum DownloaderLine {
    /// Choose how the VOTABLE is supplied (link, upload, direct)
    Mode { input_type: VotInputType },
    /// Parse the VOTABLE behind an SSAP link
    Url { address: String },
    /// Parse a VOTABLE file
    Upload {
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        path: Vec<String>,
    },
    /// Parse VOTABLE text
    Direct {
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        text: Vec<String>,
    },
    /// Return to VOTABLE input
    Back,
    /// Select spectra by id
    Select { ids: Vec<String> },
    /// Select every spectrum
    SelectAll,
    /// Use the DataLink protocol (on/off)
    #[command(name = "datalink")]
    DataLink {
        #[arg(
            required = true,
            action = ArgAction::Set,
            value_parser = BoolishValueParser::new()
        )]
        flag: bool,
    },
    /// Set a DataLink parameter
    Param {
        name: String,
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        value: Vec<String>,
    },
    /// Set the target directory
    Dir {
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        path: Vec<String>,
    },
    /// Download the selected spectra
    Download,
    /// Leave the session
    #[command(visible_alias = "exit")]
    Quit,
}

impl CommandParser for DownloaderCommands {
    type Command = DownloaderCommand;

    fn parse(line: &str) -> Result<Input<DownloaderCommand>> {
        parse_line(line, |parsed: DownloaderCommands| {
            let command = match parsed.line {
                DownloaderLine::Mode { input_type } => DownloaderCommand::InputType(input_type),
                DownloaderLine::Url { address } => DownloaderCommand::ProcessUrl(address),
                DownloaderLine::Upload { path } => {
                    let path = (!path.is_empty()).then(|| PathBuf::from(joined(path)));
                    DownloaderCommand::Upload(path)
                }
                DownloaderLine::Direct { text } => DownloaderCommand::ProcessDirect(joined(text)),
                DownloaderLine::Back => DownloaderCommand::Back,
                DownloaderLine::Select { ids } => DownloaderCommand::Select(ids),
                DownloaderLine::SelectAll => DownloaderCommand::SelectAll,
                DownloaderLine::DataLink { flag } => DownloaderCommand::UseDataLink(flag),
                DownloaderLine::Param { name, value } => DownloaderCommand::DataLinkParam {
                    name,
                    value: joined(value),
                },
                DownloaderLine::Dir { path } => DownloaderCommand::Directory(joined(path)),
                DownloaderLine::Download => DownloaderCommand::Download,
                DownloaderLine::Quit => return None,
            };
            Some(command)
        })
    }

    fn help() -> String {
        render_help::<Self>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_definitions_are_valid() {
        AnalyzerCommands::command().debug_assert();
        DownloaderCommands::command().debug_assert();
    }

    #[test]
    fn test_paths_keep_spaces() {
        assert_eq!(
            <AnalyzerCommands as CommandParser>::parse("cd /data/my spectra").unwrap(),
            Input::Command(AnalyzerCommand::FollowPath("/data/my spectra".to_string()))
        );
        assert_eq!(
            <AnalyzerCommands as CommandParser>::parse("path /data").unwrap(),
            Input::Command(AnalyzerCommand::FollowPath("/data".to_string()))
        );
    }

    #[test]
    fn test_slider_commands() {
        assert_eq!(
            <AnalyzerCommands as CommandParser>::parse("freq0 12").unwrap(),
            Input::Command(AnalyzerCommand::SetFreq0(12))
        );
        assert_eq!(
            <AnalyzerCommands as CommandParser>::parse("only on").unwrap(),
            Input::Command(AnalyzerCommand::OnlyTransformation(true))
        );
        assert!(<AnalyzerCommands as CommandParser>::parse("wsize -1").is_err());
        assert!(<AnalyzerCommands as CommandParser>::parse("wsize").is_err());
        assert!(<AnalyzerCommands as CommandParser>::parse("only maybe").is_err());
    }

    #[test]
    fn test_blank_help_quit() {
        assert_eq!(<AnalyzerCommands as CommandParser>::parse("   ").unwrap(), Input::Empty);
        assert_eq!(<DownloaderCommands as CommandParser>::parse("quit").unwrap(), Input::Quit);
        assert_eq!(<AnalyzerCommands as CommandParser>::parse("exit").unwrap(), Input::Quit);
        match <DownloaderCommands as CommandParser>::parse("help").unwrap() {
            Input::Help(text) => assert!(text.contains("select-all")),
            other => panic!("expected help, got {:?}", other),
        }
        assert!(AnalyzerCommands::help().contains("freq0"));
    }

    #[test]
    fn test_input_type() {
        assert_eq!(
            <DownloaderCommands as CommandParser>::parse("mode upload").unwrap(),
            Input::Command(DownloaderCommand::InputType(VotInputType::Upload))
        );
        assert!(<DownloaderCommands as CommandParser>::parse("mode ftp").is_err());
    }

    #[test]
    fn test_upload_without_path() {
        assert_eq!(
            <DownloaderCommands as CommandParser>::parse("upload").unwrap(),
            Input::Command(DownloaderCommand::Upload(None))
        );
        assert_eq!(
            <DownloaderCommands as CommandParser>::parse("upload /tmp/my table.xml").unwrap(),
            Input::Command(DownloaderCommand::Upload(Some(PathBuf::from(
                "/tmp/my table.xml"
            ))))
        );
    }

    #[test]
    fn test_select_and_param() {
        assert_eq!(
            <DownloaderCommands as CommandParser>::parse("select 0 3").unwrap(),
            Input::Command(DownloaderCommand::Select(vec!["0".into(), "3".into()]))
        );
        assert_eq!(
            <DownloaderCommands as CommandParser>::parse("param FORMAT application/fits").unwrap(),
            Input::Command(DownloaderCommand::DataLinkParam {
                name: "FORMAT".into(),
                value: "application/fits".into(),
            })
        );
        assert_eq!(
            <DownloaderCommands as CommandParser>::parse("param FORMAT").unwrap(),
            Input::Command(DownloaderCommand::DataLinkParam {
                name: "FORMAT".into(),
                value: String::new(),
            })
        );
        assert_eq!(
            <DownloaderCommands as CommandParser>::parse("datalink off").unwrap(),
            Input::Command(DownloaderCommand::UseDataLink(false))
        );
    }

    #[test]
    fn test_unknown_command() {
        assert!(<DownloaderCommands as CommandParser>::parse("launch").is_err());
    }
}
