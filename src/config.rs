use std::path::PathBuf;
use std::str::FromStr;

use clap::{App, AppSettings, Arg, ArgMatches, SubCommand};
use log::LevelFilter;

use crate::error::{Error, Result};

pub const DEFAULT_DB_FILE: &str = "~/.musicd/library.db";

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub db_file: PathBuf,
    pub log_level: LevelFilter,
}

pub fn app() -> App<'static, 'static> {
    App::new("musicd-library")
        .about("Inspect the musicd library index")
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .arg(
            Arg::with_name("db-file")
                .long("db-file")
                .help("Library database file")
                .takes_value(true)
                .default_value(DEFAULT_DB_FILE),
        )
        .arg(
            Arg::with_name("log-level")
                .long("log-level")
                .help("One of off, error, warn, info, debug, trace")
                .takes_value(true)
                .default_value("info"),
        )
        .subcommand(
            SubCommand::with_name("tracks")
                .about("Search tracks")
                .arg(
                    Arg::with_name("filter")
                        .long("filter")
                        .help("FIELD=VALUE substring filter")
                        .takes_value(true)
                        .multiple(true)
                        .number_of_values(1),
                )
                .arg(
                    Arg::with_name("search")
                        .long("search")
                        .help("Match title, artist and album")
                        .takes_value(true),
                )
                .arg(
                    Arg::with_name("sort")
                        .long("sort")
                        .help("Comma separated fields, '-' prefix for descending")
                        .takes_value(true),
                )
                .arg(Arg::with_name("limit").long("limit").takes_value(true))
                .arg(Arg::with_name("offset").long("offset").takes_value(true)),
        )
        .subcommand(
            SubCommand::with_name("track")
                .about("Show one track")
                .arg(Arg::with_name("id").required(true)),
        )
        .subcommand(SubCommand::with_name("random").about("Pick a random track id"))
        .subcommand(
            SubCommand::with_name("directory")
                .about("Show an indexed directory")
                .arg(Arg::with_name("path").required(true)),
        )
        .subcommand(
            SubCommand::with_name("lyrics")
                .about("Show stored lyrics of a track")
                .arg(Arg::with_name("id").required(true)),
        )
}

/// Expands `~` and environment variables in a configured path.
pub fn expand_path(path: &str) -> Result<PathBuf> {
    shellexpand::full(path)
        .map(|p| PathBuf::from(p.as_ref()))
        .map_err(|e| Error::Config(format!("can't expand '{}': {}", path, e)))
}

impl Config {
    pub fn from_matches(matches: &ArgMatches) -> Result<Config> {
        let db_file = expand_path(matches.value_of("db-file").unwrap_or(DEFAULT_DB_FILE))?;

        let level = matches.value_of("log-level").unwrap_or("info");
        let log_level = LevelFilter::from_str(level)
            .map_err(|_| Error::Config(format!("unknown log level '{}'", level)))?;

        Ok(Config { db_file, log_level })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let matches = app().get_matches_from(vec!["musicd-library", "random"]);
        let config = Config::from_matches(&matches).unwrap();

        assert!(config.db_file.ends_with(".musicd/library.db"));
        assert_eq!(config.log_level, LevelFilter::Info);
    }

    #[test]
    fn explicit_values() {
        let matches = app().get_matches_from(vec![
            "musicd-library",
            "--db-file",
            "/tmp/library.db",
            "--log-level",
            "trace",
            "track",
            "3",
        ]);
        let config = Config::from_matches(&matches).unwrap();

        assert_eq!(config.db_file, PathBuf::from("/tmp/library.db"));
        assert_eq!(config.log_level, LevelFilter::Trace);
        assert_eq!(
            matches.subcommand_matches("track").unwrap().value_of("id"),
            Some("3")
        );
    }

    #[test]
    fn bad_log_level() {
        let matches =
            app().get_matches_from(vec!["musicd-library", "--log-level", "loud", "random"]);

        assert!(matches!(
            Config::from_matches(&matches),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn repeated_filters() {
        let matches = app().get_matches_from(vec![
            "musicd-library",
            "tracks",
            "--filter",
            "artist=band",
            "--filter",
            "title=x",
        ]);
        let tracks = matches.subcommand_matches("tracks").unwrap();
        let filters: Vec<&str> = tracks.values_of("filter").unwrap().collect();

        assert_eq!(filters, vec!["artist=band", "title=x"]);
    }
}
