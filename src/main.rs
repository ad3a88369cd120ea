#[macro_use]
extern crate log;

use std::process;

use clap::ArgMatches;
use serde_json::{json, Value};

use musicd_library::config::{self, Config};
use musicd_library::{logger, Error, Field, Library, Query, Result};

fn parse_number(name: &str, value: &str) -> Result<i64> {
    value
        .parse()
        .map_err(|_| Error::Config(format!("{} must be a number, got '{}'", name, value)))
}

fn tracks(library: &Library, matches: &ArgMatches) -> Result<Value> {
    let mut query = Query::new();

    if let Some(filters) = matches.values_of("filter") {
        for filter in filters {
            let mut parts = filter.splitn(2, '=');
            match (parts.next(), parts.next()) {
                (Some(name), Some(value)) => {
                    query.filter(name.parse::<Field>()?, value);
                }
                _ => {
                    return Err(Error::Config(format!(
                        "filter '{}' is not FIELD=VALUE",
                        filter
                    )))
                }
            }
        }
    }

    if let Some(text) = matches.value_of("search") {
        query.filter(Field::All, text);
    }

    if let Some(sort) = matches.value_of("sort") {
        query.sort_from_str(sort)?;
    }

    if let Some(limit) = matches.value_of("limit") {
        query.limit(parse_number("limit", limit)?);
    }

    if let Some(offset) = matches.value_of("offset") {
        query.offset(parse_number("offset", offset)?);
    }

    let total = query.count(library)?;

    let mut statement = query.start(library)?;
    let mut rows = statement.tracks()?;
    let mut items = Vec::new();
    while let Some(track) = rows.next_track()? {
        items.push(track.to_track());
    }

    Ok(json!({
        "total": total,
        "items": items,
    }))
}

fn track(library: &Library, matches: &ArgMatches) -> Result<Value> {
    let id = parse_number("id", matches.value_of("id").unwrap_or_default())?;

    Ok(json!(library.track(id)?))
}

fn directory(library: &Library, matches: &ArgMatches) -> Result<Value> {
    let path = matches.value_of("path").unwrap_or_default();

    let id = match library.directory_id(path)? {
        Some(id) => id,
        None => return Ok(Value::Null),
    };

    let children = library
        .directories_by_parent(Some(id))
        .collect::<Result<Vec<_>>>()?;
    let urls = library.urls_by_directory(Some(id)).collect::<Result<Vec<_>>>()?;

    Ok(json!({
        "directory": library.directory(id)?,
        "track_count": library.directory_track_count(id)?,
        "album": library.album_by_directory(id)?,
        "children": children,
        "urls": urls,
    }))
}

fn lyrics(library: &Library, matches: &ArgMatches) -> Result<Value> {
    let id = parse_number("id", matches.value_of("id").unwrap_or_default())?;

    Ok(json!(library.lyrics(id)?))
}

fn main() {
    let matches = config::app().get_matches();

    let config = match Config::from_matches(&matches) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{}", e);
            process::exit(2);
        }
    };

    if let Err(e) = logger::init(config.log_level) {
        eprintln!("can't install logger: {}", e);
    }

    let library = match Library::open(&config.db_file) {
        Ok(l) => l,
        Err(e) => {
            error!("can't open library: {}", e);
            process::exit(1);
        }
    };

    let result = match matches.subcommand() {
        ("tracks", Some(m)) => tracks(&library, m),
        ("track", Some(m)) => track(&library, m),
        ("random", Some(_)) => library.random_track_id().map(|id| json!(id)),
        ("directory", Some(m)) => directory(&library, m),
        ("lyrics", Some(m)) => lyrics(&library, m),
        _ => {
            eprintln!("{}", matches.usage());
            process::exit(2);
        }
    };

    match result {
        Ok(value) => println!("{:#}", value),
        Err(e) => {
            error!("{}", e);
            process::exit(1);
        }
    }
}
