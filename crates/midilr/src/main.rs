//! MIDI2LR bridge - command line shell for the mapping engine
//!
//! Loads the default profile, runs one command and writes the profile back
//! when it changed or after listening.
//!
//! ## Usage
//!
//! ```text
//! midilr [--profile PATH] show [--sort COLUMN] [--desc]
//! midilr [--profile PATH] bind CHANNEL DATA KIND COMMAND...
//! midilr [--profile PATH] unbind CHANNEL DATA KIND
//! midilr [--profile PATH] listen        (hex MIDI lines on stdin, e.g. "B0 07 40")
//! ```

use anyhow::{anyhow, bail, Context, Result};
use midilr_map::{
    default_config_path, load_config, load_document, save_document, BindOutcome, Column,
    MessageKind, MidiDispatcher, MidiEvent, MidiMessageId, SharedCommandTable,
};
use std::io::BufRead;
use std::path::PathBuf;

const USAGE: &str = "usage: midilr [--profile PATH] <show [--sort COLUMN] [--desc] | bind CHANNEL DATA KIND COMMAND... | unbind CHANNEL DATA KIND | listen>";

fn main() {
    // Initialize logger - set RUST_LOG=debug for verbose output
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    if let Err(e) = run(std::env::args().skip(1).collect()) {
        log::error!("midilr: {:#}", e);
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(mut args: Vec<String>) -> Result<()> {
    let config = load_config(&default_config_path());

    let profile_path = match args.iter().position(|arg| arg == "--profile") {
        Some(i) => {
            if i + 1 >= args.len() {
                bail!("--profile needs a path\n{}", USAGE);
            }
            let path = PathBuf::from(args.remove(i + 1));
            args.remove(i);
            path
        }
        None => config.default_profile_path(),
    };

    let table = SharedCommandTable::with_policy(config.duplicate_policy, config.sort_state());
    let report = table.build_from_document(&load_document(&profile_path)?);
    log::info!(
        "midilr: Loaded {} bindings from {:?} ({} skipped)",
        report.loaded,
        profile_path,
        report.skipped.len()
    );

    let Some((command, rest)) = args.split_first() else {
        bail!(USAGE);
    };

    let save = match command.as_str() {
        "show" => {
            show(&table, rest)?;
            false
        }
        "bind" => {
            bind(&table, rest)?;
            true
        }
        "unbind" => {
            unbind(&table, rest)?;
            true
        }
        "listen" => {
            listen(&table)?;
            true
        }
        other => bail!("unknown command '{}'\n{}", other, USAGE),
    };

    if save {
        save_document(&profile_path, &table.to_document())?;
    }
    Ok(())
}

fn show(table: &SharedCommandTable, args: &[String]) -> Result<()> {
    let mut column = table.current_sort().column;
    let mut ascending = true;
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--sort" => {
                let name = iter.next().ok_or_else(|| anyhow!("--sort needs a column"))?;
                column = name.parse::<Column>()?;
            }
            "--desc" => ascending = false,
            other => bail!("unexpected argument '{}'", other),
        }
    }
    table.sort(column, ascending);

    println!(
        "{:>4}  {:<8} {:<6} {:<14} {}",
        "#",
        Column::Channel.title(),
        Column::Data.title(),
        Column::MessageType.title(),
        Column::CommandName.title()
    );
    for row in 0..table.row_count() {
        println!(
            "{:>4}  {:<8} {:<6} {:<14} {}",
            row,
            table.row_content(row, Column::Channel)?,
            table.row_content(row, Column::Data)?,
            table.row_content(row, Column::MessageType)?,
            table.row_content(row, Column::CommandName)?
        );
    }
    println!("{} bindings", table.row_count());
    Ok(())
}

fn parse_identity(args: &[String]) -> Result<MidiMessageId> {
    let [channel, data, kind, ..] = args else {
        bail!("expected CHANNEL DATA KIND");
    };
    let channel: i64 = channel
        .parse()
        .with_context(|| format!("invalid channel '{}'", channel))?;
    let data: i64 = data.parse().with_context(|| format!("invalid data '{}'", data))?;
    let kind: MessageKind = kind.parse()?;
    Ok(MidiMessageId::from_wide(channel, data, kind)?)
}

fn bind(table: &SharedCommandTable, args: &[String]) -> Result<()> {
    let id = parse_identity(args)?;
    let command = args[3..].join(" ");
    if command.is_empty() {
        bail!("bind needs a COMMAND");
    }

    match table.bind(id, command.as_str()) {
        BindOutcome::Inserted => println!("{} -> {}", id, command),
        BindOutcome::Replaced(old) => println!("{} -> {} (was {})", id, command, old),
        BindOutcome::Rejected => bail!("{} is already bound", id),
    }
    Ok(())
}

fn unbind(table: &SharedCommandTable, args: &[String]) -> Result<()> {
    let id = parse_identity(args)?;
    match table.unbind(&id) {
        Some(old) => println!("{} unbound (was {})", id, old),
        None => println!("{} was not bound", id),
    }
    Ok(())
}

fn listen(table: &SharedCommandTable) -> Result<()> {
    let dispatcher = MidiDispatcher::new(table.clone(), |command: &str, value: u16| {
        println!("  -> {} {}", command, value);
    });

    log::info!("listen: Reading hex MIDI messages from stdin");
    for line in std::io::stdin().lock().lines() {
        let line = line.context("Failed to read stdin")?;
        if line.trim().is_empty() {
            continue;
        }
        let Some(event) = MidiEvent::parse_hex(&line) else {
            eprintln!("Ignoring '{}': not a channel message", line.trim());
            continue;
        };
        match table.resolve(&event.id) {
            Some((command, row)) => println!("{} = {} (row {}: {})", event.id, event.value, row, command),
            None => println!("{} = {} (unmapped)", event.id, event.value),
        }
        dispatcher.dispatch(event);
    }

    // Delivers whatever is still queued, then joins the worker
    drop(dispatcher);
    Ok(())
}
