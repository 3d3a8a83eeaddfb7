// Borealis
// Copyright (c) 2026 The Borealis Project Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

#![warn(rust_2018_idioms)]
#![forbid(unsafe_code)]

use std::fs::File;
use std::path::Path;
use std::thread;
use std::time::Duration;

use borealis_core::errors::Result;
use borealis_core::formats::{FormatOptions, FormatReader};
use borealis_core::io::{MediaSourceStream, MediaSourceStreamOptions};

use borealis_bundle_bink::{BinkPlayer, BinkReader, InstantClock};

use clap::{App, Arg};
use log::{error, info};

fn main() {
    pretty_env_logger::init();

    let matches = App::new("Borealis Play")
        .version("1.0")
        .author("The Borealis Project Developers")
        .about("Play Bink video with Borealis")
        .arg(
            Arg::with_name("dump")
                .long("dump")
                .short('d')
                .value_name("DIR")
                .help("Dump every decoded frame as a raw BGRA file into the given directory"),
        )
        .arg(
            Arg::with_name("INPUT")
                .help("The input file path")
                .required(true)
                .index(1),
        )
        .get_matches();

    let path_str = matches.value_of("INPUT").unwrap();
    let dump_dir = matches.value_of("dump");

    let code = match run(path_str, dump_dir) {
        Ok(()) => 0,
        Err(err) => {
            error!("{}", err);
            1
        }
    };

    std::process::exit(code);
}

fn run(path_str: &str, dump_dir: Option<&str>) -> Result<()> {
    let file = File::open(Path::new(path_str))?;

    let mss =
        MediaSourceStream::new(Box::new(file), MediaSourceStreamOptions::default());

    let reader = BinkReader::try_new(mss, &FormatOptions::default())?;

    let header = reader.header();
    info!(
        "playing {}x{}, {} frames, {} audio tracks",
        header.width,
        header.height,
        header.frames.len(),
        header.audio_tracks.len()
    );

    let mut player = BinkPlayer::try_new(reader, InstantClock::new())?;

    let mut published = 0u64;

    while !player.finished() {
        let produced = match player.process_data()? {
            Some(frame) => {
                if let Some(dir) = dump_dir {
                    let path = format!("{}/frame{:05}.bgra", dir, published);
                    std::fs::write(&path, frame.bytes())?;
                }
                published += 1;
                true
            }
            None => false,
        };

        if !produced && player.got_time() {
            // Nothing due yet; yield instead of spinning on the clock.
            thread::sleep(Duration::from_millis(1));
        }
    }

    info!("decoded {} frames", published);

    Ok(())
}
