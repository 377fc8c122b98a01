//! Decode GPP strings and print their sections.
//!
//! Usage:
//!   gpp_decode [OPTIONS] [GPP_STRING ...]
//!   gpp_decode < strings.txt
//!
//! Options:
//!   --verbose, -v   Debug logging (RUST_LOG overrides)
//!   --json          One JSON object per input instead of a text dump
//!   --lenient       Keep decoding past sections that fail; report them as rejected
//!   --gvl=PATH      Vendor list JSON, used to name vendors in the dump
//!
//! If no strings are given, reads one string per line from stdin.

use anyhow::Context;
use gppcodec::dump::{dump_model, dump_section};
use gppcodec::frame::decode_gpp_frame;
use gppcodec::{GppModel, Gvl, GvlCache};
use std::io::{self, BufRead};
use std::path::PathBuf;

#[derive(Clone, Copy)]
enum OutputStyle {
    Text,
    Json,
}

fn take_flag(args: &mut Vec<String>, long: &str, short: Option<&str>) -> bool {
    match args.iter().position(|a| a == long || Some(a.as_str()) == short) {
        Some(pos) => {
            args.remove(pos);
            true
        }
        None => false,
    }
}

fn decode_strict(input: &str, gvl: Option<&Gvl>, style: OutputStyle) -> anyhow::Result<()> {
    let model = GppModel::from_encoded(input).with_context(|| format!("decoding '{}'", input))?;
    match style {
        OutputStyle::Text => println!("{}", dump_model(&model, gvl)),
        OutputStyle::Json => println!("{}", model.to_obj()),
    }
    Ok(())
}

fn decode_lenient(input: &str, gvl: Option<&Gvl>, style: OutputStyle) -> anyhow::Result<()> {
    let frame = decode_gpp_frame(input).with_context(|| format!("decoding header of '{}'", input))?;
    match style {
        OutputStyle::Text => {
            for d in &frame.sections {
                println!("{}", dump_section(d.section.as_ref(), gvl));
            }
            for r in &frame.rejected {
                println!("section {} at {} rejected: {}", r.id, r.index, r.reason);
            }
        }
        OutputStyle::Json => {
            let mut sections = serde_json::Map::new();
            for d in &frame.sections {
                sections.insert(d.section.name().to_string(), d.section.to_obj());
            }
            let rejected: Vec<serde_json::Value> = frame
                .rejected
                .iter()
                .map(|r| serde_json::json!({ "id": r.id, "index": r.index, "encoded": r.encoded, "reason": r.reason }))
                .collect();
            println!("{}", serde_json::json!({ "sections": sections, "rejected": rejected }));
        }
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let mut raw_args: Vec<String> = std::env::args().skip(1).collect();
    let verbose = take_flag(&mut raw_args, "--verbose", Some("-v"));
    let style = if take_flag(&mut raw_args, "--json", None) { OutputStyle::Json } else { OutputStyle::Text };
    let lenient = take_flag(&mut raw_args, "--lenient", None);
    let gvl_path: Option<PathBuf> = raw_args
        .iter()
        .position(|a| a.starts_with("--gvl="))
        .and_then(|pos| raw_args.remove(pos).strip_prefix("--gvl=").map(PathBuf::from));

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(if verbose { "debug" } else { "warn" }))
        .format_timestamp_millis()
        .init();

    let mut cache = GvlCache::new();
    let gvl = match &gvl_path {
        Some(p) => Some(cache.get_or_load(|| Gvl::from_path(p)).with_context(|| format!("loading {}", p.display()))?),
        None => None,
    };

    let inputs: Vec<String> = if raw_args.is_empty() {
        io::stdin()
            .lock()
            .lines()
            .collect::<io::Result<Vec<_>>>()?
            .into_iter()
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty())
            .collect()
    } else {
        raw_args
    };

    let mut failures = 0usize;
    for input in &inputs {
        let result = if lenient {
            decode_lenient(input, gvl.as_deref(), style)
        } else {
            decode_strict(input, gvl.as_deref(), style)
        };
        if let Err(e) = result {
            log::error!("{:#}", e);
            failures += 1;
        }
    }
    log::info!("decoded {} of {} strings", inputs.len() - failures, inputs.len());
    if failures > 0 {
        anyhow::bail!("{} of {} strings failed to decode", failures, inputs.len());
    }
    Ok(())
}
