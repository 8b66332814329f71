// fst-lookup: analyze or generate with a foma transducer.
//
// Reads words from stdin (one per line) or from the command line and prints
// foma's lookup format: one `input<TAB>result` line per result, `+?` when
// there is none, and a blank line after each input.
//
// Usage:
//   fst-lookup [OPTIONS] FST [WORD...]
//
// Options:
//   -f, --fst PATH            Transducer file (gzip'd or plain foma text)
//   -g, --generate            Generate surface forms instead of analyzing
//   -i, --invert              Load with upper and lower labels swapped
//       --orientation NAME    normal | invert
//       --max-depth N         Most arcs without input on one path
//   -h, --help                Print help

use std::io::{self, BufRead, Write};

use foma_fst::bulk::{BulkLookup, NativeLookup};

fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();

    if foma_cli::wants_help(&args) {
        println!("fst-lookup: Analyze or generate with a foma transducer.");
        println!();
        println!("Usage: fst-lookup [OPTIONS] FST [WORD...]");
        println!();
        println!("If WORD arguments are given, looks up each word.");
        println!("Otherwise reads words from stdin (one per line).");
        println!("FST may be omitted when {} is set.", foma_cli::FST_PATH_ENV);
        println!();
        println!("Options:");
        println!("  -f, --fst PATH            Transducer file (gzip'd or plain foma text)");
        println!("  -g, --generate            Generate surface forms instead of analyzing");
        println!("  -i, --invert              Load with upper and lower labels swapped");
        println!("      --orientation NAME    normal | invert");
        println!("      --max-depth N         Most arcs without input on one path");
        println!("  -h, --help                Print this help");
        println!();
        println!("Set RUST_LOG=debug for load and lookup diagnostics.");
        return;
    }

    foma_cli::init_logging();

    let options = foma_cli::parse_options(&args).unwrap_or_else(|e| foma_cli::fatal(&e));
    let fst = foma_cli::load_fst(&options).unwrap_or_else(|e| foma_cli::fatal(&e));
    tracing::debug!(?fst, "transducer loaded");

    let lookup = NativeLookup::new(&fst, options.direction);

    let words: Vec<String> = if options.words.is_empty() {
        let stdin = io::stdin();
        let mut words = Vec::new();
        for line in stdin.lock().lines() {
            let line = match line {
                Ok(l) => l,
                Err(e) => {
                    eprintln!("error reading stdin: {e}");
                    break;
                }
            };
            let word = line.trim();
            if !word.is_empty() {
                words.push(word.to_string());
            }
        }
        words
    } else {
        options.words.clone()
    };

    let inputs: Vec<&str> = words.iter().map(String::as_str).collect();
    let groups = lookup
        .lookup_in_bulk(&inputs)
        .unwrap_or_else(|e| foma_cli::fatal(&e.to_string()));

    let stdout = io::stdout();
    let mut out = io::BufWriter::new(stdout.lock());
    for (word, results) in inputs.iter().zip(&groups) {
        if results.is_empty() {
            let _ = writeln!(out, "{word}\t+?");
        }
        for result in results {
            let _ = writeln!(out, "{word}\t{result}");
        }
        let _ = writeln!(out);
    }
    let _ = out.flush();
}
