use std::io::{self, Write};

use beaconradar_core::{Classifier, LineEvent};

use crate::feed::lossy_lines;

/// Print one JSON event per input line.
pub fn run(input: &str, label_a: &str, label_b: &str, skip_ignored: bool) {
    let reader = match super::replay::open_input(input) {
        Ok(reader) => reader,
        Err(e) => {
            eprintln!("Error: cannot open {input}: {e}");
            std::process::exit(1);
        }
    };
    let classifier = Classifier::new(label_a, label_b);
    let stdout = io::stdout();
    let mut out = stdout.lock();

    for line in lossy_lines(reader) {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                eprintln!("Error: read failed: {e}");
                std::process::exit(1);
            }
        };
        let event = classifier.classify(&line);
        if skip_ignored && event == LineEvent::Ignored {
            continue;
        }
        let json = serde_json::to_string(&event).unwrap_or_default();
        if writeln!(out, "{json}").is_err() {
            // Downstream closed the pipe.
            return;
        }
    }
}
