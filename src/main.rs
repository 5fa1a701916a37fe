use gcode_processor::{GCode, GCodeProcessor};
use std::{error::Error, io::Read};

struct SourceLine {
    text: String,
    loc: usize,
}

enum Outcome {
    Parsed(Vec<GCode>),
    SyntaxError(Vec<GCode>),
    Rejected,
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let args: Vec<_> = std::env::args().collect();
    let Some(input_file) = args.get(1) else {
        eprintln!("Usage: gcode-processor <file | ->");
        std::process::exit(1);
    };

    let source = if input_file == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        std::fs::read_to_string(input_file)?
    };

    let line_sep = if source.contains("\r\n") {
        "\r\n"
    } else {
        "\n"
    };

    let lines = source
        .split(line_sep)
        .enumerate()
        .map(|(i, line)| SourceLine {
            text: line.to_owned(),
            loc: i + 1,
        });

    // one processor for the whole stream, line numbering and modal state
    // carry over from line to line
    let mut gp = GCodeProcessor::new();
    let outcomes = lines.map(|line| {
        let (ok, gcodes) = gp.parse(&line.text);
        let outcome = match (ok, gcodes.is_empty()) {
            (true, _) => Outcome::Parsed(gcodes),
            (false, true) => Outcome::Rejected,
            (false, false) => Outcome::SyntaxError(gcodes),
        };
        (line, outcome)
    });

    let mut failures = 0;
    for (line, outcome) in outcomes {
        match outcome {
            Outcome::Parsed(gcodes) => {
                for gcode in gcodes {
                    println!("{gcode}");
                }
            }
            Outcome::SyntaxError(gcodes) => {
                failures += 1;
                for gcode in gcodes {
                    match gcode.error_message() {
                        Some(msg) => eprintln!("line {}: {msg}\n\n  {}\n", line.loc, line.text),
                        None => println!("{gcode}"),
                    }
                }
            }
            Outcome::Rejected => {
                failures += 1;
                eprintln!("line {}: rejected by line number/checksum check", line.loc);
            }
        }
    }

    if failures > 0 {
        return Err(format!("{failures} line(s) failed").into());
    }
    Ok(())
}
