use std::sync::LazyLock;

use fancy_regex::Regex;
use log::{debug, warn};

use crate::error::{ProtocolError, SyntaxError};
use crate::gcode::{CommandKind, GCode};
use crate::number::parse_float;

pub type GCodes = Vec<GCode>;

// `( ... )` anywhere, unterminated runs to end of line; `;` to end of line
static COMMENT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\([^)]*\)?|;.*").unwrap());
static LINE_NUMBER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s*[Nn](\d+)").unwrap());
// greedy head so the last `*` wins
static CHECKSUM: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(.*)\*(\d+)\s*$").unwrap());
static RESET: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s*M110(?![\d.])").unwrap());

/// The G-word most recently seen, reused for lines that carry only
/// parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ModalCommand {
    code: u16,
    subcode: u8,
}

enum Payload {
    Reset(u32),
    Words(String),
}

/// Turns lines of G-code into [`GCode`] records.
///
/// Holds the per-connection state of the line protocol: the last accepted
/// sequence number and the modal G command. Channels with their own
/// numbering need their own processor.
#[derive(Debug, Default)]
pub struct GCodeProcessor {
    line_number: Option<u32>,
    modal: Option<ModalCommand>,
}

impl GCodeProcessor {
    pub fn new() -> GCodeProcessor {
        GCodeProcessor::default()
    }

    /// Number of the last accepted sequence-numbered line (or the value set
    /// by the last `M110`). The next numbered line must carry this plus one.
    pub fn line_number(&self) -> Option<u32> {
        self.line_number
    }

    /// Forgets the sequence baseline; numbered lines are rejected until the
    /// next `M110`.
    pub fn reset_line_number(&mut self) {
        self.line_number = None;
    }

    /// Parses one line.
    ///
    /// Returns `false` with no records when the line fails the
    /// line-number/checksum protocol and must be resent. Returns `false`
    /// with the records parsed so far plus a trailing error record when the
    /// line has a syntax error. Lines that reset the line number (`M110`)
    /// succeed without records.
    pub fn parse(&mut self, line: &str) -> (bool, GCodes) {
        let line = line.trim_end_matches(['\r', '\n']);

        let words = match self.check_sequence(line) {
            Ok(Payload::Words(words)) => words,
            Ok(Payload::Reset(n)) => {
                self.set_line_number(n);
                return (true, GCodes::new());
            }
            Err(err) => {
                warn!("rejected {line:?}: {err}");
                return (false, GCodes::new());
            }
        };

        let mut gcodes = GCodes::new();
        if let Err(err) = self.tokenize(&words, &mut gcodes) {
            debug!("syntax error in {line:?}: {err}");
            gcodes.push(GCode::error(err.to_string()));
            return (false, gcodes);
        }

        if let Some(first) = gcodes.first() {
            if first.has_m() && first.code() == 110 && first.subcode() == 0 {
                // saturating cast, negative values reset to 0
                let n = first.arg('N').map_or(0, |v| v as u32);
                self.set_line_number(n);
                return (true, GCodes::new());
            }
        }

        (true, gcodes)
    }

    fn set_line_number(&mut self, n: u32) {
        debug!("line number reset to {n}");
        self.line_number = Some(n);
    }

    /// Validates the `N<k> ... *<sum>` envelope of sequence-numbered lines
    /// and returns the text left to tokenize.
    fn check_sequence(&mut self, line: &str) -> Result<Payload, ProtocolError> {
        // the suffix is split off the raw text so a `;` comment cannot hide it
        let checksum = CHECKSUM.captures(line).ok().flatten();
        let star = checksum
            .as_ref()
            .and_then(|c| c.get(1))
            .map_or(line.len(), |head| head.end());
        let stripped = clean(line.get(..star).unwrap_or(line));

        let Some(prefix) = LINE_NUMBER.captures(&stripped).ok().flatten() else {
            return Ok(Payload::Words(clean(line)));
        };
        let (Some(whole), Some(digits)) = (prefix.get(0), prefix.get(1)) else {
            return Ok(Payload::Words(clean(line)));
        };
        let number: u32 = digits
            .as_str()
            .parse()
            .map_err(|_| ProtocolError::BadLineNumber(digits.as_str().to_owned()))?;
        let words = stripped[whole.end()..].to_owned();

        // M110 is accepted whatever its checksum says, it is how the host
        // resynchronises after errors
        if RESET.is_match(&words).unwrap_or(false) {
            return Ok(Payload::Reset(number));
        }

        let Some(sent) = checksum.as_ref().and_then(|c| c.get(2)) else {
            return Err(ProtocolError::MissingChecksum { line: number });
        };
        let computed = line.as_bytes()[..star].iter().fold(0u8, |acc, b| acc ^ b);
        if sent.as_str().parse::<u32>().ok() != Some(u32::from(computed)) {
            return Err(ProtocolError::ChecksumMismatch {
                line: number,
                sent: sent.as_str().to_owned(),
                computed,
            });
        }

        let last = self
            .line_number
            .ok_or(ProtocolError::LineNumberUnset { line: number })?;
        let expected = last
            .checked_add(1)
            .ok_or(ProtocolError::LineNumberExhausted { last })?;
        if number != expected {
            return Err(ProtocolError::LineNumberMismatch {
                expected,
                line: number,
            });
        }

        self.line_number = Some(number);
        Ok(Payload::Words(words))
    }

    /// Splits `words` into records, appending each to `gcodes` as soon as
    /// its command word is read so that a syntax error keeps what came
    /// before it.
    fn tokenize(&mut self, words: &str, gcodes: &mut GCodes) -> Result<(), SyntaxError> {
        let bytes = words.as_bytes();
        let mut pos = 0;

        loop {
            while bytes.get(pos).is_some_and(|b| b.is_ascii_whitespace()) {
                pos += 1;
            }
            let Some(&b) = bytes.get(pos) else {
                return Ok(());
            };

            if !b.is_ascii_alphabetic() {
                let (_, end) = parse_float(words, pos);
                if end > pos {
                    return Err(SyntaxError::UnexpectedNumber(words[pos..end].to_owned()));
                }
                let ch = words[pos..].chars().next().unwrap_or(char::REPLACEMENT_CHARACTER);
                return Err(SyntaxError::UnexpectedCharacter(ch));
            }

            let letter = char::from(b);
            let (value, end) = parse_float(words, pos + 1);
            if end == pos + 1 {
                return Err(SyntaxError::MissingValue(letter));
            }
            let literal = words[pos + 1..end].trim_start();
            pos = end;

            match letter {
                'G' | 'M' => {
                    let (code, subcode) = command_code(letter, literal)?;
                    let kind = if letter == 'G' {
                        self.modal = Some(ModalCommand { code, subcode });
                        CommandKind::G
                    } else {
                        CommandKind::M
                    };
                    gcodes.push(GCode::new(kind, code, subcode));
                }
                // `M6 T1` names the tool of an open tool change, any other
                // tool select starts one
                'T' if !gcodes.last().is_some_and(awaits_tool) => {
                    let mut tool_change = GCode::new(CommandKind::M, 6, 0);
                    tool_change.set_arg('T', value);
                    gcodes.push(tool_change);
                }
                _ => {
                    if gcodes.is_empty() {
                        let modal = self.modal.ok_or(SyntaxError::NoModalCommand(letter))?;
                        gcodes.push(GCode::new(CommandKind::G, modal.code, modal.subcode));
                    }
                    if let Some(current) = gcodes.last_mut() {
                        current.set_arg(letter, value);
                    }
                }
            }
        }
    }
}

fn awaits_tool(gcode: &GCode) -> bool {
    gcode.has_m() && gcode.code() == 6 && gcode.subcode() == 0 && !gcode.has_arg('T')
}

/// Strips comments and upper-cases what is left.
fn clean(text: &str) -> String {
    COMMENT.replace_all(text, " ").to_ascii_uppercase()
}

/// Splits a command literal such as `32.2` into code and subcode. Only the
/// first digit after the point is the subcode.
fn command_code(letter: char, literal: &str) -> Result<(u16, u8), SyntaxError> {
    let unsigned = literal.strip_prefix('+').unwrap_or(literal);
    if unsigned.starts_with('-') {
        return Err(SyntaxError::NegativeCode {
            letter,
            literal: literal.to_owned(),
        });
    }

    let (int_part, frac_part) = unsigned.split_once('.').unwrap_or((unsigned, ""));
    let code = if int_part.is_empty() {
        0
    } else {
        int_part
            .parse::<u16>()
            .map_err(|_| SyntaxError::CodeOutOfRange {
                letter,
                literal: literal.to_owned(),
            })?
    };
    let subcode = frac_part.bytes().next().map_or(0, |d| d - b'0');
    Ok((code, subcode))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_codes() {
        assert_eq!(command_code('G', "32.2"), Ok((32, 2)));
        assert_eq!(command_code('G', "1"), Ok((1, 0)));
        assert_eq!(command_code('G', "+28"), Ok((28, 0)));
        assert_eq!(command_code('G', "38.25"), Ok((38, 2)));
        assert_eq!(command_code('M', "5."), Ok((5, 0)));
        assert_eq!(command_code('M', ".3"), Ok((0, 3)));
        assert!(matches!(
            command_code('G', "-1"),
            Err(SyntaxError::NegativeCode { letter: 'G', .. })
        ));
        assert!(matches!(
            command_code('M', "70000"),
            Err(SyntaxError::CodeOutOfRange { letter: 'M', .. })
        ));
    }

    #[test]
    fn comments_are_stripped() {
        assert_eq!(clean("( a comment )X100Y200 ; G23 X0"), " X100Y200  ");
        assert_eq!(clean("g1 x1 (unterminated y2"), "G1 X1  ");
        assert_eq!(clean("G1(a)X1(b)Y2"), "G1 X1 Y2");
        assert_eq!(clean(";only a comment"), " ");
    }

    #[test]
    fn sequence_envelope() {
        let mut gp = GCodeProcessor::new();
        assert_eq!(
            gp.check_sequence("N10 G1 X0").err(),
            Some(ProtocolError::MissingChecksum { line: 10 })
        );
        assert!(matches!(gp.check_sequence("N10 M110*123"), Ok(Payload::Reset(10))));

        gp.line_number = Some(94);
        assert!(matches!(
            gp.check_sequence("N95 G1 X-4.992 Y-14.792 F12000.000*98"),
            Err(ProtocolError::ChecksumMismatch { line: 95, computed: 97, .. })
        ));
        assert_eq!(gp.line_number, Some(94));
        assert!(matches!(
            gp.check_sequence("N96 G1 X-4.992 Y-14.792 F12000.000*98"),
            Err(ProtocolError::LineNumberMismatch { expected: 95, line: 96 })
        ));
        assert!(matches!(
            gp.check_sequence("N99999999999 G1*1"),
            Err(ProtocolError::BadLineNumber(_))
        ));

        gp.line_number = Some(u32::MAX);
        assert_eq!(
            gp.check_sequence("N4294967295 G1 X1*92").err(),
            Some(ProtocolError::LineNumberExhausted { last: u32::MAX })
        );
    }

    #[test]
    fn line_number_found_after_comments() {
        let mut gp = GCodeProcessor::new();
        gp.line_number = Some(0);
        match gp.check_sequence("(hdr)N1 G1 X5*27") {
            Ok(Payload::Words(words)) => assert_eq!(words.trim(), "G1 X5"),
            _ => panic!("numbered line with leading comment not accepted"),
        }
        assert_eq!(gp.line_number, Some(1));
    }

    #[test]
    fn modal_memory_only_follows_g_words() {
        let mut gp = GCodeProcessor::new();
        gp.parse("G2 X1 Y1 I1 J0");
        gp.parse("M3 S1000");
        gp.parse("T2");
        assert_eq!(gp.modal, Some(ModalCommand { code: 2, subcode: 0 }));

        gp.parse("G38.2 Z-10");
        assert_eq!(gp.modal, Some(ModalCommand { code: 38, subcode: 2 }));

        let (ok, _) = gp.parse("N5 G0 X0*99");
        assert!(!ok);
        assert_eq!(gp.modal, Some(ModalCommand { code: 38, subcode: 2 }));
    }
}
