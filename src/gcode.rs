use std::collections::HashMap;
use std::fmt;

/// Command family of a parsed record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    G,
    M,
}

impl CommandKind {
    pub fn letter(self) -> char {
        match self {
            CommandKind::G => 'G',
            CommandKind::M => 'M',
        }
    }
}

/// One parsed command, e.g. `G1 X10 Y20` or `M6 T1`.
///
/// A default-constructed `GCode` has no kind and no arguments. A record with
/// an error message set is a sentinel describing why parsing of the line
/// stopped; it carries no command.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GCode {
    kind: Option<CommandKind>,
    code: u16,
    subcode: u8,
    args: HashMap<char, f32>,
    error: Option<String>,
}

impl GCode {
    pub fn new(kind: CommandKind, code: u16, subcode: u8) -> GCode {
        GCode {
            kind: Some(kind),
            code,
            subcode,
            ..GCode::default()
        }
    }

    /// Sentinel record carrying a syntax diagnostic.
    pub fn error(message: impl Into<String>) -> GCode {
        GCode {
            error: Some(message.into()),
            ..GCode::default()
        }
    }

    pub fn kind(&self) -> Option<CommandKind> {
        self.kind
    }

    pub fn has_g(&self) -> bool {
        self.kind == Some(CommandKind::G)
    }

    pub fn has_m(&self) -> bool {
        self.kind == Some(CommandKind::M)
    }

    pub fn code(&self) -> u16 {
        self.code
    }

    pub fn subcode(&self) -> u8 {
        self.subcode
    }

    pub fn args(&self) -> &HashMap<char, f32> {
        &self.args
    }

    pub fn arg(&self, letter: char) -> Option<f32> {
        self.args.get(&letter).copied()
    }

    /// Argument truncated towards zero, as used for tool numbers, pins and
    /// similar integral parameters.
    pub fn int_arg(&self, letter: char) -> Option<i32> {
        self.arg(letter).map(|v| v as i32)
    }

    pub fn has_arg(&self, letter: char) -> bool {
        self.args.contains_key(&letter)
    }

    pub fn num_args(&self) -> usize {
        self.args.len()
    }

    /// Sets an argument, replacing any earlier value for the same letter.
    pub fn set_arg(&mut self, letter: char, value: f32) {
        self.args.insert(letter, value);
    }

    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

/// Canonical text form: command word first, then arguments sorted by letter.
impl fmt::Display for GCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(message) = &self.error {
            return write!(f, "error: {message}");
        }
        let Some(kind) = self.kind else {
            return Ok(());
        };

        write!(f, "{}{}", kind.letter(), self.code)?;
        if self.subcode != 0 {
            write!(f, ".{}", self.subcode)?;
        }

        let mut letters: Vec<_> = self.args.keys().copied().collect();
        letters.sort_unstable();
        for letter in letters {
            write!(f, " {}{}", letter, self.args[&letter])?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn g32_2() -> GCode {
        let mut gc = GCode::new(CommandKind::G, 32, 2);
        gc.set_arg('X', 1.2);
        gc.set_arg('Y', 2.3);
        gc
    }

    #[test]
    fn empty_record() {
        let gc = GCode::default();
        assert!(!gc.has_g());
        assert!(!gc.has_m());
        assert!(!gc.has_error());
        assert_eq!(gc.kind(), None);
        assert_eq!(gc.num_args(), 0);
        assert_eq!(gc.to_string(), "");
    }

    #[test]
    fn copies_are_independent() {
        let original = g32_2();
        let mut copy = original.clone();
        assert_eq!(copy, original);

        copy.set_arg('X', 99.0);
        copy.set_arg('Z', 1.0);
        assert_eq!(original.arg('X'), Some(1.2));
        assert!(!original.has_arg('Z'));
        assert_eq!(original.num_args(), 2);
        assert_ne!(copy, original);
    }

    #[test]
    fn repeated_letter_overwrites() {
        let mut gc = GCode::new(CommandKind::M, 104, 0);
        gc.set_arg('S', 200.0);
        gc.set_arg('S', 210.0);
        assert_eq!(gc.num_args(), 1);
        assert_eq!(gc.int_arg('S'), Some(210));
    }

    #[test]
    fn display_is_canonical() {
        assert_eq!(g32_2().to_string(), "G32.2 X1.2 Y2.3");

        let mut tool = GCode::new(CommandKind::M, 6, 0);
        tool.set_arg('T', 1.0);
        assert_eq!(tool.to_string(), "M6 T1");

        let err = GCode::error("unexpected character '&'");
        assert!(err.has_error());
        assert_eq!(err.kind(), None);
        assert_eq!(err.to_string(), "error: unexpected character '&'");
    }
}
