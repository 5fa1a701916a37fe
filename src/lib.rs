//! Line parser for the G-code dialect spoken by motion-control firmware.
//!
//! A [`GCodeProcessor`] takes one line at a time and turns it into zero or
//! more [`GCode`] records. It understands several commands packed onto one
//! line (`M123X1Y2G1X10`), modal reuse of the last G command, `T<n>` as a
//! tool change, comments, and the `N<k> ... *<checksum>` line protocol used
//! by print hosts.
//!
//! ```
//! use gcode_processor::GCodeProcessor;
//!
//! let mut gp = GCodeProcessor::new();
//! let (ok, gcodes) = gp.parse("G1 X10 Y20 ; move");
//! assert!(ok);
//! assert_eq!(gcodes[0].to_string(), "G1 X10 Y20");
//! ```

pub mod error;
pub mod gcode;
pub mod number;
pub mod parser;

pub use error::{ProtocolError, SyntaxError};
pub use gcode::{CommandKind, GCode};
pub use number::parse_float;
pub use parser::{GCodeProcessor, GCodes};
