//! # G-code Translation
//!
//! Turns actuation commands into the G-code lines written to the printer.
//!
//! Moves are issued in relative mode and the printer is put back into
//! absolute mode afterwards, so a lost command never leaves the machine in
//! an unexpected positioning mode.

use super::{Axis, Command};

/// Translate an actuation command into newline-terminated G-code
///
/// # Returns
///
/// * `Some(String)` - G-code for `jog`, `extrude` and `home`
/// * `None` - for every other command
///
/// # Examples
///
/// ```
/// use jogpad::protocol::{Axis, Command};
/// use jogpad::protocol::gcode::to_gcode;
///
/// let gcode = to_gcode(&Command::Jog { axis: Axis::X, distance: 5.0, feedrate: 3000 });
/// assert_eq!(gcode.as_deref(), Some("G91\nG1 X5.0 F3000\nG90\n"));
/// ```
pub fn to_gcode(command: &Command) -> Option<String> {
    match command {
        Command::Jog { axis, distance, feedrate } => Some(format!(
            "G91\nG1 {}{:.1} F{}\nG90\n",
            axis.letter(),
            distance,
            feedrate
        )),
        Command::Extrude { distance, feedrate } => {
            Some(format!("M83\nG1 E{:.1} F{}\nM82\n", distance, feedrate))
        }
        Command::Home { axes } => Some(home_line(axes)),
        _ => None,
    }
}

fn home_line(axes: &[Axis]) -> String {
    let mut line = String::from("G28");
    for axis in axes {
        line.push(' ');
        line.push(axis.letter());
    }
    line.push('\n');
    line
}
