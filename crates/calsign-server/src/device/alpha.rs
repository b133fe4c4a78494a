//! Alpha sign protocol packets.
//!
//! Every packet is a run of NULs for baud detection, then
//! `SOH <type> <address> STX <command> ... EOT`. Only the handful of
//! commands calsign needs are built here.

const PREAMBLE: [u8; 5] = [0x00; 5];
const SOH: u8 = 0x01;
const STX: u8 = 0x02;
const EOT: u8 = 0x04;
const ESC: u8 = 0x1b;

/// Type code addressing every sign model.
const ALL_SIGNS: u8 = b'Z';
/// Broadcast address.
const ADDRESS: &[u8; 2] = b"00";

/// Label of the string file holding the message.
pub const MESSAGE_LABEL: u8 = b'A';
/// Label of the text file that displays the message.
pub const TEXT_LABEL: u8 = b'1';
/// Size reserved for the message string file.
pub const MESSAGE_CAPACITY: u16 = 255;

/// Text file display modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Rotate,
    Hold,
}

impl Mode {
    fn code(self) -> u8 {
        match self {
            Self::Rotate => b'a',
            Self::Hold => b'b',
        }
    }
}

/// Seven-pixel-high standard character set.
const SEVEN_HIGH_STD: &[u8] = b"\x1a3";

fn packet(body: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(PREAMBLE.len() + body.len() + 6);
    out.extend_from_slice(&PREAMBLE);
    out.push(SOH);
    out.push(ALL_SIGNS);
    out.extend_from_slice(ADDRESS);
    out.push(STX);
    out.extend_from_slice(body);
    out.push(EOT);
    out
}

/// Clears every file from sign memory.
pub fn clear_memory() -> Vec<u8> {
    packet(b"E$")
}

/// Short beep.
pub fn beep() -> Vec<u8> {
    packet(b"E(0")
}

/// Allocates the message string file and the text file that calls it.
pub fn allocate() -> Vec<u8> {
    let mut body = b"E$".to_vec();
    // string file: label, type B, locked, size, padding
    body.push(MESSAGE_LABEL);
    body.extend_from_slice(b"BL");
    body.extend_from_slice(format!("{:04X}", MESSAGE_CAPACITY).as_bytes());
    body.extend_from_slice(b"0000");
    // text file: label, type A, unlocked, size, always on
    body.push(TEXT_LABEL);
    body.extend_from_slice(b"AU");
    body.extend_from_slice(format!("{:04X}", 64).as_bytes());
    body.extend_from_slice(b"FF00");
    packet(&body)
}

/// Makes the sign show only the text file.
pub fn run_sequence() -> Vec<u8> {
    let mut body = b"E.TU".to_vec();
    body.push(TEXT_LABEL);
    packet(&body)
}

/// Writes the text file: the message string in the given mode.
pub fn write_text_file(mode: Mode) -> Vec<u8> {
    let mut body = vec![b'A', TEXT_LABEL, ESC, b' ', mode.code()];
    body.extend_from_slice(SEVEN_HIGH_STD);
    // call string file
    body.push(0x10);
    body.push(MESSAGE_LABEL);
    packet(&body)
}

/// Replaces the message string.
pub fn write_message(text: &str) -> Vec<u8> {
    let mut body = vec![b'G', MESSAGE_LABEL];
    body.extend_from_slice(text.as_bytes());
    packet(&body)
}
