//! PLM Protocol Constants
//!
//! Defaults used when a parameter table leaves an optional value out, and the
//! fixed facts of the Insteon serial interface.

/// Start-of-text byte that opens every frame in both directions
pub const PLM_DEFAULT_SENTINEL: u8 = 0x02;

/// Serial line speed of the 2413U/2413S modems
pub const PLM_DEFAULT_BAUD_RATE: u32 = 19200;

/// Ack byte for an accepted command
pub const PLM_ACK: u8 = 0x06;

/// Ack byte for a rejected command
pub const PLM_NAK: u8 = 0x15;

/// Per-read timeout
pub const PLM_DEFAULT_READ_TIMEOUT_MS: u64 = 1000;

/// Upper bound on the wait for a matching reply, across all interleaved frames
pub const PLM_DEFAULT_REPLY_TIMEOUT_MS: u64 = 2000;

/// Stray bytes tolerated before a sentinel shows up
pub const PLM_DEFAULT_RESYNC_LIMIT: usize = 1024;

/// Reserved self-test command issued by connect
pub const PLM_CMD_GET_VERSION: &str = "GET_VERSION";

/// Name of the reply field carrying the ack byte
pub const PLM_ACK_FIELD: &str = "ack";

// ----------------------------------------------------------------------------
// USB signature of the FTDI bridge inside the modem
// ----------------------------------------------------------------------------

pub const PLM_USB_VID: u16 = 0x0403;
pub const PLM_USB_PID: u16 = 0x6001;

// ----------------------------------------------------------------------------
// Configuration file names
// ----------------------------------------------------------------------------

pub const CONFIG_SEND_COMMANDS: &str = "cmds_send.json";
pub const CONFIG_RECEIVE_FRAMES: &str = "cmds_receive.json";
pub const CONFIG_PARAMETERS: &str = "im_parms.json";
pub const CONFIG_DEVICES: &str = "devices.json";
