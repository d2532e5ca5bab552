// Motion board serial protocol
//
// Packet format: [0xFF, 0xFF, ID, Length, Instruction, Params..., Checksum]
// Length counts instruction + params + checksum. The board answers every
// instruction with [0xFF, 0xFF, ID, Length, Status, Params..., Checksum];
// blocking moves answer only once the move has finished.

use serialport::{self, SerialPort};
use std::io::{Read, Write};
use std::time::Duration;
use tracing::debug;

use super::{HardwareError, Result};

/// Default serial configuration for the motion board
pub const DEFAULT_BAUDRATE: u32 = 115_200;
pub const DEFAULT_TIMEOUT_MS: u64 = 100;

/// Blocking moves (turns, timed drives) may take this long to report back
pub const MOTION_TIMEOUT_MS: u64 = 10_000;

/// Address of the motion board on the bus
pub const BOARD_ID: u8 = 1;

/// Packet header bytes
const HEADER: [u8; 2] = [0xFF, 0xFF];
/// Header, id and length: the bytes read before the length is known
const FRAME_PREFIX: usize = 4;

/// Instruction set
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    Ping = 0x01,
    SetMotors = 0x10,
    Turn = 0x11,
    DriveTimed = 0x12,
    ReadProximity = 0x20,
    ReadLine = 0x21,
    ReadEncoder = 0x22,
    ResetEncoders = 0x23,
    ReadLight = 0x24,
}

/// Motion board bus - handles framing and checksums on the serial link
pub struct MotionBus {
    port: Box<dyn SerialPort>,
}

impl MotionBus {
    /// Open a new connection to the motion board
    pub fn open(port_name: &str) -> Result<Self> {
        Self::open_with_baudrate(port_name, DEFAULT_BAUDRATE)
    }

    /// Open with custom baudrate
    pub fn open_with_baudrate(port_name: &str, baudrate: u32) -> Result<Self> {
        let port = serialport::new(port_name, baudrate)
            .timeout(Duration::from_millis(DEFAULT_TIMEOUT_MS))
            .open()?;

        Ok(Self { port })
    }

    /// Send an instruction and wait for its status reply
    fn transact(&mut self, instruction: Instruction, params: &[u8]) -> Result<Vec<u8>> {
        let frame = encode_frame(BOARD_ID, instruction, params);
        debug!("Send {:?} to board {}: {:02X?}", instruction, BOARD_ID, params);
        self.port.write_all(&frame)?;
        self.port.flush()?;
        self.read_reply(BOARD_ID)
    }

    /// Pull one reply frame off the wire: the fixed four leading bytes,
    /// then as many more as its length byte announces
    fn read_reply(&mut self, expected_id: u8) -> Result<Vec<u8>> {
        let mut frame = vec![0u8; FRAME_PREFIX];
        self.port.read_exact(&mut frame).map_err(|e| match e.kind() {
            std::io::ErrorKind::TimedOut => HardwareError::Timeout { id: expected_id },
            _ => HardwareError::Io(e),
        })?;

        let length = frame[FRAME_PREFIX - 1] as usize;
        frame.resize(FRAME_PREFIX + length, 0);
        self.port.read_exact(&mut frame[FRAME_PREFIX..])?;

        decode_reply(expected_id, &frame)
    }

    /// Like `transact`, but waits long enough for a blocking move to finish
    fn transact_motion(&mut self, instruction: Instruction, params: &[u8]) -> Result<()> {
        self.port
            .set_timeout(Duration::from_millis(MOTION_TIMEOUT_MS))?;
        let result = self.transact(instruction, params);
        self.port
            .set_timeout(Duration::from_millis(DEFAULT_TIMEOUT_MS))?;
        result.map(|_| ())
    }

    /// Read a two-byte little-endian reply
    fn transact_u16(&mut self, instruction: Instruction, params: &[u8]) -> Result<u16> {
        let response = self.transact(instruction, params)?;
        if response.len() < 2 {
            return Err(HardwareError::InvalidResponse {
                id: BOARD_ID,
                reason: format!("Expected 2 bytes, got {}", response.len()),
            });
        }
        Ok(u16::from_le_bytes([response[0], response[1]]))
    }

    /// Ping the board to check it's connected
    pub fn ping(&mut self) -> Result<bool> {
        match self.transact(Instruction::Ping, &[]) {
            Ok(_) => Ok(true),
            Err(HardwareError::Timeout { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    pub fn set_motors(&mut self, left: i16, right: i16) -> Result<()> {
        let [l_lo, l_hi] = encode_sign_magnitude(left).to_le_bytes();
        let [r_lo, r_hi] = encode_sign_magnitude(right).to_le_bytes();
        self.transact(Instruction::SetMotors, &[l_lo, l_hi, r_lo, r_hi])
            .map(|_| ())
    }

    /// Signed turn: positive degrees turn right (clockwise)
    pub fn turn(&mut self, degrees: i16) -> Result<()> {
        let raw = encode_sign_magnitude(degrees).to_le_bytes();
        self.transact_motion(Instruction::Turn, &raw)
    }

    /// Signed timed drive: positive millis drive forward
    pub fn drive_timed(&mut self, millis: i16) -> Result<()> {
        let raw = encode_sign_magnitude(millis).to_le_bytes();
        self.transact_motion(Instruction::DriveTimed, &raw)
    }

    pub fn read_proximity(&mut self, channel: u8) -> Result<u16> {
        self.transact_u16(Instruction::ReadProximity, &[channel])
    }

    pub fn read_line(&mut self, channel: u8) -> Result<u16> {
        self.transact_u16(Instruction::ReadLine, &[channel])
    }

    pub fn read_encoder(&mut self, channel: u8) -> Result<u16> {
        self.transact_u16(Instruction::ReadEncoder, &[channel])
    }

    pub fn reset_encoders(&mut self) -> Result<()> {
        self.transact(Instruction::ResetEncoders, &[]).map(|_| ())
    }

    pub fn read_light(&mut self) -> Result<u16> {
        self.transact_u16(Instruction::ReadLight, &[])
    }
}

/// Inverted low byte of the sum of everything between header and checksum
fn checksum(bytes: &[u8]) -> u8 {
    !bytes.iter().fold(0u8, |sum, &b| sum.wrapping_add(b))
}

/// Frame an instruction for the board. The length byte counts the
/// instruction, its params and the checksum.
fn encode_frame(id: u8, instruction: Instruction, params: &[u8]) -> Vec<u8> {
    let mut frame = HEADER.to_vec();
    frame.extend([id, (params.len() + 2) as u8, instruction as u8]);
    frame.extend_from_slice(params);
    frame.push(checksum(&frame[HEADER.len()..]));
    frame
}

/// Check a complete reply frame and return its params
fn decode_reply(expected_id: u8, frame: &[u8]) -> Result<Vec<u8>> {
    let invalid = |reason: String| HardwareError::InvalidResponse {
        id: expected_id,
        reason,
    };

    let Some((prefix, rest)) = frame.split_at_checked(FRAME_PREFIX) else {
        return Err(invalid(format!("Frame of {} bytes is truncated", frame.len())));
    };
    if prefix[..2] != HEADER {
        return Err(invalid(format!("Invalid header: {:02X?}", &prefix[..2])));
    }
    let (id, length) = (prefix[2], prefix[3] as usize);
    if id != expected_id {
        return Err(invalid(format!("Reply from board {}", id)));
    }
    // At least a status byte and the checksum
    if length < 2 || rest.len() != length {
        return Err(invalid(format!(
            "Length byte {} but {} bytes follow",
            length,
            rest.len()
        )));
    }

    let (checked, received) = frame[HEADER.len()..].split_at(length + 1);
    if checksum(checked) != received[0] {
        return Err(HardwareError::ChecksumMismatch { id });
    }

    match rest[0] {
        0 => Ok(rest[1..length - 1].to_vec()),
        status => Err(HardwareError::DeviceError { id, status }),
    }
}

/// Encode a signed value to sign-magnitude format
/// Bit 15 = sign (1 = negative), Bits 0-14 = magnitude
fn encode_sign_magnitude(value: i16) -> u16 {
    let magnitude = value.unsigned_abs().min(0x7FFF);
    if value >= 0 {
        magnitude
    } else {
        0x8000 | magnitude
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Reply frame from the board with a correct checksum
    fn reply(id: u8, status: u8, params: &[u8]) -> Vec<u8> {
        let mut frame = HEADER.to_vec();
        frame.extend([id, (params.len() + 2) as u8, status]);
        frame.extend_from_slice(params);
        frame.push(checksum(&frame[HEADER.len()..]));
        frame
    }

    #[test]
    fn test_checksum() {
        // ID=1, Length=6, SetMotors, left=42, right=30
        let data = [1u8, 6, 0x10, 42, 0, 30, 0];
        // ~(1+6+16+42+30) = ~95 = 160
        assert_eq!(checksum(&data), 160);
        // Sums past 255 only keep the low byte
        assert_eq!(checksum(&[0xFF, 0x02]), !0x01);
    }

    #[test]
    fn test_sign_magnitude_encoding() {
        assert_eq!(encode_sign_magnitude(0), 0);
        assert_eq!(encode_sign_magnitude(91), 91);
        assert_eq!(encode_sign_magnitude(-91), 0x805B);
        assert_eq!(encode_sign_magnitude(-1), 0x8001);
        assert_eq!(encode_sign_magnitude(i16::MIN), 0xFFFF);
    }

    #[test]
    fn test_encode_turn_frame() {
        let raw = encode_sign_magnitude(-91).to_le_bytes();
        let frame = encode_frame(BOARD_ID, Instruction::Turn, &raw);
        assert_eq!(frame.len(), 8);
        assert_eq!(&frame[..2], &HEADER);
        assert_eq!(frame[2], BOARD_ID);
        assert_eq!(frame[3], 4); // instruction + 2 params + checksum
        assert_eq!(frame[4], 0x11);
        assert_eq!(&frame[5..7], &[0x5B, 0x80]);
        assert_eq!(frame[7], checksum(&frame[2..7]));
    }

    #[test]
    fn test_decode_reply_returns_params() {
        let frame = reply(BOARD_ID, 0, &[0x2C, 0x01]);
        let params = decode_reply(BOARD_ID, &frame).unwrap();
        assert_eq!(u16::from_le_bytes([params[0], params[1]]), 300);

        let ack = reply(BOARD_ID, 0, &[]);
        assert!(decode_reply(BOARD_ID, &ack).unwrap().is_empty());
    }

    #[test]
    fn test_decode_reply_rejects_bad_checksum() {
        let mut frame = reply(BOARD_ID, 0, &[0x2C, 0x01]);
        *frame.last_mut().unwrap() ^= 0xFF;
        assert!(matches!(
            decode_reply(BOARD_ID, &frame),
            Err(HardwareError::ChecksumMismatch { id: BOARD_ID })
        ));
    }

    #[test]
    fn test_decode_reply_reports_device_status() {
        let frame = reply(BOARD_ID, 0x04, &[]);
        assert!(matches!(
            decode_reply(BOARD_ID, &frame),
            Err(HardwareError::DeviceError { status: 0x04, .. })
        ));
    }

    #[test]
    fn test_decode_reply_rejects_malformed_frames() {
        let good = reply(BOARD_ID, 0, &[7]);

        let mut bad_header = good.clone();
        bad_header[0] = 0x00;
        let wrong_board = reply(BOARD_ID + 1, 0, &[7]);
        let truncated = &good[..good.len() - 1];
        let mut too_short = reply(BOARD_ID, 0, &[]);
        too_short[3] = 1;

        for frame in [&bad_header[..], &wrong_board[..], truncated, &too_short[..], &good[..3]] {
            assert!(
                matches!(
                    decode_reply(BOARD_ID, frame),
                    Err(HardwareError::InvalidResponse { .. })
                ),
                "accepted {:02X?}",
                frame
            );
        }
    }
}
