//! Disk drive D1: on the serial bus, reached through POKEY's SEROUT/SERIN registers.
//!
//! The computer sends a 5 byte command frame (device, command, aux1, aux2, checksum). Commands
//! that transfer a sector to the drive are followed by a data frame of the sector size plus a
//! checksum byte. Every answer is queued as a response and handed out one byte per SERIN read,
//! paced by the serial input events.
mod atr;
#[cfg(test)]
mod test;

use bitcode::Decode;
use bitcode::Encode;
use log::debug;
use log::warn;

pub use self::atr::AtrHeader;
pub use self::atr::DiskImage;
use crate::common::constants::SERIAL_INPUT_DATA_READY_CYCLES;
use crate::common::constants::SERIAL_INPUT_FIRST_DATA_READY_CYCLES;
use crate::common::constants::SERIAL_OUTPUT_DATA_NEEDED_CYCLES;
use crate::common::constants::SERIAL_OUTPUT_TRANSMISSION_DONE_CYCLES;
use crate::common::scheduler::Cycle;
use crate::common::scheduler::EventScheduler;
use crate::common::scheduler::TimedEvent;

pub const DEVICE_D1: u8 = 0x31;
pub const ACK: u8 = b'A';
pub const NAK: u8 = b'N';
pub const COMPLETE: u8 = b'C';
pub const ERROR: u8 = b'E';

const COMMAND_FRAME_SIZE: usize = 5;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Encode, Decode, strum::FromRepr, strum::Display)]
#[repr(u8)]
pub enum SioCommand {
    Format = 0x21,
    Put = 0x50,
    Read = 0x52,
    Status = 0x53,
    Motor = 0x55,
    Verify = 0x56,
    Write = 0x57,
}

/// The SIO checksum: an 8-bit sum with end-around carry.
pub fn checksum(data: &[u8]) -> u8 {
    data.iter().fold(0_u8, |sum, &byte| {
        let (result, carry) = sum.overflowing_add(byte);
        result.wrapping_add(carry as u8)
    })
}

/// Sector transfer in progress after an acknowledged WRITE/PUT/VERIFY command.
#[derive(Clone, Debug, PartialEq, Eq, Encode, Decode)]
struct DataFrame {
    command: SioCommand,
    sector: u16,
    size: usize,
    received: Vec<u8>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Encode, Decode)]
pub struct SioState {
    command_frame: Vec<u8>,
    data_frame: Option<DataFrame>,
    response: Vec<u8>,
    response_index: usize,
    /// Last byte handed out through SERIN.
    serin: u8,
}

#[derive(Default)]
pub struct Sio {
    state: SioState,
    disk: Option<DiskImage>,
}

impl Sio {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_disk(&mut self, disk: DiskImage) {
        debug!(
            "Inserted disk: {} bytes, {} byte sectors",
            disk.len(),
            disk.header.sector_size
        );
        self.disk = Some(disk);
    }

    pub fn disk(&self) -> Option<&DiskImage> {
        self.disk.as_ref()
    }

    /// Clears the protocol state. The disk stays inserted.
    pub fn reset(&mut self) {
        self.state = SioState::default();
    }

    pub fn save_state(&self) -> SioState {
        self.state.clone()
    }

    pub fn load_state(&mut self, state: SioState) {
        self.state = state;
    }

    /// True while a frame is partially received, a data frame is expected, response bytes are
    /// queued or a serial event is pending.
    pub fn is_active(&self, scheduler: &EventScheduler) -> bool {
        !self.state.command_frame.is_empty()
            || self.state.data_frame.is_some()
            || self.state.response_index < self.state.response.len()
            || scheduler.is_armed(TimedEvent::SerialOutputDataNeeded)
            || scheduler.is_armed(TimedEvent::SerialOutputTransmissionDone)
            || scheduler.is_armed(TimedEvent::SerialInputDataReady)
    }

    /// Handles a byte written to SEROUT.
    pub fn serout_write(&mut self, value: u8, now: Cycle, scheduler: &mut EventScheduler) {
        scheduler.arm(
            TimedEvent::SerialOutputDataNeeded,
            now + SERIAL_OUTPUT_DATA_NEEDED_CYCLES,
        );

        if let Some(mut frame) = self.state.data_frame.take() {
            frame.received.push(value);
            if frame.received.len() < frame.size + 1 {
                self.state.data_frame = Some(frame);
            } else {
                scheduler.arm(
                    TimedEvent::SerialOutputTransmissionDone,
                    now + SERIAL_OUTPUT_TRANSMISSION_DONE_CYCLES,
                );
                let response = self.complete_data_frame(frame);
                self.queue_response(response, now, scheduler);
            }
            return;
        }

        // Frames start with a device id.
        if self.state.command_frame.is_empty() && (value == 0 || value == 0xFF) {
            return;
        }
        self.state.command_frame.push(value);
        if self.state.command_frame.len() < COMMAND_FRAME_SIZE {
            return;
        }

        let frame = std::mem::take(&mut self.state.command_frame);
        scheduler.arm(
            TimedEvent::SerialOutputTransmissionDone,
            now + SERIAL_OUTPUT_TRANSMISSION_DONE_CYCLES,
        );
        let response = self.execute_command(&frame);
        self.queue_response(response, now, scheduler);
    }

    /// Handles a SERIN read: hands out the next queued response byte and schedules the one
    /// after it. Reads with nothing queued return the last byte again.
    pub fn serin_read(&mut self, now: Cycle, scheduler: &mut EventScheduler) -> u8 {
        if let Some(&byte) = self.state.response.get(self.state.response_index) {
            self.state.serin = byte;
            self.state.response_index += 1;
            if self.state.response_index < self.state.response.len() {
                scheduler.arm(
                    TimedEvent::SerialInputDataReady,
                    now + SERIAL_INPUT_DATA_READY_CYCLES,
                );
            } else {
                self.state.response.clear();
                self.state.response_index = 0;
            }
        }
        self.state.serin
    }

    pub fn serin_peek(&self) -> u8 {
        self.state.serin
    }

    fn queue_response(&mut self, response: Vec<u8>, now: Cycle, scheduler: &mut EventScheduler) {
        debug!("SIO response: {} bytes, starting {:02X?}", response.len(), response.first());
        self.state.response = response;
        self.state.response_index = 0;
        scheduler.arm(
            TimedEvent::SerialInputDataReady,
            now + SERIAL_INPUT_FIRST_DATA_READY_CYCLES,
        );
    }

    fn execute_command(&mut self, frame: &[u8]) -> Vec<u8> {
        let [device, command, aux1, aux2, frame_checksum] = frame[..] else {
            return vec![NAK];
        };
        debug!("SIO command frame {:02X?}", frame);
        if checksum(&frame[0..4]) != frame_checksum {
            warn!("SIO command frame checksum mismatch: {:02X?}", frame);
            return vec![NAK];
        }
        if device != DEVICE_D1 {
            return vec![NAK];
        }
        let sector = u16::from_le_bytes([aux1, aux2]);
        let Some(command) = SioCommand::from_repr(command) else {
            warn!("Unsupported SIO command {:02X}", command);
            return vec![NAK];
        };
        let disk = match (command, self.disk.as_mut()) {
            // The drive motor answers with or without a disk.
            (SioCommand::Motor, _) => return vec![ACK, COMPLETE],
            (_, None) => return vec![NAK],
            (_, Some(disk)) => disk,
        };

        match command {
            SioCommand::Read => match disk.read_sector(sector) {
                Some(data) => {
                    let mut response = Vec::with_capacity(data.len() + 3);
                    response.extend_from_slice(&[ACK, COMPLETE]);
                    response.extend_from_slice(data);
                    response.push(checksum(data));
                    response
                }
                None => vec![NAK],
            },
            SioCommand::Status => {
                if disk.data().first().copied().unwrap_or(0) == 0 {
                    return vec![NAK];
                }
                if disk.header.sector_size == 128 {
                    vec![ACK, COMPLETE, 0x10, 0x00, 0x01, 0x00, 0x11]
                } else {
                    vec![ACK, COMPLETE, 0x30, 0x00, 0x01, 0x00, 0x31]
                }
            }
            SioCommand::Write | SioCommand::Put | SioCommand::Verify => {
                match disk.sector_range(sector) {
                    Some(range) => {
                        self.state.data_frame = Some(DataFrame {
                            command,
                            sector,
                            size: range.len(),
                            received: Vec::with_capacity(range.len() + 1),
                        });
                        vec![ACK]
                    }
                    None => vec![NAK],
                }
            }
            SioCommand::Format => {
                if disk.len() <= atr::ATR_HEADER_SIZE {
                    return vec![NAK];
                }
                disk.format();
                vec![ACK, COMPLETE]
            }
            SioCommand::Motor => vec![ACK, COMPLETE],
        }
    }

    fn complete_data_frame(&mut self, frame: DataFrame) -> Vec<u8> {
        let (data, frame_checksum) = frame.received.split_at(frame.size);
        if checksum(data) != frame_checksum[0] {
            warn!("SIO data frame checksum mismatch for sector {}", frame.sector);
            return vec![NAK];
        }
        let Some(disk) = self.disk.as_mut() else {
            return vec![NAK];
        };
        match frame.command {
            SioCommand::Verify => match disk.read_sector(frame.sector) {
                Some(current) if current == data => vec![ACK, COMPLETE],
                Some(_) => vec![ACK, ERROR],
                None => vec![NAK],
            },
            _ => {
                if disk.write_sector(frame.sector, data) {
                    vec![ACK, COMPLETE]
                } else {
                    vec![NAK]
                }
            }
        }
    }
}
