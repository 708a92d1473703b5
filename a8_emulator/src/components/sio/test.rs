use pretty_assertions::assert_eq;

use super::checksum;
use super::DiskImage;
use super::Sio;
use super::ACK;
use super::COMPLETE;
use super::ERROR;
use super::NAK;
use crate::common::scheduler::EventScheduler;
use crate::common::scheduler::TimedEvent;

/// Single density image with 5 sectors. Sector n is filled with the byte n.
fn test_disk() -> DiskImage {
    let mut data = vec![0x96, 0x02, 0x28, 0x00, 0x80, 0x00];
    data.resize(16, 0);
    for sector in 1..=5_u8 {
        data.extend_from_slice(&[sector; 128]);
    }
    DiskImage::with_atr_data(&data).unwrap()
}

fn sio_with_disk() -> (Sio, EventScheduler) {
    let mut sio = Sio::new();
    sio.insert_disk(test_disk());
    (sio, EventScheduler::new())
}

fn command_frame(device: u8, command: u8, sector: u16) -> Vec<u8> {
    let [aux1, aux2] = sector.to_le_bytes();
    let mut frame = vec![device, command, aux1, aux2];
    frame.push(checksum(&frame));
    frame
}

fn send(sio: &mut Sio, scheduler: &mut EventScheduler, bytes: &[u8], now: u64) {
    for &byte in bytes {
        sio.serout_write(byte, now, scheduler);
    }
}

/// Reads SERIN until the queued response is drained.
fn receive(sio: &mut Sio, scheduler: &mut EventScheduler) -> Vec<u8> {
    let mut response = Vec::new();
    while sio.state.response_index < sio.state.response.len() {
        response.push(sio.serin_read(0, scheduler));
    }
    response
}

#[test]
fn test_checksum() {
    assert_eq!(checksum(&[]), 0);
    assert_eq!(checksum(&[0x31, 0x52, 0x01, 0x00]), 0x84);
    // End-around carry
    assert_eq!(checksum(&[0xFF, 0x02]), 0x02);
}

#[test]
fn test_read_sector() {
    let (mut sio, mut scheduler) = sio_with_disk();
    send(&mut sio, &mut scheduler, &command_frame(0x31, 0x52, 2), 1000);
    assert_eq!(scheduler.get(TimedEvent::SerialOutputDataNeeded), Some(1900));
    assert_eq!(
        scheduler.get(TimedEvent::SerialOutputTransmissionDone),
        Some(2500)
    );
    assert_eq!(scheduler.get(TimedEvent::SerialInputDataReady), Some(4000));
    assert!(sio.is_active(&scheduler));

    let response = receive(&mut sio, &mut scheduler);
    assert_eq!(response.len(), 131);
    assert_eq!(response[0..2].to_vec(), vec![ACK, COMPLETE]);
    assert_eq!(response[2..130].to_vec(), vec![2; 128]);
    assert_eq!(response[130], checksum(&[2; 128]));

    // Reads past the end repeat the last byte.
    assert_eq!(sio.serin_read(0, &mut scheduler), response[130]);
}

#[test]
fn test_serin_read_paces_bytes() {
    let (mut sio, mut scheduler) = sio_with_disk();
    send(&mut sio, &mut scheduler, &command_frame(0x31, 0x55, 0), 0);
    scheduler.disarm(TimedEvent::SerialInputDataReady);

    assert_eq!(sio.serin_read(5000, &mut scheduler), ACK);
    assert_eq!(scheduler.get(TimedEvent::SerialInputDataReady), Some(5900));
    scheduler.disarm(TimedEvent::SerialInputDataReady);

    assert_eq!(sio.serin_read(6000, &mut scheduler), COMPLETE);
    assert!(!scheduler.is_armed(TimedEvent::SerialInputDataReady));
    assert_eq!(sio.serin_peek(), COMPLETE);
}

#[test]
fn test_nak_responses() {
    let (mut sio, mut scheduler) = sio_with_disk();

    // Bad checksum
    let mut frame = command_frame(0x31, 0x52, 1);
    frame[4] ^= 0xFF;
    send(&mut sio, &mut scheduler, &frame, 0);
    assert_eq!(receive(&mut sio, &mut scheduler), vec![NAK]);
    assert!(scheduler.is_armed(TimedEvent::SerialOutputTransmissionDone));

    // Other device
    send(&mut sio, &mut scheduler, &command_frame(0x32, 0x52, 1), 0);
    assert_eq!(receive(&mut sio, &mut scheduler), vec![NAK]);

    // Sector out of range
    send(&mut sio, &mut scheduler, &command_frame(0x31, 0x52, 6), 0);
    assert_eq!(receive(&mut sio, &mut scheduler), vec![NAK]);
    send(&mut sio, &mut scheduler, &command_frame(0x31, 0x52, 0), 0);
    assert_eq!(receive(&mut sio, &mut scheduler), vec![NAK]);

    // Unknown command
    send(&mut sio, &mut scheduler, &command_frame(0x31, 0x99, 1), 0);
    assert_eq!(receive(&mut sio, &mut scheduler), vec![NAK]);

    // No disk
    let mut sio = Sio::new();
    send(&mut sio, &mut scheduler, &command_frame(0x31, 0x52, 1), 0);
    assert_eq!(receive(&mut sio, &mut scheduler), vec![NAK]);
}

#[test]
fn test_motor_on_without_disk() {
    let mut sio = Sio::new();
    let mut scheduler = EventScheduler::new();
    send(&mut sio, &mut scheduler, &command_frame(0x31, 0x55, 0), 0);
    assert_eq!(receive(&mut sio, &mut scheduler), vec![ACK, COMPLETE]);

    // Commands that need the disk still fail.
    send(&mut sio, &mut scheduler, &command_frame(0x31, 0x53, 0), 0);
    assert_eq!(receive(&mut sio, &mut scheduler), vec![NAK]);
}

#[test]
fn test_frame_must_start_with_device_id() {
    let (mut sio, mut scheduler) = sio_with_disk();
    send(&mut sio, &mut scheduler, &[0x00, 0xFF], 0);
    assert!(sio.state.command_frame.is_empty());
    send(&mut sio, &mut scheduler, &command_frame(0x31, 0x55, 0), 0);
    assert_eq!(receive(&mut sio, &mut scheduler), vec![ACK, COMPLETE]);
}

#[test]
fn test_write_then_read() {
    let (mut sio, mut scheduler) = sio_with_disk();
    send(&mut sio, &mut scheduler, &command_frame(0x31, 0x57, 4), 0);
    assert_eq!(receive(&mut sio, &mut scheduler), vec![ACK]);
    assert!(sio.is_active(&scheduler));

    let data = [0xAB; 128];
    send(&mut sio, &mut scheduler, &data, 0);
    assert!(sio.state.data_frame.is_some());
    send(&mut sio, &mut scheduler, &[checksum(&data)], 0);
    assert!(sio.state.data_frame.is_none());
    assert_eq!(receive(&mut sio, &mut scheduler), vec![ACK, COMPLETE]);

    assert_eq!(sio.disk().unwrap().read_sector(4), Some(&data[..]));
    assert_eq!(sio.disk().unwrap().read_sector(5), Some(&[5; 128][..]));

    send(&mut sio, &mut scheduler, &command_frame(0x31, 0x52, 4), 0);
    let response = receive(&mut sio, &mut scheduler);
    assert_eq!(response[2..130].to_vec(), data.to_vec());
}

#[test]
fn test_bad_data_checksum_leaves_disk_unchanged() {
    let (mut sio, mut scheduler) = sio_with_disk();
    send(&mut sio, &mut scheduler, &command_frame(0x31, 0x50, 1), 0);
    assert_eq!(receive(&mut sio, &mut scheduler), vec![ACK]);
    let data = [0x55; 128];
    send(&mut sio, &mut scheduler, &data, 0);
    send(&mut sio, &mut scheduler, &[checksum(&data).wrapping_add(1)], 0);
    assert_eq!(receive(&mut sio, &mut scheduler), vec![NAK]);
    assert_eq!(sio.disk().unwrap().read_sector(1), Some(&[1; 128][..]));
}

#[test]
fn test_verify() {
    let (mut sio, mut scheduler) = sio_with_disk();
    for (data, expected) in [([3_u8; 128], vec![ACK, COMPLETE]), ([7; 128], vec![ACK, ERROR])] {
        send(&mut sio, &mut scheduler, &command_frame(0x31, 0x56, 3), 0);
        assert_eq!(receive(&mut sio, &mut scheduler), vec![ACK]);
        send(&mut sio, &mut scheduler, &data, 0);
        send(&mut sio, &mut scheduler, &[checksum(&data)], 0);
        assert_eq!(receive(&mut sio, &mut scheduler), expected);
    }
    assert_eq!(sio.disk().unwrap().read_sector(3), Some(&[3; 128][..]));
}

#[test]
fn test_status() {
    let (mut sio, mut scheduler) = sio_with_disk();
    send(&mut sio, &mut scheduler, &command_frame(0x31, 0x53, 0), 0);
    assert_eq!(
        receive(&mut sio, &mut scheduler),
        vec![ACK, COMPLETE, 0x10, 0x00, 0x01, 0x00, 0x11]
    );
}

#[test]
fn test_format() {
    let (mut sio, mut scheduler) = sio_with_disk();
    send(&mut sio, &mut scheduler, &command_frame(0x31, 0x21, 0), 0);
    assert_eq!(receive(&mut sio, &mut scheduler), vec![ACK, COMPLETE]);
    let disk = sio.disk().unwrap();
    assert_eq!(disk.data()[0..2].to_vec(), vec![0x96, 0x02]);
    assert_eq!(disk.read_sector(2), Some(&[0; 128][..]));
}

#[test]
fn test_idle_after_response() {
    let (mut sio, mut scheduler) = sio_with_disk();
    assert!(!sio.is_active(&scheduler));
    send(&mut sio, &mut scheduler, &command_frame(0x31, 0x55, 0), 0);
    receive(&mut sio, &mut scheduler);
    for event in [
        TimedEvent::SerialOutputDataNeeded,
        TimedEvent::SerialOutputTransmissionDone,
        TimedEvent::SerialInputDataReady,
    ] {
        scheduler.disarm(event);
    }
    assert!(!sio.is_active(&scheduler));
}
