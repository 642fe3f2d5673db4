//! End-to-end stream tests against a synthetic two-channel complex format.

mod common;

use std::io::Cursor;

use chrono::TimeDelta;
use num_complex::Complex32;

use baseband_rs::{
    FileReader, SampleArray, SampleShape, StreamOptions, StreamReader, StreamWriter, Whence,
};

use common::{DemoHeader, HEADER_SIZE};

const PAYLOAD_BYTES: u16 = 32;
const BPS: u32 = 2;
const CHANNELS: usize = 2;
// 2 bits x 2 components x 2 channels = 8 bits per full sample.
const SPF: usize = 32;
const RATE: f64 = 128.0; // 4 frames per second
const START_SECONDS: u32 = 3_000;

fn shape() -> SampleShape {
    SampleShape::named(&[("channels", CHANNELS)]).unwrap()
}

/// Complex samples cycling through the 2-bit quantizer levels.
fn test_values(n: usize) -> Vec<Complex32> {
    const LEVELS: [f32; 4] = [-3.0, -1.0, 1.0, 3.0];
    (0..n * CHANNELS)
        .map(|i| Complex32::new(LEVELS[i % 4], LEVELS[(i + 1) % 4]))
        .collect()
}

fn write_recording(n: usize) -> Vec<u8> {
    let mut buf = Vec::new();
    let mut writer = StreamWriter::<DemoHeader, _>::new(
        &mut buf,
        DemoHeader::new(START_SECONDS, 0, PAYLOAD_BYTES),
        BPS,
        shape(),
        true,
        RATE,
        true,
    )
    .unwrap();
    let data = SampleArray::from_complex(test_values(n), &[n, CHANNELS]).unwrap();
    writer.write(&data).unwrap();
    writer.close().unwrap();
    drop(writer);
    buf
}

fn open_reader(bytes: Vec<u8>) -> StreamReader<DemoHeader, Cursor<Vec<u8>>> {
    StreamReader::new(
        Cursor::new(bytes),
        BPS,
        shape(),
        true,
        StreamOptions::default(),
    )
    .unwrap()
}

#[test]
fn complex_multichannel_roundtrip_with_rate_detection() {
    let n = SPF * 8; // two seconds of data
    let bytes = write_recording(n);
    assert_eq!(bytes.len(), 8 * (HEADER_SIZE + PAYLOAD_BYTES as usize));

    let mut reader = open_reader(bytes);
    assert_eq!(reader.sample_rate(), RATE);
    assert_eq!(reader.samples_per_frame(), SPF);
    assert_eq!(reader.size().unwrap(), n as i64);

    let got = reader.read(n).unwrap();
    assert_eq!(
        got,
        SampleArray::from_complex(test_values(n), &[n, CHANNELS]).unwrap()
    );
}

#[test]
fn seek_by_time_matches_slice() {
    let n = SPF * 8;
    let bytes = write_recording(n);
    let mut reader = open_reader(bytes);

    // One and a half seconds in: sample 192.
    let target = reader.start_time() + TimeDelta::milliseconds(1_500);
    let offset = reader.seek(target, Whence::Start).unwrap();
    assert_eq!(offset, 192);

    let count = 6;
    let got = reader.read(count).unwrap();
    let all = test_values(n);
    let expected: Vec<Complex32> = all[192 * CHANNELS..(192 + count) * CHANNELS].to_vec();
    assert_eq!(
        got,
        SampleArray::from_complex(expected, &[count, CHANNELS]).unwrap()
    );
}

#[test]
fn tell_reports_samples_duration_and_time() {
    let bytes = write_recording(SPF * 8);
    let mut reader = open_reader(bytes);

    reader.seek(64i64, Whence::Start).unwrap();
    assert_eq!(reader.tell(), 64);
    assert_eq!(reader.elapsed(), TimeDelta::milliseconds(500));
    assert_eq!(
        reader.time(),
        reader.start_time() + TimeDelta::milliseconds(500)
    );
}

#[test]
fn padded_close_produces_frame_aligned_file() {
    // Five samples into the second frame.
    let n = SPF + 5;
    let bytes = write_recording(n);
    assert_eq!(bytes.len(), 2 * (HEADER_SIZE + PAYLOAD_BYTES as usize));

    let mut fh = FileReader::<DemoHeader, _>::new(Cursor::new(bytes.clone()));
    let first = fh.read_frame(BPS, shape(), true).unwrap();
    let second = fh.read_frame(BPS, shape(), true).unwrap();
    assert!(first.is_valid());
    assert!(!second.is_valid());

    // The written samples survive in front of the padding.
    let decoded = second.decode_all();
    let all = test_values(n);
    let SampleArray::Complex(arr) = decoded else {
        panic!("expected complex data");
    };
    for i in 0..5 {
        for c in 0..CHANNELS {
            assert_eq!(arr[[i, c]], all[(SPF + i) * CHANNELS + c]);
        }
    }

    // The padded frame still bounds the stream.
    let mut reader = StreamReader::<DemoHeader, _>::new(
        Cursor::new(bytes),
        BPS,
        shape(),
        true,
        StreamOptions {
            sample_rate: Some(RATE),
            ..Default::default()
        },
    )
    .unwrap();
    assert_eq!(reader.size().unwrap(), (2 * SPF) as i64);
}

#[test]
fn frame_level_and_stream_level_reads_agree() {
    let n = SPF * 4;
    let bytes = write_recording(n);

    let mut fh = FileReader::<DemoHeader, _>::new(Cursor::new(bytes.clone()));
    let mut from_frames: Vec<Complex32> = Vec::new();
    for _ in 0..4 {
        let frame = fh.read_frame(BPS, shape(), true).unwrap();
        let SampleArray::Complex(arr) = frame.decode_all() else {
            panic!("expected complex data");
        };
        from_frames.extend(arr.iter().copied());
    }

    let mut reader = StreamReader::<DemoHeader, _>::new(
        Cursor::new(bytes),
        BPS,
        shape(),
        true,
        StreamOptions {
            sample_rate: Some(RATE),
            ..Default::default()
        },
    )
    .unwrap();
    let SampleArray::Complex(arr) = reader.read(n).unwrap() else {
        panic!("expected complex data");
    };
    let from_stream: Vec<Complex32> = arr.iter().copied().collect();

    assert_eq!(from_frames, from_stream);
}
