mod common;

use common::*;
use geneactiv_rs::{BinReader, BinWriter, Error, FileInfo, RawSample, Result};
use std::io::Cursor;

#[test]
fn header_round_trip() -> Result<()> {
    let infos = [
        unit_info(0),
        FileInfo {
            sampling_rate_hz: 75.0,
            gain: [25548.0, 25722.0, 25550.0],
            offset: [-3730.0, -1730.0, 4440.0],
            volts: 300.0,
            lux: 800.0,
            declared_block_count: 120_960,
            max_sequence_seen: None,
            fs_mismatch_count: 0,
        },
        FileInfo {
            sampling_rate_hz: 10.0,
            gain: [1.0, -2.0, 3.0],
            offset: [0.0, 0.0, -1.0],
            volts: 1.0,
            lux: 0.0,
            declared_block_count: 1,
            max_sequence_seen: None,
            fs_mismatch_count: 0,
        },
    ];

    for info in infos {
        let lines = info.to_lines();
        assert_eq!(lines.len(), HEADER_LINES);
        assert_eq!(FileInfo::from_lines(&lines)?, info);
    }
    Ok(())
}

#[test]
fn header_round_trip_through_file() -> Result<()> {
    let path = temp_path("geneactiv_header_round_trip.bin");
    let mut info = unit_info(2);
    info.gain = [25548.0, 25722.0, 25550.0];

    let mut writer = BinWriter::create(path.to_str().unwrap())?;
    writer.write_header(&info)?;
    writer.write_block(&block(0, RawSample::default()))?;
    writer.write_block(&block(1, RawSample::default()))?;
    writer.finish()?;

    let mut reader = BinReader::open(path.to_str().unwrap())?;
    assert_eq!(reader.read_header()?, &info);

    std::fs::remove_file(path)?;
    Ok(())
}

#[test]
fn header_written_twice() -> Result<()> {
    let mut writer = BinWriter::new(Vec::new());
    writer.write_header(&unit_info(1))?;
    assert!(matches!(
        writer.write_header(&unit_info(1)),
        Err(Error::MalformedHeader { line: 1, .. })
    ));
    Ok(())
}

#[test]
fn samples_round_trip() -> Result<()> {
    let mut raw = block(0, RawSample::default());
    for (j, sample) in raw.samples.iter_mut().enumerate() {
        let value = (j as i16 * 13) % 2048;
        sample.axes = [value, -value, value - 2048];
        sample.light = (j as u16 * 11) % 4096;
    }
    raw.temperature = 27.25;
    let lines = render(&unit_info(1), std::slice::from_ref(&raw))?;

    let recording = BinReader::new(Cursor::new(join(&lines))).read_all()?;
    for (sample, decoded) in raw.samples.iter().zip(recording.samples().iter()) {
        let expected = sample.axes.map(|axis| axis as f64 * 100.0);
        assert_eq!(decoded.acceleration, expected);
        assert_eq!(decoded.light, (sample.light >> 2) as f64 * (1000.0 / 300.0));
        assert_eq!(decoded.temperature, 27.25);
    }
    Ok(())
}
