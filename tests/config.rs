#![cfg(feature = "serde")]

mod common;

use common::*;
use geneactiv_rs::{
    BinReader, BinReaderBuilder, DayWindow, Error, RawSample, ReaderConfig, RecordingSummary,
    Result, SequencePolicy,
};
use std::io::Cursor;

#[test]
fn config_round_trip() -> Result<()> {
    let path = temp_path("geneactiv_config_round_trip.json");
    let config = ReaderConfig {
        sequence_policy: SequencePolicy::Strict,
        day_windows: vec![DayWindow::new(8, 12)?, DayWindow::new(20, 12)?],
        trim_to_written: false,
    };
    config.save_to_file(path.to_str().unwrap())?;

    let loaded = ReaderConfig::load_from_file(path.to_str().unwrap())?;
    assert_eq!(loaded, config);
    assert_eq!(BinReaderBuilder::from_config(loaded).config(), &config);

    std::fs::remove_file(path)?;
    Ok(())
}

#[test]
fn config_missing_keys_take_defaults() -> Result<()> {
    let path = temp_path("geneactiv_config_partial.json");
    std::fs::write(&path, r#"{ "sequence_policy": "Strict" }"#)?;

    let loaded = ReaderConfig::load_from_file(path.to_str().unwrap())?;
    assert_eq!(loaded.sequence_policy, SequencePolicy::Strict);
    assert_eq!(loaded.day_windows, vec![DayWindow::CALENDAR_DAY]);
    assert!(loaded.trim_to_written);

    std::fs::remove_file(path)?;
    Ok(())
}

#[test]
fn config_invalid_window_rejected() -> Result<()> {
    let path = temp_path("geneactiv_config_invalid.json");
    std::fs::write(
        &path,
        r#"{ "day_windows": [ { "base_hour": 8, "period_hours": 25 } ] }"#,
    )?;
    assert!(matches!(
        ReaderConfig::load_from_file(path.to_str().unwrap()),
        Err(Error::InvalidDayWindow {
            base_hour: 8,
            period_hours: 25
        })
    ));

    std::fs::write(&path, "{ not json")?;
    assert!(matches!(
        ReaderConfig::load_from_file(path.to_str().unwrap()),
        Err(Error::Serialization(_))
    ));

    std::fs::remove_file(path)?;
    Ok(())
}

#[test]
fn summary_round_trip() -> Result<()> {
    let path = temp_path("geneactiv_summary.json");
    let mut blocks: Vec<_> = (0..3)
        .map(|s| block_at(START - 2.0, s, RawSample::default()))
        .collect();
    blocks[1].sampling_rate = 50.0;
    blocks[2].sampling_rate = 50.0;
    let lines = render(&unit_info(3), &blocks)?;

    let recording = BinReader::new(Cursor::new(join(&lines))).read_all()?;
    recording.save_summary(path.to_str().unwrap())?;

    let summary = RecordingSummary::load_from_file(path.to_str().unwrap())?;
    assert_eq!(summary, recording.summary());
    assert_eq!(summary.blocks_read, 3);
    assert_eq!(summary.samples_written, 900);
    assert_eq!(summary.warnings.len(), 1);
    assert_eq!(summary.days[0].starts, vec![0, 200]);
    assert_eq!(summary.info.sampling_rate_hz, 50.0);

    std::fs::remove_file(path)?;
    Ok(())
}
