//! Filter chains stacked over a source-backed run loaded from a row dump

use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use mzaccess::prelude::*;
use tempfile::tempdir;

const MZ: [f64; 6] = [100.0, 101.0, 102.0, 103.0, 104.0, 105.0];

fn rows() -> Vec<MemoryRow> {
    vec![
        MemoryRow::spectrum(1, 1, 30.0, MZ.to_vec(), vec![9.0; 6]),
        MemoryRow::spectrum(2, 2, 10.0, MZ.to_vec(), vec![0.0, 0.0, 5.0, 0.0, 0.0, 0.0]),
        MemoryRow::spectrum(3, 2, 20.0, MZ.to_vec(), vec![1.0, 0.0, 0.0, 0.0, 0.0, 2.0]),
        MemoryRow::spectrum(4, 2, 5.0, MZ.to_vec(), vec![3.0; 6]),
    ]
}

fn dump(path: &Path) {
    serde_json::to_writer(File::create(path).unwrap(), &rows()).unwrap();
}

fn open(path: &Path, config: ListConfig) -> SpectrumListPtr {
    Arc::new(SourceSpectrumList::<MemorySource>::open(path, config).unwrap())
}

#[test]
fn test_chain_over_row_dump() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("run.json");
    dump(&path);

    let run = open(&path, ListConfig::default());
    assert_eq!(run.size().unwrap(), 4);

    let chain = FilterFactory::wrap_all(
        run,
        ["msLevel 2", "sortByScanTime", "zeroSamples removeExtra 2", "mzWindow [101,104]"],
    )
    .unwrap();
    assert_eq!(chain.size().unwrap(), 3);

    let ids: Vec<String> = (0..3).map(|i| chain.identity(i).unwrap().id).collect();
    assert_eq!(ids, vec!["scan=4", "scan=2", "scan=3"]);
    assert_eq!(chain.find("scan=2").unwrap(), 1);
    assert_eq!(chain.find("scan=1").unwrap(), 3);

    let first = chain.item(0, DetailLevel::FullData).unwrap();
    assert_eq!(first.arrays.unwrap().mz, vec![101.0, 102.0, 103.0, 104.0]);

    let second = chain.item(1, DetailLevel::FullData).unwrap();
    assert_eq!(second.identity.index, 1);
    assert_eq!(second.arrays.unwrap().mz, vec![101.0, 102.0, 103.0]);

    let third = chain.item(2, DetailLevel::FullData).unwrap();
    let arrays = third.arrays.unwrap();
    assert_eq!(arrays.mz, vec![101.0, 104.0]);
    assert_eq!(arrays.intensity, vec![0.0, 0.0]);
}

#[test]
fn test_config_level_filter_applies_before_decorators() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("run.json");
    dump(&path);

    let config = ListConfig {
        accept_only_ms_level: Some(IntegerSet::parse("2").unwrap()),
        ..Default::default()
    };
    let run = open(&path, config);
    assert_eq!(run.size().unwrap(), 3);
    assert_eq!(run.identity(0).unwrap().id, "scan=2");

    let summary = ListSummary::from_list(run.as_ref()).unwrap();
    assert_eq!(summary.spectra, 3);
    assert_eq!(summary.ms_levels.get(&2), Some(&3));
    assert_eq!(summary.scan_time_range, Some((5.0, 20.0)));
}

#[test]
fn test_unknown_commands_are_skipped_and_bad_arguments_rejected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("run.json");
    dump(&path);

    let run = open(&path, ListConfig::default());
    let unchanged = FilterFactory::wrap(Arc::clone(&run), "frobnicate 3").unwrap();
    assert_eq!(unchanged.size().unwrap(), 4);

    let err = FilterFactory::wrap_all(run, ["msLevel 2", "scanTime [5"]).err().unwrap();
    assert!(matches!(err, ListError::ConfigurationRejected { .. }));
}

#[test]
fn test_zero_compaction_on_read() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("run.json");
    dump(&path);

    let config = ListConfig {
        ignore_zero_intensity_points: true,
        ..Default::default()
    };
    let run = open(&path, config);
    let spectrum = run.item(1, DetailLevel::FullData).unwrap();
    assert_eq!(spectrum.default_array_length, 3);
    assert_eq!(spectrum.arrays.unwrap().mz, vec![101.0, 102.0, 103.0]);
}
