//! Contract tests shared by every record list
//!
//! Each list, whatever backs it, must number its items from zero, round-trip
//! ids through `find`, and only touch its source as far as a request needs.

use std::sync::Arc;
use std::thread;

use mzaccess::filter::IndexSet;
use mzaccess::prelude::*;
use mzaccess::record::Record;
use mzaccess::source::RowKind;
use proptest::prelude::*;

fn run_rows(count: i64) -> Vec<MemoryRow> {
    (1..=count)
        .map(|scan| {
            let level = if scan % 3 == 1 { 1 } else { 2 };
            MemoryRow::spectrum(scan, level, scan as f64, vec![100.0, 200.0, 300.0], vec![0.0, 5.0, 1.0])
        })
        .collect()
}

fn spectra(count: usize) -> Vec<Spectrum> {
    (0..count)
        .map(|i| SpectrumBuilder::new(i, format!("scan={}", i + 1)).scan_time(i as f64).build())
        .collect()
}

fn assert_contract<R: Record + std::fmt::Debug>(list: &dyn RecordList<Record = R>) {
    let size = list.size().unwrap();
    for i in 0..size {
        let identity = list.identity(i).unwrap();
        assert_eq!(identity.index, i);
        assert_eq!(list.find(&identity.id).unwrap(), i);
        assert_eq!(list.item(i, DetailLevel::InstantMetadata).unwrap().identity().index, i);
    }
    assert_eq!(list.find("no such id").unwrap(), size);
    assert!(list.identity(size).unwrap_err().is_out_of_range());
    assert!(list.item(size, DetailLevel::InstantMetadata).unwrap_err().is_out_of_range());
}

#[test]
fn test_source_spectrum_list_contract() {
    let list = SourceSpectrumList::new(share(MemorySource::new(run_rows(12))), ListConfig::default());
    assert_eq!(list.size().unwrap(), 12);
    assert_contract(&list);
}

#[test]
fn test_source_chromatogram_list_contract() {
    let mut rows = run_rows(4);
    rows.push(MemoryRow::transition(RowKind::Sim { q1: 445.12 }, 2.5, 40.0));
    let list = SourceChromatogramList::new(share(MemorySource::new(rows)), ListConfig::default());
    assert_eq!(list.size().unwrap(), 3);
    assert_contract(&list);
}

#[test]
fn test_filtered_list_contract() {
    let inner: SpectrumListPtr = Arc::new(SimpleList::new(spectra(10)).unwrap());
    let filtered = FilterFactory::wrap(inner, "scanTime [2,6]").unwrap();
    assert_eq!(filtered.size().unwrap(), 5);
    assert_contract(filtered.as_ref());
}

#[test]
fn test_index_is_built_once_under_contention() {
    let source = MemorySource::new(run_rows(50));
    let calls = source.calls();
    let list = Arc::new(SourceSpectrumList::new(share(source), ListConfig::default()));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let list = Arc::clone(&list);
            thread::spawn(move || {
                let size = list.size().unwrap();
                list.item(size - 1, DetailLevel::FastMetadata).unwrap().identity.id
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), "scan=50");
    }
    assert_eq!(calls.row_count(), 1);
}

#[test]
fn test_detail_levels_bound_source_work() {
    let source = MemorySource::new(run_rows(6));
    let calls = source.calls();
    let list = SourceSpectrumList::new(share(source), ListConfig::default());
    list.size().unwrap();
    let metadata_after_build = calls.metadata();

    for i in 0..6 {
        let spectrum = list.item(i, DetailLevel::InstantMetadata).unwrap();
        assert!(spectrum.arrays.is_none());
    }
    assert_eq!(calls.metadata(), metadata_after_build);
    assert_eq!(calls.payload(), 0);

    let spectrum = list.item(0, DetailLevel::FastMetadata).unwrap();
    assert_eq!(spectrum.ms_level, Some(1));
    assert!(spectrum.arrays.is_none());
    assert_eq!(calls.payload(), 0);

    let spectrum = list.item(0, DetailLevel::FullData).unwrap();
    assert_eq!(spectrum.arrays.unwrap().len(), 3);
    assert_eq!(calls.payload(), 1);
}

#[test]
fn test_index_set_decorator_renumbers() {
    let inner: ListPtr<Spectrum> = Arc::new(SimpleList::new(spectra(10)).unwrap());
    let list = FilterList::new(inner, IndexSet::new(IntegerSet::parse("[1,2]").unwrap()));

    assert_eq!(list.size().unwrap(), 2);
    let first = list.identity(0).unwrap();
    assert_eq!(first.index, 0);
    assert_eq!(first.id, "scan=2");
    assert_eq!(list.identity(1).unwrap().id, "scan=3");
    assert_eq!(list.inner_index(1).unwrap(), 2);
    assert_eq!(list.find("scan=2").unwrap(), 0);
    assert_eq!(list.find("scan=3").unwrap(), 1);
    assert_eq!(list.find("scan=4").unwrap(), 2);
    assert_eq!(list.item(1, DetailLevel::FullData).unwrap().identity.index, 1);
}

#[test]
fn test_even_chromatograms() {
    let mut rows = run_rows(3);
    rows.push(MemoryRow::transition(RowKind::Sim { q1: 123.45 }, 1.5, 10.0));
    let chromatograms: ChromatogramListPtr = Arc::new(SourceChromatogramList::new(
        share(MemorySource::new(rows)),
        ListConfig::default(),
    ));
    let even = FilterList::new(chromatograms, IndexSet::new(IntegerSet::parse("0 2").unwrap()));

    let ids: Vec<String> = (0..even.size().unwrap()).map(|i| even.identity(i).unwrap().id).collect();
    assert_eq!(ids, vec!["TIC", "SIM Q1=123.45"]);
    assert_eq!(even.find("BPC").unwrap(), 2);
}

proptest! {
    #[test]
    fn prop_simple_list_identities_are_dense(count in 0usize..40) {
        let list = SimpleList::new(spectra(count)).unwrap();
        prop_assert_eq!(list.size().unwrap(), count);
        for i in 0..count {
            prop_assert_eq!(list.identity(i).unwrap().index, i);
            prop_assert_eq!(list.find(&format!("scan={}", i + 1)).unwrap(), i);
        }
        prop_assert_eq!(list.find("scan=0").unwrap(), count);
    }

    #[test]
    fn prop_index_filter_keeps_members(count in 1usize..30, low in 0usize..30, span in 0usize..10) {
        let inner: ListPtr<Spectrum> = Arc::new(SimpleList::new(spectra(count)).unwrap());
        let high = low + span;
        let set = IntegerSet::from_range(low as i32, high as i32).unwrap();
        let list = FilterList::new(inner, IndexSet::new(set));

        let expected: Vec<usize> = (0..count).filter(|i| (low..=high).contains(i)).collect();
        prop_assert_eq!(list.size().unwrap(), expected.len());
        for (i, inner_index) in expected.into_iter().enumerate() {
            prop_assert_eq!(list.inner_index(i).unwrap(), inner_index);
        }
    }
}
