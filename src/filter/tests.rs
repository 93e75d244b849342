use std::sync::Arc;

use super::*;
use crate::integer_set::IntegerSet;
use crate::list::{SimpleList, SpectrumListPtr};
use crate::record::{Activation, Polarity, Spectrum, SpectrumBuilder};

/// Eleven spectra `scan=100`..`scan=110`. Every third one is MS1, the others
/// MS2 with a charge 3 precursor at `(i+4)*100`; scan event `i%4`, scan time
/// `420+i` s. The last spectrum carries no MS level, scan event, or time.
fn run() -> SpectrumListPtr {
    let spectra = (0..11)
        .map(|i| {
            let id = format!("scan={}", 100 + i);
            let mz: Vec<f64> = (1..(2 * i).max(1)).map(|j| (j * 100) as f64).collect();
            let intensity: Vec<f64> = (1..(2 * i).max(1)).map(|j| (j * j) as f64).collect();
            if i == 10 {
                let mut spectrum = SpectrumBuilder::new(i, id).arrays(mz, intensity).build();
                spectrum.ms_level = None;
                return spectrum;
            }
            let ms1 = i % 3 == 0;
            let mut builder = SpectrumBuilder::new(i, id)
                .ms_level(if ms1 { 1 } else { 2 })
                .scan_event((i % 4) as i64)
                .scan_time(420.0 + i as f64)
                .polarity(if i % 2 == 0 { Polarity::Positive } else { Polarity::Negative })
                .arrays(mz, intensity);
            if !ms1 {
                builder = builder.precursor(((i + 4) * 100) as f64, Some(3));
            }
            builder.build()
        })
        .collect();
    Arc::new(SimpleList::new(spectra).unwrap())
}

fn ids(list: &dyn RecordList<Record = Spectrum>) -> Vec<String> {
    (0..list.size().unwrap())
        .map(|i| list.identity(i).unwrap().id)
        .collect()
}

fn scans(numbers: &[i32]) -> Vec<String> {
    numbers.iter().map(|n| format!("scan={}", n)).collect()
}

struct Even;

impl Predicate<Spectrum> for Even {
    fn accept_identity(&mut self, identity: &crate::identity::Identity) -> Tribool {
        (identity.index % 2 == 0).into()
    }

    fn describe(&self) -> String {
        "even".to_string()
    }
}

#[test]
fn test_even_predicate_renumbers() {
    let filter = FilterList::new(run(), Even);
    assert_eq!(filter.size().unwrap(), 6);
    for i in 0..6 {
        let identity = filter.identity(i).unwrap();
        assert_eq!(identity.index, i);
        assert_eq!(identity.id, format!("scan={}", 100 + 2 * i));
        let spectrum = filter.item(i, DetailLevel::FullData).unwrap();
        assert_eq!(spectrum.identity.index, i);
        assert_eq!(spectrum.identity.id, identity.id);
    }
    assert_eq!(filter.find("scan=104").unwrap(), 2);
    assert_eq!(filter.find("scan=103").unwrap(), 6);
}

#[test]
fn test_index_set() {
    let set = IntegerSet::parse("[3,5] 7 9").unwrap();
    let filter = FilterList::new(run(), IndexSet::new(set));
    assert_eq!(ids(&filter), scans(&[103, 104, 105, 107, 109]));
}

#[test]
fn test_scan_number_set() {
    let set = IntegerSet::parse("102-104 107").unwrap();
    let filter = FilterList::new(run(), ScanNumberSet::new(set));
    assert_eq!(ids(&filter), scans(&[102, 103, 104, 107]));
}

#[test]
fn test_id_set() {
    let filter = FilterList::new(run(), IdSet::new(["scan=105", "scan=101", "scan=999"]));
    assert_eq!(ids(&filter), scans(&[101, 105]));
}

#[test]
fn test_scan_event_set() {
    let set = IntegerSet::parse("0 2-3").unwrap();
    let filter = FilterList::new(run(), ScanEventSet::new(set));
    assert_eq!(ids(&filter), scans(&[100, 102, 103, 104, 106, 107, 108]));
}

#[test]
fn test_scan_time_range() {
    let filter = FilterList::new(run(), ScanTimeRange::new(422.5, 427.5));
    assert_eq!(ids(&filter), scans(&[103, 104, 105, 106, 107]));
}

#[test]
fn test_ms_level_set() {
    let ms1 = FilterList::new(run(), MsLevelSet::new(IntegerSet::parse("1").unwrap()));
    assert_eq!(ids(&ms1), scans(&[100, 103, 106, 109]));

    let ms2 = FilterList::new(run(), MsLevelSet::new(IntegerSet::parse("2").unwrap()));
    assert_eq!(ids(&ms2), scans(&[101, 102, 104, 105, 107, 108]));
}

#[test]
fn test_charge_state_set() {
    let triple = FilterList::new(run(), ChargeStateSet::new(IntegerSet::parse("3").unwrap()));
    assert_eq!(triple.size().unwrap(), 6);

    let double = FilterList::new(run(), ChargeStateSet::new(IntegerSet::parse("0-2").unwrap()));
    assert_eq!(double.size().unwrap(), 0);
}

#[test]
fn test_precursor_mz_set() {
    let include = FilterList::new(
        run(),
        PrecursorMzSet::new(vec![500.0, 800.0], Tolerance::Mz(0.1), FilterMode::Include),
    );
    assert_eq!(ids(&include), scans(&[101, 104]));

    let exclude = FilterList::new(
        run(),
        PrecursorMzSet::new(vec![500.0, 0.0], Tolerance::Mz(0.1), FilterMode::Exclude),
    );
    assert_eq!(ids(&exclude), scans(&[102, 104, 105, 107, 108]));
}

#[test]
fn test_default_array_length_set() {
    let filter = FilterList::new(run(), DefaultArrayLengthSet::new(IntegerSet::parse("15-").unwrap()));
    assert_eq!(ids(&filter), scans(&[108, 109, 110]));
}

#[test]
fn test_polarity() {
    let filter = FilterList::new(run(), PolarityFilter::new(Polarity::Negative));
    assert_eq!(ids(&filter), scans(&[101, 103, 105, 107, 109]));
}

#[test]
fn test_mz_present() {
    // peak j*100 has intensity j*j, so the five most intense peaks are the top five m/z values
    let present = FilterList::new(
        run(),
        MzPresent::new(vec![300.0], Tolerance::Mz(1.0), Some(5), FilterMode::Include),
    );
    // 300 is among the top five while the spectrum has at most 7 peaks (i <= 4)
    assert_eq!(ids(&present), scans(&[102, 103, 104]));

    let absent = FilterList::new(
        run(),
        MzPresent::new(vec![300.0], Tolerance::Mz(1.0), None, FilterMode::Exclude),
    );
    assert_eq!(ids(&absent), scans(&[100, 101]));
}

#[test]
fn test_chained_filters_compose() {
    let ms2: SpectrumListPtr = Arc::new(FilterList::new(run(), MsLevelSet::new(IntegerSet::parse("2").unwrap())));
    let late = FilterList::new(ms2, ScanTimeRange::new(425.0, 500.0));
    assert_eq!(ids(&late), scans(&[105, 107, 108]));
    assert_eq!(late.find("scan=107").unwrap(), 1);
    assert_eq!(late.find("scan=106").unwrap(), 3);
}

#[test]
fn test_sorter_orders_by_scan_time() {
    let spectra = vec![
        SpectrumBuilder::new(0, "scan=19").scan_time(30.0).build(),
        SpectrumBuilder::new(1, "scan=20").build(),
        SpectrumBuilder::new(2, "scan=21").scan_time(10.0).build(),
        SpectrumBuilder::new(3, "scan=22").scan_time(30.0).build(),
    ];
    let list: SpectrumListPtr = Arc::new(SimpleList::new(spectra).unwrap());
    let sorted = ScanTimeSorter::new(list);
    assert_eq!(ids(&sorted), scans(&[21, 19, 22, 20]));
    assert_eq!(sorted.find("scan=22").unwrap(), 2);
    assert_eq!(sorted.item(0, DetailLevel::FastMetadata).unwrap().identity.index, 0);
}

#[test]
fn test_factory_wraps_commands() {
    let list = FilterFactory::wrap_all(run(), ["msLevel 2", "'index [1,1]'"]).unwrap();
    assert_eq!(ids(list.as_ref()), scans(&[102]));

    let list = FilterFactory::wrap_all(run(), ["scanTime [422.5,427.5]", "scanNumber 104-"]).unwrap();
    assert_eq!(ids(list.as_ref()), scans(&[104, 105, 106, 107]));

    let list = FilterFactory::wrap(run(), "mzPrecursors [500,800] mzTol=0.1mz").unwrap();
    assert_eq!(ids(list.as_ref()), scans(&[101, 104]));

    let list = FilterFactory::wrap(run(), "id scan=101; scan=103").unwrap();
    assert_eq!(ids(list.as_ref()), scans(&[101, 103]));

    let list = FilterFactory::wrap(run(), "polarity +").unwrap();
    assert_eq!(ids(list.as_ref()), scans(&[100, 102, 104, 106, 108]));
}

#[test]
fn test_factory_skips_unknown_and_rejects_malformed() {
    let list = FilterFactory::wrap(run(), "stripIT").unwrap();
    assert_eq!(list.size().unwrap(), 11);

    for command in [
        "msLevel",
        "msLevel two",
        "scanTime 420,430",
        "mzWindow [20,10]",
        "lockmassRefiner mz=-5",
        "lockmassRefiner tol=0.1",
        "polarity sideways",
        "mzPrecursors [500] frobnicate=1",
        "sortByScanTime now",
        "activation XYZ",
        "threshold count 5",
        "threshold median 5 most-intense",
        "threshold count 5 loudest",
        "threshold tic-cutoff 2 most-intense",
        "threshold absolute 10 most-intense [a,b]",
    ] {
        let err = FilterFactory::wrap(run(), command).err();
        assert!(
            matches!(err, Some(ListError::ConfigurationRejected { .. })),
            "expected rejection for '{}'",
            command
        );
    }
}

#[test]
fn test_factory_transforms() {
    let list = FilterFactory::wrap(run(), "mzWindow [150,450]").unwrap();
    let spectrum = list.item(5, DetailLevel::FullData).unwrap();
    assert_eq!(spectrum.arrays.unwrap().mz, vec![200.0, 300.0, 400.0]);
    // below FullData the transform never runs and the index is untouched
    assert_eq!(list.size().unwrap(), 11);
    assert!(list.item(5, DetailLevel::FullMetadata).unwrap().arrays.is_none());

    let list = FilterFactory::wrap(run(), "lockmassRefiner mz=300.5 tol=1").unwrap();
    let mz = list.item(4, DetailLevel::FullData).unwrap().arrays.unwrap().mz;
    assert!((mz[2] - 300.5).abs() < 1e-9);
}

#[test]
fn test_factory_threshold() {
    let list = FilterFactory::wrap(run(), "threshold count 2 most-intense 2-").unwrap();
    let ms2 = list.item(5, DetailLevel::FullData).unwrap();
    assert_eq!(ms2.arrays.unwrap().mz, vec![800.0, 900.0]);
    assert_eq!(ms2.default_array_length, 2);
    assert_eq!(ms2.base_peak_intensity, Some(81.0));
    let ms1 = list.item(3, DetailLevel::FullData).unwrap();
    assert_eq!(ms1.default_array_length, 5);

    let list = FilterFactory::wrap(run(), "threshold bpi-relative 0.5 most-intense").unwrap();
    let intensity = list.item(3, DetailLevel::FullData).unwrap().arrays.unwrap().intensity;
    assert_eq!(intensity, vec![16.0, 25.0]);
}

#[test]
fn test_factory_activation() {
    let spectra = vec![
        SpectrumBuilder::new(0, "scan=1").build(),
        SpectrumBuilder::new(1, "scan=2").ms_level(2).precursor(400.0, Some(2)).build(),
        SpectrumBuilder::new(2, "scan=3")
            .ms_level(2)
            .precursor(400.0, Some(2))
            .activation(Activation::Hcd)
            .build(),
        SpectrumBuilder::new(3, "scan=4")
            .ms_level(2)
            .precursor(500.0, Some(3))
            .activation(Activation::Etd)
            .activation(Activation::Cid)
            .build(),
        SpectrumBuilder::new(4, "scan=5")
            .ms_level(2)
            .precursor(500.0, Some(3))
            .activation(Activation::Cid)
            .build(),
    ];
    let run: SpectrumListPtr = Arc::new(SimpleList::new(spectra).unwrap());

    let cid = FilterFactory::wrap(run.clone(), "activation CID").unwrap();
    assert_eq!(ids(cid.as_ref()), scans(&[2, 5]));
    let hcd = FilterFactory::wrap(run.clone(), "activation hcd").unwrap();
    assert_eq!(ids(hcd.as_ref()), scans(&[3]));
    let supplemental = FilterFactory::wrap(run, "activation SA").unwrap();
    assert_eq!(ids(supplemental.as_ref()), scans(&[4]));
}

#[test]
fn test_usage_lists_every_command() {
    let usage = FilterFactory::usage();
    for name in FilterFactory::commands() {
        assert!(usage.contains(name));
    }
    assert!(usage.contains("int_set"));
}
