#![no_main]

use libfuzzer_sys::fuzz_target;
use std::sync::Arc;

use mzaccess::prelude::*;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    // Integer set text must parse or fail, never panic
    if let Ok(set) = IntegerSet::parse(text) {
        let _ = set.to_string();
    }

    let spectra: Vec<Spectrum> = (0..8)
        .map(|i| {
            SpectrumBuilder::new(i, format!("scan={}", i + 1))
                .ms_level(if i % 2 == 0 { 1 } else { 2 })
                .scan_time(i as f64)
                .precursor(400.0 + i as f64, Some(2))
                .arrays(vec![100.0, 200.0, 300.0], vec![0.0, 1.0, 0.0])
                .build()
        })
        .collect();
    let Ok(list) = SimpleList::new(spectra) else {
        return;
    };

    // A built filter must honor the list contract
    if let Ok(filtered) = FilterFactory::wrap(Arc::new(list), text) {
        if let Ok(size) = filtered.size() {
            for i in 0..size {
                let _ = filtered.item(i, DetailLevel::FullData);
            }
            assert!(filtered.identity(size).is_err());
        }
    }
});
