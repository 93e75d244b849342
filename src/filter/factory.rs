use std::sync::Arc;

use super::{
    ActivationFilter, ChargeStateSet, DefaultArrayLengthSet, FilterList, FilterMode, IdSet, IndexSet,
    LockmassRefiner, MsLevelSet, MzPresent, MzWindow, Orientation, PolarityFilter, PrecursorMzSet, ScanEventSet,
    ScanNumberSet, ScanTimeRange, ScanTimeSorter, ThresholdFilter, ThresholdKind, Tolerance, TransformList,
    ZeroSamplesFilter,
};
use crate::integer_set::IntegerSet;
use crate::list::{ListError, SpectrumListPtr};
use crate::record::Polarity;

type Creator = fn(SpectrumListPtr, &str) -> Result<SpectrumListPtr, String>;

struct Command {
    name: &'static str,
    usage: &'static str,
    create: Creator,
}

const COMMANDS: &[Command] = &[
    Command {
        name: "index",
        usage: "int_set",
        create: create_index,
    },
    Command {
        name: "id",
        usage: "id1;id2;... (semicolon-separated native ids)",
        create: create_id,
    },
    Command {
        name: "msLevel",
        usage: "int_set",
        create: create_ms_level,
    },
    Command {
        name: "scanNumber",
        usage: "int_set",
        create: create_scan_number,
    },
    Command {
        name: "scanEvent",
        usage: "int_set",
        create: create_scan_event,
    },
    Command {
        name: "scanTime",
        usage: "[scanTimeLow,scanTimeHigh] (seconds)",
        create: create_scan_time,
    },
    Command {
        name: "chargeState",
        usage: "int_set (0 matches MSn spectra of unknown charge)",
        create: create_charge_state,
    },
    Command {
        name: "mzPrecursors",
        usage: "[mz1,mz2,...] [mzTol=<tolerance>(10ppm)] [mode=<include|exclude>] (0 matches spectra without precursor)",
        create: create_mz_precursors,
    },
    Command {
        name: "defaultArrayLength",
        usage: "int_set",
        create: create_default_array_length,
    },
    Command {
        name: "polarity",
        usage: "<positive|negative|+|-> (filter by scan polarity)",
        create: create_polarity,
    },
    Command {
        name: "activation",
        usage: "<CID|SA|HCD|BIRD|ECD|ETD|IRMPD|PD|PSD|PQD|SID|SORI> (CID: no other method; SA: ETD with supplemental CID)",
        create: create_activation,
    },
    Command {
        name: "mzPresent",
        usage: "[mz1,mz2,...] [mzTol=<tolerance>(0.5mz)] [mostIntense=<count>] [mode=<include|exclude>]",
        create: create_mz_present,
    },
    Command {
        name: "sortByScanTime",
        usage: "(sort by ascending scan start time)",
        create: create_sort_by_scan_time,
    },
    Command {
        name: "zeroSamples",
        usage: "[removeExtra] [int_set(MS levels)] (remove redundant zero-intensity samples)",
        create: create_zero_samples,
    },
    Command {
        name: "mzWindow",
        usage: "[mzLow,mzHigh]",
        create: create_mz_window,
    },
    Command {
        name: "threshold",
        usage: "<count|count-after-ties|absolute|bpi-relative|tic-relative|tic-cutoff> <threshold> \
                <most-intense|least-intense> [int_set(MS levels)]",
        create: create_threshold,
    },
    Command {
        name: "lockmassRefiner",
        usage: "mz=<real> [tol=<real>(1.0)] (recalibrate m/z against a lock mass peak)",
        create: create_lockmass_refiner,
    },
];

/// Builds decorators from textual commands such as `msLevel 2-` and stacks
/// them on a spectrum list.
#[derive(Debug, Clone, Copy, Default)]
pub struct FilterFactory;

impl FilterFactory {
    /// Wrap `list` with the decorator described by `command`.
    ///
    /// Unknown commands are logged and skipped; malformed arguments are
    /// rejected with [`ListError::ConfigurationRejected`].
    pub fn wrap(list: SpectrumListPtr, command: &str) -> Result<SpectrumListPtr, ListError> {
        let text = strip_quotes(command.trim());
        let (name, arg) = match text.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (text, ""),
        };

        let Some(entry) = COMMANDS.iter().find(|c| c.name == name) else {
            log::warn!("[FilterFactory] ignoring unknown filter command: {}", text);
            return Ok(list);
        };

        log::debug!("[FilterFactory] wrapping {} with '{}'", list.describe(), text);
        (entry.create)(list, arg).map_err(|reason| {
            ListError::rejected(format!("FilterFactory({})", name), format!("'{}': {}", text, reason))
        })
    }

    /// Apply `commands` in order, each wrapping the result of the previous one
    pub fn wrap_all<I, S>(list: SpectrumListPtr, commands: I) -> Result<SpectrumListPtr, ListError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        commands
            .into_iter()
            .try_fold(list, |list, command| Self::wrap(list, command.as_ref()))
    }

    /// Names of all known commands
    pub fn commands() -> impl Iterator<Item = &'static str> {
        COMMANDS.iter().map(|c| c.name)
    }

    /// Human-readable list of commands and their arguments
    pub fn usage() -> String {
        let mut out = String::from("\nFilter options:\n\n");
        for command in COMMANDS {
            out.push_str(command.name);
            out.push(' ');
            out.push_str(command.usage);
            out.push('\n');
        }
        out.push_str(
            "\n'int_set' means that a set of integers must be specified, as a list of intervals \
             of the form [a,b] or a[-][b]\n",
        );
        out
    }
}

fn strip_quotes(text: &str) -> &str {
    for quote in ['\'', '"'] {
        if let Some(inner) = text.strip_prefix(quote).and_then(|t| t.strip_suffix(quote)) {
            return inner.trim();
        }
    }
    text
}

fn int_set(arg: &str) -> Result<IntegerSet, String> {
    if arg.is_empty() {
        return Err("expected an int_set argument".to_string());
    }
    IntegerSet::parse(arg).map_err(|e| e.to_string())
}

/// Split `[a,b,...] rest` into the bracketed values and the rest
fn bracketed(arg: &str) -> Result<(Vec<f64>, &str), String> {
    let inner_start = arg
        .strip_prefix('[')
        .ok_or_else(|| format!("expected '[' at start of '{}'", arg))?;
    let (inner, rest) = inner_start
        .split_once(']')
        .ok_or_else(|| format!("missing ']' in '{}'", arg))?;
    let values = inner
        .split(',')
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(|v| v.parse::<f64>().map_err(|_| format!("invalid number '{}'", v)))
        .collect::<Result<Vec<_>, _>>()?;
    Ok((values, rest.trim()))
}

fn bracketed_pair(arg: &str) -> Result<(f64, f64), String> {
    match bracketed(arg)? {
        (values, rest) if values.len() == 2 && rest.is_empty() => Ok((values[0], values[1])),
        _ => Err("expected [low,high]".to_string()),
    }
}

/// `key=value` options following the positional part of an argument
fn options<'a>(rest: &'a str, known: &[&str]) -> Result<Vec<(&'a str, &'a str)>, String> {
    rest.split_whitespace()
        .map(|token| {
            let (key, value) = token
                .split_once('=')
                .ok_or_else(|| format!("expected key=value, got '{}'", token))?;
            if known.iter().any(|k| k.eq_ignore_ascii_case(key)) {
                Ok((key, value))
            } else {
                Err(format!("unknown option '{}'", key))
            }
        })
        .collect()
}

fn option<'a>(options: &[(&str, &'a str)], key: &str) -> Option<&'a str> {
    options
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(key))
        .map(|(_, v)| *v)
}

fn mode(options: &[(&str, &str)]) -> Result<FilterMode, String> {
    option(options, "mode").map_or(Ok(FilterMode::Include), str::parse)
}

fn tolerance(options: &[(&str, &str)], default: Tolerance) -> Result<Tolerance, String> {
    option(options, "mzTol").map_or(Ok(default), str::parse)
}

fn create_index(list: SpectrumListPtr, arg: &str) -> Result<SpectrumListPtr, String> {
    Ok(Arc::new(FilterList::new(list, IndexSet::new(int_set(arg)?))))
}

fn create_id(list: SpectrumListPtr, arg: &str) -> Result<SpectrumListPtr, String> {
    let ids: Vec<&str> = arg.split(';').map(str::trim).filter(|s| !s.is_empty()).collect();
    if ids.is_empty() {
        return Err("expected at least one id".to_string());
    }
    Ok(Arc::new(FilterList::new(list, IdSet::new(ids))))
}

fn create_ms_level(list: SpectrumListPtr, arg: &str) -> Result<SpectrumListPtr, String> {
    Ok(Arc::new(FilterList::new(list, MsLevelSet::new(int_set(arg)?))))
}

fn create_scan_number(list: SpectrumListPtr, arg: &str) -> Result<SpectrumListPtr, String> {
    Ok(Arc::new(FilterList::new(list, ScanNumberSet::new(int_set(arg)?))))
}

fn create_scan_event(list: SpectrumListPtr, arg: &str) -> Result<SpectrumListPtr, String> {
    Ok(Arc::new(FilterList::new(list, ScanEventSet::new(int_set(arg)?))))
}

fn create_scan_time(list: SpectrumListPtr, arg: &str) -> Result<SpectrumListPtr, String> {
    let (low, high) = bracketed_pair(arg)?;
    Ok(Arc::new(FilterList::new(list, ScanTimeRange::new(low, high))))
}

fn create_charge_state(list: SpectrumListPtr, arg: &str) -> Result<SpectrumListPtr, String> {
    Ok(Arc::new(FilterList::new(list, ChargeStateSet::new(int_set(arg)?))))
}

fn create_mz_precursors(list: SpectrumListPtr, arg: &str) -> Result<SpectrumListPtr, String> {
    let (mzs, rest) = bracketed(arg)?;
    let options = options(rest, &["mzTol", "mode"])?;
    let predicate = PrecursorMzSet::new(mzs, tolerance(&options, Tolerance::Ppm(10.0))?, mode(&options)?);
    Ok(Arc::new(FilterList::new(list, predicate)))
}

fn create_default_array_length(list: SpectrumListPtr, arg: &str) -> Result<SpectrumListPtr, String> {
    Ok(Arc::new(FilterList::new(list, DefaultArrayLengthSet::new(int_set(arg)?))))
}

fn create_polarity(list: SpectrumListPtr, arg: &str) -> Result<SpectrumListPtr, String> {
    match Polarity::parse(arg) {
        Some(polarity) => Ok(Arc::new(FilterList::new(list, PolarityFilter::new(polarity)))),
        None => Err("invalid polarity (expected \"positive\" or \"negative\")".to_string()),
    }
}

fn create_activation(list: SpectrumListPtr, arg: &str) -> Result<SpectrumListPtr, String> {
    match ActivationFilter::parse(arg) {
        Some(predicate) => Ok(Arc::new(FilterList::new(list, predicate))),
        None => Err(format!("unknown activation type '{}'", arg)),
    }
}

fn create_mz_present(list: SpectrumListPtr, arg: &str) -> Result<SpectrumListPtr, String> {
    let (mzs, rest) = bracketed(arg)?;
    if mzs.is_empty() {
        return Err("expected at least one m/z".to_string());
    }
    let options = options(rest, &["mzTol", "mostIntense", "mode"])?;
    let most_intense = option(&options, "mostIntense")
        .map(|v| v.parse::<usize>().map_err(|_| format!("invalid count '{}'", v)))
        .transpose()?;
    let predicate = MzPresent::new(mzs, tolerance(&options, Tolerance::Mz(0.5))?, most_intense, mode(&options)?);
    Ok(Arc::new(FilterList::new(list, predicate)))
}

fn create_sort_by_scan_time(list: SpectrumListPtr, arg: &str) -> Result<SpectrumListPtr, String> {
    if !arg.is_empty() {
        return Err("takes no arguments".to_string());
    }
    Ok(Arc::new(ScanTimeSorter::new(list)))
}

fn create_zero_samples(list: SpectrumListPtr, arg: &str) -> Result<SpectrumListPtr, String> {
    let levels = match arg.strip_prefix("removeExtra").map(str::trim).unwrap_or(arg) {
        "" => IntegerSet::from_range(1, i32::MAX).map_err(|e| e.to_string())?,
        levels => int_set(levels)?,
    };
    Ok(Arc::new(TransformList::new(list, ZeroSamplesFilter::new(levels))))
}

fn create_mz_window(list: SpectrumListPtr, arg: &str) -> Result<SpectrumListPtr, String> {
    let (low, high) = bracketed_pair(arg)?;
    let window = MzWindow::new(low, high).map_err(|e| e.to_string())?;
    Ok(Arc::new(TransformList::new(list, window)))
}

fn create_lockmass_refiner(list: SpectrumListPtr, arg: &str) -> Result<SpectrumListPtr, String> {
    let options = options(arg, &["mz", "tol"])?;
    let parse = |key: &str, default: Option<f64>| -> Result<f64, String> {
        match option(&options, key) {
            Some(v) => v.parse().map_err(|_| format!("invalid {} '{}'", key, v)),
            None => default.ok_or_else(|| format!("missing {}=", key)),
        }
    };
    let refiner = LockmassRefiner::new(parse("mz", None)?, parse("tol", Some(1.0))?).map_err(|e| e.to_string())?;
    Ok(Arc::new(TransformList::new(list, refiner)))
}

fn create_threshold(list: SpectrumListPtr, arg: &str) -> Result<SpectrumListPtr, String> {
    let mut tokens = arg.split_whitespace();
    let (Some(kind), Some(threshold), Some(orientation)) = (tokens.next(), tokens.next(), tokens.next()) else {
        return Err("expected <type> <threshold> <orientation> [int_set]".to_string());
    };
    let kind: ThresholdKind = kind.parse()?;
    let threshold: f64 = threshold
        .parse()
        .map_err(|_| format!("invalid threshold '{}'", threshold))?;
    let orientation: Orientation = orientation.parse()?;
    let levels = tokens.collect::<Vec<_>>().join(" ");
    let levels = if levels.is_empty() {
        IntegerSet::from_range(1, i32::MAX).map_err(|e| e.to_string())?
    } else {
        int_set(&levels)?
    };
    let filter = ThresholdFilter::new(kind, threshold, orientation, levels).map_err(|e| e.to_string())?;
    Ok(Arc::new(TransformList::new(list, filter)))
}
