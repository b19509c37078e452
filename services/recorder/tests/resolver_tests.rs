//! Resolution rules over a synthetic catalog: futures rollover, option
//! strike windows, index membership validation.

use chrono::NaiveDate;
use recorder_common::types::instrument::{
    SEGMENT_CASH, SEGMENT_FUTURES, SEGMENT_INDICES, SEGMENT_OPTIONS,
};
use recorder_common::{Instrument, InstrumentKind, OptionKind, ResolutionError};
use rstest::{fixture, rstest};
use rustc_hash::FxHashMap;
use tempfile::TempDir;
use tick_recorder::catalog::{Catalog, CatalogExchange};
use tick_recorder::manifest::{ManifestEntry, ResolutionManifest};
use tick_recorder::resolver::{
    by_position, resolve_futures, resolve_index_members, resolve_indices, resolve_options,
    StrikeWindow,
};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn future(token: u32, underlying: &str, expiry: NaiveDate) -> Instrument {
    Instrument {
        instrument_token: token,
        trading_symbol: format!("{underlying}{token}FUT"),
        name: underlying.to_string(),
        segment: SEGMENT_FUTURES.to_string(),
        kind: InstrumentKind::Future,
        expiry: Some(expiry),
        strike: None,
        lot_size: 50,
    }
}

fn option(
    token: u32,
    underlying: &str,
    strike: f64,
    kind: InstrumentKind,
    expiry: NaiveDate,
) -> Instrument {
    Instrument {
        instrument_token: token,
        trading_symbol: format!("{underlying}{strike}{token}"),
        name: underlying.to_string(),
        segment: SEGMENT_OPTIONS.to_string(),
        kind,
        expiry: Some(expiry),
        strike: Some(strike),
        lot_size: 50,
    }
}

fn equity(token: u32, symbol: &str) -> Instrument {
    Instrument {
        instrument_token: token,
        trading_symbol: symbol.to_string(),
        name: symbol.to_string(),
        segment: SEGMENT_CASH.to_string(),
        kind: InstrumentKind::Equity,
        expiry: None,
        strike: None,
        lot_size: 1,
    }
}

fn index(token: u32, symbol: &str) -> Instrument {
    Instrument {
        instrument_token: token,
        trading_symbol: symbol.to_string(),
        name: symbol.to_string(),
        segment: SEGMENT_INDICES.to_string(),
        kind: InstrumentKind::Index,
        expiry: None,
        strike: None,
        lot_size: 0,
    }
}

/// NIFTY monthly futures expiring Jan 25 and Feb 29
#[fixture]
fn futures_catalog() -> Catalog {
    Catalog::from_instruments(
        CatalogExchange::Nfo,
        vec![
            future(2, "NIFTY", date(2024, 2, 29)),
            future(1, "NIFTY", date(2024, 1, 25)),
        ],
    )
}

#[rstest]
fn far_from_expiry_tracks_one_contract(futures_catalog: Catalog) {
    let picks = resolve_futures(&futures_catalog, "NIFTY", date(2024, 1, 10), 3).unwrap();
    assert_eq!(picks.len(), 1);
    assert_eq!(picks[0].instrument_token, 1);
}

#[rstest]
#[case::on_trigger_day(date(2024, 1, 22))]
#[case::inside_window(date(2024, 1, 23))]
#[case::expiry_day(date(2024, 1, 25))]
fn rollover_window_tracks_two_contracts(futures_catalog: Catalog, #[case] today: NaiveDate) {
    let picks = resolve_futures(&futures_catalog, "NIFTY", today, 3).unwrap();
    assert_eq!(picks.len(), 2);
    // nearest expiry first
    assert_eq!(picks[0].instrument_token, 1);
    assert_eq!(picks[1].instrument_token, 2);
}

#[rstest]
fn day_before_trigger_still_one_contract(futures_catalog: Catalog) {
    let picks = resolve_futures(&futures_catalog, "NIFTY", date(2024, 1, 21), 3).unwrap();
    assert_eq!(picks.len(), 1);
}

#[test]
fn unknown_underlying_is_fatal() {
    let catalog = Catalog::from_instruments(CatalogExchange::Nfo, vec![]);
    let result = resolve_futures(&catalog, "NIFTY", date(2024, 1, 10), 3);
    assert!(matches!(
        result,
        Err(ResolutionError::NoContracts { underlying }) if underlying == "NIFTY"
    ));
}

/// NIFTY puts around 44000 at two expiries, plus rows the window must
/// reject: off-increment strike, call side, far strikes.
#[fixture]
fn options_catalog() -> Catalog {
    let near = date(2024, 1, 25);
    let far = date(2024, 2, 29);
    let mut rows = Vec::new();

    let mut token = 100;
    for step in -7..=7 {
        let strike = 44_000.0 + f64::from(step) * 100.0;
        rows.push(option(token, "NIFTY", strike, InstrumentKind::Put, near));
        token += 1;
        rows.push(option(token, "NIFTY", strike, InstrumentKind::Call, near));
        token += 1;
        rows.push(option(token, "NIFTY", strike, InstrumentKind::Put, far));
        token += 1;
    }
    // off-increment strike inside the window
    rows.push(option(999, "NIFTY", 44_050.0, InstrumentKind::Put, near));

    Catalog::from_instruments(CatalogExchange::Nfo, rows)
}

#[rstest]
fn strike_window_selects_nearest_expiry_puts(options_catalog: Catalog) {
    let window = StrikeWindow {
        underlying: "NIFTY".to_string(),
        atm: 44_000.0,
        per_side: 5,
        increment: 100,
        kind: OptionKind::Put,
    };
    let picks = resolve_options(&options_catalog, &window).unwrap();

    // 5 per side plus ATM
    assert_eq!(picks.len(), 11);
    for pick in &picks {
        assert_eq!(pick.instrument.kind, InstrumentKind::Put);
        assert_eq!(pick.instrument.expiry, Some(date(2024, 1, 25)));
    }

    // sorted by descending strike, positions running +5 down to -5
    let positions: Vec<i32> = picks.iter().map(|p| p.position).collect();
    assert_eq!(positions, vec![5, 4, 3, 2, 1, 0, -1, -2, -3, -4, -5]);
    assert_eq!(picks[0].instrument.strike, Some(44_500.0));
    assert_eq!(picks[10].instrument.strike, Some(43_500.0));

    // the 44050 row sits inside the span but off the grid
    assert!(picks.iter().all(|p| p.instrument.instrument_token != 999));

    let indexed = by_position(&picks);
    assert_eq!(indexed[&0].instrument.strike, Some(44_000.0));
    assert_eq!(indexed[&-3].instrument.strike, Some(43_700.0));
}

#[rstest]
fn empty_window_is_fatal(options_catalog: Catalog) {
    let window = StrikeWindow {
        underlying: "BANKNIFTY".to_string(),
        atm: 44_000.0,
        per_side: 5,
        increment: 100,
        kind: OptionKind::Put,
    };
    assert!(matches!(
        resolve_options(&options_catalog, &window),
        Err(ResolutionError::NoOptionChain { .. })
    ));
}

#[test]
fn membership_symbols_must_be_tradable() {
    let catalog = Catalog::from_instruments(
        CatalogExchange::Nse,
        vec![equity(1, "RELIANCE"), equity(2, "TCS")],
    );
    let mut membership = FxHashMap::default();
    membership.insert("RELIANCE".to_string(), 10.5);
    membership.insert("GHOSTCO".to_string(), 1.0);
    membership.insert("ALSOGONE".to_string(), 0.5);

    let tradable = vec!["RELIANCE".to_string(), "TCS".to_string()];
    let result = resolve_index_members(&catalog, "NIFTY", &membership, &tradable);

    match result {
        Err(ResolutionError::MissingSymbols { index, symbols }) => {
            assert_eq!(index, "NIFTY");
            // sorted for deterministic reporting
            assert_eq!(symbols, vec!["ALSOGONE".to_string(), "GHOSTCO".to_string()]);
        }
        other => panic!("expected MissingSymbols, got {other:?}"),
    }
}

#[test]
fn membership_resolves_cash_rows_with_weights() {
    let catalog = Catalog::from_instruments(
        CatalogExchange::Nse,
        vec![equity(1, "RELIANCE"), equity(2, "TCS"), equity(3, "INFY")],
    );
    let mut membership = FxHashMap::default();
    membership.insert("RELIANCE".to_string(), 10.5);
    membership.insert("TCS".to_string(), 4.2);

    let tradable = vec![
        "RELIANCE".to_string(),
        "TCS".to_string(),
        "INFY".to_string(),
    ];
    let picks = resolve_index_members(&catalog, "NIFTY", &membership, &tradable).unwrap();

    assert_eq!(picks.len(), 2);
    let reliance = picks
        .iter()
        .find(|p| p.instrument.trading_symbol == "RELIANCE")
        .unwrap();
    assert!((reliance.weight - 10.5).abs() < f64::EPSILON);
}

#[rstest]
fn manifest_persists_window_positions(options_catalog: Catalog) {
    let window = StrikeWindow {
        underlying: "NIFTY".to_string(),
        atm: 44_000.0,
        per_side: 5,
        increment: 100,
        kind: OptionKind::Put,
    };
    let picks = resolve_options(&options_catalog, &window).unwrap();

    let mut manifest = ResolutionManifest::new();
    for pick in &picks {
        manifest.push(ManifestEntry::option(pick));
    }

    let dir = TempDir::new().unwrap();
    let path = manifest.write(dir.path()).unwrap();
    let restored = ResolutionManifest::read(&path).unwrap();
    assert_eq!(restored, manifest);

    // every position from +k down to -k survives on disk
    let positions: Vec<i32> = restored
        .entries()
        .iter()
        .map(|e| e.position.unwrap())
        .collect();
    assert_eq!(positions, vec![5, 4, 3, 2, 1, 0, -1, -2, -3, -4, -5]);

    // lookup by token recovers the attribute without recomputation
    let atm_token = picks[5].instrument.instrument_token;
    assert_eq!(restored.get(atm_token).unwrap().position, Some(0));
}

#[test]
fn manifest_persists_index_weights() {
    let catalog = Catalog::from_instruments(
        CatalogExchange::Nse,
        vec![equity(1, "RELIANCE"), equity(2, "TCS")],
    );
    let mut membership = FxHashMap::default();
    membership.insert("RELIANCE".to_string(), 10.5);
    membership.insert("TCS".to_string(), 4.2);

    let tradable = vec!["RELIANCE".to_string(), "TCS".to_string()];
    let picks = resolve_index_members(&catalog, "NIFTY", &membership, &tradable).unwrap();

    let mut manifest = ResolutionManifest::new();
    for pick in &picks {
        manifest.push(ManifestEntry::equity(pick));
    }

    let dir = TempDir::new().unwrap();
    let path = manifest.write(dir.path()).unwrap();
    let restored = ResolutionManifest::read(&path).unwrap();

    let reliance = restored.get(1).unwrap();
    assert_eq!(reliance.weight, Some(10.5));
    assert!(reliance.position.is_none());
}

#[test]
fn index_resolution_filters_by_symbol() {
    let catalog = Catalog::from_instruments(
        CatalogExchange::Nse,
        vec![
            index(256265, "NIFTY 50"),
            index(260105, "NIFTY BANK"),
            index(264969, "NIFTY MIDCAP"),
            equity(1, "NIFTY 50"), // cash row with a confusing symbol
        ],
    );

    let symbols = vec!["NIFTY 50".to_string(), "NIFTY BANK".to_string()];
    let picks = resolve_indices(&catalog, &symbols);

    let tokens: Vec<u32> = picks.iter().map(|i| i.instrument_token).collect();
    assert_eq!(tokens, vec![256265, 260105]);
}
