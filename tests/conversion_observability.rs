use std::sync::{Arc, Mutex};

use csv_json_convert::conversion::{
    ChunkedConverter, ChunkedOptions, CompositeObserver, ConversionContext, ConversionObserver, ConversionOperation,
    ConversionSeverity, ConversionStats, Converter, ConverterOptions, TracingObserver,
};
use csv_json_convert::ConversionError;

#[derive(Default)]
struct RecordingObserver {
    successes: Mutex<Vec<(ConversionOperation, usize)>>,
    failures: Mutex<Vec<ConversionSeverity>>,
    alerts: Mutex<Vec<ConversionSeverity>>,
}

impl ConversionObserver for RecordingObserver {
    fn on_success(&self, ctx: &ConversionContext, stats: ConversionStats) {
        self.successes.lock().unwrap().push((ctx.operation, stats.rows));
    }

    fn on_failure(&self, _ctx: &ConversionContext, severity: ConversionSeverity, _error: &ConversionError) {
        self.failures.lock().unwrap().push(severity);
    }

    fn on_alert(&self, _ctx: &ConversionContext, severity: ConversionSeverity, _error: &ConversionError) {
        self.alerts.lock().unwrap().push(severity);
    }
}

fn options_with(obs: Arc<RecordingObserver>, alert_at_or_above: ConversionSeverity) -> ConverterOptions {
    ConverterOptions {
        observer: Some(obs),
        alert_at_or_above,
        ..Default::default()
    }
}

#[test]
fn observer_receives_failure_and_alert_on_missing_file() {
    let obs = Arc::new(RecordingObserver::default());
    let converter = Converter::new(options_with(obs.clone(), ConversionSeverity::Critical));

    // Missing file -> NotFound -> Critical
    let _ = converter
        .convert_all("tests/fixtures/does_not_exist.csv")
        .unwrap_err();

    assert_eq!(*obs.failures.lock().unwrap(), vec![ConversionSeverity::Critical]);
    assert_eq!(*obs.alerts.lock().unwrap(), vec![ConversionSeverity::Critical]);
}

#[test]
fn observer_receives_failure_without_alert_for_non_critical_error() {
    let obs = Arc::new(RecordingObserver::default());
    let converter = Converter::new(options_with(obs.clone(), ConversionSeverity::Critical));

    let _ = converter
        .convert_row("tests/fixtures/titanic_sample.csv", 99)
        .unwrap_err();
    let _ = converter.convert_all("tests/fixtures/ragged.csv").unwrap_err();

    assert_eq!(
        *obs.failures.lock().unwrap(),
        vec![ConversionSeverity::Warning, ConversionSeverity::Error]
    );
    assert!(obs.alerts.lock().unwrap().is_empty());
}

#[test]
fn observer_receives_success_stats() {
    let obs = Arc::new(RecordingObserver::default());
    let converter = Converter::new(options_with(obs.clone(), ConversionSeverity::Critical));

    converter.convert_all("tests/fixtures/titanic_sample.csv").unwrap();
    converter.convert_row("tests/fixtures/titanic_sample.csv", 0).unwrap();

    assert_eq!(
        *obs.successes.lock().unwrap(),
        vec![(ConversionOperation::ConvertAll, 6), (ConversionOperation::ConvertRow, 1)]
    );
}

#[test]
fn chunked_converter_reports_through_shared_options() {
    let obs = Arc::new(RecordingObserver::default());
    let converter = ChunkedConverter::new(ChunkedOptions {
        chunk_rows: 2,
        conversion: options_with(obs.clone(), ConversionSeverity::Error),
        ..Default::default()
    });

    converter.inspect("tests/fixtures/titanic_sample.csv").unwrap();
    let _ = converter.inspect("tests/fixtures/empty.csv").unwrap_err();

    assert_eq!(
        *obs.successes.lock().unwrap(),
        vec![(ConversionOperation::Inspect, 7)]
    );
    assert_eq!(*obs.failures.lock().unwrap(), vec![ConversionSeverity::Error]);
    assert_eq!(*obs.alerts.lock().unwrap(), vec![ConversionSeverity::Error]);
}

#[test]
fn composite_observer_fans_out() {
    let a = Arc::new(RecordingObserver::default());
    let b = Arc::new(RecordingObserver::default());
    let observers: Vec<Arc<dyn ConversionObserver>> = vec![a.clone(), b.clone(), Arc::new(TracingObserver)];
    let composite = CompositeObserver::new(observers);
    let converter = Converter::new(ConverterOptions {
        observer: Some(Arc::new(composite)),
        ..Default::default()
    });

    converter.convert_all("tests/fixtures/titanic_sample.csv").unwrap();

    assert_eq!(a.successes.lock().unwrap().len(), 1);
    assert_eq!(b.successes.lock().unwrap().len(), 1);
}

#[test]
fn composite_routes_by_operation() {
    let everything = Arc::new(RecordingObserver::default());
    let rows_only = Arc::new(RecordingObserver::default());
    let all: Vec<Arc<dyn ConversionObserver>> = vec![everything.clone()];
    let composite = CompositeObserver::new(all)
        .route(ConversionOperation::ConvertRow, rows_only.clone());
    let converter = Converter::new(ConverterOptions {
        observer: Some(Arc::new(composite)),
        ..Default::default()
    });

    converter.convert_all("tests/fixtures/titanic_sample.csv").unwrap();
    converter.convert_row("tests/fixtures/titanic_sample.csv", 2).unwrap();
    let _ = converter
        .convert_row("tests/fixtures/titanic_sample.csv", 6)
        .unwrap_err();

    assert_eq!(
        *everything.successes.lock().unwrap(),
        vec![(ConversionOperation::ConvertAll, 6), (ConversionOperation::ConvertRow, 1)]
    );
    assert_eq!(
        *rows_only.successes.lock().unwrap(),
        vec![(ConversionOperation::ConvertRow, 1)]
    );
    assert_eq!(*rows_only.failures.lock().unwrap(), vec![ConversionSeverity::Warning]);
    assert_eq!(*everything.failures.lock().unwrap(), vec![ConversionSeverity::Warning]);
}
