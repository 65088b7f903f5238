use chrono::Duration;
use pv_yield_simulator::domain::{WeatherColumn, WeatherSample};
use pv_yield_simulator::error::SimError;
use pv_yield_simulator::solar::SpaIneichen;
use pv_yield_simulator::weather::{
    check, detect_gaps, fill, fill_with_fallback, FillMethod, FillOptions, OversizeGap,
    QualityReport, QualityThresholds, WeatherSeries,
};
use proptest::prelude::*;
use rstest::rstest;

use super::{mid_latitude_site, ts};

/// Hourly temperatures starting at midnight UTC; `None` leaves the hour out
fn hourly_temperatures(values: &[Option<f64>]) -> WeatherSeries {
    let t0 = ts("2024-06-01T00:00:00Z");
    let samples = values
        .iter()
        .enumerate()
        .filter_map(|(i, v)| {
            v.map(|temp| {
                let mut s = WeatherSample::empty(t0 + Duration::hours(i as i64));
                s.ambient_temp_c = Some(temp);
                s.ghi = Some(0.0);
                s
            })
        })
        .collect();
    WeatherSeries::new(samples).unwrap()
}

#[test]
fn linear_fill_bridges_three_missing_hours_exactly() {
    let series = hourly_temperatures(&[Some(10.0), None, None, None, Some(14.0)]);
    let gaps = detect_gaps(&series, "1h").unwrap();
    assert_eq!(gaps.len(), 1);
    assert_eq!(gaps[0].missing_points, 3);

    let filled = fill(
        &series,
        &FillOptions::new(FillMethod::Linear).columns([WeatherColumn::AmbientTemp]),
    )
    .unwrap();
    let temps: Vec<f64> = filled.iter().filter_map(|s| s.ambient_temp_c).collect();
    assert_eq!(temps, vec![10.0, 11.0, 12.0, 13.0, 14.0]);
}

#[test]
fn oversize_gap_is_left_alone_or_rejected() {
    let mut values = vec![Some(5.0)];
    values.extend(std::iter::repeat(None).take(8));
    values.push(Some(9.0));
    let series = hourly_temperatures(&values);

    let filled = fill(&series, &FillOptions::default()).unwrap();
    assert_eq!(filled.len(), 2);
    assert_eq!(detect_gaps(&filled, "h").unwrap()[0].missing_points, 8);

    let err = fill(&series, &FillOptions::default().oversize(OversizeGap::Fail)).unwrap_err();
    match err {
        SimError::UnfillableGap {
            missing_points,
            max_gap,
            ..
        } => {
            assert_eq!(missing_points, 8);
            assert_eq!(max_gap, 6);
        }
        other => panic!("unexpected error {other}"),
    }
}

#[test]
fn fallback_source_covers_long_gaps() {
    let mut values = vec![Some(5.0)];
    values.extend(std::iter::repeat(None).take(8));
    values.push(Some(9.0));
    let series = hourly_temperatures(&values);
    let fallback = hourly_temperatures(&[Some(7.0); 10]);

    let filled = fill_with_fallback(&series, &fallback, &FillOptions::default()).unwrap();
    assert_eq!(filled.len(), 10);
    assert_eq!(filled.samples()[4].ambient_temp_c, Some(7.0));
    assert!(detect_gaps(&filled, "1h").unwrap().is_empty());
}

#[test]
fn night_irradiance_raises_only_the_night_flag() {
    let mut sample = WeatherSample::empty(ts("2024-06-01T00:00:00Z"));
    sample.ambient_temp_c = Some(14.0);
    sample.ghi = Some(50.0);
    let series = WeatherSeries::new(vec![sample]).unwrap();

    let flags = check(
        &series,
        &mid_latitude_site(),
        &SpaIneichen::default(),
        &QualityThresholds::default(),
    )
    .unwrap();
    assert!(flags[0].nighttime_irradiance);
    assert!(!flags[0].negative_value);
    assert!(!flags[0].out_of_range);
    assert!(!flags[0].inconsistent_irradiance);
    assert!(!flags[0].is_malformed());

    let report = QualityReport::from_flags(&series, &flags);
    assert_eq!(report.nighttime_irradiance, 1);
    assert_eq!(report.quality_percent(), 0.0);
    assert!(report.render().contains("2024-06-01T00:00:00+00:00"));
}

#[test]
fn inconsistent_components_are_flagged_in_daylight() {
    let noon = ts("2024-06-01T12:00:00Z");
    let series = WeatherSeries::new(vec![WeatherSample::with_irradiance(noon, 25.0, 900.0, 300.0, 100.0)])
        .unwrap();
    let flags = check(
        &series,
        &mid_latitude_site(),
        &SpaIneichen::default(),
        &QualityThresholds::default(),
    )
    .unwrap();
    assert!(flags[0].inconsistent_irradiance);
    assert!(!flags[0].nighttime_irradiance);
}

#[test]
fn out_of_order_timestamps_are_rejected() {
    let a = WeatherSample::empty(ts("2024-06-01T01:00:00Z"));
    let b = WeatherSample::empty(ts("2024-06-01T00:00:00Z"));
    let err = WeatherSeries::new(vec![a.clone(), b]).unwrap_err();
    assert!(matches!(err, SimError::InvalidParameter { .. }));
    assert!(WeatherSeries::new(vec![a.clone(), a]).is_err());
}

#[rstest]
#[case("fortnight")]
#[case("")]
#[case("-5min")]
#[case("0h")]
fn unparsable_cadence_is_rejected(#[case] cadence: &str) {
    let series = hourly_temperatures(&[Some(1.0), Some(2.0)]);
    let err = detect_gaps(&series, cadence).unwrap_err();
    assert!(matches!(err, SimError::InvalidParameter { .. }));
}

#[test]
fn missing_irradiance_columns_fail_schema_check() {
    let mut sample = WeatherSample::empty(ts("2024-06-01T00:00:00Z"));
    sample.ambient_temp_c = Some(10.0);
    let series = WeatherSeries::new(vec![sample]).unwrap();
    assert!(matches!(
        series.require_schema(),
        Err(SimError::DataQuality { .. })
    ));
}

fn temperature_series() -> impl Strategy<Value = WeatherSeries> {
    prop::collection::vec(prop::option::weighted(0.7, -20.0f64..40.0), 2..48).prop_map(
        |mut values| {
            values[0] = Some(values[0].unwrap_or(0.0));
            let last = values.len() - 1;
            values[last] = Some(values[last].unwrap_or(0.0));
            hourly_temperatures(&values)
        },
    )
}

proptest! {
    #[test]
    fn fill_without_limit_closes_every_gap(series in temperature_series()) {
        let filled = fill(&series, &FillOptions::new(FillMethod::Time).limit(None)).unwrap();
        prop_assert!(detect_gaps(&filled, "1h").unwrap().is_empty());
        prop_assert!(filled.iter().all(|s| s.ambient_temp_c.is_some()));
    }

    #[test]
    fn checking_twice_gives_identical_flags(series in temperature_series()) {
        let geometry = SpaIneichen::default();
        let thresholds = QualityThresholds::default();
        let first = check(&series, &mid_latitude_site(), &geometry, &thresholds).unwrap();
        let second = check(&series, &mid_latitude_site(), &geometry, &thresholds).unwrap();
        prop_assert_eq!(first, second);
    }
}
