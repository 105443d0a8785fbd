#[cfg(test)]
mod sim_tests {
    use chrono::{DateTime, Duration, TimeZone, Utc};

    use crate::core::config::Settings;
    use crate::core::coordinator::{Coordinator, CoordinatorOutput};
    use crate::core::feed::parse_targets;
    use crate::core::geo::{distance_km, Coord};
    use crate::core::model::{Target, TargetId};

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
    }

    fn cycle(
        coord: &mut Coordinator,
        payload: &str,
        settings: &Settings,
        now: DateTime<Utc>,
    ) -> CoordinatorOutput {
        let generation = coord.begin_refresh().unwrap();
        coord
            .complete_refresh(generation, parse_targets(payload.as_bytes()), settings, now)
            .unwrap()
    }

    /// Latitude north of the user that sits `km` away.
    fn lat_at(user: Coord, km: f64) -> f64 {
        user.lat + km / 111.195
    }

    #[test]
    fn simulate_expired_target_at_user_position() {
        let mut coord = Coordinator::new();
        coord.set_user_position(Some(Coord::new(49.0, 31.0)));

        let payload = r#"[{"id": "A", "type": "missile", "label": "A", "lat": 49.0, "lng": 31.0,
                           "expire_at": "2025-03-01T11:59:00Z"}]"#;
        let output = cycle(&mut coord, payload, &Settings::default(), start());

        assert!(output.deltas.added.is_empty());
        assert!(output.threats.is_empty());
        assert!(coord.store().is_empty());
        assert_eq!(output.status.object_count, 0);
    }

    #[test]
    fn simulate_approach_retreat_and_return() {
        let user = Coord::new(49.0, 31.0);
        let mut coord = Coordinator::new();
        coord.set_user_position(Some(user));
        let settings = Settings::default();

        let mut fired = Vec::new();
        for (i, km) in [80.0, 40.0, 45.0, 60.0, 55.0, 65.0, 40.0].iter().enumerate() {
            let payload = format!(
                r#"[{{"id": 9, "type": "drone", "lat": {}, "lng": 31.0}}]"#,
                lat_at(user, *km)
            );
            let now = start() + Duration::seconds(5 * i as i64);
            let output = cycle(&mut coord, &payload, &settings, now);
            assert!(output.deltas.removed.is_empty());
            fired.push(output.threats.len());
        }

        // Enters at 40, stays quiet inside the band, re-arms past 60, fires again
        assert_eq!(fired, vec![0, 1, 0, 0, 0, 0, 1]);
        assert_eq!(coord.store().len(), 1);
    }

    #[test]
    fn simulate_radius_shrink_with_open_alert() {
        let user = Coord::new(49.0, 31.0);
        let mut coord = Coordinator::new();
        coord.set_user_position(Some(user));

        let payload = format!(
            r#"[{{"id": "B", "type": "kab", "lat": {}, "lng": 31.0}}]"#,
            lat_at(user, 30.0)
        );
        let mut settings = Settings::default();
        let output = cycle(&mut coord, &payload, &settings, start());
        assert_eq!(output.threats.len(), 1);

        // Operator edits the radius: alerts re-arm, B is now outside
        settings.alert_radius = 20.0;
        coord.clear_alerts();
        let output = cycle(&mut coord, &payload, &settings, start() + Duration::seconds(5));
        assert!(output.threats.is_empty());
        assert!(output.deltas.added.is_empty());
        assert_eq!(output.deltas.updated.len(), 1);
        assert_eq!(coord.store().len(), 1);
        assert!(!coord.alert_state().is_open(&TargetId::new("B").unwrap()));
    }

    #[test]
    fn simulate_settings_change_mid_flight() {
        let user = Coord::new(49.0, 31.0);
        let mut coord = Coordinator::new();
        coord.set_user_position(Some(user));
        let mut settings = Settings {
            alert_radius: 10.0,
            ..Settings::default()
        };

        let generation = coord.begin_refresh().unwrap();
        // Radius widened while the fetch is outstanding
        settings.alert_radius = 50.0;
        assert!(coord.begin_refresh().is_none());

        let payload = format!(r#"[{{"id": 1, "lat": {}, "lng": 31.0}}]"#, lat_at(user, 30.0));
        let output = coord
            .complete_refresh(generation, parse_targets(payload.as_bytes()), &settings, start())
            .unwrap();
        assert_eq!(output.threats.len(), 1);
        assert!(!coord.is_refreshing());
    }

    #[test]
    fn simulate_set_equivalence_over_random_churn() {
        let mut coord = Coordinator::new();
        let settings = Settings::default();
        let rounds: [&[u32]; 5] = [&[1, 2, 3], &[2, 3, 4, 5], &[], &[5, 1], &[1, 1, 5, 7]];

        for (i, ids) in rounds.iter().enumerate() {
            let targets: Vec<Target> = ids
                .iter()
                .map(|id| {
                    let json = format!(r#"{{"id": {id}, "lat": 48.0, "lng": 30.0}}"#);
                    serde_json::from_str(&json).unwrap()
                })
                .collect();
            let payload = serde_json::to_string(&targets).unwrap();
            cycle(&mut coord, &payload, &settings, start() + Duration::seconds(i as i64));

            let mut expected: Vec<String> = ids.iter().map(ToString::to_string).collect();
            expected.sort();
            expected.dedup();
            let mut actual: Vec<String> =
                coord.store().ids().iter().map(ToString::to_string).collect();
            actual.sort();
            assert_eq!(actual, expected, "round {i}");
        }
    }

    #[test]
    fn simulate_helper_distance_is_accurate() {
        let user = Coord::new(49.0, 31.0);
        let d = distance_km(user, Coord::new(lat_at(user, 40.0), 31.0));
        assert!((d - 40.0).abs() < 0.05, "got {d}");
    }
}
