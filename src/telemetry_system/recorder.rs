use log::info;

use crate::control::program::StepResult;
use crate::telemetry_system::port::VehicleSnapshot;

/// Per-tick flight log with running extremes and a list of program events.
#[derive(Debug, Default)]
pub struct FlightRecorder {
    pub log: Vec<String>,
    max_speed: f64,
    max_altitude: f64,
    min_mass: Option<f64>,
    events: Vec<(String, f64)>,
    last_program: Option<String>,
    start_ut: Option<f64>,
}

impl FlightRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn format_time(elapsed_time: f64) -> String {
        if elapsed_time >= 3600.0 {
            let hours = (elapsed_time / 3600.0).floor();
            let minutes = ((elapsed_time % 3600.0) / 60.0).floor();
            let seconds = elapsed_time % 60.0;
            format!("{:.0}h {:.0}m {:.2}s", hours, minutes, seconds)
        } else if elapsed_time >= 60.0 {
            let minutes = (elapsed_time / 60.0).floor();
            let seconds = elapsed_time % 60.0;
            format!("{:.0}m {:.2}s", minutes, seconds)
        } else {
            format!("{:.2}s", elapsed_time)
        }
    }

    pub fn format_altitude(altitude: f64) -> String {
        if altitude.abs() >= 1000.0 {
            format!("{:.2} km", altitude / 1000.0)
        } else {
            format!("{:.2} m", altitude)
        }
    }

    fn elapsed(&mut self, ut: f64) -> f64 {
        ut - *self.start_ut.get_or_insert(ut)
    }

    pub fn record(&mut self, program: &str, snapshot: &VehicleSnapshot, result: &StepResult) {
        let elapsed = self.elapsed(snapshot.ut);
        self.max_speed = self.max_speed.max(snapshot.speed);
        self.max_altitude = self.max_altitude.max(snapshot.surface_altitude);
        self.min_mass = Some(self.min_mass.map_or(snapshot.mass, |mass| mass.min(snapshot.mass)));

        if self.last_program.as_deref() != Some(program) {
            self.events.push((format!("{program} started"), elapsed));
            self.last_program = Some(program.to_string());
        }
        if result.done {
            self.events.push((format!("{program} finished"), elapsed));
        }

        self.log.push(format!(
            "T+{} | alt {} | vs {:.2} m/s | hs {:.2} m/s | m {:.1} kg | {}",
            Self::format_time(elapsed),
            Self::format_altitude(snapshot.surface_altitude),
            snapshot.vertical_speed,
            snapshot.horizontal_speed,
            snapshot.mass,
            result.diagnostics.join(" | ")
        ));
    }

    /// Records a one-off event such as staging.
    pub fn mark(&mut self, event: &str, ut: f64) {
        let elapsed = self.elapsed(ut);
        self.events.push((event.to_string(), elapsed));
    }

    pub fn events(&self) -> &[(String, f64)] {
        &self.events
    }

    pub fn max_speed(&self) -> f64 {
        self.max_speed
    }

    pub fn max_altitude(&self) -> f64 {
        self.max_altitude
    }

    pub fn summary(&self) -> Vec<String> {
        let mut lines = vec![
            format!("Max Speed: {:.2} m/s", self.max_speed),
            format!("Max Altitude: {}", Self::format_altitude(self.max_altitude)),
            format!("Min Mass: {:.2} kg", self.min_mass.unwrap_or(0.0)),
        ];
        lines.extend(
            self.events
                .iter()
                .map(|(event, time)| format!("{} at {}", event, Self::format_time(*time))),
        );
        lines
    }

    pub fn log_summary(&self) {
        for line in self.summary() {
            info!("{}", line);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry_system::port::VehicleSituation;

    fn snapshot(ut: f64, altitude: f64, speed: f64, mass: f64) -> VehicleSnapshot {
        VehicleSnapshot {
            ut,
            mass,
            available_thrust: 0.0,
            max_thrust: 0.0,
            specific_impulse: 0.0,
            gravity: 9.81,
            mean_altitude: altitude,
            surface_altitude: altitude,
            vertical_speed: -speed,
            horizontal_speed: 0.0,
            speed,
            latitude: 0.0,
            longitude: 0.0,
            heading: 0.0,
            situation: VehicleSituation::Flying,
        }
    }

    #[test]
    fn test_format_time() {
        assert_eq!(FlightRecorder::format_time(12.346), "12.35s");
        assert_eq!(FlightRecorder::format_time(75.0), "1m 15.00s");
        assert_eq!(FlightRecorder::format_time(3_725.5), "1h 2m 5.50s");
    }

    #[test]
    fn test_format_altitude() {
        assert_eq!(FlightRecorder::format_altitude(950.0), "950.00 m");
        assert_eq!(FlightRecorder::format_altitude(12_500.0), "12.50 km");
    }

    #[test]
    fn test_tracks_extremes_and_program_changes() {
        let mut recorder = FlightRecorder::new();
        recorder.record("Descend", &snapshot(100.0, 2_000.0, 80.0, 3_000.0), &StepResult::running(vec![]));
        recorder.record("Descend", &snapshot(101.0, 1_900.0, 90.0, 2_990.0), &StepResult::finished(vec![]));
        recorder.mark("Staged", 101.5);
        recorder.record("SoftLanding", &snapshot(102.0, 1_800.0, 9.0, 2_980.0), &StepResult::running(vec![]));

        assert_eq!(recorder.max_speed(), 90.0);
        assert_eq!(recorder.max_altitude(), 2_000.0);
        assert_eq!(recorder.log.len(), 3);
        let events: Vec<&str> = recorder.events().iter().map(|(e, _)| e.as_str()).collect();
        assert_eq!(
            events,
            vec!["Descend started", "Descend finished", "Staged", "SoftLanding started"]
        );
        assert_eq!(recorder.events()[3].1, 2.0);
        assert!(recorder.summary().iter().any(|line| line == "Min Mass: 2980.00 kg"));
    }
}
