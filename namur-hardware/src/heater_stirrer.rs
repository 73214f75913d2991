//! Heater-stirrer facade
//!
//! Holds the last commanded stir speed and temperature setpoint, translates
//! facade calls into NAMUR commands, and sequences the timed stir-then-settle
//! action. Serial exchanges block, so each one runs on tokio's blocking pool
//! while the caller's task awaits it.

use crate::serial_driver::{NamurClient, NamurTransport};
use namur_core::{
    coerce_rpm, truncate_whole, DeviceStatus, NamurError, Result, SerialSettings, StirParams,
    VesselRef, DEFAULT_TEMP_TARGET,
};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Convert coerced seconds to a sleep duration, saturating at `Duration::MAX`
fn wait_duration(seconds: f64) -> Duration {
    Duration::try_from_secs_f64(seconds).unwrap_or(Duration::MAX)
}

/// Heater-stirrer device facade
///
/// Generic over the transport, allowing the real `NamurClient` or mock
/// transports for testing. The transport sits behind a mutex that is held for
/// a whole multi-command exchange, so two exchanges never interleave on the
/// wire.
pub struct HeaterStirrer<T: NamurTransport = NamurClient> {
    transport: Arc<Mutex<T>>,
    stir_speed: f64,
    temp_target: f64,
}

impl HeaterStirrer<NamurClient> {
    /// Open the serial port described by `settings` and wrap it in a facade
    pub async fn connect(settings: SerialSettings) -> Result<Self> {
        settings.validate()?;
        info!(
            "Connecting to heater-stirrer on {} @ {} baud",
            settings.port, settings.baud_rate
        );

        let stirrer = Self::with_transport(NamurClient::new(settings));
        stirrer.exchange(|t| t.open()).await?;
        Ok(stirrer)
    }
}

impl<T: NamurTransport> HeaterStirrer<T> {
    /// Create a facade over an existing transport
    pub fn with_transport(transport: T) -> Self {
        Self {
            transport: Arc::new(Mutex::new(transport)),
            stir_speed: 0.0,
            temp_target: DEFAULT_TEMP_TARGET,
        }
    }

    /// Run a blocking exchange on the worker pool, holding the transport for its duration
    async fn exchange<R, F>(&self, op: F) -> Result<R>
    where
        F: FnOnce(&mut T) -> Result<R> + Send + 'static,
        R: Send + 'static,
    {
        let transport = Arc::clone(&self.transport);
        tokio::task::spawn_blocking(move || {
            let mut guard = transport.blocking_lock();
            op(&mut *guard)
        })
        .await
        .map_err(|e| NamurError::Worker(e.to_string()))?
    }

    /// "Idle" when the commanded speed is zero, "Running" otherwise
    pub fn status(&self) -> DeviceStatus {
        DeviceStatus::from_speed(self.stir_speed)
    }

    /// Last commanded stir speed in RPM
    pub fn stir_speed(&self) -> f64 {
        self.stir_speed
    }

    /// Last commanded temperature setpoint
    pub fn temp_target(&self) -> f64 {
        self.temp_target
    }

    /// Current temperature
    ///
    /// Note: the protocol subset in use cannot read the measured temperature.
    /// This returns the last setpoint.
    pub fn temp(&self) -> f64 {
        self.temp_target
    }

    /// Set the stir speed; a positive speed starts the motor, anything else stops it
    ///
    /// The stored speed is only updated once the commands were written.
    pub async fn set_stir_speed(&mut self, speed: f64) -> Result<()> {
        let rpm = truncate_whole(speed);

        self.exchange(move |t| {
            t.set_speed(rpm)?;
            if rpm > 0 {
                t.start()?;
            } else {
                t.stop()?;
            }
            Ok(())
        })
        .await?;

        self.stir_speed = rpm as f64;
        debug!("Stir speed set to {} rpm ({})", rpm, self.status());
        Ok(())
    }

    /// Set the temperature setpoint and enable heating
    ///
    /// NaN and infinities are sent and stored as 0.
    pub async fn set_temp_target(&mut self, temp: f64) -> Result<()> {
        let temp = if temp.is_finite() { temp } else { 0.0 };
        let degrees = truncate_whole(temp);

        self.exchange(move |t| {
            t.set_temperature(degrees)?;
            t.start_heating()?;
            Ok(())
        })
        .await?;

        self.temp_target = temp;
        debug!("Temperature setpoint set to {}", temp);
        Ok(())
    }

    /// Start continuous stirring
    ///
    /// Returns `true` once the commands were dispatched. Transport failures
    /// are returned as errors. A non-numeric speed stirs at 0, i.e. stops.
    pub async fn start_stir(
        &mut self,
        vessel: &VesselRef,
        stir_speed: &Value,
        purpose: &str,
    ) -> Result<bool> {
        let vessel_id = vessel.id();
        let rpm = coerce_rpm(stir_speed);
        info!(
            "start_stir: vessel={:?} speed={} rpm purpose={:?}",
            vessel_id, rpm, purpose
        );

        self.set_stir_speed(rpm as f64).await?;
        Ok(true)
    }

    /// Stop stirring
    pub async fn stop_stir(&mut self, vessel: &VesselRef) -> Result<bool> {
        info!("stop_stir: vessel={:?}", vessel.id());

        self.set_stir_speed(0.0).await?;
        Ok(true)
    }

    /// Stir for `stir_time` seconds, stop, then wait `settling_time` seconds
    ///
    /// The motor is always stopped after the stirring phase, even when the
    /// requested speed was 0. Extra fields in `params` are ignored.
    pub async fn stir(&mut self, params: &StirParams) -> Result<bool> {
        let stir_seconds = params.stir_seconds();
        let rpm = params.speed_rpm();
        let settle_seconds = params.settle_seconds();
        info!(
            "stir: {} rpm for {}s, settle {}s",
            rpm, stir_seconds, settle_seconds
        );

        self.set_stir_speed(rpm as f64).await?;
        if stir_seconds > 0.0 {
            tokio::time::sleep(wait_duration(stir_seconds)).await;
        }

        self.set_stir_speed(0.0).await?;
        if settle_seconds > 0.0 {
            tokio::time::sleep(wait_duration(settle_seconds)).await;
        }

        debug!("stir sequence complete");
        Ok(true)
    }

    /// Query the device identity string
    pub async fn read_name(&self) -> Result<String> {
        self.exchange(|t| t.read_name()).await
    }

    /// Query the measured stirring speed
    pub async fn read_speed(&self) -> Result<String> {
        self.exchange(|t| t.read_speed()).await
    }

    /// Query the commanded stirring speed
    pub async fn read_speed_setpoint(&self) -> Result<String> {
        self.exchange(|t| t.read_speed_setpoint()).await
    }

    /// Send an arbitrary command line and return the raw reply
    ///
    /// Bypasses the stored state: a raw `OUT_SP_4` does not update `stir_speed`.
    pub async fn send(&self, tokens: Vec<String>) -> Result<String> {
        self.exchange(move |t| {
            let refs: Vec<&str> = tokens.iter().map(String::as_str).collect();
            t.send(&refs)
        })
        .await
    }

    /// Release the serial session; a later command reopens it
    pub async fn close(&self) -> Result<()> {
        self.exchange(|t| {
            t.close();
            Ok(())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serial_driver::tests::{fast_settings, ScriptedOpener};
    use serde_json::json;
    use tokio::time::Instant;

    /// Mock transport recording the command lines it is asked to send
    #[derive(Default)]
    struct MockTransport {
        sent: Vec<String>,
        open: bool,
        /// Fail every send once this many lines were recorded
        fail_after: Option<usize>,
    }

    impl MockTransport {
        fn failing_after(count: usize) -> Self {
            Self {
                fail_after: Some(count),
                ..Default::default()
            }
        }
    }

    impl NamurTransport for MockTransport {
        fn open(&mut self) -> Result<()> {
            self.open = true;
            Ok(())
        }

        fn close(&mut self) {
            self.open = false;
        }

        fn is_open(&self) -> bool {
            self.open
        }

        fn send(&mut self, tokens: &[&str]) -> Result<String> {
            if self.fail_after.is_some_and(|n| self.sent.len() >= n) {
                return Err(NamurError::Io(std::io::Error::new(
                    std::io::ErrorKind::TimedOut,
                    "write timed out",
                )));
            }
            self.open = true;
            self.sent.push(tokens.join(" ").to_uppercase());
            Ok(String::new())
        }
    }

    fn create_mock_stirrer() -> HeaterStirrer<MockTransport> {
        HeaterStirrer::with_transport(MockTransport::default())
    }

    async fn sent_lines(stirrer: &HeaterStirrer<MockTransport>) -> Vec<String> {
        stirrer.transport.lock().await.sent.clone()
    }

    #[tokio::test]
    async fn test_initial_state() {
        let stirrer = create_mock_stirrer();

        assert_eq!(stirrer.stir_speed(), 0.0);
        assert_eq!(stirrer.temp_target(), 20.0);
        assert_eq!(stirrer.temp(), 20.0);
        assert_eq!(stirrer.status(), DeviceStatus::Idle);
    }

    #[tokio::test]
    async fn test_set_stir_speed_positive_starts_motor() {
        let mut stirrer = create_mock_stirrer();

        stirrer.set_stir_speed(300.7).await.unwrap();

        assert_eq!(sent_lines(&stirrer).await, vec!["OUT_SP_4 300", "START_4"]);
        assert_eq!(stirrer.stir_speed(), 300.0);
        assert_eq!(stirrer.status(), DeviceStatus::Running);
    }

    #[tokio::test]
    async fn test_set_stir_speed_zero_stops_motor() {
        let mut stirrer = create_mock_stirrer();

        stirrer.set_stir_speed(250.0).await.unwrap();
        stirrer.set_stir_speed(0.0).await.unwrap();

        assert_eq!(
            sent_lines(&stirrer).await,
            vec!["OUT_SP_4 250", "START_4", "OUT_SP_4 0", "STOP_4"]
        );
        assert_eq!(stirrer.status(), DeviceStatus::Idle);
    }

    #[tokio::test]
    async fn test_set_stir_speed_fraction_below_one_stops() {
        let mut stirrer = create_mock_stirrer();

        stirrer.set_stir_speed(0.9).await.unwrap();

        assert_eq!(sent_lines(&stirrer).await, vec!["OUT_SP_4 0", "STOP_4"]);
        assert_eq!(stirrer.stir_speed(), 0.0);
        assert_eq!(stirrer.status(), DeviceStatus::Idle);
    }

    #[tokio::test]
    async fn test_status_tracks_every_speed_change() {
        let mut stirrer = create_mock_stirrer();

        for speed in [100.0, 0.0, 1500.0, 5.0, 0.0] {
            stirrer.set_stir_speed(speed).await.unwrap();
            let expected = if speed == 0.0 {
                DeviceStatus::Idle
            } else {
                DeviceStatus::Running
            };
            assert_eq!(stirrer.status(), expected);
        }
    }

    #[tokio::test]
    async fn test_set_temp_target() {
        let mut stirrer = create_mock_stirrer();

        stirrer.set_temp_target(65.5).await.unwrap();

        assert_eq!(sent_lines(&stirrer).await, vec!["OUT_SP_1 65", "START_1"]);
        assert_eq!(stirrer.temp_target(), 65.5);
        assert_eq!(stirrer.temp(), 65.5);
    }

    #[tokio::test]
    async fn test_set_temp_target_non_finite_stores_zero() {
        let mut stirrer = create_mock_stirrer();

        stirrer.set_temp_target(f64::NAN).await.unwrap();
        assert_eq!(stirrer.temp_target(), 0.0);
        assert_eq!(stirrer.temp(), 0.0);

        stirrer.set_temp_target(f64::INFINITY).await.unwrap();
        assert_eq!(stirrer.temp_target(), 0.0);

        assert_eq!(
            sent_lines(&stirrer).await,
            vec!["OUT_SP_1 0", "START_1", "OUT_SP_1 0", "START_1"]
        );
    }

    #[tokio::test]
    async fn test_failed_exchange_leaves_state_unchanged() {
        let mut stirrer = HeaterStirrer::with_transport(MockTransport::failing_after(2));

        stirrer.set_stir_speed(400.0).await.unwrap();
        let result = stirrer.set_stir_speed(800.0).await;
        assert!(result.unwrap_err().is_io_error());
        assert_eq!(stirrer.stir_speed(), 400.0);

        let result = stirrer.set_temp_target(90.0).await;
        assert!(result.is_err());
        assert_eq!(stirrer.temp_target(), 20.0);
    }

    #[tokio::test]
    async fn test_failure_between_commands_leaves_state_unchanged() {
        // set_speed goes out, start fails
        let mut stirrer = HeaterStirrer::with_transport(MockTransport::failing_after(1));

        let result = stirrer.set_stir_speed(200.0).await;

        assert!(result.is_err());
        assert_eq!(stirrer.stir_speed(), 0.0);
        assert_eq!(sent_lines(&stirrer).await, vec!["OUT_SP_4 200"]);
    }

    #[tokio::test]
    async fn test_write_failure_through_client_is_io_error() {
        let opener = ScriptedOpener::default();
        let state = Arc::clone(&opener.state);
        let client = NamurClient::with_opener(fast_settings(), opener);
        let mut stirrer = HeaterStirrer::with_transport(client);

        stirrer.set_stir_speed(150.0).await.unwrap();
        state.lock().unwrap().fail_writes = true;

        let err = stirrer.set_stir_speed(600.0).await.unwrap_err();

        assert!(err.is_io_error());
        assert_eq!(stirrer.stir_speed(), 150.0);
        assert_eq!(stirrer.status(), DeviceStatus::Running);
    }

    #[tokio::test]
    async fn test_start_stir_plain_vessel() {
        let mut stirrer = create_mock_stirrer();

        let ok = stirrer
            .start_stir(&VesselRef::from("flask_1"), &json!(350), "dissolve")
            .await
            .unwrap();

        assert!(ok);
        assert_eq!(sent_lines(&stirrer).await, vec!["OUT_SP_4 350", "START_4"]);
        assert_eq!(stirrer.stir_speed(), 350.0);
    }

    #[tokio::test]
    async fn test_start_stir_bad_speed_stops() {
        let mut stirrer = create_mock_stirrer();
        let vessel = VesselRef::from(json!({"id": "v1"}));

        let ok = stirrer.start_stir(&vessel, &json!("bad"), "").await.unwrap();

        assert!(ok);
        assert_eq!(sent_lines(&stirrer).await, vec!["OUT_SP_4 0", "STOP_4"]);
        assert_eq!(stirrer.status(), DeviceStatus::Idle);
    }

    #[tokio::test]
    async fn test_start_stir_error_propagates() {
        let mut stirrer = HeaterStirrer::with_transport(MockTransport::failing_after(0));

        let result = stirrer
            .start_stir(&VesselRef::from("v1"), &json!(100), "")
            .await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_stop_stir() {
        let mut stirrer = create_mock_stirrer();
        stirrer.set_stir_speed(500.0).await.unwrap();

        let ok = stirrer
            .stop_stir(&VesselRef::from(json!({"name": "no id"})))
            .await
            .unwrap();

        assert!(ok);
        assert_eq!(
            sent_lines(&stirrer).await,
            vec!["OUT_SP_4 500", "START_4", "OUT_SP_4 0", "STOP_4"]
        );
        assert_eq!(stirrer.stir_speed(), 0.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stir_timed_sequence() {
        let mut stirrer = create_mock_stirrer();

        let started = Instant::now();
        let ok = stirrer.stir(&StirParams::new(5, 100, 3)).await.unwrap();

        assert!(ok);
        assert!(started.elapsed() >= Duration::from_secs(8));
        assert_eq!(
            sent_lines(&stirrer).await,
            vec!["OUT_SP_4 100", "START_4", "OUT_SP_4 0", "STOP_4"]
        );
        assert_eq!(stirrer.status(), DeviceStatus::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stir_zero_everything() {
        let mut stirrer = create_mock_stirrer();

        let started = Instant::now();
        let ok = stirrer.stir(&StirParams::new(0, 0, 0)).await.unwrap();

        assert!(ok);
        assert!(started.elapsed() < Duration::from_secs(1));
        assert_eq!(
            sent_lines(&stirrer).await,
            vec!["OUT_SP_4 0", "STOP_4", "OUT_SP_4 0", "STOP_4"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_stir_clamps_bad_durations() {
        let mut stirrer = create_mock_stirrer();

        let started = Instant::now();
        let ok = stirrer
            .stir(&StirParams::new(-10, "200", "later"))
            .await
            .unwrap();

        assert!(ok);
        assert!(started.elapsed() < Duration::from_secs(1));
        assert_eq!(
            sent_lines(&stirrer).await,
            vec!["OUT_SP_4 200", "START_4", "OUT_SP_4 0", "STOP_4"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_stir_ignores_extra_fields() {
        let mut stirrer = create_mock_stirrer();
        let params: StirParams = serde_json::from_value(json!({
            "stir_time": 2,
            "stir_speed": 120,
            "settling_time": 0,
            "vessel": {"id": "v2"},
            "time": 999,
            "event": "start"
        }))
        .unwrap();

        let started = Instant::now();
        stirrer.stir(&params).await.unwrap();

        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(2));
        assert!(elapsed < Duration::from_secs(3));
    }

    #[test]
    fn test_wait_duration_saturates() {
        assert_eq!(wait_duration(1.5), Duration::from_millis(1500));
        assert_eq!(wait_duration(1e30), Duration::MAX);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stir_huge_duration_keeps_waiting() {
        let mut stirrer = create_mock_stirrer();

        let result = tokio::time::timeout(
            Duration::from_secs(3600),
            stirrer.stir(&StirParams::new("1e30", 100, 0)),
        )
        .await;

        // Still in the stirring phase an hour later
        assert!(result.is_err());
        assert_eq!(sent_lines(&stirrer).await, vec!["OUT_SP_4 100", "START_4"]);
        assert_eq!(stirrer.status(), DeviceStatus::Running);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stir_huge_settle_stops_first() {
        let mut stirrer = create_mock_stirrer();

        let result = tokio::time::timeout(
            Duration::from_secs(3600),
            stirrer.stir(&StirParams::new(1, 100, 1e300)),
        )
        .await;

        assert!(result.is_err());
        assert_eq!(
            sent_lines(&stirrer).await,
            vec!["OUT_SP_4 100", "START_4", "OUT_SP_4 0", "STOP_4"]
        );
        assert_eq!(stirrer.status(), DeviceStatus::Idle);
    }

    #[tokio::test]
    async fn test_stir_failure_propagates() {
        let mut stirrer = HeaterStirrer::with_transport(MockTransport::failing_after(0));

        let result = stirrer.stir(&StirParams::new(0, 100, 0)).await;

        assert!(result.is_err());
        assert_eq!(stirrer.stir_speed(), 0.0);
    }

    #[tokio::test]
    async fn test_raw_send_and_close() {
        let stirrer = create_mock_stirrer();

        stirrer.send(vec!["in_pv_4".to_string()]).await.unwrap();
        assert!(stirrer.transport.lock().await.is_open());

        stirrer.close().await.unwrap();

        assert!(!stirrer.transport.lock().await.is_open());
        assert_eq!(sent_lines(&stirrer).await, vec!["IN_PV_4"]);
        // Raw commands do not touch the stored state
        assert_eq!(stirrer.stir_speed(), 0.0);
    }

    #[tokio::test]
    async fn test_queries_pass_through() {
        let stirrer = create_mock_stirrer();

        stirrer.read_name().await.unwrap();
        stirrer.read_speed().await.unwrap();
        stirrer.read_speed_setpoint().await.unwrap();

        assert_eq!(
            sent_lines(&stirrer).await,
            vec!["IN_NAME", "IN_PV_4", "IN_SP_4"]
        );
    }
}
