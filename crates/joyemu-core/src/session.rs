//! Protocol engine - the reader, writer and bootstrap threads for one
//! connection.

use std::marker::PhantomData;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::Result;
use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, info, instrument, trace, warn};

use crate::events::{EngineEvent, EngineObserver, ReportSource, TracingObserver, format_mac};
use crate::protocol::{InputReport, MAC_LEN, OutputReport, OutputReportId, READ_BUFFER_LEN, ReportError};
use crate::queue::{DEFAULT_QUEUE_CAPACITY, EnqueuePolicy, ReportQueue, ReportReceiver, report_queue};
use crate::state::handlers::{HandlerContext, enqueue_report, handle_subcommand};
use crate::state::machine::{ElapsedTimer, ProtocolState, SharedFlags, StateSnapshot, TimerMode};
use crate::transport::{FdTransport, ReportTransport, TransportError};

/// Configuration for a protocol engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Delay before the unsolicited handshake report.
    pub bootstrap_delay_ms: u64,
    /// Maximum number of pending input reports.
    pub queue_capacity: usize,
    /// Give up on a full queue after this long. Unset blocks indefinitely.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enqueue_timeout_ms: Option<u64>,
    /// Length of one timer tick.
    pub tick_unit_ns: u64,
    pub timer_mode: TimerMode,
    /// Upper bound on one readiness wait after a would-block read.
    pub read_poll_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            bootstrap_delay_ms: 1000,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            enqueue_timeout_ms: None,
            tick_unit_ns: 4,
            timer_mode: TimerMode::Derived,
            read_poll_ms: 100,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("queue_capacity must be at least 1")]
    ZeroQueueCapacity,

    #[error("tick_unit_ns must be at least 1")]
    ZeroTickUnit,
}

impl EngineConfig {
    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: EngineConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<std::path::Path>>(&self, path: P) -> Result<()> {
        std::fs::write(path, self.to_toml()?)?;
        Ok(())
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.queue_capacity == 0 {
            return Err(ConfigError::ZeroQueueCapacity);
        }
        if self.tick_unit_ns == 0 {
            return Err(ConfigError::ZeroTickUnit);
        }
        Ok(())
    }

    pub fn enqueue_policy(&self) -> EnqueuePolicy {
        match self.enqueue_timeout_ms {
            Some(ms) => EnqueuePolicy::Timeout(Duration::from_millis(ms)),
            None => EnqueuePolicy::Block,
        }
    }

    pub fn bootstrap_delay(&self) -> Duration {
        Duration::from_millis(self.bootstrap_delay_ms)
    }

    pub fn tick_unit(&self) -> Duration {
        Duration::from_nanos(self.tick_unit_ns)
    }

    pub fn read_poll(&self) -> Duration {
        Duration::from_millis(self.read_poll_ms)
    }
}

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("Failed to spawn {name} thread: {source}")]
    Spawn {
        name: &'static str,
        #[source]
        source: std::io::Error,
    },
}

/// Why the output reader stopped. It never restarts on its own.
#[derive(Debug)]
pub enum ReaderExit {
    /// Empty, short or malformed frame; a standard report was queued.
    Resync(ReportError),
    /// Any other read failure.
    Fatal(TransportError),
}

impl ReaderExit {
    pub fn is_resync(&self) -> bool {
        matches!(self, ReaderExit::Resync(_))
    }
}

/// Read output reports until a framing error or a fatal read error.
pub fn run_reader<T, O>(
    transport: &T,
    state: &mut ProtocolState,
    queue: &ReportQueue,
    observer: &O,
    read_poll: Duration,
) -> ReaderExit
where
    T: ReportTransport + ?Sized,
    O: EngineObserver,
{
    let mut buf = [0u8; READ_BUFFER_LEN];

    loop {
        let len = match transport.read(&mut buf) {
            Ok(len) => len,
            Err(TransportError::WouldBlock) => match transport.wait_readable(read_poll) {
                Ok(()) => continue,
                Err(e) => return stop_fatal(observer, e),
            },
            Err(e) => return stop_fatal(observer, e),
        };

        let report = match OutputReport::from_bytes(&buf[..len]) {
            Ok(report) => report,
            Err(e) => {
                warn!(error = %e, "Bad output report, resynchronising");
                let reset = InputReport::standard_full(state.motion_sensor_enabled());
                enqueue_report(queue, observer, reset, ReportSource::Resync);
                observer.on_event(&EngineEvent::ReaderStopped {
                    reason: e.to_string(),
                    resync: true,
                });
                return ReaderExit::Resync(e);
            }
        };

        state.mark_report_received();
        trace!(report = %report, "Output report read");
        observer.on_event(&EngineEvent::ReportReceived {
            report_id: report.report_id(),
            subcommand: report.subcommand(),
        });

        match report.report_id() {
            OutputReportId::RumbleAndSubcommand => {
                let mut ctx = HandlerContext {
                    state: &mut *state,
                    queue,
                    observer,
                };
                handle_subcommand(&report, &mut ctx);
            }
            OutputReportId::UpdateNfcPacket
            | OutputReportId::RumbleOnly
            | OutputReportId::RequestNfcData => {}
            OutputReportId::Other(id) => {
                debug!(id = %format!("0x{:02X}", id), "Ignoring output report");
            }
        }
    }
}

fn stop_fatal<O: EngineObserver>(observer: &O, e: TransportError) -> ReaderExit {
    error!(error = %e, "Error reading output report");
    observer.on_event(&EngineEvent::ReaderStopped {
        reason: e.to_string(),
        resync: false,
    });
    ReaderExit::Fatal(e)
}

/// Drain the queue onto the channel until every producer is gone.
///
/// Failed writes are logged and dropped.
pub fn run_writer<T, O>(transport: &T, rx: ReportReceiver, observer: &O)
where
    T: ReportTransport + ?Sized,
    O: EngineObserver,
{
    while let Some(report) = rx.pop() {
        let report_id = report.report_id();
        match transport.write(report.as_bytes()) {
            Ok(length) => {
                debug!(report = %report, "Input report written");
                observer.on_event(&EngineEvent::ReportWritten { report_id, length });
            }
            Err(e) => {
                error!(error = %e, "Error writing input report");
                observer.on_event(&EngineEvent::WriteFailed {
                    report_id,
                    message: e.to_string(),
                });
            }
        }
    }
    debug!("Report queue closed, writer exiting");
}

/// Wait `delay`, then queue one standard report to start the handshake.
///
/// Gives up without queuing anything if `cancel` is signalled or its sender
/// is dropped first.
pub fn run_bootstrap<O: EngineObserver>(
    delay: Duration,
    cancel: &Receiver<()>,
    flags: &SharedFlags,
    queue: &ReportQueue,
    observer: &O,
) {
    match cancel.recv_timeout(delay) {
        Err(RecvTimeoutError::Timeout) => {}
        Ok(()) | Err(RecvTimeoutError::Disconnected) => {
            debug!("Bootstrap cancelled");
            return;
        }
    }
    let report = InputReport::standard_full(flags.motion_sensor_enabled());
    if enqueue_report(queue, observer, report, ReportSource::Bootstrap) {
        info!("Handshake report queued");
    }
}

/// Snapshot of a running engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineStatus {
    pub state: StateSnapshot,
    /// Reports waiting for the writer.
    pub queued: usize,
    pub reader_running: bool,
}

/// One emulated controller connection.
///
/// Dropping the engine detaches its threads. The engine keeps a queue
/// sender, so the writer and the interrupt channel stay alive until
/// [`ProtocolEngine::drain`] is called or the engine is dropped.
pub struct ProtocolEngine<O: EngineObserver> {
    flags: Arc<SharedFlags>,
    queue: Option<ReportQueue>,
    reader: Option<JoinHandle<ReaderExit>>,
    writer: Option<JoinHandle<()>>,
    bootstrap: Option<JoinHandle<()>>,
    cancel_bootstrap: Option<Sender<()>>,
    // Held for the lifetime of the connection; the protocol never reads it.
    _control: Option<FdTransport>,
    _observer: PhantomData<O>,
}

impl ProtocolEngine<TracingObserver> {
    /// Take over both HID channels and start the engine with a logging
    /// observer.
    pub fn setup(
        interrupt: FdTransport,
        control: FdTransport,
        mac_address: [u8; MAC_LEN],
        config: EngineConfig,
    ) -> Result<Self, EngineError> {
        Self::setup_with_observer(interrupt, control, mac_address, config, Arc::new(TracingObserver))
    }
}

impl<O: EngineObserver + 'static> ProtocolEngine<O> {
    /// Like [`ProtocolEngine::setup`] with a custom observer.
    #[instrument(skip_all, fields(mac = %format_mac(&mac_address)))]
    pub fn setup_with_observer(
        interrupt: FdTransport,
        control: FdTransport,
        mac_address: [u8; MAC_LEN],
        config: EngineConfig,
        observer: Arc<O>,
    ) -> Result<Self, EngineError> {
        interrupt.set_nonblocking()?;
        Self::start(interrupt, Some(control), mac_address, config, observer)
    }

    /// Start the three threads over any transport.
    ///
    /// `interrupt` must already return `WouldBlock` instead of blocking.
    pub fn start<T: ReportTransport + 'static>(
        interrupt: T,
        control: Option<FdTransport>,
        mac_address: [u8; MAC_LEN],
        config: EngineConfig,
        observer: Arc<O>,
    ) -> Result<Self, EngineError> {
        config.validate()?;

        let transport = Arc::new(interrupt);
        let (queue, rx) = report_queue(config.queue_capacity, config.enqueue_policy());
        let mut state = ProtocolState::new(
            mac_address,
            ElapsedTimer::new(config.tick_unit(), config.timer_mode),
        );
        let flags = state.shared();

        let writer = {
            let transport = Arc::clone(&transport);
            let observer = Arc::clone(&observer);
            move || run_writer(transport.as_ref(), rx, observer.as_ref())
        };
        let writer = spawn("writer", writer)?;

        let reader = {
            let transport = Arc::clone(&transport);
            let observer = Arc::clone(&observer);
            let queue = queue.clone();
            let read_poll = config.read_poll();
            move || run_reader(transport.as_ref(), &mut state, &queue, observer.as_ref(), read_poll)
        };
        let reader = spawn("reader", reader)?;

        let (cancel_bootstrap, cancel) = channel::bounded::<()>(1);
        let bootstrap = {
            let flags = Arc::clone(&flags);
            let observer = Arc::clone(&observer);
            let queue = queue.clone();
            let delay = config.bootstrap_delay();
            move || run_bootstrap(delay, &cancel, &flags, &queue, observer.as_ref())
        };
        let bootstrap = spawn("bootstrap", bootstrap)?;

        info!(
            mac = %format_mac(&mac_address),
            capacity = config.queue_capacity,
            timer = %config.timer_mode,
            "Protocol engine started"
        );
        observer.on_event(&EngineEvent::Started { mac: mac_address });

        Ok(Self {
            flags,
            queue: Some(queue),
            reader: Some(reader),
            writer: Some(writer),
            bootstrap: Some(bootstrap),
            cancel_bootstrap: Some(cancel_bootstrap),
            _control: control,
            _observer: PhantomData,
        })
    }

    pub fn state(&self) -> StateSnapshot {
        self.flags.snapshot()
    }

    pub fn status(&self) -> EngineStatus {
        EngineStatus {
            state: self.state(),
            queued: self.queue.as_ref().map_or(0, ReportQueue::len),
            reader_running: !self.is_reader_finished(),
        }
    }

    pub fn is_reader_finished(&self) -> bool {
        self.reader.as_ref().is_none_or(|h| h.is_finished())
    }

    /// Block until the reader stops. Returns `None` if already waited on.
    pub fn wait(&mut self) -> Option<ReaderExit> {
        let handle = self.reader.take()?;
        match handle.join() {
            Ok(exit) => Some(exit),
            Err(_) => {
                error!("Reader thread panicked");
                None
            }
        }
    }

    /// Wait for the reader to stop, then flush every queued report to the
    /// channel and join the writer.
    ///
    /// A pending handshake report is abandoned. Once this returns the
    /// interrupt channel has been released. Returns the reader's exit
    /// unless [`ProtocolEngine::wait`] already took it.
    pub fn drain(&mut self) -> Option<ReaderExit> {
        let exit = self.wait();

        if let Some(cancel) = self.cancel_bootstrap.take() {
            // A full slot means a cancel is already pending.
            let _ = cancel.try_send(());
        }
        if let Some(handle) = self.bootstrap.take()
            && handle.join().is_err()
        {
            error!("Bootstrap thread panicked");
        }

        // Last sender gone: the writer empties the queue and returns.
        self.queue = None;
        if let Some(handle) = self.writer.take() {
            if handle.join().is_err() {
                error!("Writer thread panicked");
            } else {
                debug!("Writer drained");
            }
        }
        exit
    }
}

fn spawn<F, R>(name: &'static str, f: F) -> Result<JoinHandle<R>, EngineError>
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    thread::Builder::new()
        .name(format!("joyemu-{}", name))
        .spawn(f)
        .map_err(|source| EngineError::Spawn { name, source })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::RecordingObserver;
    use crate::protocol::*;
    use crate::transport::{MockRead, MockTransport};

    const MAC: [u8; 6] = [0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF];

    fn parts() -> (ProtocolState, ReportQueue, ReportReceiver, RecordingObserver) {
        let (queue, rx) = report_queue(DEFAULT_QUEUE_CAPACITY, EnqueuePolicy::Block);
        let state = ProtocolState::new(MAC, ElapsedTimer::new(Duration::from_nanos(4), TimerMode::Derived));
        (state, queue, rx, RecordingObserver::new())
    }

    #[test]
    fn test_config_defaults_round_trip() {
        let config = EngineConfig::default();
        assert_eq!(config.queue_capacity, 5);
        assert_eq!(config.bootstrap_delay(), Duration::from_secs(1));
        assert_eq!(config.enqueue_policy(), EnqueuePolicy::Block);

        let parsed: EngineConfig = toml::from_str(&config.to_toml().unwrap()).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_config_partial_file() {
        let config: EngineConfig =
            toml::from_str("enqueue_timeout_ms = 250\ntimer_mode = \"saturated\"\n").unwrap();
        assert_eq!(config.timer_mode, TimerMode::Saturated);
        assert_eq!(config.enqueue_policy(), EnqueuePolicy::Timeout(Duration::from_millis(250)));
        assert_eq!(config.queue_capacity, DEFAULT_QUEUE_CAPACITY);
    }

    #[test]
    fn test_config_validation() {
        let config = EngineConfig {
            queue_capacity: 0,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::ZeroQueueCapacity));

        let config = EngineConfig {
            tick_unit_ns: 0,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::ZeroTickUnit));
    }

    #[test]
    fn test_reader_resyncs_on_bad_frame() {
        let (mut state, queue, rx, observer) = parts();
        let mock = MockTransport::new();
        mock.queue_read(MockRead::WouldBlock);
        mock.queue_frame(&[0x00; 20]);
        mock.queue_frame(OutputReport::rumble_and_subcommand(0, SUBCMD_ENABLE_IMU, &[1]).as_bytes());

        let exit = run_reader(&mock, &mut state, &queue, &observer, Duration::ZERO);
        assert!(exit.is_resync());
        assert_eq!(mock.read_count(), 2);
        assert_eq!(mock.pending_reads(), 1);

        let report = rx.try_pop().unwrap();
        assert_eq!(report.report_id(), REPORT_STANDARD_FULL);
        assert!(rx.try_pop().is_none());
        assert!(!state.report_received());
    }

    #[test]
    fn test_reader_stops_on_read_error() {
        let (mut state, queue, rx, observer) = parts();
        let mock = MockTransport::new();
        mock.queue_frame(OutputReport::with_id(OUTPUT_RUMBLE_ONLY, 1).as_bytes());
        mock.queue_read(MockRead::Fail("gone".into()));

        let exit = run_reader(&mock, &mut state, &queue, &observer, Duration::ZERO);
        assert!(matches!(exit, ReaderExit::Fatal(TransportError::ReadFailed(_))));
        assert!(state.report_received());
        // Rumble-only reports are not answered.
        assert!(rx.try_pop().is_none());
        assert!(observer.events().contains(&EngineEvent::ReaderStopped {
            reason: "Read failed: gone".into(),
            resync: false,
        }));
    }

    #[test]
    fn test_reader_dispatches_subcommands() {
        let (mut state, queue, rx, observer) = parts();
        let mock = MockTransport::new();
        mock.queue_frame(
            OutputReport::rumble_and_subcommand(0, SUBCMD_REQUEST_DEVICE_INFO, &[]).as_bytes(),
        );
        mock.queue_frame(OutputReport::with_id(0x7F, 0).as_bytes());
        mock.queue_read(MockRead::Disconnect);

        let exit = run_reader(&mock, &mut state, &queue, &observer, Duration::ZERO);
        assert!(matches!(exit, ReaderExit::Fatal(TransportError::Disconnected)));

        let reply = rx.try_pop().unwrap();
        assert_eq!(reply.subcommand_id(), Some(SUBCMD_REQUEST_DEVICE_INFO));
        assert!(rx.try_pop().is_none());
        assert!(state.device_info_requested());
    }

    #[test]
    fn test_writer_continues_after_failure() {
        let (_state, queue, rx, observer) = parts();
        let mock = MockTransport::new();
        mock.fail_next_writes(1);

        queue.push(InputReport::standard(REPORT_STANDARD_FULL)).unwrap();
        queue.push(InputReport::standard(REPORT_SUBCOMMAND_REPLY)).unwrap();
        drop(queue);

        run_writer(&mock, rx, &observer);

        let writes = mock.get_writes();
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0][1], REPORT_SUBCOMMAND_REPLY);
        assert!(matches!(
            observer.events()[0],
            EngineEvent::WriteFailed {
                report_id: REPORT_STANDARD_FULL,
                ..
            }
        ));
    }

    #[test]
    fn test_bootstrap_uses_motion_flag() {
        let (mut state, queue, rx, observer) = parts();
        state.apply_enable_imu(1);

        let (_cancel_tx, cancel) = channel::bounded::<()>(1);
        run_bootstrap(Duration::ZERO, &cancel, &state.shared(), &queue, &observer);

        let report = rx.try_pop().unwrap();
        assert_eq!(report.report_id(), REPORT_STANDARD_FULL);
        assert!(report.imu_data().iter().any(|&b| b != 0));
        assert_eq!(
            observer.events(),
            vec![EngineEvent::ReportQueued {
                report_id: REPORT_STANDARD_FULL,
                source: ReportSource::Bootstrap
            }]
        );
    }

    #[test]
    fn test_bootstrap_cancelled() {
        let (state, queue, rx, observer) = parts();
        let (cancel_tx, cancel) = channel::bounded::<()>(1);
        drop(cancel_tx);

        run_bootstrap(Duration::from_secs(60), &cancel, &state.shared(), &queue, &observer);

        assert!(rx.try_pop().is_none());
        assert!(observer.events().is_empty());
    }

    #[test]
    fn test_reader_resyncs_on_every_framing_error() {
        let frames: [&[u8]; 3] = [
            &[],
            &[OUTPUT_REPORT_PREFIX, OUTPUT_RUMBLE_ONLY],
            &[0x00; 20],
        ];

        for frame in frames {
            let (mut state, queue, rx, observer) = parts();
            let mock = MockTransport::new();
            mock.queue_frame(frame);
            mock.queue_frame(OutputReport::with_id(OUTPUT_RUMBLE_ONLY, 0).as_bytes());

            let exit = run_reader(&mock, &mut state, &queue, &observer, Duration::ZERO);
            let expected = OutputReport::from_bytes(frame).unwrap_err();
            assert!(matches!(&exit, ReaderExit::Resync(e) if *e == expected), "{:?}", exit);
            assert_eq!(mock.read_count(), 1);
            assert_eq!(mock.pending_reads(), 1);

            assert_eq!(rx.try_pop().unwrap().report_id(), REPORT_STANDARD_FULL);
            assert!(rx.try_pop().is_none());
        }
    }

    #[test]
    fn test_drain_flushes_reset_report() {
        let mock = MockTransport::new();
        mock.hold_writes();
        mock.queue_frame(&[OUTPUT_REPORT_PREFIX, 0x10]);
        let config = EngineConfig {
            bootstrap_delay_ms: 60_000,
            ..Default::default()
        };
        let mut engine =
            ProtocolEngine::start(mock.clone(), None, MAC, config, Arc::new(RecordingObserver::new()))
                .unwrap();

        let release = {
            let mock = mock.clone();
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(50));
                mock.release_writes();
            })
        };

        let exit = engine.drain().expect("reader exit");
        assert!(matches!(exit, ReaderExit::Resync(ReportError::BadLength { .. })));

        // Written before drain returned; the handshake report was abandoned.
        let writes = mock.get_writes();
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0][IN_REPORT_ID], REPORT_STANDARD_FULL);
        assert_eq!(engine.status().queued, 0);
        assert!(engine.drain().is_none());
        release.join().unwrap();
    }

    #[test]
    fn test_start_rejects_bad_config() {
        let config = EngineConfig {
            queue_capacity: 0,
            ..Default::default()
        };
        let result = ProtocolEngine::start(
            MockTransport::new(),
            None,
            MAC,
            config,
            Arc::new(RecordingObserver::new()),
        );
        assert!(matches!(result, Err(EngineError::Config(ConfigError::ZeroQueueCapacity))));
    }
}
