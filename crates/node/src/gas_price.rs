//! Deferred activation of the node's fee schedule.
//!
//! At startup the [`GasPriceUpdater`] either applies the configured gas price
//! and minimum base fee right away (activation time already reached) or arms a
//! single background task that applies them at the activation time, unless a
//! shutdown signal fires first.

use parking_lot::Mutex;
use reth_tasks::shutdown::Shutdown;
use std::{
    sync::Arc,
    time::{Duration, SystemTime, UNIX_EPOCH},
};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

/// Minimum base fee applied when the chainspec does not set one (25 gwei).
pub const DEFAULT_MIN_BASE_FEE: u128 = 25_000_000_000;

/// Sink for fee schedule values.
///
/// Both setters are called exactly once, when the schedule is applied.
pub trait GasPriceSetter: Send + Sync + 'static {
    /// Sets the advertised gas price.
    fn set_gas_price(&self, price: u128);

    /// Sets the minimum base fee.
    fn set_min_fee(&self, min_fee: u128);
}

impl<T: GasPriceSetter + ?Sized> GasPriceSetter for Arc<T> {
    fn set_gas_price(&self, price: u128) {
        (**self).set_gas_price(price);
    }

    fn set_min_fee(&self, min_fee: u128) {
        (**self).set_min_fee(min_fee);
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct GasScheduleInner {
    gas_price: u128,
    min_base_fee: u128,
}

/// Process-wide gas price and minimum base fee.
///
/// Read by the node's fee logic while the updater may be writing it.
#[derive(Debug, Default)]
pub struct GasSchedule {
    inner: Mutex<GasScheduleInner>,
}

impl GasSchedule {
    /// Creates a schedule with the given starting values.
    pub const fn new(gas_price: u128, min_base_fee: u128) -> Self {
        Self {
            inner: Mutex::new(GasScheduleInner {
                gas_price,
                min_base_fee,
            }),
        }
    }

    /// Current gas price.
    pub fn gas_price(&self) -> u128 {
        self.inner.lock().gas_price
    }

    /// Current minimum base fee.
    pub fn min_base_fee(&self) -> u128 {
        self.inner.lock().min_base_fee
    }

    /// Gas price and minimum base fee read under one lock.
    pub fn snapshot(&self) -> (u128, u128) {
        let inner = self.inner.lock();
        (inner.gas_price, inner.min_base_fee)
    }
}

impl GasPriceSetter for GasSchedule {
    fn set_gas_price(&self, price: u128) {
        self.inner.lock().gas_price = price;
    }

    fn set_min_fee(&self, min_fee: u128) {
        self.inner.lock().min_base_fee = min_fee;
    }
}

/// Target fee schedule and the time it takes effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeSchedule {
    /// Unix seconds at which the schedule applies.
    pub activation_timestamp: u64,
    /// Gas price to apply.
    pub gas_price: u128,
    /// Minimum base fee to apply.
    pub min_base_fee: u128,
}

impl Default for FeeSchedule {
    fn default() -> Self {
        Self {
            activation_timestamp: 0,
            gas_price: 0,
            min_base_fee: DEFAULT_MIN_BASE_FEE,
        }
    }
}

impl FeeSchedule {
    /// Activation time as a [`SystemTime`].
    pub fn activation_time(&self) -> SystemTime {
        UNIX_EPOCH + Duration::from_secs(self.activation_timestamp)
    }

    fn apply<S: GasPriceSetter + ?Sized>(&self, setter: &S) {
        setter.set_gas_price(self.gas_price);
        setter.set_min_fee(self.min_base_fee);
        info!(
            target: "oracle::gas_price",
            gas_price = self.gas_price,
            min_base_fee = self.min_base_fee,
            "fee schedule applied"
        );
    }
}

/// Lifecycle of a [`GasPriceUpdater`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdaterState {
    /// Not started.
    Idle,
    /// Applying synchronously because the activation time has passed.
    Immediate,
    /// Waiting in the background for the activation time.
    Scheduled,
    /// The schedule was applied.
    Applied,
    /// Shut down before the schedule was applied.
    Stopped,
}

impl UpdaterState {
    /// Returns true for [`UpdaterState::Applied`] and [`UpdaterState::Stopped`].
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Applied | Self::Stopped)
    }
}

/// Which way [`GasPriceUpdater::start`] went.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdaterPath {
    /// Applied before `start` returned.
    Immediate,
    /// A background task was spawned.
    Scheduled,
}

/// Applies a [`FeeSchedule`] to a [`GasPriceSetter`] once its activation time is reached.
#[derive(Debug)]
pub struct GasPriceUpdater<S> {
    setter: S,
    schedule: FeeSchedule,
    shutdown: Shutdown,
    state: Arc<Mutex<UpdaterState>>,
}

impl<S: GasPriceSetter> GasPriceUpdater<S> {
    /// Creates an idle updater.
    pub fn new(setter: S, schedule: FeeSchedule, shutdown: Shutdown) -> Self {
        Self {
            setter,
            schedule,
            shutdown,
            state: Arc::new(Mutex::new(UpdaterState::Idle)),
        }
    }

    /// Starts the updater against the system clock.
    ///
    /// Must be called from within a tokio runtime when the activation time is
    /// in the future.
    pub fn start(self) -> UpdaterHandle {
        self.start_at(SystemTime::now())
    }

    /// Starts the updater as if the current time were `now`.
    pub fn start_at(self, now: SystemTime) -> UpdaterHandle {
        let Self {
            setter,
            schedule,
            shutdown,
            state,
        } = self;

        let delay = match schedule.activation_time().duration_since(now) {
            Ok(delay) if !delay.is_zero() => delay,
            _ => {
                *state.lock() = UpdaterState::Immediate;
                schedule.apply(&setter);
                *state.lock() = UpdaterState::Applied;
                return UpdaterHandle {
                    path: UpdaterPath::Immediate,
                    state,
                    task: None,
                };
            }
        };

        *state.lock() = UpdaterState::Scheduled;
        info!(
            target: "oracle::gas_price",
            activation_timestamp = schedule.activation_timestamp,
            delay_secs = delay.as_secs(),
            "fee schedule armed"
        );

        let task_state = Arc::clone(&state);
        let task = tokio::spawn(async move {
            let outcome = tokio::select! {
                biased;
                _ = shutdown => {
                    debug!(target: "oracle::gas_price", "shutdown before fee schedule activation");
                    UpdaterState::Stopped
                }
                _ = tokio::time::sleep(delay) => {
                    schedule.apply(&setter);
                    UpdaterState::Applied
                }
            };
            *task_state.lock() = outcome;
            outcome
        });

        UpdaterHandle {
            path: UpdaterPath::Scheduled,
            state,
            task: Some(task),
        }
    }
}

/// Completion handle returned by [`GasPriceUpdater::start`].
#[derive(Debug)]
pub struct UpdaterHandle {
    path: UpdaterPath,
    state: Arc<Mutex<UpdaterState>>,
    task: Option<JoinHandle<UpdaterState>>,
}

impl UpdaterHandle {
    /// Whether the schedule was applied synchronously or deferred.
    pub const fn path(&self) -> UpdaterPath {
        self.path
    }

    /// Current lifecycle state.
    pub fn state(&self) -> UpdaterState {
        *self.state.lock()
    }

    /// Returns true once the updater reached a terminal state.
    pub fn is_finished(&self) -> bool {
        self.task.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Waits until the updater reaches [`UpdaterState::Applied`] or [`UpdaterState::Stopped`].
    ///
    /// Resolves immediately when no background task was spawned.
    pub async fn wait(self) -> UpdaterState {
        let Some(task) = self.task else {
            return *self.state.lock();
        };
        match task.await {
            Ok(outcome) => outcome,
            Err(err) => {
                error!(target: "oracle::gas_price", %err, "fee schedule task failed");
                *self.state.lock() = UpdaterState::Stopped;
                UpdaterState::Stopped
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::EventCollector;
    use reth_tasks::shutdown::signal;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::time::timeout;

    #[derive(Debug, Default)]
    struct MockGasPriceSetter {
        schedule: GasSchedule,
        calls: AtomicUsize,
    }

    impl MockGasPriceSetter {
        fn with_price(price: u128) -> Arc<Self> {
            Arc::new(Self {
                schedule: GasSchedule::new(price, 0),
                calls: AtomicUsize::new(0),
            })
        }

        fn status(&self) -> (u128, u128) {
            self.schedule.snapshot()
        }
    }

    impl GasPriceSetter for MockGasPriceSetter {
        fn set_gas_price(&self, price: u128) {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.schedule.set_gas_price(price);
        }

        fn set_min_fee(&self, min_fee: u128) {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.schedule.set_min_fee(min_fee);
        }
    }

    fn unix_now() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs()
    }

    fn schedule_at(activation_timestamp: u64) -> FeeSchedule {
        FeeSchedule {
            activation_timestamp,
            ..Default::default()
        }
    }

    #[test]
    fn past_activation_applies_before_start_returns() {
        let setter = MockGasPriceSetter::with_price(1);
        let (_signal, shutdown) = signal();

        let handle =
            GasPriceUpdater::new(Arc::clone(&setter), schedule_at(0), shutdown).start();

        assert_eq!(handle.path(), UpdaterPath::Immediate);
        assert_eq!(handle.state(), UpdaterState::Applied);
        assert!(handle.is_finished());
        assert_eq!(setter.status(), (0, DEFAULT_MIN_BASE_FEE));
    }

    #[tokio::test]
    async fn immediate_handle_resolves_without_task() {
        let setter = MockGasPriceSetter::with_price(1);
        let (_signal, shutdown) = signal();

        let handle = GasPriceUpdater::new(Arc::clone(&setter), schedule_at(0), shutdown).start();

        let outcome = timeout(Duration::from_millis(1), handle.wait())
            .await
            .expect("immediate path must not wait");
        assert_eq!(outcome, UpdaterState::Applied);
        assert_eq!(setter.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn activation_equal_to_now_is_immediate() {
        let setter = MockGasPriceSetter::with_price(1);
        let (_signal, shutdown) = signal();
        let now = UNIX_EPOCH + Duration::from_secs(1_000);

        let handle = GasPriceUpdater::new(Arc::clone(&setter), schedule_at(1_000), shutdown)
            .start_at(now);

        assert_eq!(handle.path(), UpdaterPath::Immediate);
        assert_eq!(setter.status(), (0, DEFAULT_MIN_BASE_FEE));
    }

    #[tokio::test]
    async fn shutdown_stops_scheduled_update() {
        let collector = EventCollector::new();
        let _guard = collector.as_default();
        let setter = MockGasPriceSetter::with_price(1);
        let (signal, shutdown) = signal();

        let handle = GasPriceUpdater::new(
            Arc::clone(&setter),
            schedule_at(unix_now() + 3_600),
            shutdown,
        )
        .start();
        assert_eq!(handle.path(), UpdaterPath::Scheduled);
        assert_eq!(handle.state(), UpdaterState::Scheduled);

        signal.fire();
        let outcome = timeout(Duration::from_secs(5), handle.wait())
            .await
            .expect("updater should stop promptly after shutdown");

        assert_eq!(outcome, UpdaterState::Stopped);
        assert!(outcome.is_terminal());
        assert_eq!(setter.status(), (1, 0), "schedule must not be applied");
        assert_eq!(setter.calls.load(Ordering::SeqCst), 0);
        assert!(collector
            .find("oracle::gas_price", "fee schedule applied")
            .is_empty());
    }

    #[tokio::test]
    async fn dropped_signal_counts_as_shutdown() {
        let setter = MockGasPriceSetter::with_price(1);
        let (signal, shutdown) = signal();

        let handle = GasPriceUpdater::new(
            Arc::clone(&setter),
            schedule_at(unix_now() + 3_600),
            shutdown,
        )
        .start();
        drop(signal);

        let outcome = timeout(Duration::from_secs(5), handle.wait()).await.unwrap();
        assert_eq!(outcome, UpdaterState::Stopped);
    }

    #[tokio::test]
    async fn scheduled_update_applies_at_activation() {
        let collector = EventCollector::new();
        let _guard = collector.as_default();
        let setter = MockGasPriceSetter::with_price(1);
        let (_signal, shutdown) = signal();

        let now = SystemTime::now();
        let now_secs = now.duration_since(UNIX_EPOCH).unwrap().as_secs();
        let handle = GasPriceUpdater::new(Arc::clone(&setter), schedule_at(now_secs + 1), shutdown)
            .start_at(now);
        assert_eq!(handle.path(), UpdaterPath::Scheduled);
        assert_eq!(setter.status(), (1, 0));

        let outcome = timeout(Duration::from_secs(5), handle.wait())
            .await
            .expect("schedule should apply within the bound");

        assert_eq!(outcome, UpdaterState::Applied);
        assert_eq!(setter.status(), (0, DEFAULT_MIN_BASE_FEE));
        assert_eq!(setter.calls.load(Ordering::SeqCst), 2, "each setter runs once");

        let applied = collector.find("oracle::gas_price", "fee schedule applied");
        assert_eq!(applied.len(), 1);
        assert_eq!(
            applied[0].field("min_base_fee"),
            Some(DEFAULT_MIN_BASE_FEE.to_string().as_str())
        );
    }

    #[test]
    fn gas_schedule_accessors() {
        let schedule = GasSchedule::new(7, 9);
        assert_eq!(schedule.gas_price(), 7);
        assert_eq!(schedule.min_base_fee(), 9);

        schedule.set_gas_price(11);
        schedule.set_min_fee(13);
        assert_eq!(schedule.snapshot(), (11, 13));
    }
}
