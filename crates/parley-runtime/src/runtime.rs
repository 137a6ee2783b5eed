//! Process-scoped orchestration.
//!
//! A [`ParleyRuntime`] owns the matcher registry (and with it the command
//! table) plus the dispatcher built from configuration. Adapters and
//! transports live outside; they hand frames or events to the runtime.
//!
//! ```rust,ignore
//! use parley_runtime::ParleyRuntime;
//!
//! let runtime = ParleyRuntime::builder()
//!     .config_file("parley.toml")
//!     .profile("production")
//!     .build()?;
//!
//! runtime.register(on_command("ping").handler(|| async { Outcome::finish("pong") }));
//!
//! // in the transport's read loop
//! runtime.receive(&adapter, bot.clone(), &frame).await;
//!
//! runtime.run().await?;
//! ```

use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use tokio::signal;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use parley_core::{Adapter, BoxedBot, BoxedEvent};
use parley_framework::{Dispatcher, Matcher, MatcherId, MatcherRegistry, Permission};

use crate::config::{ConfigLoader, ParleyConfig, dispatch_settings, validate_config};
use crate::error::{RuntimeError, RuntimeResult};
use crate::filter::FilterChain;
use crate::logging;

/// The runtime object: registry, dispatcher, inbound filters and shutdown
/// signal.
pub struct ParleyRuntime {
    config: ParleyConfig,
    registry: Arc<MatcherRegistry>,
    dispatcher: Dispatcher,
    filters: FilterChain,
    shutdown: CancellationToken,
}

impl ParleyRuntime {
    /// Creates a runtime builder that loads configuration from disk and env.
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    /// Creates a runtime from an already loaded configuration.
    ///
    /// Logging is left alone; see [`logging::init_from_config`].
    pub fn from_config(config: ParleyConfig) -> RuntimeResult<Self> {
        validate_config(&config)?;
        let settings = dispatch_settings(&config.bot)?;
        let registry = Arc::new(MatcherRegistry::new());
        let dispatcher = Dispatcher::with_settings(Arc::clone(&registry), settings);

        info!(
            log_level = %config.logging.level,
            superusers = config.bot.superusers.len(),
            adapters = config.adapters.len(),
            "Runtime initialized from configuration"
        );

        Ok(Self {
            config,
            registry,
            dispatcher,
            filters: FilterChain::new(),
            shutdown: CancellationToken::new(),
        })
    }

    pub fn config(&self) -> &ParleyConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<MatcherRegistry> {
        &self.registry
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Registers a matcher.
    pub fn register(&self, matcher: Matcher) -> MatcherId {
        matcher.register(&self.registry)
    }

    /// Registers several matchers in order.
    pub fn register_all(&self, matchers: impl IntoIterator<Item = Matcher>) -> Vec<MatcherId> {
        matchers
            .into_iter()
            .map(|matcher| self.register(matcher))
            .collect()
    }

    /// A permission granted to the configured superusers.
    pub fn superusers(&self) -> Permission {
        Permission::superuser(self.config.bot.superusers.iter().cloned())
    }

    /// Deserializes the `[adapters.<name>]` section, falling back to the
    /// adapter's defaults when the section is absent.
    pub fn adapter_config<T>(&self, name: &str) -> RuntimeResult<T>
    where
        T: DeserializeOwned + Default,
    {
        match self.config.adapters.get(name) {
            Some(value) => serde_json::from_value(value.clone()).map_err(|e| {
                RuntimeError::AdapterConfigDeserialize(format!(
                    "Failed to deserialize config for adapter '{name}': {e}"
                ))
            }),
            None => {
                warn!(
                    adapter = name,
                    "No configuration found for adapter, using default"
                );
                Ok(T::default())
            }
        }
    }

    /// Adds an inbound filter. Filters run before dispatch in descending
    /// `priority`; one returning `false` drops the event.
    pub fn add_filter<F>(&self, priority: i32, filter: F)
    where
        F: Fn(&BoxedEvent) -> bool + Send + Sync + 'static,
    {
        self.filters.add(priority, filter);
    }

    pub fn filters(&self) -> &FilterChain {
        &self.filters
    }

    /// Dispatches one event unless a filter drops it. Returns whether any
    /// matcher ran.
    pub async fn handle_event(&self, event: BoxedEvent, bot: BoxedBot) -> bool {
        if let Some(priority) = self.filters.rejected_by(&event) {
            debug!(
                event_name = event.event_name(),
                filter_priority = priority,
                "Event dropped by filter"
            );
            return false;
        }
        self.dispatcher.dispatch(event, bot).await
    }

    /// Feeds one raw frame through `adapter`, dispatching it if it is an
    /// event. API replies and malformed frames return `false`.
    pub async fn receive(&self, adapter: &dyn Adapter, bot: BoxedBot, frame: &[u8]) -> bool {
        match adapter.on_frame(frame).await {
            Some(event) => self.handle_event(event, bot).await,
            None => {
                trace!(adapter = adapter.name(), "Frame consumed without dispatch");
                false
            }
        }
    }

    /// Starts the background expiry sweep if `runtime.sweep_interval_secs`
    /// is set. The task stops when the runtime shuts down.
    pub fn spawn_sweeper(&self) -> Option<JoinHandle<()>> {
        let period = self.config.runtime.sweep_interval()?;
        Some(spawn_sweeper(
            Arc::clone(&self.registry),
            period,
            self.shutdown.clone(),
        ))
    }

    /// A token cancelled when the runtime shuts down.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Requests shutdown.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    /// Runs until Ctrl+C, SIGTERM or [`shutdown`](Self::shutdown).
    pub async fn run(&self) -> RuntimeResult<()> {
        let token = self.shutdown.clone();
        self.run_until(async move {
            tokio::select! {
                _ = wait_for_signal() => {}
                _ = token.cancelled() => {
                    info!("Shutdown requested");
                }
            }
        })
        .await
    }

    /// Runs until `shutdown` resolves.
    pub async fn run_until<F>(&self, shutdown: F) -> RuntimeResult<()>
    where
        F: Future<Output = ()>,
    {
        let sweeper = self.spawn_sweeper();
        info!(matchers = self.registry.len(), "Runtime started");

        shutdown.await;

        self.shutdown.cancel();
        if let Some(handle) = sweeper
            && let Err(e) = handle.await
        {
            warn!(error = %e, "Expiry sweeper ended abnormally");
        }
        info!("Runtime stopped");
        Ok(())
    }
}

fn spawn_sweeper(
    registry: Arc<MatcherRegistry>,
    period: Duration,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        debug!(?period, "Expiry sweeper started");
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    let removed = registry.sweep_expired();
                    if removed > 0 {
                        debug!(removed, "Swept expired matchers");
                    }
                }
            }
        }
        debug!("Expiry sweeper stopped");
    })
}

/// Waits for Ctrl+C or SIGTERM.
async fn wait_for_signal() {
    #[cfg(unix)]
    {
        let mut sigterm = match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(sigterm) => sigterm,
            Err(e) => {
                warn!(error = %e, "Failed to register SIGTERM handler");
                ctrl_c().await;
                return;
            }
        };

        tokio::select! {
            _ = ctrl_c() => {}
            _ = sigterm.recv() => {
                info!("Received SIGTERM, shutting down");
            }
        }
    }

    #[cfg(not(unix))]
    ctrl_c().await;
}

async fn ctrl_c() {
    match signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl+C, shutting down"),
        Err(e) => {
            // Without a signal source only an explicit shutdown can stop us.
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    }
}

// =============================================================================
// RuntimeBuilder
// =============================================================================

/// Builder that loads configuration, installs logging and creates the runtime.
///
/// ```rust,ignore
/// let runtime = ParleyRuntime::builder()
///     .config_file("config/parley.toml")
///     .profile("production")
///     .build()?;
/// ```
pub struct RuntimeBuilder {
    config_loader: ConfigLoader,
    init_logging: bool,
}

impl RuntimeBuilder {
    pub fn new() -> Self {
        Self {
            config_loader: ConfigLoader::new().with_current_dir(),
            init_logging: true,
        }
    }

    /// Sets a specific configuration file to load.
    pub fn config_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.file(path);
        self
    }

    /// Sets the configuration profile (e.g. "development", "production").
    pub fn profile(mut self, profile: impl AsRef<str>) -> Self {
        self.config_loader = self.config_loader.profile(profile);
        self
    }

    /// Adds a search path for configuration files.
    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.search_path(path);
        self
    }

    /// Disables `PARLEY_*` environment overrides.
    pub fn without_env(mut self) -> Self {
        self.config_loader = self.config_loader.without_env();
        self
    }

    /// Leaves the global subscriber alone.
    pub fn without_logging(mut self) -> Self {
        self.init_logging = false;
        self
    }

    pub fn build(self) -> RuntimeResult<ParleyRuntime> {
        let config = self.config_loader.load()?;
        if self.init_logging {
            logging::init_from_config(&config.logging);
        }
        ParleyRuntime::from_config(config)
    }
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}
