use std::{
    path::{Path, PathBuf},
    sync::{Arc, LazyLock},
};

use anyhow::Context;
use scorepost_common::{Signal, internal, logging, tracing};
use scorepost_delivery::{
    DeliveryConfig, DeliveryService, HttpTransport, SmtpNotifier, SmtpNotifierConfig,
};
use serde::Deserialize;
use tokio::{
    io::BufReader,
    signal::unix::{SignalKind, signal},
    sync::broadcast,
};

use crate::ingest;

/// Top level configuration, read from RON:
///
/// ```ron
/// (
///     delivery: (
///         endpoint: "https://scoring.example.com/api",
///         escalation_recipients: "ops@example.com",
///     ),
///     notifier: (
///         relay: "mail.example.com:25",
///     ),
/// )
/// ```
#[derive(Debug, Deserialize)]
pub struct Scorepost {
    delivery: DeliveryConfig,
    #[serde(default)]
    notifier: SmtpNotifierConfig,
}

/// Places searched, in order, when `SCOREPOST_CONFIG` is unset.
pub const CONFIG_SEARCH_PATH: [&str; 2] = [
    "./scorepost.config.ron",
    "/etc/scorepost/scorepost.config.ron",
];

pub static SHUTDOWN_BROADCAST: LazyLock<broadcast::Sender<Signal>> = LazyLock::new(|| {
    let (sender, _receiver) = broadcast::channel(64);
    sender
});

impl Scorepost {
    /// Read and parse the configuration at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error naming `path` if it cannot be read or parsed.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        ron::from_str(&content)
            .with_context(|| format!("Failed to parse config from {}", path.display()))
    }

    /// Pick the configuration file: `explicit` if given, which must exist,
    /// otherwise the first existing entry of `search_path`. The result is
    /// canonical so a SIGHUP reload reads the same file even if the working
    /// directory has changed.
    ///
    /// # Errors
    ///
    /// Returns an error if `explicit` cannot be resolved or no entry of
    /// `search_path` exists.
    pub fn locate(explicit: Option<PathBuf>, search_path: &[&str]) -> anyhow::Result<PathBuf> {
        if let Some(path) = explicit {
            return path.canonicalize().with_context(|| {
                format!("SCOREPOST_CONFIG points to {}", path.display())
            });
        }

        search_path
            .iter()
            .map(Path::new)
            .find_map(|candidate| candidate.canonicalize().ok())
            .with_context(|| {
                format!(
                    "No configuration file found, set SCOREPOST_CONFIG or create one of: {}",
                    search_path.join(", ")
                )
            })
    }

    pub const fn delivery(&self) -> &DeliveryConfig {
        &self.delivery
    }

    pub const fn notifier(&self) -> &SmtpNotifierConfig {
        &self.notifier
    }

    /// Run the delivery service until SIGINT or SIGTERM, reloading the
    /// delivery configuration from `config_path` on SIGHUP.
    ///
    /// # Errors
    ///
    /// This function will return an error if the initial configuration is
    /// invalid or the signal handlers cannot be installed.
    pub async fn run(self, config_path: PathBuf) -> anyhow::Result<()> {
        logging::init();

        internal!("Controller running");

        let transport = Arc::new(HttpTransport::new(&self.delivery)?);
        let notifier = Arc::new(SmtpNotifier::new(self.notifier.clone()));
        let service = Arc::new(DeliveryService::start(
            &self.delivery,
            transport,
            notifier,
        )?);

        let producer = tokio::spawn(ingest::run(
            BufReader::new(tokio::io::stdin()),
            Arc::clone(&service),
            SHUTDOWN_BROADCAST.subscribe(),
        ));

        let ret = self.supervise(&service, &config_path).await;

        internal!("Shutting down...");

        // Nobody may be listening if the producer already hit end of input
        let _ = SHUTDOWN_BROADCAST.send(Signal::Shutdown);

        match producer.await {
            Ok(accepted) => tracing::debug!(accepted, "Producer stopped"),
            Err(err) => tracing::error!(error = %err, "Producer task failed"),
        }

        let pending = service.shutdown().await;
        if !pending.is_empty() {
            tracing::warn!(
                pending = pending.len(),
                "Discarding undelivered work items at shutdown"
            );
        }

        ret
    }

    async fn supervise(&self, service: &DeliveryService, config_path: &Path) -> anyhow::Result<()> {
        let mut terminate = signal(SignalKind::terminate())?;
        let mut hangup = signal(SignalKind::hangup())?;

        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    internal!(level = INFO, "CTRL+C entered, shutting down");
                    return Ok(());
                }
                _ = terminate.recv() => {
                    internal!(level = INFO, "Terminate Signal received, shutting down");
                    return Ok(());
                }
                _ = hangup.recv() => {
                    internal!(level = INFO, "Hangup received, reloading {}", config_path.display());
                    match self.reload(service, config_path).await {
                        Ok(carried) => tracing::info!(carried, "Configuration reloaded"),
                        Err(err) => tracing::error!(
                            "Reload failed, keeping the current configuration: {err:#}"
                        ),
                    }
                }
            }
        }
    }

    /// Swap the active queue for one built from the file's current contents.
    async fn reload(&self, service: &DeliveryService, config_path: &Path) -> anyhow::Result<usize> {
        let updated = Self::load(config_path)?;

        if updated.notifier != self.notifier {
            tracing::warn!("Notifier settings changed; they take effect after a restart");
        }

        let transport = Arc::new(HttpTransport::new(&updated.delivery)?);
        Ok(service.reconfigure(&updated.delivery, transport).await?)
    }
}
