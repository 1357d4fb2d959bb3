use crate::error::ApiError;
use squareoff_core::{AppConfig, Grouping, InstrumentMap, Mode, PrefixResolver, UnderlyingResolver};
use squareoff_kite::{
    KiteAuthConfig, KiteClient, KiteClientConfig, KiteCredentials, KiteError, KiteTransport,
};
use squareoff_sensibull::{SensibullClient, SensibullClientConfig};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::OnceCell;

/// Process-wide demo/live flag. Resets to the configured default on restart.
#[derive(Debug)]
pub struct ModeFlag {
    demo: AtomicBool,
}

impl ModeFlag {
    #[must_use]
    pub fn new(mode: Mode) -> Self {
        Self {
            demo: AtomicBool::new(mode.is_demo()),
        }
    }

    #[must_use]
    pub fn get(&self) -> Mode {
        Mode::from_demo_flag(self.demo.load(Ordering::Relaxed))
    }

    pub fn set(&self, mode: Mode) {
        self.demo.store(mode.is_demo(), Ordering::Relaxed);
    }

    /// Flips the flag and returns the new mode.
    pub fn toggle(&self) -> Mode {
        let was_demo = self.demo.fetch_xor(true, Ordering::Relaxed);
        Mode::from_demo_flag(!was_demo)
    }
}

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    config: Arc<AppConfig>,
    mode: Arc<ModeFlag>,
    kite_config: KiteClientConfig,
    kite_auth: KiteAuthConfig,
    kite_transport: KiteTransport,
    sensibull: SensibullClient,
    instruments: Arc<OnceCell<InstrumentMap>>,
}

impl AppState {
    /// Builds the outbound HTTP clients from configuration.
    ///
    /// # Errors
    /// Returns an error if an HTTP client cannot be built.
    pub fn new(config: AppConfig) -> anyhow::Result<Self> {
        let kite_config = KiteClientConfig::from(&config.kite);
        let kite_auth = KiteAuthConfig::from(&config.kite);
        let kite_transport = KiteTransport::new(&kite_config)?;
        let sensibull = SensibullClient::new(SensibullClientConfig::from(&config.platform))?;

        Ok(Self {
            mode: Arc::new(ModeFlag::new(config.positions.default_mode)),
            config: Arc::new(config),
            kite_config,
            kite_auth,
            kite_transport,
            sensibull,
            instruments: Arc::new(OnceCell::new()),
        })
    }

    #[must_use]
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    #[must_use]
    pub fn mode(&self) -> &ModeFlag {
        &self.mode
    }

    #[must_use]
    pub fn sensibull(&self) -> &SensibullClient {
        &self.sensibull
    }

    /// Builds a brokerage client from the credentials currently in the
    /// environment.
    ///
    /// # Errors
    /// Returns `ApiError::MissingCredentials` if either variable is unset.
    pub fn kite_client(&self) -> Result<KiteClient, ApiError> {
        let credentials = KiteCredentials::from_env(&self.kite_auth)?;
        Ok(KiteClient::with_transport(
            self.kite_config.clone(),
            self.kite_transport.clone(),
            credentials,
        ))
    }

    /// Returns the resolver used to group live positions.
    ///
    /// With instrument grouping, the dump is downloaded on first use and kept
    /// for the life of the process. A failed download is not cached; that
    /// request groups by prefix instead.
    pub async fn resolver(&self, client: &KiteClient) -> &dyn UnderlyingResolver {
        if self.config.positions.grouping == Grouping::Prefix {
            return &PrefixResolver;
        }

        let exchange = self.config.positions.instruments_exchange.as_str();
        let loaded = self
            .instruments
            .get_or_try_init(|| async move {
                let instruments = client.get_instruments(exchange).await?;
                let map = InstrumentMap::from_pairs(
                    instruments.into_iter().map(|i| (i.tradingsymbol, i.name)),
                );
                tracing::info!(exchange, instruments = map.len(), "Loaded instrument dump");
                Ok::<_, KiteError>(map)
            })
            .await;

        match loaded {
            Ok(map) => map,
            Err(e) => {
                tracing::warn!(exchange, error = %e, "Instrument dump unavailable, grouping by prefix");
                &PrefixResolver
            }
        }
    }
}
