//! Agent configuration
//!
//! Settings come from the process environment, after `.env.local` and then
//! `.env` have been loaded. Neither file overrides a variable that is already
//! set, so the real environment wins over `.env.local`, which wins over `.env`.
//! Empty values count as unset.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{CallEngineError, Result};
use crate::prompts::DEFAULT_OUTBOUND_GREETING;
use crate::retry::RetryPolicy;

/// Agent name the dispatch tool asks the server to send into the room
pub const DEFAULT_AGENT_NAME: &str = "outbound-caller";

/// Env files in load order; earlier files win
pub const ENV_FILES: [&str; 2] = [".env.local", ".env"];

/// Complete agent configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// LiveKit server credentials
    pub livekit: LiveKitConfig,

    /// Outbound dialing
    pub outbound: OutboundConfig,

    /// Fallback transfer to a human
    pub transfer: TransferConfig,

    /// Silence watchdog
    pub watchdog: WatchdogConfig,

    /// Retry budgets for provider actions
    pub retry: RetryConfig,

    /// Speech and language-model provider selection
    pub providers: ProviderConfig,

    /// Outbound trunk maintenance
    pub trunk: TrunkConfig,
}

/// LiveKit server connection settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LiveKitConfig {
    /// `LIVEKIT_URL`, `ws(s)://` or `http(s)://`
    pub url: Option<String>,
    /// `LIVEKIT_API_KEY`
    pub api_key: Option<String>,
    /// `LIVEKIT_API_SECRET`
    #[serde(skip_serializing)]
    pub api_secret: Option<String>,
}

impl LiveKitConfig {
    /// Whether url, key and secret are all present
    pub fn is_complete(&self) -> bool {
        self.url.is_some() && self.api_key.is_some() && self.api_secret.is_some()
    }
}

/// Outbound dialing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboundConfig {
    /// `ENABLE_OUTBOUND_CALLS`, off unless literally `true`
    pub enabled: bool,
    /// `OUTBOUND_TRUNK_ID`
    pub trunk_id: Option<String>,
    /// `VOBIZ_SIP_DOMAIN`
    pub sip_domain: Option<String>,
    /// `OUTBOUND_GREETING`, spoken as soon as the callee answers
    pub greeting: String,
    /// Agent name used for dispatch
    pub agent_name: String,
}

impl Default for OutboundConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            trunk_id: None,
            sip_domain: None,
            greeting: DEFAULT_OUTBOUND_GREETING.to_string(),
            agent_name: DEFAULT_AGENT_NAME.to_string(),
        }
    }
}

/// Fallback transfer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferConfig {
    /// `AUTO_TRANSFER_ON_FAILURE`, on unless set to something other than `true`
    pub enabled: bool,
    /// `DEFAULT_TRANSFER_NUMBER`, raw before formatting
    pub destination: Option<String>,
    /// SIP domain used to build `sip:` destinations
    pub sip_domain: Option<String>,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            destination: None,
            sip_domain: None,
        }
    }
}

/// Silence watchdog configuration
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct WatchdogConfig {
    /// `SILENCE_TRANSFER_SECONDS`
    pub silence_threshold: Duration,
    /// How often the watchdog looks at the activity clock
    pub poll_interval: Duration,
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self {
            silence_threshold: Duration::from_secs(60),
            poll_interval: Duration::from_secs(5),
        }
    }
}

/// Retry budgets per action kind
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Speaking fixed text
    pub speak: RetryPolicy,
    /// Generating a language-model reply
    pub reply: RetryPolicy,
    /// Pause between the greeting and the follow-up
    pub follow_up_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            speak: RetryPolicy::default(),
            reply: RetryPolicy::default(),
            follow_up_delay: Duration::from_millis(250),
        }
    }
}

/// Language-model backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    LiveKit,
    OpenAi,
    Gemini,
}

/// Text-to-speech backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TtsProvider {
    OpenAi,
    Cartesia,
    Gemini,
    LiveKit,
}

impl FromStr for LlmProvider {
    type Err = CallEngineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "livekit" => Ok(Self::LiveKit),
            "openai" => Ok(Self::OpenAi),
            "gemini" => Ok(Self::Gemini),
            other => Err(CallEngineError::config(format!("Unknown LLM_PROVIDER: {}", other))),
        }
    }
}

impl FromStr for TtsProvider {
    type Err = CallEngineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "cartesia" => Ok(Self::Cartesia),
            "gemini" => Ok(Self::Gemini),
            "livekit" => Ok(Self::LiveKit),
            other => Err(CallEngineError::config(format!("Unknown TTS_PROVIDER: {}", other))),
        }
    }
}

impl fmt::Display for LlmProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::LiveKit => "livekit",
            Self::OpenAi => "openai",
            Self::Gemini => "gemini",
        };
        f.write_str(name)
    }
}

impl fmt::Display for TtsProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::OpenAi => "openai",
            Self::Cartesia => "cartesia",
            Self::Gemini => "gemini",
            Self::LiveKit => "livekit",
        };
        f.write_str(name)
    }
}

/// Provider selection and the credentials each selection needs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// `LLM_PROVIDER`, default `livekit`
    pub llm: LlmProvider,
    /// `TTS_PROVIDER`, default `openai`
    pub tts: TtsProvider,
    #[serde(skip_serializing)]
    pub openai_api_key: Option<String>,
    #[serde(skip_serializing)]
    pub gemini_api_key: Option<String>,
    #[serde(skip_serializing)]
    pub cartesia_api_key: Option<String>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            llm: LlmProvider::LiveKit,
            tts: TtsProvider::OpenAi,
            openai_api_key: None,
            gemini_api_key: None,
            cartesia_api_key: None,
        }
    }
}

impl ProviderConfig {
    /// Environment keys the current selection needs but does not have.
    ///
    /// LiveKit inference rides on the LiveKit credentials, so it adds nothing.
    pub fn missing_keys(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();

        match self.llm {
            LlmProvider::Gemini if self.gemini_api_key.is_none() => missing.push("GEMINI_API_KEY"),
            LlmProvider::OpenAi if self.openai_api_key.is_none() => missing.push("OPENAI_API_KEY"),
            _ => {}
        }

        match self.tts {
            TtsProvider::Cartesia if self.cartesia_api_key.is_none() => missing.push("CARTESIA_API_KEY"),
            TtsProvider::OpenAi if self.openai_api_key.is_none() => missing.push("OPENAI_API_KEY"),
            TtsProvider::Gemini if self.gemini_api_key.is_none() => missing.push("GEMINI_API_KEY"),
            _ => {}
        }

        missing
    }
}

/// SIP trunk account details used by `outdial trunk update`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrunkConfig {
    /// `VOBIZ_USERNAME`
    pub username: Option<String>,
    /// `VOBIZ_PASSWORD`
    #[serde(skip_serializing)]
    pub password: Option<String>,
    /// `VOBIZ_OUTBOUND_NUMBER`
    pub outbound_number: Option<String>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            livekit: LiveKitConfig::default(),
            outbound: OutboundConfig::default(),
            transfer: TransferConfig::default(),
            watchdog: WatchdogConfig::default(),
            retry: RetryConfig::default(),
            providers: ProviderConfig::default(),
            trunk: TrunkConfig::default(),
        }
    }
}

impl AgentConfig {
    /// Load `.env.local` and `.env`, then read the process environment
    pub fn from_env() -> Result<Self> {
        Self::load_env_files();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load the env files of the working directory into the process
    /// environment. Call this before anything else reads a variable.
    pub fn load_env_files() -> Vec<PathBuf> {
        Self::load_env_files_in(Path::new("."))
    }

    /// Load `.env.local` then `.env` from `dir`, returning the files read
    pub fn load_env_files_in(dir: &Path) -> Vec<PathBuf> {
        let mut loaded = Vec::new();
        for file in ENV_FILES {
            let path = dir.join(file);
            match dotenvy::from_path(&path) {
                Ok(()) => {
                    debug!("Loaded environment from {}", path.display());
                    loaded.push(path);
                }
                Err(e) if e.not_found() => {}
                Err(e) => warn!("Ignoring {}: {}", path.display(), e),
            }
        }
        loaded
    }

    /// Build the configuration from any key/value source
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let flag = |key: &str, default: bool| {
            get(key).map_or(default, |v| v.eq_ignore_ascii_case("true"))
        };

        let defaults = Self::default();
        let sip_domain = get("VOBIZ_SIP_DOMAIN");

        let silence_threshold = match get("SILENCE_TRANSFER_SECONDS") {
            Some(raw) => Duration::from_secs(raw.parse::<u64>().map_err(|_| {
                CallEngineError::config(format!("SILENCE_TRANSFER_SECONDS must be a whole number of seconds, got {:?}", raw))
            })?),
            None => defaults.watchdog.silence_threshold,
        };

        let llm = match get("LLM_PROVIDER") {
            Some(raw) => raw.parse()?,
            None => defaults.providers.llm,
        };
        let tts = match get("TTS_PROVIDER") {
            Some(raw) => raw.parse()?,
            None => defaults.providers.tts,
        };

        Ok(Self {
            livekit: LiveKitConfig {
                url: get("LIVEKIT_URL"),
                api_key: get("LIVEKIT_API_KEY"),
                api_secret: get("LIVEKIT_API_SECRET"),
            },
            outbound: OutboundConfig {
                enabled: flag("ENABLE_OUTBOUND_CALLS", false),
                trunk_id: get("OUTBOUND_TRUNK_ID"),
                sip_domain: sip_domain.clone(),
                greeting: get("OUTBOUND_GREETING").unwrap_or(defaults.outbound.greeting),
                agent_name: defaults.outbound.agent_name,
            },
            transfer: TransferConfig {
                enabled: flag("AUTO_TRANSFER_ON_FAILURE", true),
                destination: get("DEFAULT_TRANSFER_NUMBER"),
                sip_domain,
            },
            watchdog: WatchdogConfig {
                silence_threshold,
                ..defaults.watchdog
            },
            retry: defaults.retry,
            providers: ProviderConfig {
                llm,
                tts,
                openai_api_key: get("OPENAI_API_KEY"),
                gemini_api_key: get("GEMINI_API_KEY"),
                cartesia_api_key: get("CARTESIA_API_KEY"),
            },
            trunk: TrunkConfig {
                username: get("VOBIZ_USERNAME"),
                password: get("VOBIZ_PASSWORD"),
                outbound_number: get("VOBIZ_OUTBOUND_NUMBER"),
            },
        })
    }

    /// Check that the agent can run at all.
    ///
    /// Reports every missing key at once: the LiveKit credentials first,
    /// then whatever the selected providers need, without duplicates.
    pub fn validate_runtime(&self) -> Result<()> {
        let mut missing: Vec<&'static str> = Vec::new();
        if self.livekit.url.is_none() {
            missing.push("LIVEKIT_URL");
        }
        if self.livekit.api_key.is_none() {
            missing.push("LIVEKIT_API_KEY");
        }
        if self.livekit.api_secret.is_none() {
            missing.push("LIVEKIT_API_SECRET");
        }
        for key in self.providers.missing_keys() {
            if !missing.contains(&key) {
                missing.push(key);
            }
        }

        if missing.is_empty() {
            Ok(())
        } else {
            Err(CallEngineError::config(format!(
                "Missing required environment variables: {}",
                missing.join(", ")
            )))
        }
    }

    /// Validate the configuration for consistency
    pub fn validate(&self) -> Result<()> {
        if self.watchdog.poll_interval.is_zero() {
            return Err(CallEngineError::config("watchdog poll_interval must be greater than 0"));
        }
        if self.retry.speak.max_attempts == 0 || self.retry.reply.max_attempts == 0 {
            return Err(CallEngineError::config("retry max_attempts must be greater than 0"));
        }
        if self.retry.speak.timeout.is_zero() || self.retry.reply.timeout.is_zero() {
            return Err(CallEngineError::config("retry timeout must be greater than 0"));
        }
        if self.outbound.greeting.is_empty() {
            return Err(CallEngineError::config("outbound greeting cannot be empty"));
        }
        Ok(())
    }
}
