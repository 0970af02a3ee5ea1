//! Shared handles every session of a process works with.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::config::SessionSettings;
use crate::llm::LanguageService;
use crate::remote::AssistantsBackend;

/// Remote backend, language service, settings and the cancellation token.
///
/// Cheap to clone; nested sessions share their parent's runtime.
#[derive(Clone)]
pub struct Runtime {
    backend: Arc<dyn AssistantsBackend>,
    language: Arc<dyn LanguageService>,
    settings: Arc<SessionSettings>,
    cancel: CancellationToken,
}

impl Runtime {
    pub fn new(
        backend: Arc<dyn AssistantsBackend>,
        language: Arc<dyn LanguageService>,
        settings: SessionSettings,
    ) -> Self {
        Self {
            backend,
            language,
            settings: Arc::new(settings),
            cancel: CancellationToken::new(),
        }
    }

    /// OpenAI-backed runtime built from a loaded config.
    #[cfg(feature = "openai")]
    pub fn from_config(config: &crate::config::ParleyConfig) -> crate::error::Result<Self> {
        let backend = crate::remote::openai::OpenAiAssistants::from_config(config)?;
        let language = crate::llm::openai::OpenAiChat::from_config(config)?;
        Ok(Self::new(
            Arc::new(backend),
            Arc::new(language),
            config.settings.clone(),
        ))
    }

    /// Use `token` to interrupt poll and backoff waits.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn backend(&self) -> &Arc<dyn AssistantsBackend> {
        &self.backend
    }

    pub fn language(&self) -> &Arc<dyn LanguageService> {
        &self.language
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("settings", &self.settings)
            .field("canceled", &self.cancel.is_cancelled())
            .finish()
    }
}
