use crate::config::env::{self, EnvKey};
use std::path::PathBuf;

#[derive(Clone, Debug)]
pub struct AppConfig {
    /// Transport access token. Required; startup aborts without it.
    pub bot_token: String,
    pub server_port: u16,
    /// Root directory for staged uploads and encoder outputs.
    pub work_dir: PathBuf,
    pub max_upload_bytes: usize,
}

impl AppConfig {
    pub fn new() -> Result<Self, std::env::VarError> {
        Ok(Self {
            bot_token: env::get(EnvKey::BotToken)?,
            server_port: env::get_parsed(EnvKey::ServerPort, 3000),
            work_dir: PathBuf::from(env::get_or(EnvKey::WorkDir, "/tmp/vidbot")),
            max_upload_bytes: env::get_parsed(EnvKey::MaxUploadMb, 512) * 1024 * 1024,
        })
    }

    pub fn uploads_dir(&self) -> PathBuf {
        self.work_dir.join("uploads")
    }

    pub fn outputs_dir(&self) -> PathBuf {
        self.work_dir.join("outputs")
    }
}
