use crate::common::fs::{self, CleanupGuard};
use crate::errors::BotError;
use crate::infrastructure::ffmpeg::encode;
use crate::infrastructure::ffmpeg::progress::ProgressEvent;
use crate::modules::chat::model::{self, UploadedVideo};
use crate::modules::session::model::Session;
use crate::state::AppState;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Conversation flow controller.
///
/// Both entry points recover every error at this boundary: the user gets a
/// readable message, the log gets the detail, job files are removed and the
/// conversation drops back to idle. No single conversation's failure
/// terminates the process.
pub struct ChatService;

impl ChatService {
    /// Transport entry point: a file has been staged for this conversation.
    pub async fn on_video_uploaded(state: AppState, conversation: Uuid, upload: UploadedVideo) {
        if let Err(e) = Self::handle_upload(&state, conversation, &upload).await {
            Self::recover(&state, conversation, e).await;
        }
    }

    /// Transport entry point: the user pressed one of the offered options.
    pub async fn on_option_selected(state: AppState, conversation: Uuid, token: &str) {
        if let Err(e) = Self::handle_selection(&state, conversation, token).await {
            Self::recover(&state, conversation, e).await;
        }
    }

    async fn handle_upload(
        state: &AppState,
        conversation: Uuid,
        upload: &UploadedVideo,
    ) -> Result<(), BotError> {
        // The staged file is ours until the session takes it over.
        let mut staged = CleanupGuard::new();
        staged.add(&upload.path);

        if !upload.is_video() {
            return Err(BotError::UnsupportedInput(upload.file_name.clone()));
        }
        if state.sessions.is_job_active(conversation) {
            return Err(BotError::JobAlreadyRunning);
        }

        let resolution = crate::infrastructure::ffmpeg::probe::resolution(&upload.path).await?;

        // Last write wins: a second upload before a selection replaces the
        // prior session, and the displaced input must not leak on disk. The
        // store refuses the swap if a job claimed the slot during the probe;
        // a running job's input must never be pulled out from under it.
        if let Some(old) = state
            .sessions
            .put_if_idle(conversation, Session::new(upload.path.clone(), resolution))?
        {
            fs::remove_if_exists(&old.input_path);
        }
        staged.disarm();
        info!(%conversation, %resolution, "session opened, awaiting selection");

        state
            .transport
            .present_choices(
                conversation,
                &format!(
                    "Current resolution: {}\nChoose how to process the video.",
                    resolution
                ),
                &model::available_choices(resolution),
            )
            .await?;
        Ok(())
    }

    async fn handle_selection(
        state: &AppState,
        conversation: Uuid,
        token: &str,
    ) -> Result<(), BotError> {
        // Single job slot per conversation; released on drop.
        let _job = state
            .sessions
            .try_begin_job(conversation)
            .ok_or(BotError::JobAlreadyRunning)?;

        // A selection without a prior upload is a recoverable user error, and
        // no file operations happen on this path.
        let session = state
            .sessions
            .get(conversation)
            .ok_or(BotError::SessionNotFound)?;
        let spec = model::spec_for_token(token)?;
        let waited = time::OffsetDateTime::now_utc() - session.created_at;
        info!(%conversation, token, ?waited, "starting job");

        let output = state
            .config
            .outputs_dir()
            .join(format!("{}-{}.mp4", conversation, Uuid::new_v4()));

        // Input and output are removed on every exit path from here on.
        let mut files = CleanupGuard::new();
        files.add(&session.input_path);
        files.add(&output);

        let activity = spec.activity();
        let status = state
            .transport
            .send_text(conversation, &format!("{}... 0% complete", activity))
            .await?;

        let (tx, mut rx) = mpsc::unbounded_channel::<ProgressEvent>();
        let transport = state.transport.clone();
        let relay = tokio::spawn(async move {
            // One edit per distinct percent; the runner already de-duplicates.
            while let Some(event) = rx.recv().await {
                let text = format!("{}... {}% complete", activity, event.percent);
                if let Err(e) = transport.edit_text(&status, &text).await {
                    warn!("dropping progress updates: {}", e);
                    break;
                }
            }
        });

        let result = encode::run(&session.input_path, &output, &spec, tx).await;
        let _ = relay.await;
        result?;

        state.transport.send_file(conversation, &output).await?;
        state.sessions.clear(conversation);
        info!(%conversation, "job delivered");
        Ok(())
    }

    async fn recover(state: &AppState, conversation: Uuid, error: BotError) {
        error!(%conversation, %error, "conversation job failed");

        // A busy conversation keeps its state (the in-flight job still owns
        // the session and its files), and a rejected non-video upload leaves
        // any pending session as it was; only the staged duplicate goes.
        if !matches!(
            error,
            BotError::JobAlreadyRunning | BotError::UnsupportedInput(_)
        ) {
            if let Some(session) = state.sessions.clear(conversation) {
                fs::remove_if_exists(&session.input_path);
            }
        }

        if let Err(e) = state
            .transport
            .send_text(conversation, &error.user_message())
            .await
        {
            error!(%conversation, "could not report failure to user: {}", e);
        }
    }
}
