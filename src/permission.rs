//! Camera and microphone permission probe

use tracing::{info, warn};

use crate::capture::{CaptureBackend, MediaConstraints};
use crate::error::AcquisitionError;
use crate::ui::{Notice, UserInterface};

/// Request combined video+audio access and release the probe stream at once
///
/// Nothing is retained on success. On failure the user is notified once,
/// with denial reported separately from other acquisition errors.
pub async fn check_permissions(
    backend: &dyn CaptureBackend,
    ui: &dyn UserInterface,
) -> Result<(), AcquisitionError> {
    match backend
        .get_user_media(MediaConstraints::video_and_audio())
        .await
    {
        Ok(mut probe) => {
            probe.stop_tracks();
            info!("Permission probe succeeded on {} ({})", backend.name(), probe.id());
            Ok(())
        }
        Err(e) => {
            warn!("Permission probe failed on {}: {}", backend.name(), e);
            ui.notify(Notice::PermissionRequired {
                denied: e.is_permission_denied(),
                detail: e.to_string(),
            });
            Err(e)
        }
    }
}
