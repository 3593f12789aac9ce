//! Artifact downloads: execute a ticket and stream the body to disk.

use std::path::Path;
use std::time::Duration;

use tracing::{debug, info, instrument, warn};

use super::RestGuard;
use super::error::GuardError;
use super::writer::{ArtifactWriter, DigestAlgorithm};
use crate::specs::{Artifact, Ticket};

impl RestGuard {
    /// Executes the ticket and streams the response body to `destination`,
    /// returning its size and MD5 digest.
    ///
    /// # Errors
    ///
    /// See [`download_with_digest`](Self::download_with_digest).
    pub async fn download(
        &self,
        ticket: &mut Ticket,
        destination: impl AsRef<Path>,
    ) -> Result<Artifact, GuardError> {
        self.download_with_digest(ticket, destination, DigestAlgorithm::Md5)
            .await
    }

    /// Executes the ticket and streams the response body to `destination`
    /// using the given digest.
    ///
    /// The destination file is created before any network activity. Only a
    /// `200` response is accepted, even when the service validator accepts
    /// other statuses. On any failure the partial file is removed.
    ///
    /// # Errors
    ///
    /// - [`GuardError::FileIo`] if the file cannot be created or written
    /// - errors of [`execute`](Self::execute)
    /// - [`GuardError::InvalidResponse`] for a missing response or a status
    ///   other than 200
    /// - [`GuardError::Transport`] if reading the body fails midway
    pub async fn download_with_digest(
        &self,
        ticket: &mut Ticket,
        destination: impl AsRef<Path>,
        algorithm: DigestAlgorithm,
    ) -> Result<Artifact, GuardError> {
        self.download_with_timeout(ticket, destination, algorithm, 0)
            .await
    }

    /// Like [`download_with_digest`](Self::download_with_digest), bounded by
    /// a total budget covering every attempt and the body transfer.
    ///
    /// The partial file is removed on expiry too. Zero seconds means no
    /// deadline.
    ///
    /// # Errors
    ///
    /// [`GuardError::DeadlineExceeded`] on expiry, otherwise the errors of
    /// [`download_with_digest`](Self::download_with_digest).
    #[instrument(skip(self, ticket, destination), fields(ticket = %ticket.id(), path = %destination.as_ref().display()))]
    pub async fn download_with_timeout(
        &self,
        ticket: &mut Ticket,
        destination: impl AsRef<Path>,
        algorithm: DigestAlgorithm,
        seconds: u64,
    ) -> Result<Artifact, GuardError> {
        let mut writer = ArtifactWriter::create(destination.as_ref(), algorithm).await?;

        let filled = if seconds == 0 {
            self.fill_artifact(ticket, &mut writer).await
        } else {
            tokio::time::timeout(
                Duration::from_secs(seconds),
                self.fill_artifact(ticket, &mut writer),
            )
            .await
            .unwrap_or_else(|_| {
                warn!(seconds, "download deadline exceeded");
                Err(GuardError::deadline_exceeded(seconds))
            })
        };

        if let Err(error) = filled {
            writer.discard().await;
            return Err(error);
        }

        let artifact = writer.close().await?;
        info!(
            path = %artifact.path().display(),
            bytes = artifact.size(),
            digest = %artifact.digest(),
            "download complete"
        );
        Ok(artifact)
    }

    async fn fill_artifact(
        &self,
        ticket: &mut Ticket,
        writer: &mut ArtifactWriter,
    ) -> Result<(), GuardError> {
        self.execute(ticket).await?;

        let url = ticket
            .request()
            .map(|request| request.url().to_string())
            .unwrap_or_default();
        let Some(response) = ticket.response_mut() else {
            return Err(GuardError::invalid_response(None));
        };
        let status = response.status().as_u16();
        if status != 200 {
            return Err(GuardError::invalid_response(Some(status)));
        }

        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| GuardError::transport(url.clone(), e))?
        {
            writer.write(&chunk).await?;
        }
        debug!(bytes = writer.count(), "response body drained");
        Ok(())
    }
}
