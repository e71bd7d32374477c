//! Receive a message once, then deliver it to every target concurrently

use std::{io, sync::Arc};

use maildrop_common::{Envelope, mailbox, tracing};
use maildrop_maildir::{AtomicWriter, FilenameGenerator, Published};
use tokio::{
    io::{AsyncRead, AsyncReadExt},
    task::JoinSet,
};

use crate::{
    config::DeliveryConfig,
    error::DeliveryError,
    outcome::{Outcome, TargetReport},
    target::{DeliveryTarget, targets_for},
};

#[derive(Debug)]
struct Inner {
    config: DeliveryConfig,
    writer: AtomicWriter,
    filenames: FilenameGenerator,
}

/// Delivers messages to local Maildir mailboxes.
///
/// Cheap to clone; clones share configuration and the filename sequence, so
/// a single coordinator should be shared by every connection.
#[derive(Debug, Clone)]
pub struct DeliveryCoordinator {
    inner: Arc<Inner>,
}

impl DeliveryCoordinator {
    pub fn new(config: DeliveryConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                writer: AtomicWriter::from(&config.mailbox),
                filenames: FilenameGenerator::new(),
                config,
            }),
        }
    }

    /// The targets a message with this envelope would be delivered to
    pub fn targets(&self, envelope: &Envelope) -> Vec<DeliveryTarget> {
        targets_for(envelope, &self.inner.config)
    }

    /// Read `source` to the end, then deliver it.
    ///
    /// The message is received in full before any mailbox is touched, so if
    /// the source fails every target is reported failed and nothing is
    /// written anywhere.
    #[tracing::instrument(level = tracing::Level::DEBUG, skip_all, fields(connection = envelope.connection_id()))]
    pub async fn deliver<R>(&self, mut source: R, envelope: &Envelope) -> Outcome
    where
        R: AsyncRead + Unpin,
    {
        let mut data = Vec::new();

        if let Err(e) = source.read_to_end(&mut data).await {
            tracing::error!(
                connection = envelope.connection_id(),
                received = data.len(),
                error = %e,
                "Failed to receive message"
            );

            let reports = self
                .targets(envelope)
                .into_iter()
                .map(|target| TargetReport {
                    target,
                    result: Err(DeliveryError::Receive(io::Error::new(
                        e.kind(),
                        e.to_string(),
                    ))),
                })
                .collect();

            return Outcome::new(reports);
        }

        self.deliver_data(Arc::from(data), envelope).await
    }

    /// Deliver an already received message to every target.
    ///
    /// Targets are written concurrently and independently, a failure for one
    /// doesn't stop the others. Dropping the returned future aborts any
    /// deliveries still in flight, and their temp files are removed.
    #[tracing::instrument(level = tracing::Level::DEBUG, skip_all, fields(connection = envelope.connection_id(), size = data.len()))]
    pub async fn deliver_data(&self, data: Arc<[u8]>, envelope: &Envelope) -> Outcome {
        let targets = self.targets(envelope);
        let mut tasks = JoinSet::new();

        for (index, target) in targets.iter().cloned().enumerate() {
            let this = self.clone();
            let data = Arc::clone(&data);
            let connection_id = envelope.connection_id().to_owned();
            let host = envelope.host().to_owned();

            tasks.spawn(async move {
                let result = this.deliver_to(&target, &data, &connection_id, &host).await;
                (index, result)
            });
        }

        let mut results: Vec<Option<Result<Published, DeliveryError>>> =
            targets.iter().map(|_| None).collect();

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, result)) => results[index] = Some(result),
                Err(e) => tracing::error!(error = %e, "Delivery task did not complete"),
            }
        }

        let reports = targets
            .into_iter()
            .zip(results)
            .map(|(target, result)| {
                let result = result.unwrap_or_else(|| {
                    Err(DeliveryError::Aborted(String::from(
                        "delivery task did not complete",
                    )))
                });

                match &result {
                    Ok(published) => mailbox!(
                        level = INFO,
                        "Delivered {} ({} bytes) to {target}",
                        published.filename,
                        published.size
                    ),
                    Err(e) => tracing::error!(
                        recipient = %target,
                        connection = envelope.connection_id(),
                        path = ?e.path(),
                        error = %e,
                        "Failed to deliver message"
                    ),
                }

                TargetReport { target, result }
            })
            .collect();

        Outcome::new(reports)
    }

    async fn deliver_to(
        &self,
        target: &DeliveryTarget,
        data: &[u8],
        connection_id: &str,
        host: &str,
    ) -> Result<Published, DeliveryError> {
        let layout = &self.inner.config.mailbox;

        let paths = layout.resolve(target.address(), target.folder())?;
        layout.ensure_directories(&paths).await?;

        let filename = self.inner.filenames.generate(connection_id, host);
        let mut source = data;
        let published = self
            .inner
            .writer
            .write(&mut source, &paths, &filename)
            .await?;

        Ok(published)
    }
}
