use crate::pipeline::{Orchestrator, RunOutcome};
use std::future::Future;
use the_reviewer_ipc::{error::IpcError, sub::IpcSubscriber, ReviewRequest};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// Pulls [`ReviewRequest`]s pushed by an external scheduler and reviews them.
#[derive(Debug)]
pub struct RequestHandler {
    orchestrator: Orchestrator,
    subscriber: IpcSubscriber<ReviewRequest>,
}

impl RequestHandler {
    pub fn new(orchestrator: Orchestrator, subscriber: IpcSubscriber<ReviewRequest>) -> Self {
        Self {
            orchestrator,
            subscriber,
        }
    }

    /// Receive requests until interrupted with ctrl-c.
    pub async fn start(self) {
        self.run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for ctrl-c: {e:?}");
                std::future::pending::<()>().await;
            }
        })
        .await;
    }

    /// Receive requests until `shutdown` completes or the socket closes, then let
    /// the reviews already started finish. Interrupting again while draining
    /// cancels them.
    #[tracing::instrument(skip_all)]
    pub async fn run_until(self, shutdown: impl Future<Output = ()> + Send) {
        tokio::pin!(shutdown);
        let mut reviews = JoinSet::new();
        // Runs are bounded by the orchestrator, this only keeps the backlog in check
        let backlog = self.orchestrator.workers();
        // Kept across iterations, a dropped receive could still take a request
        let mut next = Box::pin(self.subscriber.recv());

        loop {
            let request = tokio::select! {
                _ = &mut shutdown => break,
                Some(finished) = reviews.join_next() => {
                    log_finished(finished);
                    continue;
                }
                request = &mut next, if reviews.len() < backlog => {
                    next = Box::pin(self.subscriber.recv());
                    request
                }
            };

            let request = match request {
                Ok(request) => request,
                Err(IpcError::Closed) => {
                    error!("Review request socket closed");
                    break;
                }
                Err(e) => {
                    error!("Error receiving review request: {e:?}");
                    continue;
                }
            };
            debug!("Got review request: {request:?}");

            let orchestrator = self.orchestrator.clone();
            reviews.spawn(async move { handle_request(&orchestrator, request).await });
        }

        info!("No longer accepting requests");
        drop(next);
        self.subscriber.close();

        if !reviews.is_empty() {
            info!("Waiting for {} request(s) in progress", reviews.len());
        }
        let drain = async {
            while let Some(finished) = reviews.join_next().await {
                log_finished(finished);
            }
        };
        tokio::select! {
            _ = drain => {}
            _ = tokio::signal::ctrl_c() => {
                warn!("Interrupted again, cancelling reviews in progress");
            }
        }
        reviews.shutdown().await;
    }
}

fn log_finished(finished: Result<Vec<RunOutcome>, tokio::task::JoinError>) {
    match finished {
        Ok(outcomes) => {
            for outcome in outcomes {
                info!("{outcome}");
            }
        }
        Err(e) => error!("Review request task did not finish: {e:?}"),
    }
}

/// Review everything a single request asks for.
pub async fn handle_request(orchestrator: &Orchestrator, request: ReviewRequest) -> Vec<RunOutcome> {
    info!("Reviewing {}", request.describe());
    match request {
        ReviewRequest::Match { match_id } => vec![orchestrator.run(&match_id).await],
        ReviewRequest::Summoner { riot_id, count } => {
            match orchestrator.review_summoner(&riot_id, count).await {
                Ok(outcomes) => outcomes,
                Err(e) => {
                    error!(kind = %e.kind(), "Failed to list matches of {riot_id}: {e}");
                    Vec::new()
                }
            }
        }
    }
}
