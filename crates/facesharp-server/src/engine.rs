use facesharp_core::{AnalysisResult, FaceAnalyzer};
use facesharp_detect::MeshDetector;
use image::DynamicImage;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("detector error: {0}")]
    Detector(#[from] facesharp_detect::DetectorError),
    #[error("engine thread exited")]
    ChannelClosed,
}

/// Messages sent from HTTP handlers to the engine thread.
enum EngineRequest {
    Analyze {
        image: DynamicImage,
        reply: oneshot::Sender<AnalysisResult>,
    },
}

/// Clone-safe handle to the engine thread.
#[derive(Clone)]
pub struct EngineHandle {
    tx: mpsc::Sender<EngineRequest>,
}

impl EngineHandle {
    /// Run one image through the analysis pipeline.
    pub async fn analyze(&self, image: DynamicImage) -> Result<AnalysisResult, EngineError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(EngineRequest::Analyze {
                image,
                reply: reply_tx,
            })
            .await
            .map_err(|_| EngineError::ChannelClosed)?;
        reply_rx.await.map_err(|_| EngineError::ChannelClosed)
    }
}

/// Spawn the analysis engine on a dedicated OS thread.
///
/// Loads the face-mesh model synchronously (fail-fast), then enters a
/// request loop. The detector handle is owned by this one thread and never
/// invoked concurrently; it is released when the channel closes and the
/// thread exits.
pub fn spawn_engine(model_path: &str, queue_depth: usize) -> Result<EngineHandle, EngineError> {
    let detector = MeshDetector::load(model_path)?;
    tracing::info!(path = model_path, "face-mesh detector loaded");

    let mut analyzer = FaceAnalyzer::new(Box::new(detector));
    let (tx, mut rx) = mpsc::channel::<EngineRequest>(queue_depth.max(1));

    std::thread::Builder::new()
        .name("facesharp-engine".into())
        .spawn(move || {
            tracing::info!("engine thread started");
            while let Some(req) = rx.blocking_recv() {
                match req {
                    EngineRequest::Analyze { image, reply } => {
                        let result = analyzer.analyze(&image);
                        let _ = reply.send(result);
                    }
                }
            }
            tracing::info!("engine thread exiting");
        })
        .expect("failed to spawn engine thread");

    Ok(EngineHandle { tx })
}
