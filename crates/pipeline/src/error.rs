use core_types::Stage;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    /// A stage had nothing to work on, or produced nothing for the next one.
    #[error("{stage} stage cannot continue: expected {precondition}")]
    EmptyStage { stage: Stage, precondition: &'static str },

    #[error("{stage} stage failed: {source}")]
    Stage {
        stage: Stage,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl PipelineError {
    pub fn stage(&self) -> Stage {
        match self {
            PipelineError::EmptyStage { stage, .. } | PipelineError::Stage { stage, .. } => *stage,
        }
    }
}

/// Wraps a collaborator error with the stage it happened in.
pub(crate) fn at<E>(stage: Stage) -> impl FnOnce(E) -> PipelineError
where
    E: std::error::Error + Send + Sync + 'static,
{
    move |e| PipelineError::Stage { stage, source: Box::new(e) }
}
