use thiserror::Error;

#[derive(Error, Debug)]
pub enum RankingError {
    #[error("Failed to score a feature row: {0}")]
    Scoring(#[from] trainer::TrainerError),

    #[error("Score for {driver_id} in season {season} is not a finite number")]
    NonFiniteScore { driver_id: String, season: i32 },
}
