use crate::core::dispatch::Outcome;
use serde::Serialize;
use std::fmt;

/// Tally for one pass over the download queue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunCounter {
    pub total: u32,
    pub success: u32,
    pub error: u32,
    pub unavailable: u32,
    pub not_song: u32,
}

impl RunCounter {
    pub fn record(&mut self, outcome: &Outcome) {
        self.total += 1;
        match outcome {
            Outcome::Success | Outcome::SkippedPrecondition(_) => self.success += 1,
            Outcome::Unavailable(_) => self.unavailable += 1,
            Outcome::NotSong(_) => self.not_song += 1,
            Outcome::Failed(_) => self.error += 1,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn warnings(&self) -> u32 {
        self.unavailable + self.not_song
    }
}

impl fmt::Display for RunCounter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "=======  [\u{2714} ] Completed: {}/{}  |  [\u{26A0} ] Warnings: {}  |  [\u{2716} ] Errors: {}  =======",
            self.success,
            self.total,
            self.warnings(),
            self.error
        )
    }
}
