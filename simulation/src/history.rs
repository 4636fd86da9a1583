use std::fmt;

/// Weighted-mean metrics of one communication round.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoundMetrics {
    pub round: usize,
    pub train_loss: f32,
    pub train_accuracy: f32,
    pub test_loss: f32,
    pub test_accuracy: f32,
}

impl fmt::Display for RoundMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "round {:>3}: train loss {:.4} acc {:.4} | test loss {:.4} acc {:.4}",
            self.round, self.train_loss, self.train_accuracy, self.test_loss, self.test_accuracy
        )
    }
}

/// Per-round metric record of a simulation run.
#[derive(Debug, Default, Clone)]
pub struct History {
    rounds: Vec<RoundMetrics>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, metrics: RoundMetrics) {
        self.rounds.push(metrics);
    }

    #[inline]
    pub fn rounds(&self) -> &[RoundMetrics] {
        &self.rounds
    }

    #[inline]
    pub fn last(&self) -> Option<&RoundMetrics> {
        self.rounds.last()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.rounds.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rounds.is_empty()
    }
}

impl fmt::Display for History {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for round in &self.rounds {
            writeln!(f, "{round}")?;
        }
        Ok(())
    }
}
