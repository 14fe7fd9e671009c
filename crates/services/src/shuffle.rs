use rand::Rng;
use rand::seq::SliceRandom;

use mcq_core::model::{PermutationError, Question, SessionQuestion};

/// Randomizes question order and per-question option order.
pub struct ShuffleEngine;

impl ShuffleEngine {
    /// Shuffle with the thread-local RNG.
    ///
    /// # Errors
    ///
    /// Returns `PermutationError` only if a generated option order is not a
    /// permutation, which indicates a bug.
    pub fn shuffle(questions: &[Question]) -> Result<Vec<SessionQuestion>, PermutationError> {
        let mut rng = rand::rng();
        Self::shuffle_with(questions, &mut rng)
    }

    /// Fisher-Yates over the question order, then independently over each
    /// question's options. Option labels are stripped and reassigned by position.
    ///
    /// # Errors
    ///
    /// See [`ShuffleEngine::shuffle`].
    pub fn shuffle_with<R: Rng + ?Sized>(
        questions: &[Question],
        rng: &mut R,
    ) -> Result<Vec<SessionQuestion>, PermutationError> {
        let mut ordered: Vec<&Question> = questions.iter().collect();
        ordered.as_mut_slice().shuffle(rng);

        ordered
            .into_iter()
            .map(|question| {
                let mut order: Vec<usize> = (0..question.options().len()).collect();
                order.as_mut_slice().shuffle(rng);
                SessionQuestion::from_permutation(question, &order)
            })
            .collect()
    }
}
