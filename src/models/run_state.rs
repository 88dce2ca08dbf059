/// Counters for a single run.
///
/// Owned by the [`RunController`](crate::controller::RunController) for exactly one
/// run and never persisted. Every processed entity lands in exactly one of the two
/// counters, so `kept + removed` is always the number of processed entities.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RunState {
    pub kept_count: usize,
    pub removed_count: usize,

    /// Removed (or would-be removed in dry-run) identifiers, in processing order
    pub removed_identifiers: Vec<String>,
}

impl RunState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an entity that stays in the list
    pub fn record_kept(&mut self) {
        self.kept_count += 1;
    }

    /// Record an entity whose terminal action was applied
    pub fn record_removed(&mut self, identifier: &str) {
        self.removed_count += 1;
        self.removed_identifiers.push(identifier.to_string());
    }

    /// Number of entities processed so far
    pub fn processed(&self) -> usize {
        self.kept_count + self.removed_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_partition_processed_entities() {
        let mut state = RunState::new();
        state.record_kept();
        state.record_removed("bot_1");
        state.record_removed("bot_2");

        assert_eq!(state.kept_count, 1);
        assert_eq!(state.removed_count, 2);
        assert_eq!(state.processed(), 3);
        assert_eq!(state.removed_identifiers, vec!["bot_1", "bot_2"]);
    }
}
