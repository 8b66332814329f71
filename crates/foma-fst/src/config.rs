// Traversal limits and the per-lookup DFS state.
//
// A lookup walks the graph with an explicit stack of frames instead of
// recursion. Each frame remembers how far the output buffer and the flag
// environment stack had grown when it was entered, so backtracking is a
// truncate plus an index reset.

use crate::StateId;
use crate::symbols::SymbolId;

/// Default bound on the number of non-consuming arcs along one path.
pub const DEFAULT_MAX_DEPTH: usize = 2000;

/// Resource limits applied to every lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraversalLimits {
    /// Most arcs without input, on one path, a lookup may follow before it
    /// gives up with
    /// [`LookupError::DepthLimitExceeded`](crate::LookupError::DepthLimitExceeded).
    /// Arcs that consume input do not count, so a path is at most
    /// `input length + max_depth` long. Epsilon cycles are the usual way to hit it.
    pub max_depth: usize,
}

impl Default for TraversalLimits {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// One level of the DFS stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    pub state: StateId,
    /// Index of the next outgoing arc of `state` to try.
    pub next_transition: usize,
    /// Number of input symbols consumed on the way here.
    pub input_depth: usize,
    /// Output buffer length on entry.
    pub output_len: usize,
    /// Flag row index on entry.
    pub flag_depth: usize,
    /// Whether acceptance has already been checked for this frame.
    pub visited: bool,
}

impl Frame {
    pub fn root(state: StateId) -> Self {
        Self {
            state,
            next_transition: 0,
            input_depth: 0,
            output_len: 0,
            flag_depth: 0,
            visited: false,
        }
    }
}

/// Mutable state of one lookup.
///
/// Flag environments use copy-on-push: the flattened
/// `flag_value_stack[depth * feature_count + feature]` holds one row per
/// flag taken along the current path, and backtracking only moves
/// `flag_depth` back.
#[derive(Debug, Clone)]
pub struct TraversalConfig {
    pub frames: Vec<Frame>,
    /// Output-tape symbols along the current path.
    pub output: Vec<SymbolId>,
    pub flag_value_stack: Vec<u16>,
    pub flag_depth: usize,
    flag_feature_count: usize,
}

impl TraversalConfig {
    pub fn new(flag_feature_count: u16) -> Self {
        let fc = flag_feature_count as usize;
        Self {
            frames: Vec::new(),
            output: Vec::new(),
            flag_value_stack: vec![0; fc],
            flag_depth: 0,
            flag_feature_count: fc,
        }
    }

    /// Clear all stacks and start a new search at `initial`.
    pub fn reset(&mut self, initial: Option<StateId>) {
        self.frames.clear();
        self.output.clear();
        self.flag_depth = 0;
        self.flag_value_stack.truncate(self.flag_feature_count);
        self.flag_value_stack.fill(0);
        if let Some(state) = initial {
            self.frames.push(Frame::root(state));
        }
    }

    /// Flag values at the current depth.
    #[inline]
    pub fn current_flags(&self) -> &[u16] {
        let fc = self.flag_feature_count;
        let start = self.flag_depth * fc;
        &self.flag_value_stack[start..start + fc]
    }

    #[inline]
    pub fn current_flags_mut(&mut self) -> &mut [u16] {
        let fc = self.flag_feature_count;
        let start = self.flag_depth * fc;
        &mut self.flag_value_stack[start..start + fc]
    }

    /// Copy the current flag row forward and make the copy current.
    #[inline]
    pub fn push_flags(&mut self) {
        let fc = self.flag_feature_count;
        if fc == 0 {
            return;
        }
        let src_start = self.flag_depth * fc;
        let dst_start = src_start + fc;
        if self.flag_value_stack.len() < dst_start + fc {
            self.flag_value_stack.resize(dst_start + fc, 0);
        }
        self.flag_value_stack
            .copy_within(src_start..dst_start, dst_start);
        self.flag_depth += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_limits() {
        assert_eq!(TraversalLimits::default().max_depth, DEFAULT_MAX_DEPTH);
    }

    #[test]
    fn config_creation() {
        let config = TraversalConfig::new(3);
        assert!(config.frames.is_empty());
        assert_eq!(config.flag_value_stack.len(), 3);
        assert_eq!(config.current_flags(), &[0, 0, 0]);
    }

    #[test]
    fn config_no_flags() {
        let mut config = TraversalConfig::new(0);
        assert!(config.current_flags().is_empty());
        config.push_flags();
        assert_eq!(config.flag_depth, 0);
    }

    #[test]
    fn push_flags_copies_row() {
        let mut config = TraversalConfig::new(3);
        config.current_flags_mut().copy_from_slice(&[5, 10, 15]);

        config.push_flags();
        assert_eq!(config.flag_depth, 1);
        assert_eq!(config.current_flags(), &[5, 10, 15]);

        config.current_flags_mut()[0] = 99;
        config.flag_depth -= 1;
        assert_eq!(config.current_flags(), &[5, 10, 15]);
    }

    #[test]
    fn push_flags_grows_on_demand() {
        let mut config = TraversalConfig::new(2);
        for depth in 1..=50u16 {
            config.push_flags();
            config.current_flags_mut()[1] = depth;
        }
        assert_eq!(config.flag_depth, 50);
        assert_eq!(config.flag_value_stack.len(), 2 * 51);
        assert_eq!(config.current_flags(), &[0, 50]);
    }

    #[test]
    fn reset_clears_everything() {
        let mut config = TraversalConfig::new(2);
        config.current_flags_mut()[0] = 42;
        config.push_flags();
        config.output.extend([3, 4, 5]);
        config.frames.push(Frame::root(7));

        config.reset(Some(1));

        assert_eq!(config.frames, vec![Frame::root(1)]);
        assert!(config.output.is_empty());
        assert_eq!(config.flag_depth, 0);
        assert_eq!(config.flag_value_stack, vec![0, 0]);

        config.reset(None);
        assert!(config.frames.is_empty());
    }
}
