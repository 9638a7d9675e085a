//! Global code generation flags consulted while resolving loop hints.

/// Compiler flags that influence loop metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodeGenOptions {
    /// `-O` level; zero means optimizations are off.
    pub optimization_level: u8,
    /// `-funroll-loops` (true) versus `-fno-unroll-loops` (false).
    pub unroll_loops: bool,
}

impl Default for CodeGenOptions {
    fn default() -> Self {
        Self {
            optimization_level: 0,
            unroll_loops: true,
        }
    }
}

impl CodeGenOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_optimization_level(mut self, level: u8) -> Self {
        self.optimization_level = level;
        self
    }

    pub fn with_unroll_loops(mut self, unroll: bool) -> Self {
        self.unroll_loops = unroll;
        self
    }

    pub fn optimizations_enabled(&self) -> bool {
        self.optimization_level > 0
    }
}
