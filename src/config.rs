/// Default arena capacity, in cons cells.
pub const DEFAULT_HEAP_CAPACITY: usize = 1 << 20;

/// Default number of allocations between collections.
pub const DEFAULT_GC_THRESHOLD: usize = 1 << 16;

/// Tunables for a `Machine`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MachineConfig {
    /// Maximum number of live cons cells before allocation fails.
    pub heap_capacity: usize,
    /// Allocations between collection cycles. Grows when the arena stays full.
    pub gc_threshold: usize,
}

impl Default for MachineConfig {
    fn default() -> Self {
        MachineConfig {
            heap_capacity: DEFAULT_HEAP_CAPACITY,
            gc_threshold: DEFAULT_GC_THRESHOLD,
        }
    }
}

impl MachineConfig {
    pub fn with_heap_capacity(mut self, cells: usize) -> Self {
        self.heap_capacity = cells;
        self
    }

    pub fn with_gc_threshold(mut self, allocs: usize) -> Self {
        self.gc_threshold = allocs;
        self
    }
}
