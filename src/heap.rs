use crate::error::{LispError, LispResult};
use crate::value::{PairId, Value};

/// A single cons cell on the heap.
pub struct ConsCell {
    pub car: Value,
    pub cdr: Value,
    pub mark: bool,
}

/// The cons cell heap. All pairs (lists, environments, closures) are
/// allocated here. PairId is an index into `cells`, so capacity never
/// exceeds what a `u32` can address.
pub struct Heap {
    cells: Vec<ConsCell>,
    free_list: Vec<PairId>,
    capacity: usize,
    /// Number of allocations since last GC (for triggering).
    allocs_since_gc: usize,
    /// GC threshold: trigger GC when allocs_since_gc reaches this.
    gc_threshold: usize,
}

impl Heap {
    pub fn new(capacity: usize, gc_threshold: usize) -> Self {
        let capacity = capacity.min(u32::MAX as usize);
        Heap {
            cells: Vec::with_capacity(1024.min(capacity)),
            free_list: Vec::new(),
            capacity,
            allocs_since_gc: 0,
            gc_threshold: gc_threshold.max(1),
        }
    }

    /// Allocate a new cons cell. Returns a PairId.
    /// Returns Err(HeapExhausted) if capacity is exceeded.
    pub fn alloc(&mut self, car: Value, cdr: Value) -> LispResult<PairId> {
        self.allocs_since_gc += 1;

        if let Some(id) = self.free_list.pop() {
            let cell = &mut self.cells[id.0 as usize];
            cell.car = car;
            cell.cdr = cdr;
            cell.mark = false;
            return Ok(id);
        }

        if self.cells.len() >= self.capacity {
            return Err(LispError::HeapExhausted {
                capacity: self.capacity,
            });
        }

        let id = PairId(self.cells.len() as u32);
        self.cells.push(ConsCell {
            car,
            cdr,
            mark: false,
        });
        Ok(id)
    }

    /// Allocate a pair and wrap it as a Value.
    pub fn cons(&mut self, car: Value, cdr: Value) -> LispResult<Value> {
        Ok(Value::Pair(self.alloc(car, cdr)?))
    }

    /// Get the car of a pair.
    #[inline]
    pub fn car(&self, id: PairId) -> Value {
        self.cells[id.0 as usize].car
    }

    /// Get the cdr of a pair.
    #[inline]
    pub fn cdr(&self, id: PairId) -> Value {
        self.cells[id.0 as usize].cdr
    }

    /// Set the car of a pair.
    #[inline]
    pub fn set_car(&mut self, id: PairId, val: Value) {
        self.cells[id.0 as usize].car = val;
    }

    /// Set the cdr of a pair.
    #[inline]
    pub fn set_cdr(&mut self, id: PairId, val: Value) {
        self.cells[id.0 as usize].cdr = val;
    }

    /// Car of a Value; fails for anything that is not a pair, Nil included.
    pub fn car_val(&self, val: Value) -> LispResult<Value> {
        match val {
            Value::Pair(id) => Ok(self.car(id)),
            other => Err(LispError::Type(format!(
                "car of non-pair {}",
                other.type_name()
            ))),
        }
    }

    /// Cdr of a Value; fails for anything that is not a pair, Nil included.
    pub fn cdr_val(&self, val: Value) -> LispResult<Value> {
        match val {
            Value::Pair(id) => Ok(self.cdr(id)),
            other => Err(LispError::Type(format!(
                "cdr of non-pair {}",
                other.type_name()
            ))),
        }
    }

    pub fn set_car_val(&mut self, target: Value, val: Value) -> LispResult<()> {
        match target {
            Value::Pair(id) => {
                self.set_car(id, val);
                Ok(())
            }
            other => Err(LispError::Type(format!(
                "set-car! of non-pair {}",
                other.type_name()
            ))),
        }
    }

    pub fn set_cdr_val(&mut self, target: Value, val: Value) -> LispResult<()> {
        match target {
            Value::Pair(id) => {
                self.set_cdr(id, val);
                Ok(())
            }
            other => Err(LispError::Type(format!(
                "set-cdr! of non-pair {}",
                other.type_name()
            ))),
        }
    }

    /// Build a proper list from a slice of values.
    pub fn list(&mut self, values: &[Value]) -> LispResult<Value> {
        let mut result = Value::Nil;
        for &val in values.iter().rev() {
            result = self.cons(val, result)?;
        }
        Ok(result)
    }

    /// Returns true if this value is a proper list (Nil-terminated chain of
    /// pairs). A dotted tail gives false rather than an error.
    pub fn is_proper_list(&self, val: Value) -> bool {
        let mut current = val;
        loop {
            match current {
                Value::Nil => return true,
                Value::Pair(id) => current = self.cdr(id),
                _ => return false,
            }
        }
    }

    /// Collect a proper list into a Vec. Returns None if not a proper list.
    pub fn list_to_vec(&self, val: Value) -> Option<Vec<Value>> {
        let mut result = Vec::new();
        let mut current = val;
        loop {
            match current {
                Value::Nil => return Some(result),
                Value::Pair(id) => {
                    result.push(self.car(id));
                    current = self.cdr(id);
                }
                _ => return None,
            }
        }
    }

    /// Length of the pair chain, ignoring any dotted tail.
    pub fn list_len(&self, val: Value) -> usize {
        let mut count = 0;
        let mut current = val;
        while let Value::Pair(id) = current {
            count += 1;
            current = self.cdr(id);
        }
        count
    }

    /// Shallow copy of a list spine: new pairs, same car values. Nested
    /// pairs are shared. A dotted tail is carried over as-is.
    pub fn list_copy(&mut self, list: Value) -> LispResult<Value> {
        let Value::Pair(first) = list else {
            return Ok(list);
        };
        let head = self.alloc(self.car(first), Value::Nil)?;
        let mut last = head;
        let mut current = self.cdr(first);
        while let Value::Pair(id) = current {
            let next = self.alloc(self.car(id), Value::Nil)?;
            self.set_cdr(last, Value::Pair(next));
            last = next;
            current = self.cdr(id);
        }
        self.set_cdr(last, current);
        Ok(Value::Pair(head))
    }

    /// Reverse a list in place, returning the new head.
    pub fn list_reverse(&mut self, list: Value) -> Value {
        let mut reversed = Value::Nil;
        let mut current = list;
        while let Value::Pair(id) = current {
            let next = self.cdr(id);
            self.set_cdr(id, reversed);
            reversed = current;
            current = next;
        }
        reversed
    }

    /// Split a closure or macro record `(env . (params . body))`.
    pub fn closure_parts(&self, id: PairId) -> (Value, Value, Value) {
        let env = self.car(id);
        match self.cdr(id) {
            Value::Pair(rest) => (env, self.car(rest), self.cdr(rest)),
            _ => (env, Value::Nil, Value::Nil),
        }
    }

    /// Returns the number of allocated cells (including free-listed ones).
    pub fn total_cells(&self) -> usize {
        self.cells.len()
    }

    /// Returns the number of cells on the free list.
    pub fn free_count(&self) -> usize {
        self.free_list.len()
    }

    /// Returns the number of live cells (approximate, accurate after GC).
    pub fn live_count(&self) -> usize {
        self.cells.len() - self.free_list.len()
    }

    /// Cells that can still be handed out without exceeding capacity.
    pub fn remaining(&self) -> usize {
        self.free_list.len() + self.capacity.saturating_sub(self.cells.len())
    }

    /// Returns true if we should trigger a GC cycle: either the allocation
    /// counter crossed the threshold, or the arena is close to full and
    /// enough was allocated since the last cycle to be worth a pass.
    pub fn should_gc(&self) -> bool {
        if self.allocs_since_gc >= self.gc_threshold {
            return true;
        }
        let low_water = (self.capacity / 16).clamp(1, 4096);
        self.allocs_since_gc >= (low_water / 8).max(1) && self.remaining() < low_water
    }

    /// Reset alloc counter after GC.
    pub fn reset_gc_counter(&mut self) {
        self.allocs_since_gc = 0;
    }

    /// Adjust GC threshold based on occupancy.
    pub fn adjust_gc_threshold(&mut self) {
        let live = self.live_count();
        let total = self.total_cells();
        if total > 0 && live * 4 > total * 3 {
            // High occupancy: double the threshold to avoid thrashing
            self.gc_threshold = (self.gc_threshold * 2).min(self.capacity.max(1));
        }
    }

    // === GC methods ===

    /// Clear all mark bits (phase 1 of mark-sweep).
    pub fn clear_marks(&mut self) {
        for cell in &mut self.cells {
            cell.mark = false;
        }
    }

    /// Mark a value as reachable. Pairs, closures and macros all own a cell.
    pub fn mark_value(&mut self, val: Value, worklist: &mut Vec<PairId>) {
        let id = match val {
            Value::Pair(id) | Value::Closure(id) | Value::Macro(id) => id,
            _ => return,
        };
        let cell = &mut self.cells[id.0 as usize];
        if !cell.mark {
            cell.mark = true;
            worklist.push(id);
        }
    }

    /// Process the mark worklist: for each marked pair, mark its car and cdr.
    pub fn process_worklist(&mut self, worklist: &mut Vec<PairId>) {
        while let Some(id) = worklist.pop() {
            let car = self.cells[id.0 as usize].car;
            let cdr = self.cells[id.0 as usize].cdr;
            self.mark_value(car, worklist);
            self.mark_value(cdr, worklist);
        }
    }

    /// Sweep: collect unmarked cells to free list (phase 2 of mark-sweep).
    /// Returns the number of cells reclaimed.
    pub fn sweep(&mut self) -> usize {
        self.free_list.clear();
        for i in 0..self.cells.len() {
            if !self.cells[i].mark {
                self.free_list.push(PairId(i as u32));
                self.cells[i].car = Value::Nil;
                self.cells[i].cdr = Value::Nil;
            }
        }
        self.free_list.len()
    }

    /// Full collection from the given roots.
    pub fn collect(&mut self, roots: &[Value]) -> usize {
        self.clear_marks();
        let mut worklist = Vec::new();
        for &root in roots {
            self.mark_value(root, &mut worklist);
        }
        self.process_worklist(&mut worklist);
        let freed = self.sweep();
        self.reset_gc_counter();
        self.adjust_gc_threshold();
        freed
    }
}
