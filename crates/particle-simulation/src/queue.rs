//! Ordered kernel submission
//!
//! Every kernel that touches the particle store goes through one FIFO queue.
//! Queue order is the only synchronization: a kernel submitted after another
//! observes all of its writes. Tunables are snapshotted at submission time, so
//! "write, then submit" is all the host has to get right.

use crate::error::SimulationResult;
use particle_physics::{run_impulse, run_init, run_integrate, GridLayout, ParticleStore, Tunables};
use std::collections::VecDeque;

/// The three simulation kernels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kernel {
    Init,
    Integrate,
    Impulse,
}

impl Kernel {
    pub fn label(self) -> &'static str {
        match self {
            Kernel::Init => "Init Compute Pass",
            Kernel::Integrate => "Integration Compute Pass",
            Kernel::Impulse => "Impulse Compute Pass",
        }
    }
}

/// A device that runs kernels over the particle store in submission order.
pub trait KernelQueue {
    /// Stage new tunables; visible to every kernel submitted afterwards.
    fn write_tunables(&mut self, tunables: &Tunables);

    /// Enqueue a kernel over every particle index. Returns immediately.
    fn submit(&mut self, kernel: Kernel);

    /// Block until everything submitted so far has finished.
    fn wait_idle(&mut self) -> SimulationResult<()>;

    fn particle_count(&self) -> u32;
}

/// How many executed kernels [`ReferenceQueue`] remembers.
pub const EXECUTED_HISTORY: usize = 1024;

/// CPU stand-in for the GPU queue, running the reference kernels.
///
/// Submissions are deferred until [`KernelQueue::wait_idle`], the way an
/// asynchronous device only guarantees results after its completion signal.
pub struct ReferenceQueue {
    store: ParticleStore,
    grid: GridLayout,
    staged: Tunables,
    pending: VecDeque<(Kernel, Tunables)>,
    executed: VecDeque<Kernel>,
}

impl ReferenceQueue {
    pub fn new(grid: GridLayout) -> Self {
        Self {
            store: ParticleStore::zeroed(grid.particle_count),
            grid,
            staged: Tunables::default(),
            pending: VecDeque::new(),
            executed: VecDeque::with_capacity(EXECUTED_HISTORY),
        }
    }

    pub fn store(&self) -> &ParticleStore {
        &self.store
    }

    /// Kernels still waiting to run.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// The last [`EXECUTED_HISTORY`] kernels that have run, oldest first.
    pub fn executed(&self) -> &VecDeque<Kernel> {
        &self.executed
    }
}

impl KernelQueue for ReferenceQueue {
    fn write_tunables(&mut self, tunables: &Tunables) {
        self.staged = *tunables;
    }

    fn submit(&mut self, kernel: Kernel) {
        self.pending.push_back((kernel, self.staged));
    }

    fn wait_idle(&mut self) -> SimulationResult<()> {
        while let Some((kernel, tunables)) = self.pending.pop_front() {
            match kernel {
                Kernel::Init => run_init(&mut self.store, &self.grid),
                Kernel::Integrate => run_integrate(&mut self.store, &tunables),
                Kernel::Impulse => run_impulse(&mut self.store, &tunables),
            }
            if self.executed.len() == EXECUTED_HISTORY {
                self.executed.pop_front();
            }
            self.executed.push_back(kernel);
        }
        Ok(())
    }

    fn particle_count(&self) -> u32 {
        self.grid.particle_count
    }
}
