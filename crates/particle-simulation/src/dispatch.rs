//! Dispatch/sync loop
//!
//! Drives the kernel queue through `Uninitialized -> Initialized -> Running`.
//! Frames are awaited; impulses are fire-and-forget and rely on queue order to
//! land before the next frame's integration.

use crate::error::{SimulationError, SimulationResult};
use crate::queue::{Kernel, KernelQueue};
use glam::Vec3;
use particle_physics::{Tunables, IMPULSE_POINT_HEIGHT};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Uninitialized,
    Initialized,
    Running,
}

pub struct Dispatcher<Q: KernelQueue> {
    queue: Q,
    tunables: Tunables,
    tunables_dirty: bool,
    phase: Phase,
    frames: u64,
    impulses: u64,
}

impl<Q: KernelQueue> Dispatcher<Q> {
    pub fn new(queue: Q, tunables: Tunables) -> Self {
        Self {
            queue,
            tunables,
            tunables_dirty: true,
            phase: Phase::Uninitialized,
            frames: 0,
            impulses: 0,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn queue(&self) -> &Q {
        &self.queue
    }

    pub fn tunables(&self) -> &Tunables {
        &self.tunables
    }

    /// Frames integrated so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Impulse kernels submitted so far.
    pub fn impulses(&self) -> u64 {
        self.impulses
    }

    pub fn set_gravity(&mut self, gravity: f32) {
        self.tunables.gravity = gravity;
        self.tunables_dirty = true;
    }

    pub fn set_bounce(&mut self, bounce: f32) {
        self.tunables.bounce = bounce;
        self.tunables_dirty = true;
    }

    pub fn set_friction(&mut self, friction: f32) {
        self.tunables.friction = friction;
        self.tunables_dirty = true;
    }

    pub fn set_size(&mut self, size: f32) {
        self.tunables.size = size;
        self.tunables_dirty = true;
    }

    /// Run the init kernel and wait for it. Only valid once.
    pub fn initialize(&mut self) -> SimulationResult<()> {
        if self.phase != Phase::Uninitialized {
            return Err(SimulationError::InvalidState {
                operation: "initialize",
                phase: self.phase,
            });
        }

        self.flush_tunables();
        self.queue.submit(Kernel::Init);
        self.queue.wait_idle()?;

        self.phase = Phase::Initialized;
        log::info!(
            "Particle store initialized ({} particles)",
            self.queue.particle_count()
        );
        Ok(())
    }

    /// Submit one integration step and wait for it to complete.
    ///
    /// The caller renders after this returns.
    pub fn frame(&mut self) -> SimulationResult<()> {
        match self.phase {
            Phase::Uninitialized => {
                return Err(SimulationError::InvalidState {
                    operation: "step a frame",
                    phase: self.phase,
                })
            }
            Phase::Initialized => {
                log::info!("Simulation running");
                self.phase = Phase::Running;
            }
            Phase::Running => {}
        }

        self.flush_tunables();
        self.queue.submit(Kernel::Integrate);
        self.queue.wait_idle()?;
        self.frames += 1;
        Ok(())
    }

    /// Handle a pointer move over the scene.
    ///
    /// `hit` is the pointer ray's intersection with the ground plane, if any.
    /// Returns whether an impulse was submitted. Impulses are never throttled:
    /// every qualifying move enqueues one more kernel.
    pub fn pointer_moved(&mut self, hit: Option<Vec3>, camera_gesture_active: bool) -> bool {
        if camera_gesture_active {
            return false;
        }
        let Some(hit) = hit else {
            return false;
        };
        if self.phase == Phase::Uninitialized {
            log::debug!("Ignoring pointer move before initialization");
            return false;
        }

        self.tunables.impulse_point = Vec3::new(hit.x, IMPULSE_POINT_HEIGHT, hit.z);
        self.tunables_dirty = true;
        self.flush_tunables();
        self.queue.submit(Kernel::Impulse);
        self.impulses += 1;

        log::debug!(
            "Impulse #{} at ({:.2}, {:.2}, {:.2})",
            self.impulses,
            self.tunables.impulse_point.x,
            self.tunables.impulse_point.y,
            self.tunables.impulse_point.z
        );
        true
    }

    /// Push the host tunables to the queue if they changed.
    fn flush_tunables(&mut self) {
        if self.tunables_dirty {
            self.queue.write_tunables(&self.tunables);
            self.tunables_dirty = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::ReferenceQueue;
    use particle_physics::{
        run_impulse, run_init, run_integrate, GridLayout, ParticleStore, GRID_SPACING,
    };

    fn dispatcher(count: u32) -> Dispatcher<ReferenceQueue> {
        let queue = ReferenceQueue::new(GridLayout::new(count, GRID_SPACING));
        Dispatcher::new(queue, Tunables::default())
    }

    #[test]
    fn test_phase_transitions() {
        let mut d = dispatcher(16);
        assert_eq!(d.phase(), Phase::Uninitialized);
        d.initialize().unwrap();
        assert_eq!(d.phase(), Phase::Initialized);
        d.frame().unwrap();
        assert_eq!(d.phase(), Phase::Running);
        d.frame().unwrap();
        assert_eq!(d.phase(), Phase::Running);
        assert_eq!(d.frames(), 2);
    }

    #[test]
    fn test_initialize_only_once() {
        let mut d = dispatcher(16);
        d.initialize().unwrap();
        let err = d.initialize().unwrap_err();
        assert!(matches!(
            err,
            SimulationError::InvalidState {
                phase: Phase::Initialized,
                ..
            }
        ));
    }

    #[test]
    fn test_frame_requires_initialization() {
        let mut d = dispatcher(16);
        assert!(matches!(
            d.frame(),
            Err(SimulationError::InvalidState {
                phase: Phase::Uninitialized,
                ..
            })
        ));
        assert!(d.queue().executed().is_empty());
    }

    #[test]
    fn test_init_completes_before_returning() {
        let mut d = dispatcher(16);
        d.initialize().unwrap();
        assert_eq!(d.queue().pending(), 0);
        assert_eq!(d.queue().executed(), &[Kernel::Init]);
    }

    #[test]
    fn test_pointer_move_is_filtered() {
        let mut d = dispatcher(16);
        let hit = Some(Vec3::new(0.5, 0.0, 0.5));

        // Before init nothing is dispatched.
        assert!(!d.pointer_moved(hit, false));

        d.initialize().unwrap();
        assert!(!d.pointer_moved(hit, true));
        assert!(!d.pointer_moved(None, false));
        assert_eq!(d.impulses(), 0);

        assert!(d.pointer_moved(hit, false));
        assert_eq!(d.impulses(), 1);
        assert_eq!(d.tunables().impulse_point, Vec3::new(0.5, -1.0, 0.5));
    }

    #[test]
    fn test_impulse_does_not_block() {
        let mut d = dispatcher(16);
        d.initialize().unwrap();
        d.pointer_moved(Some(Vec3::ZERO), false);
        assert_eq!(d.queue().pending(), 1);
    }

    #[test]
    fn test_impulse_between_frames_is_applied_before_next_integration() {
        let count = 16;
        let grid = GridLayout::new(count, GRID_SPACING);
        let mut d = dispatcher(count);
        d.initialize().unwrap();
        d.frame().unwrap();
        d.pointer_moved(Some(Vec3::new(0.1, 0.0, 0.1)), false);
        d.frame().unwrap();

        let mut expected = ParticleStore::zeroed(count);
        let mut tunables = Tunables::default();
        run_init(&mut expected, &grid);
        run_integrate(&mut expected, &tunables);
        tunables.impulse_point = Vec3::new(0.1, -1.0, 0.1);
        run_impulse(&mut expected, &tunables);
        run_integrate(&mut expected, &tunables);

        assert_eq!(d.queue().store(), &expected);
        assert_eq!(
            d.queue().executed(),
            &[
                Kernel::Init,
                Kernel::Integrate,
                Kernel::Impulse,
                Kernel::Integrate
            ]
        );

        // And the impulse really did something.
        let mut without = ParticleStore::zeroed(count);
        run_init(&mut without, &grid);
        run_integrate(&mut without, &tunables);
        run_integrate(&mut without, &tunables);
        assert_ne!(d.queue().store().velocities, without.velocities);
    }

    #[test]
    fn test_rapid_impulses_compound_with_their_own_points() {
        let count = 16;
        let grid = GridLayout::new(count, GRID_SPACING);
        let mut d = dispatcher(count);
        d.initialize().unwrap();

        let first = Vec3::new(0.0, 0.0, 0.0);
        let second = Vec3::new(0.4, 0.0, -0.2);
        d.pointer_moved(Some(first), false);
        d.pointer_moved(Some(second), false);
        d.frame().unwrap();

        let mut expected = ParticleStore::zeroed(count);
        let mut tunables = Tunables::default();
        run_init(&mut expected, &grid);
        tunables.impulse_point = Vec3::new(first.x, -1.0, first.z);
        run_impulse(&mut expected, &tunables);
        tunables.impulse_point = Vec3::new(second.x, -1.0, second.z);
        run_impulse(&mut expected, &tunables);
        run_integrate(&mut expected, &tunables);

        assert_eq!(d.queue().store(), &expected);
        assert_eq!(d.impulses(), 2);
    }

    #[test]
    fn test_tunable_changes_reach_the_next_frame() {
        let count = 4;
        let grid = GridLayout::new(count, GRID_SPACING);
        let mut d = dispatcher(count);
        d.initialize().unwrap();
        d.set_gravity(0.0);
        d.set_friction(0.97);
        d.frame().unwrap();

        let mut expected = ParticleStore::zeroed(count);
        run_init(&mut expected, &grid);
        run_integrate(
            &mut expected,
            &Tunables {
                gravity: 0.0,
                friction: 0.97,
                ..Tunables::default()
            },
        );
        assert_eq!(d.queue().store(), &expected);
        // Nothing moves without gravity or velocity.
        assert!(d.queue().store().velocities.iter().all(|v| *v == Vec3::ZERO));
    }

    #[test]
    fn test_floor_invariant_over_many_frames() {
        let mut d = dispatcher(64);
        d.initialize().unwrap();
        for frame in 0..200 {
            if frame % 7 == 0 {
                d.pointer_moved(Some(Vec3::new(0.3, 0.0, -0.3)), false);
            }
            d.frame().unwrap();
            assert!(d.queue().store().positions.iter().all(|p| p.y >= 0.0));
        }
    }
}
