//! Per-particle kernels
//!
//! NOTE: These are reference implementations for documentation and testing.
//! The actual simulation runs the WGSL compute shaders in `particle-simulation`,
//! which must stay line-for-line equivalent to the functions below.

use crate::constants::*;
use crate::grid::GridLayout;
use crate::hash::hash;
use crate::particle::{particle_color, ParticleStore};
use crate::tunables::Tunables;
use glam::Vec3;

/// Init: place particle `index` on the grid, at rest, with its hashed color.
pub fn init_particle(
    index: u32,
    grid: &GridLayout,
    position: &mut Vec3,
    velocity: &mut Vec3,
    color: &mut Vec3,
) {
    *position = grid.position(index);
    *velocity = Vec3::ZERO;
    *color = particle_color(index);
}

/// One integration step: gravity, move, damp, then floor response.
pub fn integrate_particle(position: &mut Vec3, velocity: &mut Vec3, tunables: &Tunables) {
    *velocity += Vec3::new(0.0, tunables.gravity, 0.0);
    *position += *velocity;
    *velocity *= tunables.friction;

    if position.y < FLOOR_HEIGHT {
        position.y = FLOOR_HEIGHT;
        velocity.y = -velocity.y * tunables.bounce;

        velocity.x *= FLOOR_FRICTION;
        velocity.z *= FLOOR_FRICTION;
    }
}

/// Push particle `index` away from `point`, falling off linearly to zero at
/// `IMPULSE_RADIUS`. Only the velocity changes.
pub fn impulse_particle(index: u32, position: Vec3, velocity: &mut Vec3, point: Vec3) {
    let offset = position - point;
    let dist = offset.length();
    // A particle sitting exactly on the point has no direction to be pushed in.
    let direction = offset.normalize_or_zero();
    let dist_area = (IMPULSE_RADIUS - dist).max(0.0);

    let power = dist_area * IMPULSE_STRENGTH;
    let relative_power = power * (hash(index) * IMPULSE_JITTER_SCALE + IMPULSE_JITTER_BIAS);

    *velocity += direction * relative_power;
}

/// Run the init kernel over the whole store.
pub fn run_init(store: &mut ParticleStore, grid: &GridLayout) {
    debug_assert_eq!(store.len(), grid.particle_count as usize);
    for (index, ((position, velocity), color)) in store
        .positions
        .iter_mut()
        .zip(store.velocities.iter_mut())
        .zip(store.colors.iter_mut())
        .enumerate()
    {
        init_particle(index as u32, grid, position, velocity, color);
    }
}

/// Run the integration kernel over the whole store.
pub fn run_integrate(store: &mut ParticleStore, tunables: &Tunables) {
    for (position, velocity) in store.positions.iter_mut().zip(store.velocities.iter_mut()) {
        integrate_particle(position, velocity, tunables);
    }
}

/// Run the impulse kernel over the whole store, centred on `tunables.impulse_point`.
pub fn run_impulse(store: &mut ParticleStore, tunables: &Tunables) {
    for (index, (position, velocity)) in store
        .positions
        .iter()
        .zip(store.velocities.iter_mut())
        .enumerate()
    {
        impulse_particle(index as u32, *position, velocity, tunables.impulse_point);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    fn approx(a: f32, b: f32, eps: f32) -> bool {
        (a - b).abs() <= eps
    }

    #[test]
    fn test_floor_invariant_holds_for_random_states() {
        let mut rng = rand::rng();
        let tunables = Tunables::default();
        for _ in 0..10_000 {
            let mut position = Vec3::new(
                rng.random_range(-50.0..50.0),
                rng.random_range(0.0..5.0),
                rng.random_range(-50.0..50.0),
            );
            let mut velocity = Vec3::new(
                rng.random_range(-1.0..1.0),
                rng.random_range(-10.0..10.0),
                rng.random_range(-1.0..1.0),
            );
            integrate_particle(&mut position, &mut velocity, &tunables);
            assert!(position.y >= 0.0, "position.y = {}", position.y);
        }
    }

    #[test]
    fn test_floor_bounce_response() {
        let tunables = Tunables::default();
        let v = -0.5;
        let mut position = Vec3::ZERO;
        let mut velocity = Vec3::new(0.2, v, -0.3);
        integrate_particle(&mut position, &mut velocity, &tunables);

        // Friction is applied before the floor response in the same step.
        let damped_y = (v + tunables.gravity) * tunables.friction;
        assert_eq!(position.y, 0.0);
        assert!(approx(velocity.y, -damped_y * tunables.bounce, 1e-7));
        assert!(approx(velocity.x, 0.2 * tunables.friction * FLOOR_FRICTION, 1e-7));
        assert!(approx(velocity.z, -0.3 * tunables.friction * FLOOR_FRICTION, 1e-7));
    }

    #[test]
    fn test_friction_shrinks_speed_in_the_air() {
        let mut rng = rand::rng();
        let tunables = Tunables {
            gravity: 0.0,
            ..Tunables::default()
        };
        for _ in 0..1_000 {
            let mut position = Vec3::new(0.0, 100.0, 0.0);
            let mut velocity = Vec3::new(
                rng.random_range(-1.0..1.0),
                rng.random_range(-1.0..1.0),
                rng.random_range(-1.0..1.0),
            );
            let before = velocity.length();
            integrate_particle(&mut position, &mut velocity, &tunables);
            assert!(velocity.length() <= before * tunables.friction + 1e-6);
        }
    }

    #[test]
    fn test_impulse_outside_radius_leaves_velocity_unchanged() {
        let point = Vec3::new(0.0, -1.0, 0.0);
        for (i, position) in [
            Vec3::new(3.0, -1.0, 0.0),
            Vec3::new(0.0, 2.0, 0.0),
            Vec3::new(10.0, 0.0, -4.0),
        ]
        .into_iter()
        .enumerate()
        {
            let original = Vec3::new(0.1, -0.2, 0.3);
            let mut velocity = original;
            impulse_particle(i as u32, position, &mut velocity, point);
            assert_eq!(velocity, original);
        }
    }

    #[test]
    fn test_impulse_pushes_away_with_jitter() {
        let point = Vec3::new(0.0, -1.0, 0.0);
        let position = Vec3::new(1.0, 0.0, 0.0);
        let index = 42;
        let mut velocity = Vec3::ZERO;
        impulse_particle(index, position, &mut velocity, point);

        let dist = (position - point).length();
        let expected = (IMPULSE_RADIUS - dist)
            * IMPULSE_STRENGTH
            * (hash(index) * IMPULSE_JITTER_SCALE + IMPULSE_JITTER_BIAS);
        assert!(approx(velocity.length(), expected, 1e-7));
        // Away from the point: positive x, upward y.
        assert!(velocity.x > 0.0 && velocity.y > 0.0);
        assert!(approx(velocity.x, velocity.y, 1e-7));
    }

    #[test]
    fn test_impulse_at_point_is_finite() {
        let mut velocity = Vec3::ONE;
        impulse_particle(0, Vec3::ZERO, &mut velocity, Vec3::ZERO);
        assert_eq!(velocity, Vec3::ONE);
    }

    #[test]
    fn test_init_is_idempotent() {
        let grid = GridLayout::new(1_000, GRID_SPACING);
        let mut a = ParticleStore::zeroed(1_000);
        let mut b = ParticleStore::zeroed(1_000);
        run_init(&mut a, &grid);
        run_init(&mut b, &grid);
        run_init(&mut b, &grid);
        assert_eq!(a, b);
    }

    #[test]
    fn test_four_particle_scenario() {
        let grid = GridLayout::new(4, 0.2);
        let tunables = Tunables {
            gravity: -0.00098,
            friction: 0.99,
            bounce: 0.8,
            ..Tunables::default()
        };
        let mut store = ParticleStore::zeroed(4);
        run_init(&mut store, &grid);
        run_integrate(&mut store, &tunables);

        for i in 0..4 {
            // Pre-clamp y was -0.00098; the floor clamp moved it back up.
            assert_eq!(store.positions[i].y, 0.0);
            let vy = store.velocities[i].y;
            assert!(approx(vy, 0.00098 * 0.99 * 0.8, 1e-9), "vy = {vy}");
            assert!(approx(vy, 0.00078, 1e-5));
            assert_eq!(store.velocities[i].x, 0.0);
            assert_eq!(store.velocities[i].z, 0.0);
        }
    }

    #[test]
    fn test_colors_survive_integration_and_impulse() {
        let grid = GridLayout::new(16, 0.2);
        let mut store = ParticleStore::zeroed(16);
        run_init(&mut store, &grid);
        let colors = store.colors.clone();

        let tunables = Tunables {
            impulse_point: Vec3::new(0.0, -1.0, 0.0),
            ..Tunables::default()
        };
        run_impulse(&mut store, &tunables);
        run_integrate(&mut store, &tunables);
        assert_eq!(store.colors, colors);
    }
}
