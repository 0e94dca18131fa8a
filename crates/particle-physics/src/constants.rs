//! Physical constants and defaults for the particle field
//!
//! Units are world units per frame: the simulation has no `dt`, every kernel
//! invocation advances one fixed step.

/// Default number of particles allocated at startup
pub const DEFAULT_PARTICLE_COUNT: u32 = 200_000;

/// Distance between neighbouring particles on the initial grid
pub const GRID_SPACING: f32 = 0.2;

/// Added to the particle index before hashing the second color channel
pub const COLOR_HASH_SHIFT: u32 = 2;

/// Gravity applied to `velocity.y` every step (negative is down)
pub const DEFAULT_GRAVITY: f32 = -0.00098;

/// Fraction of vertical speed kept when bouncing off the floor
pub const DEFAULT_BOUNCE: f32 = 0.8;

/// Global velocity damping applied every step
pub const DEFAULT_FRICTION: f32 = 0.99;

/// Rendered sprite size in world units
pub const DEFAULT_SIZE: f32 = 0.12;

/// Extra damping of horizontal velocity on floor contact
pub const FLOOR_FRICTION: f32 = 0.9;

/// Height of the floor plane
pub const FLOOR_HEIGHT: f32 = 0.0;

/// Particles further than this from the impulse point are not pushed
pub const IMPULSE_RADIUS: f32 = 3.0;

/// Velocity gained per world unit inside the impulse radius
pub const IMPULSE_STRENGTH: f32 = 0.01;

/// Per-particle impulse multiplier is `hash(index) * JITTER_SCALE + JITTER_BIAS`
pub const IMPULSE_JITTER_SCALE: f32 = 1.5;
pub const IMPULSE_JITTER_BIAS: f32 = 0.5;

/// The picked ground point is lowered to this height before it becomes the
/// impulse origin, so resting particles get pushed up as well as out.
pub const IMPULSE_POINT_HEIGHT: f32 = -1.0;

// Control panel ranges: (min, max, step)
pub const GRAVITY_RANGE: (f32, f32, f32) = (-0.0098, 0.0, 0.0001);
pub const BOUNCE_RANGE: (f32, f32, f32) = (0.1, 1.0, 0.01);
pub const FRICTION_RANGE: (f32, f32, f32) = (0.96, 0.99, 0.01);
pub const SIZE_RANGE: (f32, f32, f32) = (0.12, 0.5, 0.01);
