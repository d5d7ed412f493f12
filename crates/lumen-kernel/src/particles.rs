//! Fixed-pool particle system.
//!
//! A [`ParticleSystem`] owns a pool of particles that is allocated once and
//! never resized. Every slot is spawned at construction; afterwards a particle
//! whose life runs out is respawned in place rather than removed. All particles
//! share one quad mesh and one texture, so they differ only in their transform.
//!
//! The simulation is fixed-step: each call to [`ParticleSystem::update`]
//! advances exactly one tick, independent of wall-clock time. Callers that want
//! frame-rate independence drive it from a fixed-rate accumulator.

use glam::Vec3;
use lumen_common::{GpuError, LumenResult};
use tracing::{debug, info, trace};

use crate::billboard::{billboard_angle, model_matrix};
use crate::config::ParticleSystemConfig;
use crate::particle::Particle;
use crate::quad::{PARTICLE_QUAD, QUAD_VERTEX_COUNT};
use crate::shader::{
    MeshHandle, ParticleBackend, ParticleShader, TextureHandle, Uniform, UniformValue,
};
use crate::spawn::{FastRandSpawner, SpawnRng, SpawnTemplate};

/// Texture unit the particle texture is bound to.
pub const PARTICLE_TEXTURE_UNIT: u32 = 0;

/// A pool of textured, optionally billboarded particles.
pub struct ParticleSystem<R: SpawnRng = FastRandSpawner> {
    /// Particle pool; length fixed at construction.
    particles: Box<[Particle]>,
    /// Values copied into particles on spawn.
    template: SpawnTemplate,
    /// Rotate quads towards the viewer.
    billboarding: bool,
    /// Alpha factor uploaded on every render.
    visibility: f32,
    /// Render-space translation added to every particle.
    anchor: Vec3,
    /// `slowdown * 1000`.
    step_divisor: f32,
    /// Texture shared by all particles.
    texture: TextureHandle,
    /// Quad shared by all particles.
    mesh: MeshHandle,
    /// Random source for spawns.
    rng: R,
}

impl ParticleSystem {
    /// Creates a particle system with a randomly seeded spawner.
    ///
    /// Loads the texture and uploads the shared quad through `backend`, then
    /// spawns every particle in the pool.
    pub fn new<B: ParticleBackend + ?Sized>(
        config: &ParticleSystemConfig,
        backend: &mut B,
    ) -> LumenResult<Self> {
        Self::with_rng(config, backend, FastRandSpawner::new())
    }
}

impl<R: SpawnRng> ParticleSystem<R> {
    /// Creates a particle system drawing spawn values from `rng`.
    pub fn with_rng<B: ParticleBackend + ?Sized>(
        config: &ParticleSystemConfig,
        backend: &mut B,
        rng: R,
    ) -> LumenResult<Self> {
        config.validate()?;

        let texture = backend.load_texture(&config.texture_path)?;
        debug!("Particle texture loaded from {}", config.texture_path.display());

        let mesh = match backend.create_quad_mesh(&PARTICLE_QUAD) {
            Ok(mesh) => mesh,
            Err(e) => {
                backend.release_texture(texture);
                return Err(e.into());
            },
        };

        let count = config.resolved_count();
        let mut system = Self {
            particles: vec![Particle::default(); count].into_boxed_slice(),
            template: config.spawn_template(),
            billboarding: config.billboarding,
            visibility: config.visibility,
            anchor: config.anchor,
            step_divisor: config.step_divisor(),
            texture,
            mesh,
            rng,
        };
        system.spawn_all();

        info!(
            "Particle system initialized: {} particles, {} origin, billboarding {}",
            count,
            if config.fixed_position { "fixed" } else { "area" },
            if config.billboarding { "on" } else { "off" },
        );

        Ok(system)
    }

    /// Spawns every slot from the template.
    fn spawn_all(&mut self) {
        for particle in self.particles.iter_mut() {
            self.template.spawn(particle, &mut self.rng);
        }
    }

    /// Advances the simulation by one tick.
    ///
    /// Each active particle moves by `velocity / (slowdown * 1000)`, gains its
    /// gravity, and loses `fade` life. Particles whose life drops below zero
    /// are respawned. Returns the number of respawns.
    pub fn update(&mut self) -> usize {
        let mut respawned = 0;

        for particle in self.particles.iter_mut().filter(|p| p.active) {
            if particle.advance(self.step_divisor) {
                self.template.respawn(particle, &mut self.rng);
                respawned += 1;
            }
        }

        trace!("Particle tick: {} respawned", respawned);
        respawned
    }

    /// Runs `steps` consecutive ticks. Returns the total number of respawns.
    pub fn update_steps(&mut self, steps: u32) -> usize {
        (0..steps).map(|_| self.update()).sum()
    }

    /// Draws every active particle through `shader`.
    ///
    /// Visibility and the texture binding are uploaded once, then each active
    /// particle gets its own model matrix and one quad draw, in pool order.
    /// `view_direction` is the camera's forward vector and only matters when
    /// billboarding is on. Returns the number of draw calls issued.
    pub fn render<S: ParticleShader + ?Sized>(
        &self,
        shader: &mut S,
        view_direction: Vec3,
        scale: Vec3,
    ) -> Result<usize, GpuError> {
        shader.set_uniform(Uniform::Visibility, UniformValue::Float(self.visibility))?;
        shader.set_uniform(
            Uniform::ParticleTexture,
            UniformValue::Texture {
                unit: PARTICLE_TEXTURE_UNIT,
                texture: self.texture,
            },
        )?;

        let yaw = self.billboarding.then(|| billboard_angle(view_direction));
        let mut draws = 0;

        for particle in self.particles.iter().filter(|p| p.active) {
            let model = model_matrix(self.anchor, particle.position, scale, yaw);
            shader.set_uniform(Uniform::Model, UniformValue::Mat4(model))?;
            shader.draw_quad(self.mesh, QUAD_VERTEX_COUNT)?;
            draws += 1;
        }

        Ok(draws)
    }

    /// Releases the texture and quad mesh back to `backend`.
    pub fn release<B: ParticleBackend + ?Sized>(self, backend: &mut B) {
        backend.release_mesh(self.mesh);
        backend.release_texture(self.texture);
    }

    /// Number of particles in the pool.
    #[must_use]
    pub fn particle_count(&self) -> usize {
        self.particles.len()
    }

    /// Number of particles currently active.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.particles.iter().filter(|p| p.active).count()
    }

    /// All particles in pool order.
    #[must_use]
    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    /// Gets a particle by slot index.
    #[must_use]
    pub fn particle(&self, index: usize) -> Option<&Particle> {
        self.particles.get(index)
    }

    /// Gets a mutable particle by slot index.
    pub fn particle_mut(&mut self, index: usize) -> Option<&mut Particle> {
        self.particles.get_mut(index)
    }

    /// Spawn template in use.
    #[must_use]
    pub const fn template(&self) -> &SpawnTemplate {
        &self.template
    }

    /// Whether billboarding is on.
    #[must_use]
    pub const fn billboarding(&self) -> bool {
        self.billboarding
    }

    /// Enables or disables billboarding.
    pub fn set_billboarding(&mut self, enabled: bool) {
        self.billboarding = enabled;
    }

    /// Alpha factor uploaded on render.
    #[must_use]
    pub const fn visibility(&self) -> f32 {
        self.visibility
    }

    /// Render-space anchor.
    #[must_use]
    pub const fn anchor(&self) -> Vec3 {
        self.anchor
    }

    /// Shared texture.
    #[must_use]
    pub const fn texture(&self) -> TextureHandle {
        self.texture
    }

    /// Shared quad mesh.
    #[must_use]
    pub const fn mesh(&self) -> MeshHandle {
        self.mesh
    }
}

impl<R: SpawnRng> Drop for ParticleSystem<R> {
    fn drop(&mut self) {
        debug!("Particle system destroyed ({} particles)", self.particles.len());
    }
}

impl<R: SpawnRng> std::fmt::Debug for ParticleSystem<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParticleSystem")
            .field("particle_count", &self.particles.len())
            .field("template", &self.template)
            .field("billboarding", &self.billboarding)
            .field("visibility", &self.visibility)
            .field("texture", &self.texture)
            .field("mesh", &self.mesh)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    use glam::Mat4;
    use lumen_common::{LumenError, ResourceLoadError};
    use proptest::prelude::*;

    use crate::quad::QuadVertex;
    use crate::spawn::FADE_MIN;

    /// Backend that hands out sequential handles and counts calls.
    #[derive(Default)]
    struct RecordingBackend {
        texture_loads: Vec<std::path::PathBuf>,
        meshes: Vec<Vec<QuadVertex>>,
        released_textures: Vec<TextureHandle>,
        released_meshes: Vec<MeshHandle>,
        fail_texture: bool,
        fail_mesh: bool,
    }

    impl ParticleBackend for RecordingBackend {
        fn load_texture(&mut self, path: &Path) -> Result<TextureHandle, LumenError> {
            self.texture_loads.push(path.to_path_buf());
            if self.fail_texture {
                return Err(ResourceLoadError::NotFound(path.to_path_buf()).into());
            }
            Ok(TextureHandle::new(self.texture_loads.len() as u32))
        }

        fn create_quad_mesh(&mut self, vertices: &[QuadVertex]) -> Result<MeshHandle, GpuError> {
            if self.fail_mesh {
                return Err(GpuError::BufferAlloc("out of memory".to_string()));
            }
            self.meshes.push(vertices.to_vec());
            Ok(MeshHandle::new(100 + self.meshes.len() as u32))
        }

        fn release_texture(&mut self, texture: TextureHandle) {
            self.released_textures.push(texture);
        }

        fn release_mesh(&mut self, mesh: MeshHandle) {
            self.released_meshes.push(mesh);
        }
    }

    /// Shader that records every call.
    #[derive(Default)]
    struct RecordingShader {
        uniforms: Vec<(Uniform, UniformValue)>,
        draws: Vec<(MeshHandle, u32)>,
    }

    impl RecordingShader {
        fn count(&self, uniform: Uniform) -> usize {
            self.uniforms.iter().filter(|(u, _)| *u == uniform).count()
        }

        fn models(&self) -> Vec<Mat4> {
            self.uniforms
                .iter()
                .filter_map(|(u, v)| match (u, v) {
                    (Uniform::Model, UniformValue::Mat4(m)) => Some(*m),
                    _ => None,
                })
                .collect()
        }
    }

    impl ParticleShader for RecordingShader {
        fn set_uniform(&mut self, uniform: Uniform, value: UniformValue) -> Result<(), GpuError> {
            self.uniforms.push((uniform, value));
            Ok(())
        }

        fn draw_quad(&mut self, mesh: MeshHandle, vertex_count: u32) -> Result<(), GpuError> {
            self.draws.push((mesh, vertex_count));
            Ok(())
        }
    }

    /// Spawner with a constant fade and maximal jitter.
    struct PinnedFade(f32);

    impl SpawnRng for PinnedFade {
        fn fade(&mut self) -> f32 {
            self.0
        }

        fn jitter(&mut self, extent: u32) -> f32 {
            (extent - 1) as f32
        }
    }

    fn scenario_config() -> ParticleSystemConfig {
        ParticleSystemConfig::new("rain.png")
            .with_count(2)
            .with_fixed_position(true)
            .with_area(Vec3::ZERO, Vec3::new(30.0, 1.0, 30.0))
            .with_motion(Vec3::new(0.0, -10.0, 0.0), Vec3::new(0.0, -1.0, 0.0))
            .with_life(1.0)
    }

    #[test]
    fn test_scenario_fixed_origin_lifecycle() {
        let mut backend = RecordingBackend::default();
        let mut system = ParticleSystem::with_rng(&scenario_config(), &mut backend, PinnedFade(0.5))
            .expect("construct");

        system.update();
        for particle in system.particles() {
            assert_eq!(particle.life, 0.5);
            assert!((particle.position.y + 10.0 / 1000.0).abs() < 1e-7);
            assert_eq!(particle.velocity.y, -11.0);
        }

        // Life reaches exactly zero, which is not yet expired.
        assert_eq!(system.update(), 0);
        for particle in system.particles() {
            assert_eq!(particle.life, 0.0);
            assert_eq!(particle.velocity.y, -12.0);
        }

        assert_eq!(system.update(), 2);
        for particle in system.particles() {
            assert_eq!(particle.life, 1.0);
            assert_eq!(particle.position, Vec3::ZERO);
            assert_eq!(particle.velocity, Vec3::new(0.0, -10.0, 0.0));
            assert_eq!(particle.gravity, Vec3::new(0.0, -1.0, 0.0));
            assert!(particle.active);
        }
    }

    #[test]
    fn test_construction_loads_one_texture_and_one_mesh() {
        let mut backend = RecordingBackend::default();
        let system = ParticleSystem::new(&scenario_config().with_count(50), &mut backend)
            .expect("construct");

        assert_eq!(backend.texture_loads, vec![std::path::PathBuf::from("rain.png")]);
        assert_eq!(backend.meshes.len(), 1);
        assert_eq!(backend.meshes[0], PARTICLE_QUAD.to_vec());
        assert_eq!(system.particle_count(), 50);
        assert_eq!(system.active_count(), 50);
    }

    #[test]
    fn test_default_count_for_non_positive() {
        let mut backend = RecordingBackend::default();
        for count in [0, -1, i32::MIN] {
            let system = ParticleSystem::new(&scenario_config().with_count(count), &mut backend)
                .expect("construct");
            assert_eq!(system.particle_count(), 1000);
        }
    }

    #[test]
    fn test_texture_failure_propagates() {
        let mut backend = RecordingBackend {
            fail_texture: true,
            ..Default::default()
        };
        let result = ParticleSystem::new(&scenario_config(), &mut backend);

        assert!(matches!(result, Err(LumenError::Resource(ResourceLoadError::NotFound(_)))));
        assert!(backend.meshes.is_empty());
    }

    #[test]
    fn test_mesh_failure_releases_texture() {
        let mut backend = RecordingBackend {
            fail_mesh: true,
            ..Default::default()
        };
        let result = ParticleSystem::new(&scenario_config(), &mut backend);

        assert!(matches!(result, Err(LumenError::Gpu(GpuError::BufferAlloc(_)))));
        assert_eq!(backend.released_textures, vec![TextureHandle::new(1)]);
    }

    #[test]
    fn test_invalid_config_touches_no_resources() {
        let mut backend = RecordingBackend::default();
        let result = ParticleSystem::new(&scenario_config().with_life(-1.0), &mut backend);

        assert!(matches!(result, Err(LumenError::Config(_))));
        assert!(backend.texture_loads.is_empty());
    }

    #[test]
    fn test_release_returns_resources() {
        let mut backend = RecordingBackend::default();
        let system = ParticleSystem::new(&scenario_config(), &mut backend).expect("construct");
        let (texture, mesh) = (system.texture(), system.mesh());

        system.release(&mut backend);
        assert_eq!(backend.released_textures, vec![texture]);
        assert_eq!(backend.released_meshes, vec![mesh]);
    }

    #[test]
    fn test_inactive_particles_are_frozen_and_skipped() {
        let mut backend = RecordingBackend::default();
        let mut system = ParticleSystem::with_rng(
            &scenario_config().with_count(3),
            &mut backend,
            PinnedFade(0.1),
        )
        .expect("construct");

        let parked = {
            let particle = system.particle_mut(1).expect("slot 1");
            particle.active = false;
            *particle
        };
        system.update_steps(5);
        assert_eq!(system.particle(1), Some(&parked));

        let mut shader = RecordingShader::default();
        let draws = system
            .render(&mut shader, Vec3::Z, Vec3::ONE)
            .expect("render");
        assert_eq!(draws, 2);
        assert_eq!(shader.draws.len(), 2);
        assert_eq!(shader.count(Uniform::Model), 2);
    }

    #[test]
    fn test_render_uploads_shared_state_once() {
        let mut backend = RecordingBackend::default();
        let system = ParticleSystem::new(&scenario_config().with_count(4), &mut backend)
            .expect("construct");

        let mut shader = RecordingShader::default();
        system
            .render(&mut shader, Vec3::X, Vec3::splat(0.5))
            .expect("render");

        assert_eq!(shader.count(Uniform::Visibility), 1);
        assert_eq!(shader.count(Uniform::ParticleTexture), 1);
        assert_eq!(
            shader.uniforms[0],
            (Uniform::Visibility, UniformValue::Float(system.visibility()))
        );
        assert_eq!(
            shader.uniforms[1],
            (
                Uniform::ParticleTexture,
                UniformValue::Texture {
                    unit: PARTICLE_TEXTURE_UNIT,
                    texture: system.texture(),
                }
            )
        );
        assert!(shader
            .draws
            .iter()
            .all(|&(mesh, count)| mesh == system.mesh() && count == 6));
    }

    #[test]
    fn test_render_billboard_transform() {
        let mut backend = RecordingBackend::default();
        let mut system = ParticleSystem::with_rng(
            &scenario_config().with_count(1),
            &mut backend,
            PinnedFade(0.1),
        )
        .expect("construct");
        system.update();

        let position = system.particles()[0].position;
        let scale = Vec3::new(0.1, 0.2, 0.1);

        let mut shader = RecordingShader::default();
        system.render(&mut shader, Vec3::X, scale).expect("render");
        let expected = model_matrix(
            system.anchor(),
            position,
            scale,
            Some(std::f32::consts::FRAC_PI_2),
        );
        assert!(shader.models()[0].abs_diff_eq(expected, 1e-5));

        system.set_billboarding(false);
        let mut shader = RecordingShader::default();
        system.render(&mut shader, Vec3::X, scale).expect("render");
        let expected = model_matrix(system.anchor(), position, scale, None);
        assert!(shader.models()[0].abs_diff_eq(expected, 1e-5));
    }

    #[test]
    fn test_area_respawn_uses_offset_box() {
        let mut backend = RecordingBackend::default();
        let config = scenario_config()
            .with_fixed_position(false)
            .with_area(Vec3::new(1.0, 2.0, 3.0), Vec3::new(30.0, 1.0, 30.0));
        let system =
            ParticleSystem::with_rng(&config, &mut backend, PinnedFade(0.5)).expect("construct");

        // Pinned jitter picks extent - 1 on every axis.
        for particle in system.particles() {
            assert_eq!(particle.position, Vec3::new(30.0, 2.0, 32.0));
        }
    }

    #[test]
    fn test_fade_range_with_real_spawner() {
        let mut backend = RecordingBackend::default();
        let mut system = ParticleSystem::with_rng(
            &ParticleSystemConfig::new("rain.png").with_count(500),
            &mut backend,
            FastRandSpawner::with_seed(42),
        )
        .expect("construct");

        for _ in 0..400 {
            system.update();
            for particle in system.particles() {
                assert!(particle.fade >= FADE_MIN && particle.fade < 0.103);
                assert!(particle.life <= 1.0);
            }
        }
    }

    fn area_config(origin: Vec3, offset: Vec3, count: i32) -> ParticleSystemConfig {
        ParticleSystemConfig::new("rain.png")
            .with_count(count)
            .with_area(origin, offset)
            .with_life(0.05)
    }

    proptest! {
        #[test]
        fn prop_pool_size_is_fixed(count in 1i32..300, ticks in 0u32..40, seed in any::<u64>()) {
            let mut backend = RecordingBackend::default();
            let mut system = ParticleSystem::with_rng(
                &area_config(Vec3::ZERO, Vec3::splat(10.0), count),
                &mut backend,
                FastRandSpawner::with_seed(seed),
            ).expect("construct");

            prop_assert_eq!(system.particle_count(), count as usize);
            system.update_steps(ticks);
            prop_assert_eq!(system.particle_count(), count as usize);
            prop_assert_eq!(system.active_count(), count as usize);
        }

        #[test]
        fn prop_tick_follows_kinematics(
            seed in any::<u64>(),
            vx in -50.0f32..50.0,
            vy in -200.0f32..0.0,
            gy in -3.0f32..0.0,
            warmup in 0u32..30,
        ) {
            let mut backend = RecordingBackend::default();
            let config = area_config(Vec3::new(-5.0, 5.0, 0.0), Vec3::new(30.0, 1.0, 30.0), 64)
                .with_motion(Vec3::new(vx, vy, 0.0), Vec3::new(0.0, gy, 0.0));
            let mut system = ParticleSystem::with_rng(
                &config,
                &mut backend,
                FastRandSpawner::with_seed(seed),
            ).expect("construct");
            system.update_steps(warmup);

            let before: Vec<Particle> = system.particles().to_vec();
            system.update();

            for (old, new) in before.iter().zip(system.particles()) {
                prop_assert_eq!(new.gravity, old.gravity);
                if old.life - old.fade < 0.0 {
                    // Respawned: template values, fresh fade, position in the box.
                    prop_assert_eq!(new.life, config.life);
                    prop_assert_eq!(new.velocity, config.velocity);
                    prop_assert!(new.fade >= FADE_MIN && new.fade < 0.103);
                    let rel = new.position - config.origin;
                    prop_assert!(rel.cmpge(Vec3::ZERO).all());
                    prop_assert!(rel.cmplt(config.offset).all());
                } else {
                    prop_assert_eq!(new.life, old.life - old.fade);
                    prop_assert_eq!(new.fade, old.fade);
                    prop_assert_eq!(new.velocity, old.velocity + old.gravity);
                    prop_assert_eq!(new.position, old.position + old.velocity / 1000.0);
                }
            }
        }

        #[test]
        fn prop_area_spawn_within_bounds(
            seed in any::<u64>(),
            ox in -100.0f32..100.0,
            oy in -100.0f32..100.0,
            oz in -100.0f32..100.0,
            ex in 1u32..60,
            ey in 1u32..60,
            ez in 1u32..60,
        ) {
            let origin = Vec3::new(ox, oy, oz);
            let offset = Vec3::new(ex as f32, ey as f32, ez as f32);
            let mut backend = RecordingBackend::default();
            let mut system = ParticleSystem::with_rng(
                &area_config(origin, offset, 128).with_motion(Vec3::ZERO, Vec3::ZERO),
                &mut backend,
                FastRandSpawner::with_seed(seed),
            ).expect("construct");

            for _ in 0..20 {
                for particle in system.particles() {
                    let rel = particle.position - origin;
                    let jitter = rel.round();
                    prop_assert!(jitter.cmpge(Vec3::ZERO).all());
                    prop_assert!(jitter.cmplt(offset).all());
                }
                system.update();
            }
        }

        #[test]
        fn prop_fixed_spawn_is_exact(seed in any::<u64>(), ox in -50.0f32..50.0, oz in -50.0f32..50.0) {
            let origin = Vec3::new(ox, 5.0, oz);
            let mut backend = RecordingBackend::default();
            let mut system = ParticleSystem::with_rng(
                &area_config(origin, Vec3::splat(30.0), 32).with_fixed_position(true),
                &mut backend,
                FastRandSpawner::with_seed(seed),
            ).expect("construct");

            for particle in system.particles() {
                prop_assert_eq!(particle.position, origin);
            }
            for _ in 0..40 {
                let before: Vec<Particle> = system.particles().to_vec();
                system.update();
                for (old, new) in before.iter().zip(system.particles()) {
                    if old.life - old.fade < 0.0 {
                        prop_assert_eq!(new.position, origin);
                    }
                }
            }
        }
    }
}
