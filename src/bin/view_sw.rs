//! Walk around a Doom map with the software renderer.
//!
//! ```bash
//! cargo run --release -- --wad doom1.wad --map E1M1
//! cargo run --release                     # built-in test map
//! ```

use anyhow::{Context, bail};
use clap::Parser;
use glam::Vec3;
use minifb::{Key, KeyRepeat, Window, WindowOptions};
use std::{
    path::PathBuf,
    time::{Duration, Instant},
};
use tracing::info;
use tracing_subscriber::EnvFilter;

use yadoom_sw::{
    config::{PixelDepth, RenderConfig},
    fixed::{Angle, Fixed, fixed_to_int},
    renderer::{RendererExt, SoftwareRenderer},
    wad::{PlayerStart, Wad, load_level},
    world::{Camera, Level, TextureBank, demo},
};

const EYE_HEIGHT: f32 = 41.0;
const WALK: f32 = 6.0;
const TURN: f32 = 0.06;
const LOOK: f32 = 0.03;

/// CLI options handled via `clap` derive.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Opts {
    /// IWAD or PWAD to load; the built-in test map is shown without one.
    #[arg(long, value_name = "FILE")]
    wad: Option<PathBuf>,

    /// Map name (`E1M1`, `MAP01`); defaults to the first map in the WAD.
    #[arg(long)]
    map: Option<String>,

    #[arg(long, default_value_t = 640)]
    width: usize,

    #[arg(long, default_value_t = 400)]
    height: usize,

    /// View window size, `3..=11` like the classic screen-size setting.
    #[arg(long, default_value_t = 10)]
    blocks: usize,

    /// Horizontal field of view in degrees.
    #[arg(long, default_value_t = 90.0)]
    fov: f32,

    /// Draw straight to 32-bit colour instead of palette indices.
    #[arg(long)]
    truecolor: bool,
}

impl Opts {
    fn render_config(&self) -> RenderConfig {
        let depth = if self.truecolor {
            PixelDepth::TrueColor
        } else {
            PixelDepth::Paletted
        };
        let mut cfg = RenderConfig::fullscreen(self.width, self.height)
            .with_blocks(self.blocks)
            .with_depth(depth);
        // 2048 fine angles per 90°
        cfg.fov = (self.fov / 90.0 * 2048.0).round() as usize;
        cfg
    }
}

fn angle_to_radians(a: Angle) -> f32 {
    a as f32 / 4_294_967_296.0 * std::f32::consts::TAU
}

fn load(opts: &Opts) -> anyhow::Result<(Level, TextureBank, Option<PlayerStart>)> {
    let Some(path) = &opts.wad else {
        let level = demo::LevelBuilder::showcase()
            .build()
            .context("building the test map")?;
        let bank = demo::texture_bank().context("building test textures")?;
        return Ok((level, bank, None));
    };

    let wad = Wad::from_file(path).with_context(|| format!("opening {}", path.display()))?;
    let marker = match &opts.map {
        Some(name) => wad.find_level(name)?,
        None => match wad.level_indices().first() {
            Some(&m) => m,
            None => bail!("{} contains no maps", path.display()),
        },
    };
    let mut bank = TextureBank::default_with_checker();
    let loaded = load_level(&wad, marker, &mut bank)
        .with_context(|| format!("loading map {}", wad.lump_name(marker)))?;
    Ok((loaded.level, bank, loaded.player_start))
}

fn floor_under(level: &Level, x: Fixed, y: Fixed) -> Fixed {
    let ss = &level.subsectors[level.locate_subsector(x, y) as usize];
    level.sectors[ss.sector as usize].floor_height
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let opts = Opts::parse();
    let cfg = opts.render_config();
    let (level, bank, start) = load(&opts)?;
    info!(map = %level.name, things = level.things.len(), "level ready");

    let mut camera = match start {
        Some(s) => Camera::new(
            Vec3::new(fixed_to_int(s.x) as f32, fixed_to_int(s.y) as f32, EYE_HEIGHT),
            angle_to_radians(s.angle),
        ),
        None => Camera::new(Vec3::new(-240.0, 0.0, EYE_HEIGHT), 0.0),
    };

    let mut renderer = SoftwareRenderer::new(cfg.clone()).context("renderer setup")?;
    let mut win = Window::new(
        &format!("yadoom_sw - {}", level.name),
        cfg.screen_width,
        cfg.screen_height,
        WindowOptions::default(),
    )?;
    win.set_target_fps(35);

    // ────────────────── benchmarking state ──────────────────────────────
    let mut acc_time = Duration::ZERO;
    let mut acc_frames = 0usize;
    let mut last_print = Instant::now();
    let mut extralight = 0;
    let mut invulnerable = false;

    while win.is_open() && !win.is_key_down(Key::Escape) {
        let t0 = Instant::now();

        /* movement --------------------------------------------------------- */
        let speed = if win.is_key_down(Key::LeftShift) { 2.0 * WALK } else { WALK };
        let mut forward = 0.0;
        let mut side = 0.0;
        if win.is_key_down(Key::Up) || win.is_key_down(Key::W) {
            forward += speed;
        }
        if win.is_key_down(Key::Down) || win.is_key_down(Key::S) {
            forward -= speed;
        }
        if win.is_key_down(Key::A) {
            side -= speed;
        }
        if win.is_key_down(Key::D) {
            side += speed;
        }
        camera.step(forward, side);

        if win.is_key_down(Key::Left) {
            camera.turn(TURN);
        }
        if win.is_key_down(Key::Right) {
            camera.turn(-TURN);
        }
        if win.is_key_down(Key::PageUp) {
            camera.look(-LOOK);
        }
        if win.is_key_down(Key::PageDown) {
            camera.look(LOOK);
        }
        if win.is_key_pressed(Key::End, KeyRepeat::No) {
            camera.center_view();
        }
        if win.is_key_pressed(Key::L, KeyRepeat::No) {
            extralight = (extralight + 1) % 3;
        }
        if win.is_key_pressed(Key::I, KeyRepeat::No) {
            invulnerable = !invulnerable;
        }

        /* draw ------------------------------------------------------------- */
        let pos = camera.view_point(0);
        let mut view = camera.view_point(floor_under(&level, pos.x, pos.y));
        view.extralight = extralight;
        view.fixed_colormap = invulnerable.then_some(yadoom_sw::world::INVERSE_COLORMAP);

        let mut present = Ok(());
        renderer.draw_frame(&view, &level, &bank, |fb, w, h| {
            acc_time += t0.elapsed();
            acc_frames += 1;
            present = win.update_with_buffer(fb, w, h);
        })?;
        present?;

        if last_print.elapsed() >= Duration::from_secs(3) {
            let avg_ms = acc_time.as_secs_f64() * 1000.0 / acc_frames.max(1) as f64;
            info!("avg render: {avg_ms:.2} ms ({:.1} FPS)", 1000.0 / avg_ms);
            acc_time = Duration::ZERO;
            acc_frames = 0;
            last_print = Instant::now();
        }
    }
    Ok(())
}
