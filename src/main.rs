// Virtual Ambient: a 3D scene editor and first-person navigator

mod assets;
mod collider;
mod config;
mod drawable;
mod editor;
mod group;
mod input;
mod material;
mod math;
mod museum;
mod player;
mod ply;
mod renderer;
mod scene;
mod timing;
mod wall;

use std::path::PathBuf;

use glam::Vec3;
use winit::event_loop::EventLoop;

use crate::assets::AssetLibrary;
use crate::config::{ConfigError, EditorConfig};
use crate::editor::EditorSession;
use crate::player::Player;
use crate::renderer::{App, Renderer, RendererError};

#[derive(Debug, thiserror::Error)]
enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Renderer(#[from] RendererError),
    #[error("failed to create event loop: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    if let Err(err) = run().await {
        log::error!("{}", err);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), StartupError> {
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = EditorConfig::discover(config_path.as_deref())?;

    println!("{}", input::HELP);
    log::info!("Collision is off; press / while walking to turn it on");

    let scene = if config.museum {
        museum::build()
    } else {
        museum::empty_scene()
    };
    let player = Player::new(Vec3::from(config.player_start), config.movement.step);
    let session = EditorSession::new(scene, player, config.movement.look_sensitivity);
    let assets = AssetLibrary::load(&config);

    let event_loop = EventLoop::new()?;
    let renderer = Renderer::new(&event_loop, &config.window).await?;
    renderer.run(event_loop, App::new(session, assets, &config))?;
    Ok(())
}
