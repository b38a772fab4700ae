use std::thread;
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::Parser;
use glam::Vec2;

use fieldsync::{Collaborators, FieldClient, SessionEvent, SessionState, SyncConfig};

#[derive(Parser)]
#[command(name = "fieldsync-client")]
#[command(about = "Headless field client: logs in, enters the field and mirrors it")]
struct Args {
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    #[arg(short, long, default_value_t = fieldsync::DEFAULT_PORT)]
    port: u16,

    #[arg(short, long, default_value = "guest")]
    user: String,

    #[arg(long, default_value = "")]
    token: String,

    #[arg(long, help = "Field to enter instead of the server's default")]
    field: Option<u32>,

    #[arg(short, long, default_value_t = 60)]
    tick_rate: u32,

    #[arg(long, help = "Template for monsters that arrive without one")]
    fallback_template: Option<String>,

    #[arg(long, help = "Walk in a slow circle, attacking whatever gets close")]
    wander: bool,

    #[arg(long, help = "Stop after this many seconds")]
    duration: Option<u64>,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = SyncConfig {
        host: args.host,
        port: args.port,
        user_id: args.user,
        token: args.token,
        field_id: args.field,
        fallback_monster_template: args.fallback_template,
        ..SyncConfig::default()
    };

    let mut client = FieldClient::new(config, Collaborators::default());
    client.connect().with_context(|| {
        format!(
            "connecting to {}:{}",
            client.config().host,
            client.config().port
        )
    })?;

    let duration = args.duration.map(Duration::from_secs);
    run(&mut client, args.tick_rate.max(1), args.wander, duration);

    let stats = client.transport_stats();
    log::info!(
        "Sent {} frames ({} bytes), received {} frames ({} bytes)",
        stats.frames_sent,
        stats.bytes_sent,
        stats.frames_received,
        stats.bytes_received
    );
    Ok(())
}

fn run(client: &mut FieldClient, tick_rate: u32, wander: bool, duration: Option<Duration>) {
    let tick = Duration::from_secs_f64(1.0 / f64::from(tick_rate));
    let started = Instant::now();
    let mut last = started;
    let mut last_report = started;
    let mut last_attack = started;

    loop {
        let now = Instant::now();
        let dt = now.duration_since(last).as_secs_f32();
        last = now;

        if wander && client.state() == SessionState::InField {
            let angle = started.elapsed().as_secs_f32() * 0.5;
            client.update_move_input(Vec2::new(angle.sin(), angle.cos()));
            if now.duration_since(last_attack) >= Duration::from_secs(1) {
                last_attack = now;
                client.request_attack();
            }
        }

        client.tick(dt);

        for event in client.drain_events().collect::<Vec<_>>() {
            match event {
                SessionEvent::Connected => log::info!("Connected, logging in"),
                SessionEvent::LoggedIn {
                    player_id,
                    field_id,
                } => log::info!("Player {} entering field {}", player_id, field_id),
                SessionEvent::LoginRejected { user_id } => {
                    log::error!("Login rejected for {}", user_id);
                    client.disconnect();
                }
                SessionEvent::EnteredField {
                    player_id,
                    field_id,
                } => log::info!("In field {} as player {}", field_id, player_id),
                SessionEvent::Disconnected { reason } => {
                    log::warn!("Disconnected: {}", reason);
                    return;
                }
            }
        }

        if now.duration_since(last_report) >= Duration::from_secs(5) {
            last_report = now;
            let world = client.world();
            log::info!(
                "{} entities known, {} active, local moving: {}",
                world.len(),
                world.active_count(),
                world.local_moving()
            );
        }

        if duration.is_some_and(|limit| started.elapsed() >= limit) {
            log::info!("Run time elapsed, disconnecting");
            client.disconnect();
            return;
        }

        let spent = now.elapsed();
        if spent < tick {
            thread::sleep(tick - spent);
        }
    }
}
