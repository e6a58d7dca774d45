//! Frost Sim Demo
//!
//! Runs a scripted session through two rooms, then replays the recorded
//! device input and checks that the final state hash matches.
//!
//! Usage: `frost-sim [config.json]`

use anyhow::{bail, Context, Result};
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use frost_sim::{
    core::{hash::StateHash, rect::Rect, vec2::FixedVec2},
    game::{
        attack::AttackDefinition,
        events::GameEventData,
        input::{DeviceRecording, Key, RawDeviceState},
        room::{DoorDirection, DoorSpec, InMemoryRooms, Room},
        tiles::TileGrid,
        SimConfig,
    },
    run_frame, FrameInput, World, FRAME_RATE, VERSION,
};

const DEMO_FRAMES: u32 = 600;

const SLASH: &str = r#"{
    "name": "slash",
    "length": 6,
    "frame_rate": 2,
    "groundedness": "ground_only",
    "hitboxes": [
        { "frame": 2, "friendly": true, "damage": 2, "width": 24, "height": 20,
          "offset": { "x": 20.0, "y": 0.0 }, "hitpause": 3,
          "knockback": { "magnitude": 5.0, "angle": 30 }, "hit_sound": "slash_hit" }
    ],
    "pushers": [ { "frame": 1, "velocity": { "x": 3.0, "y": 0.0 } } ]
}"#;

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber).context("failed to set tracing subscriber")?;

    info!("Frost Sim v{}", VERSION);
    info!("Frame Rate: {} Hz", FRAME_RATE);

    let config = match std::env::args().nth(1) {
        Some(path) => SimConfig::load(&path).with_context(|| format!("loading {path}"))?,
        None => SimConfig::default(),
    };

    let rooms = demo_rooms()?;
    let recording = scripted_input();
    info!(
        deltas = recording.delta_count(),
        hash = %hex::encode(recording.compute_hash()),
        "input recorded"
    );

    info!("=== Running Demo ===");
    let hash = run_session(&config, &rooms, &recording, true)?;
    info!("Final State Hash: {}", hex::encode(hash));

    info!("=== Verifying Determinism ===");
    let replay_hash = run_session(&config, &rooms, &recording, false)?;
    info!("Replay State Hash: {}", hex::encode(replay_hash));

    if hash != replay_hash {
        bail!("determinism failure: hashes differ");
    }
    info!("DETERMINISM VERIFIED: Hashes match!");
    Ok(())
}

/// Two rooms joined by a door on each side.
fn demo_rooms() -> Result<InMemoryRooms> {
    let west = TileGrid::from_rows(
        &[
            "........................",
            "........................",
            "........................",
            "..........====..........",
            "........................",
            "........................",
            "########################",
        ],
        16,
    )?;
    let east = TileGrid::from_rows(
        &[
            "................",
            "................",
            "................",
            "................",
            "................",
            "................",
            "################",
        ],
        16,
    )?;

    let to_east = DoorSpec::new(Rect::from_ints(368, 48, 16, 48), DoorDirection::Right, "east");
    let mut to_west = DoorSpec::new(Rect::from_ints(0, 48, 16, 48), DoorDirection::Left, "west");
    to_west.eject = 1;

    Ok(InMemoryRooms::new()
        .with(
            Room::new("west", west)
                .with_spawn(FixedVec2::from_ints(48, 64))
                .with_door(to_east)
                .with_switch(Rect::from_ints(96, 64, 16, 32), false),
        )
        .with(
            Room::new("east", east)
                .with_spawn(FixedVec2::from_ints(32, 64))
                .with_door(to_west),
        ))
}

/// Walk right with a few jumps, interact with the switch, then keep going.
fn scripted_input() -> DeviceRecording {
    let mut recording = DeviceRecording::new();
    for frame in 0..DEMO_FRAMES {
        let mut state = RawDeviceState::idle();
        match frame {
            20..=40 => state.set_key(Key::D, true),
            41..=44 => state.set_key(Key::E, true),
            60..=400 => {
                state.set_key(Key::D, true);
                if frame % 50 < 12 {
                    state.set_key(Key::Space, true);
                }
            }
            _ => {}
        }
        recording.record(frame, state);
    }
    recording
}

fn run_session(
    config: &SimConfig,
    rooms: &InMemoryRooms,
    recording: &DeviceRecording,
    log: bool,
) -> Result<StateHash> {
    use frost_sim::game::room::RoomProvider;

    let mut world = World::new(config.clone(), rooms.load_room("west")?)?;
    world.register_attack(AttackDefinition::from_json_str(SLASH)?)?;
    let player = world.spawn_player(world.room.spawn);
    world.spawn_enemy(
        FixedVec2::from_ints(200, 80),
        Rect::from_ints(-8, -16, 16, 32),
        4,
    );

    let mut hits = 0;
    for (frame, device) in recording.replay_iter() {
        if frame % 45 == 0 {
            world.start_attack(player, "slash")?;
        }

        let report = run_frame(&mut world, &FrameInput::single(device));
        hits += report.hits;

        if log {
            for event in &report.events {
                match &event.data {
                    GameEventData::EntityDestroyed { entity, .. } => {
                        info!("Entity {:?} destroyed at frame {}", entity, frame);
                    }
                    GameEventData::LevelObjectToggled { level_state_id, on } => {
                        info!("Switch {} turned {}", level_state_id, if *on { "on" } else { "off" });
                    }
                    _ => {}
                }
            }
        }

        if let Some(destination) = report.transition {
            world.enter_room(rooms, &destination)?;
        }
    }

    if log {
        info!(room = %world.room.id, hits, steps = world.clock.step(), "session finished");
    }
    Ok(world.compute_hash())
}
