//! Puckboard headless demo
//!
//! Spawns a few pucks on the default surface, connects two of them, records
//! a short path, and runs the simulation for a couple of seconds of ticks
//! while logging what the audio collaborator would receive. Useful as a
//! smoke test and as an end-to-end example of the public API.

use glam::Vec2;

use puckboard::audio::{AudioSource, EffectChannel, RecordingAudio};
use puckboard::sim::{Field, tick};
use puckboard::Settings;

const TICK_MS: f64 = 1000.0 / 60.0;
const DEMO_TICKS: usize = 180;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let settings = Settings::default();
    let mut field = Field::new(&settings);
    let mut audio = RecordingAudio::new();

    let kick = field.spawn_puck(
        AudioSource::new("blob:demo/kick"),
        "kick",
        false,
        Vec2::new(150.0, 150.0),
        &settings,
        &mut audio,
    );
    let pad = field.spawn_puck(
        AudioSource::new("blob:demo/pad"),
        "pad",
        false,
        Vec2::new(600.0, 200.0),
        &settings,
        &mut audio,
    );
    let voice = field.spawn_puck(
        AudioSource::new("mic:demo/take-1"),
        "take 1",
        true,
        Vec2::new(400.0, 450.0),
        &settings,
        &mut audio,
    );

    // Pretend the host finished decoding
    for id in [kick, pad, voice] {
        field.buffer_loaded(id);
    }

    field.connect(kick, pad);

    // Record a one-second diagonal sweep on the kick puck
    field.start_recording(kick, 0.0);
    for step in 0..=10 {
        let t = step as f64 * 100.0;
        if let Some(puck) = field.get_mut(kick) {
            puck.pos = Vec2::new(150.0 + step as f32 * 20.0, 150.0 + step as f32 * 10.0);
        }
        field.record_point(kick, t);
    }
    field.stop_recording(kick, 1000.0);

    // Give the loose puck a shove so physics has something to do
    if let Some(puck) = field.get_mut(voice) {
        puck.vel = Vec2::new(6.0, -4.0);
    }

    let mut now_ms = 1000.0;
    for n in 0..DEMO_TICKS {
        now_ms += TICK_MS;
        tick(&mut field, &settings, &mut audio, now_ms);

        if n % 30 == 0 {
            for puck in field.pucks() {
                log::info!(
                    "tick {n:3}  {:<8} pos=({:6.1},{:6.1})  reverb target={:?}",
                    puck.name,
                    puck.pos.x,
                    puck.pos.y,
                    audio.last_target(puck.id, EffectChannel::Reverb),
                );
            }
        }
    }

    log::info!(
        "Done: {} pucks, {} effect target submissions",
        field.len(),
        audio.effect_targets.len()
    );
}
