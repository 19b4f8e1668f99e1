//! ambience - generative ambient soundscape on the default output device
//!
//! Run with: cargo run --bin ambience -- [mood] [seconds-per-mood]
//!
//! Log verbosity follows `RUST_LOG` (default `info`).

use std::{
    sync::Arc,
    thread,
    time::{Duration, Instant},
};

use color_eyre::eyre::{eyre, Result as EyreResult, WrapErr};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use rtrb::{Producer, RingBuffer};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use ambient_dsp::{io::AudioClock, Mood, MoodConfig, OfflineGraph, Soundscape, MAX_BLOCK_SIZE};

/// Control loop period, roughly one display frame.
const FRAME: Duration = Duration::from_millis(16);
const METER_EVERY: u64 = 15;
const METER_WIDTH: usize = 40;
const MOOD_TRANSITION: f64 = 4.0;
/// Occurrence and intensity the demo steps through, one pair per mood change.
const CONTROLS: [(f32, f32); 4] = [(100.0, 40.0), (60.0, 80.0), (15.0, 20.0), (90.0, 60.0)];

/// Render a whole device buffer and report one peak per block. The meter
/// is best effort: a full ring loses the reading, never the audio.
fn fill_device_buffer(
    graph: &OfflineGraph,
    data: &mut [f32],
    channels: usize,
    peaks: &mut Producer<f32>,
) {
    let channels = channels.max(1);
    for block in data.chunks_mut(MAX_BLOCK_SIZE * channels) {
        graph.render_interleaved(block, channels);
        let peak = block.iter().fold(0.0f32, |p, s| p.max(s.abs()));
        let _ = peaks.push(peak);
    }
}

fn main() -> EyreResult<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut args = std::env::args().skip(1);
    let first = args.next().unwrap_or_else(|| "calm".to_string());
    let mood = Mood::preset(&first)
        .ok_or_else(|| eyre!("unknown mood `{first}`, expected one of {:?}", Mood::PRESETS))?;
    let dwell: f64 = match args.next() {
        Some(arg) => arg.parse().wrap_err("seconds per mood must be a number")?,
        None => 30.0,
    };

    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| eyre!("no default output device available"))?;
    let config = device
        .default_output_config()
        .wrap_err("failed to fetch default output config")?;

    let sample_rate = config.sample_rate().0 as f32;
    let channels = config.channels() as usize;
    info!(sample_rate, channels, mood = %mood.name, dwell, "starting");

    let graph = Arc::new(OfflineGraph::new(sample_rate));
    // Block peaks from the audio thread to the meter.
    let (mut peak_tx, mut peak_rx) = RingBuffer::<f32>::new(256);

    let render = graph.clone();
    let stream = device.build_output_stream(
        &config.into(),
        move |data: &mut [f32], _| fill_device_buffer(&render, data, channels, &mut peak_tx),
        |err| warn!(error = %err, "audio stream error"),
        None,
    )?;

    let mut control = MoodConfig::default();
    let mut scene = Soundscape::ambience(graph.clone(), graph.destination());
    if scene.init(&mood, control) == 0 {
        return Err(eyre!("no ambient module could be initialized"));
    }

    stream.play()?;
    scene.play(graph.current_time());
    println!("Playing `{}`... Press Ctrl+C to stop", mood.name);

    let mut preset = Mood::PRESETS
        .iter()
        .position(|name| *name == mood.name)
        .unwrap_or(0);
    let mut step = 0;
    let mut last_frame = Instant::now();
    let mut last_change = Instant::now();
    let mut frame: u64 = 0;
    let mut meter = 0.0f32;

    loop {
        thread::sleep(FRAME);
        let delta = last_frame.elapsed().as_secs_f64();
        last_frame = Instant::now();
        scene.update(delta);

        while let Ok(peak) = peak_rx.pop() {
            meter = meter.max(peak);
        }

        frame += 1;
        if frame % METER_EVERY == 0 {
            let filled = ((meter.min(1.0) * METER_WIDTH as f32).round() as usize).min(METER_WIDTH);
            println!(
                "{:>10} {:8.2}s |{:<width$}| {:>3} voices",
                scene.mood().name,
                graph.current_time(),
                "#".repeat(filled),
                scene.live_voices(),
                width = METER_WIDTH,
            );
            meter = 0.0;
        }

        if last_change.elapsed().as_secs_f64() >= dwell {
            last_change = Instant::now();
            preset = (preset + 1) % Mood::PRESETS.len();
            step = (step + 1) % CONTROLS.len();
            let (occurrence, intensity) = CONTROLS[step];
            control.occurrence = occurrence;
            control.intensity = intensity;

            if let Some(next) = Mood::preset(Mood::PRESETS[preset]) {
                scene.change_mood(&next, MOOD_TRANSITION, control);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_meter_ring_still_renders_every_block() {
        let graph = OfflineGraph::new(48_000.0);
        let (mut peaks, _reader) = RingBuffer::<f32>::new(1);
        let channels = 2;
        let mut data = vec![0.0f32; 3 * MAX_BLOCK_SIZE * channels];

        fill_device_buffer(&graph, &mut data, channels, &mut peaks);
        fill_device_buffer(&graph, &mut data, channels, &mut peaks);

        let rendered = graph.current_time() * 48_000.0;
        assert_eq!(rendered.round() as usize, 2 * 3 * MAX_BLOCK_SIZE);
    }
}
