//! Headless capture: PNG screenshots.

use std::error::Error;
use std::fs;
use std::io::BufWriter;
use std::path::Path;

use log::info;

use crate::{AudioBuffer, Core, HEIGHT, WIDTH};

/// Encode an RGBA frame as PNG.
pub fn write_png(path: &Path, rgba: &[u8]) -> Result<(), Box<dyn Error>> {
    let file = fs::File::create(path)?;
    let mut encoder = png::Encoder::new(BufWriter::new(file), WIDTH as u32, HEIGHT as u32);
    encoder.set_color(png::ColorType::Rgba);
    encoder.set_depth(png::BitDepth::Eight);
    let mut writer = encoder.write_header()?;
    writer.write_image_data(rgba)?;
    Ok(())
}

/// Save the last completed frame.
pub fn save_screenshot(core: &Core, path: &Path) -> Result<(), Box<dyn Error>> {
    write_png(path, core.framebuffer())
}

/// Run `num_frames` frames, saving each one as `dir/frames/NNNNNN.png`.
///
/// Audio produced meanwhile is returned.
pub fn record(core: &mut Core, dir: &Path, num_frames: u32) -> Result<AudioBuffer, Box<dyn Error>> {
    let frames_dir = dir.join("frames");
    fs::create_dir_all(&frames_dir)?;

    let mut video = vec![0; WIDTH * HEIGHT * 4];
    let mut audio = AudioBuffer::new();
    for i in 1..=num_frames {
        core.run_one_frame(&mut video, &mut audio);
        write_png(&frames_dir.join(format!("{i:06}.png")), &video)?;
    }

    info!("captured {num_frames} frames to {}", frames_dir.display());
    Ok(audio)
}
