//! Hardware test ROMs.
//!
//! These need the ROM collection under `test-roms/` at the workspace root
//! (or wherever `NES_TEST_ROMS` points):
//!
//! - `nestest.nes` and `nestest.log`
//! - `instr_test-v5/01-basics.nes`, `apu_test/1-len_ctr.nes`
//! - `sprite_hit_tests_2005.10.05/01.basics.nes` and
//!   `vbl_nmi_timing/1.frame_basics.nes`, with golden frames in `golden/`
//!
//! Missing files skip the test.

mod common;

use std::fs::File;
use std::io::BufWriter;

use emu_nes::{AudioBuffer, Core, HEIGHT, WIDTH};

use common::{load_rom, rom_dir};

fn core(name: &str) -> Option<Core> {
    let rom = load_rom(name)?;
    Some(Core::new(&rom).unwrap_or_else(|e| panic!("{name}: {e}")))
}

/// Drop the `PPU:` column: the power-on CPU/PPU alignment is not part of
/// what nestest checks.
fn without_ppu(line: &str) -> String {
    match (line.find("PPU:"), line.find("CYC:")) {
        (Some(ppu), Some(cyc)) => format!("{}{}", &line[..ppu], &line[cyc..]),
        _ => line.to_owned(),
    }
}

#[test]
#[ignore] // Requires test-roms/nestest.nes
fn nestest() {
    let Some(mut core) = core("nestest.nes") else {
        return;
    };
    let trace_path = std::env::temp_dir().join("emu-nes-nestest.log");
    let out = File::create(&trace_path).unwrap_or_else(|e| panic!("{e}"));
    core.trace(Some(Box::new(BufWriter::new(out))));

    // Automation mode.
    core.cpu_mut().regs.pc = 0xC000;
    let remaining = 26_554 - core.cpu().cycles();
    core.run_cycles(remaining);
    core.trace(None);

    assert!(!core.halted());
    assert_eq!(core.peek_cpu(0x0002), 0x00, "official opcode failure code");
    assert_eq!(core.peek_cpu(0x0003), 0x00, "unofficial opcode failure code");

    let golden_path = rom_dir().join("nestest.log");
    let Ok(golden) = std::fs::read_to_string(&golden_path) else {
        eprintln!("{} not found, skipping log comparison", golden_path.display());
        return;
    };
    let ours = std::fs::read_to_string(&trace_path).unwrap_or_else(|e| panic!("{e}"));
    let mut compared = 0;
    for (n, (want, got)) in golden.lines().zip(ours.lines()).enumerate() {
        assert_eq!(without_ppu(got), without_ppu(want), "line {}", n + 1);
        compared += 1;
    }
    assert!(compared + 1 >= golden.lines().count(), "trace stopped after {compared} lines");
}

/// Result code of a blargg test using the $6000 protocol.
///
/// $6001-$6003 hold DE B0 61 once the test has started; $6000 is $80
/// while running, $81 when it wants a reset, else the final result. The
/// message is a NUL-terminated string at $6004.
fn blargg(core: &mut Core, max_frames: u32) -> (u8, String) {
    let mut video = vec![0; WIDTH * HEIGHT * 4];
    let mut audio = AudioBuffer::new();
    let mut started = false;
    let mut reset_in = None::<u32>;

    for _ in 0..max_frames {
        core.run_one_frame(&mut video, &mut audio);
        audio.clear();
        if core.halted() {
            break;
        }
        if !started {
            started = (0x6001..=0x6003).map(|a| core.peek_cpu(a)).eq([0xDEu8, 0xB0, 0x61]);
            continue;
        }
        if let Some(frames) = reset_in.as_mut() {
            *frames -= 1;
            if *frames == 0 {
                reset_in = None;
                core.reset(true);
            }
            continue;
        }
        match core.peek_cpu(0x6000) {
            0x80 => {}
            // Reset after at least 100 ms.
            0x81 => reset_in = Some(7),
            code => return (code, message(core)),
        }
    }
    (core.peek_cpu(0x6000), message(core))
}

fn message(core: &Core) -> String {
    (0x6004..0x7000)
        .map(|a| core.peek_cpu(a))
        .take_while(|&b| b != 0)
        .map(char::from)
        .collect()
}

#[test]
#[ignore] // Requires test-roms/instr_test-v5/01-basics.nes
fn instr_test_basics() {
    let Some(mut core) = core("instr_test-v5/01-basics.nes") else {
        return;
    };
    let (code, msg) = blargg(&mut core, 1200);
    assert_eq!(code, 0x00, "{msg}");
}

#[test]
#[ignore] // Requires test-roms/apu_test/1-len_ctr.nes
fn apu_length_counter() {
    let Some(mut core) = core("apu_test/1-len_ctr.nes") else {
        return;
    };
    let (code, msg) = blargg(&mut core, 1200);
    assert_eq!(code, 0x00, "{msg}");
}

/// Decode a golden PNG to RGBA.
fn golden_frame(name: &str) -> Option<Vec<u8>> {
    let path = rom_dir().join("golden").join(name);
    let Ok(file) = File::open(&path) else {
        eprintln!("{} not found, skipping", path.display());
        return None;
    };
    let mut reader = png::Decoder::new(file).read_info().unwrap_or_else(|e| panic!("{e}"));
    let mut buf = vec![0; reader.output_buffer_size()];
    let info = reader.next_frame(&mut buf).unwrap_or_else(|e| panic!("{e}"));
    buf.truncate(info.buffer_size());
    assert_eq!((info.width as usize, info.height as usize), (WIDTH, HEIGHT));
    match info.color_type {
        png::ColorType::Rgba => Some(buf),
        png::ColorType::Rgb => Some(buf.chunks_exact(3).flat_map(|p| [p[0], p[1], p[2], 0xFF]).collect()),
        other => panic!("unsupported golden colour type {other:?}"),
    }
}

fn save_actual(name: &str, rgba: &[u8]) {
    let path = std::env::temp_dir().join(name);
    let Ok(file) = File::create(&path) else {
        return;
    };
    let mut encoder = png::Encoder::new(BufWriter::new(file), WIDTH as u32, HEIGHT as u32);
    encoder.set_color(png::ColorType::Rgba);
    encoder.set_depth(png::BitDepth::Eight);
    if let Ok(mut writer) = encoder.write_header() {
        let _ = writer.write_image_data(rgba);
        let _ = writer.finish();
    }
    eprintln!("actual frame written to {}", path.display());
}

fn check_frame(rom: &str, golden: &str, frames: u32) {
    let Some(mut core) = core(rom) else {
        return;
    };
    let Some(want) = golden_frame(golden) else {
        return;
    };
    let mut video = vec![0; WIDTH * HEIGHT * 4];
    let mut audio = AudioBuffer::new();
    for _ in 0..frames {
        core.run_one_frame(&mut video, &mut audio);
        audio.clear();
    }
    if video != want {
        save_actual(golden, &video);
        let differ = video.chunks_exact(4).zip(want.chunks_exact(4)).filter(|(a, b)| a != b).count();
        panic!("{rom}: {differ} pixels differ from {golden}");
    }
}

#[test]
#[ignore] // Requires test-roms/sprite_hit_tests_2005.10.05/01.basics.nes
fn sprite_zero_hit_basics() {
    check_frame("sprite_hit_tests_2005.10.05/01.basics.nes", "01.basics.png", 70);
}

#[test]
#[ignore] // Requires test-roms/vbl_nmi_timing/1.frame_basics.nes
fn vbl_frame_basics() {
    check_frame("vbl_nmi_timing/1.frame_basics.nes", "1.frame_basics.png", 200);
}
