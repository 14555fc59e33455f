use std::collections::HashSet;
use std::env;
use std::error::Error;
use std::fs;

use minifb::{Key as HostKey, Scale, Window, WindowOptions};

use chip8_vm::display::{HEIGHT, WIDTH};
use chip8_vm::sound::{Tone, ToneGate};
use chip8_vm::{classic_keymap, Emulator, EmulatorConfig, Key, QuirkMode};

const USAGE: &str = "usage: chip8-vm <rom> [--quirks] [--cpu-hz N]";

const PIXEL_ON: u32 = 0x00_7F_FF;
const PIXEL_OFF: u32 = 0x00_00_00;

fn parse_args() -> Result<(String, EmulatorConfig), Box<dyn Error>> {
    let mut args = env::args().skip(1);
    let mut rom = None;
    let mut config = EmulatorConfig::default();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--quirks" => config.quirks = QuirkMode::Compatible,
            "--cpu-hz" => {
                let hz = args.next().ok_or("--cpu-hz needs a value")?;
                config.cpu_hz = hz.parse()?;
            }
            _ if rom.is_none() && !arg.starts_with("--") => rom = Some(arg),
            _ => return Err(format!("unexpected argument '{arg}'\n{USAGE}").into()),
        }
    }
    let rom = rom.ok_or(USAGE)?;
    Ok((rom, config))
}

fn host_char(key: HostKey) -> Option<char> {
    let c = match key {
        HostKey::Key1 => '1',
        HostKey::Key2 => '2',
        HostKey::Key3 => '3',
        HostKey::Key4 => '4',
        HostKey::Q => 'q',
        HostKey::W => 'w',
        HostKey::E => 'e',
        HostKey::R => 'r',
        HostKey::A => 'a',
        HostKey::S => 's',
        HostKey::D => 'd',
        HostKey::F => 'f',
        HostKey::Z => 'z',
        HostKey::X => 'x',
        HostKey::C => 'c',
        HostKey::V => 'v',
        _ => return None,
    };
    Some(c)
}

fn held_keys(window: &Window) -> HashSet<Key> {
    window
        .get_keys()
        .into_iter()
        .filter_map(host_char)
        .filter_map(classic_keymap)
        .collect()
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let (path, config) = parse_args()?;
    let rom = fs::read(&path)?;

    let gate = ToneGate::new();
    // the stream must outlive the loop below
    let _tone = match Tone::new(gate.clone()) {
        Ok(tone) => Some(tone),
        Err(e) => {
            log::warn!("audio disabled: {}", e);
            None
        }
    };

    let mut window = Window::new(
        "chip8-vm - ESC to exit",
        WIDTH,
        HEIGHT,
        WindowOptions {
            scale: Scale::X16,
            ..WindowOptions::default()
        },
    )?;
    // Limit to max ~60 fps update rate
    window.limit_update_rate(Some(std::time::Duration::from_micros(16600)));

    let mut emu = Emulator::with_beep(config, Box::new(gate));
    emu.load_rom(&rom);
    emu.start()?;
    log::info!("running {}", path);

    let mut held = HashSet::new();
    while window.is_open() && !window.is_key_down(HostKey::Escape) {
        let now = held_keys(&window);
        for &key in now.difference(&held) {
            emu.on_key_down(key);
        }
        for &key in held.difference(&now) {
            emu.on_key_up(key);
        }
        held = now;

        if window.is_key_pressed(HostKey::P, minifb::KeyRepeat::No) {
            emu.toggle_pause();
        }
        if window.is_key_pressed(HostKey::N, minifb::KeyRepeat::No) {
            emu.step();
        }
        if window.is_key_pressed(HostKey::Backspace, minifb::KeyRepeat::No) {
            emu.reset();
        }
        if window.is_key_pressed(HostKey::Tab, minifb::KeyRepeat::No) {
            println!("{}", emu.cpu_debug_view());
        }

        match emu.take_frame(PIXEL_ON, PIXEL_OFF) {
            Some(frame) => window.update_with_buffer(&frame, WIDTH, HEIGHT)?,
            None => window.update(),
        }
    }

    emu.cleanup();
    Ok(())
}
