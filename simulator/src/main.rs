use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, TryRecvError};
use simplelog::{Config, LevelFilter, SimpleLogger};
use structopt::StructOpt;
use thiserror::Error;

use vectorgen::command::{ScaleCmd, SpeedCmd};
use vectorgen::interface::Controller;
use vectorgen::screen::{Beam, Progress, Screen};
use vectorgen::DAC_BIT_WIDTH;

mod host;
mod phosphor;

use phosphor::{Phosphor, Pixel, SIZE};

#[derive(StructOpt)]
#[structopt(about = "Vector beam generator simulator.")]
pub struct Options {
    #[structopt(short="x", help="Scale display up by a factor of 2")]
    scale_x2: bool,
    #[structopt(long, help="Log the beam instead of drawing it in a window")]
    headless: bool,
    #[structopt(long, help="Read commands from stdin instead of a pseudo-tty")]
    stdin: bool,
    #[structopt(long, default_value="1000", help="Microseconds between beam updates")]
    tick_us: u64,
    #[structopt(long, default_value="4096", help="Bytes of memory for queued motions")]
    pool_size: usize,
    #[structopt(long, default_value="1024", help="Initial width and height of the screen")]
    size: u32,
    #[structopt(long, help="Initially put the origin in the middle of the screen")]
    centered: bool,
    #[structopt(long, default_value="1", help="Initial line speed in points per millisecond")]
    speed: f32,
    #[structopt(long, default_value="1000", help="Initial point hold time in microseconds")]
    hold: u32,
    #[structopt(short, long, parse(from_occurrences), help="More log output (repeat for more)")]
    verbose: u8,
}

#[derive(Debug, Error)]
pub enum SimError {
    #[error("pseudo-tty: {0}")]
    Tty(#[from] nix::Error),
    #[error("window: {0}")]
    Window(#[from] minifb::Error),
    #[error("bad option: {0}")]
    BadOption(&'static str),
}

/// Frame period of the window, aiming for 50Hz.
const FRAME: Duration = Duration::from_millis(20);

fn initial_screen(args: &Options) -> Result<Screen, SimError> {
    if args.size == 0 || args.size > 1 << vectorgen::MAX_SIZE_POW {
        return Err(SimError::BadOption("size must be between 1 and 65536"));
    }
    if !args.speed.is_finite() || args.speed < 0.0 {
        return Err(SimError::BadOption("speed must be a positive number"));
    }
    let mut screen = Screen::default();
    screen.apply_scale(&ScaleCmd {
        x_width: args.size,
        y_width: args.size,
        x_centered: args.centered,
        y_centered: args.centered,
    });
    screen.apply_speed(&SpeedCmd { speed: Some(args.speed), hold_time: Some(args.hold) });
    Ok(screen)
}

fn run(args: Options) -> Result<(), SimError> {
    let mut pool_mem = vec![0; args.pool_size];
    let screen = initial_screen(&args)?;

    // open the connection for clients
    let (rx, tx): (Receiver<u8>, _) = if args.stdin {
        host::prepare_stdio()
    } else {
        host::prepare_tty()?
    };

    let mut ctl = Controller::new(&mut pool_mem, screen, tx);
    ctl.greet();

    // open the window
    let mut win = if args.headless {
        None
    } else {
        Some(minifb::Window::new("Vector beam", SIZE, SIZE, minifb::WindowOptions {
            scale: if args.scale_x2 { minifb::Scale::X2 } else { minifb::Scale::X1 },
            .. Default::default()
        })?)
    };
    let mut tube = Phosphor::new();

    let start = Instant::now();
    let mut last_frame = start;
    let mut last: Option<(Beam, u32)> = None;
    let mut input_done = false;
    let mut input = Vec::new();

    loop {
        // process input from remote
        loop {
            match rx.try_recv() {
                Ok(byte) => input.push(byte),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    input_done = true;
                    break;
                }
            }
        }
        if !input.is_empty() {
            ctl.feed(&input);
            input.clear();
        }
        if ctl.pool_corrupted() {
            log::error!("motion pool corrupted, dropping all queued motions");
            ctl.reset();
        }

        // move the beam
        let progress = ctl.tick(start.elapsed().as_micros() as u64);
        let beam = ctl.beam();
        // separate motions are not joined by a trace
        let key = ctl.screen().motion_count();
        let config = *ctl.screen().config();

        if let Some(win) = &win {
            if beam.active {
                let to: Pixel = phosphor::to_pixel(beam, &config);
                match last {
                    Some((prev, prev_key)) if prev.active && prev_key == key => {
                        tube.trace(phosphor::to_pixel(prev, &config), to)
                    }
                    _ => tube.plot(to),
                }
            }
            if !win.is_open() || win.is_key_down(minifb::Key::Escape) {
                log::info!("window closed, exiting");
                return Ok(());
            }
        } else if last.map_or(true, |(prev, prev_key)| prev.active != beam.active || prev_key != key) {
            let (dac_x, dac_y) = ctl.dac_output(DAC_BIT_WIDTH);
            log::info!("beam at ({}, {}) {}", beam.x, beam.y, if beam.active { "on" } else { "off" });
            log::debug!("dac codes {:#06x} {:#06x}", dac_x, dac_y);
        }
        last = Some((beam, key));

        // a scripted run ends once everything has been drawn
        if input_done && progress == Progress::Idle {
            log::info!("input finished and nothing left to draw, exiting");
            return Ok(());
        }

        if let Some(win) = &mut win {
            if last_frame.elapsed() >= FRAME {
                win.update_with_buffer(tube.buf(), SIZE, SIZE)?;
                tube.decay();
                last_frame = Instant::now();
            }
        }
        std::thread::sleep(Duration::from_micros(args.tick_us));
    }
}

fn main() {
    let args = Options::from_args();

    let level = match args.verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    SimpleLogger::init(level, Config::default()).expect("could not set up logging");

    if let Err(err) = run(args) {
        log::error!("{}", err);
        std::process::exit(1);
    }
}
