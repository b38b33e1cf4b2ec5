//! Serial bytes in, beam positions out.

use pretty_assertions::assert_eq;

use vectorgen::interface::{Controller, WriteToHost};
use vectorgen::screen::{Beam, Progress, Screen, ScreenConfig};

#[derive(Default)]
struct Host(Vec<u8>);

impl WriteToHost for Host {
    fn write_byte(&mut self, byte: u8) {
        self.0.push(byte);
    }
}

fn beam(x: i32, y: i32, active: bool) -> Beam {
    Beam { x, y, active }
}

fn replies(ctl: &mut Controller<'_, Host>) -> Vec<String> {
    let text = String::from_utf8(std::mem::take(&mut ctl.tx_mut().0)).unwrap();
    text.split_terminator("\r\n").map(String::from).collect()
}

#[test]
fn line_drawn_from_typed_commands() {
    let mut mem = [0; 1024];
    let mut ctl = Controller::new(&mut mem, Screen::default(), Host::default());

    // 10 points per millisecond is 10 millipoints per microsecond
    ctl.feed(b"scale 2048 2048 1 1\r\nspeed 10\r\nline -300 -400 300 400\r\n");
    assert_eq!(replies(&mut ctl), ["ok", "ok", "ok"]);

    assert_eq!(ctl.tick(0), Progress::Running);
    assert_eq!(ctl.beam(), beam(-300, -400, true));
    ctl.tick(50_000);
    assert_eq!(ctl.beam(), beam(0, 0, true));
    ctl.tick(80_000);
    assert_eq!(ctl.beam(), beam(180, 240, true));
    assert_eq!(ctl.tick(100_000), Progress::Idle);
    assert_eq!(ctl.beam(), beam(300, 400, false));
    assert!(ctl.pool().is_empty());
}

#[test]
fn motions_play_in_arrival_order() {
    let mut mem = [0; 1024];
    let config = ScreenConfig { speed: 10_000, hold_time: 100, ..ScreenConfig::default() };
    let mut ctl = Controller::new(&mut mem, Screen::new(config), Host::default());

    ctl.feed(b"point 5 5\nline 0 0 30 40\npoint 7 ");
    ctl.feed(b"7\n");
    assert_eq!(replies(&mut ctl), ["ok", "ok", "ok"]);
    assert_eq!(ctl.pool().len(), 3);

    ctl.tick(0);
    assert_eq!(ctl.beam(), beam(5, 5, true));
    ctl.tick(100);
    assert_eq!(ctl.beam(), beam(0, 0, true));
    ctl.tick(103);
    assert_eq!(ctl.beam(), beam(18, 24, true));
    ctl.tick(105);
    assert_eq!(ctl.beam(), beam(7, 7, true));
    ctl.tick(205);
    assert_eq!(ctl.beam(), beam(7, 7, false));
    assert!(ctl.pool().is_empty());
}

#[test]
fn recorded_sequence_loops_until_cleared() {
    let mut mem = [0; 1024];
    let config = ScreenConfig { hold_time: 10, ..ScreenConfig::default() };
    let mut ctl = Controller::new(&mut mem, Screen::new(config), Host::default());

    ctl.feed(b"sequence start\npoint 1 1\npoint 2 2\npoint 3 3\nsequence end\n");
    assert_eq!(replies(&mut ctl), ["ok"; 5]);

    let mut seen = Vec::new();
    for t in 0..7 {
        ctl.tick(t * 10);
        seen.push(ctl.beam().x);
    }
    assert_eq!(seen, [1, 2, 3, 1, 2, 3, 1]);

    ctl.feed(b"sequence clear\n");
    assert_eq!(ctl.tick(70), Progress::Idle);
    assert!(!ctl.beam().active);
}

#[test]
fn centered_axes_clamp_and_drive_the_dac() {
    let mut mem = [0; 1024];
    let mut ctl = Controller::new(&mut mem, Screen::default(), Host::default());

    ctl.feed(b"scale 64 32 1 1\npoint -70 10\n");
    ctl.tick(0);
    assert_eq!(ctl.beam(), beam(-32, 10, true));
    let (x, _) = ctl.dac_output(16);
    assert_eq!(x, 0x8000);
}

#[test]
fn bad_input_is_reported_and_harmless() {
    let mut mem = [0; 1024];
    let mut ctl = Controller::new(&mut mem, Screen::default(), Host::default());

    ctl.feed(b"point 1\nline a b c d\nscale 0 1 0 0\nfly 1 2\n\x07\x08\r\n");
    assert_eq!(replies(&mut ctl), [
        "error: Wrong number of arguments",
        "error: Parse error",
        "error: Bad argument",
        "error: Unknown command",
        "noop",
    ]);
    assert!(ctl.pool().is_empty());
    assert_eq!(ctl.tick(0), Progress::Idle);
}
