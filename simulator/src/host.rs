//! Connections to the host: a pseudo-tty for interactive clients, or plain
//! stdin/stdout for scripted runs.

use std::fs::File;
use std::io::{self, Read, Write};
use std::os::unix::io::{AsRawFd, FromRawFd};
use std::thread;
use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, Sender};
use nix::{fcntl::OFlag, pty, unistd};

use crate::SimError;

/// Replies from the controller go here.
pub struct HostTx(Box<dyn Write + Send>);

impl vectorgen::interface::WriteToHost for HostTx {
    fn write_byte(&mut self, byte: u8) {
        let _ = self.0.write_all(&[byte]);
        if byte == b'\n' {
            let _ = self.0.flush();
        }
    }
}

fn forward(input: impl Read, tx: Sender<u8>, retry: bool) {
    for byte in input.bytes() {
        match byte {
            Ok(byte) => if tx.send(byte).is_err() {
                return;
            },
            // the pty master reports EIO while no client is connected
            Err(_) if retry => thread::sleep(Duration::from_millis(100)),
            Err(err) => {
                log::warn!("input closed: {}", err);
                return;
            }
        }
    }
    log::info!("end of input");
}

/// Open a pseudo-tty and forward everything clients write to it.
pub fn prepare_tty() -> Result<(Receiver<u8>, HostTx), SimError> {
    let master = pty::posix_openpt(OFlag::O_RDWR | OFlag::O_NOCTTY)?;
    pty::grantpt(&master)?;
    pty::unlockpt(&master)?;
    log::info!("terminal open, connect clients to {}", pty::ptsname_r(&master)?);
    let reader = unsafe { File::from_raw_fd(unistd::dup(master.as_raw_fd())?) };
    let writer = unsafe { File::from_raw_fd(unistd::dup(master.as_raw_fd())?) };

    let (tx, rx) = unbounded();
    thread::spawn(move || {
        // closing the master would hang up the clients
        let _master = master;
        forward(reader, tx, true);
    });
    Ok((rx, HostTx(Box::new(writer))))
}

/// Read commands from stdin and answer on stdout.
pub fn prepare_stdio() -> (Receiver<u8>, HostTx) {
    let (tx, rx) = unbounded();
    thread::spawn(move || forward(io::stdin(), tx, false));
    (rx, HostTx(Box::new(io::stdout())))
}
