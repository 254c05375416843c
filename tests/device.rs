use std::io::Read;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::{Arc, Barrier};
use std::thread;

use bmp180::mock_utils::{BusOp, ScriptedBus, SleepNop, ThreadSleep};
use bmp180::{
    Bmp180Device, DeviceState, ReadingSnapshot, SensorError, CMD_PRESSURE, CMD_TEMPERATURE,
    REG_CALIBRATION, REG_CONTROL, REG_RESULT,
};
use embedded_hal::blocking::delay::DelayUs;

const CALIBRATION_BLOCK: [u8; 22] = [
    0x01, 0x98, 0xFF, 0xB8, 0xC7, 0xD1, 0x7F, 0xE5, 0x7F, 0xF5, 0x5A, 0x71, 0x18, 0x2E, 0x00, 0x04,
    0x80, 0x00, 0xDD, 0xF9, 0x0B, 0x34,
];

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn measurement(ut: [u8; 2]) -> Vec<BusOp> {
    vec![
        BusOp::write(REG_CONTROL, CMD_TEMPERATURE),
        BusOp::read(REG_RESULT, &ut),
        BusOp::write(REG_CONTROL, CMD_PRESSURE),
        BusOp::read(REG_RESULT, &[0x5D, 0x23, 0x00]),
    ]
}

fn bus(cycles: &[[u8; 2]]) -> ScriptedBus {
    let mut ops = vec![BusOp::read(REG_CALIBRATION, &CALIBRATION_BLOCK)];
    for ut in cycles {
        ops.extend(measurement(*ut));
    }
    ScriptedBus::new(&ops)
}

/// Blocks in the conversion wait while armed, so a test can hold an
/// acquisition in flight.
struct GateSleep {
    armed: Arc<AtomicBool>,
    entered: Sender<()>,
    release: Receiver<()>,
}

impl DelayUs<u32> for GateSleep {
    fn delay_us(&mut self, _us: u32) {
        if self.armed.load(Ordering::SeqCst) {
            self.entered.send(()).unwrap();
            self.release.recv().unwrap();
        }
    }
}

#[test]
fn failed_refresh_leaves_snapshot_unchanged() {
    init_logger();
    let mut ops = vec![BusOp::read(REG_CALIBRATION, &CALIBRATION_BLOCK)];
    ops.extend(measurement([0x6C, 0xFA]));
    ops.push(BusOp::write(REG_CONTROL, CMD_TEMPERATURE));
    ops.push(BusOp::read(REG_RESULT, &[0x6C, 0xFA]).failing());
    let device = Bmp180Device::new(ScriptedBus::new(&ops), SleepNop);
    device.initialize().unwrap();

    let before = device.snapshot();
    assert!(device.refresh().is_err());
    assert_eq!(device.snapshot(), before);
    assert_eq!(device.state(), DeviceState::Error);
}

#[test]
fn snapshot_does_not_touch_the_bus() {
    init_logger();
    let device = Bmp180Device::new(bus(&[[0x6C, 0xFA]]), SleepNop);
    device.initialize().unwrap();
    for _ in 0..10 {
        assert_eq!(
            device.snapshot().text(),
            "Temperature: 15.0 °C\nPressure: 69964 Pa\n"
        );
    }
    // Any extra bus traffic would have failed against the empty script.
    let (bus, _) = device.release();
    bus.done();
}

fn gated(armed: &Arc<AtomicBool>) -> (GateSleep, Receiver<()>, Sender<()>) {
    let (entered_tx, entered_rx) = channel();
    let (release_tx, release_rx) = channel();
    let sleep = GateSleep {
        armed: Arc::clone(armed),
        entered: entered_tx,
        release: release_rx,
    };
    (sleep, entered_rx, release_tx)
}

#[test]
fn concurrent_readers_see_whole_snapshots() {
    init_logger();
    const READERS: usize = 8;
    const MAX_READS: usize = 100_000;
    const BEFORE: &str = "Temperature: 15.0 °C\nPressure: 69964 Pa\n";
    const AFTER: &str = "Temperature: 31.3 °C\nPressure: 72532 Pa\n";

    let armed = Arc::new(AtomicBool::new(false));
    let (sleep, entered, release) = gated(&armed);
    let device = Arc::new(Bmp180Device::new(
        bus(&[[0x6C, 0xFA], [0x75, 0x30]]),
        sleep,
    ));
    device.initialize().unwrap();
    assert_eq!(device.snapshot().text(), BEFORE);

    armed.store(true, Ordering::SeqCst);
    let refresher = {
        let device = Arc::clone(&device);
        thread::spawn(move || device.refresh())
    };
    // The refresher holds the device, parked in its conversion wait.
    entered.recv().unwrap();

    let start = Arc::new(Barrier::new(READERS + 1));
    let readers: Vec<_> = (0..READERS)
        .map(|_| {
            let device = Arc::clone(&device);
            let start = Arc::clone(&start);
            thread::spawn(move || {
                start.wait();
                let mut seen = Vec::new();
                for _ in 0..MAX_READS {
                    let snapshot = device.snapshot();
                    let done = snapshot.text() == AFTER;
                    seen.push(snapshot);
                    if done {
                        break;
                    }
                }
                seen
            })
        })
        .collect();

    start.wait();
    armed.store(false, Ordering::SeqCst);
    release.send(()).unwrap();
    refresher.join().unwrap().unwrap();
    assert_eq!(device.snapshot().text(), AFTER);

    for reader in readers {
        let seen = reader.join().unwrap();
        for snapshot in &seen {
            assert!(
                snapshot.text() == BEFORE || snapshot.text() == AFTER,
                "torn snapshot: {:?}",
                snapshot
            );
        }
        assert_eq!(seen.last().map(|s| s.text()), Some(AFTER));
    }
}

#[test]
fn state_is_measuring_while_acquisition_runs() {
    init_logger();
    let armed = Arc::new(AtomicBool::new(false));
    let (sleep, entered, release) = gated(&armed);
    let device = Arc::new(Bmp180Device::new(
        bus(&[[0x6C, 0xFA], [0x75, 0x30]]),
        sleep,
    ));
    device.initialize().unwrap();
    assert_eq!(device.state(), DeviceState::Ready);

    armed.store(true, Ordering::SeqCst);
    let refresher = {
        let device = Arc::clone(&device);
        thread::spawn(move || device.refresh())
    };
    entered.recv().unwrap();
    assert_eq!(device.state(), DeviceState::Measuring);

    armed.store(false, Ordering::SeqCst);
    release.send(()).unwrap();
    refresher.join().unwrap().unwrap();
    assert_eq!(device.state(), DeviceState::Ready);
}

#[test]
fn concurrent_refreshes_run_one_at_a_time() {
    init_logger();
    let device = Arc::new(Bmp180Device::new(
        bus(&[[0x6C, 0xFA], [0x6C, 0xFA], [0x6C, 0xFA]]),
        ThreadSleep,
    ));
    device.initialize().unwrap();

    let workers: Vec<_> = (0..2)
        .map(|_| {
            let device = Arc::clone(&device);
            thread::spawn(move || device.refresh())
        })
        .collect();
    for worker in workers {
        // Each refresh consumed a full measurement in order; interleaved
        // bus traffic would not match the script.
        worker.join().unwrap().unwrap();
    }

    let device = Arc::try_unwrap(device).ok().unwrap();
    let (bus, _) = device.release();
    bus.done();
}

#[test]
fn try_refresh_rejects_while_busy() {
    init_logger();
    let armed = Arc::new(AtomicBool::new(false));
    let (sleep, entered_rx, release_tx) = gated(&armed);
    let device = Arc::new(Bmp180Device::new(bus(&[[0x6C, 0xFA], [0x75, 0x30]]), sleep));
    device.initialize().unwrap();
    let before = device.snapshot();

    armed.store(true, Ordering::SeqCst);
    let refresher = {
        let device = Arc::clone(&device);
        thread::spawn(move || device.refresh())
    };

    // The refresher is now parked in the temperature conversion wait.
    entered_rx.recv().unwrap();
    assert_eq!(device.try_refresh(), Err(SensorError::Busy));

    armed.store(false, Ordering::SeqCst);
    release_tx.send(()).unwrap();
    refresher.join().unwrap().unwrap();

    assert_ne!(device.snapshot(), before);
    assert_eq!(device.state(), DeviceState::Ready);
}

#[test]
fn open_reads_in_small_chunks() {
    init_logger();
    let device = Bmp180Device::new(bus(&[[0x6C, 0xFA]]), SleepNop);
    assert_eq!(device.open().snapshot(), &ReadingSnapshot::placeholder());
    device.initialize().unwrap();

    let mut reader = device.open();
    let mut text = Vec::new();
    let mut chunk = [0u8; 5];
    loop {
        let n = reader.read(&mut chunk).unwrap();
        if n == 0 {
            break;
        }
        text.extend_from_slice(&chunk[..n]);
    }
    assert_eq!(
        String::from_utf8(text).unwrap(),
        "Temperature: 15.0 °C\nPressure: 69964 Pa\n"
    );
    assert_eq!(reader.read(&mut chunk).unwrap(), 0);
}
