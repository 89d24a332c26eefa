//! Foreground and interrupt contexts emulated with threads on the host.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;

use serial_fifo::{BufferedSerial, Error, ReceiveError, SerialPort, FIFO};

const MESSAGE_COUNT: usize = 20_000;

#[test]
fn fifo_keeps_order_across_contexts() {
    static QUEUE: FIFO<8> = FIFO::new();

    thread::scope(|scope| {
        scope.spawn(|| {
            for i in 0..MESSAGE_COUNT {
                let byte = i as u8;
                while QUEUE.put(byte) == Err(Error::Full) {
                    thread::yield_now();
                }
            }
        });

        let mut received = 0;
        while received < MESSAGE_COUNT {
            let count = QUEUE.count();
            assert!(count <= QUEUE.capacity());
            match QUEUE.get() {
                Ok(byte) => {
                    assert_eq!(byte, received as u8);
                    received += 1;
                }
                Err(Error::Empty) => thread::yield_now(),
                Err(Error::Full) => unreachable!("get never reports full"),
            }
        }
    });

    assert!(QUEUE.is_empty());
}

#[test]
fn peek_and_get_agree_while_producer_runs() {
    static QUEUE: FIFO<3> = FIFO::new();

    thread::scope(|scope| {
        scope.spawn(|| {
            for i in 0..MESSAGE_COUNT {
                while QUEUE.put(i as u8).is_err() {
                    thread::yield_now();
                }
            }
        });

        let mut received = 0;
        while received < MESSAGE_COUNT {
            if let Ok(peeked) = QUEUE.peek() {
                assert_eq!(QUEUE.get(), Ok(peeked));
                assert_eq!(peeked, received as u8);
                received += 1;
            }
        }
    });
}

/// UART whose transmitter is always ready and never receives anything.
#[derive(Default)]
struct SinkPort {
    sent: Vec<u8>,
}

impl SerialPort for SinkPort {
    fn read(&mut self) -> Result<Option<u8>, ReceiveError> {
        Ok(None)
    }

    fn is_tx_ready(&self) -> bool {
        true
    }

    fn write(&mut self, byte: u8) {
        self.sent.push(byte);
    }

    fn listen_tx(&mut self) {}

    fn unlisten_tx(&mut self) {}

    fn listen_rx(&mut self) {}

    fn unlisten_rx(&mut self) {}
}

#[test]
fn interrupt_drains_transmit_buffer() {
    static SERIAL: BufferedSerial<SinkPort, 16, 16> = BufferedSerial::new();
    static RUNNING: AtomicBool = AtomicBool::new(true);

    let message: Vec<u8> = (0..2_000u32).map(|i| (i % 251) as u8).collect();
    SERIAL.begin(SinkPort::default());

    thread::scope(|scope| {
        scope.spawn(|| {
            while RUNNING.load(Ordering::Relaxed) {
                SERIAL.on_interrupt();
            }
        });

        let mut rest = message.as_slice();
        while !rest.is_empty() {
            let queued = SERIAL.write_all(rest);
            rest = &rest[queued..];
        }
        SERIAL.wait_tx();
        assert_eq!(SERIAL.pending_tx(), 0);
        RUNNING.store(false, Ordering::Relaxed);
    });

    let port = SERIAL.end().expect("port installed");
    assert_eq!(port.sent, message);
}

/// UART receiver that yields bytes `0, 1, 2, ...` (as `u8`) as they "arrive".
struct FeedPort {
    arrived: &'static AtomicUsize,
    taken: usize,
}

impl SerialPort for FeedPort {
    fn read(&mut self) -> Result<Option<u8>, ReceiveError> {
        if self.taken < self.arrived.load(Ordering::Acquire) {
            let byte = self.taken as u8;
            self.taken += 1;
            Ok(Some(byte))
        } else {
            Ok(None)
        }
    }

    fn is_tx_ready(&self) -> bool {
        false
    }

    fn write(&mut self, _byte: u8) {}

    fn listen_tx(&mut self) {}

    fn unlisten_tx(&mut self) {}

    fn listen_rx(&mut self) {}

    fn unlisten_rx(&mut self) {}
}

#[test]
fn received_bytes_survive_in_order_or_count_as_overruns() {
    static SERIAL: BufferedSerial<FeedPort, 4, 8> = BufferedSerial::new();
    static ARRIVED: AtomicUsize = AtomicUsize::new(0);
    static RUNNING: AtomicBool = AtomicBool::new(true);

    let total = 5_000usize;
    SERIAL.begin(FeedPort { arrived: &ARRIVED, taken: 0 });

    thread::scope(|scope| {
        scope.spawn(|| {
            for _ in 0..total {
                ARRIVED.fetch_add(1, Ordering::AcqRel);
                SERIAL.on_interrupt();
            }
            RUNNING.store(false, Ordering::Release);
        });

        let mut received = Vec::new();
        loop {
            match SERIAL.read() {
                Ok(byte) => received.push(byte),
                Err(_) if RUNNING.load(Ordering::Acquire) => thread::yield_now(),
                Err(_) => {
                    if SERIAL.available() == 0 {
                        break;
                    }
                }
            }
        }

        let overruns = SERIAL.take_overruns() as usize;
        assert_eq!(received.len() + overruns, total);

        // Whatever got through is an ordered subsequence of what arrived.
        let mut arrived = (0..total).map(|i| i as u8);
        for byte in received {
            assert!(arrived.any(|sent| sent == byte));
        }
    });
}
