//! Line echo over USART2 on a Nucleo-F446RE using the buffered serial driver.
#![no_std]
#![no_main]

use core::fmt::Write;
use core::panic::PanicInfo;
use cortex_m::peripheral::NVIC;
use cortex_m_rt::entry;
use heapless::Vec;
use serial_fifo::{config, ReceiveError, SerialPort, Uart};
use stm32f4xx_hal::hal_02::serial::{Read as _, Write as _};
use stm32f4xx_hal::pac::{self, Interrupt, USART2};
use stm32f4xx_hal::serial::{Config, Event};
use stm32f4xx_hal::uart::{RxISR, TxISR};
use stm32f4xx_hal::{interrupt, prelude::*, Listen};

type Serial = stm32f4xx_hal::serial::Serial<USART2>;

/// Longest line echoed back, including the terminator.
const LINE_LENGTH: usize = 80;

static SERIAL: Uart<Usart2> = Uart::new();

/// USART2 registers behind the driver.
struct Usart2(Serial);

impl SerialPort for Usart2 {
    fn read(&mut self) -> Result<Option<u8>, ReceiveError> {
        if !self.0.is_rx_not_empty() {
            return Ok(None);
        }
        // The data register has already been read when an error is reported, so the byte is gone.
        self.0.read().map(Some).map_err(|_| ReceiveError)
    }

    fn is_tx_ready(&self) -> bool {
        self.0.is_tx_empty()
    }

    fn write(&mut self, byte: u8) {
        // Only called once the data register is empty, so this never reports `WouldBlock`.
        let _ = self.0.write(byte);
    }

    fn listen_tx(&mut self) {
        self.0.listen(Event::TxEmpty);
    }

    fn unlisten_tx(&mut self) {
        self.0.unlisten(Event::TxEmpty);
    }

    fn listen_rx(&mut self) {
        self.0.listen(Event::RxNotEmpty);
    }

    fn unlisten_rx(&mut self) {
        self.0.unlisten(Event::RxNotEmpty);
    }
}

/// Queue all of `bytes`, sleeping while the transmit FIFO is full.
fn send(bytes: &[u8]) {
    let mut rest = bytes;
    while !rest.is_empty() {
        let queued = SERIAL.write_all(rest);
        rest = &rest[queued..];
        if !rest.is_empty() {
            // The transmit interrupt frees a slot and wakes us up.
            cortex_m::asm::wfi();
        }
    }
}

/// Formatted output that never drops bytes.
struct Console;

impl Write for Console {
    fn write_str(&mut self, string: &str) -> core::fmt::Result {
        send(string.as_bytes());
        Ok(())
    }
}

#[panic_handler]
fn panic_handler(_info: &PanicInfo) -> ! {
    cortex_m::interrupt::disable();
    // Recovery is highly unlikely, so we simply wait for a manual reset and allow debugging.
    loop {
        cortex_m::asm::bkpt()
    }
}

#[interrupt]
fn USART2() {
    SERIAL.on_interrupt();
}

#[entry]
fn main() -> ! {
    let dp = pac::Peripherals::take().unwrap();

    let rcc = dp.RCC.constrain();
    let clocks = rcc.cfgr.use_hse(config::HSE_FREQ_MHZ.MHz()).freeze();

    let gpioa = dp.GPIOA.split();
    let pins = (gpioa.pa2.into_alternate(), gpioa.pa3.into_alternate());
    let serial_config = Config::default().baudrate(config::BAUD_RATE.bps());
    let serial = dp.USART2.serial::<u8>(pins, serial_config, &clocks).unwrap();

    // Wait for completion of any previous transmissions before handing over.
    while !serial.is_tx_empty() {}
    SERIAL.begin(Usart2(serial));

    // Clear pending flag to not trigger immediately and enable interrupt.
    NVIC::unpend(Interrupt::USART2);
    unsafe { NVIC::unmask(Interrupt::USART2) };

    let mut out = Console;
    writeln!(out, "Hello, world!\r").ok();
    writeln!(out, "Core clock: {}\r", clocks.hclk()).ok();

    let mut line: Vec<u8, LINE_LENGTH> = Vec::new();
    loop {
        match SERIAL.read_line(&mut line, b'\r') {
            Ok(true) => {
                send(&line);
                send(b"\n");
                line.clear();
            }
            Ok(false) => {}
            Err(_) => {
                writeln!(out, "\r\nline longer than {} bytes dropped\r", LINE_LENGTH).ok();
                line.clear();
                SERIAL.flush_rx();
            }
        }

        let overruns = SERIAL.take_overruns();
        if overruns > 0 {
            writeln!(out, "\r\nreceive overrun, {} bytes lost\r", overruns).ok();
        }

        cortex_m::asm::wfi();
    }
}
