//! nRF52840 board wiring: key matrix, rotary encoder and thumb stick.
//!
//! Matrix rows are driven high one at a time and columns read with
//! pull-downs (diodes point from rows to columns). The encoder runs on
//! the QDEC peripheral and the stick on two SAADC channels; their tasks
//! publish into atomics that the role loop reads without waiting.

use core::sync::atomic::{AtomicI32, AtomicU16, Ordering};

use defmt::info;
use embassy_nrf::gpio::{AnyPin, Input, Level, Output, OutputDrive, Pull};
use embassy_nrf::qdec::{self, Qdec};
use embassy_nrf::saadc::{self, Saadc};
use embassy_nrf::{bind_interrupts, peripherals};
use embassy_time::Timer;
use embedded_hal::digital::{InputPin, OutputPin};
use roki::config::{COLS, ROWS};
use roki::input::{AnalogAxisSource, AxisCalibration, Calibration, EncoderSource, MatrixScanner};

bind_interrupts!(pub struct Irqs {
    QDEC => qdec::InterruptHandler<peripherals::QDEC>;
    SAADC => saadc::InterruptHandler;
});

/// Stick sampling period.
const STICK_SAMPLE_MS: u64 = 5;

/// Busy-wait after driving a row, in CPU cycles (~1 µs at 64 MHz).
const ROW_SETTLE_CYCLES: u32 = 64;

/// Key matrix over any digital pins, one output per row and one input
/// per column.
pub struct GpioMatrix<O, I> {
    rows: [O; ROWS],
    cols: [I; COLS],
}

impl GpioMatrix<Output<'static>, Input<'static>> {
    pub fn new(rows: [AnyPin; ROWS], cols: [AnyPin; COLS]) -> Self {
        Self {
            rows: rows.map(|pin| Output::new(pin, Level::Low, OutputDrive::Standard)),
            cols: cols.map(|pin| Input::new(pin, Pull::Down)),
        }
    }
}

impl<O: OutputPin, I: InputPin> MatrixScanner for GpioMatrix<O, I> {
    fn scan(&mut self, rows: &mut [u8]) {
        for (row, bits) in self.rows.iter_mut().zip(rows.iter_mut()) {
            row.set_high().ok();
            cortex_m::asm::delay(ROW_SETTLE_CYCLES);
            *bits = 0;
            for (c, col) in self.cols.iter_mut().enumerate() {
                if col.is_high().ok().unwrap_or_default() {
                    *bits |= 1 << c;
                }
            }
            row.set_low().ok();
        }
    }
}

static ENCODER_POSITION: AtomicI32 = AtomicI32::new(0);

/// Accumulate QDEC reports into the shared encoder position.
#[embassy_executor::task]
pub async fn encoder_task(mut qdec: Qdec<'static, peripherals::QDEC>) -> ! {
    info!("encoder task started");
    loop {
        let delta = qdec.read().await;
        ENCODER_POSITION.fetch_add(i32::from(delta), Ordering::Relaxed);
    }
}

pub fn qdec_config() -> qdec::Config {
    let mut config = qdec::Config::default();
    config.debounce = true;
    config
}

/// Absolute encoder position as last reported by [`encoder_task`].
#[derive(Clone, Copy, Default)]
pub struct QdecEncoder;

impl EncoderSource for QdecEncoder {
    fn position(&mut self) -> i32 {
        ENCODER_POSITION.load(Ordering::Relaxed)
    }
}

/// 12-bit single-ended readings, centered at midscale.
pub const STICK_CALIBRATION: Calibration = Calibration::new(
    AxisCalibration::new(0, 2048, 4095),
    AxisCalibration::new(0, 2048, 4095),
);

static STICK: [AtomicU16; 2] = [AtomicU16::new(0), AtomicU16::new(0)];

/// Sample both stick axes every `STICK_SAMPLE_MS`.
#[embassy_executor::task]
pub async fn stick_task(mut saadc: Saadc<'static, 2>) -> ! {
    saadc.calibrate().await;
    info!("stick task started");
    let mut buf = [0i16; 2];
    loop {
        saadc.sample(&mut buf).await;
        for (axis, raw) in STICK.iter().zip(buf) {
            // Single-ended readings dip slightly below zero near ground.
            axis.store(raw.max(0) as u16, Ordering::Relaxed);
        }
        Timer::after_millis(STICK_SAMPLE_MS).await;
    }
}

/// One stick axis as last sampled by [`stick_task`].
#[derive(Clone, Copy)]
pub enum SaadcAxis {
    X,
    Y,
}

impl AnalogAxisSource for SaadcAxis {
    fn value(&mut self) -> u16 {
        STICK[*self as usize].load(Ordering::Relaxed)
    }
}
