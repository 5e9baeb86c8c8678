//! Roki split keyboard firmware for the nRF52840.
//!
//! Boot sequence:
//!   1. Enable the SoftDevice, register the Roki service and start the
//!      SoftDevice event task.
//!   2. Load the keymap from flash (writing the built-in one on a blank
//!      board) and pick the role from its side flag.
//!   3. Start the input tasks (QDEC encoder, SAADC stick).
//!   4. Primary: bring up USB HID and the BLE central. Secondary: start
//!      advertising the Roki GATT service.
//!   5. Run the role loop forever.

#![no_std]
#![no_main]

mod ble;
mod board;
mod storage;
mod usb;

use defmt::{error, info, unwrap};
use defmt_rtt as _;
use embassy_executor::Spawner;
use embassy_nrf::gpio::{Input as GpioInput, Output, Pin as _};
use embassy_nrf::interrupt::{self, InterruptExt, Priority};
use embassy_nrf::usb::vbus_detect::SoftwareVbusDetect;
use embassy_nrf::{qdec, saadc};
use embassy_time::Delay;
use nrf_softdevice::{Flash, Softdevice};
use panic_probe as _;
use roki::config::{COLS, ROWS};
use roki::dispatch::ActionSender;
use roki::hid::{HidContext, KeyboardDevice, MediaDevice, MouseDevice};
use roki::input::{BitmapEvents, Calibration, ThumbStick};
use roki::keymap::Keymap;
use roki::role::{LocalInput, Loop, Primary, Role, RoleKind, Secondary};
use static_cell::StaticCell;

use crate::ble::peer::{self, BleCentral, BlePeerLink, RokiServer};
use crate::board::{GpioMatrix, QdecEncoder, SaadcAxis, STICK_CALIBRATION};
use crate::storage::KeymapStore;
use crate::usb::hid_device::{self, ChannelSink, UsbDriver, UsbHidWriter, UsbHostLink};

type Matrix = GpioMatrix<Output<'static>, GpioInput<'static>>;
type Keys = BitmapEvents<Matrix, ROWS>;
type Stick = ThumbStick<SaadcAxis, SaadcAxis, Calibration>;
type Input = LocalInput<Keys, QdecEncoder, Stick>;

type PrimaryHalf = Primary<
    Keys,
    QdecEncoder,
    Stick,
    UsbHostLink,
    BleCentral,
    KeyboardDevice<ChannelSink>,
    MouseDevice<ChannelSink>,
    MediaDevice<ChannelSink>,
>;
type SecondaryHalf = Secondary<Keys, QdecEncoder, Stick, BlePeerLink>;

static VBUS: StaticCell<SoftwareVbusDetect> = StaticCell::new();
static SERVER: StaticCell<RokiServer> = StaticCell::new();

#[embassy_executor::task]
async fn usb_task(device: embassy_usb::UsbDevice<'static, UsbDriver>) -> ! {
    hid_device::run_usb_device(device).await
}

#[embassy_executor::task]
async fn hid_task(keyboard: UsbHidWriter, mouse: UsbHidWriter, consumer: UsbHidWriter) -> ! {
    hid_device::hid_writer_task(keyboard, mouse, consumer).await
}

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("Roki starting");

    // The SoftDevice reserves priorities 0, 1 and 4.
    let mut nrf_config = embassy_nrf::config::Config::default();
    nrf_config.gpiote_interrupt_priority = Priority::P3;
    nrf_config.time_interrupt_priority = Priority::P3;
    interrupt::USBD.set_priority(Priority::P2);
    interrupt::CLOCK_POWER.set_priority(Priority::P2);
    interrupt::QDEC.set_priority(Priority::P3);
    interrupt::SAADC.set_priority(Priority::P3);
    let p = embassy_nrf::init(nrf_config);

    let sd = Softdevice::enable(&ble::softdevice_config());
    // Services register before the SoftDevice task starts. The primary
    // carries the Roki service unused.
    let server = match RokiServer::new(sd) {
        Ok(server) => SERVER.init(server),
        Err(e) => {
            error!("cannot register Roki service: {:?}", e);
            return park().await;
        }
    };
    let sd: &'static Softdevice = sd;
    let vbus: &'static SoftwareVbusDetect = VBUS.init(SoftwareVbusDetect::new(true, true));
    unwrap!(spawner.spawn(ble::softdevice_task(sd, vbus)));

    let mut store = KeymapStore::new(Flash::take(sd));
    let (header, keymap) = match store.load_or_init().await {
        Ok(loaded) => loaded,
        Err(e) => {
            error!("cannot load keymap: {}", e);
            return park().await;
        }
    };

    let matrix = GpioMatrix::new(
        [
            p.P0_24.degrade(),
            p.P1_00.degrade(),
            p.P0_11.degrade(),
            p.P1_04.degrade(),
            p.P1_06.degrade(),
        ],
        [
            p.P0_09.degrade(),
            p.P0_10.degrade(),
            p.P1_11.degrade(),
            p.P1_13.degrade(),
            p.P1_15.degrade(),
            p.P0_02.degrade(),
        ],
    );

    let qdec = qdec::Qdec::new(p.QDEC, board::Irqs, p.P0_17, p.P0_20, board::qdec_config());
    unwrap!(spawner.spawn(board::encoder_task(qdec)));

    let channels = [
        saadc::ChannelConfig::single_ended(p.P0_31),
        saadc::ChannelConfig::single_ended(p.P0_29),
    ];
    let adc = saadc::Saadc::new(p.SAADC, board::Irqs, saadc::Config::default(), channels);
    unwrap!(spawner.spawn(board::stick_task(adc)));

    let input: Input = LocalInput::new(
        BitmapEvents::new(matrix, COLS),
        QdecEncoder,
        ThumbStick::new(SaadcAxis::X, SaadcAxis::Y, STICK_CALIBRATION),
    );

    let mut role: Role<PrimaryHalf, SecondaryHalf> =
        match RoleKind::from_side_flag(header.is_left_side) {
            RoleKind::Primary => {
                let usb = hid_device::init(p.USBD, vbus);
                unwrap!(spawner.spawn(usb_task(usb.device)));
                unwrap!(spawner.spawn(hid_task(
                    usb.keyboard_writer,
                    usb.mouse_writer,
                    usb.consumer_writer,
                )));
                unwrap!(spawner.spawn(peer::central_task(sd)));
                Role::Primary(primary(input, keymap))
            }
            RoleKind::Secondary => {
                unwrap!(spawner.spawn(peer::peripheral_task(sd, server)));
                Role::Secondary(Secondary::new(input, BlePeerLink::new(server)))
            }
        };

    role.run(&mut Delay, Loop::forever()).await;
}

fn primary(input: Input, keymap: Keymap) -> PrimaryHalf {
    let sender = ActionSender::new(HidContext::with_sink(ChannelSink::new()));
    Primary::new(input, UsbHostLink, BleCentral, keymap, sender)
}

/// Stay alive for the debugger after a fatal boot error.
async fn park() {
    core::future::pending::<()>().await
}
