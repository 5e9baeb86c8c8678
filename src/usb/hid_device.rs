//! USB HID composite device - keyboard + mouse + consumer control.
//!
//! Initialises the Embassy USB stack on the nRF52840 hardware USB
//! peripheral and exposes three HID endpoints. Reports produced by the
//! role loop are queued in [`HID_REPORTS`] and written out by
//! [`hid_writer_task`].

use core::sync::atomic::{AtomicBool, Ordering};

use defmt::{debug, info, warn};
use embassy_nrf::usb::vbus_detect::SoftwareVbusDetect;
use embassy_nrf::usb::Driver;
use embassy_nrf::{bind_interrupts, peripherals};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::{Channel, Sender};
use embassy_usb::class::hid::{Config as HidConfig, HidWriter, State};
use embassy_usb::{Builder, Config, UsbDevice};
use roki::config;
use roki::hid::consumer::CONSUMER_REPORT_DESCRIPTOR;
use roki::hid::keyboard::KEYBOARD_REPORT_DESCRIPTOR;
use roki::hid::mouse::MOUSE_REPORT_DESCRIPTOR;
use roki::hid::{HidReport, ReportSink};
use roki::link::HostLink;
use static_cell::StaticCell;

bind_interrupts!(struct Irqs {
    USBD => embassy_nrf::usb::InterruptHandler<peripherals::USBD>;
});

pub type UsbDriver = Driver<'static, peripherals::USBD, &'static SoftwareVbusDetect>;
pub type UsbHidWriter = HidWriter<'static, UsbDriver, 8>;

/// Depth of the report queue between the role loop and the endpoints.
pub const REPORT_QUEUE_DEPTH: usize = 16;

/// Reports waiting for their endpoint.
pub static HID_REPORTS: Channel<CriticalSectionRawMutex, HidReport, REPORT_QUEUE_DEPTH> =
    Channel::new();

static KB_STATE: StaticCell<State> = StaticCell::new();
static MOUSE_STATE: StaticCell<State> = StaticCell::new();
static CONSUMER_STATE: StaticCell<State> = StaticCell::new();
static USB_CONFIG_DESC: StaticCell<[u8; 256]> = StaticCell::new();
static USB_BOS_DESC: StaticCell<[u8; 256]> = StaticCell::new();
static USB_MSOS_DESC: StaticCell<[u8; 256]> = StaticCell::new();
static USB_CTRL_BUF: StaticCell<[u8; 128]> = StaticCell::new();
static USB_STATE_HANDLER: StaticCell<UsbStateHandler> = StaticCell::new();

static USB_CONFIGURED: AtomicBool = AtomicBool::new(false);
static USB_SUSPENDED: AtomicBool = AtomicBool::new(false);

struct UsbStateHandler;

impl embassy_usb::Handler for UsbStateHandler {
    fn reset(&mut self) {
        USB_CONFIGURED.store(false, Ordering::Release);
        USB_SUSPENDED.store(false, Ordering::Release);
    }

    fn configured(&mut self, configured: bool) {
        debug!("USB configured: {}", configured);
        USB_CONFIGURED.store(configured, Ordering::Release);
    }

    fn suspended(&mut self, suspended: bool) {
        debug!("USB suspended: {}", suspended);
        USB_SUSPENDED.store(suspended, Ordering::Release);
    }
}

/// Build result containing the USB device runner and the three HID writers.
pub struct UsbHidDevice {
    pub device: UsbDevice<'static, UsbDriver>,
    pub keyboard_writer: UsbHidWriter,
    pub mouse_writer: UsbHidWriter,
    pub consumer_writer: UsbHidWriter,
}

/// Initialise the USB stack and create the composite HID device.
///
/// Must be called exactly once.  All static buffers are consumed here.
/// VBUS events come from the SoftDevice, which owns the POWER peripheral.
pub fn init(usbd: peripherals::USBD, vbus: &'static SoftwareVbusDetect) -> UsbHidDevice {
    let driver = Driver::new(usbd, Irqs, vbus);

    let mut usb_config = Config::new(config::USB_VID, config::USB_PID);
    usb_config.manufacturer = Some(config::USB_MANUFACTURER);
    usb_config.product = Some(config::USB_PRODUCT);
    usb_config.serial_number = Some(config::USB_SERIAL_NUMBER);
    usb_config.max_power = 100; // mA
    usb_config.max_packet_size_0 = 64;

    let config_desc = USB_CONFIG_DESC.init([0u8; 256]);
    let bos_desc = USB_BOS_DESC.init([0u8; 256]);
    let msos_desc = USB_MSOS_DESC.init([0u8; 256]);
    let ctrl_buf = USB_CTRL_BUF.init([0u8; 128]);

    let mut builder = Builder::new(
        driver,
        usb_config,
        config_desc,
        bos_desc,
        msos_desc,
        ctrl_buf,
    );

    let usb_handler = USB_STATE_HANDLER.init(UsbStateHandler);
    builder.handler(usb_handler);

    let keyboard_writer = hid_writer(&mut builder, &KB_STATE, KEYBOARD_REPORT_DESCRIPTOR);
    let mouse_writer = hid_writer(&mut builder, &MOUSE_STATE, MOUSE_REPORT_DESCRIPTOR);
    let consumer_writer = hid_writer(&mut builder, &CONSUMER_STATE, CONSUMER_REPORT_DESCRIPTOR);

    let device = builder.build();

    info!("USB HID composite device initialised (keyboard + mouse + consumer)");

    UsbHidDevice {
        device,
        keyboard_writer,
        mouse_writer,
        consumer_writer,
    }
}

fn hid_writer(
    builder: &mut Builder<'static, UsbDriver>,
    state: &'static StaticCell<State<'static>>,
    report_descriptor: &'static [u8],
) -> UsbHidWriter {
    let config = HidConfig {
        report_descriptor,
        request_handler: None,
        poll_ms: config::USB_HID_POLL_MS,
        max_packet_size: 8,
    };
    HidWriter::new(builder, state.init(State::new()), config)
}

/// Run the USB device stack - must be spawned as a dedicated Embassy task.
pub async fn run_usb_device(mut device: UsbDevice<'static, UsbDriver>) -> ! {
    info!("USB device task started");
    device.run().await
}

/// HID report forwarding task - drains [`HID_REPORTS`] into the matching
/// USB HID endpoint.
pub async fn hid_writer_task(
    mut keyboard: UsbHidWriter,
    mut mouse: UsbHidWriter,
    mut consumer: UsbHidWriter,
) -> ! {
    info!("HID writer task started - waiting for reports");

    let mut buf = [0u8; 8];

    loop {
        let report = HID_REPORTS.receive().await;
        let n = report.serialize(&mut buf);
        let result = match report {
            HidReport::Keyboard(_) => keyboard.write(&buf[..n]).await,
            HidReport::Mouse(_) => mouse.write(&buf[..n]).await,
            HidReport::Consumer(_) => consumer.write(&buf[..n]).await,
        };
        if result.is_err() {
            warn!("USB HID write failed");
        }
    }
}

/// Queues reports for [`hid_writer_task`] without blocking the role loop.
#[derive(Clone, Copy)]
pub struct ChannelSink {
    sender: Sender<'static, CriticalSectionRawMutex, HidReport, REPORT_QUEUE_DEPTH>,
}

impl ChannelSink {
    pub fn new() -> Self {
        Self {
            sender: HID_REPORTS.sender(),
        }
    }
}

impl Default for ChannelSink {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportSink for ChannelSink {
    fn send(&self, report: HidReport) {
        // try_send avoids blocking; if the USB task is behind, we drop.
        if self.sender.try_send(report).is_err() {
            warn!("HID report channel full - dropping report");
        }
    }
}

/// The host connection as seen by the primary role: USB configured and
/// awake. Enumeration is driven by the host, so there is nothing to
/// advertise.
pub struct UsbHostLink;

impl HostLink for UsbHostLink {
    fn is_connected(&self) -> bool {
        USB_CONFIGURED.load(Ordering::Acquire) && !USB_SUSPENDED.load(Ordering::Acquire)
    }

    fn start_advertising(&mut self) {
        debug!("waiting for USB host");
    }

    fn stop_advertising(&mut self) {}
}
